//! Block scanner: finds candidate blocks, classifies them and attaches the
//! toggle control and render target exactly once.

use super::classifier::Classifier;
use super::document::{Document, NodeId, Selector};
use super::error::{DocumentError, ScanError, SelectorError};
use super::types::{BlockId, Dialect};
use chat_diagrams_config::Config;

/// Class of the inserted toggle control.
pub const TOGGLE_CLASS: &str = "diagram-toggle";
/// Class of the inserted render target.
pub const RENDER_TARGET_CLASS: &str = "diagram-render-target";

/// Parsed selectors describing the host's code block structure.
#[derive(Debug, Clone)]
pub struct BlockLayout {
    pub block: Selector,
    pub header: Selector,
    pub header_buttons: Selector,
    pub source_region: Selector,
    pub source_text: Selector,
    pub processed_attribute: String,
}

impl BlockLayout {
    pub fn from_config(config: &Config) -> Result<Self, SelectorError> {
        let selectors = &config.selectors;
        Ok(Self {
            block: Selector::parse(&selectors.block)?,
            header: Selector::parse(&selectors.header)?,
            header_buttons: Selector::parse(&selectors.header_buttons)?,
            source_region: Selector::parse(&selectors.source_region)?,
            source_text: Selector::parse(&selectors.source_text)?,
            processed_attribute: config.processed_attribute.clone(),
        })
    }
}

/// Nodes bound to an attached block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachedBlock {
    pub block: BlockId,
    pub dialect: Dialect,
    /// Element whose text is the diagram source.
    pub source_text: NodeId,
    /// Region hidden while the diagram is shown.
    pub source_region: NodeId,
    /// Inserted immediately before the source region.
    pub render_target: NodeId,
    /// Inserted into the header.
    pub toggle: NodeId,
}

#[derive(Debug, Clone)]
pub struct BlockScanner {
    layout: BlockLayout,
    classifier: Classifier,
}

impl BlockScanner {
    pub fn new(layout: BlockLayout, classifier: Classifier) -> Self {
        Self { layout, classifier }
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn is_processed<D: Document + ?Sized>(&self, doc: &D, block: NodeId) -> bool {
        doc.attribute(block, &self.layout.processed_attribute).is_some()
    }

    /// Scan `scope` (inclusive) and attach every newly classified block.
    ///
    /// Failures are per block: they are logged and the scan moves on.
    pub fn scan<D: Document + ?Sized>(&self, doc: &mut D, scope: NodeId) -> Vec<AttachedBlock> {
        let mut candidates = Vec::new();
        if self.layout.block.matches(&*doc, scope) {
            candidates.push(scope);
        }
        candidates.extend(doc.query_all(scope, &self.layout.block));

        let mut attached = Vec::new();
        for block in candidates {
            match self.try_attach(doc, block) {
                Ok(Some(parts)) => attached.push(parts),
                Ok(None) => {}
                Err(e) => crate::debug_warn!("SCANNER", "{e}"),
            }
        }
        attached
    }

    /// Full-document scan.
    pub fn scan_document<D: Document + ?Sized>(&self, doc: &mut D) -> Vec<AttachedBlock> {
        let root = doc.root();
        self.scan(doc, root)
    }

    /// Attach a single block if it is unprocessed and classifies.
    ///
    /// `Ok(None)` means the block was already processed or is not (yet) a
    /// diagram. The processed marker is set last, so a block missing a region
    /// or whose controls could not be inserted stays eligible for a later scan.
    pub fn try_attach<D: Document + ?Sized>(
        &self,
        doc: &mut D,
        block: BlockId,
    ) -> Result<Option<AttachedBlock>, ScanError> {
        if self.is_processed(&*doc, block) {
            return Ok(None);
        }

        let source_region = doc.query(block, &self.layout.source_region);
        let source_text = source_region
            .and_then(|region| {
                if self.layout.source_text.matches(&*doc, region) {
                    Some(region)
                } else {
                    doc.query(region, &self.layout.source_text)
                }
            })
            .or_else(|| doc.query(block, &self.layout.source_text));

        let mut annotations: Vec<&str> = Vec::new();
        for node in [source_region, source_text].into_iter().flatten() {
            annotations.extend(doc.classes(node));
        }
        let text = source_text
            .or(source_region)
            .map(|node| doc.text_content(node))
            .unwrap_or_default();

        let Some(dialect) = self.classifier.classify(&annotations, &text) else {
            crate::debug_trace!("SCANNER", "Block {} not classified yet", block);
            return Ok(None);
        };

        let header = doc
            .query(block, &self.layout.header)
            .ok_or(ScanError::MissingStructure {
                block,
                part: "header",
            })?;
        let source_region = source_region.ok_or(ScanError::MissingStructure {
            block,
            part: "source region",
        })?;
        let source_text = source_text.ok_or(ScanError::MissingStructure {
            block,
            part: "source text element",
        })?;
        let region_parent = doc.parent(source_region).ok_or(ScanError::MissingStructure {
            block,
            part: "source region parent",
        })?;

        let toggle = doc.create_element("button", &[TOGGLE_CLASS]);
        let render_target = doc.create_element("div", &[RENDER_TARGET_CLASS]);
        let inserted = self
            .insert_controls(&mut *doc, header, toggle, render_target, source_region, region_parent)
            .and_then(|()| doc.set_attribute(block, &self.layout.processed_attribute, "true"));
        if let Err(e) = inserted {
            // Undo the partial insertion; the original error is reported.
            let _ = doc.remove(toggle);
            let _ = doc.remove(render_target);
            return Err(e.into());
        }

        crate::debug_info!("SCANNER", "Attached {} block {}", dialect, block);
        Ok(Some(AttachedBlock {
            block,
            dialect,
            source_text,
            source_region,
            render_target,
            toggle,
        }))
    }

    fn insert_controls<D: Document + ?Sized>(
        &self,
        doc: &mut D,
        header: NodeId,
        toggle: NodeId,
        render_target: NodeId,
        source_region: NodeId,
        region_parent: NodeId,
    ) -> Result<(), DocumentError> {
        match doc.query(header, &self.layout.header_buttons) {
            Some(buttons) => {
                let first = doc.first_child(buttons);
                doc.insert_before(buttons, toggle, first)?;
            }
            None => doc.append_child(header, toggle)?,
        }
        doc.set_hidden(render_target, true)?;
        doc.insert_before(region_parent, render_target, Some(source_region))
    }

    /// Undo [`try_attach`](Self::try_attach) for a deregistered block.
    ///
    /// The toggle and render target are removed, the source region is shown
    /// again and the processed marker is cleared, so the block is attached
    /// afresh if the host puts it back into the document.
    pub fn release<D: Document + ?Sized>(
        &self,
        doc: &mut D,
        parts: &AttachedBlock,
    ) -> Result<(), DocumentError> {
        doc.remove(parts.toggle)?;
        doc.remove(parts.render_target)?;
        doc.set_hidden(parts.source_region, false)?;
        doc.remove_attribute(parts.block, &self.layout.processed_attribute)?;
        crate::debug_log!("SCANNER", "Released block {}", parts.block);
        Ok(())
    }
}
