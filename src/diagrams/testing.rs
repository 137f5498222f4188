//! Shared test helpers for diagram pipeline unit tests.
//!
//! This module is gated with `#[cfg(test)]` and provides document builders
//! and stub back-ends used across the unit test modules. Import with:
//!
//! ```ignore
//! use crate::diagrams::testing::{BlockBuilder, attach_one, StubLayoutEngine};
//! ```

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;

use super::classifier::Classifier;
use super::document::{Document, MemoryDocument, NodeId};
use super::pipeline::{HttpResponse, HttpTransport, LayoutEngine};
use super::scanner::{AttachedBlock, BlockLayout, BlockScanner};
use super::types::{Dialect, SvgArtifact};
use chat_diagrams_config::Config;

/// Node ids of a block built by [`BlockBuilder`].
#[derive(Debug, Clone, Copy)]
pub struct BuiltBlock {
    pub block: NodeId,
    pub header: Option<NodeId>,
    pub buttons: Option<NodeId>,
    pub pre: NodeId,
    pub code: NodeId,
}

/// Builds the host's code block shape:
/// `code-block > (header > buttons > copy-button) + pre > code > text`.
pub struct BlockBuilder {
    text: String,
    header: bool,
    buttons: bool,
    code_class: Option<String>,
}

impl BlockBuilder {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            header: true,
            buttons: true,
            code_class: None,
        }
    }

    pub fn without_header(mut self) -> Self {
        self.header = false;
        self
    }

    pub fn without_buttons(mut self) -> Self {
        self.buttons = false;
        self
    }

    pub fn code_class(mut self, class: &str) -> Self {
        self.code_class = Some(class.to_string());
        self
    }

    pub fn build(self, doc: &mut MemoryDocument) -> BuiltBlock {
        let root = doc.root();
        self.build_into(doc, root)
    }

    pub fn build_into(self, doc: &mut MemoryDocument, parent: NodeId) -> BuiltBlock {
        let block = doc.element("code-block", &[]);
        let mut header = None;
        let mut buttons = None;
        if self.header {
            let h = doc.element("div", &["code-block-decoration", "header-formatted"]);
            let label = doc.element("span", &[]);
            doc.append_text(label, "diagram").unwrap();
            doc.append_child(h, label).unwrap();
            if self.buttons {
                let b = doc.element("div", &["buttons"]);
                let copy = doc.element("button", &["copy"]);
                doc.append_child(b, copy).unwrap();
                doc.append_child(h, b).unwrap();
                buttons = Some(b);
            }
            doc.append_child(block, h).unwrap();
            header = Some(h);
        }
        let pre = doc.element("pre", &[]);
        let code = doc.element("code", &[]);
        if let Some(class) = &self.code_class {
            doc.add_class(code, class).unwrap();
        }
        if !self.text.is_empty() {
            doc.append_text(code, &self.text).unwrap();
        }
        doc.append_child(pre, code).unwrap();
        doc.append_child(block, pre).unwrap();
        doc.append_child(parent, block).unwrap();
        BuiltBlock {
            block,
            header,
            buttons,
            pre,
            code,
        }
    }
}

pub fn default_scanner() -> BlockScanner {
    let config = Config::default();
    BlockScanner::new(
        BlockLayout::from_config(&config).unwrap(),
        Classifier::default(),
    )
}

/// Build one block with `text` and attach it.
pub fn attach_one(doc: &mut MemoryDocument, text: &str) -> AttachedBlock {
    let built = BlockBuilder::new(text).build(doc);
    default_scanner()
        .try_attach(doc, built.block)
        .unwrap()
        .expect("block should classify")
}

/// A recognisable Mermaid artifact.
pub fn svg(label: &str) -> SvgArtifact {
    SvgArtifact {
        dialect: Dialect::Mermaid,
        svg: format!("<svg data-label=\"{label}\"></svg>"),
    }
}

/// Layout engine that fails on sources containing `!!` and otherwise echoes
/// the source length into an SVG.
pub struct StubLayoutEngine {
    pub calls: Mutex<Vec<String>>,
}

impl StubLayoutEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
        })
    }
}

impl LayoutEngine for StubLayoutEngine {
    fn render(&self, id: &str, source: &str) -> Result<String, String> {
        self.calls.lock().push(source.to_string());
        if source.contains("!!") {
            return Err("Parse error on line 2: unexpected '!!'".to_string());
        }
        if source.contains("panic") {
            panic!("layout exploded");
        }
        Ok(format!(
            "<svg id=\"{id}\" xmlns=\"http://www.w3.org/2000/svg\"><text>{}</text></svg>",
            source.len()
        ))
    }
}

/// Transport returning a canned response and recording requested URLs.
pub struct StubTransport {
    pub response: Result<HttpResponse, String>,
    pub urls: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new(response: Result<HttpResponse, String>) -> Arc<Self> {
        Arc::new(Self {
            response,
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn ok(body: &str) -> Arc<Self> {
        Self::new(Ok(HttpResponse {
            status: 200,
            reason: "OK".to_string(),
            body: body.to_string(),
        }))
    }

    pub fn status(status: u16, reason: &str) -> Arc<Self> {
        Self::new(Ok(HttpResponse {
            status,
            reason: reason.to_string(),
            body: String::new(),
        }))
    }
}

impl HttpTransport for StubTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, String> {
        self.urls.lock().push(url.to_string());
        self.response.clone()
    }
}
