//! Per-block display state machine.

use std::time::Duration;

use super::markup::{
    self, LABEL_SHOW_CODE, LABEL_SHOW_DIAGRAM, SURFACE_BACKGROUND, TITLE_SHOW_CODE,
    TITLE_SHOW_DIAGRAM,
};
use crate::diagrams::document::Document;
use crate::diagrams::error::DocumentError;
use crate::diagrams::scanner::AttachedBlock;
use crate::diagrams::timer::{TimerHandle, TimerKind, TimerQueue};
use crate::diagrams::types::{BlockId, Dialect, DisplayState, RenderFailure, RenderResult, SvgArtifact};

/// Latest render outcome in graph mode.
#[derive(Debug, Clone)]
enum Outcome {
    Loading,
    Rendered(SvgArtifact),
    Failed {
        failure: RenderFailure,
        revealed: bool,
    },
}

/// What the block should look like right now.
#[derive(Debug, Clone, PartialEq, Eq)]
struct View {
    target_hidden: bool,
    source_hidden: bool,
    /// `None` leaves the render target's content untouched.
    content: Option<(String, Option<&'static str>)>,
    toggle_label: &'static str,
    toggle_title: &'static str,
    error_marked: bool,
}

/// Last values written to the document, so unchanged parts are skipped.
#[derive(Debug, Clone, Default)]
struct Painted {
    target_hidden: Option<bool>,
    source_hidden: Option<bool>,
    markup: Option<String>,
    background: Option<Option<&'static str>>,
    toggle_label: Option<&'static str>,
    toggle_title: Option<&'static str>,
    error_marked: Option<bool>,
}

/// Tracks one block through Loading, Rendered, Error and SourceView.
///
/// Render outcomes never change the graph/source mode; only the user does.
/// Requests carry a sequence number and only the completion for the latest
/// request is applied.
#[derive(Debug)]
pub struct DisplayMachine {
    block: BlockId,
    dialect: Dialect,
    grace_window: Duration,
    graph_mode: bool,
    outcome: Outcome,
    last_good: Option<SvgArtifact>,
    latest_requested: u64,
    grace: Option<TimerHandle>,
    painted: Painted,
}

impl DisplayMachine {
    pub fn new(block: BlockId, dialect: Dialect, grace_window: Duration) -> Self {
        Self {
            block,
            dialect,
            grace_window,
            graph_mode: true,
            outcome: Outcome::Loading,
            last_good: None,
            latest_requested: 0,
            grace: None,
            painted: Painted::default(),
        }
    }

    pub fn state(&self) -> DisplayState {
        if !self.graph_mode {
            return DisplayState::SourceView;
        }
        match &self.outcome {
            Outcome::Loading => DisplayState::Loading,
            Outcome::Rendered(artifact) => DisplayState::Rendered(artifact.clone()),
            Outcome::Failed { failure, revealed } => DisplayState::Error {
                message: failure.message.clone(),
                line: failure.line,
                revealed: *revealed,
            },
        }
    }

    pub fn is_graph_mode(&self) -> bool {
        self.graph_mode
    }

    pub fn latest_requested(&self) -> u64 {
        self.latest_requested
    }

    pub fn grace_pending(&self) -> bool {
        self.grace.is_some()
    }

    /// Most recent successful artifact, even if a newer outcome is pending.
    pub fn last_artifact(&self) -> Option<&SvgArtifact> {
        self.last_good.as_ref()
    }

    fn cancel_grace(&mut self, timers: &mut TimerQueue<TimerKind>) {
        if let Some(handle) = self.grace.take() {
            timers.cancel(handle);
        }
    }

    /// A new render was issued; returns its sequence number.
    ///
    /// An unrevealed error is dropped along with its grace timer. A revealed
    /// error stays on screen until the new result arrives.
    pub fn begin_request(&mut self, timers: &mut TimerQueue<TimerKind>) -> u64 {
        self.latest_requested += 1;
        self.cancel_grace(timers);
        if !matches!(self.outcome, Outcome::Failed { revealed: true, .. }) {
            self.outcome = Outcome::Loading;
        }
        self.latest_requested
    }

    /// Apply a completed render. Returns false when `seq` is stale.
    pub fn complete(
        &mut self,
        seq: u64,
        result: RenderResult,
        timers: &mut TimerQueue<TimerKind>,
        now: Duration,
    ) -> bool {
        if seq != self.latest_requested {
            crate::debug_log!(
                "DISPLAY",
                "Block {} discarding stale result {} (latest {})",
                self.block,
                seq,
                self.latest_requested
            );
            return false;
        }

        self.cancel_grace(timers);
        match result {
            Ok(artifact) => {
                self.last_good = Some(artifact.clone());
                self.outcome = Outcome::Rendered(artifact);
            }
            Err(failure) => {
                let already_revealed = matches!(self.outcome, Outcome::Failed { revealed: true, .. });
                if !already_revealed {
                    self.grace = Some(timers.schedule(
                        now + self.grace_window,
                        TimerKind::ErrorGrace(self.block),
                    ));
                }
                crate::debug_log!("DISPLAY", "Block {} render failed: {}", self.block, failure.message);
                self.outcome = Outcome::Failed {
                    failure,
                    revealed: already_revealed,
                };
            }
        }
        true
    }

    /// The grace timer `handle` fired. Returns true if an error was revealed.
    pub fn grace_expired(&mut self, handle: TimerHandle) -> bool {
        if self.grace != Some(handle) {
            return false;
        }
        self.grace = None;
        if let Outcome::Failed { revealed, .. } = &mut self.outcome {
            *revealed = true;
            crate::debug_info!("DISPLAY", "Block {} revealing render error", self.block);
            return true;
        }
        false
    }

    /// User toggle between graph and source mode.
    pub fn toggle(&mut self) {
        self.graph_mode = !self.graph_mode;
    }

    /// View-source affordance of the error panel. Forces source mode whatever
    /// the render state; returns false if already in source mode.
    pub fn view_source(&mut self) -> bool {
        if !self.graph_mode {
            return false;
        }
        self.graph_mode = false;
        true
    }

    /// Cancel timers owned by this machine (deregistration).
    pub fn cancel(&mut self, timers: &mut TimerQueue<TimerKind>) {
        self.cancel_grace(timers);
    }

    fn view(&self) -> View {
        if !self.graph_mode {
            return View {
                target_hidden: true,
                source_hidden: false,
                content: None,
                toggle_label: LABEL_SHOW_DIAGRAM,
                toggle_title: TITLE_SHOW_DIAGRAM,
                error_marked: false,
            };
        }

        let fallback = || match &self.last_good {
            Some(artifact) => (artifact.svg.clone(), Some(SURFACE_BACKGROUND)),
            None => (markup::loading_markup(self.dialect), None),
        };
        let (content, error_marked) = match &self.outcome {
            Outcome::Rendered(artifact) => ((artifact.svg.clone(), Some(SURFACE_BACKGROUND)), false),
            Outcome::Failed {
                failure,
                revealed: true,
            } => ((markup::error_markup(failure), None), true),
            Outcome::Loading | Outcome::Failed { revealed: false, .. } => (fallback(), false),
        };
        View {
            target_hidden: false,
            source_hidden: true,
            content: Some(content),
            toggle_label: LABEL_SHOW_CODE,
            toggle_title: TITLE_SHOW_CODE,
            error_marked,
        }
    }

    /// Write the current view into the document, touching only what changed.
    ///
    /// Returns whether anything was written.
    pub fn paint<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        parts: &AttachedBlock,
    ) -> Result<bool, DocumentError> {
        let view = self.view();
        let mut wrote = false;

        if let Some((markup, background)) = view.content {
            if self.painted.markup.as_deref() != Some(markup.as_str()) {
                doc.set_inner_markup(parts.render_target, &markup)?;
                self.painted.markup = Some(markup);
                wrote = true;
            }
            if self.painted.background != Some(background) {
                doc.set_background(parts.render_target, background)?;
                self.painted.background = Some(background);
                wrote = true;
            }
        }
        if self.painted.target_hidden != Some(view.target_hidden) {
            doc.set_hidden(parts.render_target, view.target_hidden)?;
            self.painted.target_hidden = Some(view.target_hidden);
            wrote = true;
        }
        if self.painted.source_hidden != Some(view.source_hidden) {
            doc.set_hidden(parts.source_region, view.source_hidden)?;
            self.painted.source_hidden = Some(view.source_hidden);
            wrote = true;
        }
        if self.painted.toggle_label != Some(view.toggle_label) {
            doc.set_text(parts.toggle, view.toggle_label)?;
            self.painted.toggle_label = Some(view.toggle_label);
            wrote = true;
        }
        if self.painted.toggle_title != Some(view.toggle_title) {
            doc.set_attribute(parts.toggle, "title", view.toggle_title)?;
            self.painted.toggle_title = Some(view.toggle_title);
            wrote = true;
        }
        if self.painted.error_marked != Some(view.error_marked) {
            let value = if view.error_marked { "true" } else { "false" };
            doc.set_attribute(parts.toggle, "data-error", value)?;
            self.painted.error_marked = Some(view.error_marked);
            wrote = true;
        }
        Ok(wrote)
    }
}
