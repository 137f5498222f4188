//! Render pipeline: dispatches a source to its dialect's back-end and
//! normalises the outcome into a [`RenderResult`].
//!
//! # Sub-modules
//!
//! - [`mermaid`] — in-process layout engine contract and the `mermaid-rs-renderer` engine
//! - [`plantuml`] — text encoding, HTTP transport contract and the remote client
//! - [`executor`] — inline, Tokio and manually-resolved job executors

pub mod executor;
pub mod mermaid;
pub mod plantuml;

use std::sync::Arc;

use chat_diagrams_config::Config;

use super::error::RenderError;
use super::types::{Dialect, RenderFailure, RenderResult, SvgArtifact};

pub use executor::{
    InlineExecutor, ManualExecutor, RenderCompletion, RenderExecutor, RenderJob, TokioExecutor,
};
#[cfg(feature = "mermaid")]
pub use mermaid::MermaidLayoutEngine;
pub use mermaid::LayoutEngine;
pub use plantuml::{HttpResponse, HttpTransport, PlantUmlClient, UreqTransport};

/// Back-ends for each dialect. A missing back-end fails renders of that dialect.
#[derive(Clone, Default)]
pub struct RenderPipeline {
    layout_engine: Option<Arc<dyn LayoutEngine>>,
    plantuml: Option<PlantUmlClient>,
}

impl RenderPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout_engine(mut self, engine: Arc<dyn LayoutEngine>) -> Self {
        self.layout_engine = Some(engine);
        self
    }

    pub fn with_plantuml(mut self, client: PlantUmlClient) -> Self {
        self.plantuml = Some(client);
        self
    }

    /// Production back-ends for every enabled dialect.
    pub fn from_config(config: &Config) -> Self {
        let mut pipeline = Self::new();

        #[cfg(feature = "mermaid")]
        {
            if config.mermaid.enabled {
                let engine = MermaidLayoutEngine::new(&config.mermaid);
                pipeline = pipeline.with_layout_engine(Arc::new(engine));
            }
        }

        if config.plantuml.enabled {
            let transport = Arc::new(UreqTransport::new(config.plantuml_timeout()));
            pipeline = pipeline.with_plantuml(PlantUmlClient::new(&config.plantuml.server, transport));
        }
        pipeline
    }

    pub fn supports(&self, dialect: Dialect) -> bool {
        match dialect {
            Dialect::Mermaid => self.layout_engine.is_some(),
            Dialect::PlantUml => self.plantuml.is_some(),
        }
    }

    /// Render with the typed error preserved.
    pub fn try_render(&self, dialect: Dialect, source: &str) -> Result<SvgArtifact, RenderError> {
        match dialect {
            Dialect::Mermaid => {
                let engine = self
                    .layout_engine
                    .as_deref()
                    .ok_or(RenderError::Unavailable(dialect))?;
                mermaid::render_mermaid(engine, source)
            }
            Dialect::PlantUml => self
                .plantuml
                .as_ref()
                .ok_or(RenderError::Unavailable(dialect))?
                .render(source),
        }
    }

    /// Render and normalise failures for display.
    pub fn render(&self, dialect: Dialect, source: &str) -> RenderResult {
        self.try_render(dialect, source).map_err(|e| {
            crate::debug_log!("PIPELINE", "{} render failed: {}", dialect, e);
            RenderFailure::from(e)
        })
    }
}
