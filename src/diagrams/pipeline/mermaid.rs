//! In-process Mermaid back-end.

use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::diagrams::error::RenderError;
use crate::diagrams::types::{Dialect, SvgArtifact};

/// Layout engine contract: source in, SVG document out.
///
/// `id` is unique per render and should become the root element's id.
pub trait LayoutEngine: Send + Sync {
    fn render(&self, id: &str, source: &str) -> Result<String, String>;
}

static SVG_ID_ATTR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"\sid\s*=\s*("[^"]*"|'[^']*')"#).ok());

/// Set `id` on the root `<svg>` element, replacing any existing id.
pub fn stamp_svg_id(svg: &str, id: &str) -> String {
    let Some(start) = svg.find("<svg") else {
        return svg.to_string();
    };
    let tag_end = svg[start..].find('>').map_or(svg.len(), |i| start + i);
    let tag = &svg[start..tag_end];
    let stamped = format!(" id=\"{id}\"");

    let existing = SVG_ID_ATTR.as_ref().and_then(|re| re.find(tag));
    match existing {
        Some(m) => format!(
            "{}{}{}{}",
            &svg[..start],
            &tag[..m.start()],
            stamped,
            &svg[start + m.end()..]
        ),
        None => format!("{}<svg{}{}", &svg[..start], stamped, &svg[start + 4..]),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Render Mermaid `source` with a fresh `mermaid-<uuid>` id.
///
/// Engine panics are caught and reported as [`RenderError::Panicked`].
pub fn render_mermaid(engine: &dyn LayoutEngine, source: &str) -> Result<SvgArtifact, RenderError> {
    let id = format!("mermaid-{}", Uuid::new_v4());
    let result = panic::catch_unwind(AssertUnwindSafe(|| engine.render(&id, source)));

    match result {
        Ok(Ok(svg)) if svg.contains("<svg") => {
            crate::debug_info!("PIPELINE", "Mermaid SVG generated ({} bytes)", svg.len());
            Ok(SvgArtifact {
                dialect: Dialect::Mermaid,
                svg: stamp_svg_id(&svg, &id),
            })
        }
        Ok(Ok(_)) => Err(RenderError::Layout(
            "Mermaid engine produced no SVG output".to_string(),
        )),
        Ok(Err(message)) => Err(RenderError::Layout(message)),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            crate::debug_error!("PIPELINE", "Mermaid engine panicked: {message}");
            Err(RenderError::Panicked(Dialect::Mermaid, message))
        }
    }
}

/// Layout engine backed by `mermaid-rs-renderer`, configured once.
#[cfg(feature = "mermaid")]
pub struct MermaidLayoutEngine {
    font_family: Option<String>,
    background: Option<String>,
}

#[cfg(feature = "mermaid")]
impl MermaidLayoutEngine {
    pub fn new(config: &chat_diagrams_config::MermaidConfig) -> Self {
        if config.theme != "modern" {
            crate::debug_warn!(
                "PIPELINE",
                "Unknown Mermaid theme '{}'; using 'modern'",
                config.theme
            );
        }
        Self {
            font_family: config.font_family.clone(),
            background: config.background.clone(),
        }
    }

    fn theme(&self) -> mermaid_rs_renderer::Theme {
        let mut theme = mermaid_rs_renderer::Theme::modern();
        if let Some(font_family) = &self.font_family {
            theme.font_family = font_family.clone();
        }
        if let Some(background) = &self.background {
            theme.background = background.clone();
        }
        theme
    }
}

#[cfg(feature = "mermaid")]
impl LayoutEngine for MermaidLayoutEngine {
    fn render(&self, _id: &str, source: &str) -> Result<String, String> {
        let opts = mermaid_rs_renderer::RenderOptions {
            theme: self.theme(),
            layout: mermaid_rs_renderer::LayoutConfig::default(),
        };
        mermaid_rs_renderer::render_with_options(source, opts).map_err(|e| e.to_string())
    }
}
