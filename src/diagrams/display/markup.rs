//! HTML fragments written into the render target.

use crate::diagrams::types::{Dialect, RenderFailure};

/// Label of the toggle in graph mode (switches to the code).
pub const LABEL_SHOW_CODE: &str = "Code";
/// Label of the toggle in source mode (switches to the diagram).
pub const LABEL_SHOW_DIAGRAM: &str = "Preview";
pub const TITLE_SHOW_CODE: &str = "Switch to Code View";
pub const TITLE_SHOW_DIAGRAM: &str = "Switch to Diagram View";

/// Background applied to the render target while an artifact is shown.
pub const SURFACE_BACKGROUND: &str = "var(--diagram-surface, #ffffff)";

/// Action marker on the error panel's view-source button.
pub const VIEW_SOURCE_ACTION: &str = "view-source";

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn loading_markup(dialect: Dialect) -> String {
    format!(
        "<div class=\"diagram-loading\">Rendering {}...</div>",
        dialect.display_name()
    )
}

/// Error panel with the message, the optional line hint and a view-source button.
pub fn error_markup(failure: &RenderFailure) -> String {
    let mut html = String::from(
        "<div class=\"diagram-error\"><div class=\"diagram-error-title\">Diagram Render Failed</div>",
    );
    if let Some(line) = failure.line {
        html.push_str(&format!("<div class=\"diagram-error-line\">Line {line}</div>"));
    }
    html.push_str("<pre class=\"diagram-error-message\">");
    html.push_str(&escape_html(&failure.message));
    html.push_str("</pre>");
    html.push_str(&format!(
        "<button class=\"diagram-view-source\" data-action=\"{VIEW_SOURCE_ACTION}\">View Source</button></div>"
    ));
    html
}
