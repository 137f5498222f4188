//! Remote PlantUML back-end.
//!
//! The source is raw-DEFLATE compressed and written in PlantUML's URL-safe
//! 64-character alphabet, then fetched once from `<server>/svg/<encoded>`.

use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use flate2::Compression;
use flate2::write::DeflateEncoder;

use crate::diagrams::error::RenderError;
use crate::diagrams::types::{Dialect, SvgArtifact};

/// Default public PlantUML server.
pub const DEFAULT_PLANTUML_SERVER: &str = "https://www.plantuml.com/plantuml";

const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_";

/// Encode bytes three at a time into four alphabet characters, zero padded.
fn encode64(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b1 = chunk[0];
        let b2 = chunk.get(1).copied().unwrap_or(0);
        let b3 = chunk.get(2).copied().unwrap_or(0);
        let sextets = [
            b1 >> 2,
            ((b1 & 0x3) << 4) | (b2 >> 4),
            ((b2 & 0xF) << 2) | (b3 >> 6),
            b3 & 0x3F,
        ];
        for s in sextets {
            out.push(ALPHABET[(s & 0x3F) as usize] as char);
        }
    }
    out
}

/// Deterministic PlantUML text encoding of `source`.
pub fn encode(source: &str) -> std::io::Result<String> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(source.as_bytes())?;
    let compressed = encoder.finish()?;
    Ok(encode64(&compressed))
}

/// Minimal response view needed for validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

/// Single-request HTTP contract for the remote service.
///
/// Non-success statuses are returned as responses; `Err` is reserved for
/// requests that produced no response at all.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, String>;
}

/// Production transport over a native-tls `ureq` agent.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: crate::http::agent(timeout),
        }
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, String> {
        let response = self.agent.get(url).call().map_err(|e| e.to_string())?;
        let status = response.status();
        let reason = status.canonical_reason().unwrap_or_default().to_string();
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| e.to_string())?;
        Ok(HttpResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}

/// Renders PlantUML sources through a remote server.
#[derive(Clone)]
pub struct PlantUmlClient {
    server: String,
    transport: Arc<dyn HttpTransport>,
}

impl PlantUmlClient {
    pub fn new(server: &str, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            server: server.trim().trim_end_matches('/').to_string(),
            transport,
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn url_for(&self, source: &str) -> Result<String, RenderError> {
        let encoded = encode(source).map_err(|e| RenderError::Transport(e.to_string()))?;
        Ok(format!("{}/svg/{}", self.server, encoded))
    }

    /// One request, no retries.
    pub fn render(&self, source: &str) -> Result<SvgArtifact, RenderError> {
        let url = self.url_for(source)?;
        crate::debug_log!("PIPELINE", "PlantUML GET {url}");

        // ureq may panic if the TLS provider isn't available at runtime.
        let response = panic::catch_unwind(AssertUnwindSafe(|| self.transport.get(&url)))
            .map_err(|_| {
                RenderError::Panicked(Dialect::PlantUml, "HTTP transport panicked".to_string())
            })?
            .map_err(RenderError::Transport)?;

        if !(200..300).contains(&response.status) {
            return Err(RenderError::HttpStatus {
                status: response.status,
                reason: response.reason,
            });
        }
        if response.body.trim().is_empty() || !response.body.contains("<svg") {
            return Err(RenderError::InvalidResponse);
        }
        crate::debug_info!(
            "PIPELINE",
            "PlantUML SVG received ({} bytes)",
            response.body.len()
        );
        Ok(SvgArtifact {
            dialect: Dialect::PlantUml,
            svg: response.body,
        })
    }
}
