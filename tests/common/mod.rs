//! Shared integration test helpers for chat-diagrams.
//!
//! Provides a host-shaped block builder, stub back-ends and an engine
//! harness driven by a virtual clock.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::{Harness, build_block};
//! ```

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chat_diagrams::config::Config;
use chat_diagrams::diagrams::document::{Document, MemoryDocument, NodeId};
use chat_diagrams::diagrams::pipeline::plantuml::DEFAULT_PLANTUML_SERVER;
use chat_diagrams::diagrams::pipeline::{
    HttpResponse, HttpTransport, InlineExecutor, LayoutEngine, PlantUmlClient, RenderExecutor,
    RenderPipeline,
};
use chat_diagrams::diagrams::{AttachedBlock, BlockId, DisplayState, Engine, ManualClock};
use parking_lot::Mutex;

/// Node ids of a block built by [`build_block`].
#[derive(Debug, Clone, Copy)]
pub struct TestBlock {
    pub block: NodeId,
    pub header: NodeId,
    pub pre: NodeId,
    pub code: NodeId,
}

/// Insert `code-block > header(.buttons) + pre > code` under `parent`.
pub fn build_block(doc: &mut MemoryDocument, parent: NodeId, text: &str) -> TestBlock {
    let block = doc.element("code-block", &[]);
    let header = doc.element("div", &["code-block-decoration", "header-formatted"]);
    let buttons = doc.element("div", &["buttons"]);
    let copy = doc.element("button", &["copy"]);
    doc.append_child(buttons, copy).unwrap();
    doc.append_child(header, buttons).unwrap();
    let pre = doc.element("pre", &[]);
    let code = doc.element("code", &[]);
    if !text.is_empty() {
        doc.append_text(code, text).unwrap();
    }
    doc.append_child(pre, code).unwrap();
    doc.append_child(block, header).unwrap();
    doc.append_child(block, pre).unwrap();
    doc.append_child(parent, block).unwrap();
    TestBlock {
        block,
        header,
        pre,
        code,
    }
}

/// Layout engine failing on `!!` and otherwise echoing the source.
#[derive(Default)]
pub struct EchoLayout {
    pub calls: Mutex<Vec<String>>,
}

impl LayoutEngine for EchoLayout {
    fn render(&self, id: &str, source: &str) -> Result<String, String> {
        self.calls.lock().push(source.to_string());
        if source.contains("!!") {
            return Err(format!("Parse error on line {}: unexpected '!!'", source.lines().count()));
        }
        Ok(format!("<svg id=\"{id}\"><desc>{}</desc></svg>", source.lines().count()))
    }
}

/// Transport returning one canned response.
pub struct CannedTransport {
    pub response: Result<HttpResponse, String>,
    pub urls: Mutex<Vec<String>>,
}

impl CannedTransport {
    pub fn status(status: u16, reason: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(HttpResponse {
                status,
                reason: reason.to_string(),
                body: String::new(),
            }),
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn svg() -> Arc<Self> {
        Arc::new(Self {
            response: Ok(HttpResponse {
                status: 200,
                reason: "OK".to_string(),
                body: "<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>".to_string(),
            }),
            urls: Mutex::new(Vec::new()),
        })
    }
}

impl HttpTransport for CannedTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, String> {
        self.urls.lock().push(url.to_string());
        self.response.clone()
    }
}

/// Engine over a `MemoryDocument` with a virtual clock.
pub struct Harness {
    pub engine: Engine<MemoryDocument>,
    pub clock: ManualClock,
    pub layout: Arc<EchoLayout>,
    pub transport: Arc<CannedTransport>,
}

impl Harness {
    /// Inline rendering with the given windows.
    pub fn new(debounce_ms: u64, grace_ms: u64, transport: Arc<CannedTransport>) -> Self {
        let layout = Arc::new(EchoLayout::default());
        let pipeline = RenderPipeline::new()
            .with_layout_engine(layout.clone())
            .with_plantuml(PlantUmlClient::new(DEFAULT_PLANTUML_SERVER, transport.clone()));
        let executor = InlineExecutor::new(Arc::new(pipeline));
        let config = Config::default().with_timing(debounce_ms, grace_ms, 2000);
        Self::with_executor(config, Box::new(executor), layout, transport)
    }

    pub fn with_executor(
        config: Config,
        executor: Box<dyn RenderExecutor>,
        layout: Arc<EchoLayout>,
        transport: Arc<CannedTransport>,
    ) -> Self {
        let clock = ManualClock::new();
        let mut engine = Engine::new(
            MemoryDocument::new(),
            &config,
            executor,
            Arc::new(clock.clone()),
        )
        .unwrap();
        engine.start();
        Self {
            engine,
            clock,
            layout,
            transport,
        }
    }

    pub fn doc(&mut self) -> &mut MemoryDocument {
        self.engine.document_mut()
    }

    pub fn root(&self) -> NodeId {
        self.engine.document().root()
    }

    /// Insert a block at the document root and let the engine react.
    pub fn insert_block(&mut self, text: &str) -> TestBlock {
        let root = self.root();
        let block = build_block(self.doc(), root, text);
        self.engine.settle();
        block
    }

    pub fn advance(&mut self, ms: u64) {
        self.clock.advance(Duration::from_millis(ms));
        self.engine.settle();
    }

    pub fn state(&self, block: BlockId) -> Option<DisplayState> {
        self.engine.state(block)
    }

    pub fn parts(&self, block: BlockId) -> AttachedBlock {
        self.engine.registry().get(block).unwrap().parts
    }

    pub fn markup(&self, block: BlockId) -> String {
        let target = self.parts(block).render_target;
        self.engine
            .document()
            .inner_markup(target)
            .unwrap_or_default()
            .to_string()
    }

    pub fn layout_calls(&self) -> Vec<String> {
        self.layout.calls.lock().clone()
    }
}
