//! Tests for the engine event loop.

use std::sync::Arc;
use std::time::Duration;

use chat_diagrams_config::Config;

use super::{Engine, UserAction};
use crate::diagrams::document::{Document, MemoryDocument};
use crate::diagrams::pipeline::{
    InlineExecutor, ManualExecutor, PlantUmlClient, RenderExecutor, RenderPipeline,
};
use crate::diagrams::pipeline::plantuml::DEFAULT_PLANTUML_SERVER;
use crate::diagrams::scanner::AttachedBlock;
use crate::diagrams::testing::{BlockBuilder, StubLayoutEngine, StubTransport, svg};
use crate::diagrams::timer::ManualClock;
use crate::diagrams::types::{BlockId, DisplayState};
use crate::diagrams::watcher::ChangeFeed;

// -----------------------------------------------------------------------
// Harness
// -----------------------------------------------------------------------

struct Harness {
    engine: Engine<MemoryDocument>,
    clock: ManualClock,
    layout: Arc<StubLayoutEngine>,
}

impl Harness {
    fn inline(debounce_ms: u64, grace_ms: u64) -> Self {
        let layout = StubLayoutEngine::new();
        let pipeline = RenderPipeline::new()
            .with_layout_engine(layout.clone())
            .with_plantuml(PlantUmlClient::new(
                DEFAULT_PLANTUML_SERVER,
                StubTransport::ok("<svg></svg>"),
            ));
        let executor = Box::new(InlineExecutor::new(Arc::new(pipeline)));
        let config = Config::default().with_timing(debounce_ms, grace_ms, 60_000);
        Self::build(config, executor, layout)
    }

    fn build(config: Config, executor: Box<dyn RenderExecutor>, layout: Arc<StubLayoutEngine>) -> Self {
        let clock = ManualClock::new();
        let engine = Engine::new(
            MemoryDocument::new(),
            &config,
            executor,
            Arc::new(clock.clone()),
        )
        .unwrap();
        Self {
            engine,
            clock,
            layout,
        }
    }

    fn doc(&mut self) -> &mut MemoryDocument {
        self.engine.document_mut()
    }

    fn advance(&mut self, ms: u64) {
        self.clock.advance(Duration::from_millis(ms));
        self.engine.settle();
    }

    fn calls(&self) -> usize {
        self.layout.calls.lock().len()
    }

    fn parts(&self, block: BlockId) -> AttachedBlock {
        self.engine.registry().get(block).unwrap().parts
    }

    fn toggle_attr(&self, block: BlockId, name: &str) -> Option<String> {
        let parts = self.parts(block);
        self.engine
            .document()
            .attribute(parts.toggle, name)
            .map(str::to_string)
    }
}

fn rendered(state: Option<DisplayState>) -> bool {
    state.is_some_and(|s| s.is_rendered())
}

// -----------------------------------------------------------------------
// Attach and initial render
// -----------------------------------------------------------------------

#[test]
fn test_start_renders_existing_block() {
    let mut h = Harness::inline(500, 2000);
    let built = BlockBuilder::new("graph TD\nA-->B").build(h.doc());
    h.engine.start();
    h.engine.settle();

    assert!(rendered(h.engine.state(built.block)));
    let parts = h.parts(built.block);
    let doc = h.engine.document();
    assert!(doc.inner_markup(parts.render_target).unwrap().contains("<svg"));
    assert!(!doc.is_hidden(parts.render_target));
    assert!(doc.is_hidden(parts.source_region));
    assert_eq!(doc.text_content(parts.toggle), "Code");
    assert_eq!(h.toggle_attr(built.block, "title").as_deref(), Some("Switch to Code View"));
    assert!(h.engine.is_idle());
}

#[test]
fn test_loading_placeholder_before_first_result() {
    let executor = ManualExecutor::new();
    let mut h = Harness::build(Config::default(), Box::new(executor.clone()), StubLayoutEngine::new());
    let built = BlockBuilder::new("@startuml\nA -> B\n@enduml").build(h.doc());
    h.engine.start();
    h.engine.settle();

    assert_eq!(h.engine.state(built.block), Some(DisplayState::Loading));
    let parts = h.parts(built.block);
    let markup = h.engine.document().inner_markup(parts.render_target).unwrap();
    assert!(markup.contains("Rendering PlantUML..."));
    assert_eq!(h.engine.in_flight(), 1);
    assert!(!h.engine.is_idle());
    assert_eq!(executor.pending().len(), 1);
}

#[test]
fn test_disabled_dialect_is_left_alone() {
    let mut config = Config::default();
    config.plantuml.enabled = false;
    let mut h = Harness::build(config, Box::new(ManualExecutor::new()), StubLayoutEngine::new());
    let built = BlockBuilder::new("@startuml\nA -> B\n@enduml").build(h.doc());
    h.engine.start();
    h.engine.settle();

    assert!(h.engine.registry().is_empty());
    assert_eq!(
        h.engine
            .document()
            .attribute(built.block, "data-diagram-renderer-processed"),
        None
    );
}

// -----------------------------------------------------------------------
// Streaming and debounce
// -----------------------------------------------------------------------

#[test]
fn test_streamed_block_renders_once_after_quiet_window() {
    for debounce in [50, 200, 500] {
        let mut h = Harness::inline(debounce, 2000);
        h.engine.start();

        let built = BlockBuilder::new("").build(h.doc());
        h.engine.settle();
        assert!(h.engine.registry().is_empty());

        h.doc().append_text(built.code, "graph TD\n").unwrap();
        h.engine.settle();
        assert!(h.engine.registry().contains(built.block));
        assert_eq!(h.calls(), 1);

        let step = debounce / 2;
        for chunk in ["A-->B\n", "B-->C\n", "C-->D"] {
            h.doc().append_text(built.code, chunk).unwrap();
            h.advance(step);
        }
        assert_eq!(h.calls(), 1, "debounce {debounce}");

        h.advance(debounce - 1);
        assert_eq!(h.calls(), 1, "debounce {debounce}");
        h.advance(1);
        assert_eq!(h.calls(), 2, "debounce {debounce}");
        assert_eq!(
            h.layout.calls.lock().last().map(String::as_str),
            Some("graph TD\nA-->B\nB-->C\nC-->D")
        );
        assert!(rendered(h.engine.state(built.block)));
        assert!(h.engine.is_idle());
    }
}

#[test]
fn test_identical_snapshot_does_not_rerender() {
    let mut h = Harness::inline(500, 2000);
    let built = BlockBuilder::new("graph TD\nA-->B").build(h.doc());
    h.engine.start();
    h.engine.settle();
    assert_eq!(h.calls(), 1);

    h.doc().set_text(built.code, "graph TD\nA-->B").unwrap();
    h.engine.settle();
    h.advance(500);
    assert_eq!(h.calls(), 1);
}

#[test]
fn test_stale_completion_is_discarded() {
    let executor = ManualExecutor::new();
    let mut h = Harness::build(
        Config::default().with_timing(100, 2000, 60_000),
        Box::new(executor.clone()),
        StubLayoutEngine::new(),
    );
    let built = BlockBuilder::new("graph TD").build(h.doc());
    h.engine.start();
    h.engine.settle();

    h.doc().append_text(built.code, "\nA-->B").unwrap();
    h.engine.settle();
    h.advance(100);
    let seqs: Vec<u64> = executor.pending().iter().map(|job| job.seq).collect();
    assert_eq!(seqs, vec![1, 2]);

    assert!(executor.resolve(built.block, 2, Ok(svg("new"))));
    h.engine.settle();
    assert_eq!(h.engine.state(built.block), Some(DisplayState::Rendered(svg("new"))));

    assert!(executor.resolve(built.block, 1, Ok(svg("old"))));
    h.engine.settle();
    assert_eq!(h.engine.state(built.block), Some(DisplayState::Rendered(svg("new"))));
    assert_eq!(h.engine.in_flight(), 0);
    assert!(h.engine.is_idle());
}

// -----------------------------------------------------------------------
// Error grace
// -----------------------------------------------------------------------

#[test]
fn test_transient_error_is_never_shown() {
    for (debounce, grace) in [(50, 200), (200, 1000), (500, 2000)] {
        let mut h = Harness::inline(debounce, grace);
        let built = BlockBuilder::new("graph TD").build(h.doc());
        h.engine.start();
        h.engine.settle();
        let first_svg = h
            .engine
            .document()
            .inner_markup(h.parts(built.block).render_target)
            .map(str::to_string);

        h.doc().append_text(built.code, "\nA!!").unwrap();
        h.engine.settle();
        h.advance(debounce);
        assert!(matches!(
            h.engine.state(built.block),
            Some(DisplayState::Error { revealed: false, .. })
        ));
        let target = h.parts(built.block).render_target;
        assert_eq!(
            h.engine.document().inner_markup(target).map(str::to_string),
            first_svg,
            "last good artifact stays visible"
        );

        h.doc().set_text(built.code, "graph TD\nA-->B").unwrap();
        h.engine.settle();
        h.advance(debounce);
        assert!(rendered(h.engine.state(built.block)));

        h.advance(grace);
        assert!(rendered(h.engine.state(built.block)));
        assert_eq!(h.toggle_attr(built.block, "data-error").as_deref(), Some("false"));
    }
}

#[test]
fn test_persistent_error_revealed_after_grace() {
    for grace in [100, 700, 2000] {
        let mut h = Harness::inline(500, grace);
        let built = BlockBuilder::new("graph TD\n!!").build(h.doc());
        h.engine.start();
        h.engine.settle();

        let target = h.parts(built.block).render_target;
        assert!(
            h.engine
                .document()
                .inner_markup(target)
                .unwrap()
                .contains("Rendering Mermaid...")
        );

        h.advance(grace - 1);
        assert!(matches!(
            h.engine.state(built.block),
            Some(DisplayState::Error { revealed: false, .. })
        ));

        h.advance(1);
        assert_eq!(
            h.engine.state(built.block),
            Some(DisplayState::Error {
                message: "Parse error on line 2: unexpected '!!'".to_string(),
                line: Some(2),
                revealed: true,
            })
        );
        let markup = h.engine.document().inner_markup(target).unwrap().to_string();
        assert!(markup.contains("Diagram Render Failed"));
        assert!(markup.contains("Line 2"));
        assert_eq!(h.toggle_attr(built.block, "data-error").as_deref(), Some("true"));
        assert!(h.engine.is_idle());
    }
}

// -----------------------------------------------------------------------
// User actions
// -----------------------------------------------------------------------

#[test]
fn test_toggle_survives_background_render() {
    let mut h = Harness::inline(200, 2000);
    let built = BlockBuilder::new("graph TD").build(h.doc());
    h.engine.start();
    h.engine.settle();
    let parts = h.parts(built.block);

    assert!(h.engine.activate_control(parts.toggle));
    assert_eq!(h.engine.state(built.block), Some(DisplayState::SourceView));
    {
        let doc = h.engine.document();
        assert!(doc.is_hidden(parts.render_target));
        assert!(!doc.is_hidden(parts.source_region));
        assert_eq!(doc.text_content(parts.toggle), "Preview");
    }

    h.doc().append_text(built.code, "\nA-->B").unwrap();
    h.engine.settle();
    h.advance(200);
    assert_eq!(h.calls(), 2);
    assert_eq!(h.engine.state(built.block), Some(DisplayState::SourceView));

    assert!(h.engine.handle_action(UserAction::Toggle(built.block)));
    assert!(rendered(h.engine.state(built.block)));
    assert_eq!(h.calls(), 2);
}

#[test]
fn test_view_source_from_revealed_error() {
    let mut h = Harness::inline(500, 100);
    let built = BlockBuilder::new("graph TD\n!!").build(h.doc());
    h.engine.start();
    h.engine.settle();

    h.advance(100);
    assert!(h.engine.state(built.block).is_some_and(|s| s.is_revealed_error()));
    assert!(h.engine.handle_action(UserAction::ViewSource(built.block)));
    assert_eq!(h.engine.state(built.block), Some(DisplayState::SourceView));
    let parts = h.parts(built.block);
    assert!(!h.engine.document().is_hidden(parts.source_region));
}

#[test]
fn test_view_source_after_panel_replaced_by_render() {
    let mut h = Harness::inline(500, 100);
    let built = BlockBuilder::new("graph TD\nA-->B").build(h.doc());
    h.engine.start();
    h.engine.settle();
    assert!(h.engine.state(built.block).is_some_and(|s| s.is_rendered()));

    assert!(h.engine.handle_action(UserAction::ViewSource(built.block)));
    assert_eq!(h.engine.state(built.block), Some(DisplayState::SourceView));
    let parts = h.parts(built.block);
    assert!(!h.engine.document().is_hidden(parts.source_region));
    assert!(h.engine.document().is_hidden(parts.render_target));
    assert!(!h.engine.handle_action(UserAction::ViewSource(built.block)));
}

#[test]
fn test_actions_on_unknown_blocks_are_ignored() {
    let mut h = Harness::inline(500, 2000);
    let built = BlockBuilder::new("plain text").build(h.doc());
    h.engine.start();
    h.engine.settle();
    assert!(!h.engine.handle_action(UserAction::Toggle(built.block)));
    assert!(!h.engine.activate_control(built.pre));
}

// -----------------------------------------------------------------------
// Removal and sweep
// -----------------------------------------------------------------------

#[test]
fn test_removed_block_cancels_pending_render() {
    let mut h = Harness::inline(500, 2000);
    let built = BlockBuilder::new("graph TD").build(h.doc());
    h.engine.start();
    h.engine.settle();

    h.doc().append_text(built.code, "\nA-->B").unwrap();
    h.engine.settle();
    assert!(!h.engine.is_idle());

    h.doc().remove(built.block).unwrap();
    h.engine.settle();
    assert!(h.engine.registry().is_empty());
    assert!(h.engine.is_idle());

    h.advance(500);
    assert_eq!(h.calls(), 1);
}

#[test]
fn test_late_result_for_removed_block_is_dropped() {
    let executor = ManualExecutor::new();
    let mut h = Harness::build(Config::default(), Box::new(executor.clone()), StubLayoutEngine::new());
    let built = BlockBuilder::new("graph TD").build(h.doc());
    h.engine.start();
    h.engine.settle();

    h.doc().remove(built.block).unwrap();
    h.engine.settle();
    assert!(executor.resolve(built.block, 1, Ok(svg("late"))));
    h.engine.settle();
    assert_eq!(h.engine.state(built.block), None);
    assert_eq!(h.engine.in_flight(), 0);
}

#[test]
fn test_sweep_picks_up_missed_block() {
    let mut h = Harness::build(
        Config::default().with_timing(500, 2000, 1000),
        Box::new(ManualExecutor::new()),
        StubLayoutEngine::new(),
    );
    h.engine.start();
    let built = BlockBuilder::new("pie\n\"A\" : 1").build(h.doc());
    h.doc().drain_changes();
    h.engine.settle();
    assert!(h.engine.registry().is_empty());

    h.advance(1000);
    assert!(h.engine.registry().contains(built.block));
    assert_eq!(h.engine.registry().len(), 1);

    h.advance(1000);
    assert_eq!(h.engine.registry().len(), 1);
}
