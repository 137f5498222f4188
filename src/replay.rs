//! Replaying a Markdown transcript as a streaming chat reply.
//!
//! The transcript is split into prose and fenced blocks, then written into a
//! [`MemoryDocument`] the way a chat client renders a streamed answer: a code
//! block's shell appears first, its header a moment later, and its text
//! arrives in small chunks. The engine is stepped between every mutation.
//!
//! Time is supplied by the caller through a `pause` callback so the same
//! replay runs against wall time in the binary and a virtual clock in tests.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::diagrams::document::{Document, MemoryDocument};
use crate::diagrams::engine::Engine;
use crate::diagrams::error::DocumentError;
use crate::diagrams::types::{BlockId, DisplayState};

/// Poll interval while waiting for the pipeline to go idle.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Pacing of a replay.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Characters per streamed chunk.
    pub chunk_size: usize,
    pub chunk_delay: Duration,
    /// Upper bound on the wait for outstanding renders and grace windows.
    pub idle_timeout: Duration,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            chunk_size: 24,
            chunk_delay: Duration::from_millis(40),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// One piece of a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Prose(String),
    Fence {
        /// Info string after the opening backticks, if any.
        language: Option<String>,
        body: String,
    },
}

/// Split Markdown into prose paragraphs and fenced blocks.
///
/// An unterminated fence runs to the end of the input.
pub fn parse_transcript(markdown: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut prose: Vec<&str> = Vec::new();
    let mut fence: Option<(Option<String>, Vec<&str>)> = None;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        let is_close = trimmed.starts_with("```") && trimmed.trim_start_matches('`').trim().is_empty();

        if fence.is_some() && is_close {
            if let Some((language, body)) = fence.take() {
                segments.push(Segment::Fence {
                    language,
                    body: body.join("\n"),
                });
            }
            continue;
        }
        if let Some((_, body)) = fence.as_mut() {
            body.push(line);
            continue;
        }
        match trimmed.strip_prefix("```") {
            Some(info) => {
                flush_prose(&mut prose, &mut segments);
                let language = info
                    .trim_start_matches('`')
                    .split_whitespace()
                    .next()
                    .map(str::to_string);
                fence = Some((language, Vec::new()));
            }
            None => prose.push(line),
        }
    }

    if let Some((language, body)) = fence {
        segments.push(Segment::Fence {
            language,
            body: body.join("\n"),
        });
    }
    flush_prose(&mut prose, &mut segments);
    segments
}

fn flush_prose(prose: &mut Vec<&str>, segments: &mut Vec<Segment>) {
    let text = prose.join("\n").trim().to_string();
    if !text.is_empty() {
        segments.push(Segment::Prose(text));
    }
    prose.clear();
}

/// Split `text` into chunks of at most `size` characters.
pub fn split_chunks(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    for (count, (index, _)) in text.char_indices().enumerate() {
        if count > 0 && count % size == 0 {
            chunks.push(&text[start..index]);
            start = index;
        }
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

/// Stream `segments` into the engine's document.
///
/// `pause` is called after every mutation with the delay to wait; it is
/// expected to let time pass and step the engine. Returns the code blocks
/// created, in order.
pub fn stream_segments<F>(
    engine: &mut Engine<MemoryDocument>,
    segments: &[Segment],
    options: &ReplayOptions,
    mut pause: F,
) -> Result<Vec<BlockId>, DocumentError>
where
    F: FnMut(&mut Engine<MemoryDocument>, Duration),
{
    let delay = options.chunk_delay;
    let message = {
        let doc = engine.document_mut();
        let message = doc.element("div", &["message"]);
        let root = doc.root();
        doc.append_child(root, message)?;
        message
    };
    pause(engine, delay);

    let mut blocks = Vec::new();
    for segment in segments {
        match segment {
            Segment::Prose(text) => {
                let paragraph = {
                    let doc = engine.document_mut();
                    let paragraph = doc.element("p", &[]);
                    doc.append_child(message, paragraph)?;
                    paragraph
                };
                for chunk in split_chunks(text, options.chunk_size) {
                    engine.document_mut().append_text(paragraph, chunk)?;
                    pause(engine, delay);
                }
            }
            Segment::Fence { language, body } => {
                let (block, pre, code) = {
                    let doc = engine.document_mut();
                    let block = doc.element("code-block", &[]);
                    let pre = doc.element("pre", &[]);
                    let code = match language {
                        Some(lang) => doc.element("code", &[format!("language-{lang}").as_str()]),
                        None => doc.element("code", &[]),
                    };
                    doc.append_child(pre, code)?;
                    doc.append_child(block, pre)?;
                    doc.append_child(message, block)?;
                    (block, pre, code)
                };
                crate::debug_trace!("REPLAY", "Block {} shell inserted", block);
                pause(engine, delay);

                {
                    let doc = engine.document_mut();
                    let header = doc.element("div", &["code-block-decoration", "header-formatted"]);
                    let label = doc.element("span", &[]);
                    doc.append_text(label, language.as_deref().unwrap_or("text"))?;
                    doc.append_child(header, label)?;
                    let buttons = doc.element("div", &["buttons"]);
                    let copy = doc.element("button", &["copy"]);
                    doc.append_child(buttons, copy)?;
                    doc.append_child(header, buttons)?;
                    doc.insert_before(block, header, Some(pre))?;
                }
                pause(engine, delay);

                for chunk in split_chunks(body, options.chunk_size) {
                    engine.document_mut().append_text(code, chunk)?;
                    pause(engine, delay);
                }
                blocks.push(block);
            }
        }
    }
    Ok(blocks)
}

/// Step the engine until it is idle or `timeout` of pauses have elapsed.
///
/// Returns whether the engine went idle.
pub fn run_until_idle<F>(engine: &mut Engine<MemoryDocument>, timeout: Duration, mut pause: F) -> bool
where
    F: FnMut(&mut Engine<MemoryDocument>, Duration),
{
    let mut waited = Duration::ZERO;
    loop {
        engine.step();
        if engine.is_idle() {
            return true;
        }
        if waited >= timeout {
            crate::debug_warn!(
                "REPLAY",
                "Gave up after {:?} with {} render(s) in flight",
                waited,
                engine.in_flight()
            );
            return false;
        }
        pause(engine, IDLE_POLL);
        waited += IDLE_POLL;
    }
}

/// Counts of what [`write_outputs`] produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub rendered: usize,
    pub failed: usize,
    /// Diagram blocks with no result yet.
    pub pending: usize,
    /// Code blocks that never classified as diagrams.
    pub skipped: usize,
    pub files: Vec<PathBuf>,
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rendered, {} failed, {} pending, {} skipped",
            self.rendered, self.failed, self.pending, self.skipped
        )
    }
}

/// Write each block's final SVG or error text into `dir`.
///
/// Files are named `diagram-NN-<dialect>.svg` or `.error.txt`, numbered by
/// position in `blocks`.
pub fn write_outputs(
    engine: &Engine<MemoryDocument>,
    blocks: &[BlockId],
    dir: &Path,
) -> io::Result<ReplaySummary> {
    fs::create_dir_all(dir)?;
    let mut summary = ReplaySummary::default();

    for (index, block) in blocks.iter().enumerate() {
        let Some(entry) = engine.registry().get(*block) else {
            summary.skipped += 1;
            continue;
        };
        let stem = format!("diagram-{:02}-{}", index + 1, entry.parts.dialect.tag());

        let (path, contents) = match entry.display.state() {
            DisplayState::Rendered(artifact) => {
                summary.rendered += 1;
                (dir.join(format!("{stem}.svg")), artifact.svg)
            }
            DisplayState::Error { message, line, .. } => {
                summary.failed += 1;
                let mut text = format!("{message}\n");
                if let Some(line) = line {
                    text.push_str(&format!("line: {line}\n"));
                }
                (dir.join(format!("{stem}.error.txt")), text)
            }
            DisplayState::Loading | DisplayState::SourceView => match entry.display.last_artifact() {
                Some(artifact) => {
                    summary.rendered += 1;
                    (dir.join(format!("{stem}.svg")), artifact.svg.clone())
                }
                None => {
                    summary.pending += 1;
                    continue;
                }
            },
        };

        fs::write(&path, contents)?;
        crate::debug_info!("REPLAY", "Wrote {}", path.display());
        summary.files.push(path);
    }
    Ok(summary)
}
