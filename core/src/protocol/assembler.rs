use super::marker::{MarkerLine, MarkerParser};
use hashbrown::HashMap;

/// What feeding one line did to the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Not a protocol line, or a CHUNK/END for a message we never saw start.
    Ignored,
    /// A message was opened or extended.
    Buffered,
    /// END of a known message; the concatenated payload.
    Completed(String),
    /// Marked line that could not be split into its fields.
    Malformed,
}

/// Reassembles chunked messages, keyed by message UUID.
///
/// Fragments are concatenated in arrival order; the protocol index field is
/// not used for ordering.
#[derive(Debug)]
pub struct ChunkAssembler {
    parser: MarkerParser,
    buffers: HashMap<String, Vec<String>>,
    malformed_lines: u64,
}

impl ChunkAssembler {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            parser: MarkerParser::new(marker),
            buffers: HashMap::new(),
            malformed_lines: 0,
        }
    }

    pub fn feed(&mut self, line: &str) -> LineOutcome {
        match self.parser.parse(line) {
            MarkerLine::NotMarked => LineOutcome::Ignored,
            MarkerLine::Malformed => {
                self.malformed_lines += 1;
                tracing::warn!(line = %preview(line), "Protocol line does not match KIND:UUID:INDEX:PAYLOAD");
                LineOutcome::Malformed
            }
            MarkerLine::Start { uuid } => {
                if self.buffers.insert(uuid.to_string(), Vec::new()).is_some() {
                    tracing::debug!(uuid, "Duplicate START, discarding earlier fragments");
                }
                LineOutcome::Buffered
            }
            MarkerLine::Chunk { uuid, payload } => match self.buffers.get_mut(uuid) {
                Some(fragments) => {
                    fragments.push(payload.to_string());
                    LineOutcome::Buffered
                }
                None => LineOutcome::Ignored,
            },
            MarkerLine::End { uuid } => match self.buffers.remove(uuid) {
                Some(fragments) => LineOutcome::Completed(fragments.concat()),
                None => LineOutcome::Ignored,
            },
        }
    }

    /// Drop every in-flight message, e.g. after the log was truncated.
    pub fn reset(&mut self) {
        if !self.buffers.is_empty() {
            tracing::debug!(count = self.buffers.len(), "Discarding in-flight messages");
        }
        self.buffers.clear();
    }

    pub fn in_flight(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_open(&self, uuid: &str) -> bool {
        self.buffers.contains_key(uuid)
    }

    pub fn malformed_lines(&self) -> u64 {
        self.malformed_lines
    }
}

fn preview(line: &str) -> &str {
    match line.char_indices().nth(100) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
