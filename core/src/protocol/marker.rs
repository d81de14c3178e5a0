//! Parser for protocol lines embedded in the game log.
//!
//! A protocol line carries a fixed marker followed by
//! `KIND:UUID:INDEX:PAYLOAD`, e.g.
//!
//! ```text
//! [4821.337] Replay: CIV5_DATA_JSON::CHUNK:6f1c2a:3:"turn":12,"players":[
//! ```
//!
//! The payload runs to end of line and may contain colons itself.

use memchr::memmem;

/// One classified log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerLine<'a> {
    Start { uuid: &'a str },
    Chunk { uuid: &'a str, payload: &'a str },
    End { uuid: &'a str },
    /// No marker anywhere in the line: ordinary log noise.
    NotMarked,
    /// Marker present but the fields after it are unusable.
    Malformed,
}

/// Locates and splits protocol lines for a given marker.
#[derive(Debug, Clone)]
pub struct MarkerParser {
    marker: String,
}

impl MarkerParser {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn parse<'a>(&self, line: &'a str) -> MarkerLine<'a> {
        let Some(pos) = memmem::find(line.as_bytes(), self.marker.as_bytes()) else {
            return MarkerLine::NotMarked;
        };
        parse_fields(&line[pos + self.marker.len()..]).unwrap_or(MarkerLine::Malformed)
    }
}

fn parse_fields(rest: &str) -> Option<MarkerLine<'_>> {
    let mut fields = rest.splitn(4, ':');
    let kind = fields.next().filter(|k| is_word(k))?;
    let uuid = fields.next().filter(|u| !u.is_empty())?;
    let _index = fields.next().filter(|i| !i.is_empty())?;
    let payload = fields.next()?;

    match kind {
        "START" => Some(MarkerLine::Start { uuid }),
        "CHUNK" => Some(MarkerLine::Chunk { uuid, payload }),
        "END" => Some(MarkerLine::End { uuid }),
        _ => None,
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}
