//! Records carried by the transport and stored in session logs.
//!
//! Only the discriminating fields are typed. Everything else in a record is
//! opaque game state and is kept verbatim (including field order) so that
//! what reaches the viewer is exactly what the game emitted.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

pub const HEADER_TYPE: &str = "HEADER";
pub const TURN_TYPE: &str = "TURN";

/// Signature assumed for a HEADER that does not carry one.
pub const UNKNOWN_SIGNATURE: &str = "unknown";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("record has no string `type` field")]
    MissingType,
    #[error("unknown record type `{0}`")]
    UnknownType(String),
    #[error("TURN record has no integer `turn` field")]
    InvalidTurn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRecord {
    pub signature: String,
    body: Map<String, Value>,
}

impl HeaderRecord {
    /// Category name -> (id -> display name) tables, if present.
    pub fn dictionary(&self) -> Option<&Map<String, Value>> {
        self.body.get("dictionary").and_then(Value::as_object)
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnRecord {
    pub turn: i64,
    body: Map<String, Value>,
}

impl TurnRecord {
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Header(HeaderRecord),
    Turn(TurnRecord),
}

impl Record {
    /// Classify an already decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let Value::Object(body) = value else {
            return Err(RecordError::NotAnObject);
        };

        let kind = body
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(RecordError::MissingType)?;

        match kind.as_str() {
            HEADER_TYPE => {
                let signature = body
                    .get("signature")
                    .and_then(Value::as_str)
                    .unwrap_or(UNKNOWN_SIGNATURE)
                    .to_string();
                Ok(Record::Header(HeaderRecord { signature, body }))
            }
            TURN_TYPE => {
                let turn = body
                    .get("turn")
                    .and_then(Value::as_i64)
                    .ok_or(RecordError::InvalidTurn)?;
                Ok(Record::Turn(TurnRecord { turn, body }))
            }
            other => Err(RecordError::UnknownType(other.to_string())),
        }
    }

    pub fn body(&self) -> &Map<String, Value> {
        match self {
            Record::Header(h) => &h.body,
            Record::Turn(t) => &t.body,
        }
    }

    /// The record as a single JSON line, without the trailing newline.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self.body())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body().serialize(serializer)
    }
}

impl Serialize for HeaderRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

impl Serialize for TurnRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}
