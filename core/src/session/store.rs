//! Durable per-game session logs.
//!
//! Layout under the replays root:
//!
//! ```text
//! replays/
//!   Washington_Standard_1718/
//!     session_1729080000000.jsonl
//!     session_1729083600000.jsonl
//! ```
//!
//! Every append opens the file, writes one line, syncs and closes it again,
//! so an interrupted process loses at most the record being written.

use crate::record::Record;
use crate::session::GameIdentity;
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SESSION_PREFIX: &str = "session_";
pub const SESSION_EXTENSION: &str = "jsonl";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create game directory {path:?}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("failed to create session file {path:?}: {source}")]
    CreateFile { path: PathBuf, source: io::Error },
    #[error("failed to append to {path:?}: {source}")]
    Append { path: PathBuf, source: io::Error },
    #[error("failed to serialize record for {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Source of session start stamps, in Unix milliseconds.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Creates session files under the replays root.
#[derive(Debug)]
pub struct SessionStore<C: Clock = SystemClock> {
    root: PathBuf,
    clock: C,
    last_stamp: Option<i64>,
}

impl SessionStore<SystemClock> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_clock(root, SystemClock)
    }
}

impl<C: Clock> SessionStore<C> {
    pub fn with_clock(root: impl Into<PathBuf>, clock: C) -> Self {
        Self {
            root: root.into(),
            clock,
            last_stamp: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn game_dir(&self, identity: &GameIdentity) -> PathBuf {
        self.root.join(identity.as_str())
    }

    /// Create a new, empty session file for `identity`.
    ///
    /// Start stamps strictly increase within a store, and an existing file
    /// is never reused, so file names always sort in creation order.
    pub fn open_session(&mut self, identity: &GameIdentity) -> Result<SessionLog, StoreError> {
        let dir = self.game_dir(identity);
        fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let mut stamp = self.clock.now_millis();
        if let Some(last) = self.last_stamp {
            stamp = stamp.max(last + 1);
        }

        loop {
            let path = dir.join(session_file_name(stamp));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    file.sync_all()
                        .map_err(|source| StoreError::CreateFile {
                            path: path.clone(),
                            source,
                        })?;
                    self.last_stamp = Some(stamp);
                    return Ok(SessionLog {
                        identity: identity.clone(),
                        path,
                        started_at_ms: stamp,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => stamp += 1,
                Err(source) => return Err(StoreError::CreateFile { path, source }),
            }
        }
    }
}

/// One session's append-only event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLog {
    identity: GameIdentity,
    path: PathBuf,
    started_at_ms: i64,
}

impl SessionLog {
    pub fn identity(&self) -> &GameIdentity {
        &self.identity
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.started_at_ms)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Append one record as a JSON line and sync it to disk.
    pub fn append(&self, record: &Record) -> Result<(), StoreError> {
        let mut line = record
            .to_json_line()
            .map_err(|source| StoreError::Serialize {
                path: self.path.clone(),
                source,
            })?;
        line.push('\n');

        let append = || -> io::Result<()> {
            let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
            file.write_all(line.as_bytes())?;
            file.sync_data()
        };
        append().map_err(|source| StoreError::Append {
            path: self.path.clone(),
            source,
        })
    }
}

pub fn session_file_name(stamp_ms: i64) -> String {
    format!("{SESSION_PREFIX}{stamp_ms:013}.{SESSION_EXTENSION}")
}

/// Start time encoded in a session file name, if it follows the convention.
pub fn parse_session_file_name(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name
        .strip_prefix(SESSION_PREFIX)?
        .strip_suffix(SESSION_EXTENSION)?
        .strip_suffix('.')?;
    DateTime::from_timestamp_millis(stamp.parse().ok()?)
}
