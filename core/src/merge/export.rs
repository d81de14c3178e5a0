//! Viewer artifact: the merged timeline as a script assignment.
//!
//! The static viewer loads `data.js` with a plain `<script>` tag, so the
//! timeline is written as `window.REPLAY_DATA = {...};` rather than JSON.

use super::merger::{MergeError, MergeOutcome, MergeStats, SessionMerger, Timeline};
use crate::session::GameIdentity;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const VIEWER_GLOBAL: &str = "window.REPLAY_DATA";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error("failed to serialize timeline: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub game: GameIdentity,
    pub output: PathBuf,
    pub turns: usize,
    pub stats: MergeStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(ExportSummary),
    /// No game directory with sessions under the replays root.
    NoGames,
    NoSessions(GameIdentity),
    NoHeader(GameIdentity),
}

pub fn render_script(timeline: &Timeline) -> serde_json::Result<String> {
    let json = serde_json::to_string(timeline)?;
    Ok(format!("{VIEWER_GLOBAL} = {json};"))
}

/// Write the script next to its final location, then rename it into place.
pub fn write_script(path: &Path, timeline: &Timeline) -> Result<(), ExportError> {
    let script = render_script(timeline)?;
    let write_err = |source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, script).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)
}

impl SessionMerger {
    /// Merge the latest game, or `game` when given, and write the viewer script.
    pub fn export(
        &self,
        game: Option<&GameIdentity>,
        output: &Path,
    ) -> Result<ExportOutcome, ExportError> {
        let (identity, outcome) = match game {
            Some(identity) => (identity.clone(), self.merge_game(identity)?),
            None => match self.merge_latest()? {
                Some(found) => found,
                None => return Ok(ExportOutcome::NoGames),
            },
        };

        match outcome {
            MergeOutcome::NoSessions => Ok(ExportOutcome::NoSessions(identity)),
            MergeOutcome::NoHeader { .. } => Ok(ExportOutcome::NoHeader(identity)),
            MergeOutcome::Merged { timeline, stats } => {
                write_script(output, &timeline)?;
                tracing::info!(
                    game = %identity,
                    turns = timeline.turns.len(),
                    output = %output.display(),
                    "Exported replay"
                );
                Ok(ExportOutcome::Written(ExportSummary {
                    game: identity,
                    output: output.to_path_buf(),
                    turns: timeline.turns.len(),
                    stats,
                }))
            }
        }
    }
}
