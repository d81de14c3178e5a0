//! Offline merge of a game's session logs into one timeline.
//!
//! A game may be recorded over several sessions (the game was reloaded, the
//! watcher restarted, an autosave was replayed). Sessions are replayed oldest
//! first and the last record written for each turn wins.

mod export;
mod merger;

pub use export::{ExportError, ExportOutcome, ExportSummary, VIEWER_GLOBAL, render_script, write_script};
pub use merger::{
    GameSummary, MergeError, MergeOutcome, MergeStats, SessionFile, SessionMerger, Timeline,
};
