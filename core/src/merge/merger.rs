use crate::reader::decode_lossy;
use crate::record::{HeaderRecord, Record, TurnRecord};
use crate::session::GameIdentity;
use crate::session::store::SESSION_EXTENSION;
use hashbrown::HashMap;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to list {path:?}: {source}")]
    ReadDir { path: PathBuf, source: io::Error },
    #[error("failed to read session {path:?}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },
}

/// A session log found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// A game directory that holds at least one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub identity: GameIdentity,
    pub dir: PathBuf,
    pub sessions: usize,
    /// Modification time of the most recently written session.
    pub newest: SystemTime,
}

/// Merged, turn-ordered view of a game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub header: HeaderRecord,
    pub turns: Vec<TurnRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub sessions: usize,
    pub records: usize,
    /// Blank, truncated or unrecognised lines.
    pub skipped_lines: usize,
    /// TURN records replaced by a later one for the same turn.
    pub overwritten_turns: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Merged { timeline: Timeline, stats: MergeStats },
    /// The game directory holds no session logs.
    NoSessions,
    /// Sessions exist but none contains a HEADER.
    NoHeader { stats: MergeStats },
}

/// Reads session logs under a replays root.
#[derive(Debug, Clone)]
pub struct SessionMerger {
    root: PathBuf,
}

impl SessionMerger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Games with at least one session, most recently written first.
    ///
    /// A missing root simply has no games.
    pub fn list_games(&self) -> Result<Vec<GameSummary>, MergeError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(MergeError::ReadDir {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let mut games = Vec::new();
        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            let sessions = session_files(&dir)?;
            let Some(newest) = sessions.iter().map(|s| s.modified).max() else {
                continue;
            };
            games.push(GameSummary {
                identity: GameIdentity::from_dir_name(entry.file_name().to_string_lossy()),
                dir,
                sessions: sessions.len(),
                newest,
            });
        }

        games.sort_by(|a, b| {
            b.newest
                .cmp(&a.newest)
                .then_with(|| b.identity.cmp(&a.identity))
        });
        Ok(games)
    }

    /// The game whose newest session was written last.
    pub fn latest_game(&self) -> Result<Option<GameSummary>, MergeError> {
        Ok(self.list_games()?.into_iter().next())
    }

    pub fn merge_game(&self, identity: &GameIdentity) -> Result<MergeOutcome, MergeError> {
        merge_dir(&self.root.join(identity.as_str()))
    }

    /// Merge the most recently played game, if any.
    pub fn merge_latest(&self) -> Result<Option<(GameIdentity, MergeOutcome)>, MergeError> {
        let Some(game) = self.latest_game()? else {
            return Ok(None);
        };
        let outcome = merge_dir(&game.dir)?;
        Ok(Some((game.identity, outcome)))
    }
}

/// Session logs directly inside `game_dir`, oldest first.
///
/// Ordered by modification time, then by file name.
pub fn session_files(game_dir: &Path) -> Result<Vec<SessionFile>, MergeError> {
    let entries = match fs::read_dir(game_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(MergeError::ReadDir {
                path: game_dir.to_path_buf(),
                source,
            });
        }
    };

    let mut files: Vec<SessionFile> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != SESSION_EXTENSION) {
                return None;
            }
            let meta = entry.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some(SessionFile { path, modified })
        })
        .collect();

    files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
    Ok(files)
}

struct ParsedSession {
    records: Vec<Record>,
    skipped_lines: usize,
}

fn read_session(path: &Path) -> Result<ParsedSession, MergeError> {
    let bytes = fs::read(path).map_err(|source| MergeError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let mut parsed = ParsedSession {
        records: Vec::new(),
        skipped_lines: 0,
    };

    for raw in bytes.split(|b| *b == b'\n') {
        let line = decode_lossy(raw);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str(line)
            .ok()
            .and_then(|value| Record::from_value(value).ok());
        match record {
            Some(record) => parsed.records.push(record),
            None => parsed.skipped_lines += 1,
        }
    }

    Ok(parsed)
}

fn merge_dir(game_dir: &Path) -> Result<MergeOutcome, MergeError> {
    let files = session_files(game_dir)?;
    if files.is_empty() {
        return Ok(MergeOutcome::NoSessions);
    }

    // Decoding is independent per file; replay below stays in file order.
    let sessions: Vec<ParsedSession> = files
        .par_iter()
        .map(|file| read_session(&file.path))
        .collect::<Result<_, _>>()?;

    let mut stats = MergeStats {
        sessions: sessions.len(),
        ..MergeStats::default()
    };
    let mut latest_header: Option<HeaderRecord> = None;
    let mut turns_by_number: HashMap<i64, TurnRecord> = HashMap::new();

    for session in sessions {
        stats.skipped_lines += session.skipped_lines;
        for record in session.records {
            stats.records += 1;
            match record {
                Record::Header(header) => latest_header = Some(header),
                Record::Turn(turn) => {
                    if turns_by_number.insert(turn.turn, turn).is_some() {
                        stats.overwritten_turns += 1;
                    }
                }
            }
        }
    }

    let Some(header) = latest_header else {
        return Ok(MergeOutcome::NoHeader { stats });
    };

    let mut turns: Vec<TurnRecord> = turns_by_number.into_values().collect();
    turns.sort_unstable_by_key(|t| t.turn);

    tracing::debug!(
        dir = %game_dir.display(),
        sessions = stats.sessions,
        turns = turns.len(),
        skipped = stats.skipped_lines,
        "Merged sessions"
    );

    Ok(MergeOutcome::Merged {
        timeline: Timeline { header, turns },
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::time::Duration;

    fn write_session(dir: &Path, name: &str, lines: &[&str], mtime_secs: u64) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        let mut contents = lines.join("\n");
        contents.push('\n');
        fs::write(&path, contents).unwrap();
        set_mtime(&path, mtime_secs);
        path
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn merged(outcome: MergeOutcome) -> (Timeline, MergeStats) {
        match outcome {
            MergeOutcome::Merged { timeline, stats } => (timeline, stats),
            other => panic!("expected a timeline, got {other:?}"),
        }
    }

    const HEADER: &str = r#"{"type":"HEADER","signature":"Rome","dictionary":{}}"#;

    #[test]
    fn test_later_session_wins_per_turn() {
        let root = tempfile::tempdir().unwrap();
        let game = root.path().join("Rome");
        write_session(
            &game,
            "session_0000000001000.jsonl",
            &[HEADER, r#"{"type":"TURN","turn":5,"p":"P1"}"#, r#"{"type":"TURN","turn":4}"#],
            1_000,
        );
        write_session(
            &game,
            "session_0000000002000.jsonl",
            &[HEADER, r#"{"type":"TURN","turn":5,"p":"P2"}"#],
            2_000,
        );

        let merger = SessionMerger::new(root.path());
        let (timeline, stats) = merged(merger.merge_game(&GameIdentity::from_dir_name("Rome")).unwrap());

        let turns: Vec<i64> = timeline.turns.iter().map(|t| t.turn).collect();
        assert_eq!(turns, vec![4, 5]);
        assert_eq!(timeline.turns[1].body()["p"], "P2");
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.overwritten_turns, 1);
    }

    #[test]
    fn test_modification_time_orders_sessions() {
        let root = tempfile::tempdir().unwrap();
        let game = root.path().join("Rome");
        // Name sorts first but was written last.
        write_session(
            &game,
            "session_0000000001000.jsonl",
            &[HEADER, r#"{"type":"TURN","turn":1,"p":"late"}"#],
            9_000,
        );
        write_session(
            &game,
            "session_0000000002000.jsonl",
            &[HEADER, r#"{"type":"TURN","turn":1,"p":"early"}"#],
            1_000,
        );

        let merger = SessionMerger::new(root.path());
        let (timeline, _) = merged(merger.merge_game(&GameIdentity::from_dir_name("Rome")).unwrap());
        assert_eq!(timeline.turns[0].body()["p"], "late");
    }

    #[test]
    fn test_latest_header_wins() {
        let root = tempfile::tempdir().unwrap();
        let game = root.path().join("Rome");
        write_session(
            &game,
            "session_0000000001000.jsonl",
            &[r#"{"type":"HEADER","signature":"Rome","v":1}"#],
            1_000,
        );
        write_session(
            &game,
            "session_0000000002000.jsonl",
            &[r#"{"type":"HEADER","signature":"Rome","v":2}"#],
            2_000,
        );

        let merger = SessionMerger::new(root.path());
        let (timeline, _) = merged(merger.merge_game(&GameIdentity::from_dir_name("Rome")).unwrap());
        assert_eq!(timeline.header.body()["v"], 2);
        assert!(timeline.turns.is_empty());
    }

    #[test]
    fn test_truncated_and_blank_lines_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let game = root.path().join("Rome");
        fs::create_dir_all(&game).unwrap();
        let path = game.join("session_0000000001000.jsonl");
        fs::write(
            &path,
            format!("{HEADER}\n\n{{\"type\":\"TURN\",\"turn\":1}}\n{{\"type\":\"TURN\",\"tu"),
        )
        .unwrap();

        let merger = SessionMerger::new(root.path());
        let (timeline, stats) = merged(merger.merge_game(&GameIdentity::from_dir_name("Rome")).unwrap());
        assert_eq!(timeline.turns.len(), 1);
        assert_eq!(stats.skipped_lines, 1);
        assert_eq!(stats.records, 2);
    }

    #[test]
    fn test_no_sessions_and_no_header() {
        let root = tempfile::tempdir().unwrap();
        let merger = SessionMerger::new(root.path());
        assert_eq!(
            merger.merge_game(&GameIdentity::from_dir_name("Nobody")).unwrap(),
            MergeOutcome::NoSessions
        );

        write_session(
            &root.path().join("Headless"),
            "session_0000000001000.jsonl",
            &[r#"{"type":"TURN","turn":1}"#],
            1_000,
        );
        let outcome = merger.merge_game(&GameIdentity::from_dir_name("Headless")).unwrap();
        assert!(matches!(outcome, MergeOutcome::NoHeader { stats } if stats.records == 1));
    }

    #[test]
    fn test_non_session_files_are_ignored() {
        let root = tempfile::tempdir().unwrap();
        let game = root.path().join("Rome");
        write_session(&game, "session_0000000001000.jsonl", &[HEADER], 1_000);
        write_session(&game, "notes.txt", &[r#"{"type":"TURN","turn":1}"#], 2_000);

        let files = session_files(&game).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_latest_game_uses_newest_session() {
        let root = tempfile::tempdir().unwrap();
        write_session(&root.path().join("Rome"), "session_0000000001000.jsonl", &[HEADER], 1_000);
        write_session(&root.path().join("Rome"), "session_0000000005000.jsonl", &[HEADER], 5_000);
        write_session(&root.path().join("Egypt"), "session_0000000003000.jsonl", &[HEADER], 3_000);
        fs::create_dir_all(root.path().join("Empty")).unwrap();

        let merger = SessionMerger::new(root.path());
        let games = merger.list_games().unwrap();
        let names: Vec<&str> = games.iter().map(|g| g.identity.as_str()).collect();
        assert_eq!(names, vec!["Rome", "Egypt"]);
        assert_eq!(games[0].sessions, 2);

        let (identity, outcome) = merger.merge_latest().unwrap().unwrap();
        assert_eq!(identity.as_str(), "Rome");
        assert!(matches!(outcome, MergeOutcome::Merged { .. }));
    }

    #[test]
    fn test_missing_root_has_no_games() {
        let root = tempfile::tempdir().unwrap();
        let merger = SessionMerger::new(root.path().join("does-not-exist"));
        assert!(merger.list_games().unwrap().is_empty());
        assert!(merger.merge_latest().unwrap().is_none());
    }

    #[test]
    fn test_timeline_serializes_header_and_turns() {
        let root = tempfile::tempdir().unwrap();
        write_session(
            &root.path().join("Rome"),
            "session_0000000001000.jsonl",
            &[HEADER, r#"{"type":"TURN","turn":2}"#, r#"{"type":"TURN","turn":1}"#],
            1_000,
        );

        let merger = SessionMerger::new(root.path());
        let (timeline, _) = merged(merger.merge_game(&GameIdentity::from_dir_name("Rome")).unwrap());
        let value: Value = serde_json::to_value(&timeline).unwrap();
        assert_eq!(
            value,
            json!({
                "header": {"type": "HEADER", "signature": "Rome", "dictionary": {}},
                "turns": [{"type": "TURN", "turn": 1}, {"type": "TURN", "turn": 2}]
            })
        );
    }
}
