//! The capture loop.
//!
//! One poll reads new log lines, feeds them through the chunk assembler and
//! routes every completed payload into the active session. Everything runs
//! on one task; the loop sleeps between polls.

use crate::context::AppConfig;
use crate::protocol::{ChunkAssembler, LineOutcome};
use crate::reader::{FileSource, LogSource, LogTailReader};
use crate::session::{Clock, EventRouter, RouteOutcome, SessionStore, StoreError, SystemClock};
use std::time::Duration;
use tokio::time::sleep;

/// Counters for one poll, or accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub lines: usize,
    pub rotations: usize,
    pub malformed_lines: usize,
    pub messages: usize,
    pub discarded: usize,
    pub sessions_started: usize,
    pub turns_recorded: usize,
    pub duplicate_turns: usize,
}

impl PollStats {
    fn add(&mut self, other: &PollStats) {
        self.lines += other.lines;
        self.rotations += other.rotations;
        self.malformed_lines += other.malformed_lines;
        self.messages += other.messages;
        self.discarded += other.discarded;
        self.sessions_started += other.sessions_started;
        self.turns_recorded += other.turns_recorded;
        self.duplicate_turns += other.duplicate_turns;
    }

    fn count(&mut self, outcome: &RouteOutcome) {
        match outcome {
            RouteOutcome::SessionStarted { .. } => self.sessions_started += 1,
            RouteOutcome::TurnRecorded(_) => self.turns_recorded += 1,
            RouteOutcome::DuplicateTurn(_) => self.duplicate_turns += 1,
            RouteOutcome::Discarded | RouteOutcome::NoSession(_) => self.discarded += 1,
            RouteOutcome::Heartbeat => {}
        }
    }
}

pub struct ReplayWatcher<S: LogSource, C: Clock = SystemClock> {
    reader: LogTailReader<S>,
    assembler: ChunkAssembler,
    router: EventRouter<C>,
    totals: PollStats,
}

impl ReplayWatcher<FileSource> {
    /// Watcher for the configured log and replays directory.
    ///
    /// Tails from the current end of the log unless `from_start` is set.
    pub fn from_config(config: &AppConfig, from_start: bool) -> Self {
        let source = FileSource::new(&config.log_path);
        let reader = if from_start {
            LogTailReader::new(source)
        } else {
            LogTailReader::at_end(source)
        };
        let router = EventRouter::new(
            SessionStore::new(&config.replays_dir),
            config.max_identity_len,
        );
        Self::new(reader, ChunkAssembler::new(config.marker.clone()), router)
    }
}

impl<S: LogSource, C: Clock> ReplayWatcher<S, C> {
    pub fn new(reader: LogTailReader<S>, assembler: ChunkAssembler, router: EventRouter<C>) -> Self {
        Self {
            reader,
            assembler,
            router,
            totals: PollStats::default(),
        }
    }

    pub fn reader(&self) -> &LogTailReader<S> {
        &self.reader
    }

    pub fn assembler(&self) -> &ChunkAssembler {
        &self.assembler
    }

    pub fn router(&self) -> &EventRouter<C> {
        &self.router
    }

    pub fn totals(&self) -> PollStats {
        self.totals
    }

    /// Process everything appended since the last poll.
    ///
    /// Only a failure to write a session log is returned as an error.
    pub fn poll_once(&mut self) -> Result<PollStats, StoreError> {
        let batch = self.reader.poll();
        let mut stats = PollStats::default();

        if batch.rotated {
            tracing::info!("Game log was reset, discarding partial messages");
            self.assembler.reset();
            stats.rotations += 1;
        }

        for line in &batch.lines {
            stats.lines += 1;
            match self.assembler.feed(line) {
                LineOutcome::Completed(payload) => {
                    stats.messages += 1;
                    let outcome = self.router.handle_payload(&payload)?;
                    stats.count(&outcome);
                }
                LineOutcome::Malformed => stats.malformed_lines += 1,
                LineOutcome::Ignored | LineOutcome::Buffered => {}
            }
        }

        self.totals.add(&stats);
        Ok(stats)
    }

    /// Poll until a session log cannot be written.
    pub async fn run(&mut self, interval: Duration) -> Result<(), StoreError> {
        tracing::info!(
            source = %self.reader.source().describe(),
            offset = self.reader.offset(),
            replays = %self.router.store().root().display(),
            "Watching game log"
        );

        loop {
            self.poll_once()?;
            sleep(interval).await;
        }
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod watcher_tests;
