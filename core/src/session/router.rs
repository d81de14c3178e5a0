use crate::record::{HeaderRecord, Record, TurnRecord};
use crate::session::store::{Clock, SessionLog, SessionStore, StoreError, SystemClock};
use crate::session::GameIdentity;
use hashbrown::HashSet;
use std::path::PathBuf;

/// What routing one record did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A HEADER for a different game opened a new session file.
    SessionStarted {
        identity: GameIdentity,
        path: PathBuf,
    },
    /// A HEADER for the game already being recorded.
    Heartbeat,
    TurnRecorded(i64),
    /// Turn already recorded in this session; nothing written.
    DuplicateTurn(i64),
    /// TURN before any HEADER; nothing written.
    NoSession(i64),
    /// Payload was not valid JSON or not a HEADER/TURN record.
    Discarded,
}

/// Routes decoded records into the active session.
///
/// Holds the only per-game state of the capture loop: which game is being
/// recorded, its open session log, and the turns already written to it.
pub struct EventRouter<C: Clock = SystemClock> {
    store: SessionStore<C>,
    max_identity_len: usize,
    active: Option<SessionLog>,
    recorded_turns: HashSet<i64>,
}

impl<C: Clock> EventRouter<C> {
    pub fn new(store: SessionStore<C>, max_identity_len: usize) -> Self {
        Self {
            store,
            max_identity_len,
            active: None,
            recorded_turns: HashSet::new(),
        }
    }

    pub fn active_session(&self) -> Option<&SessionLog> {
        self.active.as_ref()
    }

    pub fn recorded_turn_count(&self) -> usize {
        self.recorded_turns.len()
    }

    pub fn store(&self) -> &SessionStore<C> {
        &self.store
    }

    /// Decode a reassembled payload and route it.
    ///
    /// Corrupt payloads are dropped; only store failures are errors.
    pub fn handle_payload(&mut self, payload: &str) -> Result<RouteOutcome, StoreError> {
        let value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, len = payload.len(), "Discarding payload that is not valid JSON");
                return Ok(RouteOutcome::Discarded);
            }
        };

        match Record::from_value(value) {
            Ok(record) => self.route(record),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring record");
                Ok(RouteOutcome::Discarded)
            }
        }
    }

    pub fn route(&mut self, record: Record) -> Result<RouteOutcome, StoreError> {
        match record {
            Record::Header(header) => self.handle_header(header),
            Record::Turn(turn) => self.handle_turn(turn),
        }
    }

    fn handle_header(&mut self, header: HeaderRecord) -> Result<RouteOutcome, StoreError> {
        let identity = GameIdentity::from_signature(&header.signature, self.max_identity_len);

        if self
            .active
            .as_ref()
            .is_some_and(|session| session.identity() == &identity)
        {
            return Ok(RouteOutcome::Heartbeat);
        }

        self.recorded_turns.clear();
        self.active = None;

        let session = self.store.open_session(&identity)?;
        session.append(&Record::Header(header))?;

        tracing::info!(
            game = %identity,
            file = %session.file_name(),
            "New game detected, recording session"
        );

        let path = session.path().to_path_buf();
        self.active = Some(session);
        Ok(RouteOutcome::SessionStarted { identity, path })
    }

    fn handle_turn(&mut self, turn: TurnRecord) -> Result<RouteOutcome, StoreError> {
        let number = turn.turn;
        let Some(session) = &self.active else {
            tracing::debug!(turn = number, "TURN before any HEADER, dropping");
            return Ok(RouteOutcome::NoSession(number));
        };

        if self.recorded_turns.contains(&number) {
            return Ok(RouteOutcome::DuplicateTurn(number));
        }

        session.append(&Record::Turn(turn))?;
        self.recorded_turns.insert(number);
        tracing::info!(game = %session.identity(), turn = number, "Recorded turn");
        Ok(RouteOutcome::TurnRecorded(number))
    }
}
