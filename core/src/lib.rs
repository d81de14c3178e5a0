pub mod context;
pub mod merge;
pub mod protocol;
pub mod reader;
pub mod record;
pub mod session;
pub mod watcher;

// Re-exports for convenience
pub use context::{AppConfig, AppConfigExt};
pub use merge::{ExportOutcome, MergeOutcome, SessionMerger, Timeline};
pub use protocol::{ChunkAssembler, LineOutcome, MarkerLine, MarkerParser};
pub use reader::{FileSource, LogSource, LogTailReader, TailBatch};
pub use record::{HeaderRecord, Record, RecordError, TurnRecord};
pub use session::{EventRouter, GameIdentity, RouteOutcome, SessionStore, StoreError};
pub use watcher::{PollStats, ReplayWatcher};
