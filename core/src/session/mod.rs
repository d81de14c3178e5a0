mod identity;
pub mod router;
pub mod store;

pub use identity::GameIdentity;
pub use router::{EventRouter, RouteOutcome};
pub use store::{Clock, SessionLog, SessionStore, StoreError, SystemClock};
