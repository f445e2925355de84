//! Sync between the remote store and the local cache
//!
//! [`SyncEngine`] runs pulls (remote to cache, full replace) and pushes
//! (cache to remote, one atomic batch), reporting progress through a
//! status watch channel per direction and an event stream.

mod engine;
mod error;
mod status;

pub use engine::SyncEngine;
pub use error::SyncError;
pub use status::{
    Direction, Phase, PullReport, PushReport, RunOutcome, RunStatus, SyncEvent,
    ValidationDiagnostic,
};
