//! The sync-server orchestrator: handshake engine, the
//! `OrchestratorState` connection state machine, the conduit pipeline
//! contract, and the storage contract a host application implements.
//!
//! Everything below the DLP layer (framing, transports) lives in
//! `hotsync-framing`, `hotsync-dlp`, and `hotsync-transport`; this crate
//! only coordinates them.

pub mod channel;
pub mod conduit;
pub mod error;
pub mod handshake;
pub mod orchestrator;
pub mod session;
pub mod storage;

pub use channel::{NetSyncDlpChannel, PadpDlpChannel};
pub use conduit::{run_pipeline, Conduit};
pub use error::{ServerError, ServerResult};
pub use orchestrator::{Orchestrator, OrchestratorState, StopHandle};
pub use session::{classify_sync_type, SessionContext, SyncType};
pub use storage::{DatabaseRecord, InstallQueueEntry, Storage};
