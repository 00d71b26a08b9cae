//! The storage contract a sync-server host must provide. This crate never
//! touches a filesystem itself: implementations live with the host
//! application, which knows whether databases are files, a SQL table, or
//! something else entirely.

use crate::error::ServerResult;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseRecord {
    pub record_id: u32,
    pub attributes: u8,
    pub category: u8,
    pub data: Vec<u8>,
}

/// One pending "install on next sync" entry, as queued by
/// [`Storage::queue_install`] and later drained by
/// [`Storage::take_install_queue`] (typically by an install conduit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallQueueEntry {
    pub database_name: String,
    pub payload: Vec<u8>,
}

/// Everything the orchestrator and conduit pipeline need from the host's
/// database backend, independent of how or where it is persisted.
#[async_trait]
pub trait Storage: Send + Sync {
    /// A stable identifier for this desktop install, compared against a
    /// device's recorded `last_sync_pc` to classify the sync type.
    async fn local_computer_id(&self) -> ServerResult<u32>;

    async fn has_user_area(&self, user_id: u32) -> ServerResult<bool>;

    async fn create_user_area(&self, user_id: u32, username: &str) -> ServerResult<()>;

    async fn list_databases(&self, user_id: u32) -> ServerResult<Vec<String>>;

    async fn database_exists(&self, user_id: u32, name: &str) -> ServerResult<bool> {
        Ok(self.list_databases(user_id).await?.iter().any(|n| n == name))
    }

    async fn read_database(&self, user_id: u32, name: &str) -> ServerResult<Vec<DatabaseRecord>>;

    async fn write_database(
        &self,
        user_id: u32,
        name: &str,
        records: &[DatabaseRecord],
    ) -> ServerResult<()>;

    /// Queues a database payload (typically a whole PDB/PRC file) for
    /// install on the device's next sync. The bytes themselves are opaque to
    /// this crate; parsing that format is out of scope here.
    async fn queue_install(&self, user_id: u32, database_name: String, payload: Vec<u8>) -> ServerResult<()>;

    /// Returns and clears every pending install-queue entry for `user_id`.
    /// An install conduit calls this once per sync and installs each
    /// returned entry; entries left unconsumed are not retried.
    async fn take_install_queue(&self, user_id: u32) -> ServerResult<Vec<InstallQueueEntry>>;
}
