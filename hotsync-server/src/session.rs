//! Per-connection session context and sync-type classification.

/// Which kind of sync this connection will perform, decided once after
/// reading the device's user info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncType {
    /// The device has never synced with any desktop; a full user area must
    /// be created before any conduit runs.
    First,
    /// The device last synced with this same desktop; conduits may use
    /// incremental/dirty-record sync.
    Fast,
    /// The device last synced with a different desktop (or its recorded PC
    /// id doesn't match this one); conduits must fall back to a full
    /// record-by-record comparison.
    Slow,
}

/// Classifies the sync type from the device's recorded `last_sync_pc` and
/// this desktop's own stable id. A PC id of `0` means the device has never
/// completed a sync.
pub fn classify_sync_type(last_sync_pc: u32, local_computer_id: u32) -> SyncType {
    if last_sync_pc == 0 {
        SyncType::First
    } else if last_sync_pc == local_computer_id {
        SyncType::Fast
    } else {
        SyncType::Slow
    }
}

#[derive(Debug, Clone)]
pub struct SessionContext {
    pub local_computer_id: u32,
    pub user_id: u32,
    pub username: String,
    pub sync_type: SyncType,
}
