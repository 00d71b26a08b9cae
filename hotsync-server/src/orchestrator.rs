//! The sync-server orchestrator: an explicit state machine rather than an
//! event-emitter, so a reader can see the whole lifecycle of one connection
//! by reading one `match`.

use crate::conduit::{run_pipeline, Conduit};
use crate::error::ServerResult;
use crate::handshake::read_session_context;
use crate::session::SessionContext;
use crate::storage::Storage;
use hotsync_dlp::catalog::EndOfSyncRequest;
use hotsync_dlp::{execute, DlpTransport};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Discovered,
    Opened,
    Claimed,
    Configured,
    Handshaking,
    Syncing,
    Ending,
    Closed,
    WaitDisconnect,
}

impl OrchestratorState {
    fn name(self) -> &'static str {
        match self {
            Self::Discovered => "DISCOVERED",
            Self::Opened => "OPENED",
            Self::Claimed => "CLAIMED",
            Self::Configured => "CONFIGURED",
            Self::Handshaking => "HANDSHAKING",
            Self::Syncing => "SYNCING",
            Self::Ending => "ENDING",
            Self::Closed => "CLOSED",
            Self::WaitDisconnect => "WAIT-DISCONNECT",
        }
    }
}

/// Drives one HotSync connection from an already-open, already-claimed
/// transport through to disconnect. The caller performs device
/// discovery/open/claim (transport-specific) before constructing this; the
/// orchestrator owns everything from `Configured` onward.
pub struct Orchestrator {
    state: OrchestratorState,
    local_computer_id: u32,
}

impl Orchestrator {
    pub fn new(local_computer_id: u32) -> Self {
        Self {
            state: OrchestratorState::Discovered,
            local_computer_id,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    fn transition(&mut self, to: OrchestratorState) {
        info!(from = self.state.name(), to = to.name(), "orchestrator state transition");
        self.state = to;
    }

    /// Runs the full lifecycle: handshake, DLP session setup, conduit
    /// pipeline, `EndOfSync`, close. `dlp` must already speak PADP or NetSync
    /// framing over an opened, claimed, baud/parameter-configured transport;
    /// advancing through `Opened`/`Claimed`/`Configured` is a bookkeeping
    /// step here since those stages are transport-specific and already done
    /// by the caller.
    pub async fn run(
        &mut self,
        dlp: &mut dyn DlpTransport,
        conduits: &[Box<dyn Conduit>],
        storage: &dyn Storage,
    ) -> ServerResult<()> {
        self.transition(OrchestratorState::Opened);
        self.transition(OrchestratorState::Claimed);
        self.transition(OrchestratorState::Configured);

        self.transition(OrchestratorState::Handshaking);
        let session = match read_session_context(dlp, self.local_computer_id) {
            Ok(session) => session,
            Err(e) => {
                // A handshake failure means the device never entered a
                // syncable state; there is nothing to end gracefully.
                error!(error = %e, "handshake failed");
                self.transition(OrchestratorState::WaitDisconnect);
                return Err(e);
            }
        };

        if session.sync_type == crate::session::SyncType::First {
            if let Err(e) = storage
                .create_user_area(session.user_id, &session.username)
                .await
            {
                error!(error = %e, "failed to create user area for first sync");
                self.transition(OrchestratorState::Ending);
                self.end_sync(dlp, false);
                self.transition(OrchestratorState::WaitDisconnect);
                return Err(e);
            }
        }

        self.transition(OrchestratorState::Syncing);
        let results = run_pipeline(conduits, dlp, &session, storage).await;
        let any_conduit_failed = results.iter().any(Result::is_err);

        self.transition(OrchestratorState::Ending);
        self.end_sync(dlp, !any_conduit_failed);

        self.transition(OrchestratorState::Closed);
        self.transition(OrchestratorState::WaitDisconnect);
        Ok(())
    }

    /// Sends `EndOfSync`; a failure here is logged but does not change the
    /// orchestrator's own transition plan, since the connection is already
    /// being torn down regardless.
    fn end_sync(&self, dlp: &mut dyn DlpTransport, success: bool) {
        let status = if success { 0 } else { 1 };
        let request = EndOfSyncRequest { status };
        if let Err(e) = execute::<_, hotsync_dlp::catalog::EndOfSyncResponse, _>(dlp, &request) {
            warn!(error = %e, "EndOfSync request failed");
        }
    }

    /// Marks the connection fully closed after the caller observes the
    /// device disconnect. Calling this more than once is a no-op, matching
    /// the documented idempotence of stopping a session.
    pub fn mark_discovered_again(&mut self) {
        if self.state == OrchestratorState::WaitDisconnect {
            self.transition(OrchestratorState::Discovered);
        }
    }
}

/// Orchestrates a clean shutdown request from the host application (e.g. a
/// user clicking "cancel"). Idempotent: calling `stop` on an
/// already-stopped/closed session has no effect and returns `Ok(())`.
pub struct StopHandle {
    stopped: std::sync::atomic::AtomicBool,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self {
            stopped: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_orchestrator_starts_discovered() {
        let orch = Orchestrator::new(0xDEAD_BEEF);
        assert_eq!(orch.state(), OrchestratorState::Discovered);
    }

    #[test]
    fn stop_handle_is_idempotent() {
        let stop = StopHandle::default();
        assert!(!stop.is_stopped());
        stop.stop();
        stop.stop();
        assert!(stop.is_stopped());
    }

    #[test]
    fn mark_discovered_again_is_a_no_op_outside_wait_disconnect() {
        let mut orch = Orchestrator::new(1);
        orch.mark_discovered_again();
        assert_eq!(orch.state(), OrchestratorState::Discovered);
    }
}
