//! The conduit pipeline contract. `hotsync-server` runs conduits
//! sequentially and logs a failing conduit's error without aborting the
//! sync; actual conduit business logic (contact sync, calendar sync, and so
//! on) is out of scope here.

use crate::error::ServerResult;
use crate::session::SessionContext;
use crate::storage::Storage;
use async_trait::async_trait;
use hotsync_dlp::DlpTransport;

#[async_trait]
pub trait Conduit: Send + Sync {
    /// A short, stable name used in logs and the `ServerError::Conduit`
    /// wrapper.
    fn name(&self) -> &'static str;

    async fn execute(
        &self,
        dlp: &mut dyn DlpTransport,
        session: &SessionContext,
        storage: &dyn Storage,
    ) -> ServerResult<()>;
}

/// Runs each conduit in order. A conduit failure is logged and wrapped with
/// the conduit's name but does not stop the remaining conduits from running;
/// the sync still proceeds to `EndOfSync`.
pub async fn run_pipeline(
    conduits: &[Box<dyn Conduit>],
    dlp: &mut dyn DlpTransport,
    session: &SessionContext,
    storage: &dyn Storage,
) -> Vec<ServerResult<()>> {
    let mut results = Vec::with_capacity(conduits.len());
    for conduit in conduits {
        let outcome = conduit.execute(dlp, session, storage).await;
        if let Err(ref e) = outcome {
            tracing::warn!(conduit = conduit.name(), error = %e, "conduit failed, continuing pipeline");
        }
        results.push(outcome);
    }
    results
}
