use thiserror::Error;

/// Errors raised by the framing layer (SLP/PADP/CMP/NetSync).
///
/// Variant names mirror the error kinds named in the protocol design:
/// transport failures are fatal to the session, framing failures are
/// recoverable at the SLP layer (resync) but fatal at the NetSync layer
/// (no resync mechanism there), and timeouts are PADP-specific and escalate
/// after the retry budget is exhausted.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Framing(String),

    #[error("wire encoding error: {0}")]
    Wire(#[from] hotsync_wire::WireError),

    #[error("ack wait timed out after {retries} retransmission(s)")]
    Timeout { retries: u32 },

    #[error("PADP message aborted: missing fragment at offset {offset}")]
    Gap { offset: usize },

    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type FramingResult<T> = Result<T, FramingError>;
