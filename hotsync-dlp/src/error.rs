use crate::error_code::DlpErrorCode;
use thiserror::Error;

/// Errors raised by the DLP codec, named after the error kinds in the
/// protocol design.
#[derive(Debug, Error)]
pub enum DlpError {
    #[error("response command id {got:#04x} does not match request {expected:#04x} | 0x80")]
    CommandMismatch { expected: u8, got: u8 },

    #[error("argument count mismatch: schema declares {expected}, wire said {got}")]
    ArgumentCountMismatch { expected: usize, got: usize },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("DLP call failed: {0:?}")]
    Dlp(DlpErrorCode),

    #[error("wire encoding error: {0}")]
    Wire(#[from] hotsync_wire::WireError),

    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DlpResult<T> = Result<T, DlpError>;
