use thiserror::Error;

/// Errors raised while reading or writing the fixed binary layouts shared by
/// every HotSync wire format.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("unexpected end of buffer: needed {needed} bytes, had {available}")]
    Truncated { needed: usize, available: usize },
    #[error("value {value} does not fit in {bits}-bit field")]
    Overflow { value: u64, bits: u32 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WireResult<T> = Result<T, WireError>;
