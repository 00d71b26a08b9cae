use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no matching HotSync device found")]
    DeviceNotFound,

    #[error("usb error: {0}")]
    Usb(#[from] nusb::Error),

    #[error("usb transfer error: {0}")]
    UsbTransfer(String),

    #[error("serial error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("framing error: {0}")]
    Framing(#[from] hotsync_framing::FramingError),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type TransportResult<T> = Result<T, TransportError>;
