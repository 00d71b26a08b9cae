use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("transport error: {0}")]
    Transport(#[from] hotsync_transport::TransportError),

    #[error("framing error: {0}")]
    Framing(#[from] hotsync_framing::FramingError),

    #[error("dlp error: {0}")]
    Dlp(#[from] hotsync_dlp::DlpError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("conduit {name:?} failed: {source}")]
    Conduit {
        name: &'static str,
        #[source]
        source: Box<ServerError>,
    },

    #[error("illegal state transition: {from} does not accept {event}")]
    IllegalTransition { from: &'static str, event: &'static str },
}

pub type ServerResult<T> = Result<T, ServerError>;
