//! TCP transport (NetSync over Wi-Fi/LAN sync), listening on the well-known
//! HotSync port.

use crate::error::TransportResult;
use tokio::net::{TcpListener, TcpStream};
use tracing::info;

pub const NETSYNC_PORT: u16 = 14238;

pub async fn listen(bind_addr: &str) -> TransportResult<TcpListener> {
    let addr = format!("{bind_addr}:{NETSYNC_PORT}");
    info!(addr, "listening for NetSync connections");
    Ok(TcpListener::bind(addr).await?)
}

pub async fn accept(listener: &TcpListener) -> TransportResult<TcpStream> {
    let (stream, peer) = listener.accept().await?;
    info!(%peer, "accepted NetSync connection");
    stream.set_nodelay(true)?;
    Ok(stream)
}
