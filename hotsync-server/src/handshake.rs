//! The handshake performed once a transport is open: CMP for serial/USB-serial
//! cradles, the NetSync preamble exchange for TCP and NetSync-speaking USB
//! devices, followed in both cases by the mandatory `ReadSysInfo` /
//! `ReadUserInfo` DLP exchange that seeds a [`SessionContext`].

use crate::error::ServerResult;
use crate::session::{classify_sync_type, SessionContext, SyncType};
use hotsync_dlp::catalog::{ReadSysInfoRequest, ReadUserInfoRequest};
use hotsync_dlp::{execute, DlpTransport};
use hotsync_framing::cmp::{self, CmpPacket};
use std::io::{Read, Write};
use tracing::info;

pub const DEFAULT_CMP_BAUD: u32 = 9600;

/// Runs the CMP wakeup/init exchange over a serial-class duplex.
pub fn cmp_handshake<D: Read + Write>(duplex: &mut D) -> ServerResult<CmpPacket> {
    let negotiated = cmp::handshake(duplex, DEFAULT_CMP_BAUD)?;
    info!(baud = negotiated.baud_rate, "CMP handshake complete");
    Ok(negotiated)
}

/// Runs the NetSync preamble exchange over a TCP/NetSync-class duplex.
pub fn netsync_handshake<D: Read + Write>(duplex: &mut D) -> ServerResult<()> {
    hotsync_framing::netsync::exchange_preamble(duplex)?;
    info!("NetSync preamble exchange complete");
    Ok(())
}

/// Issues `ReadSysInfo` then `ReadUserInfo`, classifies the sync type against
/// `local_computer_id`, and returns the resulting session context.
pub fn read_session_context(
    dlp: &mut dyn DlpTransport,
    local_computer_id: u32,
) -> ServerResult<SessionContext> {
    let sys_info = execute::<_, hotsync_dlp::catalog::ReadSysInfoResponse, _>(
        dlp,
        &ReadSysInfoRequest,
    )?;
    info!(
        rom_version = sys_info.rom_version,
        product_id = %sys_info.product_id,
        "device system info"
    );

    let user_info = execute::<_, hotsync_dlp::catalog::ReadUserInfoResponse, _>(
        dlp,
        &ReadUserInfoRequest,
    )?;
    let sync_type = classify_sync_type(user_info.last_sync_pc, local_computer_id);
    info!(
        user_id = user_info.user_id,
        username = %user_info.username,
        ?sync_type,
        "classified sync type"
    );

    Ok(SessionContext {
        local_computer_id,
        user_id: user_info.user_id,
        username: user_info.username,
        sync_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sync_is_classified_when_device_has_no_recorded_pc() {
        assert_eq!(classify_sync_type(0, 123), SyncType::First);
    }
}
