//! The three composable HotSync framing layers: SLP (link-level framing and
//! checksums), PADP (fragmentation, acking, retransmit), CMP (connection
//! parameter negotiation), and NetSync (the ack-free alternative used over
//! TCP and newer USB devices).

pub mod cmp;
pub mod error;
pub mod netsync;
pub mod padp;
pub mod session;
pub mod slp;

pub use error::{FramingError, FramingResult};
pub use padp::PadpPacket;
pub use session::{PacketDuplex, PadpConfig, PadpSession};
pub use slp::{SlpFrame, SlpPacketType};
