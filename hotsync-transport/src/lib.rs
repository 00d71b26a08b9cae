//! Concrete transports a HotSync session can run over: USB (cradle-class
//! devices), serial (older cradles and USB-serial adapters), and TCP
//! (NetSync over a LAN or Wi-Fi sync).

pub mod error;
pub mod serial;
pub mod tcp;
pub mod usb;

pub use error::{TransportError, TransportResult};
pub use usb::{InitDialect, UsbDeviceEntry, UsbDuplex, KNOWN_DEVICES};
