//! USB transport: device discovery, the vendor-specific init dialects HotSync
//! cradles use before bulk transfer starts, and a bulk in/out duplex.
//!
//! Grounded on the POWER-Z KM003C driver's connect sequence: reset the
//! device, detach-and-claim interface 0, probe for the device's init
//! handshake, then settle into plain bulk transfers.

use crate::error::{TransportError, TransportResult};
use nusb::transfer::{ControlIn, ControlType, Recipient, RequestBuffer};
use nusb::{Device, Interface};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A USB vendor/product pair this crate knows how to open, plus which init
/// dialect it speaks. Declared as a table rather than matched in code so
/// adding a cradle is a one-line change.
pub struct UsbDeviceEntry {
    pub vendor_id: u16,
    pub product_id: u16,
    pub name: &'static str,
    pub init: InitDialect,
}

/// The handshake a cradle expects before it will accept HotSync framing over
/// its bulk endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitDialect {
    /// No vendor handshake; bulk transfer works immediately after claim, so
    /// go straight to scanning for the 64-byte bulk endpoint pair.
    None,
    /// The dialect most USB-serial-class cradles (Palm m500 and later)
    /// speak: `GET_EXT_CONNECTION_INFO`, falling back to
    /// `GET_CONNECTION_INFO` plus the `GET_NUM_BYTES_AVAILABLE` priming call
    /// some older devices require.
    Generic,
    /// Early Sony Clie cradles: two standard (not vendor) control-in
    /// requests with no endpoint information in the response; endpoints are
    /// always inferred by scanning descriptors for this dialect.
    EarlySonyClie,
}

pub const KNOWN_DEVICES: &[UsbDeviceEntry] = &[
    UsbDeviceEntry {
        vendor_id: 0x0830,
        product_id: 0x0060,
        name: "Palm m500",
        init: InitDialect::Generic,
    },
    UsbDeviceEntry {
        vendor_id: 0x054C,
        product_id: 0x0038,
        name: "Sony Clie (early)",
        init: InitDialect::EarlySonyClie,
    },
    UsbDeviceEntry {
        vendor_id: 0x0830,
        product_id: 0x0061,
        name: "Palm m505",
        init: InitDialect::None,
    },
];

fn lookup(vendor_id: u16, product_id: u16) -> Option<&'static UsbDeviceEntry> {
    KNOWN_DEVICES
        .iter()
        .find(|d| d.vendor_id == vendor_id && d.product_id == product_id)
}

const DISCOVERY_POLL_INTERVAL: Duration = Duration::from_millis(200);
const BULK_ENDPOINT_SIZE: u16 = 64;
const CONTROL_TIMEOUT: Duration = Duration::from_secs(2);
const BULK_TIMEOUT: Duration = Duration::from_secs(5);

/// Vendor control request codes, all vendor-recipient except where noted.
const REQUEST_GET_NUM_BYTES_AVAILABLE: u8 = 0x01;
const REQUEST_GET_CONNECTION_INFO: u8 = 0x03;
const REQUEST_GET_EXT_CONNECTION_INFO: u8 = 0x04;

/// The four-byte port-type tag `GET_EXT_CONNECTION_INFO` reports for the
/// HotSync bulk port ("cnys", stored little-endian on the wire).
const PORT_TYPE_CNYS: u32 = u32::from_le_bytes(*b"cnys");
/// `GET_CONNECTION_INFO`'s function-type byte for the HotSync port.
const FUNCTION_HOT_SYNC: u8 = 2;

/// Polls `nusb::list_devices` every [`DISCOVERY_POLL_INTERVAL`] until a known
/// device appears, then opens and claims it.
pub async fn discover_and_open() -> TransportResult<UsbDuplex> {
    loop {
        let found = nusb::list_devices()?
            .find_map(|info| lookup(info.vendor_id(), info.product_id()).map(|entry| (info, entry)));

        if let Some((info, entry)) = found {
            info!(
                name = entry.name,
                vendor_id = entry.vendor_id,
                product_id = entry.product_id,
                "found HotSync USB device"
            );
            let device = info.open()?;
            return open_claimed(device, entry).await;
        }
        tokio::time::sleep(DISCOVERY_POLL_INTERVAL).await;
    }
}

async fn open_claimed(device: Device, entry: &UsbDeviceEntry) -> TransportResult<UsbDuplex> {
    // Detaching the kernel driver can fail harmlessly on platforms where none
    // is attached (Windows) or where the caller lacks permission to detach;
    // either way a subsequent claim failure surfaces the real problem.
    let interface = match device.detach_and_claim_interface(0) {
        Ok(interface) => interface,
        Err(_) => device.claim_interface(0)?,
    };

    let endpoints = run_init_dialect(&interface, entry.init).await?;
    let (in_ep, out_ep) = match endpoints {
        Some(pair) => pair,
        None => infer_bulk_endpoints(&interface)?,
    };
    Ok(UsbDuplex {
        interface,
        in_endpoint: in_ep,
        out_endpoint: out_ep,
    })
}

/// The candidate OUT endpoints a vendor control request is tried against,
/// since the spec does not fix which interface endpoint accepts it; the
/// first one that doesn't error wins.
fn candidate_out_endpoints(interface: &Interface) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(config) = interface.descriptors().next() {
        for endpoint in config.endpoints() {
            if endpoint.direction() == nusb::transfer::Direction::Out {
                out.push(endpoint.address());
            }
        }
    }
    out
}

/// Runs the device's init dialect and returns the `(in, out)` endpoint pair
/// it resolved, or `None` if this dialect reports no endpoint info and
/// inference should run instead.
async fn run_init_dialect(
    interface: &Interface,
    dialect: InitDialect,
) -> TransportResult<Option<(u8, u8)>> {
    match dialect {
        InitDialect::None => Ok(None),
        InitDialect::Generic => run_generic_dialect(interface).await,
        InitDialect::EarlySonyClie => {
            // Two standard (not vendor) control-in requests; the response
            // bodies carry no endpoint information HotSync needs, only a
            // liveness check some early Clie cradles perform before they'll
            // accept bulk transfers.
            standard_control_in(interface, 0x08 /* GET_CONFIGURATION */, 1).await?;
            standard_control_in(interface, 0x0A /* GET_INTERFACE */, 1).await?;
            Ok(None)
        }
    }
}

async fn run_generic_dialect(interface: &Interface) -> TransportResult<Option<(u8, u8)>> {
    if let Some(pair) = try_get_ext_connection_info(interface).await? {
        return Ok(Some(pair));
    }
    if let Some(pair) = try_get_connection_info(interface).await? {
        // Some older devices require this priming call before the first
        // bulk transfer will succeed; the response itself is unused.
        let _ = vendor_control_in(interface, REQUEST_GET_NUM_BYTES_AVAILABLE, 0, 0, 4).await;
        return Ok(Some(pair));
    }
    Ok(None)
}

/// `GET_EXT_CONNECTION_INFO` response layout: one byte giving the port
/// count, then per port a 4-byte little-endian type tag, a `hasDifferentEndpoints`
/// byte, and either a single port-number byte or an explicit in/out
/// endpoint-address pair, depending on that flag.
async fn try_get_ext_connection_info(interface: &Interface) -> TransportResult<Option<(u8, u8)>> {
    let Some(reply) = vendor_control_in(interface, REQUEST_GET_EXT_CONNECTION_INFO, 0, 0, 64).await
    else {
        return Ok(None);
    };
    if reply.is_empty() {
        return Ok(None);
    }
    let port_count = reply[0] as usize;
    let mut offset = 1usize;
    for _ in 0..port_count {
        if offset + 6 > reply.len() {
            break;
        }
        let port_type = u32::from_le_bytes(reply[offset..offset + 4].try_into().unwrap());
        let has_different_endpoints = reply[offset + 4] != 0;
        if port_type == PORT_TYPE_CNYS {
            if has_different_endpoints {
                if offset + 7 > reply.len() {
                    break;
                }
                let in_ep = reply[offset + 5];
                let out_ep = reply[offset + 6];
                debug!(in_ep, out_ep, "GET_EXT_CONNECTION_INFO: cnys port, distinct endpoints");
                return Ok(Some((in_ep, out_ep)));
            } else {
                let port_number = reply[offset + 5];
                debug!(port_number, "GET_EXT_CONNECTION_INFO: cnys port, shared endpoint number");
                return Ok(Some((port_number, port_number)));
            }
        }
        offset += if has_different_endpoints { 7 } else { 6 };
    }
    Ok(None)
}

/// `GET_CONNECTION_INFO` response layout: one byte port count, then per port
/// a 1-byte function-type and a 1-byte port number; used as a fallback when
/// the device does not answer `GET_EXT_CONNECTION_INFO`.
async fn try_get_connection_info(interface: &Interface) -> TransportResult<Option<(u8, u8)>> {
    let Some(reply) = vendor_control_in(interface, REQUEST_GET_CONNECTION_INFO, 0, 0, 64).await
    else {
        return Ok(None);
    };
    if reply.is_empty() {
        return Ok(None);
    }
    let port_count = reply[0] as usize;
    let mut offset = 1usize;
    for _ in 0..port_count {
        if offset + 2 > reply.len() {
            break;
        }
        let function_type = reply[offset];
        let port_number = reply[offset + 1];
        if function_type == FUNCTION_HOT_SYNC {
            debug!(port_number, "GET_CONNECTION_INFO: HOT_SYNC port");
            return Ok(Some((port_number, port_number)));
        }
        offset += 2;
    }
    Ok(None)
}

/// Issues `request` as a vendor control-in against every candidate OUT
/// endpoint on the interface until one succeeds; `None` if none do.
async fn vendor_control_in(
    interface: &Interface,
    request: u8,
    value: u16,
    length: u16,
    min_len: usize,
) -> Option<Vec<u8>> {
    for endpoint in candidate_out_endpoints(interface) {
        debug!(request, endpoint, "trying USB vendor control-in request");
        let control = ControlIn {
            control_type: ControlType::Vendor,
            recipient: Recipient::Device,
            request,
            value,
            index: endpoint as u16,
            length: length.max(min_len as u16),
        };
        let completion = match tokio::time::timeout(CONTROL_TIMEOUT, interface.control_in(control)).await
        {
            Ok(completion) => completion,
            Err(_) => continue,
        };
        if let Ok(data) = completion.into_result() {
            return Some(data);
        }
    }
    None
}

async fn standard_control_in(
    interface: &Interface,
    request: u8,
    length: u16,
) -> TransportResult<Vec<u8>> {
    let control = ControlIn {
        control_type: ControlType::Standard,
        recipient: Recipient::Device,
        request,
        value: 0,
        index: 0,
        length,
    };
    let completion = tokio::time::timeout(CONTROL_TIMEOUT, interface.control_in(control))
        .await
        .map_err(|_| TransportError::Timeout(CONTROL_TIMEOUT))?;
    completion
        .into_result()
        .map_err(|e| TransportError::UsbTransfer(e.to_string()))
}

fn infer_bulk_endpoints(interface: &Interface) -> TransportResult<(u8, u8)> {
    let config = interface
        .descriptors()
        .next()
        .ok_or_else(|| TransportError::Protocol("USB interface has no descriptors".into()))?;

    let mut in_ep = None;
    let mut out_ep = None;
    for endpoint in config.endpoints() {
        if endpoint.max_packet_size() != BULK_ENDPOINT_SIZE as usize {
            continue;
        }
        if endpoint.direction() == nusb::transfer::Direction::In {
            in_ep.get_or_insert(endpoint.address());
        } else {
            out_ep.get_or_insert(endpoint.address());
        }
    }
    match (in_ep, out_ep) {
        (Some(i), Some(o)) => Ok((i, o)),
        _ => Err(TransportError::Protocol(
            "could not find a 64-byte bulk in/out endpoint pair".into(),
        )),
    }
}

/// An open, claimed USB interface wired up for bulk in/out transfer.
pub struct UsbDuplex {
    interface: Interface,
    in_endpoint: u8,
    out_endpoint: u8,
}

impl UsbDuplex {
    pub async fn write(&self, data: Vec<u8>) -> TransportResult<()> {
        let transfer = self.interface.bulk_out(self.out_endpoint, data);
        let completion = tokio::time::timeout(BULK_TIMEOUT, transfer)
            .await
            .map_err(|_| TransportError::Timeout(BULK_TIMEOUT))?;
        completion
            .into_result()
            .map_err(|e| TransportError::UsbTransfer(e.to_string()))?;
        Ok(())
    }

    pub async fn read(&self, max_len: usize) -> TransportResult<Vec<u8>> {
        let transfer = self
            .interface
            .bulk_in(self.in_endpoint, RequestBuffer::new(max_len));
        let completion = tokio::time::timeout(BULK_TIMEOUT, transfer)
            .await
            .map_err(|_| TransportError::Timeout(BULK_TIMEOUT))?;
        completion
            .into_result()
            .map_err(|e| TransportError::UsbTransfer(e.to_string()))
    }

    pub async fn close(self) {
        // Releasing the interface can fail if the device already vanished;
        // that is the disconnect we are about to wait for anyway.
        drop(self.interface);
    }
}

/// Polls device enumeration until the previously-open device is no longer
/// present, used to detect a HotSync session's device unplug.
pub async fn wait_for_disconnect(vendor_id: u16, product_id: u16) {
    loop {
        let still_present = match nusb::list_devices() {
            Ok(mut devices) => devices.any(|d| d.vendor_id() == vendor_id && d.product_id() == product_id),
            Err(e) => {
                warn!(error = %e, "failed to enumerate USB devices while waiting for disconnect");
                false
            }
        };
        if !still_present {
            return;
        }
        tokio::time::sleep(DISCOVERY_POLL_INTERVAL).await;
    }
}
