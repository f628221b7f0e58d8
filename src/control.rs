//! Typed classification of USB control requests.
//!
//! The USB stack hands every setup packet it does not answer itself to
//! the firmware's handler. [`classify`] turns the raw packet into one of
//! the requests this firmware knows, or `None` so the stack can reject it.

use crate::fmt::debug;
use crate::hid::Protocol;

/// `bmRequestType`: device-to-host, standard, interface.
const IN_STANDARD_INTERFACE: u8 = 0x81;
/// `bmRequestType`: host-to-device, class, interface.
const OUT_CLASS_INTERFACE: u8 = 0x21;
/// `bmRequestType`: device-to-host, class, interface.
const IN_CLASS_INTERFACE: u8 = 0xA1;

const REQ_GET_DESCRIPTOR: u8 = 0x06;
/// HID class descriptor, index 0.
const HID_DESCRIPTOR_VALUE: u16 = 0x2100;
/// HID report descriptor, index 0.
const HID_REPORT_DESCRIPTOR_VALUE: u16 = 0x2200;

const HID_GET_REPORT: u8 = 0x01;
const HID_GET_IDLE: u8 = 0x02;
const HID_GET_PROTOCOL: u8 = 0x03;
const HID_SET_IDLE: u8 = 0x0A;
const HID_SET_PROTOCOL: u8 = 0x0B;

const DFU_DETACH: u8 = 0x00;

const MSC_GET_MAX_LUN: u8 = 0xFE;
const MSC_BULK_ONLY_RESET: u8 = 0xFF;

/// DFU functional descriptor type.
pub const DFU_FUNCTIONAL_DESCRIPTOR_TYPE: u8 = 0x21;

/// A raw setup packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    /// Parse the 8-byte setup stage.
    pub fn from_bytes(raw: &[u8; 8]) -> Self {
        Self {
            request_type: raw[0],
            request: raw[1],
            value: u16::from_le_bytes([raw[2], raw[3]]),
            index: u16::from_le_bytes([raw[4], raw[5]]),
            length: u16::from_le_bytes([raw[6], raw[7]]),
        }
    }

    fn interface(&self) -> u8 {
        (self.index & 0xFF) as u8
    }
}

/// Interface numbers present in the active configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceMap {
    pub hid: Option<u8>,
    pub dfu: Option<u8>,
    pub msc: Option<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidRequest {
    /// GET_DESCRIPTOR(Report).
    ReportDescriptor,
    /// GET_DESCRIPTOR(HID).
    HidDescriptor,
    GetReport,
    GetIdle,
    GetProtocol,
    /// SET_IDLE; `duration` in units of 4 ms, 0 = indefinite.
    SetIdle { duration: u8 },
    SetProtocol { protocol: Protocol },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DfuRequest {
    /// Leave run-time mode within `timeout_ms`.
    Detach { timeout_ms: u16 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MscRequest {
    /// Bulk-Only Mass Storage Reset.
    Reset,
    /// Highest LUN index; always answered with 0.
    GetMaxLun,
}

/// Every control request the firmware handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlRequest {
    Hid(HidRequest),
    Dfu(DfuRequest),
    Msc(MscRequest),
}

/// Map a setup packet onto a known request, checking that it targets the
/// interface that owns it.
pub fn classify(setup: &SetupPacket, interfaces: &InterfaceMap) -> Option<ControlRequest> {
    let iface = Some(setup.interface());

    let request = match (setup.request_type, setup.request) {
        (IN_STANDARD_INTERFACE, REQ_GET_DESCRIPTOR)
            if setup.value == HID_REPORT_DESCRIPTOR_VALUE && iface == interfaces.hid =>
        {
            ControlRequest::Hid(HidRequest::ReportDescriptor)
        }
        (IN_STANDARD_INTERFACE, REQ_GET_DESCRIPTOR)
            if setup.value == HID_DESCRIPTOR_VALUE && iface == interfaces.hid =>
        {
            ControlRequest::Hid(HidRequest::HidDescriptor)
        }
        (IN_CLASS_INTERFACE, HID_GET_REPORT) if iface == interfaces.hid => {
            ControlRequest::Hid(HidRequest::GetReport)
        }
        (IN_CLASS_INTERFACE, HID_GET_IDLE) if iface == interfaces.hid => {
            ControlRequest::Hid(HidRequest::GetIdle)
        }
        (IN_CLASS_INTERFACE, HID_GET_PROTOCOL) if iface == interfaces.hid => {
            ControlRequest::Hid(HidRequest::GetProtocol)
        }
        (OUT_CLASS_INTERFACE, HID_SET_IDLE) if iface == interfaces.hid => {
            ControlRequest::Hid(HidRequest::SetIdle {
                duration: (setup.value >> 8) as u8,
            })
        }
        (OUT_CLASS_INTERFACE, HID_SET_PROTOCOL) if iface == interfaces.hid => {
            let protocol = match setup.value {
                0 => Protocol::Boot,
                1 => Protocol::Report,
                _ => return None,
            };
            ControlRequest::Hid(HidRequest::SetProtocol { protocol })
        }
        (OUT_CLASS_INTERFACE, DFU_DETACH) if iface == interfaces.dfu => {
            ControlRequest::Dfu(DfuRequest::Detach {
                timeout_ms: setup.value,
            })
        }
        (OUT_CLASS_INTERFACE, MSC_BULK_ONLY_RESET)
            if iface == interfaces.msc && setup.length == 0 =>
        {
            ControlRequest::Msc(MscRequest::Reset)
        }
        (IN_CLASS_INTERFACE, MSC_GET_MAX_LUN) if iface == interfaces.msc && setup.length >= 1 => {
            ControlRequest::Msc(MscRequest::GetMaxLun)
        }
        _ => return None,
    };

    debug!("control request {}", request);
    Some(request)
}

/// Body of the DFU functional descriptor (everything after
/// `bLength`/`bDescriptorType`).
pub fn dfu_functional_descriptor(
    attributes: u8,
    detach_timeout_ms: u16,
    transfer_size: u16,
    version: u16,
) -> [u8; 7] {
    let timeout = detach_timeout_ms.to_le_bytes();
    let transfer = transfer_size.to_le_bytes();
    let bcd = version.to_le_bytes();
    [
        attributes,
        timeout[0],
        timeout[1],
        transfer[0],
        transfer[1],
        bcd[0],
        bcd[1],
    ]
}
