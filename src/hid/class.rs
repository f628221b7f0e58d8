//! Boot keyboard interface: descriptors and HID class requests.
//!
//! The interface is declared as subclass Boot / protocol Keyboard so that
//! hosts without a report parser (BIOS, boot loaders) accept it. The
//! report layout is the boot layout in both protocols, so switching
//! protocol only changes what GET_PROTOCOL answers.

use super::keyboard::{KeyboardReport, KEYBOARD_REPORT_SIZE};
use crate::control::HidRequest;
use crate::fmt::debug;

pub const USB_CLASS_HID: u8 = 0x03;
pub const HID_SUBCLASS_BOOT: u8 = 0x01;
pub const HID_PROTOCOL_KEYBOARD: u8 = 0x01;

/// HID class descriptor type.
pub const HID_DESCRIPTOR_TYPE: u8 = 0x21;
/// HID report descriptor type.
pub const HID_REPORT_DESCRIPTOR_TYPE: u8 = 0x22;

/// HID 1.11 (BCD).
const BCD_HID: u16 = 0x0111;

/// Body of the HID class descriptor (everything after
/// `bLength`/`bDescriptorType`), announcing one report descriptor.
pub fn hid_descriptor(report_descriptor_len: u16) -> [u8; 7] {
    let bcd = BCD_HID.to_le_bytes();
    let len = report_descriptor_len.to_le_bytes();
    [
        bcd[0],
        bcd[1],
        0x00, // not localized
        0x01, // one class descriptor
        HID_REPORT_DESCRIPTOR_TYPE,
        len[0],
        len[1],
    ]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Protocol {
    Boot = 0,
    Report = 1,
}

/// Host-visible state of the keyboard interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootKeyboard {
    idle: u8,
    protocol: Protocol,
}

impl Default for BootKeyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl BootKeyboard {
    /// Power-on state: report protocol, idle rate 0 (report on change only).
    pub const fn new() -> Self {
        Self {
            idle: 0,
            protocol: Protocol::Report,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Idle rate in units of 4 ms.
    pub fn idle(&self) -> u8 {
        self.idle
    }

    /// Apply a host-to-device request. Returns `false` for requests that
    /// carry no OUT stage.
    pub fn set(&mut self, request: HidRequest) -> bool {
        match request {
            HidRequest::SetIdle { duration } => {
                self.idle = duration;
                true
            }
            HidRequest::SetProtocol { protocol } => {
                debug!("HID protocol -> {}", protocol);
                self.protocol = protocol;
                true
            }
            HidRequest::ReportDescriptor
            | HidRequest::HidDescriptor
            | HidRequest::GetReport
            | HidRequest::GetIdle
            | HidRequest::GetProtocol => false,
        }
    }

    /// Answer a device-to-host request into `buf`. Returns the number of
    /// bytes written, or `None` for requests without an IN stage. Replies
    /// longer than `buf` are truncated.
    pub fn get(&self, request: HidRequest, report_descriptor: &[u8], buf: &mut [u8]) -> Option<usize> {
        let mut scratch = [0u8; 9];
        let reply: &[u8] = match request {
            HidRequest::ReportDescriptor => report_descriptor,
            HidRequest::HidDescriptor => {
                scratch[0] = 9;
                scratch[1] = HID_DESCRIPTOR_TYPE;
                scratch[2..].copy_from_slice(&hid_descriptor(report_descriptor.len() as u16));
                &scratch
            }
            HidRequest::GetReport => {
                // Reports are fire-and-forget; nothing is held between ticks.
                KeyboardReport::empty().serialize(&mut scratch);
                &scratch[..KEYBOARD_REPORT_SIZE]
            }
            HidRequest::GetIdle => {
                scratch[0] = self.idle;
                &scratch[..1]
            }
            HidRequest::GetProtocol => {
                scratch[0] = self.protocol as u8;
                &scratch[..1]
            }
            HidRequest::SetIdle { .. } | HidRequest::SetProtocol { .. } => return None,
        };
        let n = reply.len().min(buf.len());
        buf[..n].copy_from_slice(&reply[..n]);
        Some(n)
    }
}
