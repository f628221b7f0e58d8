//! Control request handler shared by both variants.
//!
//! Translates each setup packet into a [`ControlRequest`] and dispatches
//! on the variant. Anything `classify` does not know is left to
//! `embassy-usb`, which rejects it.

use defmt::{debug, info};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_usb::control::{InResponse, OutResponse, Request};
use embassy_usb::driver::Direction;
use embassy_usb::Builder;
use keyscript::control::{
    classify, ControlRequest, DfuRequest, InterfaceMap, MscRequest, SetupPacket,
};
use keyscript::hid::BootKeyboard;
use static_cell::StaticCell;

use super::UsbDriver;

static CONTROL_HANDLER: StaticCell<ControlHandler> = StaticCell::new();

/// Raised when the host asks the DFU interface to detach.
pub static DFU_DETACH: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Raised on a Bulk-Only Mass Storage Reset. The storage task abandons
/// the command in flight when it sees this.
pub static MSC_RESET: Signal<CriticalSectionRawMutex, ()> = Signal::new();

pub struct ControlHandler {
    interfaces: InterfaceMap,
    keyboard: BootKeyboard,
    report_descriptor: &'static [u8],
}

/// Register the handler for the interfaces built so far.
///
/// `report_descriptor` is served for the HID interface; pass an empty
/// slice when there is none.
pub fn register(
    builder: &mut Builder<'static, UsbDriver>,
    interfaces: InterfaceMap,
    report_descriptor: &'static [u8],
) {
    info!("USB interfaces: {}", interfaces);
    let handler = CONTROL_HANDLER.init(ControlHandler {
        interfaces,
        keyboard: BootKeyboard::new(),
        report_descriptor,
    });
    builder.handler(handler);
}

fn setup_packet(req: &Request) -> SetupPacket {
    let direction = match req.direction {
        Direction::In => 0x80,
        Direction::Out => 0x00,
    };
    SetupPacket {
        request_type: direction | ((req.request_type as u8) << 5) | (req.recipient as u8),
        request: req.request,
        value: req.value,
        index: req.index,
        length: req.length,
    }
}

impl embassy_usb::Handler for ControlHandler {
    fn reset(&mut self) {
        self.keyboard = BootKeyboard::new();
    }

    fn configured(&mut self, configured: bool) {
        info!("USB configured: {}", configured);
    }

    fn suspended(&mut self, suspended: bool) {
        info!("USB suspended: {}", suspended);
    }

    fn control_out(&mut self, req: Request, _data: &[u8]) -> Option<OutResponse> {
        let accepted = match classify(&setup_packet(&req), &self.interfaces)? {
            ControlRequest::Hid(request) => self.keyboard.set(request),
            ControlRequest::Dfu(DfuRequest::Detach { timeout_ms }) => {
                info!("DFU detach requested (timeout {} ms)", timeout_ms);
                DFU_DETACH.signal(());
                true
            }
            ControlRequest::Msc(MscRequest::Reset) => {
                info!("MSC: bulk-only reset");
                MSC_RESET.signal(());
                true
            }
            ControlRequest::Msc(MscRequest::GetMaxLun) => false,
        };
        Some(if accepted {
            OutResponse::Accepted
        } else {
            OutResponse::Rejected
        })
    }

    fn control_in<'a>(&'a mut self, req: Request, buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        let len = match classify(&setup_packet(&req), &self.interfaces)? {
            ControlRequest::Hid(request) => {
                self.keyboard.get(request, self.report_descriptor, buf)
            }
            ControlRequest::Msc(MscRequest::GetMaxLun) => {
                debug!("MSC: get max LUN");
                buf[0] = 0;
                Some(1)
            }
            ControlRequest::Dfu(_) | ControlRequest::Msc(MscRequest::Reset) => None,
        };
        Some(match len {
            Some(n) => InResponse::Accepted(&buf[..n]),
            None => InResponse::Rejected,
        })
    }
}
