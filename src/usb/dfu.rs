//! DFU run-time interface.
//!
//! Advertises DFU class 0xFE/0x01 protocol 1 next to the keyboard. On
//! `DFU_DETACH` the handler raises [`handler::DFU_DETACH`]; this module
//! then asserts the boot-request pin and resets into the bootloader.

use defmt::info;
use embassy_nrf::gpio::{AnyPin, Level, Output, OutputDrive};
use embassy_time::Timer;
use embassy_usb::Builder;
use keyscript::config;
use keyscript::control::{dfu_functional_descriptor, DFU_FUNCTIONAL_DESCRIPTOR_TYPE};

use super::{handler, UsbDriver};

const USB_CLASS_APPLICATION_SPECIFIC: u8 = 0xFE;
const DFU_SUBCLASS: u8 = 0x01;
const DFU_PROTOCOL_RUNTIME: u8 = 0x01;

/// Add the run-time interface and return its number.
pub fn add_interface(builder: &mut Builder<'static, UsbDriver>) -> u8 {
    let mut func = builder.function(
        USB_CLASS_APPLICATION_SPECIFIC,
        DFU_SUBCLASS,
        DFU_PROTOCOL_RUNTIME,
    );
    let mut iface = func.interface();
    let number = iface.interface_number();
    let mut alt = iface.alt_setting(
        USB_CLASS_APPLICATION_SPECIFIC,
        DFU_SUBCLASS,
        DFU_PROTOCOL_RUNTIME,
        None,
    );
    alt.descriptor(
        DFU_FUNCTIONAL_DESCRIPTOR_TYPE,
        &dfu_functional_descriptor(
            config::DFU_ATTRIBUTES,
            config::DFU_DETACH_TIMEOUT_MS,
            config::DFU_TRANSFER_SIZE,
            config::DFU_VERSION,
        ),
    );
    number.into()
}

/// Wait for a detach request, then hand over to the bootloader.
///
/// The bootloader samples `boot_pin` after reset; it is driven high for
/// the whole reset delay so the status stage of the request completes.
#[embassy_executor::task]
pub async fn detach_task(boot_pin: AnyPin) -> ! {
    handler::DFU_DETACH.wait().await;
    info!("DFU detach: rebooting into bootloader");

    let _boot = Output::new(boot_pin, Level::High, OutputDrive::Standard);
    Timer::after_millis(config::DFU_RESET_DELAY_MS).await;

    cortex_m::peripheral::SCB::sys_reset()
}
