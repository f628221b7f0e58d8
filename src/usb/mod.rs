//! USB Device subsystem.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`. Depending on the build the device exposes:
//!
//! - keyboard variant: Interface 0 = boot keyboard, Interface 1 = DFU
//!   run-time (with the `dfu` feature)
//! - `ramdisk` variant: Interface 0 = Bulk-Only mass storage
//!
//! Class requests that `embassy-usb` does not answer itself go through
//! [`handler::ControlHandler`].

pub mod handler;

#[cfg(all(feature = "dfu", not(feature = "ramdisk")))]
pub mod dfu;
#[cfg(not(feature = "ramdisk"))]
pub mod keyboard;
#[cfg(feature = "ramdisk")]
pub mod msc;

use defmt::info;
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_usb::{Builder, Config, UsbDevice};
use keyscript::config;
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();

/// Device descriptor fields that differ between the variants.
pub struct Identity {
    pub vid: u16,
    pub pid: u16,
    pub release: u16,
    pub manufacturer: &'static str,
    pub product: &'static str,
    pub serial_number: &'static str,
}

/// Create the low-level USB driver with hardware VBUS detection.
pub fn driver(usbd: peripherals::USBD) -> UsbDriver {
    Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs))
}

/// Start a device builder. All static buffers are consumed here, so this
/// must be called exactly once.
pub fn builder(driver: UsbDriver, identity: &Identity) -> Builder<'static, UsbDriver> {
    let mut usb_config = Config::new(identity.vid, identity.pid);
    usb_config.manufacturer = Some(identity.manufacturer);
    usb_config.product = Some(identity.product);
    usb_config.serial_number = Some(identity.serial_number);
    usb_config.device_release = identity.release;
    usb_config.max_power = config::USB_MAX_POWER_MA;
    usb_config.max_packet_size_0 = 64;

    // Class is declared per interface; no interface association descriptors.
    usb_config.device_class = 0x00;
    usb_config.device_sub_class = 0x00;
    usb_config.device_protocol = 0x00;
    usb_config.composite_with_iads = false;

    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 128]);

    Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    )
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
///
/// This handles USB enumeration, suspend/resume, and endpoint servicing.
#[embassy_executor::task]
pub async fn usb_device_task(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}
