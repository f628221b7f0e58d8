//! Boot keyboard that types the configured script.
//!
//! Initialises the Embassy USB stack with a single HID keyboard interface
//! (plus the DFU run-time interface when built with `dfu`) and drives it
//! from the keystroke scheduler.
//!
//! The interface is built by hand rather than through the embassy HID
//! class, which only declares subclass/protocol 0. Hosts that speak the
//! boot protocol need subclass Boot / protocol Keyboard.

use defmt::{debug, info, warn};
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Ticker, Timer};
use embassy_usb::driver::{Driver, Endpoint, EndpointIn};
use embassy_usb::{Builder, UsbDevice};
use keyscript::config;
use keyscript::control::InterfaceMap;
use keyscript::hid::class::{
    hid_descriptor, HID_DESCRIPTOR_TYPE, HID_PROTOCOL_KEYBOARD, HID_SUBCLASS_BOOT, USB_CLASS_HID,
};
use keyscript::DefaultScheduler;
use usbd_hid::descriptor::{KeyboardReport as BootReport, SerializedDescriptor};

use super::{handler, Identity, UsbDriver};

const IDENTITY: Identity = Identity {
    vid: config::KEYBOARD_VID,
    pid: config::KEYBOARD_PID,
    release: config::KEYBOARD_DEVICE_RELEASE,
    manufacturer: config::KEYBOARD_MANUFACTURER,
    product: config::KEYBOARD_PRODUCT,
    serial_number: config::KEYBOARD_SERIAL_NUMBER,
};

/// Interrupt IN endpoint carrying the 8-byte reports.
pub type KeyboardEndpoint = <UsbDriver as Driver<'static>>::EndpointIn;

/// Build result containing the USB device runner and the report endpoint.
pub struct UsbKeyboard {
    pub device: UsbDevice<'static, UsbDriver>,
    pub endpoint: KeyboardEndpoint,
}

/// Initialise the USB stack and create the keyboard device.
///
/// Must be called exactly once.
pub fn init(driver: UsbDriver) -> UsbKeyboard {
    let mut builder = super::builder(driver, &IDENTITY);

    let report_descriptor = BootReport::desc();

    let (endpoint, hid_interface) = add_interface(&mut builder, report_descriptor);

    #[allow(unused_mut)]
    let mut interfaces = InterfaceMap {
        hid: Some(hid_interface),
        ..InterfaceMap::default()
    };
    #[cfg(feature = "dfu")]
    {
        interfaces.dfu = Some(super::dfu::add_interface(&mut builder));
    }
    handler::register(&mut builder, interfaces, report_descriptor);

    let device = builder.build();

    info!("USB keyboard initialised");

    UsbKeyboard { device, endpoint }
}

/// Add the boot keyboard interface and return its report endpoint and
/// interface number.
fn add_interface(
    builder: &mut Builder<'static, UsbDriver>,
    report_descriptor: &[u8],
) -> (KeyboardEndpoint, u8) {
    let mut func = builder.function(USB_CLASS_HID, HID_SUBCLASS_BOOT, HID_PROTOCOL_KEYBOARD);
    let mut iface = func.interface();
    let number = iface.interface_number();
    let mut alt = iface.alt_setting(USB_CLASS_HID, HID_SUBCLASS_BOOT, HID_PROTOCOL_KEYBOARD, None);
    alt.descriptor(
        HID_DESCRIPTOR_TYPE,
        &hid_descriptor(report_descriptor.len() as u16),
    );
    let endpoint = alt.endpoint_interrupt_in(config::USB_HID_MAX_PACKET, config::USB_HID_POLL_MS);
    (endpoint, number.into())
}

/// Typing task. Waits for the host to configure the keyboard, then runs
/// the scheduler once per tick until the script is exhausted.
///
/// A report the host has not collected within one tick is dropped.
#[embassy_executor::task]
pub async fn keyboard_task(mut endpoint: KeyboardEndpoint, mut scheduler: DefaultScheduler) {
    endpoint.wait_enabled().await;
    info!(
        "keyboard configured, typing {} payloads",
        scheduler.script().payloads().len()
    );

    let period = Duration::from_micros(config::TICK_PERIOD_US);
    let mut ticker = Ticker::every(period);

    while !scheduler.is_finished() {
        ticker.next().await;

        let Some(report) = scheduler.on_tick() else {
            continue;
        };
        let bytes = report.to_bytes();

        match select(endpoint.write(&bytes), Timer::after(period)).await {
            Either::First(Ok(())) => {}
            Either::First(Err(_e)) => warn!("USB keyboard write failed"),
            Either::Second(()) => {
                debug!("report at tick {} not collected", scheduler.tick());
            }
        }
    }

    info!("script finished at tick {}", scheduler.tick());
}
