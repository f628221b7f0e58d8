//! keyscript - nRF52840 firmware entry point.
//!
//! Default build: a USB boot keyboard that types the configured script
//! once the host has configured it (add `dfu` for the DFU run-time
//! interface). With `ramdisk`: a Bulk-Only mass storage RAM disk.
//!
//! Flash with `cargo run --release --features embedded[,dfu|,ramdisk]`.

#![no_std]
#![no_main]

mod usb;

use defmt::info;
use embassy_executor::Spawner;
use embassy_nrf::pac;
use {defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("keyscript v{} starting", env!("CARGO_PKG_VERSION"));

    // USBD needs the external high-frequency crystal.
    pac::CLOCK.tasks_hfclkstart().write_value(1);
    while pac::CLOCK.events_hfclkstarted().read() != 1 {}

    let driver = usb::driver(p.USBD);

    #[cfg(not(feature = "ramdisk"))]
    {
        let scheduler = defmt::unwrap!(keyscript::default_scheduler());
        let kb = usb::keyboard::init(driver);

        #[cfg(feature = "dfu")]
        {
            use embassy_nrf::gpio::Pin as _;
            // P0.13 is wired to the bootloader's boot-request input.
            spawner.must_spawn(usb::dfu::detach_task(p.P0_13.degrade()));
        }

        spawner.must_spawn(usb::usb_device_task(kb.device));
        spawner.must_spawn(usb::keyboard::keyboard_task(kb.endpoint, scheduler));
    }

    #[cfg(feature = "ramdisk")]
    {
        use keyscript::DefaultRamDisk;
        use static_cell::ConstStaticCell;

        static DISK: ConstStaticCell<DefaultRamDisk> = ConstStaticCell::new(DefaultRamDisk::new());

        let msc = usb::msc::init(driver);
        spawner.must_spawn(usb::usb_device_task(msc.device));
        spawner.must_spawn(usb::msc::msc_task(msc.transport, DISK.take()));
    }

    info!("all tasks spawned");
}
