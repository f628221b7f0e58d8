//! Application-wide constants and compile-time configuration.
//!
//! USB identities, timing parameters, the keystroke script and the RAM
//! disk geometry live here so they can be tuned in one place.

use crate::scheduler::Payload;

// USB - keyboard variant

/// USB VID/PID of the keyboard variant.
pub const KEYBOARD_VID: u16 = 0x0483;
pub const KEYBOARD_PID: u16 = 0x5710;

/// USB device release number (BCD) of the keyboard variant.
pub const KEYBOARD_DEVICE_RELEASE: u16 = 0x0200;

/// USB device strings of the keyboard variant.
pub const KEYBOARD_MANUFACTURER: &str = "Black Sphere Technologies";
pub const KEYBOARD_PRODUCT: &str = "HID Demo";
pub const KEYBOARD_SERIAL_NUMBER: &str = "DEMO";

/// HID interrupt endpoint polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 10;

/// HID interrupt endpoint max packet size; one boot report per packet.
pub const USB_HID_MAX_PACKET: u16 = 8;

// USB - mass storage variant

/// USB VID/PID of the RAM disk variant.
pub const RAMDISK_VID: u16 = 0x1234;
pub const RAMDISK_PID: u16 = 0x5678;

/// USB device release number (BCD) of the RAM disk variant.
pub const RAMDISK_DEVICE_RELEASE: u16 = 0x0100;

/// USB device strings of the RAM disk variant.
pub const RAMDISK_MANUFACTURER: &str = "keyscript";
pub const RAMDISK_PRODUCT: &str = "RAM Disk";
pub const RAMDISK_SERIAL_NUMBER: &str = "000001";

/// Bulk endpoint max packet size (full speed).
pub const USB_BULK_MAX_PACKET: u16 = 64;

/// Bus power drawn by either variant (mA).
pub const USB_MAX_POWER_MA: u16 = 100;

// Keystroke scheduler

/// Scheduler tick period (µs). 8333 µs ≈ 120 Hz, the SysTick rate the
/// script delays were tuned for.
pub const TICK_PERIOD_US: u64 = 8_333;

/// Capacity of the script table.
pub const MAX_PAYLOADS: usize = 8;

/// Spacing between script payloads (ticks).
pub const PAYLOAD_SPACING_TICKS: u32 = 1000;

/// Script typed after the keyboard is configured.
///
/// `@` taps the GUI key, `#` sends Ctrl+S and `&` sends Alt+F4.
pub const DEFAULT_SCRIPT: &[Payload] = &[
    Payload::new(PAYLOAD_SPACING_TICKS, "  @"),
    Payload::new(2 * PAYLOAD_SPACING_TICKS, "cmd\n"),
    Payload::new(3 * PAYLOAD_SPACING_TICKS, "notepad script.py\n"),
    Payload::new(4 * PAYLOAD_SPACING_TICKS, "print('Hello world!')#&"),
    Payload::new(5 * PAYLOAD_SPACING_TICKS, "python script.py\n"),
];

// DFU run-time interface

/// `bmAttributes`: bitCanDnload | bitWillDetach.
pub const DFU_ATTRIBUTES: u8 = 0x01 | 0x08;

/// Time the host waits for the detach-triggered reset (ms).
pub const DFU_DETACH_TIMEOUT_MS: u16 = 255;

/// Largest DFU transfer the bootloader accepts (bytes).
pub const DFU_TRANSFER_SIZE: u16 = 1024;

/// DFU class version 1.1a (BCD).
pub const DFU_VERSION: u16 = 0x011A;

/// Delay between accepting DFU_DETACH and resetting, so the status stage
/// reaches the host (ms).
pub const DFU_RESET_DELAY_MS: u64 = 10;

// RAM disk

/// Number of sectors in the RAM disk.
pub const RAMDISK_SECTORS: usize = 32;

/// Sector size in bytes.
pub const RAMDISK_SECTOR_SIZE: usize = 512;

/// SCSI INQUIRY identification (space padded to field width).
pub const SCSI_VENDOR_ID: &[u8; 8] = b"KEYSCRPT";
pub const SCSI_PRODUCT_ID: &[u8; 16] = b"RAM Disk        ";
pub const SCSI_PRODUCT_REVISION: &[u8; 4] = b"0.10";
