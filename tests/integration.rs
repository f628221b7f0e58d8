//! Integration tests for keyscript host-testable logic.

use keyscript::control::{
    classify, ControlRequest, HidRequest, InterfaceMap, MscRequest, SetupPacket,
};
use keyscript::hid::{BootKeyboard, Protocol};
use keyscript::msc::{
    CommandBlockWrapper, CommandStatus, CommandStatusWrapper, DataDirection, Response, ScsiTarget,
    Termination,
};
use keyscript::{BlockDevice, BlockError, DefaultRamDisk, KeyboardReport, Payload, Scheduler, Script};

#[test]
fn single_key_script_sends_press_then_release() {
    let script = Script::<4>::new(&[Payload::new(0, "X")]).expect("valid script");
    let mut scheduler = Scheduler::new(script);

    let mut sent = Vec::new();
    for _ in 0..2 {
        if let Some(report) = scheduler.on_tick() {
            sent.push(report.to_bytes());
        }
    }

    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], [0x02, 0x00, 27, 0x00, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(sent[1], [0u8; 8]);
    assert_eq!(scheduler.on_tick(), None);
}

#[test]
fn default_script_types_every_payload_once() {
    let mut scheduler = keyscript::default_scheduler().expect("default script");
    let mut presses = 0;
    let mut releases = 0;

    while !scheduler.is_finished() {
        match scheduler.on_tick() {
            Some(r) if r == KeyboardReport::empty() => releases += 1,
            Some(_) => presses += 1,
            None => {}
        }
    }

    let chars: usize = keyscript::config::DEFAULT_SCRIPT
        .iter()
        .map(|p| p.text().len())
        .sum();
    assert_eq!(presses, chars);
    assert_eq!(releases, chars);
}

#[test]
fn ramdisk_roundtrip_through_block_device() {
    let mut disk = Box::new(DefaultRamDisk::new());
    let sector: Vec<u8> = (0..512u32).map(|i| (i * 7) as u8).collect();

    disk.block_write(0, 1, &sector).expect("write");
    assert_eq!(disk.block_read(0, 1).expect("read"), &sector[..]);

    let (sectors, size) = disk.geometry();
    assert_eq!((sectors, size), (32, 512));
    assert_eq!(
        disk.block_read(sectors - 1, 2),
        Err(BlockError::OutOfRange {
            lba: sectors - 1,
            count: 2
        })
    );
}

#[test]
fn scsi_write_then_read_over_bot() {
    let mut disk = Box::new(DefaultRamDisk::new());
    let mut target = ScsiTarget::new(&mut *disk);

    // WRITE(10) lba 3, 1 block
    let mut raw = [0u8; 31];
    raw[0..4].copy_from_slice(b"USBC");
    raw[4..8].copy_from_slice(&7u32.to_le_bytes());
    raw[8..12].copy_from_slice(&512u32.to_le_bytes());
    raw[14] = 10;
    raw[15..25].copy_from_slice(&[0x2A, 0, 0, 0, 0, 3, 0, 0, 1, 0]);
    let cbw = CommandBlockWrapper::parse(&raw).expect("cbw");

    assert_eq!(
        target.execute(cbw.command()),
        Response::WriteBlocks { lba: 3, count: 1 }
    );
    target.write_block(3, &[0x5A; 512]).expect("write block");

    let csw = CommandStatusWrapper {
        tag: cbw.tag,
        residue: 0,
        status: CommandStatus::Passed,
    };
    assert_eq!(&csw.to_bytes()[..8], b"USBS\x07\x00\x00\x00");

    assert!(target.read_block(3).expect("read block").iter().all(|&b| b == 0x5A));
}

#[test]
fn control_dispatch_by_variant() {
    let ramdisk = InterfaceMap {
        msc: Some(0),
        ..InterfaceMap::default()
    };
    let setup = SetupPacket::from_bytes(&[0xA1, 0xFE, 0, 0, 0, 0, 1, 0]);
    assert_eq!(
        classify(&setup, &ramdisk),
        Some(ControlRequest::Msc(MscRequest::GetMaxLun))
    );
}

fn cbw(tag: u32, len: u32, data_in: bool, cb: &[u8]) -> CommandBlockWrapper {
    let mut raw = [0u8; 31];
    raw[0..4].copy_from_slice(b"USBC");
    raw[4..8].copy_from_slice(&tag.to_le_bytes());
    raw[8..12].copy_from_slice(&len.to_le_bytes());
    raw[12] = if data_in { 0x80 } else { 0x00 };
    raw[14] = cb.len() as u8;
    raw[15..15 + cb.len()].copy_from_slice(cb);
    CommandBlockWrapper::parse(&raw).expect("cbw")
}

#[test]
fn bot_host_expects_more_than_read_returns() {
    let mut disk = Box::new(DefaultRamDisk::new());
    let mut target = ScsiTarget::new(&mut *disk);

    // READ(10) of one block, host allows two.
    let cbw = cbw(1, 1024, true, &[0x28, 0, 0, 0, 0, 0, 0, 0, 1, 0]);
    let response = target.execute(cbw.command());
    assert_eq!(response, Response::ReadBlocks { lba: 0, count: 1 });
    assert!(cbw.accepts(response.direction()));

    let (csw, end) = cbw.complete(CommandStatus::Passed, 512, 64);
    assert_eq!(csw.residue, 512);
    assert_eq!(csw.status, CommandStatus::Passed);
    assert_eq!(end, Termination::ZeroLengthPacket);
}

#[test]
fn bot_direction_mismatch_is_phase_error() {
    let mut disk = Box::new(DefaultRamDisk::new());
    let mut target = ScsiTarget::new(&mut *disk);

    // WRITE(10) wrapped as a data-in transfer.
    let cbw = cbw(2, 512, true, &[0x2A, 0, 0, 0, 0, 0, 0, 0, 1, 0]);
    let response = target.execute(cbw.command());
    assert_eq!(response.direction(), DataDirection::Out);
    assert!(!cbw.accepts(response.direction()));
}

#[test]
fn bot_failed_commands_close_the_data_stage() {
    let mut disk = Box::new(DefaultRamDisk::new());
    let mut target = ScsiTarget::new(&mut *disk);

    // Unsupported opcode while the host waits for 36 bytes.
    let read = cbw(3, 36, true, &[0xFF, 0, 0, 0, 36, 0]);
    assert_eq!(target.execute(read.command()), Response::Failed);
    let (csw, end) = read.complete(CommandStatus::Failed, 0, 64);
    assert_eq!((csw.residue, csw.status), (36, CommandStatus::Failed));
    assert_eq!(end, Termination::ZeroLengthPacket);

    // WRITE(10) past the end while the host has 1024 bytes to send.
    let write = cbw(4, 1024, false, &[0x2A, 0, 0, 0, 0, 31, 0, 0, 2, 0]);
    assert_eq!(target.execute(write.command()), Response::Failed);
    let (csw, end) = write.complete(CommandStatus::Failed, 0, 64);
    assert_eq!(csw.tag, 4);
    assert_eq!(end, Termination::Drain(1024));
}

#[test]
fn boot_host_switches_keyboard_to_boot_protocol() {
    let keyboard = InterfaceMap {
        hid: Some(0),
        ..InterfaceMap::default()
    };
    let mut state = BootKeyboard::new();
    let descriptor = [0x05, 0x01, 0x09, 0x06];

    let set = SetupPacket::from_bytes(&[0x21, 0x0B, 0, 0, 0, 0, 0, 0]);
    let Some(ControlRequest::Hid(request)) = classify(&set, &keyboard) else {
        panic!("SET_PROTOCOL not classified");
    };
    assert!(state.set(request));

    let get = SetupPacket::from_bytes(&[0xA1, 0x03, 0, 0, 0, 0, 1, 0]);
    assert_eq!(
        classify(&get, &keyboard),
        Some(ControlRequest::Hid(HidRequest::GetProtocol))
    );
    let mut buf = [0xFF; 1];
    assert_eq!(state.get(HidRequest::GetProtocol, &descriptor, &mut buf), Some(1));
    assert_eq!(state.protocol(), Protocol::Boot);
    assert_eq!(buf[0], 0);
}
