//! Bulk-Only mass storage interface over the RAM disk.
//!
//! Pumps Command Block Wrappers from the bulk OUT endpoint through the
//! [`ScsiTarget`], moves the data stage in max-packet chunks and answers
//! with a Command Status Wrapper on the bulk IN endpoint.

use defmt::{debug, info, warn};
use embassy_futures::select::{select, Either};
use embassy_usb::driver::{Driver, Endpoint, EndpointIn, EndpointOut};
use embassy_usb::{Builder, UsbDevice};
use keyscript::config;
use keyscript::control::InterfaceMap;
use keyscript::msc::{
    CommandBlockWrapper, CommandStatus, Response, ScsiTarget, Termination,
    CLASS_MASS_STORAGE, PROTOCOL_BULK_ONLY, SUBCLASS_SCSI_TRANSPARENT,
};
use keyscript::{BotError, DefaultRamDisk, Error};

use super::{handler, Identity, UsbDriver};

type BulkOut = <UsbDriver as Driver<'static>>::EndpointOut;
type BulkIn = <UsbDriver as Driver<'static>>::EndpointIn;
type Target = ScsiTarget<&'static mut DefaultRamDisk>;

const PACKET: usize = config::USB_BULK_MAX_PACKET as usize;
const SECTOR: usize = config::RAMDISK_SECTOR_SIZE;

const IDENTITY: Identity = Identity {
    vid: config::RAMDISK_VID,
    pid: config::RAMDISK_PID,
    release: config::RAMDISK_DEVICE_RELEASE,
    manufacturer: config::RAMDISK_MANUFACTURER,
    product: config::RAMDISK_PRODUCT,
    serial_number: config::RAMDISK_SERIAL_NUMBER,
};

/// The two bulk endpoints of the storage interface.
pub struct BulkOnly {
    out_ep: BulkOut,
    in_ep: BulkIn,
}

/// Build result containing the USB device runner and the storage endpoints.
pub struct UsbRamDisk {
    pub device: UsbDevice<'static, UsbDriver>,
    pub transport: BulkOnly,
}

/// Initialise the USB stack and create the mass storage device.
///
/// Must be called exactly once.
pub fn init(driver: UsbDriver) -> UsbRamDisk {
    let mut builder = super::builder(driver, &IDENTITY);
    let (transport, number) = add_interface(&mut builder);

    handler::register(
        &mut builder,
        InterfaceMap {
            msc: Some(number),
            ..InterfaceMap::default()
        },
        &[],
    );

    let device = builder.build();

    info!("USB mass storage initialised");

    UsbRamDisk { device, transport }
}

fn add_interface(builder: &mut Builder<'static, UsbDriver>) -> (BulkOnly, u8) {
    let mut func = builder.function(
        CLASS_MASS_STORAGE,
        SUBCLASS_SCSI_TRANSPARENT,
        PROTOCOL_BULK_ONLY,
    );
    let mut iface = func.interface();
    let number = iface.interface_number();
    let mut alt = iface.alt_setting(
        CLASS_MASS_STORAGE,
        SUBCLASS_SCSI_TRANSPARENT,
        PROTOCOL_BULK_ONLY,
        None,
    );
    let out_ep = alt.endpoint_bulk_out(config::USB_BULK_MAX_PACKET);
    let in_ep = alt.endpoint_bulk_in(config::USB_BULK_MAX_PACKET);
    (BulkOnly { out_ep, in_ep }, number.into())
}

/// Storage task. Serves commands until the endpoints are disabled, then
/// waits for the host to configure the device again.
///
/// A Bulk-Only reset abandons the command in flight, data stage included,
/// and the next packet is read as a fresh CBW.
#[embassy_executor::task]
pub async fn msc_task(mut transport: BulkOnly, disk: &'static mut DefaultRamDisk) -> ! {
    let mut target = ScsiTarget::new(disk);

    loop {
        transport.out_ep.wait_enabled().await;
        info!("MSC: bulk endpoints enabled");
        handler::MSC_RESET.reset();

        loop {
            match select(transport.serve(&mut target), handler::MSC_RESET.wait()).await {
                Either::First(Ok(())) => {}
                Either::First(Err(Error::Usb)) => break,
                Either::First(Err(e)) => warn!("MSC: dropped command: {}", e),
                Either::Second(()) => info!("MSC: command abandoned by reset"),
            }
        }
        info!("MSC: bulk endpoints disabled");
    }
}

impl BulkOnly {
    /// Run one command: CBW, optional data stage, CSW.
    async fn serve(&mut self, target: &mut Target) -> Result<(), Error> {
        let mut packet = [0u8; PACKET];
        let n = self.out_ep.read(&mut packet).await.map_err(|_| Error::Usb)?;
        let cbw = CommandBlockWrapper::parse(&packet[..n])?;
        let expected = cbw.data_transfer_length;

        let response = target.execute(cbw.command());
        let (status, moved) = if !cbw.accepts(response.direction()) {
            (CommandStatus::PhaseError, 0)
        } else {
            match response {
                Response::NoData => (CommandStatus::Passed, 0),
                Response::DataIn(data) => {
                    let len = data.len().min(expected as usize);
                    self.send(&data[..len]).await?;
                    (CommandStatus::Passed, len as u32)
                }
                Response::ReadBlocks { lba, count } => {
                    self.read_blocks(target, lba, count, expected).await?
                }
                Response::WriteBlocks { lba, count } => {
                    self.write_blocks(target, lba, count, expected).await?
                }
                Response::Failed => (CommandStatus::Failed, 0),
            }
        };

        let (csw, termination) = cbw.complete(status, moved, PACKET);
        match termination {
            Termination::Complete => {}
            Termination::ZeroLengthPacket => {
                self.in_ep.write(&[]).await.map_err(|_| Error::Usb)?;
            }
            Termination::Drain(remaining) => self.drain(remaining).await?,
        }

        debug!("MSC: tag={} status={} residue={}", csw.tag, csw.status, csw.residue);
        self.in_ep
            .write(&csw.to_bytes())
            .await
            .map_err(|_| Error::Usb)
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        for chunk in data.chunks(PACKET) {
            self.in_ep.write(chunk).await.map_err(|_| Error::Usb)?;
        }
        Ok(())
    }

    async fn read_blocks(
        &mut self,
        target: &mut Target,
        lba: u32,
        count: u32,
        expected: u32,
    ) -> Result<(CommandStatus, u32), Error> {
        let mut moved = 0u32;
        for i in 0..count {
            if expected - moved < SECTOR as u32 {
                return Ok((CommandStatus::PhaseError, moved));
            }
            let Ok(sector) = target.read_block(lba + i) else {
                return Ok((CommandStatus::Failed, moved));
            };
            self.send(sector).await?;
            moved += SECTOR as u32;
        }
        Ok((CommandStatus::Passed, moved))
    }

    async fn write_blocks(
        &mut self,
        target: &mut Target,
        lba: u32,
        count: u32,
        expected: u32,
    ) -> Result<(CommandStatus, u32), Error> {
        let mut sector = [0u8; SECTOR];
        let mut moved = 0u32;
        let mut status = CommandStatus::Passed;

        for i in 0..count {
            if expected - moved < SECTOR as u32 {
                return Ok((CommandStatus::PhaseError, moved));
            }
            for chunk in sector.chunks_mut(PACKET) {
                let n = self.out_ep.read(chunk).await.map_err(|_| Error::Usb)?;
                // A short packet ends the host's data stage early. The
                // partial sector is never stored and no CSW follows; the
                // host recovers with a reset.
                if n < chunk.len() {
                    return Err(BotError::ShortDataStage.into());
                }
            }
            moved += SECTOR as u32;
            // Keep consuming the data stage after a failure.
            if status == CommandStatus::Passed && target.write_block(lba + i, &sector).is_err() {
                status = CommandStatus::Failed;
            }
        }
        Ok((status, moved))
    }

    /// Discard OUT data the command did not consume.
    async fn drain(&mut self, mut remaining: u32) -> Result<(), Error> {
        let mut scratch = [0u8; PACKET];
        while remaining > 0 {
            let n = self.out_ep.read(&mut scratch).await.map_err(|_| Error::Usb)?;
            if n == 0 {
                break;
            }
            remaining = remaining.saturating_sub(n as u32);
        }
        Ok(())
    }
}
