//! Linux I2C driver (`/dev/i2c-N`) backed by `rppal`.

use opto16_common::bus::{BusError, I2cBus};
use opto16_common::config::BusConfig;
use opto16_common::consts::I2C_BUS_INDEX;
use rppal::i2c::{Error as RppalError, I2c};
use tracing::{debug, info};

/// Handle on a Linux I2C character device.
pub struct LinuxI2cBus {
    bus: u8,
    /// `None` once released.
    i2c: Option<I2c>,
    /// Slave address currently selected on the handle.
    selected: Option<u8>,
}

impl LinuxI2cBus {
    /// Open `/dev/i2c-{bus}`.
    pub fn open(bus: u8) -> Result<Self, BusError> {
        let i2c = I2c::with_bus(bus).map_err(|e| BusError::Open {
            bus,
            reason: e.to_string(),
        })?;
        info!("Opened /dev/i2c-{}", bus);
        Ok(Self {
            bus,
            i2c: Some(i2c),
            selected: None,
        })
    }
}

impl I2cBus for LinuxI2cBus {
    fn name(&self) -> &'static str {
        "i2cdev"
    }

    fn read_word(&mut self, address: u8, register: u8) -> Result<u16, BusError> {
        let i2c = self.i2c.as_mut().ok_or(BusError::Closed)?;
        if self.selected != Some(address) {
            i2c.set_slave_address(u16::from(address))
                .map_err(|e| map_error(e, address))?;
            self.selected = Some(address);
        }
        i2c.smbus_read_word(register)
            .map_err(|e| map_error(e, address))
    }

    fn close(&mut self) -> Result<(), BusError> {
        // The device file is closed when the handle drops.
        if self.i2c.take().is_some() {
            debug!("Released /dev/i2c-{}", self.bus);
        }
        self.selected = None;
        Ok(())
    }
}

/// Translate a transport error; errno decides NACK vs timeout.
fn map_error(err: RppalError, address: u8) -> BusError {
    match err {
        RppalError::Io(io) => match io.raw_os_error() {
            Some(libc::ENXIO) | Some(libc::EREMOTEIO) => BusError::NoAck(address),
            Some(libc::ETIMEDOUT) => BusError::Timeout(address),
            _ => BusError::Io(io.to_string()),
        },
        other => BusError::Io(other.to_string()),
    }
}

/// Factory function to open the board bus.
pub fn open_bus(_config: &BusConfig) -> Result<Box<dyn I2cBus>, BusError> {
    Ok(Box::new(LinuxI2cBus::open(I2C_BUS_INDEX)?))
}
