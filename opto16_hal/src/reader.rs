//! Input register reader.
//!
//! `InputReader` owns the bus handle, performs the 16-bit register read at a
//! resolved address and decodes the active-low word through [`PIN_MASKS`].
//!
//! # Lifecycle
//!
//! ```text
//!   open(bus) ──► Open ──close(self)──► Closed
//!                  │ ▲
//!                  └─┘ read() / read_raw()
//! ```
//!
//! `close` consumes the reader, so a closed reader cannot be read from or
//! reopened; a new one has to be opened.

use crate::resolver::{BitSelector, ChannelIndex, PIN_MASKS, PhysicalAddress};
use opto16_common::bus::{BusError, I2cBus};
use opto16_common::consts::INPUT_REGISTER;
use serde_json::Value;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Decoded result of one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultValue {
    /// State of a single channel.
    Channel(bool),
    /// All channels, bit *i* = channel *i + 1*.
    All(u16),
}

impl ResultValue {
    /// Numeric form handed to the caller: 0/1 or the bitfield.
    pub fn value(self) -> u16 {
        match self {
            Self::Channel(on) => u16::from(on),
            Self::All(bits) => bits,
        }
    }
}

impl From<ResultValue> for Value {
    fn from(result: ResultValue) -> Self {
        Value::from(result.value())
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Logical state of the channel at `index` in a raw register word.
pub fn decode_channel(raw: u16, index: ChannelIndex) -> bool {
    !raw & index.mask() != 0
}

/// Logical states of all channels, re-numbered LSB-first.
pub fn decode_all(raw: u16) -> u16 {
    let active = !raw;
    PIN_MASKS
        .iter()
        .enumerate()
        .filter(|(_, mask)| active & **mask != 0)
        .fold(0u16, |acc, (idx, _)| acc | (1 << idx))
}

/// Apply a selector to a raw register word.
pub fn decode(raw: u16, selector: BitSelector) -> ResultValue {
    match selector {
        BitSelector::All => ResultValue::All(decode_all(raw)),
        BitSelector::Channel(index) => ResultValue::Channel(decode_channel(raw, index)),
    }
}

/// Reader bound to one open bus handle.
pub struct InputReader<B: I2cBus> {
    bus: Mutex<B>,
    name: &'static str,
}

impl<B: I2cBus> InputReader<B> {
    /// Take ownership of an open bus handle.
    pub fn open(bus: B) -> Self {
        let name = bus.name();
        info!("Input reader opened on '{}' bus", name);
        Self {
            bus: Mutex::new(bus),
            name,
        }
    }

    /// Name of the underlying bus backend.
    pub fn bus_name(&self) -> &'static str {
        self.name
    }

    /// Read the raw input word of the board at `address`.
    ///
    /// Transactions on the same reader are serialized.
    pub fn read_raw(&self, address: PhysicalAddress) -> Result<u16, BusError> {
        // A panic mid-transaction leaves nothing half-updated in the handle.
        let mut bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
        let raw = bus.read_word(address.value(), INPUT_REGISTER)?;
        debug!(
            "Read {} reg 0x{:02x} -> 0x{:04x}",
            address, INPUT_REGISTER, raw
        );
        Ok(raw)
    }

    /// Read and decode the inputs selected by `selector`.
    pub fn read(
        &self,
        address: PhysicalAddress,
        selector: BitSelector,
    ) -> Result<ResultValue, BusError> {
        let raw = self.read_raw(address).inspect_err(|e| {
            warn!("Input read at {} failed: {}", address, e);
        })?;
        Ok(decode(raw, selector))
    }

    /// Release the bus handle.
    pub fn close(self) -> Result<(), BusError> {
        let mut bus = self.bus.into_inner().unwrap_or_else(PoisonError::into_inner);
        bus.close()?;
        info!("Input reader closed ('{}' bus released)", self.name);
        Ok(())
    }
}
