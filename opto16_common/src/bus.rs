//! I2C bus transport trait and error types.
//!
//! This module defines:
//! - `I2cBus` trait - Interface for pluggable bus backends
//! - `BusError` enum - Error types for bus transactions
//! - `BusFactory` type alias - Factory function type

use crate::config::BusConfig;
use thiserror::Error;

/// Error types for bus operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Bus device could not be opened
    #[error("Failed to open I2C bus {bus}: {reason}")]
    Open {
        /// Bus index
        bus: u8,
        /// Underlying cause
        reason: String,
    },

    /// No acknowledgment from the addressed device (board absent)
    #[error("No acknowledgment from device at address 0x{0:02x}")]
    NoAck(u8),

    /// Transaction timed out in the transport
    #[error("Bus timeout talking to device at address 0x{0:02x}")]
    Timeout(u8),

    /// Any other I/O failure
    #[error("Bus I/O error: {0}")]
    Io(String),

    /// Handle already released
    #[error("Bus handle is closed")]
    Closed,
}

/// Factory function type for opening a bus backend.
pub type BusFactory = fn(&BusConfig) -> Result<Box<dyn I2cBus>, BusError>;

/// Trait defining the interface for I2C bus backends.
///
/// # Lifecycle
///
/// 1. Opened by a [`BusFactory`] (or a driver constructor)
/// 2. `read_word()` - Any number of transactions
/// 3. `close()` - Called exactly once by the owner
///
/// A transaction is a two-phase request/response exchange and must not be
/// interleaved with another on the same handle; callers serialize access.
pub trait I2cBus: Send {
    /// Returns the backend's identifier (e.g., "simulation", "i2cdev").
    fn name(&self) -> &'static str;

    /// Read a 16-bit word from `register` of the device at `address`.
    ///
    /// The word is returned as it comes off the wire (SMBus little-endian
    /// byte order already applied).
    ///
    /// # Errors
    /// `BusError::NoAck` if the device does not answer, `BusError::Timeout`
    /// or `BusError::Io` for transport faults.
    fn read_word(&mut self, address: u8, register: u8) -> Result<u16, BusError>;

    /// Release the underlying handle.
    fn close(&mut self) -> Result<(), BusError>;
}

impl<B: I2cBus + ?Sized> I2cBus for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read_word(&mut self, address: u8, register: u8) -> Result<u16, BusError> {
        (**self).read_word(address, register)
    }

    fn close(&mut self) -> Result<(), BusError> {
        (**self).close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedBus {
        word: u16,
        closed: bool,
    }

    impl I2cBus for FixedBus {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn read_word(&mut self, _address: u8, _register: u8) -> Result<u16, BusError> {
            if self.closed {
                return Err(BusError::Closed);
            }
            Ok(self.word)
        }

        fn close(&mut self) -> Result<(), BusError> {
            self.closed = true;
            Ok(())
        }
    }

    #[test]
    fn test_bus_error_display() {
        let err = BusError::NoAck(0x27);
        assert_eq!(
            err.to_string(),
            "No acknowledgment from device at address 0x27"
        );

        let err = BusError::Open {
            bus: 1,
            reason: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("bus 1"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_boxed_bus_delegates() {
        let mut bus: Box<dyn I2cBus> = Box::new(FixedBus {
            word: 0xBEEF,
            closed: false,
        });
        assert_eq!(bus.name(), "fixed");
        assert_eq!(bus.read_word(0x20, 0x00), Ok(0xBEEF));
        bus.close().unwrap();
        assert_eq!(bus.read_word(0x20, 0x00), Err(BusError::Closed));
    }
}
