//! Request-level error types.

use opto16_common::bus::BusError;
use thiserror::Error;

/// Errors a single input request can end with.
///
/// Resolver errors (`InvalidAddress`, `InvalidChannel`) are raised before any
/// bus transaction; `Bus` only comes out of the transaction itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Stack level missing or not a number
    #[error("Stack level ({0}) value is missing or incorrect")]
    InvalidAddress(String),

    /// Channel missing or not a number
    #[error("Channel number ({0}) value is missing or incorrect")]
    InvalidChannel(String),

    /// Transport failure during the register read
    #[error(transparent)]
    Bus(#[from] BusError),
}
