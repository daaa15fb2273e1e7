//! opto16 Common Library
//!
//! This crate provides shared constants, configuration loading utilities and
//! the I2C transport abstraction for all opto16 workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Board register layout and addressing constants
//! - [`config`] - Configuration loading traits and types
//! - [`bus`] - `I2cBus` transport trait and `BusError`
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use opto16_common::prelude::*;
//!
//! assert_eq!(BASE_ADDRESS, 0x20);
//! ```

pub mod bus;
pub mod config;
pub mod consts;
pub mod prelude;
