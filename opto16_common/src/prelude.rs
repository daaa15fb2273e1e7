//! Prelude module for common re-exports.
//!
//! # Usage
//!
//! ```rust
//! use opto16_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    AppConfig, BusConfig, ConfigError, ConfigLoader, NodeConfig, SharedConfig, SimulatedBoard,
    SimulationConfig,
};

// ─── Board Constants ────────────────────────────────────────────────
pub use crate::consts::{
    BASE_ADDRESS, CHANNEL_ALL, CHANNEL_COUNT, CHANNEL_MAX, I2C_BUS_INDEX, INPUT_REGISTER,
    STACK_LEVELS, STACK_MAX, STACK_MIN,
};

// ─── Bus Transport ──────────────────────────────────────────────────
pub use crate::bus::{BusError, BusFactory, I2cBus};
