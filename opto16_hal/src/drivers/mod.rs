//! Bus driver implementations.
//!
//! - [`simulation`] - In-memory boards for development and testing
//! - `i2cdev` - Linux `/dev/i2c-N` character device (Linux only)
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `I2cBus` trait from `opto16_common::bus`
//! 3. Register its factory in [`register_builtin_drivers`]

#[cfg(target_os = "linux")]
pub mod i2cdev;
pub mod simulation;

use crate::driver_registry::BusRegistry;

/// Register all built-in drivers into `registry`.
pub fn register_builtin_drivers(registry: &mut BusRegistry) {
    registry.register("simulation", simulation::open_bus);

    #[cfg(target_os = "linux")]
    registry.register("i2cdev", i2cdev::open_bus);
}
