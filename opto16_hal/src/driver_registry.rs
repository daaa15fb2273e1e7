//! Driver registry for bus backends.
//!
//! Provides a `BusRegistry` struct for registering and retrieving bus
//! factories. Constructed at startup and passed where a bus is opened; no
//! global state.

use crate::drivers::register_builtin_drivers;
use opto16_common::bus::{BusError, BusFactory, I2cBus};
use opto16_common::config::BusConfig;
use opto16_common::consts::I2C_BUS_INDEX;
use std::collections::HashMap;
use tracing::info;

/// Registry of available bus drivers.
pub struct BusRegistry {
    factories: HashMap<&'static str, BusFactory>,
}

impl BusRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding every built-in driver.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        register_builtin_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BusFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<BusFactory> {
        self.factories.get(name).copied()
    }

    /// Open the board bus through the named driver.
    ///
    /// # Errors
    /// `BusError::Open` if no driver with the given name is registered or the
    /// driver fails to open the bus.
    pub fn open_bus(&self, name: &str, config: &BusConfig) -> Result<Box<dyn I2cBus>, BusError> {
        let factory = self.get_factory(name).ok_or_else(|| BusError::Open {
            bus: I2C_BUS_INDEX,
            reason: format!("driver '{name}' not found"),
        })?;
        let bus = factory(config)?;
        info!("Opened bus {} with driver '{}'", I2C_BUS_INDEX, bus.name());
        Ok(bus)
    }

    /// List all registered driver names.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for BusRegistry {
    fn default() -> Self {
        Self::new()
    }
}
