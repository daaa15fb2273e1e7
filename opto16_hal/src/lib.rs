//! # opto16 HAL Library
//!
//! Reader for 16-channel opto-isolated input boards stacked on the I2C bus.
//!
//! # Module Structure
//!
//! - [`resolver`] - (stack, channel) to bus address and bit selector
//! - [`reader`] - Register read and active-low decoding
//! - [`node`] - Request adapter with `ConfigSource` / `ResultSink` seams
//! - [`host`] - Ready-made result sinks
//! - [`discovery`] - Board detection on all stack levels
//! - [`driver_registry`] - Bus driver factory registration
//! - [`drivers`] - Bus driver implementations
//! - [`error`] - Request-level errors
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       opto16_hal                               │
//! │  request ──► OptoInputNode ──► AddressResolver                 │
//! │                    │                                           │
//! │                    ▼                                           │
//! │               InputReader ──► I2cBus (trait object)            │
//! │                    │            ├─ i2cdev     (/dev/i2c-1)     │
//! │                    ▼            └─ simulation (in-memory)      │
//! │               ResultSink                                       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use opto16_common::config::NodeConfig;
//! use opto16_hal::drivers::simulation::SimulatedBus;
//! use opto16_hal::host::CollectingSink;
//! use opto16_hal::node::{Message, OptoInputNode};
//!
//! let bus = SimulatedBus::new().with_board(2, 0x0000);
//! let node = OptoInputNode::open(NodeConfig::default(), bus);
//! let mut sink = CollectingSink::default();
//!
//! node.on_input(Message::new(2, 0), &mut sink);
//! assert_eq!(sink.sent[0].payload, 65535);
//! node.close().unwrap();
//! ```

#![deny(missing_docs)]

pub mod discovery;
pub mod driver_registry;
pub mod drivers;
pub mod error;
pub mod host;
pub mod node;
pub mod reader;
pub mod resolver;

// Re-export key types for convenience
pub use crate::driver_registry::BusRegistry;
pub use crate::error::InputError;
pub use crate::node::{ConfigSource, Message, NodeStatus, OptoInputNode, ResultSink};
pub use crate::reader::{InputReader, ResultValue};
pub use crate::resolver::{AddressResolver, BitSelector, ChannelIndex, PIN_MASKS, PhysicalAddress};
