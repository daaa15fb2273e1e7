//! Input node: the request-level adapter around resolver and reader.
//!
//! A host (flow engine, CLI, test harness) talks to the node through two
//! narrow seams:
//!
//! - [`ConfigSource`] - optional `stack` / `channel` values, supplied by the
//!   instance configuration and by each request
//! - [`ResultSink`] - where a request ends up: forwarded, reported as an
//!   error, or flagged on the node status
//!
//! Every request ends in exactly one of: `send`, `error`, or a fault status.

use crate::driver_registry::BusRegistry;
use crate::error::InputError;
use crate::reader::{InputReader, ResultValue};
pub use crate::resolver::ConfigSource;
use crate::resolver::AddressResolver;
use opto16_common::bus::{BusError, I2cBus};
use opto16_common::config::{BusConfig, NodeConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, error, info, warn};

/// A request travelling through the node.
///
/// `stack` and `channel` are optional overrides; every other field is kept
/// in `extra` and passes through untouched. On success the result lands in
/// `payload`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Stack level override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<Value>,

    /// Channel override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<Value>,

    /// Result field.
    #[serde(default)]
    pub payload: Value,

    /// Any other fields (topic, ids, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// Message carrying explicit stack and channel values.
    pub fn new(stack: impl Into<Value>, channel: impl Into<Value>) -> Self {
        Self {
            stack: Some(stack.into()),
            channel: Some(channel.into()),
            ..Self::default()
        }
    }
}

impl ConfigSource for Message {
    fn stack(&self) -> Option<&Value> {
        self.stack.as_ref()
    }

    fn channel(&self) -> Option<&Value> {
        self.channel.as_ref()
    }
}

impl ConfigSource for NodeConfig {
    fn stack(&self) -> Option<&Value> {
        self.stack.as_ref()
    }

    fn channel(&self) -> Option<&Value> {
        self.channel.as_ref()
    }
}

/// Visible node status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "text", rename_all = "lowercase")]
pub enum NodeStatus {
    /// Nothing to show.
    Clear,
    /// Red ring with a message.
    Fault(String),
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clear => write!(f, "ok"),
            Self::Fault(text) => write!(f, "{text}"),
        }
    }
}

/// Where requests end up.
pub trait ResultSink {
    /// Forward a message carrying its result.
    fn send(&mut self, msg: Message);

    /// Report a failed read, bound to the originating message.
    fn error(&mut self, err: &InputError, msg: &Message);

    /// Update the node status.
    fn status(&mut self, status: NodeStatus);
}

/// 16-input board node.
pub struct OptoInputNode<B: I2cBus> {
    config: NodeConfig,
    resolver: AddressResolver,
    reader: InputReader<B>,
}

impl<B: I2cBus> OptoInputNode<B> {
    /// Create a node over an already opened bus.
    pub fn open(config: NodeConfig, bus: B) -> Self {
        info!(
            "Input node ready (stack={:?}, channel={:?}, bus='{}')",
            config.stack,
            config.channel,
            bus.name()
        );
        Self {
            config,
            resolver: AddressResolver::default(),
            reader: InputReader::open(bus),
        }
    }

    /// Instance configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Underlying reader.
    pub fn reader(&self) -> &InputReader<B> {
        &self.reader
    }

    /// Resolve and read one request without touching a sink.
    ///
    /// Resolver errors are returned before any bus transaction.
    pub fn process(&self, msg: &Message) -> Result<ResultValue, InputError> {
        let resolved = self.resolver.resolve_request(&self.config, msg)?;
        debug!(
            "Request resolved: stack {} -> {}, {:?}",
            resolved.stack, resolved.address, resolved.selector
        );
        Ok(self.reader.read(resolved.address, resolved.selector)?)
    }

    /// Handle one incoming request.
    pub fn on_input(&self, mut msg: Message, sink: &mut impl ResultSink) {
        let resolved = match self.resolver.resolve_request(&self.config, &msg) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("Request dropped: {}", e);
                sink.status(NodeStatus::Fault(e.to_string()));
                return;
            }
        };
        sink.status(NodeStatus::Clear);

        match self.reader.read(resolved.address, resolved.selector) {
            Ok(value) => {
                msg.payload = value.into();
                sink.send(msg);
            }
            Err(e) => {
                error!("Read of stack {} failed: {}", resolved.stack, e);
                sink.error(&InputError::Bus(e), &msg);
            }
        }
    }

    /// Release the bus.
    pub fn close(self) -> Result<(), BusError> {
        info!("Input node closing");
        self.reader.close()
    }
}

impl OptoInputNode<Box<dyn I2cBus>> {
    /// Open the board bus through `driver` and create a node on it.
    ///
    /// # Errors
    /// `BusError::Open` if the driver is unknown or the bus cannot be opened.
    pub fn open_with(
        config: NodeConfig,
        registry: &BusRegistry,
        driver: &str,
        bus_config: &BusConfig,
    ) -> Result<Self, BusError> {
        let bus = registry.open_bus(driver, bus_config)?;
        Ok(Self::open(config, bus))
    }
}
