//! Simulation bus driver.
//!
//! An in-memory bus holding one input word per simulated board, for
//! development and testing without hardware. Every transaction and release
//! is counted through a shared [`BusProbe`], and a fault can be injected for
//! the next transaction.

use crate::resolver::AddressResolver;
use opto16_common::bus::{BusError, I2cBus};
use opto16_common::config::BusConfig;
use opto16_common::consts::{INPUT_REGISTER, STACK_LEVELS};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct ProbeState {
    transactions: AtomicUsize,
    releases: AtomicUsize,
    /// Raw words by stack level; `None` = no board.
    boards: Mutex<[Option<u16>; STACK_LEVELS]>,
    /// Fault returned by the next transaction.
    pending_fault: Mutex<Option<BusError>>,
}

/// Shared view into a [`SimulatedBus`], usable after the bus has been moved
/// into a reader.
#[derive(Debug, Clone, Default)]
pub struct BusProbe {
    state: Arc<ProbeState>,
}

impl BusProbe {
    /// Number of register reads attempted.
    pub fn transactions(&self) -> usize {
        self.state.transactions.load(Ordering::SeqCst)
    }

    /// Number of `close()` calls.
    pub fn releases(&self) -> usize {
        self.state.releases.load(Ordering::SeqCst)
    }

    /// Set (or replace) the raw input word of the board at `stack`.
    pub fn set_raw(&self, stack: u8, raw: u16) {
        let mut boards = self.state.boards.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = boards.get_mut(usize::from(stack)) {
            *slot = Some(raw);
        }
    }

    /// Make the next transaction fail with `fault`.
    pub fn fail_next(&self, fault: BusError) {
        *self
            .state
            .pending_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(fault);
    }

    fn take_fault(&self) -> Option<BusError> {
        self.state
            .pending_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn raw_at(&self, stack: usize) -> Option<u16> {
        let boards = self.state.boards.lock().unwrap_or_else(PoisonError::into_inner);
        boards.get(stack).copied().flatten()
    }
}

/// In-memory I2C bus with up to eight simulated boards.
#[derive(Debug)]
pub struct SimulatedBus {
    probe: BusProbe,
    resolver: AddressResolver,
    closed: bool,
}

impl SimulatedBus {
    /// Create an empty bus (no boards answer).
    pub fn new() -> Self {
        Self {
            probe: BusProbe::default(),
            resolver: AddressResolver::default(),
            closed: false,
        }
    }

    /// Builder: add a board at `stack` with raw input word `raw`.
    pub fn with_board(self, stack: u8, raw: u16) -> Self {
        self.probe.set_raw(stack, raw);
        self
    }

    /// Build a bus from the `[bus.simulation]` configuration.
    pub fn from_config(config: &BusConfig) -> Self {
        config
            .simulation
            .boards
            .iter()
            .fold(Self::new(), |bus, board| bus.with_board(board.stack, board.raw))
    }

    /// Shared probe for inspecting and driving the bus.
    pub fn probe(&self) -> BusProbe {
        self.probe.clone()
    }

    /// Stack level answering at `address`, if the address is a board address.
    fn stack_for(&self, address: u8) -> Option<usize> {
        (0..STACK_LEVELS).find(|&stack| self.resolver.address(stack as i64).value() == address)
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cBus for SimulatedBus {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn read_word(&mut self, address: u8, register: u8) -> Result<u16, BusError> {
        if self.closed {
            return Err(BusError::Closed);
        }
        self.probe.state.transactions.fetch_add(1, Ordering::SeqCst);

        if let Some(fault) = self.probe.take_fault() {
            debug!("Injected fault at 0x{:02x}: {}", address, fault);
            return Err(fault);
        }
        if register != INPUT_REGISTER {
            return Err(BusError::Io(format!(
                "register 0x{register:02x} not simulated"
            )));
        }

        let raw = self
            .stack_for(address)
            .and_then(|stack| self.probe.raw_at(stack))
            .ok_or(BusError::NoAck(address))?;
        trace!("Simulated read 0x{:02x} -> 0x{:04x}", address, raw);
        Ok(raw)
    }

    fn close(&mut self) -> Result<(), BusError> {
        self.probe.state.releases.fetch_add(1, Ordering::SeqCst);
        self.closed = true;
        Ok(())
    }
}

/// Factory function to open a simulated bus.
pub fn open_bus(config: &BusConfig) -> Result<Box<dyn I2cBus>, BusError> {
    debug!(
        "Opening simulated bus with {} board(s)",
        config.simulation.boards.len()
    );
    Ok(Box::new(SimulatedBus::from_config(config)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opto16_common::config::SimulatedBoard;

    #[test]
    fn test_board_answers_at_its_address() {
        let mut bus = SimulatedBus::new().with_board(2, 0x1234);
        // Stack 2 -> 0x20 + (2 ^ 7) = 0x25
        assert_eq!(bus.read_word(0x25, INPUT_REGISTER), Ok(0x1234));
        assert_eq!(bus.read_word(0x24, INPUT_REGISTER), Err(BusError::NoAck(0x24)));
        assert_eq!(bus.read_word(0x50, INPUT_REGISTER), Err(BusError::NoAck(0x50)));
        assert_eq!(bus.probe().transactions(), 3);
    }

    #[test]
    fn test_unsimulated_register() {
        let mut bus = SimulatedBus::new().with_board(0, 0);
        assert!(matches!(bus.read_word(0x27, 0x02), Err(BusError::Io(_))));
    }

    #[test]
    fn test_injected_fault_is_one_shot() {
        let mut bus = SimulatedBus::new().with_board(7, 0xFFFF);
        let probe = bus.probe();
        probe.fail_next(BusError::Timeout(0x20));

        assert_eq!(bus.read_word(0x20, INPUT_REGISTER), Err(BusError::Timeout(0x20)));
        assert_eq!(bus.read_word(0x20, INPUT_REGISTER), Ok(0xFFFF));
        assert_eq!(probe.transactions(), 2);
    }

    #[test]
    fn test_probe_mutates_boards() {
        let mut bus = SimulatedBus::new();
        let probe = bus.probe();
        assert_eq!(bus.read_word(0x26, INPUT_REGISTER), Err(BusError::NoAck(0x26)));
        probe.set_raw(1, 0xAAAA);
        assert_eq!(bus.read_word(0x26, INPUT_REGISTER), Ok(0xAAAA));
        // Out-of-range stacks are ignored.
        probe.set_raw(9, 0);
    }

    #[test]
    fn test_close_counts_and_blocks_reads() {
        let mut bus = SimulatedBus::new().with_board(0, 0);
        let probe = bus.probe();
        bus.close().unwrap();
        assert_eq!(probe.releases(), 1);
        assert_eq!(bus.read_word(0x27, INPUT_REGISTER), Err(BusError::Closed));
        assert_eq!(probe.transactions(), 0);
    }

    #[test]
    fn test_from_config() {
        let mut config = BusConfig::default();
        config.simulation.boards = vec![
            SimulatedBoard { stack: 0, raw: 0x0001 },
            SimulatedBoard { stack: 6, raw: 0x8000 },
        ];
        let mut bus = open_bus(&config).unwrap();
        assert_eq!(bus.name(), "simulation");
        assert_eq!(bus.read_word(0x27, INPUT_REGISTER), Ok(0x0001));
        assert_eq!(bus.read_word(0x21, INPUT_REGISTER), Ok(0x8000));
    }
}
