//! Board discovery.
//!
//! Probes every stack level with one input register read; a board is present
//! when the read succeeds.

use crate::reader::InputReader;
use crate::resolver::AddressResolver;
use opto16_common::bus::I2cBus;
use opto16_common::consts::{STACK_MAX, STACK_MIN};
use tracing::{debug, info};

/// Stack levels (ascending) that answered a probe read.
pub fn discover_boards<B: I2cBus>(reader: &InputReader<B>) -> Vec<u8> {
    let resolver = AddressResolver::default();
    let found: Vec<u8> = (STACK_MIN..=STACK_MAX)
        .filter(|&stack| {
            let address = resolver.address(stack);
            match reader.read_raw(address) {
                Ok(_) => true,
                Err(e) => {
                    debug!("No board at stack {} ({}): {}", stack, address, e);
                    false
                }
            }
        })
        .map(|stack| stack as u8)
        .collect();

    info!("{} board(s) detected", found.len());
    found
}
