//! Board constants.
//!
//! Register layout and addressing of the 16-input opto-isolated board.

/// Canonical service name (used for logging).
pub const SERVICE_NAME: &str = "opto16";

/// I2C bus index the boards are attached to (`/dev/i2c-1`).
pub const I2C_BUS_INDEX: u8 = 1;

/// Address of the board at stack level 7. Stack levels map into
/// `BASE_ADDRESS..=BASE_ADDRESS + 7`.
pub const BASE_ADDRESS: u8 = 0x20;

/// Input port register (16-bit, active-low).
pub const INPUT_REGISTER: u8 = 0x00;

/// Lowest stack level.
pub const STACK_MIN: i64 = 0;

/// Highest stack level.
pub const STACK_MAX: i64 = 7;

/// Number of boards that can share one bus.
pub const STACK_LEVELS: usize = 8;

/// Number of input channels per board.
pub const CHANNEL_COUNT: usize = 16;

/// Channel selector value meaning "all channels".
pub const CHANNEL_ALL: i64 = 0;

/// Highest single channel number (1-based).
pub const CHANNEL_MAX: i64 = 16;

/// Default bus driver on Linux hosts.
pub const DEFAULT_DRIVER: &str = "i2cdev";
