//! Address resolution.
//!
//! Maps a logical `(stack, channel)` pair onto the board's physical I2C
//! address and a bit selector into the input word. Out-of-range values are
//! clamped, never rejected; only values that are not numbers at all fail.

use crate::error::InputError;
use opto16_common::consts::{
    BASE_ADDRESS, CHANNEL_ALL, CHANNEL_COUNT, CHANNEL_MAX, STACK_MAX, STACK_MIN,
};
use serde_json::Value;
use std::fmt;

/// Input pin masks, indexed by 0-based channel.
///
/// This is the board's pin wiring: the two register bytes are swapped with
/// respect to channel numbering. Keep it literal.
pub const PIN_MASKS: [u16; CHANNEL_COUNT] = [
    0x8000, 0x4000, 0x2000, 0x1000, 0x0800, 0x0400, 0x0200, 0x0100, //
    0x0080, 0x0040, 0x0020, 0x0010, 0x0008, 0x0004, 0x0002, 0x0001,
];

/// Source of raw `stack` / `channel` values.
///
/// Implemented by the per-instance configuration and by each request.
pub trait ConfigSource {
    /// Raw stack value, if supplied.
    fn stack(&self) -> Option<&Value>;

    /// Raw channel value, if supplied.
    fn channel(&self) -> Option<&Value>;
}

/// Physical I2C address of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysicalAddress(u8);

impl PhysicalAddress {
    /// Raw 7-bit address.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// 0-based channel index, always below [`CHANNEL_COUNT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelIndex(u8);

impl ChannelIndex {
    /// Index for `index`, or `None` past the last channel.
    pub fn new(index: u8) -> Option<Self> {
        (usize::from(index) < CHANNEL_COUNT).then_some(Self(index))
    }

    /// Pin mask of this channel.
    pub fn mask(self) -> u16 {
        PIN_MASKS[usize::from(self.0)]
    }
}

/// Which part of the input word a request wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitSelector {
    /// All 16 channels as a bitfield.
    All,
    /// One channel.
    Channel(ChannelIndex),
}

/// Outcome of resolving one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// Clamped stack level.
    pub stack: u8,
    /// Board address.
    pub address: PhysicalAddress,
    /// Bit selector.
    pub selector: BitSelector,
}

/// Converts logical board positions into bus addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressResolver {
    base_address: u8,
}

impl Default for AddressResolver {
    fn default() -> Self {
        Self {
            base_address: BASE_ADDRESS,
        }
    }
}

impl AddressResolver {
    /// Physical address of a stack level (clamped to 0..=7).
    pub fn address(&self, stack: i64) -> PhysicalAddress {
        let stack = stack.clamp(STACK_MIN, STACK_MAX) as u8;
        PhysicalAddress(self.base_address + (stack ^ 0x07))
    }

    /// Resolve numeric stack and channel values, clamping both.
    pub fn resolve(&self, stack: i64, channel: i64) -> Resolved {
        let clamped_stack = stack.clamp(STACK_MIN, STACK_MAX) as u8;
        let channel = channel.clamp(CHANNEL_ALL, CHANNEL_MAX);
        // Channel 0 (all) has no index.
        let selector = u8::try_from(channel - 1)
            .ok()
            .and_then(ChannelIndex::new)
            .map_or(BitSelector::All, BitSelector::Channel);

        Resolved {
            stack: clamped_stack,
            address: self.address(stack),
            selector,
        }
    }

    /// Resolve a request against the instance configuration.
    ///
    /// The instance value is used when it parses as an integer; otherwise the
    /// request's value is tried.
    ///
    /// # Errors
    /// `InputError::InvalidAddress` if no stack value parses,
    /// `InputError::InvalidChannel` if no channel value parses. Stack is
    /// checked first.
    pub fn resolve_request(
        &self,
        instance: &impl ConfigSource,
        request: &impl ConfigSource,
    ) -> Result<Resolved, InputError> {
        let stack = pick(instance.stack(), request.stack())
            .map_err(InputError::InvalidAddress)?;
        let channel = pick(instance.channel(), request.channel())
            .map_err(InputError::InvalidChannel)?;

        Ok(self.resolve(stack, channel))
    }
}

/// Instance value if numeric, else request value; on failure the text of
/// the value that was tried last.
fn pick(instance: Option<&Value>, request: Option<&Value>) -> Result<i64, String> {
    if let Some(n) = instance.and_then(parse_int) {
        return Ok(n);
    }
    request
        .and_then(parse_int)
        .ok_or_else(|| describe(request.or(instance)))
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "missing".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Lenient integer parse of a form/message field.
///
/// Numbers are truncated toward zero. Strings accept leading whitespace, a
/// sign, an optional `0x` prefix and a leading run of digits; trailing text
/// is ignored. Everything else is not a number.
pub fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => parse_int_str(s),
        _ => None,
    }
}

fn parse_int_str(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let (radix, digits) = match rest.get(..2) {
        Some("0x") | Some("0X") => (16, &rest[2..]),
        _ => (10, rest),
    };

    let mut value: i64 = 0;
    let mut any = false;
    for c in digits.chars() {
        let Some(d) = c.to_digit(radix) else {
            break;
        };
        value = value.saturating_mul(i64::from(radix)).saturating_add(i64::from(d));
        any = true;
    }

    any.then(|| if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fields {
        stack: Option<Value>,
        channel: Option<Value>,
    }

    impl ConfigSource for Fields {
        fn stack(&self) -> Option<&Value> {
            self.stack.as_ref()
        }

        fn channel(&self) -> Option<&Value> {
            self.channel.as_ref()
        }
    }

    fn fields(stack: Option<Value>, channel: Option<Value>) -> Fields {
        Fields { stack, channel }
    }

    fn ch(index: u8) -> BitSelector {
        BitSelector::Channel(ChannelIndex::new(index).unwrap())
    }

    #[test]
    fn test_pin_masks_literal_order() {
        assert_eq!(PIN_MASKS[0], 0x8000);
        assert_eq!(PIN_MASKS[7], 0x0100);
        assert_eq!(PIN_MASKS[8], 0x0080);
        assert_eq!(PIN_MASKS[15], 0x0001);
        assert_eq!(PIN_MASKS.iter().fold(0u16, |acc, m| acc | m), 0xFFFF);
    }

    #[test]
    fn test_address_formula() {
        let resolver = AddressResolver::default();
        for stack in 0..=7i64 {
            let address = resolver.address(stack).value();
            assert_eq!(address, BASE_ADDRESS + (stack as u8 ^ 0x07));
            assert!((BASE_ADDRESS..=BASE_ADDRESS + 7).contains(&address));
        }
        assert_eq!(resolver.address(0).value(), 0x27);
        assert_eq!(resolver.address(7).value(), 0x20);
    }

    #[test]
    fn test_clamping() {
        let r = AddressResolver::default();
        assert_eq!(r.resolve(-5, 3), r.resolve(0, 3));
        assert_eq!(r.resolve(99, 3), r.resolve(7, 3));
        assert_eq!(r.resolve(3, -2), r.resolve(3, 0));
        assert_eq!(r.resolve(3, 50), r.resolve(3, 16));
    }

    #[test]
    fn test_selector() {
        let r = AddressResolver::default();
        assert_eq!(r.resolve(0, 0).selector, BitSelector::All);
        assert_eq!(r.resolve(0, 1).selector, ch(0));
        assert_eq!(r.resolve(0, 16).selector, ch(15));
        // Above 16 stays a single channel.
        assert_eq!(r.resolve(0, 17).selector, ch(15));
    }

    #[test]
    fn test_channel_index_bounds() {
        assert_eq!(ChannelIndex::new(0).map(ChannelIndex::mask), Some(0x8000));
        assert_eq!(ChannelIndex::new(15).map(ChannelIndex::mask), Some(0x0001));
        assert_eq!(ChannelIndex::new(16), None);
        assert_eq!(ChannelIndex::new(u8::MAX), None);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(&json!(3)), Some(3));
        assert_eq!(parse_int(&json!(-4)), Some(-4));
        assert_eq!(parse_int(&json!(3.9)), Some(3));
        assert_eq!(parse_int(&json!(-3.9)), Some(-3));
        assert_eq!(parse_int(&json!("7")), Some(7));
        assert_eq!(parse_int(&json!("  12abc")), Some(12));
        assert_eq!(parse_int(&json!("-2")), Some(-2));
        assert_eq!(parse_int(&json!("0x10")), Some(16));
        assert_eq!(parse_int(&json!("99999999999999999999999")), Some(i64::MAX));

        assert_eq!(parse_int(&json!("abc")), None);
        assert_eq!(parse_int(&json!("")), None);
        assert_eq!(parse_int(&json!("-")), None);
        assert_eq!(parse_int(&json!("0x")), None);
        assert_eq!(parse_int(&json!(null)), None);
        assert_eq!(parse_int(&json!(true)), None);
        assert_eq!(parse_int(&json!([1])), None);
        assert_eq!(parse_int(&json!({"a": 1})), None);
    }

    #[test]
    fn test_instance_value_wins() {
        let r = AddressResolver::default();
        let instance = fields(Some(json!(2)), Some(json!(5)));
        let request = fields(Some(json!(6)), Some(json!(1)));

        let resolved = r.resolve_request(&instance, &request).unwrap();
        assert_eq!(resolved.stack, 2);
        assert_eq!(resolved.selector, ch(4));
    }

    #[test]
    fn test_request_used_when_instance_absent_or_unparseable() {
        let r = AddressResolver::default();
        let instance = fields(None, Some(json!("")));
        let request = fields(Some(json!("6")), Some(json!(0)));

        let resolved = r.resolve_request(&instance, &request).unwrap();
        assert_eq!(resolved.stack, 6);
        assert_eq!(resolved.address.value(), 0x21);
        assert_eq!(resolved.selector, BitSelector::All);
    }

    #[test]
    fn test_invalid_stack_reported_first() {
        let r = AddressResolver::default();
        let instance = fields(None, None);
        let request = fields(Some(json!("top")), Some(json!("nope")));

        assert_eq!(
            r.resolve_request(&instance, &request),
            Err(InputError::InvalidAddress("top".to_string()))
        );
    }

    #[test]
    fn test_invalid_channel() {
        let r = AddressResolver::default();
        let instance = fields(Some(json!(1)), None);
        let request = fields(None, None);

        assert_eq!(
            r.resolve_request(&instance, &request),
            Err(InputError::InvalidChannel("missing".to_string()))
        );
    }
}
