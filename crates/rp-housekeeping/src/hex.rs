//! Hexadecimal text to register word conversion
//!
//! Mask and pattern values arrive from the web client as hex text such as
//! `"FF07"`. [`parse_hex`] accepts anything, the same way C `strtoul(s, NULL,
//! 16)` does:
//!
//! - leading whitespace is skipped, an optional `+` or `-` sign and an
//!   optional `0x`/`0X` prefix are accepted
//! - digits are consumed up to the first non-hex character, the rest is
//!   ignored
//! - no digits at all gives 0
//! - values wider than 32 bits saturate to `u32::MAX`
//! - a `-` sign negates the result modulo 2^32
//!
//! [`parse_hex_strict`] is the validating variant.

use crate::error::{HkError, HkResult};

/// Outcome of a permissive hex parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexParse {
    /// Parsed value
    pub value: u32,

    /// Number of bytes of input consumed (0 when no digits were found)
    pub consumed: usize,

    /// The digits did not fit in 32 bits
    pub overflow: bool,
}

impl HexParse {
    /// The whole input, ignoring trailing whitespace, was consumed
    pub fn is_complete(&self, input: &str) -> bool {
        self.consumed > 0 && input[self.consumed..].trim().is_empty()
    }
}

/// Parse the longest hex prefix of `input`
pub fn parse_hex_prefix(input: &str) -> HexParse {
    let bytes = input.as_bytes();
    let mut pos = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());

    let negative = match bytes.get(pos) {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    // "0x" only counts as a prefix when a hex digit follows it
    if bytes.get(pos) == Some(&b'0')
        && matches!(bytes.get(pos + 1), Some(b'x') | Some(b'X'))
        && bytes.get(pos + 2).is_some_and(u8::is_ascii_hexdigit)
    {
        pos += 2;
    }

    let digits_start = pos;
    let mut value: u32 = 0;
    let mut overflow = false;
    while let Some(digit) = bytes.get(pos).and_then(|b| (*b as char).to_digit(16)) {
        match value.checked_mul(16).and_then(|v| v.checked_add(digit)) {
            Some(v) => value = v,
            None => overflow = true,
        }
        pos += 1;
    }

    if pos == digits_start {
        return HexParse {
            value: 0,
            consumed: 0,
            overflow: false,
        };
    }

    let value = if overflow {
        u32::MAX
    } else if negative {
        value.wrapping_neg()
    } else {
        value
    };

    HexParse {
        value,
        consumed: pos,
        overflow,
    }
}

/// Parse hex text permissively; invalid input yields 0
pub fn parse_hex(input: &str) -> u32 {
    let parsed = parse_hex_prefix(input);
    if !parsed.is_complete(input) || parsed.overflow {
        tracing::warn!(
            input,
            value = parsed.value,
            "hex value only partially parsed"
        );
    }
    parsed.value
}

/// Parse hex text, rejecting empty input, trailing characters and overflow
pub fn parse_hex_strict(input: &str) -> HkResult<u32> {
    let parsed = parse_hex_prefix(input);
    if !parsed.is_complete(input) || parsed.overflow {
        return Err(HkError::InvalidHex(input.to_string()));
    }
    Ok(parsed.value)
}
