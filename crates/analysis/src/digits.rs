//! Leading-digit extraction for Benford tests.
//!
//! Both extractors work on the stringified cell, not on a numeric parse: the
//! first significant digit is the first `1`-`9` anywhere in the text, so
//! `"INV-4410"` yields 4 and `"0.07"` yields 7.

use crate::model::Value;

/// First digit character 1-9 occurring anywhere in the stringified value.
pub fn leading_digit(value: &Value) -> Option<u8> {
    leading_digit_str(&value.display())
}

pub fn leading_digit_str(text: &str) -> Option<u8> {
    text.bytes()
        .find(|b| (b'1'..=b'9').contains(b))
        .map(|b| b - b'0')
}

/// First two significant digits (10-99) after dropping non-digits and leading zeros.
pub fn leading_two_digits(value: &Value) -> Option<u8> {
    leading_two_digits_str(&value.display())
}

pub fn leading_two_digits_str(text: &str) -> Option<u8> {
    let mut digits = text
        .bytes()
        .filter(u8::is_ascii_digit)
        .skip_while(|b| *b == b'0');
    let first = digits.next()?;
    let second = digits.next()?;
    Some((first - b'0') * 10 + (second - b'0'))
}
