// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Utilities to make decoding various map data less terrible.

use crate::Page;

/// Extract a bit from a byte.
///
/// Bits past the end of the byte are never set.
pub const fn extract_bit(word: u8, bit: u8) -> bool {
    bit < 8 && (word & (1 << bit)) != 0
}

/// Read a big-endian `u16` starting at `offset`.
pub const fn read_u16(page: &Page, offset: usize) -> u16 {
    u16::from_be_bytes([page[offset], page[offset + 1]])
}

/// Read a big-endian `i16` starting at `offset`.
pub const fn read_i16(page: &Page, offset: usize) -> i16 {
    i16::from_be_bytes([page[offset], page[offset + 1]])
}

/// Read a big-endian `u32` starting at `offset`.
pub const fn read_u32(page: &Page, offset: usize) -> u32 {
    u32::from_be_bytes([
        page[offset],
        page[offset + 1],
        page[offset + 2],
        page[offset + 3],
    ])
}

/// Convert a space-padded ASCII field into a string.
///
/// Modules in the field are not always careful about their padding, so
/// trailing NULs are dropped along with spaces, and any non-UTF-8 bytes are
/// replaced rather than rejected.
pub fn ascii_to_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches([' ', '\0'])
        .to_string()
}

/// Parse a decimal number from an ASCII field, the way C's `atoi` does.
///
/// Leading whitespace and an optional sign are accepted, parsing stops at the
/// first non-digit, and a field with no digits yields zero.
pub fn ascii_to_int(buf: &[u8]) -> i32 {
    let mut it = buf
        .iter()
        .copied()
        .skip_while(|b| b.is_ascii_whitespace())
        .peekable();
    let negative = match it.peek() {
        Some(b'-') => {
            it.next();
            true
        }
        Some(b'+') => {
            it.next();
            false
        }
        _ => false,
    };
    let magnitude = it
        .take_while(u8::is_ascii_digit)
        .fold(0i32, |acc, digit| {
            acc.saturating_mul(10)
                .saturating_add(i32::from(digit - b'0'))
        });
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// A helper macro to generate an enum from a single-byte code.
///
/// Most of the identifying bytes in the SFF-8472 interface ID memory are
/// enumerated codes defined by SFF-8024. Those are attractive to represent in
/// Rust with an enum, with a catch-all variant holding any value the tables
/// don't name.
///
/// It generates `From<u8>`, `From<$name> for u8` and `Display`
/// implementations.
///
/// # Example
/// ```ignore
/// sfp_decode::bitfield_enum! {
///     name = Foo,
///     description = "A byte representing foo",
///     variants = {
///         0x00, First, "The first value",
///         0x01, Second, "The second value",
///     },
///     other_variants = {
///         Unknown: _,
///     }
/// }
/// ```
#[macro_export]
macro_rules! bitfield_enum {
    (
        name = $name:ident,
        description = $docstring:literal,
        variants = { $( $bits:literal, $variant:ident, $display:literal $(,)? ),+ },
        other_variants = { $( $other_variant:ident : $other_pattern:pat $(,)? ),* }
        $(,)?
    ) => {
        #[doc = $docstring]
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[cfg_attr(
            any(feature = "api-traits", test),
            derive(schemars::JsonSchema, serde::Deserialize, serde::Serialize)
        )]
        #[cfg_attr(
            any(feature = "api-traits", test),
            serde(rename_all = "snake_case"),
        )]
        pub enum $name {
            $(
                #[cfg_attr(
                    any(feature = "api-traits", test),
                    serde(rename = $display)
                )]
                $variant
            ),+,
            $($other_variant(u8)),+
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
                use $name::*;
                #[deny(overlapping_range_endpoints)]
                match self {
                    $( $variant => write!(f, "{}", $display), )+
                    $( $other_variant(x) => write!(f, "{} ({x:02x})", stringify!($other_variant)), )+
                }
            }
        }

        impl ::core::convert::From<u8> for $name {
            fn from(x: u8) -> Self {
                use $name::*;
                #[deny(overlapping_range_endpoints)]
                match x {
                    $( $bits => $variant, )+
                    $( $other_pattern => $other_variant(x), )+
                }
            }
        }

        impl ::core::convert::From<$name> for u8 {
            fn from(x: $name) -> u8 {
                use $name::*;
                #[deny(overlapping_range_endpoints)]
                match x {
                    $( $variant => $bits, )+
                    $( $other_variant(x) => x, )+
                }
            }
        }
    };
}
