extern crate strum;
#[macro_use]
extern crate strum_macros;

pub mod global;
pub mod hexfile;
pub mod input;
pub mod output;

pub use global::*;
pub use input::*;
pub use output::*;

use thiserror::Error;

pub const BITS_IN_BYTE: u32 = 8;
pub const MAX_DATA_BIT: u8 = (BITS_IN_BYTE - 1) as u8;

/// Highest address line supported, A0..=A18 covers a 512K part such as the SST39SF040.
pub const MAX_ADDRESS_BIT: u32 = 18;

/// Digits written by [`as_binary`] between separating spaces.
pub const BINARY_SPACING: usize = 4;

#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(EnumCount, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum PinState {
    #[strum(serialize = "1")]
    Active,
    #[strum(serialize = "0")]
    Inactive,
    #[strum(serialize = "x")]
    Either,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Duplicate pin name '{0}'")]
    DuplicateName(String),
    #[error("Address line {line} is used by both '{first}' and '{second}'")]
    DuplicateLine { line: u32, first: String, second: String },
    #[error("Address line {line} for '{name}' is above A{max}")]
    AddressLine { name: String, line: u32, max: u32 },
    #[error("Invalid flag name '{0}'")]
    FlagName(String),
    #[error("Invalid output pin name '{0}'")]
    OutputName(String),
    #[error("Data bit {bit} for '{name}' is not in the range 0..={max}", max = MAX_DATA_BIT)]
    DataBit { name: String, bit: u8 },
    #[error("{rom} bit {bit} is used by both '{first}' and '{second}'")]
    DuplicateDataBit { rom: Rom, bit: u8, first: String, second: String },
    #[error("No {0} pins have been defined")]
    MissingPins(InputKind),
    #[error("{0} pins must be contiguous from M0")]
    NonContiguousCycles(InputKind),
    #[error("MaxAddressBit must be in the range 1..={max}, not {0}", max = MAX_ADDRESS_BIT)]
    MaxAddressBit(u32),
}

/// `value` as `size` binary digits, grouped from the least significant end.
pub fn as_binary(value: u32, size: usize) -> String {
    let mut digits = Vec::with_capacity(size + size / BINARY_SPACING);
    for i in 0..size {
        if i != 0 && i % BINARY_SPACING == 0 {
            digits.push(' ');
        }
        digits.push(if (value >> i) & 1 == 1 { '1' } else { '0' });
    }
    digits.iter().rev().collect()
}

/// Number of characters [`as_binary`] produces for `size` digits.
pub fn binary_width(size: usize) -> usize {
    if size == 0 {
        0
    } else {
        size + (size - 1) / BINARY_SPACING
    }
}
