use std::collections::BTreeSet;

use common::BITS_IN_BYTE;

use crate::error::{Result, UcodeError};

/// The concrete opcodes described by a pattern such as `0001 10xx`, where each `x` may be
/// either value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpCodes {
    pattern: String,
    codes: Vec<u32>,
}

impl OpCodes {
    /// Expands `pattern`, dropping any bit that is not in `ir_mask`.
    pub fn expand(pattern: &str, ir_mask: u32) -> Result<OpCodes> {
        let digits: String = pattern.chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        if digits.is_empty() || digits.len() > BITS_IN_BYTE as usize {
            return Err(UcodeError::InvalidPattern(pattern.to_owned()));
        }

        let mut codes = vec![0u32];
        for digit in digits.chars() {
            let shifted = codes.iter().map(|c| c << 1);
            codes = match digit {
                '0' => shifted.collect(),
                '1' => shifted.map(|c| c | 1).collect(),
                'x' => shifted.flat_map(|c| [c, c | 1]).collect(),
                _ => return Err(UcodeError::InvalidPattern(pattern.to_owned())),
            };
        }

        let codes: BTreeSet<u32> = codes.into_iter().map(|c| c & ir_mask).collect();

        Ok(OpCodes {
            pattern: pattern.to_owned(),
            codes: codes.into_iter().collect(),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Sorted and free of duplicates.
    pub fn codes(&self) -> &[u32] {
        &self.codes
    }

    pub fn contains(&self, code: u32) -> bool {
        self.codes.binary_search(&code).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    #[test]
    fn expand() {
        let codes = OpCodes::expand("0001 10xX", 0xff).unwrap();
        assert_eq!(&[0x18, 0x19, 0x1a, 0x1b], codes.codes());
        assert_eq!("0001 10xX", codes.pattern());
        assert!(codes.contains(0x1a));
        assert!(!codes.contains(0x1c));

        assert_eq!(&[5], OpCodes::expand("101", 0xff).unwrap().codes());
    }

    #[test]
    fn masked() {
        // IR_1 is not wired, so both values of the x collapse onto one opcode.
        let codes = OpCodes::expand("1x1", 0b101).unwrap();
        assert_eq!(&[0b101], codes.codes());

        let codes = OpCodes::expand("xx", 0b01).unwrap();
        assert_eq!(&[0, 1], codes.codes());
    }

    #[test]
    fn invalid() {
        for pattern in ["", "   ", "012", "1x1x 1x1x 1", "ab", "1-0"] {
            let e = OpCodes::expand(pattern, 0xff).unwrap_err();
            assert_eq!(ErrorKind::Pattern, e.kind(), "{}", pattern);
        }
    }

    proptest! {
        #[test]
        fn expansion_count(pattern in "[01xX]{1,8}") {
            let wild = pattern.chars().filter(|c| *c == 'x' || *c == 'X').count();
            let codes = OpCodes::expand(&pattern, 0xff).unwrap();
            prop_assert_eq!(1usize << wild, codes.codes().len());

            let fixed = u32::from_str_radix(&pattern.replace(['x', 'X'], "0"), 2).unwrap();
            for code in codes.codes() {
                prop_assert_eq!(fixed, code & fixed);
            }
        }

        #[test]
        fn expansion_masked(pattern in "[01x]{1,8}", mask in 0u32..256) {
            let codes = OpCodes::expand(&pattern, mask).unwrap();
            prop_assert!(codes.codes().iter().all(|c| c & mask == *c));
            prop_assert!(codes.codes().windows(2).all(|w| w[0] < w[1]));
        }
    }
}
