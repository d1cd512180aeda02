//! `/P` permission bits of the standard security handler's encryption
//! dictionary. Per PDF 1.7 Table 22, bits 1-2 and 7-8 are reserved and
//! must be `1`; `/P` is stored as a signed 32-bit integer.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u32 {
        /// Bit 3: print the document (low quality only if bit 12 is clear).
        const PRINT = 1 << 2;
        /// Bit 4: modify the document's contents.
        const MODIFY_CONTENTS = 1 << 3;
        /// Bit 5: copy text and graphics out of the document.
        const COPY = 1 << 4;
        /// Bit 6: add or modify text annotations and fill form fields.
        const MODIFY_ANNOTATIONS = 1 << 5;
        /// Bit 9: fill in existing interactive form fields, even without bit 6.
        const FILL_FORMS = 1 << 8;
        /// Bit 10: extract text/graphics for accessibility use.
        const EXTRACT_FOR_ACCESSIBILITY = 1 << 9;
        /// Bit 11: assemble the document (insert, delete, rotate pages).
        const ASSEMBLE_DOCUMENT = 1 << 10;
        /// Bit 12: print at full quality (requires bit 3 too).
        const PRINT_HIGH_QUALITY = 1 << 11;
    }
}

/// Reserved bits that must read `1` regardless of the granted
/// permissions, per the `/P` field's encoding rule.
const RESERVED_ONES: u32 = 0b11000000;

impl Permissions {
    /// Pack these permissions into the signed 32-bit `/P` value, setting
    /// the reserved bits and the unused high bits (33-32, conceptually
    /// absent in a 32-bit field) to `1` as required.
    pub fn to_p_value(self) -> i32 {
        (self.bits() | RESERVED_ONES) as i32
    }

    pub fn from_p_value(value: i32) -> Self {
        Permissions::from_bits_truncate(value as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_bits_always_set() {
        let p = Permissions::empty().to_p_value();
        assert_eq!(p & RESERVED_ONES as i32, RESERVED_ONES as i32);
    }

    #[test]
    fn round_trips_through_p_value() {
        let granted = Permissions::PRINT | Permissions::COPY;
        let value = granted.to_p_value();
        let parsed = Permissions::from_p_value(value);
        assert!(parsed.contains(Permissions::PRINT));
        assert!(parsed.contains(Permissions::COPY));
        assert!(!parsed.contains(Permissions::MODIFY_CONTENTS));
    }
}
