//! Human-readable formatting for physical addresses in diagnostics.

use core::fmt;

use crate::PhysicalAddress;

/// Wraps an address and formats it as an uppercase hexadecimal value with `0x` prefix
/// and `_` digit separators every 4 digits.
///
/// # Examples
///
/// ```
/// use rmem::HumanAddress;
///
/// assert_eq!(format!("{}", HumanAddress(0x0)), "0x0");
/// assert_eq!(format!("{}", HumanAddress(0x1000)), "0x1000");
/// assert_eq!(format!("{}", HumanAddress(0x9FC0_0000)), "0x9FC0_0000");
/// assert_eq!(format!("{}", HumanAddress(0xDEAD_BEEF_CAFE)), "0xDEAD_BEEF_CAFE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HumanAddress(pub u64);

impl From<PhysicalAddress> for HumanAddress {
    #[inline]
    fn from(value: PhysicalAddress) -> Self {
        Self(value.as_u64())
    }
}

impl fmt::Display for HumanAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        if value == 0 {
            return f.write_str("0x0");
        }

        // 4 bits per hex digit
        let bits = u64::BITS - value.leading_zeros();
        let num_digits = bits.div_ceil(4);

        f.write_str("0x")?;
        for index in 0..num_digits {
            let remaining = num_digits - index;
            if index != 0 && remaining % 4 == 0 {
                f.write_str("_")?;
            }
            let digit = (value >> ((remaining - 1) * 4)) & 0xF;
            write!(f, "{digit:X}")?;
        }

        Ok(())
    }
}
