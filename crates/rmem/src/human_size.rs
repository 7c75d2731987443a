//! Human-readable size formatting for region and request sizes.

use core::fmt;

/// Wraps a size in bytes and formats it as a human-readable value with binary SI prefixes.
///
/// Values are displayed with up to 2 decimal places, omitting trailing zeros.
///
/// # Examples
///
/// ```
/// use rmem::HumanSize;
///
/// assert_eq!(format!("{}", HumanSize(0)), "0B");
/// assert_eq!(format!("{}", HumanSize(1023)), "1023B");
/// assert_eq!(format!("{}", HumanSize(1536)), "1.5KiB");
/// assert_eq!(format!("{}", HumanSize(0x20_0000)), "2MiB");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HumanSize(pub u64);

impl fmt::Display for HumanSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];
        const THRESHOLD: f64 = 1024.0;

        if self.0 < 1024 {
            return write!(f, "{}B", self.0);
        }

        let mut size = self.0 as f64;
        let mut unit_index = 0;
        while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
            size /= THRESHOLD;
            unit_index += 1;
        }

        let unit = UNITS[unit_index];
        if size.fract() == 0.0 {
            write!(f, "{}{unit}", size as u64)
        } else if (size * 10.0).fract() == 0.0 {
            write!(f, "{size:.1}{unit}")
        } else {
            write!(f, "{size:.2}{unit}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_bytes() {
        assert_eq!(format!("{}", HumanSize(0)), "0B");
        assert_eq!(format!("{}", HumanSize(16)), "16B");
        assert_eq!(format!("{}", HumanSize(1023)), "1023B");
    }

    #[test]
    fn formats_kibibytes() {
        assert_eq!(format!("{}", HumanSize(0x1000)), "4KiB");
        assert_eq!(format!("{}", HumanSize(1536)), "1.5KiB");
    }

    #[test]
    fn formats_mebibytes() {
        assert_eq!(format!("{}", HumanSize(0x20_0000)), "2MiB");
        assert_eq!(format!("{}", HumanSize(1_572_864)), "1.5MiB");
    }

    #[test]
    fn formats_large_sizes() {
        assert_eq!(format!("{}", HumanSize(1 << 30)), "1GiB");
        assert_eq!(format!("{}", HumanSize(1 << 40)), "1TiB");
        assert_eq!(format!("{}", HumanSize(1 << 60)), "1EiB");
    }

    #[test]
    fn rounds_to_two_decimals() {
        let formatted = format!("{}", HumanSize(0x20_0001));
        assert_eq!(formatted, "2.00MiB");
    }
}
