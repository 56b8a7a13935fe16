//! Strongly-typed sizes and durations.
//!
//! Strings like `"500MB"` and `"P5D"` are parsed once at the CLI edge; the
//! rest of the workspace passes [`ByteSize`] and [`Period`] values around.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const KIB: u64 = 1024;

static SIZE_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*([kmgt]?)(i?b?)\s*$").ok());

static PERIOD_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"^P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$",
    )
    .ok()
});

/// Errors from parsing size and period strings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitParseError {
    #[error("Invalid size '{0}': expected a number with an optional B/KB/MB/GB/TB suffix")]
    InvalidSize(String),

    #[error("Invalid duration '{0}': expected an ISO-8601 period such as P5D or PT6H")]
    InvalidPeriod(String),
}

/// A byte count. Displays as `"<n>B"`.
///
/// A zero size is treated as "no limit" by the collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSize(u64);

impl ByteSize {
    pub const ZERO: ByteSize = ByteSize(0);

    #[must_use]
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn from_mib(mib: u64) -> Self {
        Self(mib.saturating_mul(KIB * KIB))
    }

    #[must_use]
    pub const fn bytes(self) -> u64 {
        self.0
    }

    /// True when the size means "no limit".
    #[must_use]
    pub const fn is_unbounded(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn saturating_sub(self, other: ByteSize) -> ByteSize {
        ByteSize(self.0.saturating_sub(other.0))
    }

    #[must_use]
    pub const fn saturating_add(self, other: ByteSize) -> ByteSize {
        ByteSize(self.0.saturating_add(other.0))
    }

    /// `percent`% of this size, rounded down.
    #[must_use]
    pub fn percent(self, percent: u8) -> ByteSize {
        let scaled = u128::from(self.0) * u128::from(percent) / 100;
        ByteSize(u64::try_from(scaled).unwrap_or(u64::MAX))
    }

    /// Short human rendering for log lines, e.g. `9.5MiB`.
    #[must_use]
    pub fn human(self) -> String {
        const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
        let mut value = self.0 as f64;
        let mut unit = 0;
        while value >= 1024.0 && unit < UNITS.len() - 1 {
            value /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{}B", self.0)
        } else {
            format!("{value:.1}{}", UNITS[unit])
        }
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}

impl From<u64> for ByteSize {
    fn from(bytes: u64) -> Self {
        Self(bytes)
    }
}

impl FromStr for ByteSize {
    type Err = UnitParseError;

    /// Parses `512`, `512B`, `10KB`, `500MB`, `1.5GB`, `2TiB` (binary multiples,
    /// case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || UnitParseError::InvalidSize(s.to_string());
        let re = SIZE_RE.as_ref().ok_or_else(invalid)?;
        let caps = re.captures(s).ok_or_else(invalid)?;

        let number: f64 = caps[1].parse().map_err(|_| invalid())?;
        let suffix = caps[3].to_ascii_lowercase();
        // A bare "i" (as in "10Mi") is not a unit.
        if suffix == "i" {
            return Err(invalid());
        }

        let multiplier = match caps[2].to_ascii_lowercase().as_str() {
            "" => 1,
            "k" => KIB,
            "m" => KIB.pow(2),
            "g" => KIB.pow(3),
            "t" => KIB.pow(4),
            _ => return Err(invalid()),
        };

        let bytes = number * multiplier as f64;
        if !bytes.is_finite() || bytes > u64::MAX as f64 {
            return Err(invalid());
        }
        Ok(ByteSize(bytes as u64))
    }
}

/// An ISO-8601 period (`P5D`, `PT6H`, `P1DT12H`, `P2W`).
///
/// Years count as 365 days and months as 30 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    secs: u64,
}

impl Period {
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self { secs }
    }

    #[must_use]
    pub const fn from_days(days: u64) -> Self {
        Self {
            secs: days.saturating_mul(86_400),
        }
    }

    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.secs
    }

    #[must_use]
    pub const fn as_duration(self) -> Duration {
        Duration::from_secs(self.secs)
    }

    /// The period as a `chrono` delta for timestamp arithmetic.
    #[must_use]
    pub fn as_chrono(self) -> chrono::TimeDelta {
        chrono::TimeDelta::seconds(i64::try_from(self.secs).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.secs / 86_400;
        let hours = (self.secs % 86_400) / 3600;
        let minutes = (self.secs % 3600) / 60;
        let seconds = self.secs % 60;

        write!(f, "P")?;
        if days > 0 {
            write!(f, "{days}D")?;
        }
        if hours > 0 || minutes > 0 || seconds > 0 {
            write!(f, "T")?;
            if hours > 0 {
                write!(f, "{hours}H")?;
            }
            if minutes > 0 {
                write!(f, "{minutes}M")?;
            }
            if seconds > 0 {
                write!(f, "{seconds}S")?;
            }
        }
        if self.secs == 0 {
            write!(f, "0D")?;
        }
        Ok(())
    }
}

impl FromStr for Period {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || UnitParseError::InvalidPeriod(s.to_string());
        let trimmed = s.trim().to_ascii_uppercase();
        let re = PERIOD_RE.as_ref().ok_or_else(invalid)?;
        let caps = re.captures(&trimmed).ok_or_else(invalid)?;

        // Y, M, W, D, then H, M, S after the T designator.
        const FACTORS: [u64; 7] = [365 * 86_400, 30 * 86_400, 7 * 86_400, 86_400, 3600, 60, 1];

        let mut secs: u64 = 0;
        let mut any = false;
        for (idx, factor) in FACTORS.iter().enumerate() {
            if let Some(m) = caps.get(idx + 1) {
                any = true;
                let n: u64 = m.as_str().parse().map_err(|_| invalid())?;
                secs = n
                    .checked_mul(*factor)
                    .and_then(|v| secs.checked_add(v))
                    .ok_or_else(invalid)?;
            }
        }

        // "P" and "PT" alone carry no components.
        if !any {
            return Err(invalid());
        }
        Ok(Period { secs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size_parses_common_forms() {
        assert_eq!("512".parse::<ByteSize>().unwrap().bytes(), 512);
        assert_eq!("512B".parse::<ByteSize>().unwrap().bytes(), 512);
        assert_eq!("10KB".parse::<ByteSize>().unwrap().bytes(), 10 * 1024);
        assert_eq!("500MB".parse::<ByteSize>().unwrap(), ByteSize::from_mib(500));
        assert_eq!("500mb".parse::<ByteSize>().unwrap(), ByteSize::from_mib(500));
        assert_eq!("2 GiB".parse::<ByteSize>().unwrap().bytes(), 2 * 1024 * 1024 * 1024);
        assert_eq!("1.5KB".parse::<ByteSize>().unwrap().bytes(), 1536);
    }

    #[test]
    fn test_byte_size_rejects_garbage() {
        for input in ["", "MB", "ten", "10XB", "-5MB", "10Mi"] {
            assert!(input.parse::<ByteSize>().is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_byte_size_display_is_bytes_suffix() {
        assert_eq!(ByteSize::from_bytes(9_961_472).to_string(), "9961472B");
        assert_eq!(ByteSize::ZERO.to_string(), "0B");
    }

    #[test]
    fn test_byte_size_percent_rounds_down() {
        assert_eq!(ByteSize::from_bytes(100).percent(95).bytes(), 95);
        assert_eq!(ByteSize::from_bytes(10).percent(95).bytes(), 9);
        assert_eq!(ByteSize::from_mib(10).percent(100), ByteSize::from_mib(10));
    }

    #[test]
    fn test_byte_size_human() {
        assert_eq!(ByteSize::from_bytes(12).human(), "12B");
        assert_eq!(ByteSize::from_mib(10).human(), "10.0MiB");
    }

    #[test]
    fn test_zero_is_unbounded() {
        assert!(ByteSize::ZERO.is_unbounded());
        assert!(!ByteSize::from_bytes(1).is_unbounded());
    }

    #[test]
    fn test_period_parses_days_and_times() {
        assert_eq!("P5D".parse::<Period>().unwrap(), Period::from_days(5));
        assert_eq!("PT6H".parse::<Period>().unwrap().as_secs(), 6 * 3600);
        assert_eq!(
            "P1DT12H30M".parse::<Period>().unwrap().as_secs(),
            86_400 + 12 * 3600 + 30 * 60
        );
        assert_eq!("P2W".parse::<Period>().unwrap(), Period::from_days(14));
        assert_eq!("p1d".parse::<Period>().unwrap(), Period::from_days(1));
    }

    #[test]
    fn test_period_rejects_empty_designators() {
        for input in ["", "P", "PT", "5D", "P5", "P-1D", "P1.5D"] {
            assert!(input.parse::<Period>().is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn test_period_display_canonical() {
        assert_eq!(Period::from_days(5).to_string(), "P5D");
        assert_eq!(Period::from_secs(86_400 + 3600).to_string(), "P1DT1H");
        assert_eq!(Period::from_secs(0).to_string(), "P0D");
    }

    #[test]
    fn test_period_as_chrono() {
        assert_eq!(Period::from_days(1).as_chrono(), chrono::TimeDelta::days(1));
    }
}
