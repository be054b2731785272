//! 64-bit fixed-point packet timestamps.
//!
//! The upper 32 bits hold whole seconds, the lower 32 bits a binary fraction
//! of a second (NTP layout). `now()` counts from the NTP epoch, 1900-01-01,
//! which is what RSN DIGIs emit in binary timestamping mode.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds between 1900-01-01 and 1970-01-01.
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

const FRACTION_SCALE: f64 = 4_294_967_296.0;

/// Fixed-point seconds since epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    seconds: u32,
    fraction: u32,
}

impl Timestamp {
    /// Create a timestamp from whole seconds and a binary fraction.
    pub const fn new(seconds: u32, fraction: u32) -> Self {
        Self { seconds, fraction }
    }

    /// Decode the 64-bit wire representation.
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            seconds: (bits >> 32) as u32,
            fraction: bits as u32,
        }
    }

    /// Encode to the 64-bit wire representation.
    pub const fn to_bits(self) -> u64 {
        ((self.seconds as u64) << 32) | self.fraction as u64
    }

    /// Convert from floating-point seconds, saturating at the representable range.
    pub fn from_secs_f64(value: f64) -> Self {
        if !value.is_finite() || value <= 0.0 {
            return Self::default();
        }
        if value >= u32::MAX as f64 + 1.0 {
            return Self::new(u32::MAX, u32::MAX);
        }

        let seconds = value.trunc();
        let fraction = ((value - seconds) * FRACTION_SCALE).round();
        if fraction >= FRACTION_SCALE {
            // Rounding carried into the next second.
            return Self::new(seconds as u32 + 1, 0);
        }
        Self::new(seconds as u32, fraction as u32)
    }

    /// Floating-point seconds.
    pub fn as_secs_f64(self) -> f64 {
        self.seconds as f64 + self.fraction as f64 / FRACTION_SCALE
    }

    /// Current wall-clock time, counted from the NTP epoch.
    pub fn now() -> Self {
        let since_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let seconds = since_unix.as_secs() + NTP_UNIX_OFFSET;
        let fraction = ((since_unix.subsec_nanos() as u64) << 32) / 1_000_000_000;
        Self::new(seconds as u32, fraction as u32)
    }

    /// Whole seconds.
    pub fn seconds(self) -> u32 {
        self.seconds
    }

    /// Binary fraction of a second.
    pub fn fraction(self) -> u32 {
        self.fraction
    }

    /// Decimal rendering with microsecond precision, e.g. `"1.000000"`.
    pub fn as_number(self) -> String {
        let mut seconds = self.seconds as u64;
        let mut micros = ((self.fraction as u64) * 1_000_000 + (1 << 31)) >> 32;
        if micros == 1_000_000 {
            seconds += 1;
            micros = 0;
        }
        format!("{seconds}.{micros:06}")
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_number())
    }
}

impl From<f64> for Timestamp {
    fn from(value: f64) -> Self {
        Self::from_secs_f64(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_second() {
        let ts = Timestamp::from_secs_f64(1.0);
        assert_eq!(ts.seconds(), 1);
        assert_eq!(ts.fraction(), 0);
        assert_eq!(ts.to_bits(), 1 << 32);
        assert_eq!(ts.as_number(), "1.000000");
    }

    #[test]
    fn half_second_fraction() {
        let ts = Timestamp::from_secs_f64(2.5);
        assert_eq!(ts.seconds(), 2);
        assert_eq!(ts.fraction(), 1 << 31);
        assert_eq!(ts.as_secs_f64(), 2.5);
        assert_eq!(ts.to_string(), "2.500000");
    }

    #[test]
    fn bits_roundtrip() {
        let ts = Timestamp::new(3_615_283_632, 0x1234_5678);
        assert_eq!(Timestamp::from_bits(ts.to_bits()), ts);
    }

    #[test]
    fn saturates_out_of_range_values() {
        assert_eq!(Timestamp::from_secs_f64(-4.0), Timestamp::default());
        assert_eq!(Timestamp::from_secs_f64(f64::NAN), Timestamp::default());
        assert_eq!(
            Timestamp::from_secs_f64(1e12),
            Timestamp::new(u32::MAX, u32::MAX)
        );
    }

    #[test]
    fn microsecond_rounding_carries() {
        let ts = Timestamp::new(7, u32::MAX);
        assert_eq!(ts.as_number(), "8.000000");
    }

    #[test]
    fn now_is_after_ntp_unix_offset() {
        let ts = Timestamp::now();
        assert!(ts.seconds() as u64 > NTP_UNIX_OFFSET);
    }
}
