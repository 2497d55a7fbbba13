use logos::{Lexer, Logos};
use std::{fmt, str::FromStr, time::Duration};

/// The nominal capacity of a link, in bits per second.
///
/// The capacity determines the serialization delay of a packet: how long
/// the outbound interface is busy putting the packet's bits on the wire.
/// Units are decimal (`1Mbps` = 1,000,000 bits/s), matching the usual
/// data-rate convention.
///
/// # Example
///
/// ```
/// use routesim_core::measure::Capacity;
/// use std::time::Duration;
///
/// let capacity: Capacity = "1Mbps".parse().unwrap();
/// // 1024 bytes at 1 Mbps take 8.192 ms to serialize.
/// assert_eq!(
///     capacity.serialization_delay(1024),
///     Duration::from_micros(8_192),
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Capacity(u64);

impl Capacity {
    /// Create a capacity from a raw bits-per-second value.
    #[inline]
    pub const fn from_bps(bits_per_sec: u64) -> Self {
        Self(bits_per_sec)
    }

    /// The raw bits-per-second value.
    #[inline]
    pub const fn bps(self) -> u64 {
        self.0
    }

    /// How long the given number of bytes occupies the interface.
    ///
    /// Computed at nanosecond precision. A zero capacity yields
    /// [`Duration::MAX`]: the packet never finishes serializing, which in
    /// practice means it sits in the queue until the horizon cancels it.
    pub fn serialization_delay(self, bytes: u64) -> Duration {
        if self.0 == 0 {
            return Duration::MAX;
        }
        let nanos = (bytes as u128 * 8 * 1_000_000_000) / self.0 as u128;
        if nanos > u64::MAX as u128 {
            return Duration::MAX;
        }
        Duration::from_nanos(nanos as u64)
    }
}

impl Default for Capacity {
    fn default() -> Self {
        crate::defaults::DEFAULT_CAPACITY
    }
}

const KBPS: u64 = 1_000;
const MBPS: u64 = 1_000_000;
const GBPS: u64 = 1_000_000_000;

impl fmt::Display for Capacity {
    /// Formats with the largest unit that keeps at most three decimals:
    /// `1_000_000` → `"1Mbps"`, `2_500_000` → `"2.5Mbps"`, `42` → `"42bps"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (value, unit) = if self.0 >= GBPS {
            (self.0 as f64 / GBPS as f64, "Gbps")
        } else if self.0 >= MBPS {
            (self.0 as f64 / MBPS as f64, "Mbps")
        } else if self.0 >= KBPS {
            (self.0 as f64 / KBPS as f64, "Kbps")
        } else {
            (self.0 as f64, "bps")
        };
        if value.fract() == 0.0 {
            write!(f, "{}{unit}", value as u64)
        } else {
            write!(f, "{value}{unit}")
        }
    }
}

/// Error returned when parsing a [`Capacity`] from a string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CapacityParseError {
    /// The string does not start with a number.
    #[error("expected a number at the start of the capacity string")]
    MissingNumber,
    /// The string has no recognized unit (`bps`, `Kbps`, `Mbps`, `Gbps`).
    #[error("expected a unit (bps, Kbps, Mbps, Gbps)")]
    MissingUnit,
    /// Trailing tokens after the unit.
    #[error("unexpected trailing input after the capacity")]
    TrailingInput,
    /// The numeric part is not a valid decimal number.
    #[error("invalid number in capacity string")]
    InvalidNumber,
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")] // Ignore this regex pattern between tokens
enum CapacityToken {
    #[regex("bps")]
    Bps,
    #[regex("[kK]bps")]
    Kbps,
    #[regex("[mM]bps")]
    Mbps,
    #[regex("[gG]bps")]
    Gbps,

    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Value,
}

impl FromStr for Capacity {
    type Err = CapacityParseError;

    /// Parses strings like `"1Mbps"`, `"2.5Mbps"`, `"1.5Mbps"`, `"300Kbps"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::<'_, CapacityToken>::new(s);

        let Some(Ok(CapacityToken::Value)) = lex.next() else {
            return Err(CapacityParseError::MissingNumber);
        };
        let number: f64 = lex
            .slice()
            .parse()
            .map_err(|_| CapacityParseError::InvalidNumber)?;
        let Some(Ok(token)) = lex.next() else {
            return Err(CapacityParseError::MissingUnit);
        };
        let unit = match token {
            CapacityToken::Bps => 1,
            CapacityToken::Kbps => KBPS,
            CapacityToken::Mbps => MBPS,
            CapacityToken::Gbps => GBPS,
            CapacityToken::Value => return Err(CapacityParseError::MissingUnit),
        };

        if lex.next().is_some() {
            return Err(CapacityParseError::TrailingInput);
        }

        Ok(Self((number * unit as f64).round() as u64))
    }
}
