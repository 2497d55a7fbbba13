use rand_core::Rng;
use std::{fmt, str::FromStr};

/// Probabilistic loss model for a link.
///
/// Configures what fraction of packets are silently discarded at the
/// receiving end of the link, after serialization and before the
/// propagation delay is applied.
///
/// # Example
///
/// ```
/// use routesim_core::measure::PacketLoss;
///
/// // No loss (default).
/// let none = PacketLoss::NONE;
///
/// // 1% loss (programmatic).
/// let lossy = PacketLoss::rate(0.01).unwrap();
/// assert_eq!(lossy.to_string(), "1%");
///
/// // 1% loss (parsed).
/// let parsed: PacketLoss = "1%".parse().unwrap();
/// assert_eq!(parsed, lossy);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PacketLoss(f64);

impl PacketLoss {
    /// No packet loss; every packet is forwarded.
    pub const NONE: Self = Self(0.0);

    /// Create a loss model with a validated drop probability.
    ///
    /// # Errors
    ///
    /// Returns an error if `rate` is not in `[0.0, 1.0]` (including NaN).
    pub fn rate(rate: f64) -> Result<Self, PacketLossError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(PacketLossError(rate));
        }
        Ok(Self(rate))
    }

    /// The drop probability, in `[0.0, 1.0]`.
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Returns `true` if this packet should be dropped.
    ///
    /// The caller provides `rng` so that all simulation randomness flows
    /// from a single, seedable source owned by the [`Simulation`]; runs
    /// with the same seed draw the same sequence of drops.
    ///
    /// [`Simulation`]: crate::Simulation
    pub fn should_drop<R: Rng>(&self, rng: &mut R) -> bool {
        if self.0 == 0.0 {
            return false;
        }
        let bits = rng.next_u64();
        let sample = (bits as f64) * (1.0 / (u64::MAX as f64 + 1.0));
        sample < self.0
    }
}

impl fmt::Display for PacketLoss {
    /// Formats as a percentage with up to 2 decimal places.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = self.0 * 100.0;
        if pct.fract() == 0.0 {
            write!(f, "{}%", pct as u64)
        } else {
            write!(f, "{pct:.2}%")
        }
    }
}

impl FromStr for PacketLoss {
    type Err = PacketLossParseError;

    /// Parses a percentage string like `"0%"`, `"1%"`, `"12.30%"`, `"100%"`.
    ///
    /// The `%` suffix is required.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(num) = s.strip_suffix('%') else {
            return Err(PacketLossParseError::MissingSuffix);
        };
        let pct: f64 = num
            .trim()
            .parse()
            .map_err(|_| PacketLossParseError::InvalidNumber)?;
        Self::rate(pct / 100.0).map_err(PacketLossParseError::OutOfRange)
    }
}

/// Error returned when constructing a [`PacketLoss`] with a probability
/// outside `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("packet loss rate must be in [0.0, 1.0], got {0}")]
pub struct PacketLossError(f64);

/// Error returned when parsing a [`PacketLoss`] from a string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PacketLossParseError {
    /// The string does not end with `%`.
    #[error("expected '%' suffix")]
    MissingSuffix,
    /// The numeric part could not be parsed as a float.
    #[error("invalid number before '%'")]
    InvalidNumber,
    /// The parsed percentage is outside `[0, 100]`.
    #[error("{0}")]
    OutOfRange(#[from] PacketLossError),
}

#[cfg(test)]
mod tests {
    use rand_chacha::ChaChaRng;
    use rand_core::SeedableRng as _;

    use super::*;

    fn rng() -> ChaChaRng {
        ChaChaRng::seed_from_u64(42)
    }

    #[test]
    fn none_never_drops() {
        let mut rng = rng();
        for _ in 0..1000 {
            assert!(!PacketLoss::NONE.should_drop(&mut rng));
        }
    }

    #[test]
    fn rate_one_always_drops() {
        let mut rng = rng();
        let loss = PacketLoss::rate(1.0).unwrap();
        for _ in 0..1000 {
            assert!(loss.should_drop(&mut rng));
        }
    }

    #[test]
    fn rate_one_percent_approximately() {
        let loss = PacketLoss::rate(0.01).unwrap();
        let mut rng = rng();
        let drops: usize = (0..100_000).filter(|_| loss.should_drop(&mut rng)).count();
        assert!(drops > 700 && drops < 1300, "drop rate was {drops}/100000");
    }

    #[test]
    fn invalid_rates_rejected() {
        assert!(PacketLoss::rate(f64::NAN).is_err());
        assert!(PacketLoss::rate(-0.1).is_err());
        assert!(PacketLoss::rate(1.5).is_err());
    }

    #[test]
    fn reproducible_with_same_seed() {
        let loss = PacketLoss::rate(0.3).unwrap();
        let results_a: Vec<bool> = {
            let mut rng = ChaChaRng::seed_from_u64(99);
            (0..100).map(|_| loss.should_drop(&mut rng)).collect()
        };
        let results_b: Vec<bool> = {
            let mut rng = ChaChaRng::seed_from_u64(99);
            (0..100).map(|_| loss.should_drop(&mut rng)).collect()
        };
        assert_eq!(results_a, results_b);
    }

    #[test]
    fn display_and_parse() {
        assert_eq!(PacketLoss::NONE.to_string(), "0%");
        assert_eq!(PacketLoss::rate(0.01).unwrap().to_string(), "1%");
        assert_eq!(PacketLoss::rate(0.123).unwrap().to_string(), "12.30%");

        assert_eq!("0%".parse::<PacketLoss>().unwrap(), PacketLoss::NONE);
        assert_eq!(
            "1%".parse::<PacketLoss>().unwrap(),
            PacketLoss::rate(0.01).unwrap()
        );
        assert!("5".parse::<PacketLoss>().is_err());
        assert!("abc%".parse::<PacketLoss>().is_err());
        assert!("150%".parse::<PacketLoss>().is_err());
    }
}
