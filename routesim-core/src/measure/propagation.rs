use std::{fmt, str::FromStr, time::Duration};

/// The one-way propagation delay of a link: how long a signal takes to
/// travel between its two endpoints, independent of the packet size.
///
/// # Default [`PropagationDelay`]
///
/// ```
/// # use routesim_core::measure::PropagationDelay;
/// assert_eq!(
///     PropagationDelay::default().to_string(),
///     "2ms"
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropagationDelay(u64);

impl PropagationDelay {
    /// The `0` delay. I.e. instantaneous propagation.
    pub const ZERO: Self = Self::new(Duration::ZERO);

    /// create a new propagation delay with the given [`Duration`].
    ///
    /// # truncation
    ///
    /// The delay is precise up to the microsecond. Constructing a
    /// [`PropagationDelay`] from a [`Duration`] with nanosecond precision
    /// truncates the nanoseconds part.
    #[inline(always)]
    pub const fn new(duration: Duration) -> Self {
        Self(duration.as_micros() as u64)
    }

    /// get the inner duration
    #[inline(always)]
    pub fn into_duration(self) -> Duration {
        Duration::from_micros(self.0)
    }
}

impl From<PropagationDelay> for Duration {
    fn from(value: PropagationDelay) -> Self {
        value.into_duration()
    }
}
impl From<Duration> for PropagationDelay {
    fn from(value: Duration) -> Self {
        Self::new(value)
    }
}

impl Default for PropagationDelay {
    fn default() -> Self {
        crate::defaults::DEFAULT_PROPAGATION_DELAY
    }
}

impl fmt::Display for PropagationDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dur = crate::time::Duration::new(self.into_duration());
        dur.fmt(f)
    }
}

impl FromStr for PropagationDelay {
    type Err = crate::time::DurationParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let duration = crate::time::Duration::from_str(s)?;

        Ok(Self::new(duration.into_duration()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default() {
        assert_eq!(
            PropagationDelay::default(),
            crate::defaults::DEFAULT_PROPAGATION_DELAY,
        );
    }

    #[test]
    fn truncate() {
        assert_eq!(
            PropagationDelay::new(Duration::from_nanos(9_876_543_210)).into_duration(),
            Duration::from_micros(9_876_543),
        )
    }

    #[test]
    fn parse() {
        assert_eq!(
            PropagationDelay::new(Duration::from_millis(2)),
            "2ms".parse().unwrap(),
        );

        assert_eq!(
            PropagationDelay::new(Duration::from_millis(1_542)),
            "1s542ms".parse().unwrap(),
        );
    }

    #[test]
    fn display_round_trip() {
        let original = PropagationDelay::new(Duration::from_millis(150));
        let parsed: PropagationDelay = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn parse_invalid_strings() {
        assert!("150".parse::<PropagationDelay>().is_err());
        assert!("abc".parse::<PropagationDelay>().is_err());
    }
}
