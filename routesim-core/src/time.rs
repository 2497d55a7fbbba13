use core::fmt;
use logos::{Lexer, Logos};
use std::{ops::Add, str::FromStr, time};

/// A point on the simulated timeline.
///
/// Simulated time starts at [`Timestamp::ZERO`] when the run begins and only
/// moves forward as the scheduler executes events. It is completely
/// independent of the host clock, which is what makes two runs with the same
/// seed bit-for-bit comparable.
///
/// # Example
///
/// ```
/// use routesim_core::Timestamp;
/// use std::time::Duration;
///
/// let t = Timestamp::ZERO + Duration::from_secs(2);
/// assert_eq!(t.as_secs_f64(), 2.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(time::Duration);

impl Timestamp {
    /// The start of the simulated timeline.
    pub const ZERO: Self = Self(time::Duration::ZERO);

    /// Create a timestamp at the given offset from the start of the run.
    #[inline]
    pub const fn new(since_start: time::Duration) -> Self {
        Self(since_start)
    }

    /// The offset from the start of the run.
    #[inline]
    pub const fn into_duration(self) -> time::Duration {
        self.0
    }

    /// The timestamp in (fractional) seconds since the start of the run.
    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Checked advance, `None` on overflow.
    #[inline]
    pub fn checked_add(self, duration: time::Duration) -> Option<Self> {
        self.0.checked_add(duration).map(Self)
    }

    /// Elapsed simulated time since `earlier`.
    ///
    /// Saturates to [`Duration::ZERO`] if `earlier` is later than `self`.
    ///
    /// [`Duration::ZERO`]: time::Duration::ZERO
    #[inline]
    pub fn duration_since(self, earlier: Self) -> time::Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<time::Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: time::Duration) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <time::Duration as fmt::Debug>::fmt(&self.0, f)
    }
}

/// A parseable wrapper around [`std::time::Duration`].
///
/// Accepts one or more `<number><unit>` components which are summed:
/// `"2ms"`, `"1s 500ms"`, `"1m 30s"`. Units: `ns`, `us`/`μs`, `ms`, `s`, `m`.
/// This is the string form used throughout topology construction
/// (propagation delays, emission intervals).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub(crate) struct Duration(time::Duration);

impl Duration {
    pub(crate) fn new(dur: time::Duration) -> Self {
        Self(dur)
    }

    #[inline]
    pub fn into_duration(self) -> time::Duration {
        self.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <time::Duration as fmt::Debug>::fmt(&self.0, f)
    }
}

/// Error returned when parsing a duration string fails.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DurationParseError {
    /// The input contains a token that is neither a number nor a unit.
    #[error("unexpected token in duration string `{0}'")]
    UnexpectedToken(String),
    /// A unit appeared without a leading number.
    #[error("expected a number before the unit in `{0}'")]
    MissingNumber(String),
    /// A number appeared without a following unit.
    #[error("expected a unit (ns, us, ms, s, m) after the number in `{0}'")]
    MissingUnit(String),
    /// The numeric part does not fit a `u64`.
    #[error("invalid number in duration string `{0}'")]
    InvalidNumber(String),
}

impl FromStr for Duration {
    type Err = DurationParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::new(s);

        let mut durations = Vec::new();

        while let Some(next) = lex.next() {
            let number: Token =
                next.map_err(|()| DurationParseError::UnexpectedToken(s.to_owned()))?;

            if number != Token::Value {
                return Err(DurationParseError::MissingNumber(s.to_owned()));
            }
            let number: u64 = lex
                .slice()
                .parse()
                .map_err(|_| DurationParseError::InvalidNumber(s.to_owned()))?;

            let Some(Ok(measure)) = lex.next() else {
                return Err(DurationParseError::MissingUnit(s.to_owned()));
            };
            let duration = match measure {
                Token::NanoSeconds => time::Duration::from_nanos(number),
                Token::MicroSeconds => time::Duration::from_micros(number),
                Token::MilliSeconds => time::Duration::from_millis(number),
                Token::Seconds => time::Duration::from_secs(number),
                Token::Minutes => time::Duration::from_secs(number * 60),
                Token::Value => return Err(DurationParseError::MissingUnit(s.to_owned())),
            };
            durations.push(duration);
        }

        Ok(Self(durations.into_iter().sum()))
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")] // Ignore this regex pattern between tokens
enum Token {
    #[token("ns")]
    NanoSeconds,
    #[regex("us|μs")]
    MicroSeconds,
    #[token("ms")]
    MilliSeconds,
    #[token("s")]
    Seconds,
    #[token("m")]
    Minutes,

    #[regex("[0-9]+")]
    Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        let Duration(duration) = "2ms".parse().unwrap();
        assert_eq!(duration.as_millis(), 2);

        let Duration(duration) = "1s 2000ms 3000000us".parse().unwrap();
        assert_eq!(duration.as_secs(), 6);
    }

    #[test]
    fn parse_invalid() {
        assert!("ms".parse::<Duration>().is_err());
        assert!("12".parse::<Duration>().is_err());
        assert!("12 parsecs".parse::<Duration>().is_err());
    }

    #[test]
    fn timestamp_ordering() {
        let early = Timestamp::ZERO + time::Duration::from_millis(1);
        let late = Timestamp::ZERO + time::Duration::from_millis(2);
        assert!(early < late);
        assert_eq!(late.duration_since(early), time::Duration::from_millis(1));
        assert_eq!(early.duration_since(late), time::Duration::ZERO);
    }

    #[test]
    fn timestamp_checked_add() {
        let t = Timestamp::new(time::Duration::MAX);
        assert!(t.checked_add(time::Duration::from_nanos(1)).is_none());
        assert_eq!(
            Timestamp::ZERO.checked_add(time::Duration::from_secs(1)),
            Some(Timestamp::new(time::Duration::from_secs(1))),
        );
    }

    #[test]
    fn timestamp_display() {
        let t = Timestamp::ZERO + time::Duration::from_millis(1_500);
        assert_eq!(t.to_string(), "1.5s");
    }
}
