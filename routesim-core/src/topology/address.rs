use std::{fmt, net::Ipv4Addr, str::FromStr};

/// An IPv4 interface address with its prefix length, e.g. `10.1.0.1/24`.
///
/// Every address is bound to exactly one interface of one node; the
/// address-to-node mapping is the join key between raw packet
/// observations and node identity.
///
/// # Example
///
/// ```
/// use routesim_core::topology::Address;
///
/// let addr: Address = "10.1.0.1/24".parse().unwrap();
/// assert_eq!(addr.prefix(), 24);
/// assert_eq!(addr.to_string(), "10.1.0.1/24");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address {
    ip: Ipv4Addr,
    prefix: u8,
}

impl Address {
    /// Create an address from its IP and prefix length.
    ///
    /// # Panics
    ///
    /// Panics if `prefix > 32`.
    pub fn new(ip: Ipv4Addr, prefix: u8) -> Self {
        assert!(prefix <= 32, "IPv4 prefix length must be at most 32");
        Self { ip, prefix }
    }

    /// The interface IP.
    #[inline]
    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    /// The prefix length.
    #[inline]
    pub fn prefix(&self) -> u8 {
        self.prefix
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix)
    }
}

/// Error returned when parsing an [`Address`] from a string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AddressParseError {
    /// The string has no `/` separating IP and prefix length.
    #[error("expected `<ip>/<prefix>', missing `/' in `{0}'")]
    MissingPrefix(String),
    /// The IP part is not a valid dotted quad.
    #[error("invalid IPv4 address in `{0}'")]
    InvalidIp(String),
    /// The prefix part is not a number in `0..=32`.
    #[error("invalid prefix length in `{0}', expected 0..=32")]
    InvalidPrefixLength(String),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((ip, prefix)) = s.split_once('/') else {
            return Err(AddressParseError::MissingPrefix(s.to_owned()));
        };
        let ip: Ipv4Addr = ip
            .trim()
            .parse()
            .map_err(|_| AddressParseError::InvalidIp(s.to_owned()))?;
        let prefix: u8 = prefix
            .trim()
            .parse()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| AddressParseError::InvalidPrefixLength(s.to_owned()))?;
        Ok(Self { ip, prefix })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        let addr: Address = "10.1.0.1/24".parse().unwrap();
        assert_eq!(addr.ip(), Ipv4Addr::new(10, 1, 0, 1));
        assert_eq!(addr.prefix(), 24);
    }

    #[test]
    fn parse_invalid() {
        assert!("10.1.0.1".parse::<Address>().is_err()); // no prefix
        assert!("10.1.0/24".parse::<Address>().is_err()); // short quad
        assert!("10.1.0.1/33".parse::<Address>().is_err()); // prefix too long
        assert!("10.1.0.1/x".parse::<Address>().is_err());
    }

    #[test]
    fn display_round_trip() {
        let addr = Address::new(Ipv4Addr::new(10, 1, 3, 1), 24);
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(addr, parsed);
    }
}
