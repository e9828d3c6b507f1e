//! IP restrictions on groups.
//!
//! Each entry is a single address, a CIDR block or an inclusive
//! `start-end` span, IPv4 or IPv6.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use uam_common::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IpRange {
    Net(IpNet),
    Span { start: IpAddr, end: IpAddr },
}

impl IpRange {
    /// IPv4-mapped IPv6 addresses (`::ffff:10.0.0.1`) match as IPv4.
    pub fn contains(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        match self {
            Self::Net(net) => net.contains(&ip),
            Self::Span { start, end } => match (start, end, ip) {
                (IpAddr::V4(start), IpAddr::V4(end), IpAddr::V4(ip)) => {
                    (u32::from(*start)..=u32::from(*end)).contains(&u32::from(ip))
                }
                (IpAddr::V6(start), IpAddr::V6(end), IpAddr::V6(ip)) => {
                    (u128::from(*start)..=u128::from(*end)).contains(&u128::from(ip))
                }
                _ => false,
            },
        }
    }

    /// Parses a comma or newline separated list, skipping blank entries.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, Error> {
        list.split([',', '\n', ';'])
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::parse::<Self>)
            .collect()
    }
}

impl FromStr for IpRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || Error::InvalidIpRange(s.to_string());

        if let Some((start, end)) = s.split_once('-') {
            let start: IpAddr = start.trim().parse().map_err(|_| invalid())?;
            let end: IpAddr = end.trim().parse().map_err(|_| invalid())?;

            let ordered = match (start, end) {
                (IpAddr::V4(a), IpAddr::V4(b)) => a <= b,
                (IpAddr::V6(a), IpAddr::V6(b)) => a <= b,
                _ => false,
            };
            if !ordered {
                return Err(invalid());
            }
            return Ok(Self::Span { start, end });
        }

        if s.contains('/') {
            return s.parse::<IpNet>().map(Self::Net).map_err(|_| invalid());
        }

        s.parse::<IpAddr>()
            .map(|ip| Self::Net(IpNet::from(ip)))
            .map_err(|_| invalid())
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Net(net) if net.prefix_len() == net.max_prefix_len() => write!(f, "{}", net.addr()),
            Self::Net(net) => write!(f, "{net}"),
            Self::Span { start, end } => write!(f, "{start}-{end}"),
        }
    }
}

impl TryFrom<String> for IpRange {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<IpRange> for String {
    fn from(value: IpRange) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_single_address() {
        let range: IpRange = "192.168.1.100".parse().unwrap();
        assert!(range.contains(ip("192.168.1.100")));
        assert!(!range.contains(ip("192.168.1.101")));
        assert_eq!(range.to_string(), "192.168.1.100");
    }

    #[test]
    fn test_cidr_block() {
        let range: IpRange = "10.0.0.0/8".parse().unwrap();
        assert!(range.contains(ip("10.200.3.4")));
        assert!(!range.contains(ip("11.0.0.1")));
        assert!(!range.contains(ip("::1")));
    }

    #[test]
    fn test_span_inclusive() {
        let range: IpRange = "10.0.0.1 - 10.0.0.99".parse().unwrap();
        assert!(range.contains(ip("10.0.0.1")));
        assert!(range.contains(ip("10.0.0.99")));
        assert!(!range.contains(ip("10.0.0.100")));
        assert_eq!(range.to_string(), "10.0.0.1-10.0.0.99");
    }

    #[test]
    fn test_ipv6_span() {
        let range: IpRange = "2001:db8::1-2001:db8::ff".parse().unwrap();
        assert!(range.contains(ip("2001:db8::10")));
        assert!(!range.contains(ip("2001:db8::1:0")));
    }

    #[test]
    fn test_ipv4_mapped_addresses_match_ipv4_ranges() {
        let block: IpRange = "10.0.0.0/8".parse().unwrap();
        let span: IpRange = "192.168.0.1-192.168.0.9".parse().unwrap();
        assert!(block.contains(ip("::ffff:10.0.0.1")));
        assert!(span.contains(ip("::ffff:192.168.0.5")));
        assert!(!span.contains(ip("::ffff:192.168.0.10")));
    }

    #[test]
    fn test_invalid_ranges() {
        assert!("10.0.0.9-10.0.0.1".parse::<IpRange>().is_err());
        assert!("10.0.0.1-::1".parse::<IpRange>().is_err());
        assert!("not-an-ip".parse::<IpRange>().is_err());
        assert!("10.0.0.0/40".parse::<IpRange>().is_err());
    }

    #[test]
    fn test_parse_list() {
        let ranges = IpRange::parse_list("10.0.0.0/8, 192.168.0.1\n\n").unwrap();
        assert_eq!(ranges.len(), 2);
        assert!(IpRange::parse_list("10.0.0.0/8, bogus").is_err());
    }
}
