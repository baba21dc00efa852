//! Session filters parsed from white-list/black-list flags

use super::matcher::{AddressRange, IpMatcher};
use crate::error::ValidationError;
use std::net::Ipv4Addr;

/// Interpretation applied to a matcher's verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Only matching peers are admitted
    AllowList,
    /// Matching peers are rejected
    DenyList,
}

/// IPv4 session filter: a polarity-free matcher tagged with the mode
/// its caller should apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpAccessFilter {
    mode: FilterMode,
    matcher: IpMatcher,
}

impl IpAccessFilter {
    /// Parse a comma-separated list of addresses and `lo-hi` ranges.
    /// Any malformed entry fails the whole specification.
    pub fn parse(spec: &str, mode: FilterMode) -> Result<Self, ValidationError> {
        let mut matcher = IpMatcher::new();

        for entry in spec.split(',') {
            let entry = entry.trim();
            if let Some((lo, hi)) = entry.split_once('-') {
                let lo: Ipv4Addr = parse_addr(lo)?;
                let hi: Ipv4Addr = parse_addr(hi)?;
                let range = AddressRange::new(lo, hi).ok_or_else(|| {
                    ValidationError::RangeOrder {
                        entry: entry.to_string(),
                    }
                })?;
                matcher.add_range(range);
            } else {
                matcher.add_address(parse_addr(entry)?);
            }
        }

        Ok(Self { mode, matcher })
    }

    /// The mode this filter was declared with. The matcher itself never
    /// consults it, inversion happens at the enforcement point.
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Raw membership test, independent of mode
    pub fn matches(&self, addr: Ipv4Addr) -> bool {
        self.matcher.matches(addr)
    }
}

fn parse_addr(text: &str) -> Result<Ipv4Addr, ValidationError> {
    text.trim()
        .parse()
        .map_err(|_| ValidationError::InvalidAddress {
            entry: text.trim().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_mixed_entries() {
        let filter =
            IpAccessFilter::parse("1.1.1.1-1.1.2.255,192.168.22.1", FilterMode::AllowList)
                .unwrap();

        assert!(filter.matches(ip("1.1.1.1")));
        assert!(filter.matches(ip("1.1.2.255")));
        assert!(filter.matches(ip("1.1.1.128")));
        assert!(filter.matches(ip("192.168.22.1")));
        assert!(!filter.matches(ip("192.168.22.2")));
        assert!(!filter.matches(ip("1.1.3.0")));
    }

    #[test]
    fn test_matches_ignores_mode() {
        let allow = IpAccessFilter::parse("10.0.0.1", FilterMode::AllowList).unwrap();
        let deny = IpAccessFilter::parse("10.0.0.1", FilterMode::DenyList).unwrap();

        // Same membership either way, only the tag differs
        assert!(allow.matches(ip("10.0.0.1")));
        assert!(deny.matches(ip("10.0.0.1")));
        assert_eq!(allow.mode(), FilterMode::AllowList);
        assert_eq!(deny.mode(), FilterMode::DenyList);
    }

    #[test]
    fn test_malformed_entry_fails_whole_spec() {
        let result = IpAccessFilter::parse("10.0.0.1,not-an-ip", FilterMode::DenyList);

        assert!(matches!(
            result,
            Err(ValidationError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_reversed_range_rejected() {
        let result = IpAccessFilter::parse("10.0.0.9-10.0.0.1", FilterMode::AllowList);

        assert!(matches!(result, Err(ValidationError::RangeOrder { .. })));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = IpAccessFilter::parse("1.1.1.1-1.1.2.255,192.168.22.1", FilterMode::DenyList)
            .unwrap();
        let b = IpAccessFilter::parse("1.1.1.1-1.1.2.255,192.168.22.1", FilterMode::DenyList)
            .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_whitespace_around_entries() {
        let filter =
            IpAccessFilter::parse(" 10.0.0.1 , 10.0.1.1 - 10.0.1.5 ", FilterMode::AllowList)
                .unwrap();

        assert!(filter.matches(ip("10.0.0.1")));
        assert!(filter.matches(ip("10.0.1.3")));
    }
}
