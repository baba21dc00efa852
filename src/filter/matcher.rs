//! IPv4 address and range matching logic

use std::net::Ipv4Addr;

/// Inclusive range of IPv4 addresses, compared in host byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
    lo: u32,
    hi: u32,
}

impl AddressRange {
    /// Create a range from two addresses, returns None when the bounds
    /// are reversed
    pub fn new(lo: Ipv4Addr, hi: Ipv4Addr) -> Option<Self> {
        let lo = u32::from(lo);
        let hi = u32::from(hi);
        if lo > hi {
            return None;
        }
        Some(Self { lo, hi })
    }

    /// Check whether an address falls within the range, bounds included
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let value = u32::from(addr);
        self.lo <= value && value <= self.hi
    }
}

/// Matcher holding discrete IPv4 addresses and inclusive ranges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpMatcher {
    addresses: Vec<u32>,
    ranges: Vec<AddressRange>,
}

impl IpMatcher {
    /// Create a new empty matcher
    pub fn new() -> Self {
        Self {
            addresses: Vec::new(),
            ranges: Vec::new(),
        }
    }

    /// Add a single IPv4 address
    pub fn add_address(&mut self, addr: Ipv4Addr) {
        self.addresses.push(u32::from(addr));
    }

    /// Add an inclusive address range
    pub fn add_range(&mut self, range: AddressRange) {
        self.ranges.push(range);
    }

    /// Check if an address matches any entry or range
    pub fn matches(&self, addr: Ipv4Addr) -> bool {
        let value = u32::from(addr);
        self.addresses.iter().any(|a| *a == value)
            || self.ranges.iter().any(|r| r.contains(addr))
    }

    /// Check if the matcher has any entries
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty() && self.ranges.is_empty()
    }
}
