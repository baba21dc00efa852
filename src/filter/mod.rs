//! Session-level IPv4 access filtering

pub mod matcher;
pub mod policy;

pub use matcher::{AddressRange, IpMatcher};
pub use policy::{FilterMode, IpAccessFilter};
