//! Engine-facing interface used by the bootstrap layer

use crate::chain::ProxyChain;
use crate::error::Result;
use crate::filter::{FilterMode, IpAccessFilter};
use crate::proxy::auth::UserStore;
use async_trait::async_trait;
use std::net::IpAddr;

/// An authentication method the engine may advertise during the SOCKS5
/// handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocksMethod {
    /// RFC 1928 NO AUTHENTICATION REQUIRED
    NoAuth,
    /// RFC 1929 username/password, verified against the given store
    UserPassword(UserStore),
}

/// Configuration surface of a SOCKS5 engine.
///
/// The bootstrap layer programs an engine through this interface and
/// never touches wire-level details, which also keeps it testable
/// against a mock.
#[async_trait]
pub trait SocksEngine {
    /// Replace the advertised authentication method list
    fn set_supported_methods(&mut self, methods: Vec<SocksMethod>);

    /// Register a session filter, filters accumulate and are combined
    /// conjunctively
    fn add_session_filter(&mut self, filter: IpAccessFilter);

    /// Route all outbound connections through the given upstream chain
    fn set_proxy(&mut self, chain: ProxyChain);

    /// Bind the listening port and serve until shut down
    async fn start(&mut self, port: u16) -> Result<()>;
}

/// Evaluate the registered session filters against a peer address.
///
/// Each filter's raw matcher verdict is interpreted through its mode
/// here, at the enforcement point. Multiple filters must all admit the
/// peer. IPv6 peers never match an IPv4 entry, so an allow-list
/// rejects them and a deny-list lets them through.
pub fn session_permitted(filters: &[IpAccessFilter], peer: IpAddr) -> bool {
    filters.iter().all(|filter| {
        let hit = match peer {
            IpAddr::V4(v4) => filter.matches(v4),
            IpAddr::V6(_) => false,
        };
        match filter.mode() {
            FilterMode::AllowList => hit,
            FilterMode::DenyList => !hit,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    fn peer(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn filter(spec: &str, mode: FilterMode) -> IpAccessFilter {
        IpAccessFilter::parse(spec, mode).unwrap()
    }

    #[test]
    fn test_allow_list_polarity() {
        let filters = vec![filter("10.0.0.1-10.0.0.9", FilterMode::AllowList)];

        assert!(session_permitted(&filters, peer("10.0.0.5")));
        assert!(!session_permitted(&filters, peer("10.0.0.10")));
    }

    #[test]
    fn test_deny_list_polarity() {
        let filters = vec![filter("10.0.0.1-10.0.0.9", FilterMode::DenyList)];

        assert!(!session_permitted(&filters, peer("10.0.0.5")));
        assert!(session_permitted(&filters, peer("10.0.0.10")));
    }

    #[test]
    fn test_no_filters_admits_everyone() {
        assert!(session_permitted(&[], peer("203.0.113.7")));
    }

    #[test]
    fn test_multiple_filters_combine_conjunctively() {
        let filters = vec![
            filter("10.0.0.0-10.0.0.255", FilterMode::AllowList),
            filter("10.0.0.13", FilterMode::DenyList),
        ];

        assert!(session_permitted(&filters, peer("10.0.0.12")));
        assert!(!session_permitted(&filters, peer("10.0.0.13")));
        assert!(!session_permitted(&filters, peer("192.168.1.1")));
    }

    #[test]
    fn test_ipv6_peer_never_matches() {
        let allow = vec![filter("10.0.0.1", FilterMode::AllowList)];
        let deny = vec![filter("10.0.0.1", FilterMode::DenyList)];
        let v6 = IpAddr::V6(Ipv6Addr::LOCALHOST);

        assert!(!session_permitted(&allow, v6));
        assert!(session_permitted(&deny, v6));
    }
}
