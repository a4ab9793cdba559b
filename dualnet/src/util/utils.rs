//! Utility functions for SSID cleanup and device address discovery.
//!
//! Provides helpers for turning raw platform values into something callers
//! can use: quoted SSIDs into plain names, link properties into an ordered
//! list of addresses where the remote device is likely reachable.

use log::debug;
use std::net::{IpAddr, Ipv4Addr};

use crate::api::models::LinkProperties;
use crate::types::constants::{addresses, ssid};

/// Strips the quotes some platforms wrap SSIDs in.
///
/// Returns `None` for empty names and for the platform's
/// `<unknown ssid>` placeholder (compared case-insensitively).
pub fn sanitize_ssid(raw: &str) -> Option<String> {
    let trimmed = raw.strip_prefix('"').unwrap_or(raw);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ssid::UNKNOWN) {
        return None;
    }
    Some(trimmed.to_string())
}

/// Filters out the unspecified and broadcast IPv4 addresses.
fn usable_ipv4(addr: &IpAddr) -> Option<Ipv4Addr> {
    match addr {
        IpAddr::V4(v4) if !v4.is_unspecified() && !v4.is_broadcast() => Some(*v4),
        _ => None,
    }
}

/// Maps `a.b.c.d` to the conventional gateway `a.b.c.1` of its /24.
fn subnet_gateway(addr: Ipv4Addr) -> Ipv4Addr {
    let [a, b, c, _] = addr.octets();
    Ipv4Addr::new(a, b, c, 1)
}

/// Orders the addresses a remote device on this link is likely reachable at.
///
/// Route gateways come first, then DNS servers, then the `.1` address of
/// every local IPv4 subnet, then the fixed fallbacks. Duplicates keep their
/// first position.
pub fn address_candidates(link: &LinkProperties) -> Vec<Ipv4Addr> {
    let derived = link
        .link_addresses
        .iter()
        .filter_map(usable_ipv4)
        .map(subnet_gateway);

    let ordered = link
        .gateways
        .iter()
        .filter_map(usable_ipv4)
        .chain(link.dns_servers.iter().filter_map(usable_ipv4))
        .chain(derived)
        .chain(addresses::FALLBACKS);

    let mut candidates: Vec<Ipv4Addr> = Vec::new();
    for addr in ordered {
        if !candidates.contains(&addr) {
            candidates.push(addr);
        }
    }

    debug!("Derived {} address candidates", candidates.len());
    candidates
}

/// Macro to convert Result to Option with error logging.
/// Usage: `try_log!(result, "context message")`
#[macro_export]
macro_rules! try_log {
    ($result:expr, $context:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => {
                log::warn!("{}: {:?}", $context, e);
                return None;
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn test_sanitize_ssid_strips_quotes() {
        assert_eq!(sanitize_ssid("\"FUJIFILM-X-T4\""), Some("FUJIFILM-X-T4".into()));
        assert_eq!(sanitize_ssid("plain"), Some("plain".into()));
    }

    #[test]
    fn test_sanitize_ssid_unknown() {
        assert_eq!(sanitize_ssid("<unknown ssid>"), None);
        assert_eq!(sanitize_ssid("\"<UNKNOWN SSID>\""), None);
        assert_eq!(sanitize_ssid("\"\""), None);
        assert_eq!(sanitize_ssid(""), None);
    }

    #[test]
    fn test_candidates_order() {
        let link = LinkProperties {
            gateways: vec![v4(10, 0, 0, 1)],
            dns_servers: vec![v4(10, 0, 0, 53)],
            link_addresses: vec![v4(192, 168, 4, 23)],
        };
        assert_eq!(
            address_candidates(&link),
            vec![
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 53),
                Ipv4Addr::new(192, 168, 4, 1),
                Ipv4Addr::new(192, 168, 0, 1),
                Ipv4Addr::new(192, 168, 1, 1),
            ]
        );
    }

    #[test]
    fn test_candidates_skip_unusable_and_duplicates() {
        let link = LinkProperties {
            gateways: vec![v4(0, 0, 0, 0), v4(192, 168, 0, 1)],
            dns_servers: vec![v4(255, 255, 255, 255), IpAddr::V6(Ipv6Addr::LOCALHOST)],
            link_addresses: vec![v4(192, 168, 0, 77)],
        };
        assert_eq!(
            address_candidates(&link),
            vec![Ipv4Addr::new(192, 168, 0, 1), Ipv4Addr::new(192, 168, 1, 1)]
        );
    }

    #[test]
    fn test_candidates_empty_link_uses_fallbacks() {
        assert_eq!(
            address_candidates(&LinkProperties::default()),
            addresses::FALLBACKS.to_vec()
        );
    }
}
