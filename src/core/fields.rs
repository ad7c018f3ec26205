//! Field micro-parsers
//!
//! Small pure functions that pull one piece of information out of a short
//! text fragment. They never fail: an unmatched fragment yields the empty
//! value and callers substitute the documented sentinel.

use crate::core::rule::{IFACE_SEPARATOR, Protocol, is_wildcard};
use ipnetwork::IpNetwork;
use regex::Regex;
use std::sync::LazyLock;

/// `tcp`/`udp` as a whole `/`- or `_`-delimited segment
static PROTOCOL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|/)(tcp|udp)(?:$|[/_\s])").expect("Invalid protocol regex")
});

/// Returns the first protocol found in any of the fragments, in order.
///
/// `None` means the rule is not restricted to one protocol.
///
/// ```
/// use rufw::core::fields::extract_protocol;
/// use rufw::core::rule::Protocol;
///
/// assert_eq!(extract_protocol(&["192.168.1.34", "8.8.8.8/udp"]), Some(Protocol::Udp));
/// assert_eq!(extract_protocol(&["192.168.1.34", "Anywhere"]), None);
/// ```
pub fn extract_protocol(fragments: &[&str]) -> Option<Protocol> {
    fragments.iter().find_map(|fragment| {
        PROTOCOL_REGEX
            .captures(fragment)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    })
}

/// Returns `true` for characters that can appear in a port spec
fn is_port_char(c: char) -> bool {
    c.is_ascii_digit() || c == ':' || c == ','
}

/// Returns the leading port spec of a fragment, ignoring any `/proto` suffix.
///
/// An empty result means "no port"; display code turns it into `-`.
pub fn extract_port(fragment: &str) -> String {
    let fragment = fragment.trim();
    if !fragment.starts_with(|c: char| c.is_ascii_digit()) {
        return String::new();
    }
    fragment.chars().take_while(|&c| is_port_char(c)).collect()
}

/// Returns `true` when the whole token is a port spec, optionally with a
/// protocol suffix (`22`, `443/tcp`, `8000:9000/udp`, `80,443/tcp`).
pub fn is_port_token(token: &str) -> bool {
    let (spec, proto) = match token.split_once('/') {
        Some((spec, proto)) => (spec, Some(proto)),
        None => (token, None),
    };
    let proto_ok = proto.is_none_or(|p| p.parse::<Protocol>().is_ok());
    proto_ok && !spec.is_empty() && spec.split(',').all(is_port_item)
}

/// `22` or `8000:9000`; rejects digit-only IPv6 forms such as `2001::1`
fn is_port_item(item: &str) -> bool {
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    match item.split_once(':') {
        Some((low, high)) => digits(low) && digits(high),
        None => digits(item),
    }
}

/// Splits `addr[/proto][_on_iface]` into its parts.
///
/// The interface suffix is peeled first, then the protocol suffix, leaving
/// the bare address. Spaces are treated like the `_` of the separator so the
/// unescaped `addr on iface` form decodes the same way, as does the
/// presentation form `addr (iface)`.
///
/// ```
/// use rufw::core::fields::split_address_and_interface;
/// use rufw::core::rule::Protocol;
///
/// let (addr, proto, iface) = split_address_and_interface("192.168.50.10/24/tcp_on_eth1");
/// assert_eq!(addr, "192.168.50.10/24");
/// assert_eq!(proto, Some(Protocol::Tcp));
/// assert_eq!(iface.as_deref(), Some("eth1"));
/// ```
pub fn split_address_and_interface(fragment: &str) -> (String, Option<Protocol>, Option<String>) {
    let fragment = fragment.trim();

    let (rest, iface) = match parenthesized_interface(fragment) {
        Some((rest, iface)) => (rest.to_string(), Some(iface.to_string())),
        None => {
            let joined = fragment.split_whitespace().collect::<Vec<_>>().join("_");
            match joined.split_once(IFACE_SEPARATOR) {
                Some((addr, iface)) if !iface.is_empty() => {
                    (addr.to_string(), Some(iface.to_string()))
                }
                Some((addr, _)) => (addr.to_string(), None),
                None => (joined, None),
            }
        }
    };

    for proto in [Protocol::Tcp, Protocol::Udp] {
        let suffix = format!("/{proto}");
        if let Some(addr) = rest.strip_suffix(&suffix) {
            return (addr.to_string(), Some(proto), iface);
        }
    }

    (rest, None, iface)
}

/// Splits `addr (iface)` into `("addr", "iface")`
fn parenthesized_interface(fragment: &str) -> Option<(&str, &str)> {
    let inner = fragment.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let iface = inner[open + 1..].trim();
    if iface.is_empty() || iface.contains(char::is_whitespace) {
        return None;
    }
    Some((inner[..open].trim_end(), iface))
}

/// Returns the interface name embedded in a fragment.
///
/// Recognizes `_on_iface`, `addr on iface` and `addr (iface)`; a fragment
/// with none of those is taken to be a bare interface name.
pub fn embedded_interface(fragment: &str) -> Option<String> {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return None;
    }
    match split_address_and_interface(fragment) {
        (_, _, Some(iface)) => Some(iface),
        _ if is_wildcard(fragment)
            || fragment.contains(['/', ' '])
            || fragment.parse::<IpNetwork>().is_ok() =>
        {
            None
        }
        _ => Some(fragment.to_string()),
    }
}

/// Position of the fragment's interface within `known`, or 0 when absent.
///
/// Position 0 doubles as the "any interface" choice of an edit form, so an
/// unknown interface lands there rather than failing.
///
/// ```
/// use rufw::core::fields::interface_index;
///
/// let known = ["eth0", "eth1", "eth2"];
/// assert_eq!(interface_index("Anywhere_on_eth1", &known), 1);
/// assert_eq!(interface_index("Anywhere (eth2)", &known), 2);
/// assert_eq!(interface_index("Anywhere", &known), 0);
/// ```
pub fn interface_index<S: AsRef<str>>(fragment: &str, known: &[S]) -> usize {
    embedded_interface(fragment)
        .and_then(|iface| known.iter().position(|k| k.as_ref() == iface))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_protocol_first_match_wins() {
        assert_eq!(
            extract_protocol(&["192.168.1.34/tcp", "Anywhere"]),
            Some(Protocol::Tcp)
        );
        assert_eq!(
            extract_protocol(&["10.0.0.1/udp", "10.0.0.2/tcp"]),
            Some(Protocol::Udp)
        );
    }

    #[test]
    fn test_extract_protocol_with_interface_suffix() {
        assert_eq!(
            extract_protocol(&["172.16.0.5/tcp_on_eth2"]),
            Some(Protocol::Tcp)
        );
    }

    #[test]
    fn test_extract_protocol_ignores_embedded_words() {
        assert_eq!(extract_protocol(&["tcpserver.lan", "udpates"]), None);
        assert_eq!(extract_protocol(&[]), None);
    }

    #[test]
    fn test_extract_port() {
        assert_eq!(extract_port("22"), "22");
        assert_eq!(extract_port("443/tcp"), "443");
        assert_eq!(extract_port("8000:9000/udp"), "8000:9000");
        assert_eq!(extract_port("-"), "");
        assert_eq!(extract_port(""), "");
        assert_eq!(extract_port("Anywhere"), "");
    }

    #[test]
    fn test_is_port_token() {
        assert!(is_port_token("22"));
        assert!(is_port_token("22/tcp"));
        assert!(is_port_token("80,443/tcp"));
        assert!(is_port_token("8000:9000/udp"));
        assert!(!is_port_token("22/icmp"));
        assert!(!is_port_token("10.0.0.1"));
        assert!(!is_port_token("::1"));
        assert!(!is_port_token("Anywhere"));
        assert!(!is_port_token("-"));
        assert!(!is_port_token("80:"));
        assert!(!is_port_token("2001::1"));
        assert!(!is_port_token("1:2:3"));
    }

    #[test]
    fn test_split_address_variants() {
        let cases = [
            ("192.168.50.10_on_eth1", "192.168.50.10", None, Some("eth1")),
            ("::1", "::1", None, None),
            ("192.168.50.10/tcp", "192.168.50.10", Some(Protocol::Tcp), None),
            (
                "192.168.50.10/24/tcp_on_eth1",
                "192.168.50.10/24",
                Some(Protocol::Tcp),
                Some("eth1"),
            ),
            ("192.168.50.10/24_on_eth1", "192.168.50.10/24", None, Some("eth1")),
            ("::1/udp", "::1", Some(Protocol::Udp), None),
            ("::1/udp_on_lo", "::1", Some(Protocol::Udp), Some("lo")),
            ("Anywhere_on_eth0", "Anywhere", None, Some("eth0")),
            ("Anywhere on eth0", "Anywhere", None, Some("eth0")),
            ("Anywhere (eth0)", "Anywhere", None, Some("eth0")),
            ("10.0.0.0/8/udp (wg0)", "10.0.0.0/8", Some(Protocol::Udp), Some("wg0")),
        ];

        for (input, address, proto, iface) in cases {
            let (a, p, i) = split_address_and_interface(input);
            assert_eq!(a, address, "address for {input}");
            assert_eq!(p, proto, "protocol for {input}");
            assert_eq!(i.as_deref(), iface, "interface for {input}");
        }
    }

    #[test]
    fn test_split_keeps_cidr_slash() {
        let (a, p, i) = split_address_and_interface("10.0.0.0/24");
        assert_eq!(a, "10.0.0.0/24");
        assert!(p.is_none());
        assert!(i.is_none());
    }

    #[test]
    fn test_interface_index_conventions_agree() {
        let known = ["", "eth0", "eth1", "wlan0"];
        assert_eq!(interface_index("Anywhere_on_eth1", &known), 2);
        assert_eq!(interface_index("Anywhere (eth1)", &known), 2);
        assert_eq!(interface_index("wlan0", &known), 3);
    }

    #[test]
    fn test_embedded_interface_bare_names() {
        assert_eq!(embedded_interface("eth0.100").as_deref(), Some("eth0.100"));
        assert_eq!(embedded_interface("10.0.0.1"), None);
        assert_eq!(embedded_interface("fe80::1"), None);
        assert_eq!(embedded_interface("Anywhere"), None);
    }

    #[test]
    fn test_interface_index_lenient_default() {
        let known = ["eth0", "eth1"];
        assert_eq!(interface_index("Anywhere_on_tun9", &known), 0);
        assert_eq!(interface_index("", &known), 0);
        assert_eq!(interface_index("10.0.0.1", &known), 0);
        let empty: [&str; 0] = [];
        assert_eq!(interface_index("Anywhere_on_eth0", &empty), 0);
    }
}
