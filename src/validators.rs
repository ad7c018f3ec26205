//! Input validation for rule forms
//!
//! Every field an operator can type into an add/edit form is checked here
//! before a command is synthesized. Validation is advisory: ufw's own dry run
//! remains the final authority.

use ipnetwork::IpNetwork;

/// Longest comment accepted in a rule
pub const MAX_COMMENT_LEN: usize = 255;

/// ufw's multiport limit (a range counts as two ports)
const MAX_PORT_ITEMS: usize = 15;

/// Validates a single port number.
///
/// # Errors
///
/// Returns `Err` if port is 0 (reserved).
pub fn validate_port(port: u16) -> Result<u16, String> {
    if port == 0 {
        Err("Port must be between 1 and 65535".to_string())
    } else {
        Ok(port)
    }
}

/// Validates a port range.
///
/// # Errors
///
/// Returns `Err` if:
/// - Either port is 0
/// - Start port is greater than end port
pub fn validate_port_range(start: u16, end: u16) -> Result<(u16, u16), String> {
    validate_port(start)?;
    validate_port(end)?;

    if start > end {
        Err("Start port must be less than or equal to end port".to_string())
    } else {
        Ok((start, end))
    }
}

fn parse_port(text: &str) -> Result<u16, String> {
    let port: u16 = text
        .parse()
        .map_err(|_| format!("'{text}' is not a port number between 1 and 65535"))?;
    validate_port(port)
}

/// Validates a ufw port spec: `22`, `8000:9000` or a comma list of those.
///
/// An empty spec means "any port" and is accepted.
///
/// # Examples
///
/// ```
/// use rufw::validators::validate_port_spec;
///
/// assert!(validate_port_spec("22").is_ok());
/// assert!(validate_port_spec("80,443,8000:9000").is_ok());
/// assert!(validate_port_spec("9000:8000").is_err());
/// assert!(validate_port_spec("80-443").is_err());
/// ```
///
/// # Errors
///
/// Returns `Err` for non-numeric items, port 0, inverted ranges, or more
/// than 15 ports in one list.
pub fn validate_port_spec(spec: &str) -> Result<String, String> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Ok(String::new());
    }

    let mut weight = 0;
    for item in spec.split(',') {
        match item.split_once(':') {
            Some((start, end)) => {
                validate_port_range(parse_port(start)?, parse_port(end)?)?;
                weight += 2;
            }
            None => {
                parse_port(item)?;
                weight += 1;
            }
        }
    }

    if weight > MAX_PORT_ITEMS {
        return Err(format!(
            "Too many ports in one rule (max {MAX_PORT_ITEMS}, ranges count as two)"
        ));
    }

    Ok(spec.to_string())
}

/// Returns `true` for specs that ufw only accepts together with a protocol
pub fn port_spec_needs_protocol(spec: &str) -> bool {
    spec.contains([':', ','])
}

/// Validates a network interface name.
///
/// Linux kernel interface name rules:
/// - Max 15 characters (IFNAMSIZ - 1)
/// - Alphanumeric, dot, dash, underscore only
/// - Cannot be "." or ".."
///
/// # Errors
///
/// Returns `Err` if interface name violates kernel constraints.
pub fn validate_interface(name: &str) -> Result<String, String> {
    if name.is_empty() {
        return Ok(String::new());
    }

    if name.len() > 15 {
        return Err("Interface name too long (max 15 characters)".to_string());
    }

    if name == "." || name == ".." {
        return Err("Invalid interface name".to_string());
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err("Interface name contains invalid characters".to_string());
    }

    Ok(name.to_string())
}

/// Validates a rule address: empty, `any`/`Anywhere`, an IP or a CIDR network.
///
/// # Errors
///
/// Returns `Err` if the text is none of those.
pub fn validate_address(address: &str) -> Result<String, String> {
    let address = address.trim();
    if address.is_empty() || crate::core::rule::is_wildcard(address) {
        return Ok(String::new());
    }

    address
        .parse::<IpNetwork>()
        .map(|_| address.to_string())
        .map_err(|_| format!("'{address}' is not an IP address or network"))
}

/// Validates a rule comment.
///
/// Quotes are allowed; the synthesizer escapes them.
///
/// # Errors
///
/// Returns `Err` if the comment contains control characters (including
/// newlines) or exceeds 255 characters.
pub fn validate_comment(comment: &str) -> Result<String, String> {
    if comment.chars().count() > MAX_COMMENT_LEN {
        return Err(format!("Comment too long (max {MAX_COMMENT_LEN} characters)"));
    }

    if comment.chars().any(char::is_control) {
        return Err("Comment cannot contain newlines or control characters".to_string());
    }

    Ok(comment.trim().to_string())
}

/// Checks if a port is well-known and returns informational message.
///
/// This is informational only and does not block saving.
pub fn check_well_known_port(port: u16) -> Option<String> {
    if port <= 1024 {
        let name = match port {
            22 => "SSH",
            53 => "DNS",
            80 => "HTTP",
            443 => "HTTPS",
            _ => return Some(format!("Privileged port {port}")),
        };
        Some(format!("Port {port}: {name}"))
    } else {
        None
    }
}

/// Checks if an address is in a reserved range and returns informational warning.
///
/// This is informational only and does not block saving.
pub fn check_reserved_ip(ip: IpNetwork) -> Option<String> {
    use std::net::IpAddr;

    match ip.ip() {
        IpAddr::V4(ipv4) => {
            if ipv4.is_private() {
                return Some("Private IP range (RFC 1918) - usually safe for LAN".to_string());
            }
            if ipv4.is_loopback() {
                return Some("Loopback range (127.x) - ufw already allows loopback".to_string());
            }
            if ipv4.is_link_local() {
                return Some("Link-local range (169.254.x.x) - APIPA addresses".to_string());
            }
            None
        }
        IpAddr::V6(ipv6) => {
            if ipv6.is_loopback() {
                return Some("IPv6 loopback (::1) - ufw already allows loopback".to_string());
            }
            if ipv6.segments()[0] & 0xffc0 == 0xfe80 {
                return Some("IPv6 link-local (fe80::/10) - local network only".to_string());
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_port_zero() {
        assert!(validate_port(0).is_err());
    }

    #[test]
    fn test_port_spec_single_and_list() {
        assert_eq!(validate_port_spec(" 22 ").unwrap(), "22");
        assert_eq!(validate_port_spec("80,443").unwrap(), "80,443");
        assert_eq!(validate_port_spec("").unwrap(), "");
    }

    #[test]
    fn test_port_spec_rejects_bad_items() {
        assert!(validate_port_spec("0").is_err());
        assert!(validate_port_spec("65536").is_err());
        assert!(validate_port_spec("ssh").is_err());
        assert!(validate_port_spec("80,").is_err());
        assert!(validate_port_spec("22/tcp").is_err());
    }

    #[test]
    fn test_port_spec_list_limit() {
        let fifteen = (1..=15).map(|p| p.to_string()).collect::<Vec<_>>().join(",");
        assert!(validate_port_spec(&fifteen).is_ok());
        let with_ranges = "1:2,3:4,5:6,7:8,9:10,11:12,13:14,15:16";
        assert!(validate_port_spec(with_ranges).is_err());
    }

    #[test]
    fn test_port_spec_needs_protocol() {
        assert!(port_spec_needs_protocol("8000:9000"));
        assert!(port_spec_needs_protocol("80,443"));
        assert!(!port_spec_needs_protocol("22"));
    }

    #[test]
    fn test_validate_interface_valid() {
        assert!(validate_interface("eth0").is_ok());
        assert!(validate_interface("wlan0").is_ok());
        assert!(validate_interface("eth0.100").is_ok());
        assert!(validate_interface("").is_ok());
    }

    #[test]
    fn test_validate_interface_invalid() {
        assert!(validate_interface("this_is_way_too_long").is_err());
        assert!(validate_interface("..").is_err());
        assert!(validate_interface("eth0 out").is_err());
        assert!(validate_interface("eth0;reboot").is_err());
    }

    #[test]
    fn test_validate_address() {
        assert_eq!(validate_address("any").unwrap(), "");
        assert_eq!(validate_address("Anywhere").unwrap(), "");
        assert_eq!(validate_address("10.0.0.0/8").unwrap(), "10.0.0.0/8");
        assert_eq!(validate_address(" ::1 ").unwrap(), "::1");
        assert!(validate_address("10.0.0.300").is_err());
        assert!(validate_address("example.com").is_err());
    }

    #[test]
    fn test_validate_comment() {
        assert_eq!(validate_comment(" it's fine ").unwrap(), "it's fine");
        assert!(validate_comment("two\nlines").is_err());
        assert!(validate_comment(&"x".repeat(256)).is_err());
        assert!(validate_comment(&"x".repeat(255)).is_ok());
    }

    #[test]
    fn test_check_well_known_port() {
        assert_eq!(check_well_known_port(22).as_deref(), Some("Port 22: SSH"));
        assert!(check_well_known_port(8080).is_none());
    }

    #[test]
    fn test_check_reserved_ip() {
        let private: IpNetwork = "192.168.1.0/24".parse().unwrap();
        assert!(check_reserved_ip(private).unwrap().contains("RFC 1918"));
        let public: IpNetwork = "8.8.8.8".parse().unwrap();
        assert!(check_reserved_ip(public).is_none());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_validate_port_rejects_zero(port in any::<u16>()) {
            let result = validate_port(port);
            if port == 0 {
                prop_assert!(result.is_err());
            } else {
                prop_assert_eq!(result.unwrap(), port);
            }
        }

        #[test]
        fn test_port_spec_range_order(start in 1u16..=65535, end in 1u16..=65535) {
            let result = validate_port_spec(&format!("{start}:{end}"));
            prop_assert_eq!(result.is_ok(), start <= end);
        }

        #[test]
        fn test_validate_interface_length_constraint(name in "[a-zA-Z0-9._-]{0,20}") {
            let result = validate_interface(&name);
            if name.len() <= 15 && name != "." && name != ".." {
                prop_assert!(result.is_ok());
            } else if name.len() > 15 {
                prop_assert!(result.is_err());
            }
        }

        #[test]
        fn test_validate_interface_char_constraint(
            valid_prefix in "[a-zA-Z0-9._-]{1,10}",
            invalid_char in "[^a-zA-Z0-9._-]"
        ) {
            let invalid_name = format!("{valid_prefix}{invalid_char}");
            prop_assert!(validate_interface(&invalid_name).is_err());
        }

        #[test]
        fn test_validate_comment_rejects_control(
            prefix in "[a-zA-Z ']{0,20}",
            control in "[\\x00-\\x1f]"
        ) {
            let comment = format!("{prefix}{control}");
            prop_assert!(validate_comment(&comment).is_err());
        }
    }
}
