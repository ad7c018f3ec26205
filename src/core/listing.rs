//! Raw listing parser
//!
//! Turns one line of `ufw status numbered` into a [`CanonicalRow`] with a
//! fixed token order:
//!
//! ```text
//! [index] destination[/proto][_on_outIface] port VERB-DIR source[_on_inIface] [# comment]
//! ```
//!
//! The tool's own output is ambiguous: a protocol, a port and an interface
//! can each be printed next to either address, depending on the rule's
//! direction. Parsing runs in three steps:
//!
//! 1. Split off the comment, the bracketed index and the `(v6)`/`(out)` markers.
//! 2. Tokenize the remaining text and locate the action (verb plus optional
//!    direction), which splits the line into a destination side and a source side.
//! 3. Match the sides against the known shapes ([`LineShape`]): the forward
//!    shape `src on IN out on OUT` first, then the generic shape.
//!
//! Lines without an index or an action are kept verbatim (whitespace
//! collapsed) and reported as [`LineShape::Passthrough`]; the decoder skips them.
//!
//! [`Listing`] holds one parsed refresh together with its IPv6 row count,
//! which is what insert positions are computed against.

use crate::core::decode::decode;
use crate::core::error::{Error, MutationError, Result};
use crate::core::fields::{extract_port, is_port_token};
use crate::core::rule::{
    ANY_PORT, ANYWHERE, Action, Direction, IFACE_SEPARATOR, Protocol, Rule, Verb,
};
use regex::RegexBuilder;
use std::fmt;
use strum::IntoEnumIterator;
use tracing::debug;

/// Marker the tool appends to IPv6 twins of a rule
const V6_MARKER: &str = "(v6)";

/// Marker the tool appends to outbound rules
const OUT_MARKER: &str = "(out)";

/// A normalized, whitespace-tokenizable listing row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalRow(String);

impl CanonicalRow {
    pub fn new(text: impl Into<String>) -> Self {
        Self(collapse_whitespace(&text.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which branch of the parser produced a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineShape {
    /// `dest [port/proto] ACTION src on IN out on OUT`
    Forward,
    /// Everything else with an index and an action
    Generic,
    /// No index or no action; text kept as-is
    Passthrough,
}

/// One listing line after parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub raw: String,
    pub row: CanonicalRow,
    pub shape: LineShape,
    /// The line carried the IPv6 marker
    pub ipv6: bool,
    /// Source port printed on the line; the canonical row has no slot for it
    pub source_port: Option<String>,
}

/// Parses one listing line into its canonical row.
///
/// ```
/// use rufw::core::listing::parse_line;
///
/// let parsed = parse_line("[ 1] 192.168.0.1 22/tcp ALLOW IN Anywhere # SSH rule");
/// assert_eq!(parsed.row.as_str(), "[1] 192.168.0.1/tcp 22 ALLOW-IN Anywhere # SSH rule");
/// ```
pub fn parse_line(raw: &str) -> ParsedLine {
    let collapsed = collapse_whitespace(raw);
    let (body, comment) = split_comment(&collapsed);
    let ipv6 = body.contains(V6_MARKER);

    let passthrough = || ParsedLine {
        raw: raw.to_string(),
        row: CanonicalRow(collapsed.clone()),
        shape: LineShape::Passthrough,
        ipv6,
        source_port: None,
    };

    let Some((index, rest)) = split_index(body) else {
        return passthrough();
    };

    let tokens: Vec<&str> = rest
        .split_whitespace()
        .filter_map(strip_markers)
        .collect();

    let Some((action_pos, action, source_start)) = locate_action(&tokens) else {
        return passthrough();
    };

    let dest_side = &tokens[..action_pos];
    let source_side = &tokens[source_start..];

    let (shape, sides) = match match_forward(dest_side, source_side) {
        Some(sides) => (LineShape::Forward, sides),
        None => (
            LineShape::Generic,
            match_generic(dest_side, source_side, action.direction),
        ),
    };
    debug!(?shape, line = %collapsed, "Parsed listing line");

    let mut row = format!(
        "[{index}] {} {} {action} {}",
        sides.destination, sides.port, sides.source
    );
    if let Some(comment) = comment {
        row.push_str(" # ");
        row.push_str(&comment);
    }

    ParsedLine {
        raw: raw.to_string(),
        row: CanonicalRow(collapse_whitespace(&row)),
        shape,
        ipv6,
        source_port: sides.source_port,
    }
}

/// Shorthand for `parse_line(raw).row`
pub fn canonicalize(raw: &str) -> CanonicalRow {
    parse_line(raw).row
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits at the first whitespace-separated token starting with `#`.
///
/// Everything after the marker is opaque comment text.
fn split_comment(line: &str) -> (&str, Option<String>) {
    let mut offset = 0;
    for token in line.split(' ') {
        if token.starts_with('#') {
            let body = line[..offset].trim_end();
            let comment = line[offset + 1..].trim();
            let comment = (!comment.is_empty()).then(|| comment.to_string());
            return (body, comment);
        }
        offset += token.len() + 1;
    }
    (line, None)
}

/// Splits `[ 12] rest` into `(12, "rest")`
fn split_index(line: &str) -> Option<(usize, &str)> {
    let inner = line.trim_start().strip_prefix('[')?;
    let close = inner.find(']')?;
    let index = inner[..close].trim().parse().ok()?;
    Some((index, &inner[close + 1..]))
}

/// Drops the `(v6)`/`(out)` markers, whether standalone or glued to a token
fn strip_markers(token: &str) -> Option<&str> {
    let mut token = token;
    for marker in [V6_MARKER, OUT_MARKER] {
        token = token.strip_suffix(marker).unwrap_or(token);
    }
    (!token.is_empty()).then_some(token)
}

fn parse_verb(token: &str) -> Option<Verb> {
    Verb::iter().find(|v| v.as_ref() == token)
}

fn parse_direction(token: &str) -> Option<Direction> {
    Direction::iter().find(|d| d.as_ref() == token)
}

/// Finds the action; returns its position, the action and where the source side starts
fn locate_action(tokens: &[&str]) -> Option<(usize, Action, usize)> {
    tokens.iter().enumerate().find_map(|(pos, token)| {
        if let Some(verb) = parse_verb(token) {
            return Some(match tokens.get(pos + 1).and_then(|t| parse_direction(t)) {
                Some(direction) => (pos, Action::new(verb, direction), pos + 2),
                None => (pos, Action::new(verb, Direction::In), pos + 1),
            });
        }
        // Already hyphenated (re-parsing a canonical row)
        Action::from_token(token).map(|action| (pos, action, pos + 1))
    })
}

/// Canonical tokens of one parsed line, minus index, action and comment
struct Sides {
    destination: String,
    port: String,
    source: String,
    source_port: Option<String>,
}

/// Destination side broken into host, port and protocol
#[derive(Default)]
struct DestinationParts {
    host: Vec<String>,
    port: Option<String>,
    protocol: Option<Protocol>,
}

impl DestinationParts {
    fn classify(tokens: &[&str]) -> Self {
        let mut parts = Self::default();
        let mut iter = tokens.iter().peekable();

        while let Some(&token) = iter.next() {
            if token == ANY_PORT {
                // `- udp`: no port, protocol only
                if let Some(proto) = iter.peek().and_then(|t| t.parse::<Protocol>().ok()) {
                    parts.protocol = Some(proto);
                    iter.next();
                }
            } else if is_port_token(token) {
                parts.port = Some(extract_port(token));
                if let Some((_, proto)) = token.split_once('/') {
                    parts.protocol = proto.parse().ok();
                }
            } else if !parts.host.is_empty()
                && let Ok(proto) = token.parse::<Protocol>()
            {
                parts.protocol = Some(proto);
            } else {
                parts.host.push(token.to_string());
            }
        }
        parts
    }

    /// Host token with the protocol glued on, `Anywhere` when no host was printed
    fn host_token(&self) -> String {
        let host = if self.host.is_empty() {
            ANYWHERE.to_string()
        } else {
            self.host.join("_")
        };
        match self.protocol {
            Some(proto) if !host_has_protocol(&host) => format!("{host}/{proto}"),
            _ => host,
        }
    }

    fn port_token(&self) -> String {
        match &self.port {
            Some(port) if !port.is_empty() => port.clone(),
            _ => ANY_PORT.to_string(),
        }
    }
}

fn host_has_protocol(host: &str) -> bool {
    let bare = host.split(IFACE_SEPARATOR).next().unwrap_or(host);
    bare.ends_with("/tcp") || bare.ends_with("/udp")
}

fn attach_interface(host: String, iface: Option<&str>) -> String {
    match iface {
        Some(iface) if !host.contains(IFACE_SEPARATOR) => format!("{host}{IFACE_SEPARATOR}{iface}"),
        _ => host,
    }
}

/// Matches the forward shape: source side is exactly `src on IN out on OUT`
fn match_forward(dest_side: &[&str], source_side: &[&str]) -> Option<Sides> {
    let [from, "on", in_iface, "out", "on", out_iface] = source_side else {
        return None;
    };
    if dest_side.is_empty() || dest_side.len() > 2 || dest_side.contains(&"on") {
        return None;
    }

    let dest = DestinationParts::classify(dest_side);
    Some(Sides {
        destination: attach_interface(dest.host_token(), Some(out_iface)),
        port: dest.port_token(),
        source: attach_interface((*from).to_string(), Some(in_iface)),
        source_port: None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Destination,
    Source,
}

/// One `[out] on IFACE` clause found in the line
#[derive(Debug)]
struct InterfaceClause<'a> {
    iface: &'a str,
    side: Side,
    out_prefix: bool,
}

/// Removes `[out|in] on IFACE` clauses from one side, returning what is left
fn take_interface_clauses<'a>(
    tokens: &[&'a str],
    side: Side,
    clauses: &mut Vec<InterfaceClause<'a>>,
) -> Vec<&'a str> {
    let mut kept = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        let is_prefix = matches!(token, "out" | "in") && tokens.get(i + 1) == Some(&"on");
        if is_prefix && let Some(iface) = tokens.get(i + 2) {
            clauses.push(InterfaceClause {
                iface,
                side,
                out_prefix: token == "out",
            });
            i += 3;
        } else if token == "on"
            && let Some(iface) = tokens.get(i + 1)
        {
            clauses.push(InterfaceClause {
                iface,
                side,
                out_prefix: false,
            });
            i += 2;
        } else {
            kept.push(token);
            i += 1;
        }
    }
    kept
}

/// Decides which side each interface clause belongs to.
///
/// Returns `(destination_iface, source_iface)`. The source side is the one
/// the traffic enters on, the destination side the one it leaves on: an
/// inbound rule's single interface goes to the source, an outbound rule's to
/// the destination. A forward rule's single interface stays on the side it
/// was printed on (`route allow in on eth0` lists it after `From`). With two
/// clauses on a forward rule, the `out on` clause (or the one printed on the
/// destination side) is the exit interface.
fn assign_interfaces<'a>(
    clauses: &[InterfaceClause<'a>],
    direction: Direction,
) -> (Option<&'a str>, Option<&'a str>) {
    match (clauses, direction) {
        ([], _) => (None, None),
        ([_, _, ..], Direction::Fwd) => {
            let exit = clauses
                .iter()
                .position(|c| c.out_prefix)
                .or_else(|| clauses.iter().position(|c| c.side == Side::Destination))
                .unwrap_or(clauses.len() - 1);
            let enter = clauses
                .iter()
                .enumerate()
                .find(|(i, _)| *i != exit)
                .map(|(_, c)| c.iface);
            (Some(clauses[exit].iface), enter)
        }
        ([first, ..], Direction::In) => (None, Some(first.iface)),
        ([first, ..], Direction::Out) => (Some(first.iface), None),
        ([first, ..], Direction::Fwd) => {
            if first.out_prefix || first.side == Side::Destination {
                (Some(first.iface), None)
            } else {
                (None, Some(first.iface))
            }
        }
    }
}

fn match_generic(dest_side: &[&str], source_side: &[&str], direction: Direction) -> Sides {
    let mut clauses = Vec::new();
    let dest_tokens = take_interface_clauses(dest_side, Side::Destination, &mut clauses);
    let source_tokens = take_interface_clauses(source_side, Side::Source, &mut clauses);

    let dest = DestinationParts::classify(&dest_tokens);

    let mut source_host = Vec::new();
    let mut source_proto = None;
    let mut source_port = None;
    for token in source_tokens {
        if is_port_token(token) {
            debug!(token, "Source port has no slot in the canonical row");
            source_port = Some(token.to_string());
            if let Some((_, proto)) = token.split_once('/') {
                source_proto = proto.parse::<Protocol>().ok();
            }
        } else if token != ANY_PORT {
            source_host.push(token);
        }
    }
    let mut source = if source_host.is_empty() {
        ANYWHERE.to_string()
    } else {
        source_host.join("_")
    };
    if let Some(proto) = source_proto
        && dest.protocol.is_none()
        && !host_has_protocol(&source)
    {
        source = format!("{source}/{proto}");
    }

    let (dest_iface, source_iface) = assign_interfaces(&clauses, direction);

    Sides {
        destination: attach_interface(dest.host_token(), dest_iface),
        port: dest.port_token(),
        source: attach_interface(source, source_iface),
        source_port,
    }
}

/// One refresh of the tool's numbered listing
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// `Status: active` was reported
    pub active: bool,
    /// Rule lines in listing order
    pub lines: Vec<ParsedLine>,
    /// Number of IPv6 rows; they are numbered after every IPv4 row
    pub v6_count: usize,
}

impl Listing {
    /// Parses the full output of `ufw status numbered`.
    ///
    /// The status line, column headers, separator and blank lines are skipped.
    pub fn from_output(output: &str) -> Self {
        let mut listing = Self::default();

        for line in output.lines() {
            let trimmed = line.trim();
            if let Some(status) = trimmed.strip_prefix("Status:") {
                listing.active = status.trim() == "active";
                continue;
            }
            if !trimmed.starts_with('[') {
                continue;
            }
            let parsed = parse_line(trimmed);
            if parsed.ipv6 {
                listing.v6_count += 1;
            }
            listing.lines.push(parsed);
        }

        listing
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &CanonicalRow> {
        self.lines.iter().map(|l| &l.row)
    }

    /// Decoded rules; rows that do not decode are skipped
    pub fn rules(&self) -> Vec<Rule> {
        self.rows().filter_map(decode).collect()
    }

    /// The line numbered `index` by the tool (1-based)
    pub fn line(&self, index: usize) -> Option<&ParsedLine> {
        index.checked_sub(1).and_then(|i| self.lines.get(i))
    }

    /// The line numbered `index`, if an edit can reproduce it
    ///
    /// # Errors
    ///
    /// - [`MutationError::UnknownRow`] if `index` is not listed
    /// - [`MutationError::SourcePortUnsupported`] if the line matches a source
    ///   port, which a synthesized replacement would silently widen
    pub fn editable_line(&self, index: usize) -> std::result::Result<&ParsedLine, MutationError> {
        let line = self.line(index).ok_or(MutationError::UnknownRow(index))?;
        match &line.source_port {
            Some(port) => Err(MutationError::SourcePortUnsupported {
                row: index,
                port: port.clone(),
            }),
            None => Ok(line),
        }
    }

    /// Number of IPv4 rows
    pub fn v4_count(&self) -> usize {
        self.lines.len().saturating_sub(self.v6_count)
    }

    /// Position to insert a replacement for row `index`, if insertion applies.
    ///
    /// Only IPv4 rows before the last one can be replaced in place: the old
    /// row is deleted before the new one is inserted, so the last IPv4 slot
    /// no longer exists at insert time and an append lands in the same spot.
    /// IPv6 rows are numbered after all IPv4 rows and are replaced by append.
    pub fn insert_position(&self, index: usize) -> Option<usize> {
        (index >= 1 && index < self.v4_count()).then_some(index)
    }

    /// Rows matching a case-insensitive regular expression
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the pattern is not a valid regex.
    pub fn search(&self, pattern: &str) -> Result<Vec<&ParsedLine>> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Validation {
                field: "search".to_string(),
                message: e.to_string(),
            })?;

        Ok(self
            .lines
            .iter()
            .filter(|line| regex.is_match(line.row.as_str()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(raw: &str) -> String {
        parse_line(raw).row.to_string()
    }

    #[test]
    fn test_inbound_with_port_and_comment() {
        assert_eq!(
            row("[ 1] 192.168.0.1 22/tcp ALLOW IN Anywhere # SSH rule"),
            "[1] 192.168.0.1/tcp 22 ALLOW-IN Anywhere # SSH rule"
        );
    }

    #[test]
    fn test_forward_with_two_interfaces() {
        let parsed = parse_line("[ 1] 192.168.1.100 80/tcp DENY FWD Anywhere on eth0 out on eth1");
        assert_eq!(parsed.shape, LineShape::Forward);
        assert_eq!(
            parsed.row.as_str(),
            "[1] 192.168.1.100/tcp_on_eth1 80 DENY-FWD Anywhere_on_eth0"
        );
    }

    #[test]
    fn test_forward_without_port() {
        assert_eq!(
            row("[ 1] 192.168.50.10 ALLOW FWD 10.0.0.0/8 on eth0 out on eth1 # No port route"),
            "[1] 192.168.50.10_on_eth1 - ALLOW-FWD 10.0.0.0/8_on_eth0 # No port route"
        );
    }

    #[test]
    fn test_forward_with_comment() {
        assert_eq!(
            row("[ 1] 172.16.0.5 443/tcp ALLOW FWD 10.0.0.0/8 on eth1 out on eth2 # HTTPS route"),
            "[1] 172.16.0.5/tcp_on_eth2 443 ALLOW-FWD 10.0.0.0/8_on_eth1 # HTTPS route"
        );
    }

    #[test]
    fn test_forward_interfaces_printed_per_side() {
        let parsed = parse_line("[ 3] Anywhere on eth1 ALLOW FWD Anywhere on eth0");
        assert_eq!(parsed.shape, LineShape::Generic);
        assert_eq!(
            parsed.row.as_str(),
            "[3] Anywhere_on_eth1 - ALLOW-FWD Anywhere_on_eth0"
        );
    }

    #[test]
    fn test_forward_single_interface_keeps_printed_side() {
        // route allow in on eth0
        let parsed = parse_line("[ 1] Anywhere ALLOW FWD Anywhere on eth0");
        assert_eq!(parsed.row.as_str(), "[1] Anywhere - ALLOW-FWD Anywhere_on_eth0");
        let rule = decode(&parsed.row).unwrap();
        assert_eq!(rule.in_interface(), Some("eth0"));
        assert_eq!(rule.out_interface(), None);

        // route allow out on eth1
        let parsed = parse_line("[ 2] Anywhere on eth1 ALLOW FWD Anywhere");
        assert_eq!(parsed.row.as_str(), "[2] Anywhere_on_eth1 - ALLOW-FWD Anywhere");
        let rule = decode(&parsed.row).unwrap();
        assert_eq!(rule.in_interface(), None);
        assert_eq!(rule.out_interface(), Some("eth1"));

        assert_eq!(
            row("[ 3] 10.0.0.5 80/tcp ALLOW FWD Anywhere out on eth1"),
            "[3] 10.0.0.5/tcp_on_eth1 80 ALLOW-FWD Anywhere"
        );
    }

    #[test]
    fn test_port_without_protocol() {
        assert_eq!(
            row("[ 1] 192.168.0.1 80         ALLOW IN    Anywhere"),
            "[1] 192.168.0.1 80 ALLOW-IN Anywhere"
        );
    }

    #[test]
    fn test_protocol_only_marker() {
        assert_eq!(
            row("[ 1] 10.0.0.0/24 - udp DENY IN Anywhere"),
            "[1] 10.0.0.0/24/udp - DENY-IN Anywhere"
        );
        assert_eq!(
            row("[ 1] Anywhere - udp ALLOW IN 10.0.0.0/24"),
            "[1] Anywhere/udp - ALLOW-IN 10.0.0.0/24"
        );
    }

    #[test]
    fn test_bare_port_relocated() {
        assert_eq!(
            row("[ 2] 22/tcp                     ALLOW IN    Anywhere"),
            "[2] Anywhere/tcp 22 ALLOW-IN Anywhere"
        );
        assert_eq!(
            row("[ 4] 8000:9000/udp ALLOW IN Anywhere"),
            "[4] Anywhere/udp 8000:9000 ALLOW-IN Anywhere"
        );
    }

    #[test]
    fn test_outbound_marker_stripped() {
        assert_eq!(
            row("[ 1] 8.8.8.8 53/udp DENY OUT Anywhere (out) # Block Google DNS"),
            "[1] 8.8.8.8/udp 53 DENY-OUT Anywhere # Block Google DNS"
        );
    }

    #[test]
    fn test_ipv6_marker_stripped_and_flagged() {
        let parsed = parse_line("[ 1] ::1 22/tcp ALLOW IN Anywhere (v6) # SSH v6");
        assert!(parsed.ipv6);
        assert_eq!(parsed.row.as_str(), "[1] ::1/tcp 22 ALLOW-IN Anywhere # SSH v6");

        let parsed = parse_line("[ 7] 22/tcp (v6) ALLOW IN Anywhere (v6)");
        assert!(parsed.ipv6);
        assert_eq!(parsed.row.as_str(), "[7] Anywhere/tcp 22 ALLOW-IN Anywhere");
    }

    #[test]
    fn test_inbound_interface_attaches_to_source() {
        assert_eq!(
            row("[ 5] Anywhere on eth0 ALLOW IN Anywhere"),
            "[5] Anywhere - ALLOW-IN Anywhere_on_eth0"
        );
        assert_eq!(
            row("[ 5] 22/tcp on eth0 ALLOW IN 10.0.0.1"),
            "[5] Anywhere/tcp 22 ALLOW-IN 10.0.0.1_on_eth0"
        );
    }

    #[test]
    fn test_outbound_interface_attaches_to_destination() {
        assert_eq!(
            row("[ 6] 53 ALLOW OUT Anywhere on eth0 (out)"),
            "[6] Anywhere_on_eth0 53 ALLOW-OUT Anywhere"
        );
    }

    #[test]
    fn test_comment_is_opaque() {
        assert_eq!(
            row("[ 1] 80/tcp ALLOW IN Anywhere # web on eth0 ALLOW IN (v6) #2"),
            "[1] Anywhere/tcp 80 ALLOW-IN Anywhere # web on eth0 ALLOW IN (v6) #2"
        );
        assert!(!parse_line("[ 1] 80/tcp ALLOW IN Anywhere # (v6) twin").ipv6);
    }

    #[test]
    fn test_comment_marker_glued_to_text() {
        assert_eq!(
            row("[ 1] 80/tcp ALLOW IN Anywhere #web"),
            "[1] Anywhere/tcp 80 ALLOW-IN Anywhere # web"
        );
    }

    #[test]
    fn test_bare_verb_gets_inbound_direction() {
        assert_eq!(
            row("[ 1] 22 ALLOW Anywhere"),
            "[1] Anywhere 22 ALLOW-IN Anywhere"
        );
    }

    #[test]
    fn test_application_profile_name() {
        assert_eq!(
            row("[ 2] Apache Full ALLOW IN Anywhere"),
            "[2] Apache_Full - ALLOW-IN Anywhere"
        );
    }

    #[test]
    fn test_source_port_keeps_protocol() {
        let parsed = parse_line("[ 3] Anywhere ALLOW IN 10.0.0.1 53/udp");
        assert_eq!(parsed.row.as_str(), "[3] Anywhere - ALLOW-IN 10.0.0.1/udp");
        assert_eq!(parsed.source_port.as_deref(), Some("53/udp"));

        assert_eq!(parse_line("[ 1] 22/tcp ALLOW IN Anywhere").source_port, None);
    }

    #[test]
    fn test_source_port_rows_are_not_editable() {
        let listing = Listing::from_output(
            "Status: active\n[ 1] 22/tcp ALLOW IN Anywhere\n[ 2] Anywhere ALLOW IN 10.0.0.1 53/udp\n",
        );
        assert!(listing.editable_line(1).is_ok());
        assert!(matches!(
            listing.editable_line(2),
            Err(MutationError::SourcePortUnsupported { row: 2, ref port }) if port == "53/udp"
        ));
        assert!(matches!(listing.editable_line(3), Err(MutationError::UnknownRow(3))));
    }

    #[test]
    fn test_canonical_rows_are_fixed_points() {
        let lines = [
            "[ 1] 192.168.0.1 22/tcp ALLOW IN Anywhere # SSH rule",
            "[ 1] 192.168.1.100 80/tcp DENY FWD Anywhere on eth0 out on eth1",
            "[ 5] Anywhere on eth0 ALLOW IN Anywhere",
            "[ 1] 10.0.0.0/24 - udp DENY IN Anywhere",
        ];
        for line in lines {
            let once = canonicalize(line);
            let twice = canonicalize(once.as_str());
            assert_eq!(once, twice, "not a fixed point: {line}");
        }
    }

    #[test]
    fn test_malformed_lines_pass_through() {
        let parsed = parse_line("To                         Action      From");
        assert_eq!(parsed.shape, LineShape::Passthrough);
        assert_eq!(parsed.row.as_str(), "To Action From");

        let parsed = parse_line("[ 1] nothing to see here");
        assert_eq!(parsed.shape, LineShape::Passthrough);
        assert_eq!(parsed.row.as_str(), "[ 1] nothing to see here");
    }

    const STATUS_OUTPUT: &str = "Status: active

     To                         Action      From
     --                         ------      ----
[ 1] 22/tcp                     ALLOW IN    Anywhere                   # SSH
[ 2] 192.168.0.1 80/tcp         DENY IN     10.0.0.0/8
[ 3] 8.8.8.8 53/udp             DENY OUT    Anywhere                   (out)
[ 4] 22/tcp (v6)                ALLOW IN    Anywhere (v6)              # SSH
";

    #[test]
    fn test_listing_from_status_output() {
        let listing = Listing::from_output(STATUS_OUTPUT);
        assert!(listing.active);
        assert_eq!(listing.len(), 4);
        assert_eq!(listing.v6_count, 1);
        assert_eq!(listing.v4_count(), 3);
        assert_eq!(
            listing.line(1).unwrap().row.as_str(),
            "[1] Anywhere/tcp 22 ALLOW-IN Anywhere # SSH"
        );
        assert_eq!(listing.rules().len(), 4);
    }

    #[test]
    fn test_listing_inactive() {
        let listing = Listing::from_output("Status: inactive\n");
        assert!(!listing.active);
        assert!(listing.is_empty());
    }

    #[test]
    fn test_insert_position_respects_v6_rows() {
        let listing = Listing::from_output(STATUS_OUTPUT);
        assert_eq!(listing.insert_position(1), Some(1));
        assert_eq!(listing.insert_position(2), Some(2));
        // last IPv4 row is replaced by append
        assert_eq!(listing.insert_position(3), None);
        // IPv6 row
        assert_eq!(listing.insert_position(4), None);
        assert_eq!(listing.insert_position(0), None);
    }

    #[test]
    fn test_search_case_insensitive() {
        let listing = Listing::from_output(STATUS_OUTPUT);
        let hits = listing.search("ssh").unwrap();
        assert_eq!(hits.len(), 2);
        let hits = listing.search("deny-out").unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].row.as_str().contains("8.8.8.8"));
    }

    #[test]
    fn test_search_invalid_pattern() {
        let listing = Listing::from_output(STATUS_OUTPUT);
        assert!(matches!(
            listing.search("(unclosed"),
            Err(Error::Validation { .. })
        ));
    }
}
