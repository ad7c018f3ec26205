//! Canonical row decoder
//!
//! Reads a [`CanonicalRow`] back into a [`Rule`]. Decoding is positional:
//!
//! - token 0 is the `[index]`
//! - the first `#`-prefixed token starts the comment, which runs to the end
//! - the action is the first `VERB-DIR` token after the index
//! - the destination is the first token before the action, the port is the
//!   last port token strictly between the two (`-` when there is none)
//! - the source is the token right after the action
//!
//! A row with exactly three tokens after the index whose first token is a
//! port (`[1] 22 ALLOW-IN Anywhere`) has no destination host; that token is
//! the port and the destination is the wildcard.
//!
//! Rows that do not decode return `None`; listing views skip them.

use crate::core::fields::{extract_port, is_port_token, split_address_and_interface};
use crate::core::listing::CanonicalRow;
use crate::core::rule::{ANY_PORT, ANYWHERE, Action, Endpoint, Port, Rule};

/// Decodes one canonical row
pub fn decode(row: &CanonicalRow) -> Option<Rule> {
    decode_text(row.as_str())
}

/// Decodes canonical row text.
///
/// ```
/// use rufw::core::decode::decode_text;
///
/// let rule = decode_text("[1] 192.168.50.10_on_eth1 - ALLOW-FWD 10.0.0.0/8_on_eth0 # No port route").unwrap();
/// assert_eq!(rule.out_interface(), Some("eth1"));
/// assert_eq!(rule.in_interface(), Some("eth0"));
/// assert_eq!(rule.comment.as_deref(), Some("No port route"));
/// ```
pub fn decode_text(text: &str) -> Option<Rule> {
    let all: Vec<&str> = text.split_whitespace().collect();
    let (tokens, comment) = split_comment(&all);

    if tokens.len() < 3 {
        return None;
    }

    let index = parse_index(tokens[0])?;
    let action_pos = tokens
        .iter()
        .skip(1)
        .position(|t| Action::from_token(t).is_some())?
        + 1;
    let action = Action::from_token(tokens[action_pos])?;

    let after_index = &tokens[1..];
    let (destination, port) = if after_index.len() == 3
        && action_pos == 2
        && (is_port_token(after_index[0]) || after_index[0] == ANY_PORT)
    {
        let mut destination = Endpoint::anywhere();
        destination.protocol = after_index[0]
            .split_once('/')
            .and_then(|(_, proto)| proto.parse().ok());
        (destination, Port::from_text(&extract_port(after_index[0])))
    } else {
        let destination = if action_pos > 1 {
            endpoint(tokens[1])
        } else {
            Endpoint::anywhere()
        };
        let port = tokens
            .get(2..action_pos)
            .unwrap_or_default()
            .iter()
            .rev()
            .find(|t| is_port_token(t))
            .map_or(Port::Any, |t| Port::from_text(&extract_port(t)));
        (destination, port)
    };

    let source = tokens
        .get(action_pos + 1)
        .map_or_else(Endpoint::anywhere, |t| endpoint(t));

    Some(Rule {
        index,
        destination,
        port,
        action,
        source,
        comment,
    })
}

/// Splits tokens at the first `#`-prefixed one; the comment keeps its inner spacing collapsed
fn split_comment<'a>(tokens: &'a [&'a str]) -> (&'a [&'a str], Option<String>) {
    let Some(pos) = tokens.iter().position(|t| t.starts_with('#')) else {
        return (tokens, None);
    };

    let mut words: Vec<&str> = Vec::with_capacity(tokens.len() - pos);
    let first = &tokens[pos][1..];
    if !first.is_empty() {
        words.push(first);
    }
    words.extend_from_slice(&tokens[pos + 1..]);

    let comment = words.join(" ");
    (&tokens[..pos], (!comment.is_empty()).then_some(comment))
}

fn parse_index(token: &str) -> Option<usize> {
    token
        .strip_prefix('[')?
        .strip_suffix(']')?
        .trim()
        .parse()
        .ok()
}

fn endpoint(fragment: &str) -> Endpoint {
    let (address, protocol, interface) = split_address_and_interface(fragment);
    Endpoint {
        address: if address.is_empty() {
            ANYWHERE.to_string()
        } else {
            address
        },
        protocol,
        interface,
    }
}
