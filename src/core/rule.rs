//! Rule data structures shared by the listing parser, decoder and synthesizer
//!
//! A [`Rule`] is the decoded form of one canonical listing row:
//!
//! ```text
//! [index] destination[/protocol][_on_outIface] port VERB-DIR source[_on_inIface] [# comment]
//! ```
//!
//! Rules are created fresh for every listing refresh or edit session and are
//! never persisted; the external tool owns persistence.
//!
//! # Example
//!
//! ```
//! use rufw::core::rule::{Action, Direction, Verb};
//!
//! let action: Action = "ALLOW IN".parse().unwrap();
//! assert_eq!(action.verb, Verb::Allow);
//! assert_eq!(action.direction, Direction::In);
//! assert_eq!(action.to_string(), "ALLOW-IN");
//! assert_eq!(action.command_text(), "allow in");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wildcard address as printed by the tool's listing
pub const ANYWHERE: &str = "Anywhere";

/// Wildcard address as accepted by the tool's command grammar
pub const ANY: &str = "any";

/// Port sentinel meaning "all ports"
pub const ANY_PORT: &str = "-";

/// Separator that binds an interface name to an address inside one token
pub const IFACE_SEPARATOR: &str = "_on_";

/// Transport protocol restriction
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Protocol {
    #[strum(serialize = "tcp")]
    Tcp,
    #[strum(serialize = "udp")]
    Udp,
}

/// Rule verb
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Verb {
    #[strum(serialize = "ALLOW")]
    Allow,
    #[strum(serialize = "DENY")]
    Deny,
    #[strum(serialize = "REJECT")]
    Reject,
    #[strum(serialize = "LIMIT")]
    Limit,
}

impl Verb {
    /// Lowercase form used in command text
    pub const fn command_word(self) -> &'static str {
        match self {
            Verb::Allow => "allow",
            Verb::Deny => "deny",
            Verb::Reject => "reject",
            Verb::Limit => "limit",
        }
    }
}

/// Traffic direction qualifier of an action
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Direction {
    /// Inbound (the tool's default when no direction is printed)
    #[default]
    #[strum(serialize = "IN")]
    In,
    #[strum(serialize = "OUT")]
    Out,
    /// Forwarded/routed traffic
    #[strum(serialize = "FWD")]
    Fwd,
}

impl Direction {
    pub const fn command_word(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::Fwd => "fwd",
        }
    }
}

/// Verb plus direction, e.g. `ALLOW-IN`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Action {
    pub verb: Verb,
    pub direction: Direction,
}

impl Action {
    pub const fn new(verb: Verb, direction: Direction) -> Self {
        Self { verb, direction }
    }

    pub const fn is_forward(self) -> bool {
        matches!(self.direction, Direction::Fwd)
    }

    /// Lowercase, space separated form used in command text (`allow in`)
    pub fn command_text(self) -> String {
        format!(
            "{} {}",
            self.verb.command_word(),
            self.direction.command_word()
        )
    }

    /// Space separated form used by edit forms (`ALLOW IN`)
    pub fn form_text(self) -> String {
        format!("{} {}", self.verb, self.direction)
    }

    /// Parses the hyphenated canonical token (`ALLOW-IN`), exact case only.
    ///
    /// Stricter than [`FromStr`] so that a host or profile named `allow`
    /// is never mistaken for an action.
    pub fn from_token(token: &str) -> Option<Self> {
        use strum::IntoEnumIterator;

        let (verb, direction) = token.split_once('-')?;
        let verb = Verb::iter().find(|v| v.as_ref() == verb)?;
        let direction = Direction::iter().find(|d| d.as_ref() == direction)?;
        Some(Self::new(verb, direction))
    }

    /// Every verb/direction combination the tool accepts, in menu order
    pub fn choices() -> Vec<Action> {
        use Direction::{Fwd, In, Out};
        use Verb::{Allow, Deny, Limit, Reject};

        let mut choices = Vec::with_capacity(10);
        for direction in [In, Out] {
            for verb in [Allow, Deny, Reject, Limit] {
                choices.push(Action::new(verb, direction));
            }
        }
        choices.push(Action::new(Allow, Fwd));
        choices.push(Action::new(Deny, Fwd));
        choices
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.verb, self.direction)
    }
}

/// Error returned when text is not a recognized action
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized action '{0}' (expected e.g. ALLOW IN, DENY OUT, ALLOW FWD)")]
pub struct ParseActionError(pub String);

impl FromStr for Action {
    type Err = ParseActionError;

    /// Accepts `ALLOW IN`, `ALLOW-IN`, `allow in` and a bare verb (inbound)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseActionError(s.to_string());
        let mut parts = s
            .split(|c: char| c == '-' || c.is_whitespace())
            .filter(|p| !p.is_empty());

        let verb = parts
            .next()
            .and_then(|p| Verb::from_str(p).ok())
            .ok_or_else(err)?;
        let direction = match parts.next() {
            Some(p) => Direction::from_str(p).map_err(|_| err())?,
            None => Direction::In,
        };
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(Action::new(verb, direction))
    }
}

/// Port restriction of a rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Port {
    /// No port restriction (`-`)
    #[default]
    Any,
    /// Port spec as printed by the tool (`22`, `8000:9000`, `80,443`)
    Spec(String),
}

impl Port {
    /// Builds a port from extracted text, coercing the empty string to [`Port::Any`]
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text == ANY_PORT {
            Port::Any
        } else {
            Port::Spec(text.to_string())
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Port::Any)
    }

    /// Text for a command's `port` clause, `None` when unrestricted
    pub fn command_value(&self) -> Option<&str> {
        match self {
            Port::Any => None,
            Port::Spec(spec) => Some(spec),
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Any => f.write_str(ANY_PORT),
            Port::Spec(spec) => f.write_str(spec),
        }
    }
}

/// One side (source or destination) of a rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
    pub protocol: Option<Protocol>,
    pub interface: Option<String>,
}

impl Endpoint {
    pub fn anywhere() -> Self {
        Self {
            address: ANYWHERE.to_string(),
            protocol: None,
            interface: None,
        }
    }

    /// Returns `true` for either spelling of the wildcard address
    pub fn is_wildcard(&self) -> bool {
        is_wildcard(&self.address)
    }

    /// Address text for command synthesis; the wildcard becomes `any`
    pub fn command_address(&self) -> &str {
        if self.is_wildcard() {
            ANY
        } else {
            &self.address
        }
    }

    /// Address text for an edit form; the wildcard becomes empty
    pub fn form_address(&self) -> String {
        if self.is_wildcard() {
            String::new()
        } else {
            self.address.clone()
        }
    }

    fn with_protocol(&self) -> String {
        match self.protocol {
            Some(proto) => format!("{}/{}", self.address, proto),
            None => self.address.clone(),
        }
    }

    /// Presentation form with the interface in parentheses: `10.0.0.0/8 (eth0)`
    pub fn presentation(&self) -> String {
        match &self.interface {
            Some(iface) => format!("{} ({iface})", self.with_protocol()),
            None => self.with_protocol(),
        }
    }
}

impl fmt::Display for Endpoint {
    /// Canonical token form: `address[/proto][_on_iface]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.with_protocol();
        let base = if base.is_empty() { ANY_PORT } else { &base };
        match &self.interface {
            Some(iface) => write!(f, "{base}{IFACE_SEPARATOR}{iface}"),
            None => f.write_str(base),
        }
    }
}

/// Returns `true` for `Anywhere` / `any` (case-insensitive)
pub fn is_wildcard(address: &str) -> bool {
    address.eq_ignore_ascii_case(ANYWHERE) || address.eq_ignore_ascii_case(ANY)
}

/// A decoded listing row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    /// 1-based position in the tool's numbered listing
    pub index: usize,
    pub destination: Endpoint,
    pub port: Port,
    pub action: Action,
    pub source: Endpoint,
    pub comment: Option<String>,
}

impl Rule {
    /// Protocol of the rule, taken from whichever side carries it
    pub fn protocol(&self) -> Option<Protocol> {
        self.destination.protocol.or(self.source.protocol)
    }

    /// Interface the traffic enters on
    pub fn in_interface(&self) -> Option<&str> {
        self.source.interface.as_deref()
    }

    /// Interface the traffic exits on
    pub fn out_interface(&self) -> Option<&str> {
        self.destination.interface.as_deref()
    }

    /// The six display cells of a listing table
    pub fn display_row(&self) -> DisplayRow {
        DisplayRow {
            index: format!("[{}]", self.index),
            to: self.destination.to_string(),
            port: self.port.to_string(),
            action: self.action.to_string(),
            from: self.source.to_string(),
            comment: self.comment.clone().unwrap_or_default(),
        }
    }
}

/// Display cells for one rule, in column order `# To Port Action From Comment`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub index: String,
    pub to: String,
    pub port: String,
    pub action: String,
    pub from: String,
    pub comment: String,
}

impl DisplayRow {
    pub const HEADERS: [&'static str; 6] = ["#", "To", "Port", "Action", "From", "Comment"];

    pub fn cells(&self) -> [&str; 6] {
        [
            &self.index,
            &self.to,
            &self.port,
            &self.action,
            &self.from,
            &self.comment,
        ]
    }
}
