//! Command synthesizer
//!
//! Maps a [`FormInput`] to the pair of ufw command lines that validate and
//! apply it. The shape depends on three things:
//!
//! - **Direction clause**: `allow in`, `allow in on eth0`, or for a forward
//!   rule with both interfaces `allow in on eth0 out on eth1`.
//! - **Route keyword**: a new forward rule with both interfaces starts with
//!   `route`; when inserting at a position the keyword moves in front of
//!   `insert` instead (`ufw route insert 3 allow in on ...`).
//! - **Position**: with a position both commands use `insert N`.
//!
//! The body is always `from SRC to DST [proto P] [port N] [comment '...']`,
//! with empty and `Anywhere` addresses written as `any`.
//!
//! ```
//! use rufw::core::rule::{Action, Direction, Protocol, Verb};
//! use rufw::core::synth::{FormInput, synthesize};
//!
//! let form = FormInput {
//!     to: "192.168.0.1".into(),
//!     port: "22".into(),
//!     protocol: Some(Protocol::Tcp),
//!     action: Action::new(Verb::Allow, Direction::In),
//!     comment: "SSH rule".into(),
//!     ..FormInput::default()
//! };
//! let pair = synthesize(&form).unwrap();
//! assert_eq!(
//!     pair.apply.as_str(),
//!     "ufw allow in from any to 192.168.0.1 proto tcp port 22 comment 'SSH rule'"
//! );
//! assert!(pair.validate.as_str().starts_with("ufw --dry-run allow in"));
//! ```

use crate::core::fields::extract_protocol;
use crate::core::rule::{ANY, Action, Direction, Protocol, Rule, Verb, is_wildcard};
use crate::validators;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default name of the external tool
pub const DEFAULT_TOOL: &str = "ufw";

/// One complete command line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UfwCommand(String);

impl UfwCommand {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UfwCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dry-run command and the matching real command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPair {
    pub validate: UfwCommand,
    pub apply: UfwCommand,
}

/// Input of an add or edit form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInput {
    /// Destination address; empty means any
    pub to: String,
    /// Port spec; empty means any
    pub port: String,
    /// Interface the traffic enters on (or leaves on, for OUT rules)
    pub interface: String,
    /// Interface forwarded traffic leaves on
    pub interface_out: Option<String>,
    pub protocol: Option<Protocol>,
    pub action: Action,
    /// Source address; empty means any
    pub from: String,
    pub comment: String,
    /// 1-based row to insert at; `None` creates a new rule at the end
    pub position: Option<usize>,
}

impl Default for FormInput {
    fn default() -> Self {
        Self {
            to: String::new(),
            port: String::new(),
            interface: String::new(),
            interface_out: None,
            protocol: None,
            action: Action::new(Verb::Allow, Direction::In),
            from: String::new(),
            comment: String::new(),
            position: None,
        }
    }
}

/// Per-field validation messages of a form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(Vec<(&'static str, String)>);

impl FormErrors {
    fn check(&mut self, field: &'static str, result: Result<String, String>) {
        if let Err(message) = result {
            self.0.push((field, message));
        }
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// Message for one field, if it failed
    pub fn get(&self, field: &str) -> Option<&str> {
        self.iter().find(|(f, _)| *f == field).map(|(_, m)| m)
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

impl FormInput {
    /// Rebuilds form input from a decoded row, ready for editing
    ///
    /// Wildcard addresses and the `-` port come back empty so that they
    /// synthesize to `any` and no port clause.
    pub fn from_rule(rule: &Rule) -> Self {
        let destination = rule.destination.to_string();
        let source = rule.source.to_string();

        let (interface, interface_out) = match rule.action.direction {
            Direction::In => (rule.in_interface(), None),
            Direction::Out => (rule.out_interface(), None),
            Direction::Fwd => (rule.in_interface(), rule.out_interface()),
        };

        Self {
            to: rule.destination.form_address(),
            port: rule.port.command_value().unwrap_or_default().to_string(),
            interface: interface.unwrap_or_default().to_string(),
            interface_out: interface_out.map(str::to_string),
            protocol: extract_protocol(&[&destination, &source]),
            action: rule.action,
            from: rule.source.form_address(),
            comment: rule.comment.clone().unwrap_or_default(),
            position: None,
        }
    }

    fn interface_out(&self) -> &str {
        self.interface_out.as_deref().map_or("", str::trim)
    }

    /// `true` when the form would produce a routed rule with both interfaces
    pub fn is_route(&self) -> bool {
        self.action.is_forward()
            && !self.interface.trim().is_empty()
            && !self.interface_out().is_empty()
    }

    /// Checks every field and the cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns every failing field with its message.
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        errors.check("to", validators::validate_address(&self.to));
        errors.check("from", validators::validate_address(&self.from));
        errors.check("port", validators::validate_port_spec(&self.port));
        errors.check("interface", validators::validate_interface(self.interface.trim()));
        errors.check(
            "interface_out",
            validators::validate_interface(self.interface_out()),
        );
        errors.check("comment", validators::validate_comment(&self.comment));

        if validators::port_spec_needs_protocol(&self.port) && self.protocol.is_none() {
            errors.push("protocol", "Port ranges and lists need tcp or udp");
        }

        if self.action.is_forward() {
            let inbound = self.interface.trim();
            let outbound = self.interface_out();
            if inbound.is_empty() || outbound.is_empty() {
                errors.push(
                    "interface_out",
                    "Forward rules need both an inbound and an outbound interface",
                );
            } else if inbound == outbound {
                errors.push(
                    "interface_out",
                    "Outbound interface must differ from the inbound interface",
                );
            }
        } else if !self.interface_out().is_empty() {
            errors.push("interface_out", "Only forward rules take an outbound interface");
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// `true` when nothing that selects traffic has been filled in
    fn is_untouched(&self) -> bool {
        self.port.trim().is_empty()
            && self.protocol.is_none()
            && self.interface.trim().is_empty()
            && self.to.trim().is_empty()
            && self.from.trim().is_empty()
    }

    /// Verb, direction and interface clause, without the `route` keyword
    fn direction_clause(&self) -> String {
        let verb = self.action.verb.command_word();
        let interface = self.interface.trim();

        if self.is_route() {
            return format!(
                "{verb} in on {interface} out on {}",
                self.interface_out()
            );
        }

        let mut clause = self.action.command_text();
        if !interface.is_empty() {
            clause.push_str(" on ");
            clause.push_str(interface);
        }
        clause
    }

    /// `from SRC to DST [proto P] [port N] [comment '...']`
    fn body_clause(&self) -> String {
        let or_any = |s: &str| {
            let s = s.trim();
            if s.is_empty() || is_wildcard(s) {
                ANY.to_string()
            } else {
                s.to_string()
            }
        };

        let mut body = format!("from {} to {}", or_any(&self.from), or_any(&self.to));
        if let Some(proto) = self.protocol {
            body.push_str(" proto ");
            body.push_str(proto.as_ref());
        }
        let port = self.port.trim();
        if !port.is_empty() {
            body.push_str(" port ");
            body.push_str(port);
        }
        let comment = self.comment.trim();
        if !comment.is_empty() {
            body.push_str(" comment '");
            body.push_str(&comment.replace('\'', "''"));
            body.push('\'');
        }
        body
    }
}

/// Builds command lines for one ufw executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuilder {
    tool: String,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL)
    }
}

impl CommandBuilder {
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    fn command(&self, args: &str) -> UfwCommand {
        UfwCommand(format!("{} {args}", self.tool))
    }

    /// Validate/apply pair for a form, or `None` for an untouched form
    pub fn rule(&self, form: &FormInput) -> Option<CommandPair> {
        if form.is_untouched() {
            return None;
        }

        let clause = form.direction_clause();
        let body = form.body_clause();
        let rest = match (form.position, form.is_route()) {
            (None, false) => format!("{clause} {body}"),
            (None, true) => format!("route {clause} {body}"),
            (Some(pos), false) => format!("insert {pos} {clause} {body}"),
            (Some(pos), true) => format!("route insert {pos} {clause} {body}"),
        };

        Some(CommandPair {
            validate: self.command(&format!("--dry-run {rest}")),
            apply: self.command(&rest),
        })
    }

    /// Deletes the rule numbered `row` without prompting
    pub fn delete(&self, row: usize) -> UfwCommand {
        self.command(&format!("--force delete {row}"))
    }

    pub fn enable(&self) -> UfwCommand {
        self.command("--force enable")
    }

    pub fn disable(&self) -> UfwCommand {
        self.command("--force disable")
    }

    /// Removes every rule and disables the firewall
    pub fn reset(&self) -> UfwCommand {
        self.command("--force reset")
    }

    pub fn status(&self) -> UfwCommand {
        self.command("status numbered")
    }
}

/// Synthesizes the command pair for a form with the default tool name
pub fn synthesize(form: &FormInput) -> Option<CommandPair> {
    CommandBuilder::default().rule(form)
}
