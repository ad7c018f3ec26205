use thiserror::Error;

/// Core error types for rufw
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The ufw command exited unsuccessfully
    #[error("ufw error: {message}")]
    Ufw {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    /// Input validation failed
    #[error("Validation error in {field}: {message}")]
    Validation { field: String, message: String },

    /// Privilege escalation failed
    #[error("Elevation error: {0}")]
    Elevation(String),

    /// Internal logic error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of one validate/delete/apply sequence.
///
/// Each variant says how far the sequence got, which tells the operator
/// what the firewall looks like now.
#[derive(Debug, Error)]
pub enum MutationError {
    /// The row to replace is not in the listing; nothing was run
    #[error("No rule numbered {0} in the current listing")]
    UnknownRow(usize),

    /// The row matches a source port an edit cannot carry over; nothing was run
    #[error("Rule {row} matches source port {port}, which editing would drop")]
    SourcePortUnsupported { row: usize, port: String },

    /// The dry run was refused; nothing changed
    #[error("Rule rejected by ufw: {0}")]
    Rejected(#[source] Error),

    /// Deleting the row being replaced failed; nothing changed
    #[error("Could not delete rule {row}: {source}")]
    DeleteFailed {
        row: usize,
        #[source]
        source: Error,
    },

    /// Applying failed and no delete had been issued; nothing changed
    #[error("Rule passed validation but could not be applied: {0}")]
    ApplyFailed(#[source] Error),

    /// Applying failed after the old row was deleted
    #[error(
        "Rule {row} was deleted but its replacement could not be applied; re-add it manually: {deleted}"
    )]
    ReplacementLost {
        row: usize,
        /// Canonical text of the deleted row
        deleted: String,
        #[source]
        source: Error,
    },
}

impl MutationError {
    /// The underlying command error, if a command ran
    pub fn cause(&self) -> Option<&Error> {
        match self {
            Self::UnknownRow(_) | Self::SourcePortUnsupported { .. } => None,
            Self::Rejected(e) | Self::ApplyFailed(e) => Some(e),
            Self::DeleteFailed { source, .. } | Self::ReplacementLost { source, .. } => {
                Some(source)
            }
        }
    }

    /// `true` when the firewall no longer matches the listing the operator saw
    pub fn firewall_changed(&self) -> bool {
        matches!(self, Self::ReplacementLost { .. })
    }
}

/// Represents a translated error with helpful context
#[derive(Debug, Clone)]
pub struct ErrorTranslation {
    pub user_message: String,
    pub suggestions: Vec<String>,
    pub help_url: Option<String>,
}

impl ErrorTranslation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            user_message: message.into(),
            suggestions: Vec::new(),
            help_url: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, url: impl Into<String>) -> Self {
        self.help_url = Some(url.into());
        self
    }
}

/// Known ufw error messages and their translations
pub struct UfwErrorPattern;

impl UfwErrorPattern {
    /// Matches an error message against known patterns and returns a user-friendly translation.
    pub fn match_error(msg: &str) -> ErrorTranslation {
        let lower = msg.to_lowercase();

        if lower.contains("need to be root") || lower.contains("permission denied") {
            return ErrorTranslation::new("Insufficient permissions to modify firewall rules")
                .with_suggestion("Run rufw as root, or install sudo, run0 or pkexec")
                .with_suggestion("Force an elevation method with RUFW_ELEVATION_METHOD=sudo")
                .with_help("https://manpages.ubuntu.com/manpages/noble/man8/ufw.8.html");
        }

        if lower.contains("command not found") || lower.contains("no such file") {
            return ErrorTranslation::new("ufw is not installed or not found in PATH")
                .with_suggestion("Install ufw: sudo apt install ufw  (Debian/Ubuntu)")
                .with_suggestion("Or: sudo dnf install ufw  (Fedora)")
                .with_suggestion("Or: sudo pacman -S ufw  (Arch)")
                .with_suggestion("Or point rufw at it: rufw config --ufw-command /path/to/ufw");
        }

        if lower.contains("could not get lock") {
            return ErrorTranslation::new("Another ufw process holds the lock")
                .with_suggestion("Wait for the other ufw command to finish and try again");
        }

        if lower.contains("invalid position") {
            return ErrorTranslation::new("Insert position is out of range")
                .with_suggestion("The listing changed since it was loaded")
                .with_suggestion("Refresh with `rufw list` and pick the row again");
        }

        if lower.contains("could not delete non-existent rule")
            || lower.contains("could not find rule")
        {
            return ErrorTranslation::new("Rule not found")
                .with_suggestion("The listing changed since it was loaded")
                .with_suggestion("Refresh with `rufw list` and pick the row again");
        }

        if lower.contains("bad port") || lower.contains("port ranges must") {
            return ErrorTranslation::new("Invalid port or port range")
                .with_suggestion("Port numbers must be between 1 and 65535")
                .with_suggestion("Port ranges use a colon and need a protocol: 8000:9000 with tcp")
                .with_suggestion("Example valid ports: 22, 80,443, 8000:9000");
        }

        if lower.contains("bad source address")
            || lower.contains("bad destination address")
            || lower.contains("invalid address")
        {
            return ErrorTranslation::new("Invalid IP address or network")
                .with_suggestion("Use proper IP format: 192.168.1.1 or 192.168.1.0/24")
                .with_suggestion("For IPv6: 2001:db8::1 or 2001:db8::/32")
                .with_help("https://en.wikipedia.org/wiki/Classless_Inter-Domain_Routing");
        }

        if lower.contains("interface") {
            return ErrorTranslation::new("Network interface clause is invalid")
                .with_suggestion("Check available interfaces: rufw interfaces")
                .with_suggestion("Forward rules need both an inbound and an outbound interface")
                .with_suggestion("Interface names are case-sensitive and max 15 chars");
        }

        if lower.contains("invalid route syntax") {
            return ErrorTranslation::new("Invalid routed rule")
                .with_suggestion("Routed rules take the form: route allow in on eth0 out on eth1")
                .with_suggestion("Check that IP forwarding is enabled in /etc/default/ufw");
        }

        if lower.contains("skipping") && lower.contains("existing rule") {
            return ErrorTranslation::new("An identical rule already exists")
                .with_suggestion("Edit the existing rule instead of adding a new one");
        }

        if lower.contains("syntax")
            || lower.contains("invalid token")
            || lower.contains("need 'to' or 'from'")
        {
            return ErrorTranslation::new("Invalid firewall rule syntax")
                .with_suggestion("Check your rule for typos")
                .with_suggestion("Protocol can only be tcp or udp when a port is set")
                .with_help("https://manpages.ubuntu.com/manpages/noble/man8/ufw.8.html");
        }

        if lower.contains("iptables") || lower.contains("ip6tables") {
            return ErrorTranslation::new("ufw could not drive the kernel packet filter")
                .with_suggestion("Check that iptables (or iptables-nft) is installed")
                .with_suggestion("Check kernel modules: lsmod | grep -e ip_tables -e nf_tables");
        }

        ErrorTranslation::new(format!("Firewall error: {msg}"))
            .with_suggestion("Check the detailed error message for more information")
            .with_suggestion("Verify ufw is working: sudo ufw status verbose")
    }
}

impl Error {
    /// Translation of the message the operator should see
    pub fn translate(&self) -> ErrorTranslation {
        match self {
            Self::Ufw {
                message, stderr, ..
            } => UfwErrorPattern::match_error(stderr.as_deref().unwrap_or(message)),
            Self::Elevation(msg) => UfwErrorPattern::match_error(msg),
            other => ErrorTranslation::new(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn ufw_error(stderr: &str) -> Error {
        Error::Ufw {
            message: "ufw exited with status 1".to_string(),
            stderr: Some(stderr.to_string()),
            exit_code: Some(1),
        }
    }

    #[test]
    fn test_ufw_missing_command() {
        let translation = UfwErrorPattern::match_error("sh: 1: ufw: command not found");
        assert!(translation.user_message.contains("not installed"));
        assert!(translation.suggestions.len() >= 3);
    }

    #[test]
    fn test_ufw_needs_root() {
        let translation = UfwErrorPattern::match_error("ERROR: You need to be root to run this script");
        assert!(translation.user_message.contains("permissions"));
        assert!(translation.help_url.is_some());
    }

    #[test]
    fn test_ufw_invalid_position() {
        let translation = UfwErrorPattern::match_error("ERROR: Invalid position '9'");
        assert!(translation.user_message.contains("position"));
        assert!(translation.suggestions.iter().any(|s| s.contains("rufw list")));
    }

    #[test]
    fn test_ufw_bad_port() {
        let translation = UfwErrorPattern::match_error("ERROR: Bad port");
        assert!(translation.suggestions.iter().any(|s| s.contains("65535")));
    }

    #[test]
    fn test_ufw_existing_rule() {
        let translation = UfwErrorPattern::match_error("Skipping adding existing rule");
        assert!(translation.user_message.contains("already exists"));
    }

    #[test]
    fn test_translate_prefers_stderr() {
        let translation = ufw_error("ERROR: Bad destination address").translate();
        assert!(translation.user_message.contains("IP address"));
    }

    #[test]
    fn test_replacement_lost_names_deleted_row() {
        let err = MutationError::ReplacementLost {
            row: 2,
            deleted: "[2] 10.0.0.1/tcp 22 ALLOW-IN Anywhere".to_string(),
            source: ufw_error("ERROR: Invalid position '2'"),
        };
        let msg = err.to_string();
        assert!(msg.contains("re-add it manually"));
        assert!(msg.contains("10.0.0.1/tcp 22 ALLOW-IN"));
        assert!(err.firewall_changed());
        assert!(matches!(err.cause(), Some(Error::Ufw { .. })));
    }

    #[test]
    fn test_source_port_refusal_runs_nothing() {
        let err = MutationError::SourcePortUnsupported {
            row: 3,
            port: "53/udp".to_string(),
        };
        assert!(err.to_string().contains("53/udp"));
        assert!(!err.firewall_changed());
        assert!(err.cause().is_none());
    }

    #[test]
    fn test_rejected_leaves_firewall_unchanged() {
        let err = MutationError::Rejected(ufw_error("ERROR: Bad port"));
        assert!(!err.firewall_changed());
        assert!(err.to_string().starts_with("Rule rejected"));
    }
}
