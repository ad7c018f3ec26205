/// Audit logging for commands that change the firewall
///
/// Every validate, delete, apply, enable, disable and reset command is
/// appended to `audit.log` in the state directory as one JSON object per line.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Types of auditable events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ValidateRule,
    DeleteRule,
    ApplyRule,
    EnableFirewall,
    DisableFirewall,
    ResetRules,
}

/// A single audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Type of event
    pub event_type: EventType,

    /// Whether the operation succeeded
    pub success: bool,

    /// Additional structured data about the event
    pub details: serde_json::Value,

    /// Error message if operation failed
    pub error: Option<String>,
}

impl AuditEvent {
    /// Creates a new audit event
    pub fn new(
        event_type: EventType,
        success: bool,
        details: serde_json::Value,
        error: Option<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            event_type,
            success,
            details,
            error,
        }
    }

    /// Event for one external command
    pub fn command(event_type: EventType, command: &str, error: Option<String>) -> Self {
        Self::new(
            event_type,
            error.is_none(),
            serde_json::json!({ "command": command }),
            error,
        )
    }
}

/// Audit log writer
#[derive(Debug, Clone)]
pub struct AuditLog {
    log_path: PathBuf,
}

impl AuditLog {
    /// Creates an audit log in the state directory
    ///
    /// # Errors
    ///
    /// Returns `Err` if state directory cannot be determined
    pub fn new() -> std::io::Result<Self> {
        let mut log_path = crate::utils::get_state_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "State directory not found")
        })?;
        log_path.push("audit.log");

        Ok(Self { log_path })
    }

    /// Creates an audit log writing to an explicit file
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: path.into(),
        }
    }

    /// Appends an event to the audit log
    ///
    /// # Errors
    ///
    /// Returns `Err` if file cannot be opened or written
    pub async fn log(&self, event: AuditEvent) -> std::io::Result<()> {
        let json = serde_json::to_string(&event)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.sync_all().await?;

        Ok(())
    }

    /// Appends an event, logging instead of failing when the write fails
    pub async fn record(&self, event: AuditEvent) {
        if let Err(e) = self.log(event).await {
            tracing::warn!("Failed to write audit log: {}", e);
        }
    }

    /// Reads the most recent events from the log, newest first
    ///
    /// # Errors
    ///
    /// Returns `Err` if file cannot be read
    pub async fn read_recent(&self, count: usize) -> std::io::Result<Vec<AuditEvent>> {
        let content = tokio::fs::read_to_string(&self.log_path).await?;

        let events: Vec<AuditEvent> = content
            .lines()
            .rev()
            .take(count)
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();

        Ok(events)
    }

    /// Returns the path to the audit log file
    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_log(name: &str) -> AuditLog {
        let path = std::env::temp_dir().join(format!(
            "rufw-audit-{name}-{}.log",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        AuditLog::at(path)
    }

    #[test]
    fn test_command_event_success_follows_error() {
        let ok = AuditEvent::command(EventType::ApplyRule, "ufw allow 22", None);
        assert!(ok.success);
        assert_eq!(ok.details["command"], "ufw allow 22");

        let failed = AuditEvent::command(
            EventType::ValidateRule,
            "ufw --dry-run allow 99999",
            Some("ERROR: Bad port".to_string()),
        );
        assert!(!failed.success);
    }

    #[test]
    fn test_event_serialization() {
        let event = AuditEvent::command(
            EventType::DeleteRule,
            "ufw --force delete 3",
            Some("ERROR: Could not find rule '3'".to_string()),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("delete_rule"));
        assert!(json.contains("Could not find rule"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"timestamp":"2024-01-01T00:00:00Z","event_type":"reset_rules","success":true,"details":{},"error":null}"#;
        let event: AuditEvent = serde_json::from_str(json).unwrap();

        assert!(event.success);
        assert_eq!(event.event_type, EventType::ResetRules);
    }

    #[tokio::test]
    async fn test_log_appends_json_lines() {
        let log = scratch_log("append");
        log.record(AuditEvent::command(EventType::EnableFirewall, "ufw --force enable", None))
            .await;
        log.record(AuditEvent::command(EventType::DisableFirewall, "ufw --force disable", None))
            .await;

        let recent = log.read_recent(5).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event_type, EventType::DisableFirewall);
        assert_eq!(recent[1].event_type, EventType::EnableFirewall);

        let _ = std::fs::remove_file(log.path());
    }

    #[tokio::test]
    async fn test_record_swallows_write_errors() {
        let log = AuditLog::at("/nonexistent-rufw-dir/audit.log");
        log.record(AuditEvent::command(EventType::ResetRules, "ufw --force reset", None))
            .await;
        assert!(log.read_recent(1).await.is_err());
    }
}
