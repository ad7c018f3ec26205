//! Utility functions for directory management and system integration
//!
//! This module provides helper functions following the XDG Base Directory specification
//! for portable configuration and data storage across Linux distributions.
//!
//! # Directory Structure
//!
//! - Data: `~/.local/share/rufw/` - Configuration (`config.json`)
//! - State: `~/.local/state/rufw/` - Log file and audit log
//!
//! # Example
//!
//! ```no_run
//! use rufw::utils::{ensure_dirs, get_state_dir};
//!
//! ensure_dirs().expect("Failed to create directories");
//!
//! if let Some(state) = get_state_dir() {
//!     println!("audit log: {}", state.join("audit.log").display());
//! }
//! ```

use directories::ProjectDirs;
use network_interface::{NetworkInterface, NetworkInterfaceConfig};
use std::path::PathBuf;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "rufw", "rufw")
}

pub fn get_data_dir() -> Option<PathBuf> {
    project_dirs().map(|pd| pd.data_dir().to_path_buf())
}

pub fn get_state_dir() -> Option<PathBuf> {
    project_dirs().and_then(|pd| pd.state_dir().map(std::path::Path::to_path_buf))
}

pub fn ensure_dirs() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::fs::DirBuilder;
        use std::os::unix::fs::DirBuilderExt;

        let mut builder = DirBuilder::new();
        builder.mode(0o700); // User read/write/execute only
        builder.recursive(true);

        if let Some(dir) = get_data_dir() {
            builder.create(dir)?;
        }
        if let Some(dir) = get_state_dir() {
            builder.create(dir)?;
        }
    }

    #[cfg(not(unix))]
    {
        if let Some(dir) = get_data_dir() {
            std::fs::create_dir_all(dir)?;
        }
        if let Some(dir) = get_state_dir() {
            std::fs::create_dir_all(dir)?;
        }
    }

    Ok(())
}

/// Interface names for edit forms, with the empty "any interface" choice first.
///
/// Names come from the OS in enumeration order, de-duplicated (an interface
/// with both IPv4 and IPv6 addresses is reported once per address).
pub fn known_interfaces() -> Vec<String> {
    let names = match NetworkInterface::show() {
        Ok(found) => found.into_iter().map(|iface| iface.name).collect(),
        Err(e) => {
            tracing::warn!("Interface enumeration failed, reading /sys/class/net: {}", e);
            sysfs_interfaces()
        }
    };
    with_any_choice(names)
}

fn sysfs_interfaces() -> Vec<String> {
    let mut interfaces: Vec<String> = std::fs::read_dir("/sys/class/net")
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|entry| entry.file_name().into_string().ok())
                .collect()
        })
        .unwrap_or_default();
    interfaces.sort();
    interfaces
}

fn with_any_choice(names: Vec<String>) -> Vec<String> {
    let mut out = vec![String::new()];
    for name in names {
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// Truncates a string to a maximum length and adds an ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let keep = max_len.saturating_sub(3);
        let truncated: String = s.chars().take(keep).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_choice_first_and_deduplicated() {
        let names = vec![
            "lo".to_string(),
            "eth0".to_string(),
            "eth0".to_string(),
            "wlan0".to_string(),
            "lo".to_string(),
        ];
        assert_eq!(with_any_choice(names), vec!["", "lo", "eth0", "wlan0"]);
    }

    #[test]
    fn test_known_interfaces_starts_with_any() {
        let known = known_interfaces();
        assert_eq!(known.first().map(String::as_str), Some(""));
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("a long comment here", 10), "a long ...");
        assert_eq!(truncate_string("ünïcödé text", 8), "ünïcö...");
    }
}
