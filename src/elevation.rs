//! Privilege elevation for ufw commands
//!
//! ufw refuses to run unless it is root. rufw runs as the invoking user and
//! elevates each external command individually.
//!
//! # Elevation Strategy
//!
//! - **Preferred**: `run0` when available (systemd v256+, no SUID)
//! - **Terminal fallback**: `sudo`
//! - **No terminal**: `pkexec`
//!
//! # Environment Variables
//!
//! - `RUFW_ELEVATION_METHOD`: Force a specific elevation method (`sudo`, `run0`, or `pkexec`).
//!   Useful with sudoers NOPASSWD rules, e.g.
//!   `RUFW_ELEVATION_METHOD=sudo rufw delete --yes 3`
//!
//! - `RUFW_TEST_NO_ELEVATION`: Bypass elevation entirely (for testing only).
//!
//! # Example
//!
//! ```no_run
//! use rufw::elevation::create_elevated_shell_command;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut cmd = create_elevated_shell_command("ufw status numbered")?;
//! let output = cmd.output().await?;
//! # Ok(())
//! # }
//! ```

use std::io;
use tokio::process::Command;

/// Error type for privilege elevation operations
#[derive(Debug, thiserror::Error)]
pub enum ElevationError {
    /// pkexec binary not found in PATH
    #[error("pkexec not found - please install PolicyKit or run from a terminal")]
    PkexecNotFound,

    /// Requested elevation method is not available (binary not found)
    #[error("Elevation method '{0}' is not available (binary not found)")]
    MethodNotAvailable(String),

    /// Invalid value for `RUFW_ELEVATION_METHOD`
    #[error("Invalid RUFW_ELEVATION_METHOD '{0}'. Valid options: sudo, run0, pkexec")]
    InvalidMethod(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Elevation wrappers rufw knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum Method {
    Sudo,
    Run0,
    Pkexec,
}

fn binary_exists(name: &str) -> bool {
    std::env::var_os("PATH")
        .and_then(|paths| {
            std::env::split_paths(&paths).find_map(|dir| {
                let full_path = dir.join(name);
                full_path.is_file().then_some(full_path)
            })
        })
        .is_some()
}

fn wrapped(method: Method, program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(method.as_ref());
    cmd.arg(program).args(args);
    cmd
}

fn direct(program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd
}

fn build_elevated_command(program: &str, args: &[&str]) -> Result<Command, ElevationError> {
    use std::os::fd::AsFd;

    if std::env::var("RUFW_TEST_NO_ELEVATION").is_ok() {
        return Ok(direct(program, args));
    }

    if nix::unistd::getuid().is_root() {
        return Ok(direct(program, args));
    }

    if let Ok(requested) = std::env::var("RUFW_ELEVATION_METHOD")
        && !requested.is_empty()
    {
        let method: Method = requested
            .parse()
            .map_err(|_| ElevationError::InvalidMethod(requested.to_lowercase()))?;
        if !binary_exists(method.as_ref()) {
            return Err(ElevationError::MethodNotAvailable(method.as_ref().into()));
        }
        return Ok(wrapped(method, program, args));
    }

    if binary_exists("run0") {
        return Ok(wrapped(Method::Run0, program, args));
    }

    let is_atty = nix::unistd::isatty(std::io::stdin().as_fd()).unwrap_or(false);
    if is_atty {
        Ok(wrapped(Method::Sudo, program, args))
    } else if binary_exists("pkexec") {
        Ok(wrapped(Method::Pkexec, program, args))
    } else {
        Err(ElevationError::PkexecNotFound)
    }
}

/// Creates an elevated `sh -c <command_line>` command
///
/// ufw commands are produced as complete command lines (including the quoted
/// comment clause), so they are handed to a shell rather than split into an
/// argument vector here.
///
/// # Security
///
/// The command line is interpreted by `sh`. Callers must only pass lines
/// built by the command synthesizer, whose only free text (the comment) is
/// single-quoted with embedded quotes escaped.
///
/// # Testing
///
/// Set `RUFW_TEST_NO_ELEVATION=1` to run the shell directly.
pub fn create_elevated_shell_command(command_line: &str) -> Result<Command, ElevationError> {
    build_elevated_command("sh", &["-c", command_line])
}
