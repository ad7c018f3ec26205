//! Shared test utilities for core module tests
//!
//! This module is only compiled in test mode.

use crate::core::error::Result;
use crate::core::runner::{CommandOutput, CommandRunner};
use crate::core::session::Session;
use crate::core::synth::CommandBuilder;
use std::sync::Mutex;

/// Mutex for tests that need exclusive access to environment variables.
///
/// # Example
///
/// ```ignore
/// let _guard = ENV_VAR_MUTEX.lock().unwrap();
/// unsafe {
///     std::env::remove_var("RUFW_TEST_NO_ELEVATION");
///     std::env::set_var("RUFW_ELEVATION_METHOD", "sudo");
/// }
/// // ... test with custom env state ...
/// unsafe {
///     std::env::set_var("RUFW_TEST_NO_ELEVATION", "1");
///     std::env::remove_var("RUFW_ELEVATION_METHOD");
/// }
/// ```
pub static ENV_VAR_MUTEX: Mutex<()> = Mutex::new(());

/// `ufw status numbered` output with three IPv4 rows and one IPv6 row
pub const STATUS_WITH_V6: &str = "Status: active

     To                         Action      From
     --                         ------      ----
[ 1] 22/tcp                     ALLOW IN    Anywhere                   # SSH
[ 2] 192.168.0.1 80/tcp         DENY IN     10.0.0.0/8
[ 3] 8.8.8.8 53/udp             DENY OUT    Anywhere                   (out)
[ 4] 22/tcp (v6)                ALLOW IN    Anywhere (v6)              # SSH
";

/// Command runner that records every command line instead of running it.
///
/// Commands succeed unless they contain a substring registered with
/// [`fail_on`](Self::fail_on). `status` commands print the configured listing.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    log: Mutex<Vec<String>>,
    failures: Vec<(String, String)>,
    status: String,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails any command containing `pattern`, printing `stderr`
    pub fn fail_on(mut self, pattern: &str, stderr: &str) -> Self {
        self.failures.push((pattern.to_string(), stderr.to_string()));
        self
    }

    pub fn with_status(mut self, output: &str) -> Self {
        self.status = output.to_string();
        self
    }

    /// Command lines run so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        self.log.lock().unwrap().push(command.to_string());

        if let Some((_, stderr)) = self.failures.iter().find(|(p, _)| command.contains(p.as_str())) {
            return Ok(CommandOutput::failed(stderr.clone(), 1));
        }
        if command.ends_with("status numbered") {
            return Ok(CommandOutput::ok(self.status.clone()));
        }
        Ok(CommandOutput::ok("Rules updated\n"))
    }
}

/// Session over `runner` using the default `ufw` command name
pub fn session_with(runner: RecordingRunner) -> Session<RecordingRunner> {
    Session::new(runner, CommandBuilder::default())
}
