//! Operator actions against the live firewall
//!
//! A [`Session`] pairs a [`CommandRunner`] with a [`CommandBuilder`] and runs
//! every mutation through the same sequence:
//!
//! 1. run the dry-run command; stop on failure
//! 2. when replacing a row, delete it; stop on failure
//! 3. run the real command
//!
//! Nothing is rolled back. If step 3 fails after step 2 succeeded, the
//! deleted row's canonical text is returned in
//! [`MutationError::ReplacementLost`] so it can be re-added by hand.
//!
//! Row numbers are only meaningful against the [`Listing`] they were read
//! from, so replacements take that listing explicitly. Callers must not
//! start a second mutation against the same listing while one is running.

use crate::audit::{AuditEvent, AuditLog, EventType};
use crate::core::error::{MutationError, Result};
use crate::core::listing::{CanonicalRow, Listing, ParsedLine};
use crate::core::runner::{CommandOutput, CommandRunner};
use crate::core::synth::{CommandBuilder, CommandPair, FormInput, UfwCommand};
use tracing::{info, warn};

/// Result of a create or replace that ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub commands: CommandPair,
    /// Row removed before the replacement was applied
    pub deleted: Option<CanonicalRow>,
    /// What ufw printed for the real command
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The form selected no traffic; no command was run
    Skipped,
    Applied(Applied),
}

pub struct Session<R> {
    runner: R,
    commands: CommandBuilder,
    audit: Option<AuditLog>,
}

impl<R: CommandRunner> Session<R> {
    pub fn new(runner: R, commands: CommandBuilder) -> Self {
        Self {
            runner,
            commands,
            audit: None,
        }
    }

    /// Records every mutating command in `audit`
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn commands(&self) -> &CommandBuilder {
        &self.commands
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs one command, turning a failed exit into an error and auditing it
    async fn execute(&self, event: Option<EventType>, command: &UfwCommand) -> Result<CommandOutput> {
        let result = match self.runner.run(command.as_str()).await {
            Ok(output) => output.into_result(),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            warn!("Command failed: {command}: {e}");
        }

        if let (Some(audit), Some(event)) = (&self.audit, event) {
            let error = result.as_ref().err().map(ToString::to_string);
            audit
                .record(AuditEvent::command(event, command.as_str(), error))
                .await;
        }

        result
    }

    /// Fetches and parses `ufw status numbered`
    pub async fn load_listing(&self) -> Result<Listing> {
        let output = self.execute(None, &self.commands.status()).await?;
        let listing = Listing::from_output(&output.stdout);
        info!(
            rows = listing.len(),
            v6 = listing.v6_count,
            active = listing.active,
            "Loaded listing"
        );
        Ok(listing)
    }

    /// Fresh listing filtered by a case-insensitive regular expression
    pub async fn search(&self, pattern: &str) -> Result<Vec<ParsedLine>> {
        let listing = self.load_listing().await?;
        Ok(listing.search(pattern)?.into_iter().cloned().collect())
    }

    /// Validates then applies a form as a new rule (or an insert when the
    /// form carries a position)
    ///
    /// # Errors
    ///
    /// [`MutationError::Rejected`] if the dry run fails,
    /// [`MutationError::ApplyFailed`] if the real command fails.
    pub async fn create_rule(
        &self,
        form: &FormInput,
    ) -> std::result::Result<MutationOutcome, MutationError> {
        let Some(commands) = self.commands.rule(form) else {
            info!("Form selects no traffic, nothing to do");
            return Ok(MutationOutcome::Skipped);
        };

        self.execute(Some(EventType::ValidateRule), &commands.validate)
            .await
            .map_err(MutationError::Rejected)?;

        let output = self
            .execute(Some(EventType::ApplyRule), &commands.apply)
            .await
            .map_err(MutationError::ApplyFailed)?;

        info!("Rule created: {}", commands.apply);
        Ok(MutationOutcome::Applied(Applied {
            commands,
            deleted: None,
            output: output.stdout,
        }))
    }

    /// Replaces row `row` of `listing` with `form`
    ///
    /// The insert position comes from the listing: rows that can be replaced
    /// in place are re-inserted at the same number, the rest are appended.
    /// Any position already set on `form` is ignored.
    ///
    /// # Errors
    ///
    /// - [`MutationError::UnknownRow`] if `row` is not in `listing`
    /// - [`MutationError::SourcePortUnsupported`] if `row` matches a source port
    /// - [`MutationError::Rejected`] if the dry run fails
    /// - [`MutationError::DeleteFailed`] if the old row could not be deleted
    /// - [`MutationError::ReplacementLost`] if the new rule failed after the
    ///   old one was deleted
    pub async fn replace_rule(
        &self,
        listing: &Listing,
        row: usize,
        form: &FormInput,
    ) -> std::result::Result<MutationOutcome, MutationError> {
        let old = listing.editable_line(row)?;

        let form = FormInput {
            position: listing.insert_position(row),
            ..form.clone()
        };
        let Some(commands) = self.commands.rule(&form) else {
            info!("Form selects no traffic, leaving rule {row} untouched");
            return Ok(MutationOutcome::Skipped);
        };

        self.execute(Some(EventType::ValidateRule), &commands.validate)
            .await
            .map_err(MutationError::Rejected)?;

        self.execute(Some(EventType::DeleteRule), &self.commands.delete(row))
            .await
            .map_err(|source| MutationError::DeleteFailed { row, source })?;

        let output = self
            .execute(Some(EventType::ApplyRule), &commands.apply)
            .await
            .map_err(|source| {
                warn!("Rule {row} deleted but replacement failed: {}", old.row);
                MutationError::ReplacementLost {
                    row,
                    deleted: old.row.to_string(),
                    source,
                }
            })?;

        info!("Rule {row} replaced: {}", commands.apply);
        Ok(MutationOutcome::Applied(Applied {
            commands,
            deleted: Some(old.row.clone()),
            output: output.stdout,
        }))
    }

    /// Deletes row `row` without prompting
    pub async fn delete_rule(&self, row: usize) -> Result<CommandOutput> {
        self.execute(Some(EventType::DeleteRule), &self.commands.delete(row))
            .await
    }

    pub async fn enable(&self) -> Result<CommandOutput> {
        self.execute(Some(EventType::EnableFirewall), &self.commands.enable())
            .await
    }

    pub async fn disable(&self) -> Result<CommandOutput> {
        self.execute(Some(EventType::DisableFirewall), &self.commands.disable())
            .await
    }

    /// Removes every rule and disables the firewall
    pub async fn reset(&self) -> Result<CommandOutput> {
        self.execute(Some(EventType::ResetRules), &self.commands.reset())
            .await
    }
}
