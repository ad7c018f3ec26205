//! RUFW - Rust front end for ufw
//!
//! An operator console for the Uncomplicated Firewall: browse, search, add,
//! edit and delete rules without hand-writing ufw command lines.
//!
//! # Architecture
//!
//! - [`core`] - Listing parser, rule decoder, command synthesizer and the
//!   mutation session that drives ufw
//! - [`audit`] - Audit logging for every command that changes the firewall
//! - [`validators`] - Input validation for edit forms
//! - [`config`] - Configuration persistence
//! - [`elevation`] - Privilege escalation for ufw commands
//! - [`utils`] - Utility functions (XDG directories, network interfaces)
//!
//! # Safety Features
//!
//! - Every rule is dry-run (`ufw --dry-run`) before it is applied
//! - Replacements delete the old row only after the new one validates
//! - A failed replacement reports the deleted row so it can be restored
//! - Input validation before any command is built

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]

pub mod audit;
pub mod config;
pub mod core;
pub mod elevation;
pub mod utils;
pub mod validators;

// Re-export commonly used types
pub use core::error::{Error, MutationError, Result};
pub use core::listing::{CanonicalRow, Listing};
pub use core::rule::{Action, Direction, Protocol, Rule, Verb};
pub use core::session::{MutationOutcome, Session};
pub use core::synth::{CommandBuilder, CommandPair, FormInput};
