//! Core rule handling for ufw
//!
//! This module turns `ufw status numbered` output into typed rules and typed
//! rules back into ufw command lines. It provides:
//!
//! - [`rule`]: Rule, endpoint and action types shared by every stage
//! - [`fields`]: Micro-parsers for protocol, port and interface fragments
//! - [`listing`]: Raw listing line to canonical row normalization
//! - [`decode`]: Canonical row to [`rule::Rule`] decoding
//! - [`synth`]: Edit form to validate/apply command synthesis
//! - [`runner`]: Execution seam for external commands
//! - [`session`]: The validate, delete, apply sequence against a live firewall
//! - [`error`]: Error types for rule operations

pub mod decode;
pub mod error;
pub mod fields;
pub mod listing;
pub mod rule;
pub mod runner;
pub mod session;
pub mod synth;

#[cfg(test)]
pub mod test_helpers;
