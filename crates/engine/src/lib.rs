//! worldcycle engine library.
//!
//! Orchestrates the rotation of a game server's world instance: confirmation
//! gated commands, terminating occupants, planning the successor instance and
//! retiring the old one on the next start.
//!
//! ## Structure
//!
//! - `stores/` - In-memory state (confirmations, processing guard, world clock)
//! - `use_cases/` - One operation per module, wired together by `App`
//! - `infrastructure/` - Ports to the host plus file-backed adapters
//! - `app` - Application composition and entry points

pub mod app;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

/// Shared fakes for unit and scenario tests.
#[cfg(test)]
pub mod test_fixtures;

/// Scenario tests driving `App` against a temp server directory.
#[cfg(test)]
mod e2e_tests;

pub use app::{App, CommandOutcome, ConfirmOutcome, DeathOutcome};
