//! Scenario tests for the full rotation lifecycle.
//!
//! These tests drive a complete `App` against a temp server directory with a
//! fake host, simulating host restarts by calling the startup hooks the way
//! a real host would:
//! - Commands, confirmation and expiry
//! - Death-triggered rotations and re-entrant death events
//! - Consecutive rotations, backups and deletes across restarts
//!
//! # Running
//!
//! ```bash
//! cargo test -p worldcycle-engine --lib e2e_tests
//! ```

mod e2e_helpers;

pub use e2e_helpers::*;
