//! In-memory state storage modules.
//!
//! Stores manage runtime state that is never persisted:
//! - `ConfirmationRegistry` - per-actor pending confirmations
//! - `ProcessingGuard` - single-slot flag for the terminate operation
//! - `WorldClock` - start record of the loaded world instance

pub mod confirmation;
pub mod processing_guard;
pub mod world_clock;

// Re-export store types
pub use confirmation::ConfirmationRegistry;
pub use processing_guard::{ProcessingGuard, ProcessingPermit};
pub use world_clock::WorldClock;
