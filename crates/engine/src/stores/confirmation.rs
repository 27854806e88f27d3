//! Per-actor confirmation tokens for destructive commands.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use worldcycle_domain::{ActorId, PendingAction, PendingConfirmation};

use crate::infrastructure::ports::ClockPort;

/// Pending confirmations keyed by actor.
///
/// A new request replaces any earlier one from the same actor. Expired
/// entries are not swept; they are dropped on the next confirm or request.
pub struct ConfirmationRegistry {
    pending: DashMap<ActorId, PendingConfirmation>,
    clock: Arc<dyn ClockPort>,
}

impl ConfirmationRegistry {
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            pending: DashMap::new(),
            clock,
        }
    }

    /// Record a pending action and return when it expires. Expiry saturates
    /// at the latest representable instant.
    pub fn request(&self, actor: ActorId, action: PendingAction, timeout: Duration) -> DateTime<Utc> {
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(timeout)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.pending
            .insert(actor, PendingConfirmation { action, expires_at });
        expires_at
    }

    /// Remove the actor's token; returns its action only if it had not expired.
    pub fn take(&self, actor: ActorId) -> Option<PendingAction> {
        let (_, pending) = self.pending.remove(&actor)?;
        pending
            .is_live(self.clock.now())
            .then_some(pending.action)
    }

    pub fn confirm(&self, actor: ActorId) -> bool {
        self.take(actor).is_some()
    }

    pub fn is_pending(&self, actor: ActorId) -> bool {
        self.pending.contains_key(&actor)
    }
}
