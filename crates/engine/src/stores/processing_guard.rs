//! Process-wide "terminate in progress" flag.

use std::sync::atomic::{AtomicBool, Ordering};

/// Single-slot test-and-set guard.
///
/// Killing occupants raises death events that call straight back into the
/// orchestrator; while a permit is alive those re-entrant calls are refused.
#[derive(Debug, Default)]
pub struct ProcessingGuard {
    held: AtomicBool,
}

impl ProcessingGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the slot, or `None` if someone already holds it.
    pub fn try_acquire(&self) -> Option<ProcessingPermit<'_>> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ProcessingPermit { guard: self })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Releases the guard when dropped, including during unwinding.
#[derive(Debug)]
pub struct ProcessingPermit<'a> {
    guard: &'a ProcessingGuard,
}

impl Drop for ProcessingPermit<'_> {
    fn drop(&mut self) {
        self.guard.held.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::Arc;

    #[test]
    fn second_acquire_fails_while_held() {
        let guard = ProcessingGuard::new();
        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.is_held());
        assert!(guard.try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_held());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn released_on_panic() {
        let guard = ProcessingGuard::new();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let _permit = guard.try_acquire();
            panic!("occupant blew up");
        }));
        assert!(result.is_err());
        assert!(!guard.is_held());
    }

    #[test]
    fn only_one_thread_wins() {
        let guard = Arc::new(ProcessingGuard::new());
        let barrier = Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    let permit = guard.try_acquire();
                    let won = permit.is_some();
                    // Hold until everyone has tried
                    barrier.wait();
                    won
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
