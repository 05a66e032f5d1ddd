//! Timer scheduling for the interaction state machine.
//!
//! The engine never sleeps or spawns. It asks a [`Scheduler`] to call it back
//! after a delay and receives the callback through
//! [`DrawingEngine::handle_timer`](crate::DrawingEngine::handle_timer). Hosts
//! plug in their own event loop; tests and trace replay use the virtual clock
//! of [`ManualScheduler`].

use std::collections::BTreeMap;

/// Handle for a scheduled timer, unique per scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(pub u64);

/// What a timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Press held long enough to count as a tap.
    TapTimeout,
    /// Regenerate the live preview.
    PreviewFrame,
}

/// Source of delayed callbacks.
pub trait Scheduler {
    /// Arrange for `task` to be delivered `delay_ms` after `now_ms`.
    fn schedule(&mut self, now_ms: u64, delay_ms: u64, task: TimerTask) -> TimerHandle;

    /// Cancel a pending timer. Returns `false` if it already fired or was
    /// never scheduled.
    fn cancel(&mut self, handle: TimerHandle) -> bool;
}

/// A due timer returned by [`ManualScheduler::advance_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    /// Handle given out at scheduling time.
    pub handle: TimerHandle,
    /// What the timer is for.
    pub task: TimerTask,
    /// Virtual time it was due at.
    pub due_ms: u64,
}

/// Deterministic scheduler driven by an explicit virtual clock.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    next_handle: u64,
    now_ms: u64,
    // Keyed by (due time, handle) so ties fire in scheduling order.
    pending: BTreeMap<(u64, TimerHandle), TimerTask>,
}

impl ManualScheduler {
    /// Create a scheduler at virtual time 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Number of timers still pending.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Due time of the earliest pending timer.
    #[must_use]
    pub fn next_due(&self) -> Option<u64> {
        self.pending.keys().next().map(|(due, _)| *due)
    }

    /// Move the clock forward and take every timer due at or before `now_ms`,
    /// earliest first. The clock never moves backwards.
    pub fn advance_to(&mut self, now_ms: u64) -> Vec<FiredTimer> {
        self.now_ms = self.now_ms.max(now_ms);
        let later = self.pending.split_off(&(self.now_ms + 1, TimerHandle(0)));
        let due = std::mem::replace(&mut self.pending, later);
        due.into_iter()
            .map(|((due_ms, handle), task)| FiredTimer {
                handle,
                task,
                due_ms,
            })
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, now_ms: u64, delay_ms: u64, task: TimerTask) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.pending
            .insert((now_ms.saturating_add(delay_ms), handle), task);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        let key = self.pending.keys().find(|(_, h)| *h == handle).copied();
        key.is_some_and(|key| self.pending.remove(&key).is_some())
    }
}
