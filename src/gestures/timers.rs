//! Deadline timers owned by the gesture engine.
//!
//! The engine never sleeps. A timer is just an optional deadline that the
//! owner polls with the current time, so cancelling is a plain state change
//! and a stale deadline can never fire against a newer gesture.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    deadline_ms: Option<u64>,
}

impl Timer {
    /// Arms the timer, replacing any pending deadline.
    pub fn schedule(&mut self, now_ms: u64, after_ms: u64) {
        self.deadline_ms = Some(now_ms.saturating_add(after_ms));
    }

    /// Returns whether a deadline was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline_ms.take().is_some()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Fires at most once per schedule: disarms and returns true when due.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.deadline_ms {
            Some(d) if now_ms >= d => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_at_deadline() {
        let mut t = Timer::default();
        t.schedule(100, 50);
        assert!(!t.poll(149));
        assert!(t.poll(150));
        assert!(!t.poll(500));
        assert_eq!(t.deadline(), None);
    }

    #[test]
    fn reschedule_replaces_deadline() {
        let mut t = Timer::default();
        t.schedule(0, 500);
        t.schedule(300, 500);
        assert!(!t.poll(600));
        assert_eq!(t.deadline(), Some(800));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut t = Timer::default();
        t.schedule(0, 10);
        assert!(t.cancel());
        assert!(!t.cancel());
        assert!(!t.poll(1_000));
    }
}
