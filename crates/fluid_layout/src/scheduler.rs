//! Trailing-edge coalescing of resize notifications.

use std::time::{Duration, Instant};

/// Coalesces bursts of resize notifications into one trailing pass.
///
/// Each request re-arms the deadline `debounce` after the request, so a
/// pending pass is superseded rather than run.
#[derive(Debug, Clone)]
pub struct ResizeScheduler {
    debounce: Duration,
    deadline: Option<Instant>,
    /// Number of pending passes discarded by a newer request.
    superseded: u64,
}

impl ResizeScheduler {
    pub const fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            deadline: None,
            superseded: 0,
        }
    }

    /// Request a pass, superseding any pending one.
    pub fn request(&mut self, now: Instant) {
        if self.deadline.is_some() {
            self.superseded = self.superseded.saturating_add(1);
        }
        self.deadline = Some(now + self.debounce);
    }

    /// When the pending pass is due, if any.
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once when the pending deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Return the number of requests that replaced a still-pending one.
    pub const fn superseded(&self) -> u64 {
        self.superseded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bursts_collapse_into_one_trailing_pass() {
        let start = Instant::now();
        let mut scheduler = ResizeScheduler::new(Duration::from_millis(300));
        scheduler.request(start);
        scheduler.request(start + Duration::from_millis(100));
        scheduler.request(start + Duration::from_millis(250));

        assert!(!scheduler.take_due(start + Duration::from_millis(400)));
        assert!(scheduler.take_due(start + Duration::from_millis(550)));
        assert!(!scheduler.take_due(start + Duration::from_millis(900)));
        assert_eq!(scheduler.superseded(), 2);
        assert!(!scheduler.is_pending());
    }
}
