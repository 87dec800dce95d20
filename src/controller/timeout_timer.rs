//! Single deadline anchored to the last qualifying trigger.

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeoutTimer {
    deadline: Option<Instant>,
}

impl TimeoutTimer {
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Re-arming replaces the deadline; windows never accumulate.
    pub fn arm(&mut self, now: Instant, duration: Duration) {
        self.deadline = Some(now + duration);
    }

    /// Clears the deadline so a fresh trigger is accepted immediately.
    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}
