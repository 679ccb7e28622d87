use std::time::Duration;

use tokio::time::Instant;

/// A value whose applied copy trails the raw copy by a quiet period.
///
/// Every [`set`](Debounced::set) restarts the window; only the last value
/// set before the window elapses is applied.
#[derive(Debug, Clone)]
pub struct Debounced<T> {
    raw: T,
    current: T,
    delay: Duration,
    deadline: Option<Instant>,
    applied: u64,
}

impl<T: Clone> Debounced<T> {
    pub fn new(initial: T, delay: Duration) -> Self {
        Debounced {
            raw: initial.clone(),
            current: initial,
            delay,
            deadline: None,
            applied: 0,
        }
    }

    /// Latest value, updated immediately
    pub fn raw(&self) -> &T {
        &self.raw
    }

    /// Last applied value
    pub fn current(&self) -> &T {
        &self.current
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// When the pending value will be applied, if one is pending
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Number of times a pending value has been applied
    pub fn applied_count(&self) -> u64 {
        self.applied
    }

    /// Replace the raw value and restart the window
    pub fn set(&mut self, value: T) {
        self.raw = value;
        self.deadline = Some(Instant::now() + self.delay);
    }

    /// Apply the pending value if its window has elapsed
    pub fn poll(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.apply();
                true
            }
            _ => false,
        }
    }

    /// Wait out the window, then apply. Returns false if nothing was pending.
    pub async fn settle(&mut self) -> bool {
        let Some(deadline) = self.deadline else {
            return false;
        };
        tokio::time::sleep_until(deadline).await;
        self.apply();
        true
    }

    /// Apply the pending value now, skipping the rest of the window
    pub fn flush(&mut self) -> bool {
        if self.deadline.is_none() {
            return false;
        }
        self.apply();
        true
    }

    fn apply(&mut self) {
        self.current = self.raw.clone();
        self.deadline = None;
        self.applied += 1;
    }
}
