/// Tracks whether an application currently has data to show.
///
/// Starts unavailable, becomes available after any successful cycle and
/// unavailable again at the `threshold`-th consecutive failed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    threshold: u32,
    consecutive_failures: u32,
    available: bool,
}

impl Availability {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive_failures: 0,
            available: false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.available = true;
    }

    /// Returns true when this failure made the data unavailable.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.available && self.consecutive_failures >= self.threshold {
            self.available = false;
            return true;
        }
        false
    }
}
