use std::time::{Duration, Instant};

/// Wall-clock budget shared by the search loops. Stopping is cooperative:
/// loops poll `should_stop` between steps.
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
    budget: Option<Duration>,
    cancelled: bool,
}

impl Timer {
    pub fn start(budget: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            budget,
            cancelled: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.budget.map(|b| b.saturating_sub(self.elapsed()))
    }

    pub fn should_stop(&self) -> bool {
        self.cancelled || self.budget.is_some_and(|b| self.elapsed() >= b)
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_timer_runs_until_cancelled() {
        let mut t = Timer::start(None);
        assert!(!t.should_stop());
        assert!(t.remaining().is_none());
        t.cancel();
        assert!(t.should_stop());
    }

    #[test]
    fn test_zero_budget_stops_immediately() {
        let t = Timer::start(Some(Duration::ZERO));
        assert!(t.should_stop());
        assert_eq!(t.remaining(), Some(Duration::ZERO));
    }
}
