use std::time::{Duration, Instant};

/// Rate limits something, typically progress logs, to at most once per `every`.
pub struct Every {
    every: Duration,
    last: Instant,
}

impl Every {
    pub fn new(every: Duration) -> Self {
        Self {
            every,
            last: Instant::now(),
        }
    }

    /// Runs `f` if at least `every` has passed since the last time it ran. Returns
    /// whether it ran.
    pub fn perform(&mut self, f: impl FnOnce()) -> bool {
        let now = Instant::now();
        if now - self.last >= self.every {
            self.last = now;
            f();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_zero_always_performs() {
        let mut every = Every::new(Duration::ZERO);
        let mut count = 0;
        for _ in 0..3 {
            every.perform(|| count += 1);
        }
        assert_eq!(3, count);
    }

    #[test]
    fn every_long_never_performs() {
        let mut every = Every::new(Duration::from_secs(3600));
        assert!(!every.perform(|| panic!("should not run")));
    }
}
