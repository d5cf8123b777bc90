use std::time::{Duration, Instant};

/// Trailing-edge debouncer driven by caller-supplied instants.
///
/// Each `push` restarts the window. `poll` hands the value out once the window
/// has elapsed without another push.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if now >= *deadline => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    /// Releases the pending value without waiting.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(250);

    #[test]
    fn test_value_released_after_quiet_window() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push("n", t0);

        assert_eq!(debouncer.poll(t0 + Duration::from_millis(249)), None);
        assert_eq!(debouncer.poll(t0 + DELAY), Some("n"));
        assert_eq!(debouncer.poll(t0 + DELAY * 2), None);
    }

    #[test]
    fn test_push_restarts_window() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push("n", t0);
        debouncer.push("na", t0 + Duration::from_millis(200));

        assert_eq!(debouncer.poll(t0 + Duration::from_millis(300)), None);
        assert_eq!(
            debouncer.deadline(),
            Some(t0 + Duration::from_millis(450))
        );
        assert_eq!(debouncer.poll(t0 + Duration::from_millis(450)), Some("na"));
    }

    #[test]
    fn test_flush_and_cancel() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push(1, t0);
        assert_eq!(debouncer.flush(), Some(1));
        assert!(!debouncer.is_pending());

        debouncer.push(2, t0);
        debouncer.cancel();
        assert_eq!(debouncer.poll(t0 + DELAY), None);
    }
}
