use std::time::{Duration, Instant};

/// Minimum spacing between two accepted hotkey events.
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(200);

/// Drops events that arrive too soon after the last *accepted* one.
///
/// Dropped events do not move the window, so a held key repeating every
/// 50 ms still fires once per interval.
#[derive(Debug, Clone)]
pub struct Debouncer {
    interval: Duration,
    last_accepted: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_INTERVAL)
    }
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_accepted: None,
        }
    }

    pub fn last_accepted(&self) -> Option<Instant> {
        self.last_accepted
    }

    pub fn accept(&mut self, at: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if at.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.last_accepted = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_event_inside_window_is_dropped() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::default();

        assert!(debouncer.accept(t0));
        assert!(!debouncer.accept(t0 + Duration::from_millis(50)));
        assert_eq!(debouncer.last_accepted(), Some(t0));
    }

    #[test]
    fn window_is_measured_from_last_accepted_event() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::default();

        assert!(debouncer.accept(t0));
        assert!(!debouncer.accept(t0 + Duration::from_millis(150)));
        assert!(debouncer.accept(t0 + Duration::from_millis(200)));
        assert!(!debouncer.accept(t0 + Duration::from_millis(390)));
    }
}
