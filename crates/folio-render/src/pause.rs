//! Pause indicators
//!
//! Queried by the progressive renderer and by image decoders at their
//! checkpoints. Returning `true` makes the current step hand control back to
//! the caller, which resumes later through `continue_render`.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// "Should I pause now" capability
pub trait PauseIndicator {
    fn need_to_pause_now(&self) -> bool;
}

/// Closures work as pause indicators
impl<F: Fn() -> bool> PauseIndicator for F {
    fn need_to_pause_now(&self) -> bool {
        self()
    }
}

/// Never pauses (one-shot rendering)
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverPause;

impl PauseIndicator for NeverPause {
    fn need_to_pause_now(&self) -> bool {
        false
    }
}

/// Time-sliced pause: asks to pause once the slice budget is spent
#[derive(Debug, Clone)]
pub struct DeadlinePause {
    start: Cell<Instant>,
    budget: Duration,
}

impl DeadlinePause {
    pub fn new(budget: Duration) -> Self {
        Self {
            start: Cell::new(Instant::now()),
            budget,
        }
    }

    /// Start a fresh slice before the next `continue_render`
    pub fn restart(&self) {
        self.start.set(Instant::now());
    }

    pub fn elapsed(&self) -> Duration {
        self.start.get().elapsed()
    }
}

impl PauseIndicator for DeadlinePause {
    fn need_to_pause_now(&self) -> bool {
        self.elapsed() > self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_pause() {
        assert!(!NeverPause.need_to_pause_now());
    }

    #[test]
    fn test_deadline_expires() {
        let pause = DeadlinePause::new(Duration::from_nanos(1));
        std::thread::sleep(Duration::from_micros(10));
        assert!(pause.need_to_pause_now());
    }

    #[test]
    fn test_deadline_restart() {
        let pause = DeadlinePause::new(Duration::from_secs(60));
        pause.restart();
        assert!(!pause.need_to_pause_now());
    }

    #[test]
    fn test_closure_indicator() {
        let calls = Cell::new(0);
        let pause = || {
            calls.set(calls.get() + 1);
            calls.get() > 2
        };
        assert!(!pause.need_to_pause_now());
        assert!(!pause.need_to_pause_now());
        assert!(pause.need_to_pause_now());
    }
}
