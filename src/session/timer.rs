use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_secs(1);

/// Remaining time below which the clock is shown as urgent.
pub const LOW_TIME_SECS: u32 = 300;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClockState {
    Running { next_due: Instant },
    Stopped,
}

/// One-second countdown for an exam session.
///
/// `tick()` is the only way remaining time changes. `due_ticks()` turns wall
/// clock progress into a number of whole-second ticks the owner should apply,
/// so a slow or bursty event loop still counts every second exactly once.
#[derive(Clone, Debug)]
pub struct Countdown {
    remaining: u32,
    state: ClockState,
}

impl Countdown {
    pub fn start(total_secs: u32, now: Instant) -> Self {
        Self {
            remaining: total_secs,
            state: ClockState::Running {
                next_due: now + TICK,
            },
        }
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ClockState::Running { .. })
    }

    /// Count down one second. Returns true on the tick that reaches zero.
    /// A stopped clock ignores ticks.
    pub fn tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.stop();
            return true;
        }
        false
    }

    /// Whole seconds elapsed since the last accounting. Always 0 once stopped.
    pub fn due_ticks(&mut self, now: Instant) -> u32 {
        let ClockState::Running { next_due } = self.state else {
            return 0;
        };
        if now < next_due {
            return 0;
        }
        let behind = now.duration_since(next_due);
        let ticks = 1 + (behind.as_millis() / TICK.as_millis()) as u32;
        self.state = ClockState::Running {
            next_due: next_due + TICK * ticks,
        };
        ticks
    }

    pub fn stop(&mut self) {
        self.state = ClockState::Stopped;
    }

    pub fn is_low(&self) -> bool {
        self.remaining < LOW_TIME_SECS
    }

    /// `m:ss`
    pub fn display(&self) -> String {
        format_clock(self.remaining)
    }
}

pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_counts_down_and_expires_once() {
        let mut clock = Countdown::start(2, Instant::now());
        assert!(!clock.tick());
        assert_eq!(clock.remaining_secs(), 1);
        assert!(clock.tick());
        assert_eq!(clock.remaining_secs(), 0);
        assert!(!clock.is_running());
        assert!(!clock.tick());
    }

    #[test]
    fn test_zero_duration_expires_on_first_tick() {
        let mut clock = Countdown::start(0, Instant::now());
        assert!(clock.tick());
    }

    #[test]
    fn test_stopped_clock_ignores_ticks() {
        let mut clock = Countdown::start(10, Instant::now());
        clock.stop();
        assert!(!clock.tick());
        assert_eq!(clock.remaining_secs(), 10);
    }

    #[test]
    fn test_due_ticks_counts_whole_seconds() {
        let t0 = Instant::now();
        let mut clock = Countdown::start(60, t0);
        assert_eq!(clock.due_ticks(t0 + Duration::from_millis(400)), 0);
        assert_eq!(clock.due_ticks(t0 + Duration::from_millis(1000)), 1);
        assert_eq!(clock.due_ticks(t0 + Duration::from_millis(1500)), 0);
        assert_eq!(clock.due_ticks(t0 + Duration::from_millis(4200)), 3);
        assert_eq!(clock.due_ticks(t0 + Duration::from_millis(4900)), 0);
        assert_eq!(clock.due_ticks(t0 + Duration::from_millis(5000)), 1);
    }

    #[test]
    fn test_due_ticks_zero_after_stop() {
        let t0 = Instant::now();
        let mut clock = Countdown::start(60, t0);
        clock.stop();
        assert_eq!(clock.due_ticks(t0 + Duration::from_secs(30)), 0);
    }

    #[test]
    fn test_display_format() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(45 * 60), "45:00");
        let clock = Countdown::start(299, Instant::now());
        assert!(clock.is_low());
    }
}
