//! Time sources and sampling clocks
//!
//! Clocks are polled, never pushed: every `should_tick` call reads the time
//! source and computes whether the target period has elapsed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic millisecond time source
pub trait TimeSource: Send {
    /// Milliseconds since an arbitrary, fixed origin
    fn now_ms(&self) -> u64;
}

/// Wall-clock time source backed by `Instant`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Externally driven time source
///
/// Clones share the same time, so a caller can keep a handle and advance the
/// clock while the translator owns another. Used for log replay and tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::Relaxed);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, Ordering::Relaxed);
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

/// Per-signal sampling gate limiting emission frequency
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyClock {
    /// Target emission frequency in Hz (0 = no limit)
    pub frequency_hz: f32,
    /// Timestamp of the last tick, `None` until the first one
    pub last_tick_ms: Option<u64>,
}

impl FrequencyClock {
    pub fn new(frequency_hz: f32) -> Self {
        Self {
            frequency_hz,
            last_tick_ms: None,
        }
    }

    /// True for a finite, non-negative frequency
    pub fn is_valid_frequency(frequency_hz: f32) -> bool {
        frequency_hz.is_finite() && frequency_hz >= 0.0
    }

    /// Target period in milliseconds, `None` when unlimited
    pub fn period_ms(&self) -> Option<f64> {
        if self.frequency_hz > 0.0 {
            Some(1000.0 / self.frequency_hz as f64)
        } else {
            None
        }
    }

    /// Poll the clock; a tick records the current time as the last tick
    pub fn should_tick(&mut self, time: &dyn TimeSource) -> bool {
        let now = time.now_ms();
        let tick = match (self.period_ms(), self.last_tick_ms) {
            (None, _) | (_, None) => true,
            (Some(period), Some(last)) => now.saturating_sub(last) as f64 >= period,
        };
        if tick {
            self.last_tick_ms = Some(now);
        }
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_clock_always_ticks() {
        let time = ManualClock::new(0);
        let mut clock = FrequencyClock::new(0.0);
        assert!(clock.should_tick(&time));
        assert!(clock.should_tick(&time));
    }

    #[test]
    fn test_first_poll_ticks() {
        let time = ManualClock::new(5);
        let mut clock = FrequencyClock::new(1.0);
        assert!(clock.should_tick(&time));
        assert_eq!(clock.last_tick_ms, Some(5));
    }

    #[test]
    fn test_period_gate() {
        let time = ManualClock::new(0);
        let mut clock = FrequencyClock::new(10.0); // 100ms period
        assert!(clock.should_tick(&time));

        time.advance(99);
        assert!(!clock.should_tick(&time));

        time.advance(1);
        assert!(clock.should_tick(&time));

        // The period restarts at the last tick
        time.advance(50);
        assert!(!clock.should_tick(&time));
    }

    #[test]
    fn test_frequency_validity() {
        assert!(FrequencyClock::is_valid_frequency(0.0));
        assert!(FrequencyClock::is_valid_frequency(10.0));
        assert!(!FrequencyClock::is_valid_frequency(-5.0));
        assert!(!FrequencyClock::is_valid_frequency(f32::NAN));
        assert!(!FrequencyClock::is_valid_frequency(f32::INFINITY));
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let a = ManualClock::new(10);
        let b = a.clone();
        a.set(250);
        assert_eq!(b.now_ms(), 250);
    }
}
