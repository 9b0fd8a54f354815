//! Raw event accumulation and rolling-window sampling
//!
//! The capture side (editor callbacks, stdin reader, ...) pushes events into an
//! [`EventCounter`]. Once per tick the [`MetricsSampler`] reduces the counter to
//! a [`RawSnapshot`] over a bounded window.
//!
//! The window is a *sliding reset*, not a sliding average: the counter keeps
//! growing until the window duration is reached, at which point the rate is
//! reported and the counter and window start reset together. Rates therefore
//! jump briefly at each window boundary.

use crate::config::EngineConfig;
use crate::types::RawSnapshot;
use log::debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Milliseconds per minute
const MS_PER_MIN: f64 = 60_000.0;

/// Anything the orchestrator can poll for a snapshot once per tick
pub trait MetricsSource {
    /// Produce the snapshot for the tick at `now_ms`. May mutate internal
    /// counters; each call is a destructive read.
    fn snapshot(&mut self, now_ms: u64) -> RawSnapshot;
}

#[derive(Debug)]
struct CounterState {
    keystrokes: AtomicU64,
    focused: AtomicBool,
}

/// Shared handle the capture stream writes raw events into.
///
/// Cloning is cheap; all clones refer to the same counters. Increments are
/// lock-free and safe to deliver from another thread while ticks run.
#[derive(Debug, Clone)]
pub struct EventCounter {
    state: Arc<CounterState>,
}

impl Default for EventCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCounter {
    /// Create a counter with no keystrokes; the editor starts out focused
    pub fn new() -> Self {
        Self {
            state: Arc::new(CounterState {
                keystrokes: AtomicU64::new(0),
                focused: AtomicBool::new(true),
            }),
        }
    }

    /// Record `count` typed characters
    pub fn record_keystrokes(&self, count: u64) {
        self.state.keystrokes.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a focus change of the editor window
    pub fn set_focused(&self, focused: bool) {
        self.state.focused.store(focused, Ordering::Relaxed);
    }

    /// Keystrokes accumulated so far, without clearing
    pub fn keystrokes(&self) -> u64 {
        self.state.keystrokes.load(Ordering::Acquire)
    }

    /// Current focus state
    pub fn is_focused(&self) -> bool {
        self.state.focused.load(Ordering::Acquire)
    }

    /// Atomically read and clear the keystroke count.
    ///
    /// Events arriving concurrently land either in the returned value or in the
    /// next window, never both and never neither.
    pub fn take_keystrokes(&self) -> u64 {
        self.state.keystrokes.swap(0, Ordering::AcqRel)
    }
}

/// Rolling-window sampler over an [`EventCounter`]
#[derive(Debug)]
pub struct MetricsSampler {
    counter: EventCounter,
    window_start_ms: u64,
    window_ms: u64,
    typing_speed_ceiling: f64,
}

impl MetricsSampler {
    /// Create a sampler whose first window starts at `start_ms`
    pub fn new(counter: EventCounter, config: &EngineConfig, start_ms: u64) -> Self {
        Self {
            counter,
            window_start_ms: start_ms,
            window_ms: config.sampler_window_ms,
            typing_speed_ceiling: config.typing_speed_ceiling,
        }
    }

    /// Handle for the capture side
    pub fn counter(&self) -> EventCounter {
        self.counter.clone()
    }

    /// Start of the current counting window
    pub fn window_start_ms(&self) -> u64 {
        self.window_start_ms
    }

    /// Reduce the counter to a snapshot at `now_ms`, resetting the window when
    /// it has reached its full duration.
    pub fn sample(&mut self, now_ms: u64) -> RawSnapshot {
        let elapsed_ms = now_ms.saturating_sub(self.window_start_ms);
        let window_complete = elapsed_ms >= self.window_ms;

        let keystroke_count = if window_complete {
            self.counter.take_keystrokes()
        } else {
            self.counter.keystrokes()
        };

        let snapshot = RawSnapshot {
            keystroke_count,
            window_elapsed_ms: elapsed_ms,
            is_focused: self.counter.is_focused(),
            typing_speed: compute_typing_speed(
                keystroke_count,
                elapsed_ms,
                self.typing_speed_ceiling,
            ),
        };

        if window_complete {
            debug!(
                "sampler window reset after {}ms ({} keystrokes)",
                elapsed_ms, keystroke_count
            );
            self.window_start_ms = now_ms;
        }

        snapshot
    }
}

impl MetricsSource for MetricsSampler {
    fn snapshot(&mut self, now_ms: u64) -> RawSnapshot {
        self.sample(now_ms)
    }
}

/// Keys per minute over `elapsed_ms`, capped at `ceiling`
///
/// Formula: `keystrokes * 60000 / elapsed_ms`, or 0 for an empty window
pub fn compute_typing_speed(keystrokes: u64, elapsed_ms: u64, ceiling: f64) -> f64 {
    if elapsed_ms == 0 {
        return 0.0;
    }
    (keystrokes as f64 * MS_PER_MIN / elapsed_ms as f64).min(ceiling)
}
