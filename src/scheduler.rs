//! Tick scheduling
//!
//! Drives a [`SignalProcessor`] at a fixed cadence. Ticks never overlap: the
//! scheduler holds the processor mutably and runs each tick to completion.
//! When a tick overruns its slot, the missed deadlines are skipped instead of
//! being queued, so at most one tick is ever pending.

use crate::error::SignalError;
use crate::pipeline::SignalProcessor;
use crate::sampler::MetricsSource;
use crate::sink::Sink;
use chrono::Utc;
use log::warn;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep, so a stop request is noticed promptly
const STOP_POLL: Duration = Duration::from_millis(50);

/// Source of tick timestamps in milliseconds
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall clock anchored once at creation, then advanced monotonically.
///
/// Reported times never go backwards, even when the system clock is stepped.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin_ms: u64,
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Anchor the clock at the current wall time (ms since the Unix epoch)
    pub fn new() -> Self {
        Self {
            origin_ms: u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0),
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        let elapsed_ms = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.origin_ms.saturating_add(elapsed_ms)
    }
}

/// Manually advanced clock for replays and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Fixed-interval tick driver
#[derive(Debug, Clone, Copy)]
pub struct TickScheduler {
    interval: Duration,
}

impl TickScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Scheduler using the processor's configured tick interval
    pub fn for_processor<S: MetricsSource>(processor: &SignalProcessor<S>) -> Self {
        Self::new(Duration::from_millis(processor.config().tick_interval_ms))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Tick `processor` until `stop` is set, returning the number of ticks run.
    ///
    /// The first tick fires one interval after the call. A sink error stops the
    /// loop and is returned.
    pub fn run<S, K, C>(
        &self,
        processor: &mut SignalProcessor<S>,
        sink: &mut K,
        clock: &C,
        stop: &AtomicBool,
    ) -> Result<u64, SignalError>
    where
        S: MetricsSource,
        K: Sink + ?Sized,
        C: Clock + ?Sized,
    {
        let mut ticks = 0;
        let mut deadline = Instant::now() + self.interval;

        while !stop.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now < deadline {
                thread::sleep((deadline - now).min(STOP_POLL));
                continue;
            }

            processor.tick(clock.now_ms(), sink)?;
            ticks += 1;

            let (next, skipped) = next_deadline(deadline, Instant::now(), self.interval);
            if skipped > 0 {
                warn!("tick overran its slot; skipping {} tick(s)", skipped);
            }
            deadline = next;
        }

        Ok(ticks)
    }
}

/// Next deadline after a tick scheduled at `deadline` finished at `finished`.
///
/// Returns the deadline and how many slots were skipped because the tick ran
/// past them.
fn next_deadline(deadline: Instant, finished: Instant, interval: Duration) -> (Instant, u32) {
    if interval.is_zero() {
        return (finished, 0);
    }
    let mut next = deadline + interval;
    let mut skipped = 0;
    while next <= finished {
        next += interval;
        skipped += 1;
    }
    (next, skipped)
}
