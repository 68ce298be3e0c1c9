//! Latency simulating tape wrapper.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::LatencyConfig;
use crate::tape::{Tape, TapeError, Value};

/// Source of operation delays.
pub trait Clock {
    /// Blocks for the given duration.
    fn pause(&mut self, delay: Duration);
}

/// Clock suspending the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn pause(&mut self, delay: Duration) {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}

/// Clock that only accumulates virtual time. Clones share the elapsed counter.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    elapsed_ns: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock::default()
    }

    /// Returns total virtual time spent in pauses.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns.load(Ordering::Relaxed))
    }
}

impl Clock for ManualClock {
    fn pause(&mut self, delay: Duration) {
        let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_ns.fetch_add(nanos, Ordering::Relaxed);
    }
}

/// Tape wrapper delaying every read and write according to the latency configuration.
pub struct LatentTape<T: Tape, C: Clock = SystemClock> {
    inner: T,
    config: LatencyConfig,
    clock: C,
}

impl<T: Tape> LatentTape<T, SystemClock> {
    /// Wraps a tape using real-time delays.
    pub fn new(inner: T, config: LatencyConfig) -> Self {
        LatentTape::with_clock(inner, config, SystemClock)
    }
}

impl<T: Tape, C: Clock> LatentTape<T, C> {
    pub fn with_clock(inner: T, config: LatencyConfig, clock: C) -> Self {
        LatentTape { inner, config, clock }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Tape, C: Clock> Tape for LatentTape<T, C> {
    fn read(&mut self) -> Result<Option<Value>, TapeError> {
        self.clock.pause(self.config.read_delay);
        self.inner.read()
    }

    fn write(&mut self, value: Value) -> Result<(), TapeError> {
        self.clock.pause(self.config.write_delay);
        self.inner.write(value)
    }

    fn rewind(&mut self) -> Result<(), TapeError> {
        self.inner.rewind()
    }

    fn is_end(&mut self) -> Result<bool, TapeError> {
        self.inner.is_end()
    }

    fn flush(&mut self) -> Result<(), TapeError> {
        self.inner.flush()
    }
}
