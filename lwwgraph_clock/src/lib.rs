//! Monotonic nanosecond clocks used to stamp [`lwwgraph_core`] operations.
//!
//! The clock is an external collaborator: the graph core only ever calls
//! [`Clock::nanoseconds`] to fill in a timestamp the caller didn't supply
//! itself. Two implementations are provided here: a real-time clock anchored
//! to [`std::time::Instant`], and a deterministic mock used in tests.

use snafu::prelude::*;
use std::{
    cell::Cell,
    time::Instant,
};

/// A source of monotonically non-decreasing nanosecond timestamps.
///
/// Implementations use interior mutability so that a single clock instance
/// can be shared between a replica and its callers without requiring `&mut`
/// access everywhere a timestamp is needed.
pub trait Clock {
    /// Read the current time in nanoseconds. Must never return a value
    /// smaller than a previous call on the same instance.
    fn nanoseconds(&self) -> i64;
}

/// Errors raised while configuring a [`MockClock`].
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ClockError {
    #[snafu(display("clock step size can't be negative, got {step_size}"))]
    NegativeStepSize { step_size: i64 },
    #[snafu(display(
        "next_tick must not precede the current time ({now}), got {next_tick}"
    ))]
    NonMonotonicNextTick { now: i64, next_tick: i64 },
}

/// A monotonic real-time clock anchored to an externally supplied "zero".
///
/// `nanoseconds()` returns `system_monotonic_now() - zero`, where `zero` is
/// computed at construction time from a caller-supplied reference timestamp.
#[derive(Debug)]
pub struct RealtimeClock {
    origin: Instant,
    reference_time_now_ns: i64,
}

impl RealtimeClock {
    /// Anchor a new clock so that `nanoseconds()` starts at
    /// `reference_time_now_ns` and increases monotonically from there.
    pub fn new(reference_time_now_ns: i64) -> Self {
        Self {
            origin: Instant::now(),
            reference_time_now_ns,
        }
    }
}

impl Clock for RealtimeClock {
    fn nanoseconds(&self) -> i64 {
        let elapsed: i64 = self
            .origin
            .elapsed()
            .as_nanos()
            .try_into()
            .unwrap_or(i64::MAX);
        self.reference_time_now_ns.saturating_add(elapsed)
    }
}

/// A deterministic, programmable clock used for testing.
///
/// Each read advances `now` to `next_tick` (which defaults to
/// `now + step_size`), clears any override, and returns the new `now`.
#[derive(Debug)]
pub struct MockClock {
    now: Cell<i64>,
    step_size: Cell<i64>,
    next_tick_override: Cell<Option<i64>>,
}

impl MockClock {
    /// Create a clock starting at `reference_time_now_ns` with a default
    /// step size of 1.
    pub fn new(reference_time_now_ns: i64) -> Self {
        Self {
            now: Cell::new(reference_time_now_ns),
            step_size: Cell::new(1),
            next_tick_override: Cell::new(None),
        }
    }

    pub fn step_size(&self) -> i64 {
        self.step_size.get()
    }

    /// Set the amount `now` advances by on each read that has no override.
    pub fn set_step_size(&self, step_size: i64) -> Result<(), ClockError> {
        ensure!(step_size >= 0, NegativeStepSizeSnafu { step_size });
        self.step_size.set(step_size);
        Ok(())
    }

    fn next_tick(&self) -> i64 {
        self.next_tick_override
            .get()
            .unwrap_or_else(|| self.now.get().saturating_add(self.step_size.get()))
    }

    /// Override the value the next read will return. Must not precede the
    /// current time.
    pub fn set_next_tick(&self, nanoseconds: i64) -> Result<(), ClockError> {
        let now = self.now.get();
        ensure!(
            nanoseconds >= now,
            NonMonotonicNextTickSnafu {
                now,
                next_tick: nanoseconds
            }
        );
        self.next_tick_override.set(Some(nanoseconds));
        Ok(())
    }
}

impl Clock for MockClock {
    fn nanoseconds(&self) -> i64 {
        let next = self.next_tick();
        self.now.set(next);
        self.next_tick_override.set(None);
        next
    }
}
