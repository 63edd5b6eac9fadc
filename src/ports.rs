//! Port traits — the boundary between the rule-engine core and the hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ core (registry / store / interpreter)
//! ```
//!
//! Driven adapters (monotonic clock, watchdog feeder, relay/pin writer, the
//! non-volatile medium) implement these traits.  The core consumes them via
//! generics at call sites, so it never touches hardware directly and every
//! test runs against in-memory fakes.

use crate::error::StoreResult;

// ───────────────────────────────────────────────────────────────
// Monotonic clock
// ───────────────────────────────────────────────────────────────

/// Millisecond monotonic clock.
///
/// The value wraps after extended uptime; consumers must compare durations
/// with `now.wrapping_sub(then)`, never absolute deadlines.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Fixed-rate fake clock for tests: starts at an arbitrary origin and is
/// advanced explicitly.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: core::cell::Cell<u64>,
}

impl ManualClock {
    pub fn starting_at(origin_ms: u64) -> Self {
        Self {
            now: core::cell::Cell::new(origin_ms),
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.set(self.now.get().wrapping_add(delta_ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

// ───────────────────────────────────────────────────────────────
// Liveness (hardware watchdog feeder)
// ───────────────────────────────────────────────────────────────

/// Keep-alive callback for the external hardware watchdog.
///
/// Long registry/store iterations call this periodically so a big listing
/// cannot starve the watchdog by accident.  Starving it on purpose is the
/// `RESET` mechanism: once the reset latch is set, the core stops calling
/// `keep_alive` and the watchdog restarts the board.
pub trait Liveness {
    fn keep_alive(&mut self);
}

/// Counting fake for tests.
#[derive(Debug, Default)]
pub struct CountingLiveness {
    pub feeds: u32,
}

impl Liveness for CountingLiveness {
    fn keep_alive(&mut self) {
        self.feeds += 1;
    }
}

// ───────────────────────────────────────────────────────────────
// Device actuation
// ───────────────────────────────────────────────────────────────

/// Write-side port: invoked when a device's constraint verdict changes.
///
/// The adapter performs the actual relay/pin write; the core only reports
/// the new pass/fail state.  Implementations must tolerate being called
/// with an unchanged state (`apply_constraint` with `ignore_same_state`
/// disabled re-announces the current verdict).
pub trait DeviceActuator {
    fn on_constraint_result_changed(&mut self, device_id: u8, device_name: &str, passed: bool);
}

/// Recording fake for tests: appends `(device_id, passed)` per callback.
#[derive(Debug, Default)]
pub struct RecordingActuator {
    pub events: Vec<(u8, bool)>,
}

impl DeviceActuator for RecordingActuator {
    fn on_constraint_result_changed(&mut self, device_id: u8, _device_name: &str, passed: bool) {
        self.events.push((device_id, passed));
    }
}

// ───────────────────────────────────────────────────────────────
// Non-volatile medium
// ───────────────────────────────────────────────────────────────

/// Byte-addressable non-volatile medium (EEPROM-class).
///
/// The command store performs all persistence through this trait with
/// absolute offsets computed from [`crate::store::layout`].  Accesses are
/// bounds-checked against [`NvMedium::capacity`]; implementations never see
/// an out-of-range offset from the store.
pub trait NvMedium {
    /// Fill `buf` from `offset`.
    fn read(&self, offset: usize, buf: &mut [u8]) -> StoreResult<()>;

    /// Write `data` at `offset`.  Must be durable once it returns `Ok`.
    fn write(&mut self, offset: usize, data: &[u8]) -> StoreResult<()>;

    /// Total addressable bytes.
    fn capacity(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_and_wraps() {
        let clock = ManualClock::starting_at(u64::MAX - 10);
        clock.advance(15);
        assert_eq!(clock.now_ms(), 4);
    }

    #[test]
    fn counting_liveness_counts() {
        let mut live = CountingLiveness::default();
        live.keep_alive();
        live.keep_alive();
        assert_eq!(live.feeds, 2);
    }
}
