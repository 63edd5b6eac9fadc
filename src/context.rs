//! Shared controller state threaded through command handling.
//!
//! The protocol has a handful of process-wide latches: the last error/info
//! message raised while handling a line, the bulk-synchronizing flag consulted
//! by constraint evaluation, the pause timer that gates the polling loop, and
//! the reset request that starves the hardware watchdog.  Execution is
//! strictly serialized (one line fully handled before the next), so these are
//! plain fields on a context struct that is passed by `&mut` — no globals,
//! no locking.
//!
//! Ownership of each latch's lifecycle:
//! - message latches: set by anyone, drained exactly once by the response
//!   envelope builder;
//! - `synchronizing`: set/cleared by the interpreter around script replay;
//! - pause timer: armed by `PAUSE`, expired by `RESUME` or its deadline;
//! - reset request: set by `RESET`, consulted by the external liveness task
//!   (the controller never reboots itself directly).

/// Pause state for the external constraint-polling loop.
///
/// `Indefinite` is the no-argument (or zero-second) form of `PAUSE`: paused
/// until an explicit `RESUME`, never auto-expiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PauseTimer {
    Indefinite,
    Until { since_ms: u64, duration_ms: u64 },
}

/// Wall-clock reference established by `SET TIME_T`.
///
/// The core only owns a monotonic millisecond clock; wall time is an offset
/// anchored to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRef {
    /// Epoch milliseconds supplied by the operator.
    pub epoch_ms: u64,
    /// Monotonic timestamp at which `epoch_ms` was set.
    pub anchored_at_ms: u64,
}

/// Process-wide mutable state for one controller instance.
#[derive(Debug, Default)]
pub struct SystemContext {
    last_error_msg: Option<String>,
    last_info_msg: Option<String>,
    /// True while stored commands are being replayed in bulk; constraint
    /// listeners and non-synchronizable constraints must not react.
    pub synchronizing: bool,
    reset_requested: bool,
    pause: Option<PauseTimer>,
    time_ref: Option<TimeRef>,
}

impl SystemContext {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Message latches ───────────────────────────────────────

    /// Latch an error message; a later latch replaces an earlier one, the
    /// envelope only ever reports the most recent.
    pub fn latch_error(&mut self, msg: impl Into<String>) {
        self.last_error_msg = Some(msg.into());
    }

    pub fn latch_info(&mut self, msg: impl Into<String>) {
        self.last_info_msg = Some(msg.into());
    }

    /// Drain the error latch (read-then-clear, once per envelope).
    pub fn take_error(&mut self) -> Option<String> {
        self.last_error_msg.take()
    }

    pub fn take_info(&mut self) -> Option<String> {
        self.last_info_msg.take()
    }

    // ── Reset / watchdog starvation ───────────────────────────

    /// Request a restart by withholding future watchdog keep-alives.
    ///
    /// Nothing reboots here: the external liveness task consults this flag,
    /// stops feeding the hardware watchdog, and the watchdog does the rest.
    pub fn request_reset(&mut self) {
        self.reset_requested = true;
    }

    pub fn reset_requested(&self) -> bool {
        self.reset_requested
    }

    // ── Pause timer ───────────────────────────────────────────

    /// Arm the pause timer. `duration_ms == 0` means "no auto-expiry",
    /// not "already expired".
    pub fn pause(&mut self, now_ms: u64, duration_ms: u64) {
        self.pause = Some(if duration_ms == 0 {
            PauseTimer::Indefinite
        } else {
            PauseTimer::Until {
                since_ms: now_ms,
                duration_ms,
            }
        });
    }

    /// Expire the pause timer immediately.
    pub fn resume(&mut self) {
        self.pause = None;
    }

    /// Whether the polling loop must skip constraint evaluation right now.
    ///
    /// Wraparound-safe: the monotonic clock overflows after extended uptime,
    /// so elapsed time is always `now.wrapping_sub(since)`.
    pub fn is_paused(&mut self, now_ms: u64) -> bool {
        match self.pause {
            None => false,
            Some(PauseTimer::Indefinite) => true,
            Some(PauseTimer::Until {
                since_ms,
                duration_ms,
            }) => {
                if now_ms.wrapping_sub(since_ms) < duration_ms {
                    true
                } else {
                    self.pause = None;
                    false
                }
            }
        }
    }

    // ── Wall clock reference ──────────────────────────────────

    pub fn set_time_ref(&mut self, epoch_ms: u64, now_ms: u64) {
        self.time_ref = Some(TimeRef {
            epoch_ms,
            anchored_at_ms: now_ms,
        });
    }

    pub fn time_ref(&self) -> Option<TimeRef> {
        self.time_ref
    }

    /// Current epoch milliseconds, if a reference was ever set.
    pub fn epoch_ms(&self, now_ms: u64) -> Option<u64> {
        self.time_ref
            .map(|r| r.epoch_ms.wrapping_add(now_ms.wrapping_sub(r.anchored_at_ms)))
    }
}
