//! Powerbox host console.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  SystemClock    ConsoleActuator    WatchdogSim           │
//! │  (Clock)        (DeviceActuator)   (Liveness)            │
//! │  MemoryMedium                                            │
//! │  (NvMedium)                                              │
//! │                                                          │
//! │  ──────────────── Port Trait Boundary ────────────────   │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │  CommandInterpreter (pure logic)                   │  │
//! │  │  Registry · Constraints · CommandStore             │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! A stdin REPL over the interpreter with a demo shed wired in: one fan
//! bank governed by a battery-temperature threshold and two pump switches
//! guarded against simultaneous inrush.  On the target the same core sits
//! behind the serial transport instead.

#![deny(unused_must_use)]

use std::io::{self, BufRead, Write};
use std::time::Instant;

use anyhow::Result;
use log::{info, Level, LevelFilter, Metadata, Record};

use powerbox::interp::CommandInterpreter;
use powerbox::ports::{Clock, DeviceActuator, Liveness};
use powerbox::registry::{CapabilityKind, Constraint, Registry};
use powerbox::store::{CommandStore, MemoryMedium};

// ── Console logger ────────────────────────────────────────────

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

// ── Port adapters ─────────────────────────────────────────────

/// Monotonic clock anchored at process start.
struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Prints actuation edges instead of toggling relay pins.
struct ConsoleActuator;

impl DeviceActuator for ConsoleActuator {
    fn on_constraint_result_changed(&mut self, _device_id: u8, device_name: &str, passed: bool) {
        info!(
            "device '{}' -> {}",
            device_name,
            if passed { "ON" } else { "OFF" }
        );
    }
}

/// Stand-in for the hardware watchdog feeder; the real one resets a timer
/// peripheral.  Once feeding stops, the hardware would reboot the board.
#[derive(Default)]
struct WatchdogSim {
    feeds: u64,
}

impl Liveness for WatchdogSim {
    fn keep_alive(&mut self) {
        self.feeds += 1;
    }
}

// ── Demo wiring ───────────────────────────────────────────────

fn build_registry() -> Result<Registry> {
    let mut reg = Registry::new();

    let battery_temp = reg.add_sensor("Battery Temp")?;
    let _pv_current = reg.add_sensor("PV Current")?;

    // Fan bank: run while the battery bank is hot, with hysteresis and a
    // 10s hold so the relay does not chatter around the threshold.
    let fan_rule = reg.add_constraint(Constraint::threshold(
        "batteryHot",
        battery_temp,
        45.0,
        2.0,
        3.0,
        10_000,
    ))?;
    let fans = reg.add_device("Fan Bank 1", Some(fan_rule))?;
    reg.add_capability(fans, CapabilityKind::Toggle)?;

    // Two pump switches whose inrush must not coincide: each is guarded by
    // a detector watching the other's toggle.
    let pump_a = reg.add_device("Pump A", None)?;
    let pump_b = reg.add_device("Pump B", None)?;
    let cap_a = reg.add_capability(pump_a, CapabilityKind::Toggle)?;
    let cap_b = reg.add_capability(pump_b, CapabilityKind::Toggle)?;
    let guard_a = reg.add_constraint(Constraint::simultaneous(cap_a, &[cap_b], 1.0, 2_000))?;
    let guard_b = reg.add_constraint(Constraint::simultaneous(cap_b, &[cap_a], 1.0, 2_000))?;
    if let Some(d) = reg.device_mut(pump_a) {
        d.constraint = Some(guard_a);
    }
    if let Some(d) = reg.device_mut(pump_b) {
        d.constraint = Some(guard_b);
    }

    Ok(reg)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(LevelFilter::Info))?;

    info!("Powerbox console v{}", env!("CARGO_PKG_VERSION"));

    let clock = SystemClock::new();
    let mut watchdog = WatchdogSim::default();
    let mut actuator = ConsoleActuator;

    let store = CommandStore::open(MemoryMedium::new())?;
    let registry = build_registry()?;
    let mut interp = CommandInterpreter::new(registry, store);

    // Replay the persisted boot script, exactly as the firmware does.
    for resp in interp.execute("SETUP RUN", &clock, &mut watchdog, &mut actuator) {
        println!("{}", resp.render(interp.output_format));
    }

    let stdin = io::stdin();
    let mut out = io::stdout();
    loop {
        print!("> ");
        out.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        if line.trim().is_empty() {
            continue;
        }

        for resp in interp.execute(&line, &clock, &mut watchdog, &mut actuator) {
            println!("{}", resp.render(interp.output_format));
        }

        if interp.ctx.reset_requested() {
            // On hardware the loop would keep running without feeding the
            // watchdog until it bites; the console just stops here.
            info!("reset requested: watchdog starvation would reboot the board");
            break;
        }

        // One polling-loop tick: re-evaluate every device constraint
        // unless a PAUSE is in effect.
        let now = clock.now_ms();
        if !interp.ctx.is_paused(now) {
            let synchronizing = interp.ctx.synchronizing;
            interp
                .registry
                .apply_all_constraints(now, synchronizing, &mut actuator);
        }
        watchdog.keep_alive();
    }

    Ok(())
}
