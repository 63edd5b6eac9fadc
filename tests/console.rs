//! End-to-end protocol tests: a wired shed driven through the interpreter
//! exactly as the serial transport would drive it.

use powerbox::config::OutputFormat;
use powerbox::error::RespCode;
use powerbox::interp::{CommandInterpreter, Response};
use powerbox::ports::{Clock, CountingLiveness, ManualClock, RecordingActuator};
use powerbox::registry::{CapabilityKind, Constraint, EntityId, Registry};
use powerbox::store::{CommandStore, MemoryMedium};

struct Harness {
    interp: CommandInterpreter<MemoryMedium>,
    clock: ManualClock,
    live: CountingLiveness,
    actuator: RecordingActuator,
    battery_temp: EntityId,
    fans: EntityId,
    pump_a_cap: EntityId,
    pump_b_cap: EntityId,
    pump_b_guard: EntityId,
}

impl Harness {
    fn new() -> Self {
        let mut reg = Registry::new();
        let battery_temp = reg.add_sensor("Battery Temp").unwrap();
        reg.add_sensor("PV Current").unwrap();

        let fan_rule = reg
            .add_constraint(Constraint::threshold(
                "batteryHot",
                battery_temp,
                45.0,
                2.0,
                3.0,
                0,
            ))
            .unwrap();
        let fans = reg.add_device("Fan Bank 1", Some(fan_rule)).unwrap();
        reg.add_capability(fans, CapabilityKind::Toggle).unwrap();

        let pump_a = reg.add_device("Pump A", None).unwrap();
        let pump_b = reg.add_device("Pump B", None).unwrap();
        let pump_a_cap = reg.add_capability(pump_a, CapabilityKind::Toggle).unwrap();
        let pump_b_cap = reg.add_capability(pump_b, CapabilityKind::Toggle).unwrap();
        let pump_b_guard = reg
            .add_constraint(Constraint::simultaneous(
                pump_b_cap,
                &[pump_a_cap],
                1.0,
                2_000,
            ))
            .unwrap();
        reg.device_mut(pump_b).unwrap().constraint = Some(pump_b_guard);

        let store = CommandStore::open(MemoryMedium::new()).unwrap();
        Self {
            interp: CommandInterpreter::new(reg, store),
            clock: ManualClock::starting_at(1_000),
            live: CountingLiveness::default(),
            actuator: RecordingActuator::default(),
            battery_temp,
            fans,
            pump_a_cap,
            pump_b_cap,
            pump_b_guard,
        }
    }

    fn run(&mut self, script: &str) -> Vec<Response> {
        self.interp
            .execute(script, &self.clock, &mut self.live, &mut self.actuator)
    }

    /// One external polling-loop tick: deposit nothing, re-apply every
    /// device constraint unless paused.
    fn poll(&mut self) {
        let now = self.clock.now_ms();
        if !self.interp.ctx.is_paused(now) {
            let sync = self.interp.ctx.synchronizing;
            self.interp
                .registry
                .apply_all_constraints(now, sync, &mut self.actuator);
        }
    }
}

#[test]
fn boot_replay_matches_direct_execution() {
    let mut h = Harness::new();
    assert_eq!(h.run("SETUP ADD,GET,SENSORS")[0].code, RespCode::Ok);
    let direct = h.run("GET,SENSORS");
    let replayed = h.run("SETUP RUN");
    assert_eq!(replayed, direct);
}

#[test]
fn fan_follows_battery_temperature_with_hysteresis() {
    let mut h = Harness::new();

    h.interp.registry.record_reading(h.battery_temp, 48.0);
    h.poll();
    assert_eq!(h.actuator.events.last(), Some(&(h.fans, true)));

    // Inside the fail margin: no edge.
    let before = h.actuator.events.len();
    h.interp.registry.record_reading(h.battery_temp, 43.0);
    h.clock.advance(1_000);
    h.poll();
    assert_eq!(h.actuator.events.len(), before);

    h.interp.registry.record_reading(h.battery_temp, 41.0);
    h.clock.advance(1_000);
    h.poll();
    assert_eq!(h.actuator.events.last(), Some(&(h.fans, false)));
}

#[test]
fn pump_inrush_guard_blocks_back_to_back_switching() {
    let mut h = Harness::new();
    let rs = h.run("SET,DEVICES,Pump A,CAPABILITY/TOGGLE,ON");
    assert_eq!(rs[0].code, RespCode::Ok);
    assert_eq!(h.interp.registry.capability(h.pump_a_cap).unwrap().value, 1.0);

    // Within the window the guard trips for Pump B.
    h.clock.advance(500);
    assert!(h
        .interp
        .registry
        .test_constraint(h.pump_b_guard, h.clock.now_ms()));

    // Once the window passes it clears.
    h.clock.advance(5_000);
    assert!(!h
        .interp
        .registry
        .test_constraint(h.pump_b_guard, h.clock.now_ms()));
    assert_eq!(h.interp.registry.capability(h.pump_b_cap).unwrap().value, 0.0);
}

#[test]
fn replayed_script_does_not_trip_the_inrush_guard() {
    let mut h = Harness::new();
    h.run("SETUP ADD,SET,DEVICES,Pump A,CAPABILITY/TOGGLE,ON");
    h.run("SETUP RUN");
    assert_eq!(h.interp.registry.capability(h.pump_a_cap).unwrap().value, 1.0);
    h.clock.advance(100);
    assert!(!h
        .interp
        .registry
        .test_constraint(h.pump_b_guard, h.clock.now_ms()));
}

#[test]
fn set_on_unknown_device_leaves_everything_untouched() {
    let mut h = Harness::new();
    let rs = h.run("SET,DEVICE,42,CAPABILITY/TOGGLE,ON");
    assert_eq!(rs[0].code, RespCode::NotFound);
    for cap in h.interp.registry.capabilities() {
        assert_eq!(cap.value, 0.0);
    }
    assert!(h.actuator.events.is_empty());
}

#[test]
fn mixed_set_outcome_reports_success_when_any_entity_claims_the_key() {
    let mut h = Harness::new();
    // Every device matches '*'; all carry a Toggle, so all claim the key.
    let rs = h.run("SET,DEVICES,*,CAPABILITY/TOGGLE,ON");
    assert_eq!(rs[0].code, RespCode::Ok);
    let msg = rs[0].json["respMsg"].as_str().unwrap();
    assert!(msg.contains("Toggle 'Pump A'=1"));
    assert!(msg.contains("Toggle 'Pump B'=1"));
}

#[test]
fn include_and_exclude_filter_listings() {
    let mut h = Harness::new();
    let rs = h.run("INCLUDE DEVICES Pump*");
    let devices = rs[0].json["devices"].as_array().unwrap();
    assert_eq!(devices.len(), 2);

    let rs = h.run("EXCLUDE DEVICES Pump*");
    let devices = rs[0].json["devices"].as_array().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["name"], "Fan Bank 1");
}

#[test]
fn pause_gates_the_polling_loop_until_resume() {
    let mut h = Harness::new();
    h.interp.registry.record_reading(h.battery_temp, 48.0);

    h.run("PAUSE");
    h.poll();
    assert!(h.actuator.events.is_empty(), "paused loop must not actuate");

    h.run("RESUME");
    h.poll();
    assert_eq!(h.actuator.events.last(), Some(&(h.fans, true)));
}

#[test]
fn timed_pause_expires_on_its_own() {
    let mut h = Harness::new();
    h.interp.registry.record_reading(h.battery_temp, 48.0);
    h.run("PAUSE,2");
    h.poll();
    assert!(h.actuator.events.is_empty());

    h.clock.advance(2_500);
    h.poll();
    assert!(!h.actuator.events.is_empty());
}

#[test]
fn serial_settings_validate_and_latch_reset_notice() {
    let mut h = Harness::new();
    let rs = h.run("SETUP SET,SERIAL_CONFIG,8E1");
    assert_eq!(rs[0].code, RespCode::Ok);
    assert_eq!(
        rs[0].json["lastInfoMsg"],
        "Serial communication changes require a RESET."
    );

    let rs = h.run("SETUP SET,SERIAL_CONFIG,7E2");
    assert_eq!(rs[0].code, RespCode::InvalidArgument);

    // The latch was drained by the first envelope; it must not resurface.
    let rs = h.run("GET,SENSORS");
    assert!(rs[0].json.get("lastInfoMsg").is_none());
}

#[test]
fn settings_survive_the_store_medium() {
    let mut h = Harness::new();
    h.run("SETUP SET,SERIAL_SPEED,57600");
    h.run("SETUP SET,DEVICE_NAME,shed-east");
    h.run("SETUP ADD,GET,DEVICES");

    let rs = h.run("GET,EEPROM");
    let eeprom = &rs[0].json["eeprom"];
    assert_eq!(eeprom["serialSpeed"], 57_600);
    assert_eq!(eeprom["deviceName"], "shed-east");
    assert_eq!(eeprom["commandCount"], 1);
    assert_eq!(eeprom["commands"][0]["command"], "GET,DEVICES");
}

#[test]
fn verbose_listing_exposes_constraint_detail() {
    let mut h = Harness::new();
    let rs = h.run("VERBOSE GET,DEVICES");
    let fan = &rs[0].json["devices"][0];
    assert_eq!(fan["constraint"]["title"], "batteryHot");
    assert_eq!(fan["capabilities"][0]["type"], "Toggle");

    let rs = h.run("GET,DEVICES");
    let fan = &rs[0].json["devices"][0];
    assert_eq!(fan["constraint"]["state"], "FAILED");
    assert!(fan.get("capabilities").is_none());
}

#[test]
fn output_format_switches_rendering_at_runtime() {
    let mut h = Harness::new();
    let rs = h.run("SET,OUTPUT_FORMAT,JSON_PRETTY");
    assert_eq!(rs[0].code, RespCode::Ok);
    assert_eq!(h.interp.output_format, OutputFormat::JsonPretty);

    let rs = h.run("GET,OUTPUT_FORMAT");
    assert_eq!(rs[0].json["outputFormat"], "JSON_PRETTY");
    assert!(rs[0].render(h.interp.output_format).contains('\n'));
}

#[test]
fn reset_starves_the_watchdog_during_listings() {
    let mut h = Harness::new();
    h.run("GET,SENSORS");
    let feeds_before_reset = h.live.feeds;
    assert!(feeds_before_reset > 0);

    let rs = h.run("RESET");
    assert_eq!(rs[0].json["respMsg"], "Reset requested");
    assert!(h.interp.ctx.reset_requested());

    h.run("GET,SENSORS");
    assert_eq!(h.live.feeds, feeds_before_reset, "no feeding after RESET");
}

#[test]
fn constraint_mode_override_forces_the_fan_on() {
    let mut h = Harness::new();
    h.interp.registry.record_reading(h.battery_temp, 20.0);
    h.poll();
    assert_eq!(h.actuator.events.last(), Some(&(h.fans, false)));

    let rs = h.run("SET,CONSTRAINTS,batteryHot,MODE,FORCE_PASS");
    assert_eq!(rs[0].code, RespCode::Ok);
    h.poll();
    assert_eq!(h.actuator.events.last(), Some(&(h.fans, true)));

    let rs = h.run("SET,CONSTRAINTS,batteryHot,MODE,AUTO");
    assert_eq!(rs[0].code, RespCode::Ok);
    h.poll();
    assert_eq!(h.actuator.events.last(), Some(&(h.fans, false)));
}

#[test]
fn batched_lines_share_one_transport_write() {
    let mut h = Harness::new();
    let rs = h.run("GET,SENSORS;GET,DEVICES;GET,CONSTRAINTS");
    assert_eq!(rs.len(), 3);
    assert!(rs.iter().all(|r| r.code.is_ok()));
}
