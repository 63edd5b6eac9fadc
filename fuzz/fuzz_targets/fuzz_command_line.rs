//! Fuzz target: `CommandInterpreter::execute`
//!
//! Drives arbitrary text through the protocol front-end and asserts that
//! it never panics and that every non-empty line resolves to a well-formed
//! envelope carrying a `respCode`.
//!
//! cargo fuzz run fuzz_command_line

#![no_main]

use libfuzzer_sys::fuzz_target;
use powerbox::interp::CommandInterpreter;
use powerbox::ports::{CountingLiveness, ManualClock, RecordingActuator};
use powerbox::registry::{CapabilityKind, Constraint, Registry};
use powerbox::store::{CommandStore, MemoryMedium};

fuzz_target!(|data: &[u8]| {
    let Ok(script) = core::str::from_utf8(data) else {
        return;
    };

    let mut reg = Registry::new();
    let s = reg.add_sensor("Battery Temp").unwrap();
    let c = reg
        .add_constraint(Constraint::threshold("batteryHot", s, 45.0, 2.0, 3.0, 0))
        .unwrap();
    let d = reg.add_device("Fan Bank 1", Some(c)).unwrap();
    reg.add_capability(d, CapabilityKind::Toggle).unwrap();

    let store = CommandStore::open(MemoryMedium::new()).unwrap();
    let mut interp = CommandInterpreter::new(reg, store);

    let clock = ManualClock::starting_at(1_000);
    let mut live = CountingLiveness::default();
    let mut act = RecordingActuator::default();

    for resp in interp.execute(script, &clock, &mut live, &mut act) {
        assert!(resp.json.get("respCode").is_some(), "envelope without code");
        // Rendering must never fail either, in either format.
        let _ = resp.render(interp.output_format);
    }
});
