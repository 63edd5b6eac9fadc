//! Sensor entities.
//!
//! Raw acquisition (ADC reads, retry-on-NaN, averaging) happens outside the
//! core; the polling loop deposits each fresh reading here and the rule
//! engine evaluates against the cached value.

use super::{EntityId, Registry, SetOutcome};

/// A named measurement source with its latest reading.
#[derive(Debug, Clone)]
pub struct Sensor {
    pub id: EntityId,
    pub name: String,
    /// Most recent reading; NaN until the first deposit.
    pub value: f32,
}

impl Sensor {
    pub(super) fn new(id: EntityId, name: String) -> Self {
        Self {
            id,
            name,
            value: f32::NAN,
        }
    }
}

impl Registry {
    /// Deposit a fresh reading from the external acquisition loop.
    pub fn record_reading(&mut self, sensor: EntityId, value: f32) {
        if let Some(s) = self.sensor_mut(sensor) {
            s.value = value;
        }
    }

    /// Attribute dispatch for sensors: only the generic rename is handled.
    pub fn set_sensor_attribute(
        &mut self,
        sensor: EntityId,
        key: &str,
        value: &str,
        resp: &mut String,
    ) -> SetOutcome {
        let Some(s) = self.sensor_mut(sensor) else {
            return SetOutcome::Ignored;
        };
        if key.eq_ignore_ascii_case("name") {
            s.name = value.to_string();
            resp.push_str(&format!("'{}' {key}={value}", s.name));
            SetOutcome::Ok
        } else {
            SetOutcome::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_starts_unset() {
        let mut reg = Registry::new();
        let id = reg.add_sensor("PV Current").unwrap();
        assert!(reg.sensor(id).unwrap().value.is_nan());
        reg.record_reading(id, 12.5);
        assert_eq!(reg.sensor(id).unwrap().value, 12.5);
    }

    #[test]
    fn rename_through_attribute() {
        let mut reg = Registry::new();
        let id = reg.add_sensor("PV Current").unwrap();
        let mut resp = String::new();
        let out = reg.set_sensor_attribute(id, "NAME", "Array Current", &mut resp);
        assert_eq!(out, SetOutcome::Ok);
        assert_eq!(reg.sensor(id).unwrap().name, "Array Current");
        assert!(resp.contains("Array Current"));
    }

    #[test]
    fn unknown_key_is_ignored() {
        let mut reg = Registry::new();
        let id = reg.add_sensor("PV Current").unwrap();
        let mut resp = String::new();
        assert_eq!(
            reg.set_sensor_attribute(id, "GAIN", "2", &mut resp),
            SetOutcome::Ignored
        );
        assert!(resp.is_empty());
    }
}
