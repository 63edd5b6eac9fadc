//! Device entities and constraint application.
//!
//! A device is an actuation endpoint: a name, an optional governing
//! constraint, and the capabilities it exposes.  The registry never touches
//! hardware itself; [`Registry::apply_constraint`] evaluates the governing
//! rule and reports edges through the [`DeviceActuator`] port, so the same
//! model drives relays in production and a recording stub in tests.

use heapless::Vec as HVec;

use super::constraint::{parse_bool, ConstraintMode};
use super::{EntityId, Registry, SetOutcome};
use crate::pattern;
use crate::ports::DeviceActuator;

/// Most capabilities a single device can expose.
pub const CAPABILITIES_MAX: usize = 8;

/// An actuation endpoint governed by an optional constraint.
#[derive(Debug, Clone)]
pub struct Device {
    pub id: EntityId,
    pub name: String,
    pub constraint: Option<EntityId>,
    pub capabilities: HVec<EntityId, CAPABILITIES_MAX>,
    /// Verdict last pushed to the actuator; `None` until the first apply,
    /// so the initial evaluation always reaches the hardware.
    pub last_applied: Option<bool>,
}

impl Device {
    pub(super) fn new(id: EntityId, name: String, constraint: Option<EntityId>) -> Self {
        Self {
            id,
            name,
            constraint,
            capabilities: HVec::new(),
            last_applied: None,
        }
    }
}

impl Registry {
    /// Evaluate a device's governing constraint and push the verdict to the
    /// actuator.
    ///
    /// With `ignore_same_state`, the actuator only hears about edges (and
    /// the very first verdict); without it, every evaluation is pushed.
    /// During a bulk state replay (`synchronizing`) devices governed by
    /// event detectors are skipped entirely, since replayed history must
    /// not re-trigger them.
    ///
    /// Returns the verdict, or `None` when nothing was evaluated.
    pub fn apply_constraint(
        &mut self,
        device: EntityId,
        ignore_same_state: bool,
        now_ms: u64,
        synchronizing: bool,
        actuator: &mut impl DeviceActuator,
    ) -> Option<bool> {
        let dev = self.device(device)?;
        let constraint = dev.constraint?;
        if synchronizing && !self.constraint(constraint)?.is_synchronizable() {
            return None;
        }
        let passed = self.test_constraint(constraint, now_ms);
        self.push_verdict(device, passed, ignore_same_state, actuator);
        Some(passed)
    }

    /// Apply every device's constraint in registration order.  The main
    /// control loop calls this once per tick after depositing readings.
    pub fn apply_all_constraints(
        &mut self,
        now_ms: u64,
        synchronizing: bool,
        actuator: &mut impl DeviceActuator,
    ) {
        let devices: Vec<EntityId> = self.devices().iter().map(|d| d.id).collect();
        for id in devices {
            self.apply_constraint(id, true, now_ms, synchronizing, actuator);
        }
    }

    fn push_verdict(
        &mut self,
        device: EntityId,
        passed: bool,
        ignore_same_state: bool,
        actuator: &mut impl DeviceActuator,
    ) {
        let Some(dev) = self.device_mut(device) else {
            return;
        };
        let changed = dev.last_applied != Some(passed);
        dev.last_applied = Some(passed);
        if changed || !ignore_same_state {
            let name = dev.name.clone();
            actuator.on_constraint_result_changed(device, &name, passed);
        }
    }

    /// Attribute dispatch for devices.  Compound keys address the parts:
    /// `CONSTRAINT/MODE`, `CONSTRAINT/PASSED`, `CAPABILITY/<kind pattern>`.
    #[allow(clippy::too_many_arguments)]
    pub fn set_device_attribute(
        &mut self,
        device: EntityId,
        key: &str,
        value: &str,
        now_ms: u64,
        synchronizing: bool,
        actuator: &mut impl DeviceActuator,
        resp: &mut String,
    ) -> SetOutcome {
        if self.device(device).is_none() {
            return SetOutcome::Ignored;
        }

        if key.eq_ignore_ascii_case("name") {
            if let Some(dev) = self.device_mut(device) {
                dev.name = value.to_string();
            }
            resp.push_str(&format!("'{value}' {key}={value}"));
            return SetOutcome::Ok;
        }

        let (head, tail) = match key.split_once('/') {
            Some((h, t)) => (h, t),
            None => (key, ""),
        };

        if head.eq_ignore_ascii_case("constraint") {
            return self.set_device_constraint_attr(
                device,
                tail,
                value,
                now_ms,
                synchronizing,
                actuator,
                resp,
            );
        }
        if head.eq_ignore_ascii_case("capability") {
            return self.set_device_capability_attr(
                device,
                tail,
                value,
                now_ms,
                synchronizing,
                resp,
            );
        }
        SetOutcome::Ignored
    }

    #[allow(clippy::too_many_arguments)]
    fn set_device_constraint_attr(
        &mut self,
        device: EntityId,
        key: &str,
        value: &str,
        now_ms: u64,
        synchronizing: bool,
        actuator: &mut impl DeviceActuator,
        resp: &mut String,
    ) -> SetOutcome {
        let Some(constraint) = self.device(device).and_then(|d| d.constraint) else {
            resp.push_str("Device has no constraint");
            return SetOutcome::Error;
        };

        if key.eq_ignore_ascii_case("mode") {
            let Some(mode) = ConstraintMode::parse(value) else {
                resp.push_str(&format!(
                    "Expected AUTO|FORCE_PASS|FORCE_FAIL but found: {value}"
                ));
                return SetOutcome::Error;
            };
            if let Some(c) = self.constraint_mut(constraint) {
                c.mode = mode;
            }
            // Re-apply so a forced mode takes effect immediately.
            self.apply_constraint(device, true, now_ms, synchronizing, actuator);
            let name = self.device(device).map(|d| d.name.clone()).unwrap_or_default();
            resp.push_str(&format!("'{name}' constraint mode={}", mode.as_str()));
            return SetOutcome::Ok;
        }
        if key.eq_ignore_ascii_case("passed") {
            let Some(passed) = parse_bool(value) else {
                resp.push_str(&format!("Expected TRUE|FALSE but found: {value}"));
                return SetOutcome::Error;
            };
            // Override the cached verdict and push it straight through,
            // without re-evaluating (a re-test would undo the override).
            if let Some(c) = self.constraint_mut(constraint) {
                c.force_result(passed);
            }
            self.push_verdict(device, passed, true, actuator);
            let name = self.device(device).map(|d| d.name.clone()).unwrap_or_default();
            resp.push_str(&format!("'{name}' constraint passed={passed}"));
            return SetOutcome::Ok;
        }
        SetOutcome::Ignored
    }

    fn set_device_capability_attr(
        &mut self,
        device: EntityId,
        kind_pattern: &str,
        value: &str,
        now_ms: u64,
        synchronizing: bool,
        resp: &mut String,
    ) -> SetOutcome {
        let caps: Vec<EntityId> = self
            .device(device)
            .map(|d| d.capabilities.iter().copied().collect())
            .unwrap_or_default();
        let pattern = if kind_pattern.is_empty() { "*" } else { kind_pattern };

        let mut matched = 0usize;
        let mut failed = false;
        for cap in caps {
            let kind_name = match self.capability(cap) {
                Some(c) => c.kind.as_str(),
                None => continue,
            };
            if !pattern::matches(pattern, kind_name) {
                continue;
            }
            matched += 1;
            if self.set_capability_value_str(cap, value, now_ms, synchronizing) {
                if !resp.is_empty() {
                    resp.push_str(", ");
                }
                let level = self.capability(cap).map_or(0.0, |c| c.value);
                resp.push_str(&format!("{}={}", self.capability_title(cap), level));
            } else {
                failed = true;
            }
        }
        if matched == 0 {
            SetOutcome::Ignored
        } else if failed {
            resp.push_str(&format!(" Rejected value '{value}'"));
            SetOutcome::Error
        } else {
            SetOutcome::Ok
        }
    }
}
