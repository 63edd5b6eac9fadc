//! Capability entities — the settable quantities a device exposes.
//!
//! Every mutation routes through [`Registry::set_capability_value`], which
//! notifies interested listeners (simultaneous-event detectors) synchronously
//! after the value is committed and before returning to the caller.  Listener
//! effects never roll back the value.

use log::warn;

use super::{EntityId, Registry, SetOutcome};

/// What kind of quantity the capability is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    /// Binary output: only 0 and 1 are in domain.
    Toggle,
    /// Continuous output: any finite value is in domain.
    Dial,
}

impl CapabilityKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Toggle => "Toggle",
            Self::Dial => "Dial",
        }
    }
}

/// A named numeric quantity owned by a device.
#[derive(Debug, Clone)]
pub struct Capability {
    pub id: EntityId,
    pub owner: EntityId,
    pub kind: CapabilityKind,
    pub value: f64,
}

impl Capability {
    pub(super) fn new(id: EntityId, owner: EntityId, kind: CapabilityKind) -> Self {
        Self {
            id,
            owner,
            kind,
            value: 0.0,
        }
    }

    pub fn as_bool(&self) -> bool {
        self.value != 0.0
    }

    /// Whether `value` is inside this capability's domain.
    fn accepts(&self, value: f64) -> bool {
        match self.kind {
            CapabilityKind::Toggle => value == 0.0 || value == 1.0,
            CapabilityKind::Dial => value.is_finite(),
        }
    }
}

/// Parse a capability level: a float, or the case-insensitive conveniences
/// `ON` → 1 and `OFF` → 0.
pub fn parse_level(text: &str) -> Option<f64> {
    if text.eq_ignore_ascii_case("ON") {
        return Some(1.0);
    }
    if text.eq_ignore_ascii_case("OFF") {
        return Some(0.0);
    }
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl Registry {
    /// Set a capability's numeric value.
    ///
    /// Returns `false` (and leaves the value untouched) if the capability is
    /// unknown or the value is outside its domain.  On success, listeners
    /// are notified synchronously before returning — unless a bulk state
    /// replay is in progress (`synchronizing`), in which case notifications
    /// are suppressed so replay cannot spuriously arm event detectors.
    pub fn set_capability_value(
        &mut self,
        capability: EntityId,
        value: f64,
        now_ms: u64,
        synchronizing: bool,
    ) -> bool {
        let Some(cap) = self.capability_mut(capability) else {
            return false;
        };
        if !cap.accepts(value) {
            return false;
        }
        cap.value = value;
        if !synchronizing {
            self.note_capability_event(capability, value, now_ms);
        }
        true
    }

    /// String form of [`set_capability_value`]: parses a float or `ON`/`OFF`.
    /// Unparsable input fails without mutating state.
    pub fn set_capability_value_str(
        &mut self,
        capability: EntityId,
        text: &str,
        now_ms: u64,
        synchronizing: bool,
    ) -> bool {
        match parse_level(text) {
            Some(value) => self.set_capability_value(capability, value, now_ms, synchronizing),
            None => {
                warn!("capability {capability}: cannot parse '{text}' as a level");
                false
            }
        }
    }

    /// Attribute dispatch for capabilities: `VALUE` sets the level.
    pub fn set_capability_attribute(
        &mut self,
        capability: EntityId,
        key: &str,
        value: &str,
        now_ms: u64,
        synchronizing: bool,
        resp: &mut String,
    ) -> SetOutcome {
        if !key.eq_ignore_ascii_case("value") {
            return SetOutcome::Ignored;
        }
        if self.set_capability_value_str(capability, value, now_ms, synchronizing) {
            let level = self.capability(capability).map_or(0.0, |c| c.value);
            resp.push_str(&format!("{}={}", self.capability_title(capability), level));
            SetOutcome::Ok
        } else {
            resp.push_str(&format!("Rejected value '{value}'"));
            SetOutcome::Error
        }
    }
}
