//! Entity registry — the live model the rule engine acts on.
//!
//! One arena per entity kind (sensors, devices, constraints, capabilities),
//! each with its own sequential id space.  Ids are small non-zero integers
//! handed out at registration time and never reused: devices are created at
//! startup configuration and mutated, never deleted, so `id == index + 1`
//! holds for the life of the process.
//!
//! Cross-entity references (a device's constraint, a composite's children, a
//! simultaneous detector's capability group) are stored as ids rather than
//! pointers, so the whole model is a plain owned value: trivially testable,
//! no interior mutability, no lifetime web.

pub mod capability;
pub mod constraint;
pub mod device;
pub mod sensor;

pub use capability::{Capability, CapabilityKind};
pub use constraint::{Constraint, ConstraintKind, ConstraintMode, JoinOp};
pub use device::Device;
pub use sensor::Sensor;

use core::fmt;

use crate::pattern;

/// Entity identifier: `1..=ID_MAX`, unique within its registry.
/// 0 means "unassigned" and is represented as `Option<EntityId>` throughout.
pub type EntityId = u8;

/// Upper bound on ids per registry.
pub const ID_MAX: u8 = 255;

/// A registry reached its id ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryFull;

impl fmt::Display for RegistryFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registry full (max {ID_MAX} entities)")
    }
}

impl std::error::Error for RegistryFull {}

/// Outcome of one `set_attribute` dispatch step.
///
/// `Ignored` means "this handler does not claim the key" — the chain of
/// responsibility moves on (or the caller reports the key as unknown).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Ignored,
    Ok,
    Error,
}

/// Entity nouns the protocol can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Sensor,
    Device,
    Constraint,
    Capability,
}

impl EntityKind {
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Device => "device",
            Self::Constraint => "constraint",
            Self::Capability => "capability",
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Registry
// ───────────────────────────────────────────────────────────────

/// Arena of all live entities.
#[derive(Debug, Default)]
pub struct Registry {
    sensors: Vec<Sensor>,
    devices: Vec<Device>,
    constraints: Vec<Constraint>,
    capabilities: Vec<Capability>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration (startup wiring) ─────────────────────────

    pub fn add_sensor(&mut self, name: impl Into<String>) -> Result<EntityId, RegistryFull> {
        let id = Self::next_id(self.sensors.len())?;
        self.sensors.push(Sensor::new(id, name.into()));
        Ok(id)
    }

    /// Register a constraint built by one of the [`Constraint`] constructors.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<EntityId, RegistryFull> {
        let id = Self::next_id(self.constraints.len())?;
        let mut constraint = constraint;
        constraint.id = id;
        self.constraints.push(constraint);
        Ok(id)
    }

    pub fn add_device(
        &mut self,
        name: impl Into<String>,
        constraint: Option<EntityId>,
    ) -> Result<EntityId, RegistryFull> {
        let id = Self::next_id(self.devices.len())?;
        self.devices.push(Device::new(id, name.into(), constraint));
        Ok(id)
    }

    /// Register a capability owned by `device` and link it into the device's
    /// capability list.
    pub fn add_capability(
        &mut self,
        device: EntityId,
        kind: CapabilityKind,
    ) -> Result<EntityId, RegistryFull> {
        let id = Self::next_id(self.capabilities.len())?;
        // Link into the owner first: a full capability list must not leave
        // an unowned entity behind in the arena.
        if let Some(dev) = self.device_mut(device) {
            dev.capabilities.push(id).map_err(|_| RegistryFull)?;
        }
        self.capabilities.push(Capability::new(id, device, kind));
        Ok(id)
    }

    fn next_id(len: usize) -> Result<EntityId, RegistryFull> {
        if len >= ID_MAX as usize {
            return Err(RegistryFull);
        }
        Ok((len + 1) as EntityId)
    }

    // ── Lookup ────────────────────────────────────────────────

    pub fn sensor(&self, id: EntityId) -> Option<&Sensor> {
        self.sensors.get(Self::index(id)?)
    }

    pub fn sensor_mut(&mut self, id: EntityId) -> Option<&mut Sensor> {
        self.sensors.get_mut(Self::index(id)?)
    }

    pub fn device(&self, id: EntityId) -> Option<&Device> {
        self.devices.get(Self::index(id)?)
    }

    pub fn device_mut(&mut self, id: EntityId) -> Option<&mut Device> {
        self.devices.get_mut(Self::index(id)?)
    }

    pub fn constraint(&self, id: EntityId) -> Option<&Constraint> {
        self.constraints.get(Self::index(id)?)
    }

    pub fn constraint_mut(&mut self, id: EntityId) -> Option<&mut Constraint> {
        self.constraints.get_mut(Self::index(id)?)
    }

    pub fn capability(&self, id: EntityId) -> Option<&Capability> {
        self.capabilities.get(Self::index(id)?)
    }

    pub fn capability_mut(&mut self, id: EntityId) -> Option<&mut Capability> {
        self.capabilities.get_mut(Self::index(id)?)
    }

    fn index(id: EntityId) -> Option<usize> {
        (id > 0).then(|| (id - 1) as usize)
    }

    // ── Iteration ─────────────────────────────────────────────

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    // ── Titles ────────────────────────────────────────────────

    /// Title of any entity, for name-based selection and listings.
    pub fn title(&self, kind: EntityKind, id: EntityId) -> Option<String> {
        match kind {
            EntityKind::Sensor => self.sensor(id).map(|s| s.name.clone()),
            EntityKind::Device => self.device(id).map(|d| d.name.clone()),
            EntityKind::Constraint => self.constraint(id).map(|_| self.constraint_title(id)),
            EntityKind::Capability => self.capability(id).map(|_| self.capability_title(id)),
        }
    }

    /// `"<Kind> '<owner device name>'"`, e.g. `Toggle 'Fan Bank 1'`.
    pub fn capability_title(&self, id: EntityId) -> String {
        let Some(cap) = self.capability(id) else {
            return String::new();
        };
        let owner = self
            .device(cap.owner)
            .map(|d| d.name.as_str())
            .unwrap_or_default();
        format!("{} '{}'", cap.kind.as_str(), owner)
    }

    // ── Selection ─────────────────────────────────────────────

    /// Ids of all entities of `kind`, in registration order.
    pub fn ids(&self, kind: EntityKind) -> Vec<EntityId> {
        match kind {
            EntityKind::Sensor => self.sensors.iter().map(|s| s.id).collect(),
            EntityKind::Device => self.devices.iter().map(|d| d.id).collect(),
            EntityKind::Constraint => self.constraints.iter().map(|c| c.id).collect(),
            EntityKind::Capability => self.capabilities.iter().map(|c| c.id).collect(),
        }
    }

    /// Filter `kind` by title against a comma-separated wildcard list.
    /// `include` keeps matches; `!include` drops them.  An empty pattern
    /// list behaves as `"*"`.
    pub fn filter_by_title(&self, kind: EntityKind, patterns: &str, include: bool) -> Vec<EntityId> {
        let patterns = if patterns.is_empty() { "*" } else { patterns };
        self.ids(kind)
            .into_iter()
            .filter(|&id| {
                let title = self.title(kind, id).unwrap_or_default();
                pattern::matches_any_csv(patterns, &title) == include
            })
            .collect()
    }

    /// All entities of `kind` with exactly this id (zero or one in practice;
    /// the vector shape mirrors the lookup-error contract of the protocol).
    pub fn find_by_id(&self, kind: EntityKind, id: EntityId) -> Vec<EntityId> {
        self.ids(kind).into_iter().filter(|&e| e == id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Registry {
        let mut reg = Registry::new();
        let s = reg.add_sensor("Battery Temp").unwrap();
        let c = reg
            .add_constraint(Constraint::threshold("minTemp", s, 100.0, 5.0, 5.0, 0))
            .unwrap();
        let d1 = reg.add_device("Fan Bank 1", Some(c)).unwrap();
        let d2 = reg.add_device("Fan Bank 2", None).unwrap();
        reg.add_capability(d1, CapabilityKind::Toggle).unwrap();
        reg.add_capability(d2, CapabilityKind::Toggle).unwrap();
        reg
    }

    #[test]
    fn ids_are_sequential_from_one() {
        let reg = sample();
        assert_eq!(reg.ids(EntityKind::Device), vec![1, 2]);
        assert_eq!(reg.ids(EntityKind::Capability), vec![1, 2]);
        assert_eq!(reg.sensor(1).unwrap().name, "Battery Temp");
        assert!(reg.sensor(0).is_none());
        assert!(reg.sensor(9).is_none());
    }

    #[test]
    fn capability_registration_links_owner() {
        let reg = sample();
        let dev = reg.device(1).unwrap();
        assert_eq!(dev.capabilities.as_slice(), &[1]);
        assert_eq!(reg.capability(1).unwrap().owner, 1);
    }

    #[test]
    fn full_capability_list_rejects_without_orphaning() {
        let mut reg = Registry::new();
        let d = reg.add_device("Hub", None).unwrap();
        for _ in 0..device::CAPABILITIES_MAX {
            reg.add_capability(d, CapabilityKind::Toggle).unwrap();
        }
        assert_eq!(
            reg.add_capability(d, CapabilityKind::Toggle),
            Err(RegistryFull)
        );
        assert_eq!(reg.capabilities().len(), device::CAPABILITIES_MAX);
        assert_eq!(
            reg.device(d).unwrap().capabilities.len(),
            device::CAPABILITIES_MAX
        );
    }

    #[test]
    fn capability_title_names_owner() {
        let reg = sample();
        assert_eq!(reg.capability_title(1), "Toggle 'Fan Bank 1'");
    }

    #[test]
    fn filter_include_and_exclude() {
        let reg = sample();
        let kept = reg.filter_by_title(EntityKind::Device, "fan*", true);
        assert_eq!(kept, vec![1, 2]);
        let kept = reg.filter_by_title(EntityKind::Device, "*2", true);
        assert_eq!(kept, vec![2]);
        let dropped = reg.filter_by_title(EntityKind::Device, "*2", false);
        assert_eq!(dropped, vec![1]);
    }

    #[test]
    fn empty_pattern_means_everything() {
        let reg = sample();
        assert_eq!(reg.filter_by_title(EntityKind::Device, "", true).len(), 2);
        assert!(reg.filter_by_title(EntityKind::Device, "", false).is_empty());
    }

    #[test]
    fn csv_patterns_union() {
        let reg = sample();
        let kept = reg.filter_by_title(EntityKind::Device, "*1,*2", true);
        assert_eq!(kept, vec![1, 2]);
    }

    #[test]
    fn find_by_id_is_singleton_or_empty() {
        let reg = sample();
        assert_eq!(reg.find_by_id(EntityKind::Device, 2), vec![2]);
        assert!(reg.find_by_id(EntityKind::Device, 42).is_empty());
    }
}
