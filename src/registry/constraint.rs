//! Constraint engine — the rule-evaluation state machine.
//!
//! A constraint answers one question, `test() -> bool`, and never fails: an
//! unreadable input simply retains the previous verdict.  Four kinds:
//!
//! - **Threshold** — hysteresis around a nominal threshold with independent
//!   pass/fail margins, plus a minimum hold time that suppresses chatter;
//! - **Composite** — AND/OR over child constraints, optionally
//!   short-circuiting (children after the cutoff observe no sample);
//! - **Simultaneous** — armed by capability change events, passes while two
//!   *different* group members reached the target level within a short
//!   window (used to stagger high-inrush relay activations);
//! - **Constant** — fixed PASS/FAIL, the safe default before real wiring.
//!
//! All kinds share a mode override: `FORCE_PASS`/`FORCE_FAIL` freeze the
//! returned verdict while the recorded state keeps following it, so a later
//! return to `AUTO` resumes from a consistent place.
//!
//! Timing uses the wrapping monotonic clock: every interval check is
//! `now.wrapping_sub(then) <= window`, never an absolute deadline.

#![allow(clippy::float_cmp)] // target-level comparisons are exact by contract

use heapless::Vec as HVec;

use super::{EntityId, Registry, SetOutcome};

/// Most children a composite can hold / members a detector group can watch.
pub const GROUP_MAX: usize = 8;

/// Evaluation override mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstraintMode {
    #[default]
    Auto,
    ForcePass,
    ForceFail,
}

impl ConstraintMode {
    pub fn parse(text: &str) -> Option<Self> {
        if text.eq_ignore_ascii_case("AUTO") {
            Some(Self::Auto)
        } else if text.eq_ignore_ascii_case("FORCE_PASS") {
            Some(Self::ForcePass)
        } else if text.eq_ignore_ascii_case("FORCE_FAIL") {
            Some(Self::ForceFail)
        } else {
            None
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::ForcePass => "FORCE_PASS",
            Self::ForceFail => "FORCE_FAIL",
        }
    }
}

/// Join operator for composite constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOp {
    And,
    Or,
}

impl JoinOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Kind-specific state.
#[derive(Debug, Clone)]
pub enum ConstraintKind {
    Constant {
        value: bool,
    },
    Threshold {
        sensor: EntityId,
        threshold: f32,
        /// Pass when previously failed and `value >= threshold + pass_margin`.
        pass_margin: f32,
        /// Fail when previously passed and `value <= threshold - fail_margin`.
        fail_margin: f32,
        /// A fresh transition is only accepted once the current state has
        /// been held at least this long.
        min_hold_ms: u64,
        last_transition_ms: Option<u64>,
    },
    Composite {
        op: JoinOp,
        short_circuit: bool,
        children: HVec<EntityId, GROUP_MAX>,
    },
    Simultaneous {
        /// The capability whose activation this constraint guards.
        primary: EntityId,
        /// Other group members whose events arm the detector.
        group: HVec<EntityId, GROUP_MAX>,
        /// Level that counts as an occurrence (1 = ON, 0 = OFF).
        target_value: f64,
        max_interval_ms: u64,
        last_pass_ms: Option<u64>,
        last_pass_capability: Option<EntityId>,
    },
}

/// A rule with shared mode/verdict state and kind-specific behaviour.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub id: EntityId,
    pub name: String,
    pub mode: ConstraintMode,
    pub last_passed: bool,
    pub kind: ConstraintKind,
}

impl Constraint {
    fn with_kind(name: impl Into<String>, kind: ConstraintKind) -> Self {
        Self {
            id: 0, // assigned at registration
            name: name.into(),
            mode: ConstraintMode::Auto,
            last_passed: false,
            kind,
        }
    }

    /// Fixed PASS or FAIL.
    pub fn constant(value: bool) -> Self {
        Self::with_kind(if value { "PASS" } else { "FAIL" }, ConstraintKind::Constant { value })
    }

    /// Hysteresis threshold over a sensor reading.
    pub fn threshold(
        name: impl Into<String>,
        sensor: EntityId,
        threshold: f32,
        pass_margin: f32,
        fail_margin: f32,
        min_hold_ms: u64,
    ) -> Self {
        Self::with_kind(
            name,
            ConstraintKind::Threshold {
                sensor,
                threshold,
                pass_margin,
                fail_margin,
                min_hold_ms,
                last_transition_ms: None,
            },
        )
    }

    /// AND/OR composition of existing constraints.
    pub fn composite(op: JoinOp, short_circuit: bool, children: &[EntityId]) -> Self {
        let mut kids = HVec::new();
        for &c in children.iter().take(GROUP_MAX) {
            let _ = kids.push(c);
        }
        Self::with_kind(
            op.as_str().to_lowercase(),
            ConstraintKind::Composite {
                op,
                short_circuit,
                children: kids,
            },
        )
    }

    /// Simultaneous-event detector guarding `primary`, armed by the other
    /// members of `group` reaching `target_value`.
    pub fn simultaneous(
        primary: EntityId,
        group: &[EntityId],
        target_value: f64,
        max_interval_ms: u64,
    ) -> Self {
        let mut members = HVec::new();
        for &c in group.iter().take(GROUP_MAX) {
            let _ = members.push(c);
        }
        Self::with_kind(
            "Simultaneous",
            ConstraintKind::Simultaneous {
                primary,
                group: members,
                target_value,
                max_interval_ms,
                last_pass_ms: None,
                last_pass_capability: None,
            },
        )
    }

    /// Whether this constraint may be evaluated during a bulk state replay.
    /// Event detectors must not re-arm from replayed state changes.
    pub const fn is_synchronizable(&self) -> bool {
        !matches!(self.kind, ConstraintKind::Simultaneous { .. })
    }

    /// Override the cached verdict without re-evaluating.
    pub fn force_result(&mut self, passed: bool) {
        self.last_passed = passed;
    }
}

/// Parse a protocol boolean: TRUE/FALSE, ON/OFF, 1/0 (case-insensitive).
pub fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("TRUE") || text.eq_ignore_ascii_case("ON") || text == "1" {
        Some(true)
    } else if text.eq_ignore_ascii_case("FALSE") || text.eq_ignore_ascii_case("OFF") || text == "0"
    {
        Some(false)
    } else {
        None
    }
}

// ───────────────────────────────────────────────────────────────
// Evaluation
// ───────────────────────────────────────────────────────────────

impl Registry {
    /// Evaluate a constraint and record its verdict.
    ///
    /// Never fails: an unknown id or unreadable sensor retains the prior
    /// verdict.  Forced modes return the forced value immediately (and
    /// record it, so AUTO resumption starts from the forced state).
    pub fn test_constraint(&mut self, id: EntityId, now_ms: u64) -> bool {
        let Some(c) = self.constraint(id) else {
            return false;
        };
        match c.mode {
            ConstraintMode::ForcePass => {
                self.record_verdict(id, true);
                return true;
            }
            ConstraintMode::ForceFail => {
                self.record_verdict(id, false);
                return false;
            }
            ConstraintMode::Auto => {}
        }

        let prior = c.last_passed;
        let kind = c.kind.clone();
        let verdict = match kind {
            ConstraintKind::Constant { value } => value,

            ConstraintKind::Threshold {
                sensor,
                threshold,
                pass_margin,
                fail_margin,
                min_hold_ms,
                last_transition_ms,
            } => {
                let value = self.sensor(sensor).map_or(f32::NAN, |s| s.value);
                // NaN fails both comparisons, retaining the prior verdict.
                let candidate = if !prior && value >= threshold + pass_margin {
                    Some(true)
                } else if prior && value <= threshold - fail_margin {
                    Some(false)
                } else {
                    None
                };
                match candidate {
                    Some(next) if hold_elapsed(last_transition_ms, min_hold_ms, now_ms) => {
                        if let Some(cm) = self.constraint_mut(id) {
                            if let ConstraintKind::Threshold {
                                last_transition_ms, ..
                            } = &mut cm.kind
                            {
                                *last_transition_ms = Some(now_ms);
                            }
                        }
                        next
                    }
                    _ => prior,
                }
            }

            ConstraintKind::Composite {
                op,
                short_circuit,
                children,
            } => {
                let mut result = matches!(op, JoinOp::And);
                for &child in &children {
                    let v = self.test_constraint(child, now_ms);
                    result = match op {
                        JoinOp::And => result && v,
                        JoinOp::Or => result || v,
                    };
                    let determined = match op {
                        JoinOp::And => !result,
                        JoinOp::Or => result,
                    };
                    if short_circuit && determined {
                        break;
                    }
                }
                result
            }

            ConstraintKind::Simultaneous {
                primary,
                target_value,
                max_interval_ms,
                last_pass_ms,
                last_pass_capability,
                ..
            } => {
                let primary_at_target = self
                    .capability(primary)
                    .is_some_and(|c| c.value == target_value);
                match (last_pass_ms, last_pass_capability) {
                    (Some(then), Some(cap)) => {
                        !primary_at_target
                            && cap != primary
                            && now_ms.wrapping_sub(then) <= max_interval_ms
                    }
                    _ => false,
                }
            }
        };
        self.record_verdict(id, verdict);
        verdict
    }

    fn record_verdict(&mut self, id: EntityId, passed: bool) {
        if let Some(c) = self.constraint_mut(id) {
            c.last_passed = passed;
        }
    }

    /// Capability change notification: arm any simultaneous detector whose
    /// group contains the capability, when the new level hits its target.
    /// Called by `set_capability_value` after the value is committed (never
    /// during a bulk replay).
    pub(super) fn note_capability_event(&mut self, capability: EntityId, value: f64, now_ms: u64) {
        for c in &mut self.constraints {
            if let ConstraintKind::Simultaneous {
                group,
                target_value,
                last_pass_ms,
                last_pass_capability,
                ..
            } = &mut c.kind
            {
                if value == *target_value && group.contains(&capability) {
                    *last_pass_ms = Some(now_ms);
                    *last_pass_capability = Some(capability);
                }
            }
        }
    }

    // ── Titles ────────────────────────────────────────────────

    /// Human-readable constraint title.  Composites synthesize theirs from
    /// the children; detectors name the owners of their group, clamped so a
    /// deep composite cannot produce an unbounded string.
    pub fn constraint_title(&self, id: EntityId) -> String {
        let Some(c) = self.constraint(id) else {
            return String::new();
        };
        match &c.kind {
            ConstraintKind::Constant { value } => {
                if *value { "PASS" } else { "FAIL" }.to_string()
            }
            ConstraintKind::Threshold { .. } => c.name.clone(),
            ConstraintKind::Composite { op, children, .. } => {
                let mut title = String::from("(");
                for (i, &child) in children.iter().enumerate() {
                    if i > 0 {
                        title.push(' ');
                        title.push_str(op.as_str());
                        title.push(' ');
                    }
                    title.push_str(&self.constraint_title(child));
                }
                title.push(')');
                title
            }
            ConstraintKind::Simultaneous { primary, group, .. } => {
                const MAX_TITLE: usize = 60;
                let owner_of = |cap: EntityId| {
                    self.capability(cap)
                        .and_then(|c| self.device(c.owner))
                        .map(|d| d.name.clone())
                        .unwrap_or_default()
                };
                let mut title = format!("Simultaneous({}", owner_of(*primary));
                for &member in group {
                    let owner = owner_of(member);
                    if title.len() + owner.len() > MAX_TITLE {
                        title.push_str("...");
                        break;
                    }
                    title.push(',');
                    title.push_str(&owner);
                }
                title.push(')');
                title
            }
        }
    }

    // ── Attribute dispatch ────────────────────────────────────

    /// Attribute dispatch for constraints addressed directly by the
    /// protocol (`SET CONSTRAINT,<id>,MODE,FORCE_PASS` and friends).
    pub fn set_constraint_attribute(
        &mut self,
        id: EntityId,
        key: &str,
        value: &str,
        resp: &mut String,
    ) -> SetOutcome {
        if self.constraint(id).is_none() {
            return SetOutcome::Ignored;
        }
        let title = self.constraint_title(id);

        if key.eq_ignore_ascii_case("name") {
            if let Some(c) = self.constraint_mut(id) {
                c.name = value.to_string();
            }
            resp.push_str(&format!("'{title}' {key}={value}"));
            return SetOutcome::Ok;
        }
        if key.eq_ignore_ascii_case("mode") {
            let Some(mode) = ConstraintMode::parse(value) else {
                resp.push_str(&format!("Expected AUTO|FORCE_PASS|FORCE_FAIL but found: {value}"));
                return SetOutcome::Error;
            };
            if let Some(c) = self.constraint_mut(id) {
                c.mode = mode;
            }
            resp.push_str(&format!("'{title}' {key}={}", mode.as_str()));
            return SetOutcome::Ok;
        }
        if key.eq_ignore_ascii_case("passed") {
            let Some(passed) = parse_bool(value) else {
                resp.push_str(&format!("Expected TRUE|FALSE but found: {value}"));
                return SetOutcome::Error;
            };
            if let Some(c) = self.constraint_mut(id) {
                c.force_result(passed);
            }
            resp.push_str(&format!("'{title}' {key}={passed}"));
            return SetOutcome::Ok;
        }

        // Threshold tuning keys.
        let numeric = |v: &str| v.trim().parse::<f32>().ok();
        let field = if key.eq_ignore_ascii_case("threshold") {
            Some(ThresholdField::Threshold)
        } else if key.eq_ignore_ascii_case("pass_margin") {
            Some(ThresholdField::PassMargin)
        } else if key.eq_ignore_ascii_case("fail_margin") {
            Some(ThresholdField::FailMargin)
        } else if key.eq_ignore_ascii_case("min_hold_ms") {
            Some(ThresholdField::MinHoldMs)
        } else {
            None
        };
        if let Some(field) = field {
            let Some(c) = self.constraint_mut(id) else {
                return SetOutcome::Ignored;
            };
            let ConstraintKind::Threshold {
                threshold,
                pass_margin,
                fail_margin,
                min_hold_ms,
                ..
            } = &mut c.kind
            else {
                return SetOutcome::Ignored;
            };
            match field {
                ThresholdField::MinHoldMs => match value.trim().parse::<u64>() {
                    Ok(ms) => *min_hold_ms = ms,
                    Err(_) => {
                        resp.push_str(&format!("Cannot parse '{value}' as milliseconds"));
                        return SetOutcome::Error;
                    }
                },
                _ => {
                    let Some(v) = numeric(value) else {
                        resp.push_str(&format!("Cannot parse '{value}' as a number"));
                        return SetOutcome::Error;
                    };
                    match field {
                        ThresholdField::Threshold => *threshold = v,
                        ThresholdField::PassMargin => *pass_margin = v,
                        ThresholdField::FailMargin => *fail_margin = v,
                        ThresholdField::MinHoldMs => unreachable!(),
                    }
                }
            }
            resp.push_str(&format!("'{title}' {key}={value}"));
            return SetOutcome::Ok;
        }

        SetOutcome::Ignored
    }
}

#[derive(Clone, Copy)]
enum ThresholdField {
    Threshold,
    PassMargin,
    FailMargin,
    MinHoldMs,
}

fn hold_elapsed(last_transition_ms: Option<u64>, min_hold_ms: u64, now_ms: u64) -> bool {
    match last_transition_ms {
        None => true,
        Some(then) => now_ms.wrapping_sub(then) >= min_hold_ms,
    }
}
