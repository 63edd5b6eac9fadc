//! JSON listing renderer.
//!
//! One `*_json` function per entity kind, mirroring the shape clients
//! already parse: terse by default, full detail under verbose.  Listing
//! iteration feeds the watchdog periodically so a large registry cannot
//! starve it mid-response (unless a reset has been requested, in which
//! case starving it is the point).

use serde_json::{json, Value};

use crate::context::SystemContext;
use crate::ports::{Liveness, NvMedium};
use crate::registry::{ConstraintKind, EntityId, EntityKind, Registry};
use crate::store::CommandStore;

/// Entities rendered between keep-alive calls during a listing.
const KEEPALIVE_STRIDE: usize = 8;

/// Render a listing for a pre-selected id set, feeding the watchdog as it
/// goes.  Suppressed once a reset is pending.
pub fn listing(
    reg: &Registry,
    kind: EntityKind,
    ids: &[EntityId],
    verbose: bool,
    ctx: &SystemContext,
    live: &mut impl Liveness,
) -> Value {
    let mut out = Vec::with_capacity(ids.len());
    for (n, &id) in ids.iter().enumerate() {
        if n % KEEPALIVE_STRIDE == 0 && !ctx.reset_requested() {
            live.keep_alive();
        }
        out.push(entity_json(reg, kind, id, verbose));
    }
    Value::Array(out)
}

pub fn entity_json(reg: &Registry, kind: EntityKind, id: EntityId, verbose: bool) -> Value {
    match kind {
        EntityKind::Sensor => sensor_json(reg, id),
        EntityKind::Device => device_json(reg, id, verbose),
        EntityKind::Constraint => constraint_json(reg, id, verbose),
        EntityKind::Capability => capability_json(reg, id),
    }
}

pub fn sensor_json(reg: &Registry, id: EntityId) -> Value {
    let Some(s) = reg.sensor(id) else {
        return Value::Null;
    };
    // NaN has no JSON representation; an unset reading renders as null.
    let value = if s.value.is_nan() {
        Value::Null
    } else {
        json!(s.value)
    };
    json!({ "name": s.name, "id": s.id, "value": value })
}

pub fn constraint_json(reg: &Registry, id: EntityId, verbose: bool) -> Value {
    let Some(c) = reg.constraint(id) else {
        return Value::Null;
    };
    let mut obj = json!({
        "title": reg.constraint_title(id),
        "id": c.id,
        "state": if c.last_passed { "PASSED" } else { "FAILED" },
        "type": kind_name(&c.kind),
        "mode": c.mode.as_str(),
    });
    if verbose {
        if let ConstraintKind::Threshold {
            threshold,
            pass_margin,
            fail_margin,
            min_hold_ms,
            ..
        } = c.kind
        {
            obj["threshold"] = json!(threshold);
            obj["passMargin"] = json!(pass_margin);
            obj["failMargin"] = json!(fail_margin);
            obj["minHoldMs"] = json!(min_hold_ms);
        }
    }
    obj
}

pub fn capability_json(reg: &Registry, id: EntityId) -> Value {
    let Some(cap) = reg.capability(id) else {
        return Value::Null;
    };
    json!({
        "title": reg.capability_title(id),
        "id": cap.id,
        "type": cap.kind.as_str(),
        "value": cap.value,
    })
}

pub fn device_json(reg: &Registry, id: EntityId, verbose: bool) -> Value {
    let Some(d) = reg.device(id) else {
        return Value::Null;
    };
    let constraint = match d.constraint {
        None => Value::Null,
        Some(c) if verbose => constraint_json(reg, c, verbose),
        Some(c) => {
            let passed = reg.constraint(c).is_some_and(|c| c.last_passed);
            json!({ "state": if passed { "PASSED" } else { "FAILED" } })
        }
    };
    let mut obj = json!({
        "name": d.name,
        "id": d.id,
        "constraint": constraint,
    });
    if verbose {
        let caps: Vec<Value> = d
            .capabilities
            .iter()
            .map(|&c| capability_json(reg, c))
            .collect();
        obj["capabilities"] = Value::Array(caps);
    }
    obj
}

/// Store self-listing: scalar settings plus every row.
pub fn store_json<M: NvMedium>(store: &CommandStore<M>) -> Value {
    let settings = store.settings().unwrap_or_default();
    let mut commands = Vec::with_capacity(store.count());
    for i in 0..store.count() {
        match store.command_at(i) {
            Ok(row) => commands.push(json!({ "command": row.as_str() })),
            Err(_) => commands.push(json!({ "command": Value::Null })),
        }
    }
    json!({
        "version": settings.version,
        "outputFormat": settings.output_format.as_str(),
        "serialSpeed": settings.serial_speed,
        "serialConfig": settings.serial_frame.as_str(),
        "deviceName": settings.board_name,
        "deviceId": settings.board_id,
        "commandCount": store.count(),
        "commands": commands,
    })
}

/// `GET ENV`: release and runtime vitals.
pub fn env_json<M: NvMedium>(store: &CommandStore<M>, ctx: &SystemContext, now_ms: u64) -> Value {
    json!({
        "release": env!("CARGO_PKG_VERSION"),
        "deviceName": store.board_name().unwrap_or_default(),
        "deviceId": store.board_id().unwrap_or_default(),
        "uptimeMs": now_ms,
        "time": time_json(ctx, now_ms)["epochMs"].clone(),
        "timeSet": if ctx.time_ref().is_some() { "YES" } else { "NO" },
    })
}

/// `GET TIME`: wall-clock reference state.
pub fn time_json(ctx: &SystemContext, now_ms: u64) -> Value {
    json!({
        "epochMs": ctx.epoch_ms(now_ms),
        "timeSet": if ctx.time_ref().is_some() { "YES" } else { "NO" },
    })
}

fn kind_name(kind: &ConstraintKind) -> &'static str {
    match kind {
        ConstraintKind::Constant { .. } => "Constant",
        ConstraintKind::Threshold { .. } => "Threshold",
        ConstraintKind::Composite { .. } => "Composite",
        ConstraintKind::Simultaneous { .. } => "Simultaneous",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::CountingLiveness;
    use crate::registry::{CapabilityKind, Constraint};
    use crate::store::MemoryMedium;

    fn sample() -> Registry {
        let mut reg = Registry::new();
        let s = reg.add_sensor("Battery Temp").unwrap();
        let c = reg
            .add_constraint(Constraint::threshold("minTemp", s, 100.0, 5.0, 5.0, 0))
            .unwrap();
        let d = reg.add_device("Fan Bank 1", Some(c)).unwrap();
        reg.add_capability(d, CapabilityKind::Toggle).unwrap();
        reg
    }

    #[test]
    fn sensor_without_reading_renders_null() {
        let reg = sample();
        let v = sensor_json(&reg, 1);
        assert_eq!(v["name"], "Battery Temp");
        assert!(v["value"].is_null());
    }

    #[test]
    fn device_terse_vs_verbose() {
        let reg = sample();
        let terse = device_json(&reg, 1, false);
        assert_eq!(terse["constraint"]["state"], "FAILED");
        assert!(terse.get("capabilities").is_none());

        let verbose = device_json(&reg, 1, true);
        assert_eq!(verbose["constraint"]["title"], "minTemp");
        assert_eq!(verbose["capabilities"][0]["type"], "Toggle");
    }

    #[test]
    fn verbose_constraint_exposes_tuning() {
        let reg = sample();
        let v = constraint_json(&reg, 1, true);
        assert_eq!(v["threshold"], 100.0);
        assert_eq!(v["passMargin"], 5.0);
        assert_eq!(v["mode"], "AUTO");
    }

    #[test]
    fn listing_feeds_watchdog() {
        let mut reg = Registry::new();
        for i in 0..20 {
            reg.add_sensor(format!("s{i}")).unwrap();
        }
        let ctx = SystemContext::new();
        let mut live = CountingLiveness::default();
        let ids = reg.ids(EntityKind::Sensor);
        let v = listing(&reg, EntityKind::Sensor, &ids, false, &ctx, &mut live);
        assert_eq!(v.as_array().unwrap().len(), 20);
        assert_eq!(live.feeds, 3);
    }

    #[test]
    fn reset_request_stops_feeding() {
        let mut reg = Registry::new();
        reg.add_sensor("s").unwrap();
        let mut ctx = SystemContext::new();
        ctx.request_reset();
        let mut live = CountingLiveness::default();
        let ids = reg.ids(EntityKind::Sensor);
        listing(&reg, EntityKind::Sensor, &ids, false, &ctx, &mut live);
        assert_eq!(live.feeds, 0);
    }

    #[test]
    fn store_listing_shape() {
        let mut store = CommandStore::open(MemoryMedium::new()).unwrap();
        store.append_command("GET,SENSORS").unwrap();
        let v = store_json(&store);
        assert_eq!(v["commandCount"], 1);
        assert_eq!(v["commands"][0]["command"], "GET,SENSORS");
        assert_eq!(v["serialSpeed"], 38_400);
    }
}
