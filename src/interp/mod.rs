//! Line-oriented command interpreter.
//!
//! ```text
//!   transport ──▶ execute() ──▶ execute_line() ──▶ registry / store
//!                                     │
//!                                     └──▶ Response envelopes
//! ```
//!
//! One entry point per batch: `execute` splits on `;`/newline and stops at
//! the first failing line.  Each line is tokenized non-destructively with
//! the original verb-specific delimiter sets (comma/space for fields, rest
//! of line for free text) and resolves to exactly one envelope — except
//! `SETUP RUN`, which replays the stored script and yields one envelope per
//! replayed line.

pub mod render;
pub mod response;

pub use response::{Response, ResponseBuilder};

use serde_json::json;

use crate::config::{is_valid_serial_speed, OutputFormat, SerialFrame};
use crate::context::SystemContext;
use crate::error::{error_desc, RespCode, StoreError};
use crate::ports::{Clock, DeviceActuator, Liveness, NvMedium};
use crate::registry::{EntityId, EntityKind, Registry, SetOutcome, ID_MAX};
use crate::store::CommandStore;

// ───────────────────────────────────────────────────────────────
// Tokenizer
// ───────────────────────────────────────────────────────────────

/// Non-destructive `strtok` equivalent: skips leading delimiters, yields
/// the next run of non-delimiter characters, and consumes exactly one
/// trailing delimiter.  Delimiter sets change per call, as the protocol
/// grammar requires.
struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn next(&mut self, delims: &str) -> Option<&'a str> {
        let rest = self.rest.trim_start_matches(|c| delims.contains(c));
        if rest.is_empty() {
            self.rest = rest;
            return None;
        }
        match rest.find(|c| delims.contains(c)) {
            Some(i) => {
                let token = &rest[..i];
                // Delimiters may be multi-byte (REPLACE lets the user pick
                // one); step over the whole char, not one byte.
                let width = rest[i..].chars().next().map_or(1, char::len_utf8);
                self.rest = &rest[i + width..];
                Some(token)
            }
            None => {
                self.rest = "";
                Some(rest)
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Interpreter
// ───────────────────────────────────────────────────────────────

/// The protocol front-end over one registry and one command store.
pub struct CommandInterpreter<M: NvMedium> {
    pub registry: Registry,
    pub store: CommandStore<M>,
    pub ctx: SystemContext,
    /// Runtime rendering format; the persisted one only applies at boot.
    pub output_format: OutputFormat,
}

impl<M: NvMedium> CommandInterpreter<M> {
    pub fn new(registry: Registry, store: CommandStore<M>) -> Self {
        let output_format = store.output_format().unwrap_or_default();
        Self {
            registry,
            store,
            ctx: SystemContext::new(),
            output_format,
        }
    }

    /// Execute a batch: lines split on `;`/newline, stopping at the first
    /// failing line.
    pub fn execute(
        &mut self,
        script: &str,
        clock: &impl Clock,
        live: &mut impl Liveness,
        actuator: &mut impl DeviceActuator,
    ) -> Vec<Response> {
        let mut responses = Vec::new();
        for line in script.split([';', '\r', '\n']) {
            if line.trim().is_empty() {
                continue;
            }
            let rs = self.execute_line(line, false, clock, &mut *live, &mut *actuator);
            let failed = rs.last().is_some_and(|r| !r.code.is_ok());
            responses.extend(rs);
            if failed {
                break;
            }
        }
        responses
    }

    /// Execute one line.  Yields one envelope, or several for `SETUP RUN`.
    pub fn execute_line(
        &mut self,
        line: &str,
        verbose: bool,
        clock: &impl Clock,
        live: &mut impl Liveness,
        actuator: &mut impl DeviceActuator,
    ) -> Vec<Response> {
        let mut t = Tokens::new(line);
        let verb = t.next(", ").unwrap_or("");

        if verb.eq_ignore_ascii_case("GET") {
            vec![self.get_cmd(&mut t, verbose, clock, live)]
        } else if verb.eq_ignore_ascii_case("SET") {
            vec![self.set_cmd(&mut t, clock, actuator)]
        } else if verb.eq_ignore_ascii_case("SETUP") {
            self.setup_cmd(&mut t, clock, live, actuator)
        } else if verb.eq_ignore_ascii_case("INCLUDE") {
            vec![self.filter_cmd(&mut t, verbose, live, true)]
        } else if verb.eq_ignore_ascii_case("EXCLUDE") {
            vec![self.filter_cmd(&mut t, verbose, live, false)]
        } else if verb.eq_ignore_ascii_case("RESET") {
            self.ctx.request_reset();
            let mut b = ResponseBuilder::new();
            b.append_msg("Reset requested");
            vec![b.finalize(&mut self.ctx)]
        } else if verb.eq_ignore_ascii_case("VERBOSE") {
            match t.next("\r\n") {
                Some(inner) => self.execute_line(inner, true, clock, &mut *live, &mut *actuator),
                None => {
                    let mut b = ResponseBuilder::new();
                    b.fail(RespCode::InvalidArgument, "Expected a command after VERBOSE");
                    vec![b.finalize(&mut self.ctx)]
                }
            }
        } else if verb.eq_ignore_ascii_case("PAUSE") {
            vec![self.pause_cmd(&mut t, clock)]
        } else if verb.eq_ignore_ascii_case("RESUME") {
            self.ctx.resume();
            let mut b = ResponseBuilder::new();
            b.append_msg("Resumed");
            vec![b.finalize(&mut self.ctx)]
        } else {
            let mut b = ResponseBuilder::new();
            b.fail(
                RespCode::InvalidArgument,
                format!(
                    "Expected {{GET|INCLUDE|EXCLUDE|SET|SETUP|RESET|VERBOSE|PAUSE|RESUME}} but found: {verb}"
                ),
            );
            vec![b.finalize(&mut self.ctx)]
        }
    }

    // ── GET ───────────────────────────────────────────────────

    fn get_cmd(
        &mut self,
        t: &mut Tokens<'_>,
        verbose: bool,
        clock: &impl Clock,
        live: &mut impl Liveness,
    ) -> Response {
        let mut b = ResponseBuilder::new();
        let now = clock.now_ms();
        let mut arg_opt = t.next(", ");
        loop {
            let arg = arg_opt.unwrap_or("");
            if arg.eq_ignore_ascii_case("ENV") {
                b.insert("env", render::env_json(&self.store, &self.ctx, now));
            } else if arg.eq_ignore_ascii_case("SETUP") || arg.eq_ignore_ascii_case("EEPROM") {
                b.insert("eeprom", render::store_json(&self.store));
            } else if arg.eq_ignore_ascii_case("OUTPUT_FORMAT") {
                b.insert("outputFormat", json!(self.output_format.as_str()));
            } else if arg.eq_ignore_ascii_case("TIME") {
                b.insert("time", render::time_json(&self.ctx, now));
            } else if let Some(kind) = parse_plural_noun(arg) {
                let ids = self.registry.ids(kind);
                b.insert(
                    plural(kind),
                    render::listing(&self.registry, kind, &ids, verbose, &self.ctx, &mut *live),
                );
            } else if let Some(kind) = parse_singular_noun(arg) {
                self.get_single(&mut b, kind, arg, t, verbose, live);
            } else {
                b.fail(
                    RespCode::InvalidArgument,
                    format!(
                        "GET command expected {{SENSORS|DEVICES|CONSTRAINTS|CAPABILITIES|OUTPUT_FORMAT|TIME|ENV|SETUP}} but found: '{arg}'."
                    ),
                );
                break;
            }
            arg_opt = t.next(", ");
            if arg_opt.is_none() {
                break;
            }
        }
        b.finalize(&mut self.ctx)
    }

    fn get_single(
        &self,
        b: &mut ResponseBuilder,
        kind: EntityKind,
        noun: &str,
        t: &mut Tokens<'_>,
        verbose: bool,
        live: &mut impl Liveness,
    ) {
        let Some(raw_id) = t.next(",\r\n") else {
            b.fail(
                RespCode::InvalidArgument,
                format!("ID required for GET of single {noun}."),
            );
            return;
        };
        let id_num = raw_id.trim().parse::<i64>().unwrap_or(0);
        if id_num > i64::from(ID_MAX) {
            b.fail(
                RespCode::NotFound,
                format!("ID '{raw_id}' exceeded maximum '{ID_MAX}'"),
            );
            return;
        }
        let found = if (1..=i64::from(ID_MAX)).contains(&id_num) {
            self.registry.find_by_id(kind, id_num as EntityId)
        } else {
            Vec::new()
        };
        if found.len() == 1 {
            b.insert(
                kind.noun(),
                render::listing(&self.registry, kind, &found, verbose, &self.ctx, live),
            );
        } else {
            b.fail(
                RespCode::NotFound,
                format!(
                    "Expected one {noun} for ID '{raw_id}' but found {}",
                    found.len()
                ),
            );
        }
    }

    // ── INCLUDE / EXCLUDE ─────────────────────────────────────

    fn filter_cmd(
        &mut self,
        t: &mut Tokens<'_>,
        verbose: bool,
        live: &mut impl Liveness,
        include: bool,
    ) -> Response {
        let mut b = ResponseBuilder::new();
        let arg = t.next(", ").unwrap_or("");
        match parse_plural_noun(arg) {
            Some(kind) => {
                let pattern = t.next("\r\n").unwrap_or("");
                let ids = self.registry.filter_by_title(kind, pattern, include);
                b.insert(
                    plural(kind),
                    render::listing(&self.registry, kind, &ids, verbose, &self.ctx, live),
                );
            }
            None => b.fail(
                RespCode::InvalidArgument,
                format!(
                    "FILTER command expected {{SENSORS|DEVICES|CONSTRAINTS|CAPABILITIES}} but found: '{arg}'."
                ),
            ),
        }
        b.finalize(&mut self.ctx)
    }

    // ── SET ───────────────────────────────────────────────────

    fn set_cmd(
        &mut self,
        t: &mut Tokens<'_>,
        clock: &impl Clock,
        actuator: &mut impl DeviceActuator,
    ) -> Response {
        let mut b = ResponseBuilder::new();
        let now = clock.now_ms();
        let arg = t.next(", ").unwrap_or("");

        if arg.eq_ignore_ascii_case("OUTPUT_FORMAT") {
            let raw = t.next(", \r\n").unwrap_or("");
            match OutputFormat::parse(raw) {
                Some(fmt) => self.output_format = fmt,
                None => b.fail(
                    RespCode::InvalidArgument,
                    format!("Expected JSON_COMPACT|JSON_PRETTY but found: {raw}"),
                ),
            }
        } else if arg.eq_ignore_ascii_case("TIME_T") {
            let raw = t.next(", ").unwrap_or("");
            let epoch_ms = raw.trim().parse::<u64>().unwrap_or(0);
            self.ctx.set_time_ref(epoch_ms, now);
            b.append_msg(&format!("TIME_T set to {epoch_ms}"));
        } else if let Some(kind) = parse_plural_noun(arg) {
            let name = t.next(",\r\n").unwrap_or("");
            let key = t.next(", \r\n").unwrap_or("");
            let val = t.next(", \r\n").unwrap_or("");
            let selected = self.registry.filter_by_title(kind, name, true);
            self.set_on_selection(&mut b, kind, &selected, arg, key, val, now, actuator, || {
                format!("No matches for {arg} with name matching '{name}'")
            });
        } else if let Some(kind) = parse_singular_noun(arg) {
            let raw_id = t.next(",\r\n").unwrap_or("");
            let key = t.next(", \r\n").unwrap_or("");
            let val = t.next(", \r\n").unwrap_or("");
            let id_num = raw_id.trim().parse::<i64>().unwrap_or(0);
            let selected = if (1..=i64::from(ID_MAX)).contains(&id_num) {
                self.registry.find_by_id(kind, id_num as EntityId)
            } else {
                Vec::new()
            };
            self.set_on_selection(&mut b, kind, &selected, arg, key, val, now, actuator, || {
                format!("No matches for {arg} with ID = '{raw_id}'")
            });
        } else {
            b.fail(
                RespCode::InvalidArgument,
                format!(
                    "Expected TIME_T|OUTPUT_FORMAT|DEVICE|SENSOR|CONSTRAINT|CAPABILITY|DEVICES|SENSORS|CONSTRAINTS|CAPABILITIES but found: {arg}"
                ),
            );
        }
        b.finalize(&mut self.ctx)
    }

    /// Apply one attribute write to every selected entity and fold the
    /// outcomes: an `Error` latches (later successes cannot clear it), an
    /// `Ok` upgrades `Ignored`.  The empty selection is its own case.
    #[allow(clippy::too_many_arguments)]
    fn set_on_selection(
        &mut self,
        b: &mut ResponseBuilder,
        kind: EntityKind,
        selected: &[EntityId],
        noun: &str,
        key: &str,
        val: &str,
        now_ms: u64,
        actuator: &mut impl DeviceActuator,
        no_match_msg: impl FnOnce() -> String,
    ) {
        let mut detail = String::new();
        let mut folded = SetOutcome::Ignored;
        for &id in selected {
            let code = self.dispatch_set(kind, id, key, val, now_ms, actuator, &mut detail);
            if code != SetOutcome::Ignored && folded != SetOutcome::Error {
                folded = code;
            }
        }
        match folded {
            SetOutcome::Ok => b.append_msg(&detail),
            _ if selected.is_empty() => b.fail(RespCode::NotFound, no_match_msg()),
            _ => {
                let mut msg = format!("{noun} set '{key}' failed.");
                if !detail.is_empty() {
                    msg.push(' ');
                    msg.push_str(&detail);
                }
                b.fail(RespCode::NotFound, msg);
            }
        }
    }

    fn dispatch_set(
        &mut self,
        kind: EntityKind,
        id: EntityId,
        key: &str,
        val: &str,
        now_ms: u64,
        actuator: &mut impl DeviceActuator,
        resp: &mut String,
    ) -> SetOutcome {
        let sync = self.ctx.synchronizing;
        match kind {
            EntityKind::Sensor => self.registry.set_sensor_attribute(id, key, val, resp),
            EntityKind::Constraint => self.registry.set_constraint_attribute(id, key, val, resp),
            EntityKind::Capability => self
                .registry
                .set_capability_attribute(id, key, val, now_ms, sync, resp),
            EntityKind::Device => self
                .registry
                .set_device_attribute(id, key, val, now_ms, sync, actuator, resp),
        }
    }

    // ── SETUP ─────────────────────────────────────────────────

    fn setup_cmd(
        &mut self,
        t: &mut Tokens<'_>,
        clock: &impl Clock,
        live: &mut impl Liveness,
        actuator: &mut impl DeviceActuator,
    ) -> Vec<Response> {
        let action = t.next(", \r\n").unwrap_or("");
        if action.eq_ignore_ascii_case("RUN") {
            return self.run_setup(clock, live, actuator);
        }

        let mut b = ResponseBuilder::new();
        if action.eq_ignore_ascii_case("SET") {
            self.setup_set(&mut b, t);
        } else if action.eq_ignore_ascii_case("ADD") {
            let res = match t.next("\r\n") {
                Some(cmd) if !cmd.is_empty() => self.store.append_command(cmd).map(|_| ()),
                _ => Err(StoreError::NullArgument),
            };
            store_outcome(&mut b, "SETUP,ADD", res);
        } else if action.eq_ignore_ascii_case("INSERT_AT") {
            let index = atoi(t.next(",\r\n"));
            let res = match t.next("\r\n") {
                Some(cmd) if !cmd.is_empty() => {
                    self.store.insert_command_at(index as isize, cmd).map(|_| ())
                }
                _ => Err(StoreError::NullArgument),
            };
            store_outcome(&mut b, "SETUP,INSERT_AT", res);
        } else if action.eq_ignore_ascii_case("REPLACE_AT") {
            let index = atoi(t.next(",\r\n"));
            let res = match t.next("\r\n") {
                Some(cmd) if !cmd.is_empty() => {
                    if index < 0 {
                        Err(StoreError::IndexOutOfBounds)
                    } else {
                        self.store.set_command_at(index as usize, cmd)
                    }
                }
                _ => Err(StoreError::NullArgument),
            };
            store_outcome(&mut b, "SETUP,REPLACE_AT", res);
        } else if action.eq_ignore_ascii_case("REPLACE")
            || action.eq_ignore_ascii_case("REPLACE_OR_ADD")
        {
            let add_if_missing = action.eq_ignore_ascii_case("REPLACE_OR_ADD");
            let delim = t.next(",\r\n").unwrap_or(",");
            let pattern = t.next(delim).unwrap_or("");
            let res = match t.next("\r\n") {
                Some(cmd) if !cmd.is_empty() => self
                    .store
                    .replace_command(pattern, cmd, add_if_missing)
                    .map(|_| ()),
                _ => Err(StoreError::NullArgument),
            };
            store_outcome(&mut b, "SETUP,REPLACE", res);
        } else if action.eq_ignore_ascii_case("REMOVE") {
            let pattern = t.next("\r\n").unwrap_or("");
            match self.store.remove_command(pattern, false) {
                Ok(0) => b.append_msg(&format!("Nothing removed for: '{pattern}'")),
                Ok(1) => {}
                Ok(n) => b.fail(
                    RespCode::CmdError,
                    format!("Unexpected state... multiple items removed (count={n})."),
                ),
                Err(e) => {
                    let code = RespCode::from(e);
                    b.fail(code, error_desc("SETUP,REMOVE", code));
                }
            }
        } else if action.eq_ignore_ascii_case("REMOVE_ALL") {
            let pattern = t.next("\r\n").unwrap_or("");
            match self.store.remove_command(pattern, true) {
                Ok(n) => b.append_msg(&format!("Removed {n} entries matching: '{pattern}'")),
                Err(e) => {
                    let code = RespCode::from(e);
                    b.fail(code, error_desc("SETUP,REMOVE_ALL", code));
                }
            }
        } else if action.eq_ignore_ascii_case("REMOVE_AT") {
            let index = atoi(t.next(",\r\n"));
            let res = if index < 0 {
                Err(StoreError::IndexOutOfBounds)
            } else {
                self.store.remove_command_at(index as usize)
            };
            store_outcome(&mut b, "SETUP,REMOVE_AT", res);
        } else {
            b.fail(
                RespCode::InvalidArgument,
                format!(
                    "SETUP expected {{RUN|SET|ADD|INSERT_AT|REPLACE|REPLACE_OR_ADD|REPLACE_AT|REMOVE|REMOVE_ALL|REMOVE_AT}} but found: '{action}'."
                ),
            );
        }
        vec![b.finalize(&mut self.ctx)]
    }

    fn setup_set(&mut self, b: &mut ResponseBuilder, t: &mut Tokens<'_>) {
        let field = t.next(", ").unwrap_or("");
        if field.eq_ignore_ascii_case("OUTPUT_FORMAT") {
            let raw = t.next(", \r\n").unwrap_or("");
            match OutputFormat::parse(raw) {
                Some(fmt) => store_outcome(b, "SETUP,SET", self.store.set_output_format(fmt)),
                None => b.fail(
                    RespCode::InvalidArgument,
                    format!("Expected JSON_COMPACT|JSON_PRETTY but found: {raw}"),
                ),
            }
        } else if field.eq_ignore_ascii_case("SERIAL_SPEED") {
            let raw = t.next(", \r\n").unwrap_or("");
            let speed = raw.trim().parse::<u32>().unwrap_or(0);
            if is_valid_serial_speed(speed) {
                store_outcome(b, "SETUP,SET", self.store.set_serial_speed(speed));
                self.ctx
                    .latch_info("Serial communication changes require a RESET.");
            } else {
                b.fail(
                    RespCode::InvalidArgument,
                    format!("Unsupported serial speed: {raw}"),
                );
            }
        } else if field.eq_ignore_ascii_case("SERIAL_CONFIG") {
            let raw = t.next(", \r\n").unwrap_or("");
            match SerialFrame::parse(raw) {
                Some(frame) => {
                    store_outcome(b, "SETUP,SET", self.store.set_serial_frame(frame));
                    self.ctx
                        .latch_info("Serial communication changes require a RESET.");
                }
                None => b.fail(
                    RespCode::InvalidArgument,
                    format!("Expected 8N1|8E1|8O1 but found: {raw}"),
                ),
            }
        } else if field.eq_ignore_ascii_case("DEVICE_NAME") {
            match t.next(",\r\n") {
                Some(name) if !name.is_empty() => match self.store.set_board_name(name) {
                    Ok(()) => b.append_msg(&format!("deviceName={name}")),
                    Err(StoreError::RowTooLong) => b.fail(
                        RespCode::InvalidArgument,
                        format!("Device name exceeds 15 characters: '{name}'"),
                    ),
                    Err(e) => {
                        let code = RespCode::from(e);
                        b.fail(code, error_desc("SETUP,SET", code));
                    }
                },
                _ => b.fail(RespCode::NullArgument, "Expected a device name"),
            }
        } else if field.eq_ignore_ascii_case("DEVICE_ID") {
            let raw = t.next(", \r\n").unwrap_or("");
            match raw.trim().parse::<u32>() {
                Ok(id) => {
                    store_outcome(b, "SETUP,SET", self.store.set_board_id(id));
                    if b.code().is_ok() {
                        b.append_msg(&format!("deviceId={id}"));
                    }
                }
                Err(_) => b.fail(
                    RespCode::InvalidArgument,
                    format!("Cannot parse device ID: '{raw}'"),
                ),
            }
        } else {
            b.fail(
                RespCode::InvalidArgument,
                format!(
                    "Expected SET field {{OUTPUT_FORMAT|SERIAL_SPEED|SERIAL_CONFIG|DEVICE_NAME|DEVICE_ID}} but found: {field}"
                ),
            );
        }
    }

    /// Replay the stored script in order with listener notifications
    /// suppressed, stopping at the first failing line.
    fn run_setup(
        &mut self,
        clock: &impl Clock,
        live: &mut impl Liveness,
        actuator: &mut impl DeviceActuator,
    ) -> Vec<Response> {
        let mut responses = Vec::new();
        self.ctx.synchronizing = true;
        for i in 0..self.store.count() {
            let row = match self.store.command_at(i) {
                Ok(row) => row,
                Err(e) => {
                    let code = RespCode::from(e);
                    let mut b = ResponseBuilder::new();
                    b.fail(code, error_desc("SETUP,RUN", code));
                    responses.push(b.finalize(&mut self.ctx));
                    break;
                }
            };
            let rs = self.execute_line(row.as_str(), false, clock, &mut *live, &mut *actuator);
            let failed = rs.last().is_some_and(|r| !r.code.is_ok());
            responses.extend(rs);
            if failed {
                break;
            }
        }
        self.ctx.synchronizing = false;
        responses
    }

    // ── PAUSE ─────────────────────────────────────────────────

    fn pause_cmd(&mut self, t: &mut Tokens<'_>, clock: &impl Clock) -> Response {
        let mut b = ResponseBuilder::new();
        match t.next(", \r\n") {
            None => {
                self.ctx.pause(clock.now_ms(), 0);
                b.append_msg("Paused");
            }
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) => {
                    self.ctx.pause(clock.now_ms(), secs.saturating_mul(1_000));
                    b.append_msg("Paused");
                }
                Err(_) => b.fail(
                    RespCode::InvalidArgument,
                    format!("Cannot parse PAUSE seconds: '{raw}'"),
                ),
            },
        }
        b.finalize(&mut self.ctx)
    }
}

// ───────────────────────────────────────────────────────────────
// Helpers
// ───────────────────────────────────────────────────────────────

fn parse_plural_noun(arg: &str) -> Option<EntityKind> {
    if arg.eq_ignore_ascii_case("SENSORS") {
        Some(EntityKind::Sensor)
    } else if arg.eq_ignore_ascii_case("DEVICES") {
        Some(EntityKind::Device)
    } else if arg.eq_ignore_ascii_case("CONSTRAINTS") {
        Some(EntityKind::Constraint)
    } else if arg.eq_ignore_ascii_case("CAPABILITIES") {
        Some(EntityKind::Capability)
    } else {
        None
    }
}

fn parse_singular_noun(arg: &str) -> Option<EntityKind> {
    if arg.eq_ignore_ascii_case("SENSOR") {
        Some(EntityKind::Sensor)
    } else if arg.eq_ignore_ascii_case("DEVICE") {
        Some(EntityKind::Device)
    } else if arg.eq_ignore_ascii_case("CONSTRAINT") {
        Some(EntityKind::Constraint)
    } else if arg.eq_ignore_ascii_case("CAPABILITY") {
        Some(EntityKind::Capability)
    } else {
        None
    }
}

fn plural(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Sensor => "sensors",
        EntityKind::Device => "devices",
        EntityKind::Constraint => "constraints",
        EntityKind::Capability => "capabilities",
    }
}

/// `atoi` equivalent: unparsable input (or a missing token) reads as 0.
fn atoi(token: Option<&str>) -> i64 {
    token
        .map(|t| t.trim().parse::<i64>().unwrap_or(0))
        .unwrap_or(0)
}

fn store_outcome(b: &mut ResponseBuilder, context: &str, res: Result<(), StoreError>) {
    if let Err(e) = res {
        let code = RespCode::from(e);
        b.fail(code, error_desc(context, code));
    }
}
