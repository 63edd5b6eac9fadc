//! Response envelope assembly.
//!
//! Every protocol line yields exactly one envelope: the listing payload (if
//! any), a `respMsg`, the drained message latches, and a terminal `respCode`.
//! Latches are drained here and nowhere else, exactly once per envelope; an
//! error latched during an otherwise-successful line downgrades the code to
//! `CMD_ERROR` so clients cannot miss it.

use serde_json::{json, Map, Value};

use crate::config::OutputFormat;
use crate::context::SystemContext;
use crate::error::RespCode;

/// A finalized envelope ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub code: RespCode,
    pub json: Value,
}

impl Response {
    pub fn render(&self, fmt: OutputFormat) -> String {
        let rendered = match fmt {
            OutputFormat::JsonCompact => serde_json::to_string(&self.json),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&self.json),
        };
        // Value-to-string serialization has no failing inputs here; the
        // fallback keeps the envelope contract if that ever changes.
        rendered.unwrap_or_else(|_| format!(r#"{{"respCode":{}}}"#, RespCode::CmdError.value()))
    }
}

/// Accumulates one envelope while a line is being handled.
#[derive(Debug)]
pub struct ResponseBuilder {
    body: Map<String, Value>,
    msg: String,
    code: RespCode,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self {
            body: Map::new(),
            msg: String::new(),
            code: RespCode::Ok,
        }
    }

    /// Attach a listing payload under `key`.
    pub fn insert(&mut self, key: &str, value: Value) {
        self.body.insert(key.to_string(), value);
    }

    /// Append to the `respMsg` text.
    pub fn append_msg(&mut self, text: &str) {
        self.msg.push_str(text);
    }

    pub fn set_code(&mut self, code: RespCode) {
        self.code = code;
    }

    pub fn code(&self) -> RespCode {
        self.code
    }

    /// Record a failure message and code in one step.
    pub fn fail(&mut self, code: RespCode, msg: impl AsRef<str>) {
        self.code = code;
        self.msg.push_str(msg.as_ref());
    }

    /// Seal the envelope, draining the context latches exactly once.
    pub fn finalize(mut self, ctx: &mut SystemContext) -> Response {
        if self.msg.is_empty() {
            self.msg = if self.code.is_ok() { "OK" } else { "ERROR" }.to_string();
        }
        self.body.insert("respMsg".to_string(), json!(self.msg));
        if let Some(err) = ctx.take_error() {
            if self.code.is_ok() {
                self.code = RespCode::CmdError;
            }
            self.body.insert("lastErrorMsg".to_string(), json!(err));
        }
        if let Some(info) = ctx.take_info() {
            self.body.insert("lastInfoMsg".to_string(), json!(info));
        }
        self.body
            .insert("respCode".to_string(), json!(self.code.value()));
        Response {
            code: self.code,
            json: Value::Object(self.body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_message_tracks_code() {
        let mut ctx = SystemContext::new();
        let ok = ResponseBuilder::new().finalize(&mut ctx);
        assert_eq!(ok.json["respMsg"], "OK");
        assert_eq!(ok.json["respCode"], 0);

        let mut b = ResponseBuilder::new();
        b.set_code(RespCode::NotFound);
        let err = b.finalize(&mut ctx);
        assert_eq!(err.json["respMsg"], "ERROR");
        assert_eq!(err.json["respCode"], -404);
    }

    #[test]
    fn latched_error_downgrades_ok() {
        let mut ctx = SystemContext::new();
        ctx.latch_error("relay driver fault");
        let resp = ResponseBuilder::new().finalize(&mut ctx);
        assert_eq!(resp.code, RespCode::CmdError);
        assert_eq!(resp.json["lastErrorMsg"], "relay driver fault");
        // Drained: the next envelope is clean.
        let next = ResponseBuilder::new().finalize(&mut ctx);
        assert_eq!(next.code, RespCode::Ok);
        assert!(next.json.get("lastErrorMsg").is_none());
    }

    #[test]
    fn latched_error_keeps_explicit_code() {
        let mut ctx = SystemContext::new();
        ctx.latch_error("boom");
        let mut b = ResponseBuilder::new();
        b.fail(RespCode::ArrayFull, "full");
        let resp = b.finalize(&mut ctx);
        assert_eq!(resp.code, RespCode::ArrayFull);
    }

    #[test]
    fn info_latch_rides_along_without_code_change() {
        let mut ctx = SystemContext::new();
        ctx.latch_info("Serial communication changes require a RESET.");
        let resp = ResponseBuilder::new().finalize(&mut ctx);
        assert_eq!(resp.code, RespCode::Ok);
        assert_eq!(
            resp.json["lastInfoMsg"],
            "Serial communication changes require a RESET."
        );
    }

    #[test]
    fn render_compact_and_pretty() {
        let mut ctx = SystemContext::new();
        let resp = ResponseBuilder::new().finalize(&mut ctx);
        let compact = resp.render(OutputFormat::JsonCompact);
        assert!(!compact.contains('\n'));
        let pretty = resp.render(OutputFormat::JsonPretty);
        assert!(pretty.contains('\n'));
    }
}
