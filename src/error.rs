//! Unified response and error codes for the Powerbox core.
//!
//! Every command line resolves to exactly one [`RespCode`]; subsystem errors
//! (store position/capacity, lookup misses, argument shape) convert into it,
//! keeping the interpreter's terminal-code handling uniform.  All variants are
//! `Copy` so they pass through the evaluation path without allocation.
//!
//! The numeric values ride on the wire in the `respCode` envelope field and
//! are part of the protocol: clients pattern-match on them.

use core::fmt;

// ---------------------------------------------------------------------------
// Protocol response codes
// ---------------------------------------------------------------------------

/// Terminal code for one protocol line.
///
/// `Ok` is 0; errors are negative, loosely grouped like HTTP classes:
/// `-4xx` for request problems, `-5xx` for controller-side failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum RespCode {
    Ok = 0,
    /// Generic controller-side failure.
    CmdError = -500,
    /// The command store already holds its maximum number of rows.
    ArrayFull = -507,
    /// Bad keyword, missing field, or unparsable number in the request.
    InvalidArgument = -400,
    /// No entity (or stored command) matched the given id/name/pattern.
    NotFound = -404,
    /// A required text argument was empty or absent.
    NullArgument = -412,
    /// A row index fell outside `[0, count)`.
    IndexOutOfBounds = -416,
}

impl RespCode {
    /// Wire value for the `respCode` envelope field.
    pub const fn value(self) -> i16 {
        self as i16
    }

    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Symbolic label used by [`error_desc`].
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::CmdError => "CMD_ERROR",
            Self::ArrayFull => "ARRAY_FULL",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotFound => "NOT_FOUND",
            Self::NullArgument => "NULL_ARGUMENT",
            Self::IndexOutOfBounds => "INDEX_OUT_OF_BOUNDS",
        }
    }
}

impl fmt::Display for RespCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label(), self.value())
    }
}

/// Human-readable description of a command outcome, e.g.
/// `"SETUP,INSERT_AT ERROR: INDEX_OUT_OF_BOUNDS(-416)"`.
pub fn error_desc(context: &str, code: RespCode) -> String {
    let verdict = if code.is_ok() { " OK: " } else { " ERROR: " };
    format!("{context}{verdict}{code}")
}

// ---------------------------------------------------------------------------
// Command store errors
// ---------------------------------------------------------------------------

/// Failures surfaced by the persistent command store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Row index outside the valid range for the operation.
    IndexOutOfBounds,
    /// The store already holds `CAPACITY` rows.
    ArrayFull,
    /// A required pattern/text argument was empty.
    NullArgument,
    /// No row matched the search pattern.
    NotFound,
    /// Row text exceeds the fixed row width.
    RowTooLong,
    /// The medium rejected an access or a row failed to decode.
    Medium,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfBounds => write!(f, "index out of bounds"),
            Self::ArrayFull => write!(f, "command array full"),
            Self::NullArgument => write!(f, "null argument"),
            Self::NotFound => write!(f, "not found"),
            Self::RowTooLong => write!(f, "command exceeds row width"),
            Self::Medium => write!(f, "storage medium error"),
        }
    }
}

impl From<StoreError> for RespCode {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::IndexOutOfBounds => Self::IndexOutOfBounds,
            StoreError::ArrayFull => Self::ArrayFull,
            StoreError::NullArgument => Self::NullArgument,
            StoreError::NotFound => Self::NotFound,
            StoreError::RowTooLong => Self::InvalidArgument,
            StoreError::Medium => Self::CmdError,
        }
    }
}

impl std::error::Error for StoreError {}

/// Store results funnel through this alias.
pub type StoreResult<T> = core::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_keep_wire_values() {
        assert_eq!(RespCode::Ok.value(), 0);
        assert_eq!(RespCode::CmdError.value(), -500);
        assert_eq!(RespCode::ArrayFull.value(), -507);
        assert_eq!(RespCode::InvalidArgument.value(), -400);
        assert_eq!(RespCode::NotFound.value(), -404);
        assert_eq!(RespCode::NullArgument.value(), -412);
        assert_eq!(RespCode::IndexOutOfBounds.value(), -416);
    }

    #[test]
    fn error_desc_formats_context_and_label() {
        let s = error_desc("SETUP,ADD", RespCode::ArrayFull);
        assert_eq!(s, "SETUP,ADD ERROR: ARRAY_FULL(-507)");
        let ok = error_desc("SETUP,ADD", RespCode::Ok);
        assert_eq!(ok, "SETUP,ADD OK: OK(0)");
    }

    #[test]
    fn store_errors_map_to_protocol_codes() {
        assert_eq!(RespCode::from(StoreError::ArrayFull), RespCode::ArrayFull);
        assert_eq!(RespCode::from(StoreError::NotFound), RespCode::NotFound);
        assert_eq!(
            RespCode::from(StoreError::IndexOutOfBounds),
            RespCode::IndexOutOfBounds
        );
        assert_eq!(
            RespCode::from(StoreError::RowTooLong),
            RespCode::InvalidArgument
        );
    }
}
