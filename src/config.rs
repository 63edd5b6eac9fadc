//! Persisted controller settings
//!
//! Scalar configuration carried in the non-volatile region alongside the
//! command rows: response output format, serial link parameters, and board
//! identity.  Serial values are validated against the allow-lists below
//! before they are persisted; a change only takes effect after the transport
//! is re-initialised, which requires a RESET.

use serde::{Deserialize, Serialize};

/// Serial speeds the transport supports.
pub const SERIAL_SPEEDS: [u32; 7] = [9_600, 14_400, 19_200, 28_800, 38_400, 57_600, 115_200];

/// Maximum persisted board-name length (bytes, excluding terminator).
pub const BOARD_NAME_MAX: usize = 15;

/// Response rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    #[default]
    JsonCompact,
    JsonPretty,
}

impl OutputFormat {
    /// Parse the protocol keyword (case-insensitive).
    pub fn parse(text: &str) -> Option<Self> {
        if text.eq_ignore_ascii_case("JSON_COMPACT") {
            Some(Self::JsonCompact)
        } else if text.eq_ignore_ascii_case("JSON_PRETTY") {
            Some(Self::JsonPretty)
        } else {
            None
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JsonCompact => "JSON_COMPACT",
            Self::JsonPretty => "JSON_PRETTY",
        }
    }

    /// Persisted single-byte tag.
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::JsonCompact => 0,
            Self::JsonPretty => 1,
        }
    }

    /// Decode the persisted tag; unknown bytes fall back to compact so a
    /// blank or corrupted cell never wedges the console.
    pub const fn from_byte(b: u8) -> Self {
        match b {
            1 => Self::JsonPretty,
            _ => Self::JsonCompact,
        }
    }
}

/// Serial frame configuration (data bits / parity / stop bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SerialFrame {
    #[default]
    Frame8N1,
    Frame8E1,
    Frame8O1,
}

impl SerialFrame {
    pub fn parse(text: &str) -> Option<Self> {
        if text.eq_ignore_ascii_case("8N1") {
            Some(Self::Frame8N1)
        } else if text.eq_ignore_ascii_case("8E1") {
            Some(Self::Frame8E1)
        } else if text.eq_ignore_ascii_case("8O1") {
            Some(Self::Frame8O1)
        } else {
            None
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Frame8N1 => "8N1",
            Self::Frame8E1 => "8E1",
            Self::Frame8O1 => "8O1",
        }
    }

    /// Persisted 4-byte tag (the slot predates the enum and stays 4 bytes
    /// wide for layout stability).
    pub const fn to_u32(self) -> u32 {
        match self {
            Self::Frame8N1 => 0x06,
            Self::Frame8E1 => 0x26,
            Self::Frame8O1 => 0x36,
        }
    }

    pub const fn from_u32(v: u32) -> Self {
        match v {
            0x26 => Self::Frame8E1,
            0x36 => Self::Frame8O1,
            _ => Self::Frame8N1,
        }
    }
}

/// Validate a requested serial speed against the allow-list.
pub fn is_valid_serial_speed(speed: u32) -> bool {
    SERIAL_SPEEDS.contains(&speed)
}

/// Scalar settings as a decoded whole, for rendering `GET EEPROM`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSettings {
    pub version: String,
    pub output_format: OutputFormat,
    pub serial_speed: u32,
    pub serial_frame: SerialFrame,
    pub board_name: String,
    pub board_id: u32,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            version: String::new(),
            output_format: OutputFormat::JsonCompact,
            serial_speed: 38_400,
            serial_frame: SerialFrame::Frame8N1,
            board_name: String::new(),
            board_id: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_parses_case_insensitive() {
        assert_eq!(
            OutputFormat::parse("json_pretty"),
            Some(OutputFormat::JsonPretty)
        );
        assert_eq!(
            OutputFormat::parse("JSON_COMPACT"),
            Some(OutputFormat::JsonCompact)
        );
        assert_eq!(OutputFormat::parse("YAML"), None);
    }

    #[test]
    fn output_format_byte_roundtrip() {
        for fmt in [OutputFormat::JsonCompact, OutputFormat::JsonPretty] {
            assert_eq!(OutputFormat::from_byte(fmt.to_byte()), fmt);
        }
        // Corrupt cell falls back to compact.
        assert_eq!(OutputFormat::from_byte(0xFF), OutputFormat::JsonCompact);
    }

    #[test]
    fn serial_frame_roundtrip() {
        for frame in [
            SerialFrame::Frame8N1,
            SerialFrame::Frame8E1,
            SerialFrame::Frame8O1,
        ] {
            assert_eq!(SerialFrame::from_u32(frame.to_u32()), frame);
            assert_eq!(SerialFrame::parse(frame.as_str()), Some(frame));
        }
        assert_eq!(SerialFrame::parse("7E2"), None);
    }

    #[test]
    fn speed_allow_list() {
        assert!(is_valid_serial_speed(115_200));
        assert!(is_valid_serial_speed(9_600));
        assert!(!is_valid_serial_speed(2_400));
        assert!(!is_valid_serial_speed(0));
    }

    #[test]
    fn default_settings_are_sane() {
        let s = StoredSettings::default();
        assert!(is_valid_serial_speed(s.serial_speed));
        assert_eq!(s.serial_frame, SerialFrame::Frame8N1);
        assert_eq!(s.output_format, OutputFormat::JsonCompact);
    }
}
