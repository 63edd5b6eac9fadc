//! Fixed byte layout of the non-volatile region.
//!
//! ```text
//!   offset  width  field
//!   ──────  ─────  ─────────────────────────────
//!        0     10  schema version (NUL-padded)
//!       10      1  output format tag
//!       11      4  serial speed (u32 LE)
//!       15      4  serial frame tag (u32 LE)
//!       19      4  row count (u32 LE)
//!       23   1600  command rows (20 × 80, NUL-padded)
//!     1623     16  board name (NUL-terminated)
//!     1639      4  board id (u32 LE)
//! ```
//!
//! Offsets are frozen: tools in the field read raw dumps of this region.
//! New fields append after BOARD_ID; nothing moves.

/// Schema tag at offset 0.  A mismatch on open wipes the region back to
/// defaults, so bump this whenever the layout below changes.
pub const SCHEMA_VERSION: &str = "powerbox.3";

pub const VERSION_OFFSET: usize = 0;
pub const VERSION_LEN: usize = 10;

pub const FORMAT_OFFSET: usize = VERSION_OFFSET + VERSION_LEN;

pub const SPEED_OFFSET: usize = FORMAT_OFFSET + 1;

pub const FRAME_OFFSET: usize = SPEED_OFFSET + 4;

pub const COUNT_OFFSET: usize = FRAME_OFFSET + 4;

pub const ROWS_OFFSET: usize = COUNT_OFFSET + 4;

/// Maximum stored command rows.
pub const CAPACITY: usize = 20;

/// Fixed row width in bytes.  Command text occupies at most
/// `ROW_WIDTH - 1` bytes; the remainder is NUL padding, so every row
/// carries a terminator.
pub const ROW_WIDTH: usize = 80;

pub const BOARD_NAME_OFFSET: usize = ROWS_OFFSET + CAPACITY * ROW_WIDTH;
pub const BOARD_NAME_LEN: usize = 16;

pub const BOARD_ID_OFFSET: usize = BOARD_NAME_OFFSET + BOARD_NAME_LEN;

/// Total bytes the store addresses; the medium must be at least this large.
pub const REGION_LEN: usize = BOARD_ID_OFFSET + 4;

/// Absolute offset of row `index`.
pub const fn row_offset(index: usize) -> usize {
    ROWS_OFFSET + index * ROW_WIDTH
}
