//! Persistent command store.
//!
//! A capacity-bounded array of command rows plus a handful of scalar
//! settings, kept in a byte-addressable non-volatile region behind the
//! [`NvMedium`] port.  Rows are contiguous: every mutation shifts
//! neighbours so no gap is ever persisted, and the row count is written
//! only after the rows themselves, so a power cut mid-insert leaves the
//! previous count (and a fully-written prefix) rather than a torn row.
//!
//! Opening the store validates the schema tag; any mismatch (fresh part,
//! older firmware, corruption) wipes the region back to defaults.

pub mod layout;
pub mod memory;

pub use memory::MemoryMedium;

use log::info;

use crate::config::{OutputFormat, SerialFrame, StoredSettings, BOARD_NAME_MAX};
use crate::error::{StoreError, StoreResult};
use crate::pattern;
use crate::ports::NvMedium;

/// One stored command row.
pub type Row = heapless::String<{ layout::ROW_WIDTH }>;

/// Append position for [`CommandStore::insert_command_at`].
pub const APPEND: isize = -1;

/// The persistent command array and its scalar settings.
#[derive(Debug)]
pub struct CommandStore<M: NvMedium> {
    medium: M,
    count: usize,
}

impl<M: NvMedium> CommandStore<M> {
    /// Open the store, wiping the region if the schema tag does not match.
    pub fn open(medium: M) -> StoreResult<Self> {
        if medium.capacity() < layout::REGION_LEN {
            return Err(StoreError::Medium);
        }
        let mut store = Self { medium, count: 0 };
        if store.version()? != layout::SCHEMA_VERSION {
            info!(
                "nv region schema mismatch, formatting as '{}'",
                layout::SCHEMA_VERSION
            );
            store.wipe()?;
        }
        let count = store.read_u32(layout::COUNT_OFFSET)? as usize;
        if count > layout::CAPACITY {
            info!("nv region count {count} exceeds capacity, formatting");
            store.wipe()?;
        } else {
            store.count = count;
        }
        Ok(store)
    }

    /// Reset the whole region to defaults and stamp the schema tag.
    pub fn wipe(&mut self) -> StoreResult<()> {
        let zeros = [0u8; layout::ROW_WIDTH];
        let mut offset = 0;
        while offset < layout::REGION_LEN {
            let len = zeros.len().min(layout::REGION_LEN - offset);
            self.medium.write(offset, &zeros[..len])?;
            offset += len;
        }
        self.write_padded(
            layout::VERSION_OFFSET,
            layout::VERSION_LEN,
            layout::SCHEMA_VERSION.as_bytes(),
        )?;
        let defaults = StoredSettings::default();
        self.set_output_format(defaults.output_format)?;
        self.set_serial_speed(defaults.serial_speed)?;
        self.set_serial_frame(defaults.serial_frame)?;
        self.count = 0;
        self.write_u32(layout::COUNT_OFFSET, 0)
    }

    /// Hand the medium back, e.g. to snapshot it.
    pub fn into_medium(self) -> M {
        self.medium
    }

    // ── Rows ──────────────────────────────────────────────────

    pub fn count(&self) -> usize {
        self.count
    }

    /// Read the row at `index` (`0 <= index < count`).
    pub fn command_at(&self, index: usize) -> StoreResult<Row> {
        if index >= self.count {
            return Err(StoreError::IndexOutOfBounds);
        }
        let mut raw = [0u8; layout::ROW_WIDTH];
        self.medium.read(layout::row_offset(index), &mut raw)?;
        let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let text = core::str::from_utf8(&raw[..len]).map_err(|_| StoreError::Medium)?;
        Row::try_from(text).map_err(|_| StoreError::Medium)
    }

    /// Overwrite the row at `index` in place.
    pub fn set_command_at(&mut self, index: usize, text: &str) -> StoreResult<()> {
        if index >= self.count {
            return Err(StoreError::IndexOutOfBounds);
        }
        self.write_row(index, text)
    }

    /// Insert a row at `index`, shifting the tail down.  `APPEND` (-1)
    /// inserts after the last row; otherwise `0 <= index <= count`.
    pub fn insert_command_at(&mut self, index: isize, text: &str) -> StoreResult<usize> {
        let index = if index == APPEND {
            self.count
        } else {
            usize::try_from(index).map_err(|_| StoreError::IndexOutOfBounds)?
        };
        if index > self.count {
            return Err(StoreError::IndexOutOfBounds);
        }
        if self.count >= layout::CAPACITY {
            return Err(StoreError::ArrayFull);
        }
        // Shift tail-first so an interrupted shift duplicates a row instead
        // of losing one; count is bumped only after every row is in place.
        let mut i = self.count;
        while i > index {
            self.copy_row(i - 1, i)?;
            i -= 1;
        }
        self.write_row(index, text)?;
        self.count += 1;
        self.write_u32(layout::COUNT_OFFSET, self.count as u32)?;
        Ok(index)
    }

    /// Append after the last row.
    pub fn append_command(&mut self, text: &str) -> StoreResult<usize> {
        self.insert_command_at(APPEND, text)
    }

    /// Remove the row at `index`, shifting the tail up.
    pub fn remove_command_at(&mut self, index: usize) -> StoreResult<()> {
        if index >= self.count {
            return Err(StoreError::IndexOutOfBounds);
        }
        for i in index + 1..self.count {
            self.copy_row(i, i - 1)?;
        }
        self.count -= 1;
        self.write_u32(layout::COUNT_OFFSET, self.count as u32)
    }

    /// Drop every row.  Returns how many were dropped.
    pub fn remove_all_commands(&mut self) -> StoreResult<usize> {
        let removed = self.count;
        self.count = 0;
        self.write_u32(layout::COUNT_OFFSET, 0)?;
        Ok(removed)
    }

    /// Index of the first row matching a wildcard pattern.
    pub fn find_command(&self, pattern: &str) -> StoreResult<usize> {
        if pattern.is_empty() {
            return Err(StoreError::NullArgument);
        }
        for i in 0..self.count {
            if pattern::matches(pattern, &self.command_at(i)?) {
                return Ok(i);
            }
        }
        Err(StoreError::NotFound)
    }

    /// Remove the first (or, with `all`, every) row matching `pattern`.
    /// Returns how many rows were removed; no match is `Ok(0)`.
    pub fn remove_command(&mut self, pattern: &str, all: bool) -> StoreResult<usize> {
        if pattern.is_empty() {
            return Err(StoreError::NullArgument);
        }
        let mut removed = 0;
        loop {
            match self.find_command(pattern) {
                Ok(i) => {
                    self.remove_command_at(i)?;
                    removed += 1;
                    if !all {
                        break;
                    }
                }
                Err(StoreError::NotFound) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }

    /// Replace the first row matching `pattern` with `text`.  When no row
    /// matches and `add_if_missing` is set, append instead.  Returns the
    /// affected index.
    pub fn replace_command(
        &mut self,
        pattern: &str,
        text: &str,
        add_if_missing: bool,
    ) -> StoreResult<usize> {
        match self.find_command(pattern) {
            Ok(i) => {
                self.set_command_at(i, text)?;
                Ok(i)
            }
            Err(StoreError::NotFound) if add_if_missing => self.append_command(text),
            Err(e) => Err(e),
        }
    }

    // ── Scalar settings ───────────────────────────────────────

    pub fn version(&self) -> StoreResult<String> {
        let mut raw = [0u8; layout::VERSION_LEN];
        self.medium.read(layout::VERSION_OFFSET, &mut raw)?;
        let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..len]).into_owned())
    }

    pub fn output_format(&self) -> StoreResult<OutputFormat> {
        let mut b = [0u8; 1];
        self.medium.read(layout::FORMAT_OFFSET, &mut b)?;
        Ok(OutputFormat::from_byte(b[0]))
    }

    pub fn set_output_format(&mut self, fmt: OutputFormat) -> StoreResult<()> {
        self.medium.write(layout::FORMAT_OFFSET, &[fmt.to_byte()])
    }

    pub fn serial_speed(&self) -> StoreResult<u32> {
        self.read_u32(layout::SPEED_OFFSET)
    }

    pub fn set_serial_speed(&mut self, speed: u32) -> StoreResult<()> {
        self.write_u32(layout::SPEED_OFFSET, speed)
    }

    pub fn serial_frame(&self) -> StoreResult<SerialFrame> {
        Ok(SerialFrame::from_u32(self.read_u32(layout::FRAME_OFFSET)?))
    }

    pub fn set_serial_frame(&mut self, frame: SerialFrame) -> StoreResult<()> {
        self.write_u32(layout::FRAME_OFFSET, frame.to_u32())
    }

    pub fn board_name(&self) -> StoreResult<String> {
        let mut raw = [0u8; layout::BOARD_NAME_LEN];
        self.medium.read(layout::BOARD_NAME_OFFSET, &mut raw)?;
        let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..len]).into_owned())
    }

    pub fn set_board_name(&mut self, name: &str) -> StoreResult<()> {
        if name.len() > BOARD_NAME_MAX {
            return Err(StoreError::RowTooLong);
        }
        self.write_padded(layout::BOARD_NAME_OFFSET, layout::BOARD_NAME_LEN, name.as_bytes())
    }

    pub fn board_id(&self) -> StoreResult<u32> {
        self.read_u32(layout::BOARD_ID_OFFSET)
    }

    pub fn set_board_id(&mut self, id: u32) -> StoreResult<()> {
        self.write_u32(layout::BOARD_ID_OFFSET, id)
    }

    /// Decode every scalar setting, for the store listing.
    pub fn settings(&self) -> StoreResult<StoredSettings> {
        Ok(StoredSettings {
            version: self.version()?,
            output_format: self.output_format()?,
            serial_speed: self.serial_speed()?,
            serial_frame: self.serial_frame()?,
            board_name: self.board_name()?,
            board_id: self.board_id()?,
        })
    }

    // ── Raw helpers ───────────────────────────────────────────

    fn write_row(&mut self, index: usize, text: &str) -> StoreResult<()> {
        // The slot always keeps a NUL terminator, so text tops out one
        // byte short of the row width.
        if text.len() >= layout::ROW_WIDTH {
            return Err(StoreError::RowTooLong);
        }
        let mut raw = [0u8; layout::ROW_WIDTH];
        raw[..text.len()].copy_from_slice(text.as_bytes());
        self.medium.write(layout::row_offset(index), &raw)
    }

    fn copy_row(&mut self, from: usize, to: usize) -> StoreResult<()> {
        let mut raw = [0u8; layout::ROW_WIDTH];
        self.medium.read(layout::row_offset(from), &mut raw)?;
        self.medium.write(layout::row_offset(to), &raw)
    }

    fn read_u32(&self, offset: usize) -> StoreResult<u32> {
        let mut raw = [0u8; 4];
        self.medium.read(offset, &mut raw)?;
        Ok(u32::from_le_bytes(raw))
    }

    fn write_u32(&mut self, offset: usize, value: u32) -> StoreResult<()> {
        self.medium.write(offset, &value.to_le_bytes())
    }

    fn write_padded(&mut self, offset: usize, width: usize, data: &[u8]) -> StoreResult<()> {
        debug_assert!(data.len() <= width);
        self.medium.write(offset, data)?;
        let pad = vec![0u8; width - data.len()];
        if !pad.is_empty() {
            self.medium.write(offset + data.len(), &pad)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> CommandStore<MemoryMedium> {
        CommandStore::open(MemoryMedium::new()).unwrap()
    }

    #[test]
    fn fresh_medium_is_formatted() {
        let store = fresh();
        assert_eq!(store.count(), 0);
        assert_eq!(store.version().unwrap(), layout::SCHEMA_VERSION);
        assert_eq!(store.serial_speed().unwrap(), 38_400);
        assert_eq!(store.serial_frame().unwrap(), SerialFrame::Frame8N1);
        assert_eq!(store.output_format().unwrap(), OutputFormat::JsonCompact);
    }

    #[test]
    fn rows_survive_reopen() {
        let mut store = fresh();
        store.append_command("GET,SENSORS").unwrap();
        store.append_command("SET,DEVICE,*,CAPABILITY/TOGGLE,OFF").unwrap();

        let store = CommandStore::open(store.into_medium()).unwrap();
        assert_eq!(store.count(), 2);
        assert_eq!(store.command_at(0).unwrap().as_str(), "GET,SENSORS");
    }

    #[test]
    fn version_mismatch_wipes() {
        let mut store = fresh();
        store.append_command("GET,SENSORS").unwrap();
        let mut medium = store.into_medium();
        use crate::ports::NvMedium as _;
        medium.write(layout::VERSION_OFFSET, b"oldschema!").unwrap();

        let store = CommandStore::open(medium).unwrap();
        assert_eq!(store.count(), 0);
        assert_eq!(store.version().unwrap(), layout::SCHEMA_VERSION);
    }

    #[test]
    fn insert_shifts_tail() {
        let mut store = fresh();
        store.append_command("a").unwrap();
        store.append_command("c").unwrap();
        assert_eq!(store.insert_command_at(1, "b").unwrap(), 1);
        let rows: Vec<String> = (0..store.count())
            .map(|i| store.command_at(i).unwrap().to_string())
            .collect();
        assert_eq!(rows, ["a", "b", "c"]);
    }

    #[test]
    fn append_position_and_bounds() {
        let mut store = fresh();
        assert_eq!(store.insert_command_at(APPEND, "a").unwrap(), 0);
        assert_eq!(store.insert_command_at(1, "b").unwrap(), 1);
        assert_eq!(
            store.insert_command_at(5, "x"),
            Err(StoreError::IndexOutOfBounds)
        );
        assert_eq!(
            store.insert_command_at(-2, "x"),
            Err(StoreError::IndexOutOfBounds)
        );
    }

    #[test]
    fn full_store_rejects_and_keeps_count() {
        let mut store = fresh();
        for i in 0..layout::CAPACITY {
            store.append_command(&format!("cmd{i}")).unwrap();
        }
        assert_eq!(store.append_command("extra"), Err(StoreError::ArrayFull));
        assert_eq!(store.count(), layout::CAPACITY);
        assert_eq!(store.command_at(0).unwrap().as_str(), "cmd0");
    }

    #[test]
    fn remove_shifts_up() {
        let mut store = fresh();
        for cmd in ["a", "b", "c"] {
            store.append_command(cmd).unwrap();
        }
        store.remove_command_at(1).unwrap();
        assert_eq!(store.count(), 2);
        assert_eq!(store.command_at(0).unwrap().as_str(), "a");
        assert_eq!(store.command_at(1).unwrap().as_str(), "c");
        assert_eq!(store.command_at(2), Err(StoreError::IndexOutOfBounds));
    }

    #[test]
    fn row_too_long_rejected() {
        let mut store = fresh();
        // The full row width leaves no room for the terminator.
        let long = "x".repeat(layout::ROW_WIDTH);
        assert_eq!(store.append_command(&long), Err(StoreError::RowTooLong));
        assert_eq!(store.count(), 0);
        let exact = "y".repeat(layout::ROW_WIDTH - 1);
        assert_eq!(store.append_command(&exact), Ok(0));
        assert_eq!(store.command_at(0).unwrap().len(), layout::ROW_WIDTH - 1);
    }

    #[test]
    fn find_is_wildcard_and_case_insensitive() {
        let mut store = fresh();
        store.append_command("GET,SENSORS").unwrap();
        store.append_command("SET,DEVICE,Fan*,CAPABILITY/TOGGLE,ON").unwrap();
        assert_eq!(store.find_command("get,*").unwrap(), 0);
        assert_eq!(store.find_command("*TOGGLE*").unwrap(), 1);
        assert_eq!(store.find_command("*pump*"), Err(StoreError::NotFound));
        assert_eq!(store.find_command(""), Err(StoreError::NullArgument));
    }

    #[test]
    fn remove_by_pattern_first_and_all() {
        let mut store = fresh();
        for cmd in ["GET,SENSORS", "GET,DEVICES", "SET,X"] {
            store.append_command(cmd).unwrap();
        }
        assert_eq!(store.remove_command("GET,*", false).unwrap(), 1);
        assert_eq!(store.count(), 2);
        assert_eq!(store.remove_command("GET,*", true).unwrap(), 1);
        assert_eq!(store.remove_command("GET,*", true).unwrap(), 0);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn replace_or_add() {
        let mut store = fresh();
        store.append_command("VERBOSE,GET,SENSORS").unwrap();
        assert_eq!(
            store.replace_command("VERBOSE,*", "GET,SENSORS", false).unwrap(),
            0
        );
        assert_eq!(store.command_at(0).unwrap().as_str(), "GET,SENSORS");
        assert_eq!(
            store.replace_command("*pump*", "GET,DEVICES", false),
            Err(StoreError::NotFound)
        );
        assert_eq!(
            store.replace_command("*pump*", "GET,DEVICES", true).unwrap(),
            1
        );
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn board_identity_roundtrip() {
        let mut store = fresh();
        store.set_board_name("shed-east").unwrap();
        store.set_board_id(7).unwrap();
        let mut store = CommandStore::open(store.into_medium()).unwrap();
        assert_eq!(store.board_name().unwrap(), "shed-east");
        assert_eq!(store.board_id().unwrap(), 7);
        assert!(store
            .set_board_name("a-name-well-beyond-the-slot")
            .is_err());
    }

    #[test]
    fn settings_snapshot() {
        let mut store = fresh();
        store.set_output_format(OutputFormat::JsonPretty).unwrap();
        store.set_serial_speed(115_200).unwrap();
        let s = store.settings().unwrap();
        assert_eq!(s.output_format, OutputFormat::JsonPretty);
        assert_eq!(s.serial_speed, 115_200);
        assert_eq!(s.version, layout::SCHEMA_VERSION);
    }
}
