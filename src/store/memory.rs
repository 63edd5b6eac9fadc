//! In-memory medium: the test double and the default for host builds.

use crate::error::{StoreError, StoreResult};
use crate::ports::NvMedium;

use super::layout;

/// Byte array standing in for an EEPROM part.  Fresh instances are
/// all-zero, which the store treats as a schema mismatch and wipes.
#[derive(Debug, Clone)]
pub struct MemoryMedium {
    bytes: Vec<u8>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self {
            bytes: vec![0; layout::REGION_LEN],
        }
    }

    /// Wrap an existing dump, e.g. one read from a file.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for MemoryMedium {
    fn default() -> Self {
        Self::new()
    }
}

impl NvMedium for MemoryMedium {
    fn read(&self, offset: usize, buf: &mut [u8]) -> StoreResult<()> {
        let end = offset.checked_add(buf.len()).ok_or(StoreError::Medium)?;
        let src = self.bytes.get(offset..end).ok_or(StoreError::Medium)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> StoreResult<()> {
        let end = offset.checked_add(data.len()).ok_or(StoreError::Medium)?;
        let dst = self.bytes.get_mut(offset..end).ok_or(StoreError::Medium)?;
        dst.copy_from_slice(data);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let mut m = MemoryMedium::new();
        m.write(100, b"hello").unwrap();
        let mut buf = [0u8; 5];
        m.read(100, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn out_of_range_is_a_medium_error() {
        let mut m = MemoryMedium::new();
        let mut buf = [0u8; 8];
        assert_eq!(
            m.read(layout::REGION_LEN - 4, &mut buf),
            Err(StoreError::Medium)
        );
        assert_eq!(
            m.write(layout::REGION_LEN, b"x"),
            Err(StoreError::Medium)
        );
    }
}
