use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::Context;

/// Value of a byte that was never written.
pub const ERASED: u8 = 0xFF;

/// EEPROM capacity of the flight controller board (Teensy 4.0 emulated EEPROM).
pub const EEPROM_SIZE: usize = 1080;

/// Byte-addressed non-volatile storage.
pub trait Storage {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> anyhow::Result<()>;
    fn write(&mut self, offset: usize, data: &[u8]) -> anyhow::Result<()>;
}

/// A file standing in for the EEPROM.
///
/// A missing file, or bytes past its end, read as erased. Accesses beyond
/// [`EEPROM_SIZE`] fail as they would on the board.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileStorage {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> anyhow::Result<()> {
        check_bounds(offset, buf.len(), EEPROM_SIZE)?;
        buf.fill(ERASED);
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(e).with_context(|| format!("opening {}", self.path.display()));
            }
        };

        file.seek(SeekFrom::Start(offset as u64))?;
        let mut filled = 0;
        while filled < buf.len() {
            let n = file
                .read(&mut buf[filled..])
                .with_context(|| format!("reading {}", self.path.display()))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> anyhow::Result<()> {
        check_bounds(offset, data.len(), EEPROM_SIZE)?;
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)
            .with_context(|| format!("opening {} for writing", self.path.display()))?;

        let len = file.metadata()?.len() as usize;
        if len < offset {
            file.seek(SeekFrom::End(0))?;
            file.write_all(&vec![ERASED; offset - len])?;
        }
        file.seek(SeekFrom::Start(offset as u64))?;
        file.write_all(data)
            .with_context(|| format!("writing {}", self.path.display()))?;
        file.sync_all()?;
        Ok(())
    }
}

fn check_bounds(offset: usize, len: usize, capacity: usize) -> anyhow::Result<Range<usize>> {
    offset
        .checked_add(len)
        .filter(|&end| end <= capacity)
        .map(|end| offset..end)
        .with_context(|| format!("access of {len} bytes at {offset} exceeds capacity {capacity}"))
}

/// In-memory EEPROM image, initially erased.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct MemStorage {
    bytes: Vec<u8>,
}

#[cfg(test)]
impl MemStorage {
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![ERASED; capacity],
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Invert one bit, addressed from the start of the image.
    pub fn flip_bit(&mut self, bit: usize) {
        self.bytes[bit / 8] ^= 1 << (bit % 8);
    }
}

#[cfg(test)]
impl Default for MemStorage {
    fn default() -> Self {
        Self::new(EEPROM_SIZE)
    }
}

#[cfg(test)]
impl Storage for MemStorage {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> anyhow::Result<()> {
        let range = check_bounds(offset, buf.len(), self.bytes.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> anyhow::Result<()> {
        let range = check_bounds(offset, data.len(), self.bytes.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }
}
