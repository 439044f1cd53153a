//! Byte-addressable view over the linear memory a module runs against.
//!
//! The host allocates one fixed-size memory per run and never grows it. Every
//! primitive the module imports reaches the bytes through [`AddressableMemory`],
//! which addresses them by unsigned 32-bit offsets.

use std::fmt;
use std::ops::Range;

/// Size of a single WebAssembly page in bytes.
pub const WASM_PAGE_SIZE: usize = 64 * 1024;

/// Pages backing a run unless configured otherwise (1 MiB).
pub const DEFAULT_HEAP_PAGES: u32 = 16;

/// Largest page count a 32-bit linear memory can declare.
pub const MAX_HEAP_PAGES: u32 = 65_536;

/// Access that does not fit inside the linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    OutOfRange {
        addr: u32,
        len: usize,
        capacity: usize,
    },
    Unterminated {
        addr: u32,
        capacity: usize,
    },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::OutOfRange {
                addr,
                len,
                capacity,
            } => write!(
                f,
                "memory access at 0x{addr:08X} len {len} exceeds capacity 0x{capacity:08X}"
            ),
            MemoryError::Unterminated { addr, capacity } => write!(
                f,
                "string at 0x{addr:08X} has no terminator before capacity 0x{capacity:08X}"
            ),
        }
    }
}

impl std::error::Error for MemoryError {}

/// Mutable view over the bytes of one module's linear memory.
pub struct AddressableMemory<'a> {
    bytes: &'a mut [u8],
}

impl<'a> AddressableMemory<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Byte stored at `base + offset`.
    pub fn byte_at(&self, base: u32, offset: u32) -> Result<u8, MemoryError> {
        let index = base as usize + offset as usize;
        self.bytes
            .get(index)
            .copied()
            .ok_or(MemoryError::OutOfRange {
                addr: base,
                len: offset as usize + 1,
                capacity: self.capacity(),
            })
    }

    pub fn read(&self, addr: u32, len: u32) -> Result<&[u8], MemoryError> {
        let range = self.range(addr, len as usize)?;
        Ok(&self.bytes[range])
    }

    pub fn fill(&mut self, addr: u32, value: u8, len: u32) -> Result<(), MemoryError> {
        let range = self.range(addr, len as usize)?;
        self.bytes[range].fill(value);
        Ok(())
    }

    /// Copies `len` bytes one at a time in ascending address order.
    ///
    /// Overlapping ranges are not treated specially: a destination that starts
    /// inside the source observes bytes already written by this call.
    pub fn copy_forward(&mut self, dst: u32, src: u32, len: u32) -> Result<(), MemoryError> {
        let to = self.range(dst, len as usize)?;
        let from = self.range(src, len as usize)?;
        for (d, s) in to.zip(from) {
            self.bytes[d] = self.bytes[s];
        }
        Ok(())
    }

    /// Bytes from `addr` up to, but excluding, the first zero byte.
    pub fn c_str(&self, addr: u32) -> Result<&[u8], MemoryError> {
        let start = addr as usize;
        let tail = self.bytes.get(start..).ok_or(MemoryError::OutOfRange {
            addr,
            len: 1,
            capacity: self.capacity(),
        })?;
        let len = tail
            .iter()
            .position(|byte| *byte == 0)
            .ok_or(MemoryError::Unterminated {
                addr,
                capacity: self.capacity(),
            })?;
        Ok(&tail[..len])
    }

    fn range(&self, addr: u32, len: usize) -> Result<Range<usize>, MemoryError> {
        let start = addr as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(MemoryError::OutOfRange {
                addr,
                len,
                capacity: self.capacity(),
            }),
        }
    }
}

/// Byte length of a memory spanning `pages` WebAssembly pages.
#[must_use]
pub fn heap_size_bytes(pages: u32) -> usize {
    pages as usize * WASM_PAGE_SIZE
}
