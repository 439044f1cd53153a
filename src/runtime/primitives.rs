//! C memory and string routines modules import from the host.
//!
//! Every routine works purely through [`AddressableMemory`] and reports
//! accesses outside the linear memory as [`MemoryError`] instead of touching
//! host memory.

use super::memory::{AddressableMemory, MemoryError};
use super::output::OutputBuffer;

/// Copies `n` bytes from `src` to `dst` and returns `dst`.
pub fn copy(
    memory: &mut AddressableMemory<'_>,
    dst: u32,
    src: u32,
    n: u32,
) -> Result<u32, MemoryError> {
    memory.copy_forward(dst, src, n)?;
    Ok(dst)
}

/// Same copy as [`copy`], returning the address just past the written bytes.
pub fn copy_returning_end(
    memory: &mut AddressableMemory<'_>,
    dst: u32,
    src: u32,
    n: u32,
) -> Result<u32, MemoryError> {
    copy(memory, dst, src, n).map(|dst| dst.wrapping_add(n))
}

/// Stores the low byte of `value` into `n` bytes starting at `addr`.
pub fn fill(
    memory: &mut AddressableMemory<'_>,
    addr: u32,
    value: i32,
    n: u32,
) -> Result<u32, MemoryError> {
    memory.fill(addr, low_byte(value), n)?;
    Ok(addr)
}

/// Three-way comparison of two `n`-byte ranges.
///
/// Returns the difference of the first mismatching bytes, or 0 when the
/// ranges are equal.
pub fn compare(memory: &AddressableMemory<'_>, a: u32, b: u32, n: u32) -> Result<i32, MemoryError> {
    let lhs = memory.read(a, n)?;
    let rhs = memory.read(b, n)?;
    Ok(lhs
        .iter()
        .zip(rhs)
        .find(|(x, y)| x != y)
        .map_or(0, |(x, y)| i32::from(*x) - i32::from(*y)))
}

/// Absolute address of the first byte equal to the low byte of `ch`,
/// scanning from `addr`. The result is not relative to `addr`. The
/// terminator matches when `ch` is 0; otherwise reaching it yields the null
/// address.
pub fn find_char(memory: &AddressableMemory<'_>, addr: u32, ch: i32) -> Result<u32, MemoryError> {
    let needle = low_byte(ch);
    let mut offset = 0u32;
    loop {
        let byte = memory.byte_at(addr, offset)?;
        if byte == needle {
            return Ok(addr.wrapping_add(offset));
        }
        if byte == 0 {
            return Ok(0);
        }
        offset += 1;
    }
}

/// Three-way comparison of two zero-terminated strings scanned in lockstep.
pub fn string_compare(memory: &AddressableMemory<'_>, a: u32, b: u32) -> Result<i32, MemoryError> {
    let mut offset = 0u32;
    loop {
        let x = memory.byte_at(a, offset)?;
        let y = memory.byte_at(b, offset)?;
        if x != y {
            return Ok(i32::from(x) - i32::from(y));
        }
        if x == 0 {
            return Ok(0);
        }
        offset += 1;
    }
}

/// Number of bytes before the terminator.
pub fn string_length(memory: &AddressableMemory<'_>, addr: u32) -> Result<u32, MemoryError> {
    let mut offset = 0u32;
    while memory.byte_at(addr, offset)? != 0 {
        offset += 1;
    }
    Ok(offset)
}

/// Buffers the character for the low byte of `ch` and returns that byte.
pub fn emit_char(output: &mut OutputBuffer, ch: i32) -> i32 {
    let byte = low_byte(ch);
    output.push_byte(byte);
    i32::from(byte)
}

/// Buffers the string at `addr` followed by a newline.
pub fn emit_cstring(
    memory: &AddressableMemory<'_>,
    output: &mut OutputBuffer,
    addr: u32,
) -> Result<(), MemoryError> {
    output.push_bytes(memory.c_str(addr)?);
    output.push_newline();
    Ok(())
}

fn low_byte(value: i32) -> u8 {
    value.to_le_bytes()[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::output::ConsoleMode;

    fn heap_with(prefix: &[u8]) -> Vec<u8> {
        let mut heap = vec![0u8; 256];
        heap[..prefix.len()].copy_from_slice(prefix);
        heap
    }

    #[test]
    fn copy_duplicates_bytes_and_returns_destination() {
        let mut heap = heap_with(b"hello\0");
        let mut memory = AddressableMemory::new(&mut heap);
        assert_eq!(copy(&mut memory, 100, 0, 5), Ok(100));
        assert_eq!(memory.read(100, 5).expect("read"), b"hello");
    }

    #[test]
    fn copy_returning_end_points_past_region() {
        let mut heap = heap_with(b"abcdef");
        let mut memory = AddressableMemory::new(&mut heap);
        let end = copy_returning_end(&mut memory, 32, 0, 3).expect("first");
        assert_eq!(end, 35);
        let end = copy_returning_end(&mut memory, end, 3, 3).expect("second");
        assert_eq!(end, 38);
        assert_eq!(memory.read(32, 6).expect("read"), b"abcdef");
    }

    #[test]
    fn zero_length_copy_touches_nothing() {
        let mut heap = heap_with(b"xyz");
        let mut memory = AddressableMemory::new(&mut heap);
        assert_eq!(copy(&mut memory, 10, 0, 0), Ok(10));
        assert_eq!(memory.byte_at(10, 0), Ok(0));
    }

    #[test]
    fn fill_uses_low_eight_bits() {
        let mut heap = heap_with(&[]);
        let mut memory = AddressableMemory::new(&mut heap);
        assert_eq!(fill(&mut memory, 8, 0x1_41, 4), Ok(8));
        assert_eq!(memory.read(8, 4).expect("read"), b"AAAA");
        assert_eq!(memory.byte_at(12, 0), Ok(0));
        fill(&mut memory, 0, -1, 2).expect("fill");
        assert_eq!(memory.read(0, 2).expect("read"), [0xFF, 0xFF]);
    }

    #[test]
    fn compare_reports_sign_of_first_difference() {
        let mut heap = heap_with(b"abcx\0abdx\0abcx");
        let memory = AddressableMemory::new(&mut heap);
        assert!(compare(&memory, 0, 5, 4).expect("lt") < 0);
        assert!(compare(&memory, 5, 0, 4).expect("gt") > 0);
        assert_eq!(compare(&memory, 0, 10, 4), Ok(0));
        assert_eq!(compare(&memory, 0, 5, 2), Ok(0));
    }

    #[test]
    fn compare_treats_bytes_as_unsigned() {
        let mut heap = heap_with(&[0x80, 0x01]);
        let memory = AddressableMemory::new(&mut heap);
        assert!(compare(&memory, 0, 1, 1).expect("cmp") > 0);
    }

    #[test]
    fn find_char_returns_match_address() {
        let mut heap = heap_with(b"\0\0hello\0");
        let memory = AddressableMemory::new(&mut heap);
        assert_eq!(find_char(&memory, 2, i32::from(b'l')), Ok(4));
        assert_eq!(find_char(&memory, 2, i32::from(b'h') + 0x100), Ok(2));
    }

    #[test]
    fn find_char_distinguishes_terminator_from_missing() {
        let mut heap = heap_with(b"\0\0hello\0");
        let memory = AddressableMemory::new(&mut heap);
        assert_eq!(find_char(&memory, 2, 0), Ok(7));
        assert_eq!(find_char(&memory, 2, i32::from(b'z')), Ok(0));
    }

    #[test]
    fn string_compare_stops_at_terminator() {
        let mut heap = heap_with(b"same\0same\0samf\0sam\0");
        let memory = AddressableMemory::new(&mut heap);
        assert_eq!(string_compare(&memory, 0, 5), Ok(0));
        assert!(string_compare(&memory, 0, 10).expect("lt") < 0);
        assert!(string_compare(&memory, 10, 0).expect("gt") > 0);
        assert!(string_compare(&memory, 0, 15).expect("longer") > 0);
    }

    #[test]
    fn string_length_excludes_terminator() {
        let mut heap = heap_with(b"hello\0");
        let memory = AddressableMemory::new(&mut heap);
        assert_eq!(string_length(&memory, 0), Ok(5));
        assert_eq!(string_length(&memory, 5), Ok(0));
    }

    #[test]
    fn scanning_off_the_end_fails() {
        let mut heap = b"abc".to_vec();
        let memory = AddressableMemory::new(&mut heap);
        assert!(string_length(&memory, 0).is_err());
        assert!(find_char(&memory, 0, i32::from(b'z')).is_err());
    }

    #[test]
    fn emit_char_buffers_low_byte() {
        let mut output = OutputBuffer::new(ConsoleMode::Capture);
        assert_eq!(emit_char(&mut output, i32::from(b'A')), 65);
        assert_eq!(emit_char(&mut output, 0x142), 0x42);
        assert_eq!(output.pending(), "AB");
        assert_eq!(output.flush("done"), "ABdone");
        assert!(output.pending().is_empty());
    }

    #[test]
    fn emit_cstring_appends_newline() {
        let mut heap = heap_with(b"line\0");
        let memory = AddressableMemory::new(&mut heap);
        let mut output = OutputBuffer::new(ConsoleMode::Capture);
        emit_cstring(&memory, &mut output, 0).expect("puts");
        assert_eq!(output.pending(), "line\n");
    }
}
