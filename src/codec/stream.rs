//! Endian- and pointer-width-aware byte cursors.
//!
//! Packfiles are written in the byte order of the target platform, which is
//! only known at runtime (from the header's layout rules), so both cursors
//! carry the layout and dispatch to the matching `byteorder` implementation.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::codec::CodecError;
use crate::header::LayoutRules;

macro_rules! put {
    ($name:ident, $ty:ty, $len:expr, $write:ident) => {
        pub fn $name(&mut self, value: $ty) {
            let mut b = [0u8; $len];
            if self.little_endian {
                LittleEndian::$write(&mut b, value);
            } else {
                BigEndian::$write(&mut b, value);
            }
            self.buf.extend_from_slice(&b);
        }
    };
}

macro_rules! get {
    ($name:ident, $ty:ty, $len:expr, $read:ident) => {
        pub fn $name(&mut self) -> Result<$ty, CodecError> {
            let little_endian = self.little_endian;
            let b = self.take($len)?;
            Ok(if little_endian { LittleEndian::$read(b) } else { BigEndian::$read(b) })
        }
    };
}

// ── Writer ───────────────────────────────────────────────────────────────────

pub struct ByteWriter {
    buf:           Vec<u8>,
    little_endian: bool,
    pointer_size:  u8,
}

impl ByteWriter {
    pub fn new(layout: &LayoutRules) -> Self {
        Self {
            buf:           Vec::new(),
            little_endian: layout.little_endian,
            pointer_size:  layout.pointer_size,
        }
    }

    #[inline]
    pub fn position(&self) -> usize { self.buf.len() }

    pub fn into_inner(self) -> Vec<u8> { self.buf }

    pub fn bytes(&mut self, data: &[u8]) { self.buf.extend_from_slice(data); }

    pub fn u8(&mut self, value: u8) { self.buf.push(value); }

    pub fn i8(&mut self, value: i8) { self.buf.push(value as u8); }

    put!(u16, u16, 2, write_u16);
    put!(i16, i16, 2, write_i16);
    put!(u32, u32, 4, write_u32);
    put!(i32, i32, 4, write_i32);
    put!(u64, u64, 8, write_u64);
    put!(i64, i64, 8, write_i64);
    put!(f32, f32, 4, write_f32);

    /// Write a pointer-sized unsigned value (array counts, string lengths).
    pub fn pointer(&mut self, value: usize) -> Result<(), CodecError> {
        if self.pointer_size == 8 {
            self.u64(value as u64);
        } else {
            let narrow = u32::try_from(value).map_err(|_| CodecError::TooLarge { value })?;
            self.u32(narrow);
        }
        Ok(())
    }

    /// Write `s` into a fixed `width`-byte field: NUL terminator, then `fill`.
    pub fn fixed_str(&mut self, s: &str, width: usize, fill: u8) -> Result<(), CodecError> {
        if s.len() >= width {
            return Err(CodecError::BadHeader(format!("`{s}` does not fit in {width} bytes")));
        }
        self.bytes(s.as_bytes());
        self.u8(0);
        self.fill(width - s.len() - 1, fill);
        Ok(())
    }

    pub fn fill(&mut self, count: usize, byte: u8) {
        self.buf.resize(self.buf.len() + count, byte);
    }

    /// Pad with `fill` up to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize, fill: u8) {
        let rem = self.buf.len() % alignment;
        if rem != 0 {
            self.fill(alignment - rem, fill);
        }
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

pub struct ByteReader<'a> {
    data:          &'a [u8],
    pos:           usize,
    little_endian: bool,
    pointer_size:  u8,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], layout: &LayoutRules) -> Self {
        Self {
            data,
            pos:           0,
            little_endian: layout.little_endian,
            pointer_size:  layout.pointer_size,
        }
    }

    #[inline]
    pub fn position(&self) -> usize { self.pos }

    pub fn remaining(&self) -> usize { self.data.len() - self.pos }

    pub fn seek(&mut self, pos: usize) -> Result<(), CodecError> {
        if pos > self.data.len() {
            return Err(CodecError::Truncated { offset: pos });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(CodecError::Truncated { offset: self.pos })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> { Ok(self.take(1)?[0]) }

    pub fn i8(&mut self) -> Result<i8, CodecError> { Ok(self.u8()? as i8) }

    get!(u16, u16, 2, read_u16);
    get!(i16, i16, 2, read_i16);
    get!(u32, u32, 4, read_u32);
    get!(i32, i32, 4, read_i32);
    get!(u64, u64, 8, read_u64);
    get!(i64, i64, 8, read_i64);
    get!(f32, f32, 4, read_f32);

    pub fn pointer(&mut self) -> Result<usize, CodecError> {
        let at = self.pos;
        let value = if self.pointer_size == 8 { self.u64()? } else { u64::from(self.u32()?) };
        usize::try_from(value).map_err(|_| CodecError::Truncated { offset: at })
    }

    /// Read a pointer-sized count, rejecting counts that cannot possibly fit
    /// in the remaining input (`min_item` bytes per element).
    pub fn count(&mut self, min_item: usize) -> Result<usize, CodecError> {
        let at = self.pos;
        let n = self.pointer()?;
        if n.saturating_mul(min_item.max(1)) > self.remaining() {
            return Err(CodecError::Truncated { offset: at });
        }
        Ok(n)
    }

    pub fn string(&mut self) -> Result<String, CodecError> {
        let at = self.pos;
        let len = self.count(1)?;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| CodecError::InvalidString { offset: at })
    }

    /// Read a fixed-width NUL-terminated field written by [`ByteWriter::fixed_str`].
    pub fn fixed_str(&mut self, width: usize) -> Result<String, CodecError> {
        let at = self.pos;
        let raw = self.take(width)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
        String::from_utf8(raw[..end].to_vec()).map_err(|_| CodecError::InvalidString { offset: at })
    }
}
