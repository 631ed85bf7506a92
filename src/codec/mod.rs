//! Packfile codec: bytes ⇄ one root object.
//!
//! The container layer only talks to the [`Codec`] trait.  [`PackfileCodec`]
//! is the implementation shipped with the crate.
//!
//! # File layout
//!
//! ```text
//! [ header (64 B) | 0xFF × section_offset | 3 × section header (48 B) ]
//! [ __classnames__ | __types__ | __data__ ]      each 16-byte aligned
//! ```
//!
//! Section header: 20-byte name (NUL + `0xFF` fill), absolute data start,
//! then six offsets relative to the data start: local fixups, global fixups,
//! virtual fixups, exports, imports, end.
//!
//! The class-name section lists `signature u32 | 0x09 | name\0` for every
//! class used by the root.  Objects in the data section refer to their class
//! by the offset of its name in that section, and each object start gets a
//! virtual fixup entry `(data offset, class section index, name offset)`.
//!
//! A decoder only reads what the header and section table describe, so any
//! bytes after the last section are ignored.  Compound files rely on this.

pub mod reader;
pub mod stream;
pub mod writer;

use std::io;
use thiserror::Error;

use crate::header::{ContentsInfo, HkxHeader};
use crate::object::HavokRoot;

pub const SECTION_CLASSNAMES: &str = "__classnames__";
pub const SECTION_TYPES:      &str = "__types__";
pub const SECTION_DATA:       &str = "__data__";

pub const NUM_SECTIONS:           usize = 3;
pub const SECTION_HEADER_SIZE:    usize = 48;
pub const SECTION_NAME_LEN:       usize = 20;
pub const SECTION_ALIGNMENT:      usize = 16;
pub const CLASSNAMES_INDEX:       i32 = 0;
pub const DATA_INDEX:             i32 = 2;
/// Marker byte between a class signature and its name.
pub const CLASS_ENTRY_MARKER:     u8 = 0x09;
pub const PADDING_BYTE:           u8 = 0xFF;
/// Nesting limit for payload objects and arrays, enforced on both encode
/// and decode.  The JSON form of the deepest allowed payload stays inside
/// serde_json's parser limit of 128 levels.
pub const MAX_DEPTH:              usize = 56;

// ── Value tags ───────────────────────────────────────────────────────────────

pub mod tag {
    pub const NULL:    u8 = 0;
    pub const BOOL:    u8 = 1;
    pub const I8:      u8 = 2;
    pub const U8:      u8 = 3;
    pub const I16:     u8 = 4;
    pub const U16:     u8 = 5;
    pub const I32:     u8 = 6;
    pub const U32:     u8 = 7;
    pub const I64:     u8 = 8;
    pub const U64:     u8 = 9;
    pub const REAL:    u8 = 10;
    pub const STRING:  u8 = 11;
    pub const VECTOR4: u8 = 12;
    pub const ARRAY:   u8 = 13;
    pub const OBJECT:  u8 = 14;
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Invalid magic numbers {magic0:#010x} {magic1:#010x}")]
    BadMagic { magic0: u32, magic1: u32 },
    #[error("Invalid header: {0}")]
    BadHeader(String),
    #[error("Unexpected end of data at offset {offset:#x}")]
    Truncated { offset: usize },
    #[error("Invalid UTF-8 string at offset {offset:#x}")]
    InvalidString { offset: usize },
    #[error("Section `{0}` is missing or out of bounds")]
    BadSection(String),
    #[error("No class name at class-name section offset {offset:#x}")]
    UnknownClass { offset: u32 },
    #[error("Class name {0:?} contains a NUL byte")]
    InvalidClassName(String),
    #[error("Unsupported root class `{0}`")]
    UnsupportedRoot(String),
    #[error("Unknown value tag {tag} at offset {offset:#x}")]
    UnknownTag { tag: u8, offset: usize },
    #[error("Objects nested deeper than {max} levels at offset {offset:#x}")]
    NestingTooDeep { max: usize, offset: usize },
    #[error("Value {value} does not fit in a 32-bit field")]
    TooLarge { value: usize },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Codec trait ──────────────────────────────────────────────────────────────

/// A decoded packfile: its root object and the header it was written with.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub root:     HavokRoot,
    pub header:   HkxHeader,
    pub contents: ContentsInfo,
}

/// Bytes ⇄ root object.
///
/// Implementations must be deterministic: the same root and header always
/// produce the same bytes.
pub trait Codec {
    fn decode(&self, bytes: &[u8]) -> Result<Decoded, CodecError>;
    fn encode(&self, root: &HavokRoot, header: &HkxHeader) -> Result<Vec<u8>, CodecError>;
}

/// The bundled packfile codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackfileCodec;

impl Codec for PackfileCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Decoded, CodecError> {
        reader::read_packfile(bytes)
    }

    fn encode(&self, root: &HavokRoot, header: &HkxHeader) -> Result<Vec<u8>, CodecError> {
        writer::write_packfile(root, header)
    }
}

// ── Section header ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionHeader {
    pub name:                  String,
    pub absolute_data_start:   u32,
    pub local_fixups_offset:   u32,
    pub global_fixups_offset:  u32,
    pub virtual_fixups_offset: u32,
    pub exports_offset:        u32,
    pub imports_offset:        u32,
    pub end_offset:            u32,
}

impl SectionHeader {
    /// Section with no fixups: every offset points at the end of `len` bytes.
    pub fn plain(name: &str, absolute_data_start: u32, len: u32) -> Self {
        Self::with_virtual_fixups(name, absolute_data_start, len, len)
    }

    pub fn with_virtual_fixups(name: &str, absolute_data_start: u32, fixups_at: u32, end: u32) -> Self {
        Self {
            name:                  name.to_string(),
            absolute_data_start,
            local_fixups_offset:   fixups_at,
            global_fixups_offset:  fixups_at,
            virtual_fixups_offset: fixups_at,
            exports_offset:        end,
            imports_offset:        end,
            end_offset:            end,
        }
    }

    pub fn write(&self, w: &mut stream::ByteWriter) -> Result<(), CodecError> {
        w.fixed_str(&self.name, SECTION_NAME_LEN, PADDING_BYTE)?;
        w.u32(self.absolute_data_start);
        w.u32(self.local_fixups_offset);
        w.u32(self.global_fixups_offset);
        w.u32(self.virtual_fixups_offset);
        w.u32(self.exports_offset);
        w.u32(self.imports_offset);
        w.u32(self.end_offset);
        Ok(())
    }

    pub fn read(r: &mut stream::ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            name:                  r.fixed_str(SECTION_NAME_LEN)?,
            absolute_data_start:   r.u32()?,
            local_fixups_offset:   r.u32()?,
            global_fixups_offset:  r.u32()?,
            virtual_fixups_offset: r.u32()?,
            exports_offset:        r.u32()?,
            imports_offset:        r.u32()?,
            end_offset:            r.u32()?,
        })
    }

    /// The section body (up to `until`, relative) within the whole file.
    pub fn slice<'a>(&self, file: &'a [u8], until: u32) -> Result<&'a [u8], CodecError> {
        let start = self.absolute_data_start as usize;
        start
            .checked_add(until as usize)
            .and_then(|end| file.get(start..end))
            .ok_or_else(|| CodecError::BadSection(self.name.clone()))
    }
}
