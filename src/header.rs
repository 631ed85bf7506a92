//! Packfile header and per-platform header presets.
//!
//! # Layout (64 bytes, file byte order)
//!
//! | Offset | Field                                |
//! |--------|--------------------------------------|
//! | 0      | magic0 `0x57E0E057`                  |
//! | 4      | magic1 `0x10C0C010`                  |
//! | 8      | user tag                             |
//! | 12     | file version                         |
//! | 16     | layout rules (4 × u8)                |
//! | 20     | section count                        |
//! | 24     | contents section index / offset      |
//! | 32     | contents class-name index / offset   |
//! | 40     | contents version (16 B, NUL + `0xFF`)|
//! | 56     | flags                                |
//! | 60     | max predicate (i16)                  |
//! | 62     | section offset (i16)                 |
//!
//! The header is followed by `section_offset` bytes of `0xFF` before the
//! section table.  The layout rules are byte-sized, so the byte order can be
//! read from offset 17 before anything else is interpreted.

use crate::codec::stream::{ByteReader, ByteWriter};
use crate::codec::CodecError;

pub const MAGIC0: u32 = 0x57E0_E057;
pub const MAGIC1: u32 = 0x10C0_C010;
pub const FILE_VERSION: i32 = 11;
pub const CONTENTS_VERSION: &str = "hk_2014.1.0-r1";
pub const MAX_PREDICATE: i16 = 21;

/// Fixed part of the header, before the section-offset padding.
pub const HEADER_SIZE: usize = 64;
pub const CONTENTS_VERSION_LEN: usize = 16;
const LAYOUT_OFFSET: usize = 16;

// ── Platform ─────────────────────────────────────────────────────────────────

/// Output platform for a packfile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Platform {
    /// 32-bit big-endian.
    #[default]
    WiiU,
    /// 64-bit little-endian.
    Nx,
}

impl Platform {
    pub fn name(self) -> &'static str {
        match self {
            Platform::WiiU => "wiiu",
            Platform::Nx   => "nx",
        }
    }

    pub fn layout(self) -> LayoutRules {
        match self {
            Platform::WiiU => LayoutRules {
                pointer_size:                  4,
                little_endian:                 false,
                reuse_padding_optimization:    false,
                empty_base_class_optimization: true,
            },
            Platform::Nx => LayoutRules {
                pointer_size:                  8,
                little_endian:                 true,
                reuse_padding_optimization:    false,
                empty_base_class_optimization: true,
            },
        }
    }

    /// Identify the platform whose preset matches `layout`, if any.
    pub fn from_layout(layout: &LayoutRules) -> Option<Self> {
        [Platform::WiiU, Platform::Nx].into_iter().find(|p| p.layout() == *layout)
    }
}

// ── Layout rules ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRules {
    pub pointer_size:                  u8,
    pub little_endian:                 bool,
    pub reuse_padding_optimization:    bool,
    pub empty_base_class_optimization: bool,
}

impl LayoutRules {
    fn to_bytes(self) -> [u8; 4] {
        [
            self.pointer_size,
            self.little_endian as u8,
            self.reuse_padding_optimization as u8,
            self.empty_base_class_optimization as u8,
        ]
    }

    fn from_bytes(b: [u8; 4]) -> Result<Self, CodecError> {
        if b[0] != 4 && b[0] != 8 {
            return Err(CodecError::BadHeader(format!("unsupported pointer size {}", b[0])));
        }
        Ok(Self {
            pointer_size:                  b[0],
            little_endian:                 b[1] != 0,
            reuse_padding_optimization:    b[2] != 0,
            empty_base_class_optimization: b[3] != 0,
        })
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Header configuration consumed by the codec on write.
///
/// Built once per platform; `section_offset` is rewritten by the container
/// layer before each encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HkxHeader {
    pub layout:           LayoutRules,
    pub user_tag:         i32,
    pub file_version:     i32,
    pub contents_version: String,
    pub flags:            i32,
    pub max_predicate:    i16,
    pub section_offset:   i16,
}

/// Where the root object lives.  Computed by the codec on every write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentsInfo {
    pub num_sections:                       i32,
    pub contents_section_index:             i32,
    pub contents_section_offset:            i32,
    pub contents_class_name_section_index:  i32,
    pub contents_class_name_section_offset: i32,
}

impl HkxHeader {
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            layout:           platform.layout(),
            user_tag:         0,
            file_version:     FILE_VERSION,
            contents_version: CONTENTS_VERSION.to_string(),
            flags:            0,
            max_predicate:    MAX_PREDICATE,
            section_offset:   0,
        }
    }

    pub fn wiiu() -> Self { Self::for_platform(Platform::WiiU) }

    pub fn nx() -> Self { Self::for_platform(Platform::Nx) }

    pub fn platform(&self) -> Option<Platform> { Platform::from_layout(&self.layout) }

    /// Bytes occupied by the header including the section-offset padding.
    pub fn encoded_len(&self) -> Result<usize, CodecError> {
        Ok(HEADER_SIZE + self.padding()?)
    }

    fn padding(&self) -> Result<usize, CodecError> {
        usize::try_from(self.section_offset)
            .map_err(|_| CodecError::BadHeader(format!("negative section offset {}", self.section_offset)))
    }

    pub fn write(&self, w: &mut ByteWriter, contents: &ContentsInfo) -> Result<(), CodecError> {
        let padding = self.padding()?;
        w.u32(MAGIC0);
        w.u32(MAGIC1);
        w.i32(self.user_tag);
        w.i32(self.file_version);
        w.bytes(&self.layout.to_bytes());
        w.i32(contents.num_sections);
        w.i32(contents.contents_section_index);
        w.i32(contents.contents_section_offset);
        w.i32(contents.contents_class_name_section_index);
        w.i32(contents.contents_class_name_section_offset);
        w.fixed_str(&self.contents_version, CONTENTS_VERSION_LEN, 0xFF)?;
        w.i32(self.flags);
        w.i16(self.max_predicate);
        w.i16(self.section_offset);
        w.fill(padding, 0xFF);
        Ok(())
    }

    /// Parse the header at the start of `bytes`.  The returned reader is
    /// positioned at the section table.
    pub fn read(bytes: &[u8]) -> Result<(Self, ContentsInfo, ByteReader<'_>), CodecError> {
        let rules = bytes
            .get(LAYOUT_OFFSET..LAYOUT_OFFSET + 4)
            .ok_or(CodecError::Truncated { offset: bytes.len() })?;
        let layout = LayoutRules::from_bytes([rules[0], rules[1], rules[2], rules[3]])?;

        let mut r = ByteReader::new(bytes, &layout);
        let magic0 = r.u32()?;
        let magic1 = r.u32()?;
        if magic0 != MAGIC0 || magic1 != MAGIC1 {
            return Err(CodecError::BadMagic { magic0, magic1 });
        }
        let user_tag = r.i32()?;
        let file_version = r.i32()?;
        r.take(4)?;
        let contents = ContentsInfo {
            num_sections:                       r.i32()?,
            contents_section_index:             r.i32()?,
            contents_section_offset:            r.i32()?,
            contents_class_name_section_index:  r.i32()?,
            contents_class_name_section_offset: r.i32()?,
        };
        let contents_version = r.fixed_str(CONTENTS_VERSION_LEN)?;
        let flags = r.i32()?;
        let max_predicate = r.i16()?;
        let section_offset = r.i16()?;

        let header = Self {
            layout,
            user_tag,
            file_version,
            contents_version,
            flags,
            max_predicate,
            section_offset,
        };
        r.take(header.padding()?)?;
        Ok((header, contents, r))
    }
}
