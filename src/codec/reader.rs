//! Packfile deserialization.

use std::collections::HashMap;

use crate::codec::stream::ByteReader;
use crate::codec::{
    tag, CodecError, Decoded, SectionHeader, CLASS_ENTRY_MARKER, MAX_DEPTH, NUM_SECTIONS,
};
use crate::header::HkxHeader;
use crate::object::{
    ActorInfo, HavokRoot, HkObject, HkValue, NamedVariant, RootLevelContainer, ShapeInfo,
    StaticCompoundInfo, CLASS_ROOT_LEVEL_CONTAINER, CLASS_STATIC_COMPOUND_INFO,
};

/// Decode the packfile at the start of `bytes`.  Trailing bytes beyond the
/// sections named in the header are ignored.
pub fn read_packfile(bytes: &[u8]) -> Result<Decoded, CodecError> {
    let (header, contents, mut r) = HkxHeader::read(bytes)?;

    let count = usize::try_from(contents.num_sections)
        .ok()
        .filter(|&n| n >= NUM_SECTIONS)
        .ok_or_else(|| CodecError::BadHeader(format!("section count {}", contents.num_sections)))?;
    let sections = (0..count)
        .map(|_| SectionHeader::read(&mut r))
        .collect::<Result<Vec<_>, _>>()?;

    let section = |index: i32| {
        usize::try_from(index)
            .ok()
            .and_then(|i| sections.get(i))
            .ok_or_else(|| CodecError::BadHeader(format!("section index {index}")))
    };
    let names_section = section(contents.contents_class_name_section_index)?;
    let data_section = section(contents.contents_section_index)?;

    let classes = read_class_names(names_section.slice(bytes, names_section.end_offset)?)?;
    let root_class = lookup(&classes, contents.contents_class_name_section_offset as u32)?;

    let data = data_section.slice(bytes, data_section.local_fixups_offset)?;
    let mut data_reader = DataReader {
        r:       ByteReader::new(data, &header.layout),
        classes: &classes,
    };
    data_reader.r.seek(contents.contents_section_offset as usize)?;

    let root = match root_class.as_str() {
        CLASS_STATIC_COMPOUND_INFO => HavokRoot::StaticCompoundInfo(data_reader.compound_info()?),
        CLASS_ROOT_LEVEL_CONTAINER => HavokRoot::RootLevelContainer(data_reader.container()?),
        other => return Err(CodecError::UnsupportedRoot(other.to_string())),
    };

    Ok(Decoded { root, header, contents })
}

/// Map of name offset → class name.  Stops at the first entry without the
/// marker byte, which is where the `0xFF` padding starts.
fn read_class_names(section: &[u8]) -> Result<HashMap<u32, String>, CodecError> {
    let mut classes = HashMap::new();
    let mut pos = 0;
    // signature (4) + marker (1) + at least the terminator
    while pos + 6 <= section.len() && section[pos + 4] == CLASS_ENTRY_MARKER {
        let name_start = pos + 5;
        let Some(len) = section[name_start..].iter().position(|&b| b == 0) else { break };
        let name = std::str::from_utf8(&section[name_start..name_start + len])
            .map_err(|_| CodecError::InvalidString { offset: name_start })?;
        classes.insert(name_start as u32, name.to_string());
        pos = name_start + len + 1;
    }
    Ok(classes)
}

fn lookup(classes: &HashMap<u32, String>, offset: u32) -> Result<String, CodecError> {
    classes.get(&offset).cloned().ok_or(CodecError::UnknownClass { offset })
}

// ── Data section ─────────────────────────────────────────────────────────────

struct DataReader<'a> {
    r:       ByteReader<'a>,
    classes: &'a HashMap<u32, String>,
}

impl DataReader<'_> {
    fn compound_info(&mut self) -> Result<StaticCompoundInfo, CodecError> {
        let offset = self.r.u32()?;
        let actors = self.r.count(16)?;
        let mut actor_info = Vec::with_capacity(actors);
        for _ in 0..actors {
            actor_info.push(ActorInfo {
                hash_id:          self.r.u32()?,
                srt_hash:         self.r.i32()?,
                shape_info_start: self.r.i32()?,
                shape_info_end:   self.r.i32()?,
            });
        }
        let shapes = self.r.count(12)?;
        let mut shape_info = Vec::with_capacity(shapes);
        for _ in 0..shapes {
            let shape = ShapeInfo {
                actor_info_index: self.r.i32()?,
                instance_id:      self.r.i32()?,
                body_group:       self.r.i8()?,
                body_layer_type:  self.r.u8()?,
            };
            self.r.take(2)?;
            shape_info.push(shape);
        }
        Ok(StaticCompoundInfo { offset, actor_info, shape_info })
    }

    fn container(&mut self) -> Result<RootLevelContainer, CodecError> {
        let count = self.r.count(1)?;
        let mut named_variants = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.r.string()?;
            let class_name = self.r.string()?;
            let variant = match self.r.u8()? {
                0 => None,
                _ => Some(self.object(0)?),
            };
            named_variants.push(NamedVariant { name, class_name, variant });
        }
        Ok(RootLevelContainer { named_variants })
    }

    fn object(&mut self, depth: usize) -> Result<HkObject, CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::NestingTooDeep { max: MAX_DEPTH, offset: self.r.position() });
        }
        let class_name = lookup(self.classes, self.r.u32()?)?;
        let count = self.r.count(1)?;
        let mut members = Vec::with_capacity(count);
        for _ in 0..count {
            let name = self.r.string()?;
            let value = self.value(depth)?;
            members.push((name, value));
        }
        Ok(HkObject { class_name, members })
    }

    fn value(&mut self, depth: usize) -> Result<HkValue, CodecError> {
        let at = self.r.position();
        Ok(match self.r.u8()? {
            tag::NULL    => HkValue::Null,
            tag::BOOL    => HkValue::Bool(self.r.u8()? != 0),
            tag::I8      => HkValue::I8(self.r.i8()?),
            tag::U8      => HkValue::U8(self.r.u8()?),
            tag::I16     => HkValue::I16(self.r.i16()?),
            tag::U16     => HkValue::U16(self.r.u16()?),
            tag::I32     => HkValue::I32(self.r.i32()?),
            tag::U32     => HkValue::U32(self.r.u32()?),
            tag::I64     => HkValue::I64(self.r.i64()?),
            tag::U64     => HkValue::U64(self.r.u64()?),
            tag::REAL    => HkValue::Real(self.r.f32()?),
            tag::STRING  => HkValue::String(self.r.string()?),
            tag::VECTOR4 => HkValue::Vector4([self.r.f32()?, self.r.f32()?, self.r.f32()?, self.r.f32()?]),
            tag::ARRAY   => {
                if depth >= MAX_DEPTH {
                    return Err(CodecError::NestingTooDeep { max: MAX_DEPTH, offset: at });
                }
                let count = self.r.count(1)?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.value(depth + 1)?);
                }
                HkValue::Array(items)
            }
            tag::OBJECT  => HkValue::Object(self.object(depth + 1)?),
            other        => return Err(CodecError::UnknownTag { tag: other, offset: at }),
        })
    }
}
