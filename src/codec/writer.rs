//! Packfile serialization.

use std::collections::HashMap;

use crate::codec::stream::ByteWriter;
use crate::codec::{
    tag, CodecError, SectionHeader, CLASSNAMES_INDEX, CLASS_ENTRY_MARKER, DATA_INDEX,
    MAX_DEPTH, NUM_SECTIONS, PADDING_BYTE, SECTION_ALIGNMENT, SECTION_CLASSNAMES, SECTION_DATA,
    SECTION_HEADER_SIZE, SECTION_TYPES,
};
use crate::header::{ContentsInfo, HkxHeader};
use crate::object::{
    class_signature, HavokRoot, HkObject, HkValue, RootLevelContainer, StaticCompoundInfo,
    CLASS_ACTOR_INFO, CLASS_ROOT_LEVEL_CONTAINER, CLASS_SHAPE_INFO, CLASS_STATIC_COMPOUND_INFO,
};

/// Serialize `root` with the layout and section offset from `header`.
pub fn write_packfile(root: &HavokRoot, header: &HkxHeader) -> Result<Vec<u8>, CodecError> {
    let layout = header.layout;

    // ── __classnames__ ──────────────────────────────────────────────────────
    let mut names = ByteWriter::new(&layout);
    let mut class_offsets = HashMap::new();
    for class in collect_classes(root) {
        if class.contains('\0') {
            return Err(CodecError::InvalidClassName(class));
        }
        names.u32(class_signature(&class));
        names.u8(CLASS_ENTRY_MARKER);
        class_offsets.insert(class.clone(), to_u32(names.position())?);
        names.bytes(class.as_bytes());
        names.u8(0);
    }
    names.align(SECTION_ALIGNMENT, PADDING_BYTE);
    let names = names.into_inner();

    // ── __data__ ────────────────────────────────────────────────────────────
    let mut data = DataWriter {
        w:       ByteWriter::new(&layout),
        classes: &class_offsets,
        fixups:  Vec::new(),
    };
    match root {
        HavokRoot::StaticCompoundInfo(info) => data.compound_info(info)?,
        HavokRoot::RootLevelContainer(c)    => data.container(c)?,
    }
    let DataWriter { w: mut body, fixups, .. } = data;
    body.align(SECTION_ALIGNMENT, PADDING_BYTE);
    let fixups_at = to_u32(body.position())?;
    for (object_offset, class_offset) in fixups {
        body.u32(object_offset);
        body.u32(CLASSNAMES_INDEX as u32);
        body.u32(class_offset);
    }
    body.align(SECTION_ALIGNMENT, PADDING_BYTE);
    let body = body.into_inner();

    // ── Assemble ────────────────────────────────────────────────────────────
    let table_end = header.encoded_len()? + NUM_SECTIONS * SECTION_HEADER_SIZE;
    let classnames_start = align_up(table_end, SECTION_ALIGNMENT);
    let types_start = classnames_start + names.len();
    let data_start = types_start;

    let contents = ContentsInfo {
        num_sections:                       NUM_SECTIONS as i32,
        contents_section_index:             DATA_INDEX,
        contents_section_offset:            0,
        contents_class_name_section_index:  CLASSNAMES_INDEX,
        contents_class_name_section_offset: class_offsets
            .get(root.class_name())
            .copied()
            .map(|o| o as i32)
            .unwrap_or_default(),
    };

    let mut out = ByteWriter::new(&layout);
    header.write(&mut out, &contents)?;
    SectionHeader::plain(SECTION_CLASSNAMES, to_u32(classnames_start)?, to_u32(names.len())?)
        .write(&mut out)?;
    SectionHeader::plain(SECTION_TYPES, to_u32(types_start)?, 0).write(&mut out)?;
    SectionHeader::with_virtual_fixups(SECTION_DATA, to_u32(data_start)?, fixups_at, to_u32(body.len())?)
        .write(&mut out)?;
    out.align(SECTION_ALIGNMENT, PADDING_BYTE);
    out.bytes(&names);
    out.bytes(&body);
    Ok(out.into_inner())
}

/// Classes referenced by `root`, in first-use order.
fn collect_classes(root: &HavokRoot) -> Vec<String> {
    let mut classes = vec![root.class_name().to_string()];
    match root {
        HavokRoot::StaticCompoundInfo(info) => {
            if !info.actor_info.is_empty() {
                classes.push(CLASS_ACTOR_INFO.to_string());
            }
            if !info.shape_info.is_empty() {
                classes.push(CLASS_SHAPE_INFO.to_string());
            }
        }
        HavokRoot::RootLevelContainer(c) => {
            for object in c.named_variants.iter().filter_map(|v| v.variant.as_ref()) {
                collect_object(object, &mut classes);
            }
        }
    }
    classes
}

fn collect_object(object: &HkObject, classes: &mut Vec<String>) {
    if !classes.contains(&object.class_name) {
        classes.push(object.class_name.clone());
    }
    for (_, value) in &object.members {
        collect_value(value, classes);
    }
}

fn collect_value(value: &HkValue, classes: &mut Vec<String>) {
    match value {
        HkValue::Object(o) => collect_object(o, classes),
        HkValue::Array(items) => items.iter().for_each(|v| collect_value(v, classes)),
        _ => {}
    }
}

// ── Data section ─────────────────────────────────────────────────────────────

struct DataWriter<'a> {
    w:       ByteWriter,
    classes: &'a HashMap<String, u32>,
    /// (object offset in data section, class-name offset)
    fixups:  Vec<(u32, u32)>,
}

impl DataWriter<'_> {
    fn class_offset(&self, class: &str) -> u32 {
        // collect_classes visited every class this writer can reach.
        self.classes.get(class).copied().unwrap_or_default()
    }

    fn begin_object(&mut self, class: &str) -> Result<u32, CodecError> {
        let class_offset = self.class_offset(class);
        self.fixups.push((to_u32(self.w.position())?, class_offset));
        Ok(class_offset)
    }

    fn compound_info(&mut self, info: &StaticCompoundInfo) -> Result<(), CodecError> {
        self.begin_object(CLASS_STATIC_COMPOUND_INFO)?;
        self.w.u32(info.offset);
        self.w.pointer(info.actor_info.len())?;
        for actor in &info.actor_info {
            self.w.u32(actor.hash_id);
            self.w.i32(actor.srt_hash);
            self.w.i32(actor.shape_info_start);
            self.w.i32(actor.shape_info_end);
        }
        self.w.pointer(info.shape_info.len())?;
        for shape in &info.shape_info {
            self.w.i32(shape.actor_info_index);
            self.w.i32(shape.instance_id);
            self.w.i8(shape.body_group);
            self.w.u8(shape.body_layer_type);
            self.w.fill(2, 0);
        }
        Ok(())
    }

    fn container(&mut self, container: &RootLevelContainer) -> Result<(), CodecError> {
        self.begin_object(CLASS_ROOT_LEVEL_CONTAINER)?;
        self.w.pointer(container.named_variants.len())?;
        for variant in &container.named_variants {
            self.string(&variant.name)?;
            self.string(&variant.class_name)?;
            match &variant.variant {
                None => self.w.u8(0),
                Some(object) => {
                    self.w.u8(1);
                    self.object(object, 0)?;
                }
            }
        }
        Ok(())
    }

    fn object(&mut self, object: &HkObject, depth: usize) -> Result<(), CodecError> {
        if depth > MAX_DEPTH {
            return Err(CodecError::NestingTooDeep { max: MAX_DEPTH, offset: self.w.position() });
        }
        let class_offset = self.begin_object(&object.class_name)?;
        self.w.u32(class_offset);
        self.w.pointer(object.members.len())?;
        for (name, value) in &object.members {
            self.string(name)?;
            self.value(value, depth)?;
        }
        Ok(())
    }

    fn value(&mut self, value: &HkValue, depth: usize) -> Result<(), CodecError> {
        match value {
            HkValue::Null => self.w.u8(tag::NULL),
            HkValue::Bool(b) => {
                self.w.u8(tag::BOOL);
                self.w.u8(*b as u8);
            }
            HkValue::I8(v)  => { self.w.u8(tag::I8);  self.w.i8(*v); }
            HkValue::U8(v)  => { self.w.u8(tag::U8);  self.w.u8(*v); }
            HkValue::I16(v) => { self.w.u8(tag::I16); self.w.i16(*v); }
            HkValue::U16(v) => { self.w.u8(tag::U16); self.w.u16(*v); }
            HkValue::I32(v) => { self.w.u8(tag::I32); self.w.i32(*v); }
            HkValue::U32(v) => { self.w.u8(tag::U32); self.w.u32(*v); }
            HkValue::I64(v) => { self.w.u8(tag::I64); self.w.i64(*v); }
            HkValue::U64(v) => { self.w.u8(tag::U64); self.w.u64(*v); }
            HkValue::Real(v) => { self.w.u8(tag::REAL); self.w.f32(*v); }
            HkValue::String(s) => {
                self.w.u8(tag::STRING);
                self.string(s)?;
            }
            HkValue::Vector4(v) => {
                self.w.u8(tag::VECTOR4);
                v.iter().for_each(|c| self.w.f32(*c));
            }
            HkValue::Array(items) => {
                if depth >= MAX_DEPTH {
                    return Err(CodecError::NestingTooDeep { max: MAX_DEPTH, offset: self.w.position() });
                }
                self.w.u8(tag::ARRAY);
                self.w.pointer(items.len())?;
                for item in items {
                    self.value(item, depth + 1)?;
                }
            }
            HkValue::Object(object) => {
                self.w.u8(tag::OBJECT);
                self.object(object, depth + 1)?;
            }
        }
        Ok(())
    }

    fn string(&mut self, s: &str) -> Result<(), CodecError> {
        self.w.pointer(s.len())?;
        self.w.bytes(s.as_bytes());
        Ok(())
    }
}

fn align_up(n: usize, alignment: usize) -> usize {
    n.div_ceil(alignment) * alignment
}

fn to_u32(n: usize) -> Result<u32, CodecError> {
    u32::try_from(n).map_err(|_| CodecError::TooLarge { value: n })
}
