//! In-memory object graph for Havok packfiles.
//!
//! A packfile carries exactly one root object.  The set of root classes this
//! crate understands is closed and known at compile time, so roots are a
//! plain sum type ([`HavokRoot`]) rather than a registry of class names.
//!
//! Everything below a root-level container's named variant is kept as a
//! generic [`HkObject`]: a class name plus an ordered list of typed members.
//! Member names keep Havok's internal `m_` prefix in memory; the text layer
//! decides how they are spelled on disk (see [`crate::text::FieldNaming`]).

use std::collections::HashSet;
use std::fmt;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::{self, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ── Class names ──────────────────────────────────────────────────────────────

pub const CLASS_STATIC_COMPOUND_INFO: &str = "StaticCompoundInfo";
pub const CLASS_ACTOR_INFO:           &str = "ActorInfo";
pub const CLASS_SHAPE_INFO:           &str = "ShapeInfo";
pub const CLASS_ROOT_LEVEL_CONTAINER: &str = "hkRootLevelContainer";

/// Key carrying the class name of a payload object in the serde form.
pub const CLASS_KEY: &str = "$class";
/// Key carrying the computed class signature in the serde form.
pub const SIGNATURE_KEY: &str = "Signature";

/// Computed class signature as written into the class-name section.
///
/// Signatures carry no meaning beyond identifying the class layout, so they
/// are derived from the class name instead of being stored on objects.
pub fn class_signature(class_name: &str) -> u32 {
    crc32fast::hash(class_name.as_bytes())
}

// ── Roots ────────────────────────────────────────────────────────────────────

/// One top-level object of a packfile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum HavokRoot {
    #[serde(rename = "StaticCompoundInfo")]
    StaticCompoundInfo(StaticCompoundInfo),
    #[serde(rename = "hkRootLevelContainer")]
    RootLevelContainer(RootLevelContainer),
}

impl HavokRoot {
    pub fn class_name(&self) -> &'static str {
        match self {
            HavokRoot::StaticCompoundInfo(_) => CLASS_STATIC_COMPOUND_INFO,
            HavokRoot::RootLevelContainer(_) => CLASS_ROOT_LEVEL_CONTAINER,
        }
    }

    pub fn as_compound_info(&self) -> Option<&StaticCompoundInfo> {
        match self {
            HavokRoot::StaticCompoundInfo(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_compound_info_mut(&mut self) -> Option<&mut StaticCompoundInfo> {
        match self {
            HavokRoot::StaticCompoundInfo(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_container(&self) -> Option<&RootLevelContainer> {
        match self {
            HavokRoot::RootLevelContainer(c) => Some(c),
            _ => None,
        }
    }
}

impl From<StaticCompoundInfo> for HavokRoot {
    fn from(info: StaticCompoundInfo) -> Self { HavokRoot::StaticCompoundInfo(info) }
}

impl From<RootLevelContainer> for HavokRoot {
    fn from(c: RootLevelContainer) -> Self { HavokRoot::RootLevelContainer(c) }
}

// ── Static compound descriptor ───────────────────────────────────────────────

/// Descriptor stream of an `hksc` file.
///
/// `offset` is the byte length of this object's own packfile encoding, i.e.
/// where the second stream starts.  It is only correct after a write; freshly
/// built descriptors hold whatever placeholder the caller put there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticCompoundInfo {
    #[serde(rename = "m_Offset")]
    pub offset:     u32,
    #[serde(rename = "m_ActorInfo", default)]
    pub actor_info: Vec<ActorInfo>,
    #[serde(rename = "m_ShapeInfo", default)]
    pub shape_info: Vec<ShapeInfo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorInfo {
    #[serde(rename = "m_HashId")]
    pub hash_id:          u32,
    #[serde(rename = "m_SRTHash")]
    pub srt_hash:         i32,
    #[serde(rename = "m_ShapeInfoStart")]
    pub shape_info_start: i32,
    #[serde(rename = "m_ShapeInfoEnd")]
    pub shape_info_end:   i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeInfo {
    #[serde(rename = "m_ActorInfoIndex")]
    pub actor_info_index: i32,
    #[serde(rename = "m_InstanceId")]
    pub instance_id:      i32,
    #[serde(rename = "m_BodyGroup")]
    pub body_group:       i8,
    #[serde(rename = "m_BodyLayerType")]
    pub body_layer_type:  u8,
}

// ── Root level container ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootLevelContainer {
    #[serde(rename = "m_namedVariants", default)]
    pub named_variants: Vec<NamedVariant>,
}

impl RootLevelContainer {
    /// Class name declared by the first named variant, if any.
    pub fn first_class_name(&self) -> Option<&str> {
        self.named_variants.first().map(|v| v.class_name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedVariant {
    #[serde(rename = "m_name")]
    pub name:       String,
    #[serde(rename = "m_className")]
    pub class_name: String,
    #[serde(rename = "m_variant", default)]
    pub variant:    Option<HkObject>,
}

impl NamedVariant {
    pub fn new(name: impl Into<String>, variant: HkObject) -> Self {
        Self {
            name:       name.into(),
            class_name: variant.class_name.clone(),
            variant:    Some(variant),
        }
    }
}

// ── Generic payload ──────────────────────────────────────────────────────────

/// A payload object: class name plus ordered, typed members.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HkObject {
    pub class_name: String,
    pub members:    Vec<(String, HkValue)>,
}

impl HkObject {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self { class_name: class_name.into(), members: Vec::new() }
    }

    pub fn with(mut self, name: impl Into<String>, value: HkValue) -> Self {
        self.members.push((name.into(), value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&HkValue> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn signature(&self) -> u32 {
        class_signature(&self.class_name)
    }
}

/// A typed member value.  Integer widths are explicit so that a value read
/// from a packfile is written back with the same layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$t", content = "$v")]
pub enum HkValue {
    Null,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    #[serde(with = "exact_real")]
    Real(f32),
    String(String),
    #[serde(with = "exact_vector4")]
    Vector4([f32; 4]),
    Array(Vec<HkValue>),
    Object(HkObject),
}

impl Serialize for HkObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.members.len() + 2))?;
        map.serialize_entry(CLASS_KEY, &self.class_name)?;
        map.serialize_entry(SIGNATURE_KEY, &self.signature())?;
        let mut seen = HashSet::with_capacity(self.members.len());
        for (name, value) in &self.members {
            if name == CLASS_KEY || name == SIGNATURE_KEY {
                return Err(ser::Error::custom(format!(
                    "`{}` member `{name}` collides with a reserved key", self.class_name
                )));
            }
            // A map cannot hold both.
            if !seen.insert(name.as_str()) {
                return Err(ser::Error::custom(format!(
                    "`{}` has more than one member named `{name}`", self.class_name
                )));
            }
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HkObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ObjectVisitor;

        impl<'de> Visitor<'de> for ObjectVisitor {
            type Value = HkObject;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a Havok object with a `{CLASS_KEY}` entry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<HkObject, A::Error> {
                let mut class_name = None;
                let mut members = Vec::new();
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        CLASS_KEY => class_name = Some(map.next_value::<String>()?),
                        // Computed on demand; whatever the input says is ignored.
                        SIGNATURE_KEY => { map.next_value::<IgnoredAny>()?; }
                        _ => members.push((key, map.next_value::<HkValue>()?)),
                    }
                }
                let class_name = class_name.ok_or_else(|| de::Error::missing_field(CLASS_KEY))?;
                Ok(HkObject { class_name, members })
            }
        }

        deserializer.deserialize_map(ObjectVisitor)
    }
}

// ── Exact floats ─────────────────────────────────────────────────────────────

/// Text spelling of the non-finite floats JSON has no literal for.
const INFINITY_TEXT:     &str = "inf";
const NEG_INFINITY_TEXT: &str = "-inf";
const NAN_TEXT:          &str = "NaN";
/// Prefix of a NaN that is not the canonical quiet NaN, followed by its bits.
const NAN_BITS_PREFIX:   &str = "NaN:";

/// An `f32` whose bits survive a trip through JSON.
///
/// Finite values are plain numbers.  Infinities and the canonical NaN are
/// strings, and any other NaN is written with its bit pattern
/// (`"NaN:0x7fc00001"`) so its payload is kept.
struct ExactF32(f32);

impl Serialize for ExactF32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_finite() {
            serializer.serialize_f32(v)
        } else if v == f32::INFINITY {
            serializer.serialize_str(INFINITY_TEXT)
        } else if v == f32::NEG_INFINITY {
            serializer.serialize_str(NEG_INFINITY_TEXT)
        } else if v.to_bits() == f32::NAN.to_bits() {
            serializer.serialize_str(NAN_TEXT)
        } else {
            serializer.serialize_str(&format!("{NAN_BITS_PREFIX}{:#010x}", v.to_bits()))
        }
    }
}

impl<'de> Deserialize<'de> for ExactF32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RealVisitor;

        impl<'de> Visitor<'de> for RealVisitor {
            type Value = ExactF32;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a number, `{INFINITY_TEXT}`, `{NEG_INFINITY_TEXT}`, `{NAN_TEXT}` or `{NAN_BITS_PREFIX}0x...`")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<ExactF32, E> {
                Ok(ExactF32(v as f32))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ExactF32, E> {
                Ok(ExactF32(v as f32))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ExactF32, E> {
                Ok(ExactF32(v as f32))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ExactF32, E> {
                match v {
                    INFINITY_TEXT     => return Ok(ExactF32(f32::INFINITY)),
                    NEG_INFINITY_TEXT => return Ok(ExactF32(f32::NEG_INFINITY)),
                    NAN_TEXT          => return Ok(ExactF32(f32::NAN)),
                    _ => {}
                }
                let nan = v
                    .strip_prefix(NAN_BITS_PREFIX)
                    .and_then(|bits| bits.strip_prefix("0x"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .map(f32::from_bits)
                    .filter(|f| f.is_nan());
                nan.map(ExactF32).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(RealVisitor)
    }
}

mod exact_real {
    use super::ExactF32;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        ExactF32(*v).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        ExactF32::deserialize(deserializer).map(|r| r.0)
    }
}

mod exact_vector4 {
    use super::ExactF32;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &[f32; 4], serializer: S) -> Result<S::Ok, S::Error> {
        (*v).map(ExactF32).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[f32; 4], D::Error> {
        <[ExactF32; 4]>::deserialize(deserializer).map(|v| v.map(|r| r.0))
    }
}
