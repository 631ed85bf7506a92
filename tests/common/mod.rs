#![allow(dead_code)]

use hkxconv::codec::PackfileCodec;
use hkxconv::container::encode_container;
use hkxconv::header::HkxHeader;
use hkxconv::object::{
    ActorInfo, HavokRoot, HkObject, HkValue, NamedVariant, RootLevelContainer, ShapeInfo,
    StaticCompoundInfo,
};

/// Placeholder stored in descriptors that have never been written.
pub const PLACEHOLDER_OFFSET: u32 = 0xFFFF_FFFF;

pub fn physics_data() -> RootLevelContainer {
    let body = HkObject::new("hkpRigidBody")
        .with("m_name", HkValue::String("Collision".into()))
        .with("m_mass", HkValue::Real(12.5))
        .with("m_motionType", HkValue::U8(2))
        .with("m_collisionFilterInfo", HkValue::U32(0x8000_0011))
        .with("m_center", HkValue::Vector4([0.0, 1.5, -2.25, 0.0]));
    let system = HkObject::new("hkpPhysicsSystem")
        .with("m_rigidBodies", HkValue::Array(vec![HkValue::Object(body)]))
        .with("m_active", HkValue::Bool(true))
        .with("m_userData", HkValue::U64(u64::MAX))
        .with("m_priority", HkValue::I16(-3));
    let data = HkObject::new("hkpPhysicsData")
        .with("m_worldCinfo", HkValue::Null)
        .with("m_systems", HkValue::Array(vec![HkValue::Object(system)]));
    RootLevelContainer { named_variants: vec![NamedVariant::new("Physics Data", data)] }
}

/// A container whose first named variant declares `class_name`.
pub fn container_for(class_name: &str) -> RootLevelContainer {
    let payload = HkObject::new(class_name)
        .with("m_flags", HkValue::I32(-1))
        .with("m_label", HkValue::String(format!("{class_name} payload")));
    RootLevelContainer { named_variants: vec![NamedVariant::new("Resource Data", payload)] }
}

pub fn compound_info() -> StaticCompoundInfo {
    StaticCompoundInfo {
        offset:     PLACEHOLDER_OFFSET,
        actor_info: vec![
            ActorInfo { hash_id: 0x1234_5678, srt_hash: -42, shape_info_start: 0, shape_info_end: 1 },
            ActorInfo { hash_id: 0x0BAD_F00D, srt_hash: 7,   shape_info_start: 2, shape_info_end: 2 },
        ],
        shape_info: vec![
            ShapeInfo { actor_info_index: 0, instance_id: 7,  body_group: -1, body_layer_type: 3 },
            ShapeInfo { actor_info_index: 0, instance_id: 8,  body_group: 2,  body_layer_type: 0 },
            ShapeInfo { actor_info_index: 1, instance_id: -1, body_group: 0,  body_layer_type: 17 },
        ],
    }
}

pub fn compound_roots() -> Vec<HavokRoot> {
    vec![compound_info().into(), physics_data().into()]
}

/// Bytes of a file as the game would ship it.
pub fn shipped_bytes(roots: &[HavokRoot], extension: &str, header: HkxHeader) -> Vec<u8> {
    let mut roots = roots.to_vec();
    let mut header = header;
    encode_container(&PackfileCodec, &mut roots, extension, &mut header).unwrap()
}
