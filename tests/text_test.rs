mod common;

use common::*;
use hkxconv::codec::{Codec, PackfileCodec, MAX_DEPTH};
use hkxconv::header::HkxHeader;
use hkxconv::object::{HavokRoot, HkObject, HkValue, NamedVariant, RootLevelContainer};
use hkxconv::text::{FieldNaming, TextError, TreeCodec};
use proptest::prelude::*;

/// Roots compare by their packfile bytes, so NaN payloads are checked bit for bit.
fn packed(roots: &[HavokRoot]) -> Vec<Vec<u8>> {
    roots.iter().map(|r| PackfileCodec.encode(r, &HkxHeader::nx()).unwrap()).collect()
}

fn payload_root(payload: HkObject) -> Vec<HavokRoot> {
    vec![HavokRoot::from(RootLevelContainer {
        named_variants: vec![NamedVariant::new("Resource Data", payload)],
    })]
}

// ── Floats ───────────────────────────────────────────────────────────────────

#[test]
fn test_non_finite_reals_survive() {
    let quiet_payload = f32::from_bits(0x7FC0_0001);
    let signalling = f32::from_bits(0x7F80_0001);
    let negative_nan = f32::from_bits(0xFFC0_0000);
    let roots = payload_root(
        HkObject::new("hkpRigidBody")
            .with("m_nan", HkValue::Real(f32::NAN))
            .with("m_inf", HkValue::Real(f32::INFINITY))
            .with("m_negInf", HkValue::Real(f32::NEG_INFINITY))
            .with("m_payload", HkValue::Real(quiet_payload))
            .with("m_negZero", HkValue::Real(-0.0))
            .with("m_tiny", HkValue::Real(f32::from_bits(1)))
            .with("m_aabb", HkValue::Vector4([signalling, negative_nan, f32::MIN_POSITIVE, 0.1])),
    );

    for pretty in [false, true] {
        let tree = TreeCodec::new(FieldNaming::default(), pretty);
        let text = tree.encode(&roots).unwrap();
        assert!(!text.contains("null"), "{text}");
        assert!(text.contains("\"NaN\""));
        assert!(text.contains("\"inf\""));
        assert!(text.contains("\"-inf\""));
        assert!(text.contains("\"NaN:0x7fc00001\""));

        let back = tree.decode(&text).unwrap();
        assert_eq!(packed(&back), packed(&roots));
    }
}

#[test]
fn test_malformed_real_rejected() {
    let tree = TreeCodec::default();
    let text = tree.encode(&payload_root(HkObject::new("hkpRigidBody").with("m_mass", HkValue::Real(f32::NAN)))).unwrap();
    for bad in ["\"nan\"", "\"NaN:0x3f800000\"", "\"NaN:zz\"", "null"] {
        let edited = text.replace("\"NaN\"", bad);
        assert!(matches!(tree.decode(&edited), Err(TextError::Json(_))), "{bad} accepted");
    }
}

// ── Member names ─────────────────────────────────────────────────────────────

#[test]
fn test_unprefixed_member_names_survive() {
    let roots = payload_root(
        HkObject::new("hkpRigidBody")
            .with("m_mass", HkValue::Real(2.0))
            .with("name", HkValue::U32(1))
            .with("", HkValue::Null)
            .with("m_$type", HkValue::Bool(true))
            .with("m_Signature", HkValue::I8(-1))
            .with("$raw:mass", HkValue::U8(3))
            .with("$t", HkValue::U16(4)),
    );
    let tree = TreeCodec::default();
    let text = tree.encode(&roots).unwrap();
    assert!(text.contains("\"mass\""));
    assert!(text.contains("\"$raw:name\""));
    assert!(text.contains("\"$raw:m_Signature\""));
    assert_eq!(tree.decode(&text).unwrap(), roots);
}

#[test]
fn test_reserved_member_names_rejected() {
    let tree = TreeCodec::default();
    for reserved in ["Signature", "$class"] {
        let roots = payload_root(HkObject::new("hkpRigidBody").with(reserved, HkValue::Null));
        assert!(matches!(tree.encode(&roots), Err(TextError::Json(_))), "{reserved} accepted");
    }
    let duplicated = payload_root(
        HkObject::new("hkpRigidBody").with("m_mass", HkValue::U8(1)).with("m_mass", HkValue::U8(2)),
    );
    assert!(matches!(tree.encode(&duplicated), Err(TextError::Json(_))));
}

// ── Depth ────────────────────────────────────────────────────────────────────

#[test]
fn test_deepest_payload_fits_in_json() {
    let mut object = HkObject::new("hkpShape").with("m_extent", HkValue::Vector4([1.0, 2.0, 3.0, 4.0]));
    for _ in 0..MAX_DEPTH {
        object = HkObject::new("hkpShape").with("m_child", HkValue::Object(object));
    }
    let roots = payload_root(object);
    let bytes = PackfileCodec.encode(&roots[0], &HkxHeader::wiiu()).unwrap();

    for pretty in [false, true] {
        let tree = TreeCodec::new(FieldNaming::default(), pretty);
        let text = tree.encode(&[PackfileCodec.decode(&bytes).unwrap().root]).unwrap();
        assert_eq!(tree.decode(&text).unwrap(), roots);
    }
}

// ── Properties ───────────────────────────────────────────────────────────────

fn arb_real() -> impl Strategy<Value = f32> {
    any::<u32>().prop_map(f32::from_bits)
}

fn arb_class_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9]{0,15}"
}

fn arb_member_name() -> impl Strategy<Value = String> {
    prop_oneof![
        "m_[a-zA-Z0-9_]{0,10}",
        "[a-zA-Z_][a-zA-Z0-9_]{0,10}",
        "[$m_:a-z]{0,8}",
        "\\PC{0,6}",
    ]
    .prop_filter("reserved by the text form", |n| n != "$class" && n != "Signature")
}

fn arb_integer() -> impl Strategy<Value = HkValue> {
    prop_oneof![
        any::<i8>().prop_map(HkValue::I8),
        any::<u8>().prop_map(HkValue::U8),
        any::<i16>().prop_map(HkValue::I16),
        any::<u16>().prop_map(HkValue::U16),
        any::<i32>().prop_map(HkValue::I32),
        any::<u32>().prop_map(HkValue::U32),
        any::<i64>().prop_map(HkValue::I64),
        any::<u64>().prop_map(HkValue::U64),
    ]
}

fn arb_object(value: BoxedStrategy<HkValue>) -> impl Strategy<Value = HkObject> {
    (arb_class_name(), prop::collection::btree_map(arb_member_name(), value, 0..6))
        .prop_map(|(class_name, members)| HkObject { class_name, members: members.into_iter().collect() })
}

fn arb_value() -> impl Strategy<Value = HkValue> {
    let leaf = prop_oneof![
        Just(HkValue::Null),
        any::<bool>().prop_map(HkValue::Bool),
        arb_integer(),
        arb_real().prop_map(HkValue::Real),
        prop::array::uniform4(arb_real()).prop_map(HkValue::Vector4),
        "\\PC{0,12}".prop_map(HkValue::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(HkValue::Array),
            arb_object(inner.boxed()).prop_map(HkValue::Object),
        ]
    })
}

fn arb_container() -> impl Strategy<Value = HavokRoot> {
    let variant = (
        "\\PC{0,10}",
        arb_class_name(),
        prop::option::of(arb_object(arb_value().boxed())),
    )
        .prop_map(|(name, class_name, variant)| NamedVariant { name, class_name, variant });
    prop::collection::vec(variant, 0..3)
        .prop_map(|named_variants| HavokRoot::from(RootLevelContainer { named_variants }))
}

proptest! {
    #[test]
    fn prop_text_round_trip_is_lossless(
        roots in prop::collection::vec(arb_container(), 1..3),
        with_descriptor in any::<bool>(),
        pretty in any::<bool>(),
    ) {
        let mut roots = roots;
        if with_descriptor {
            roots.insert(0, HavokRoot::from(compound_info()));
        }
        for naming in [FieldNaming::default(), FieldNaming::verbatim()] {
            let tree = TreeCodec::new(naming, pretty);
            let text = tree.encode(&roots).unwrap();
            let back = tree.decode(&text).unwrap();
            prop_assert_eq!(packed(&back), packed(&roots));
        }
    }
}
