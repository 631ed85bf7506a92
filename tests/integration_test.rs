mod common;

use std::fs;

use common::*;
use hkxconv::convert::{to_binary, to_text, BinaryOptions, ConvertError, TextOptions};
use hkxconv::header::{HkxHeader, Platform, MAGIC0};
use hkxconv::object::HavokRoot;
use hkxconv::text::{FieldNaming, TreeCodec};
use serde_json::Value;
use tempfile::tempdir;

fn keys(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                out.push(k.clone());
                keys(v, out);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| keys(v, out)),
        _ => {}
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

#[test]
fn test_rigid_body_round_trip() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("TwnObj_Barrel.hkrb");
    let original = shipped_bytes(&[HavokRoot::from(physics_data())], "hkrb", HkxHeader::wiiu());
    fs::write(&src, &original).unwrap();

    let json = to_text(&src, None, &TextOptions::default()).unwrap();
    assert_eq!(json, dir.path().join("TwnObj_Barrel.json"));

    let text = fs::read_to_string(&json).unwrap();
    let mut all_keys = Vec::new();
    keys(&serde_json::from_str(&text).unwrap(), &mut all_keys);
    assert!(all_keys.iter().any(|k| k == "namedVariants"));
    assert!(all_keys.iter().all(|k| !k.starts_with("m_")), "{all_keys:?}");
    assert!(all_keys.iter().all(|k| k != "Signature"));

    let back = dir.path().join("copy.hkrb");
    let written = to_binary(&json, Some(back.as_path()), &BinaryOptions::default()).unwrap();
    assert_eq!(written, back);
    assert_eq!(fs::read(&back).unwrap(), original);
}

#[test]
fn test_static_compound_round_trip() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("FieldA_A-1.hksc");
    let original = shipped_bytes(&compound_roots(), "hksc", HkxHeader::wiiu());
    fs::write(&src, &original).unwrap();

    let json = to_text(&src, None, &TextOptions { pretty: true, ..Default::default() }).unwrap();
    let value: Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    let roots = value.as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["$type"], "StaticCompoundInfo");
    assert_eq!(roots[1]["$type"], "hkRootLevelContainer");
    let offset = roots[0]["Offset"].as_u64().unwrap() as usize;
    assert!(offset > 0 && offset < original.len());

    // Second file starts with its own magic.
    assert_eq!(&original[offset..offset + 4], &MAGIC0.to_be_bytes());

    let back = dir.path().join("out").join("FieldA_A-1.hksc");
    fs::create_dir(back.parent().unwrap()).unwrap();
    to_binary(&json, Some(back.as_path()), &BinaryOptions::default()).unwrap();
    assert_eq!(fs::read(&back).unwrap(), original);
}

#[test]
fn test_default_binary_destination_uses_kind() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("NavMesh.hknm2");
    fs::write(&src, shipped_bytes(&[HavokRoot::from(container_for("hkaiNavMesh"))], "hknm2", HkxHeader::nx())).unwrap();

    let json = to_text(&src, None, &TextOptions::default()).unwrap();
    let renamed = dir.path().join("edited.json");
    fs::rename(&json, &renamed).unwrap();

    let written = to_binary(&renamed, None, &BinaryOptions { platform: Platform::Nx, ..Default::default() }).unwrap();
    assert_eq!(written, dir.path().join("edited.hknm2"));
    assert_eq!(fs::read(&written).unwrap(), fs::read(&src).unwrap());
}

#[test]
fn test_platform_selects_byte_order() {
    let dir = tempdir().unwrap();
    let json = dir.path().join("body.json");
    let text = TreeCodec::default().encode(&[HavokRoot::from(physics_data())]).unwrap();
    fs::write(&json, text).unwrap();

    let wiiu = to_binary(&json, Some(dir.path().join("wiiu.hkrb").as_path()), &BinaryOptions::default()).unwrap();
    let nx_opts = BinaryOptions { platform: Platform::Nx, ..Default::default() };
    let nx = to_binary(&json, Some(dir.path().join("nx.hkrb").as_path()), &nx_opts).unwrap();

    assert_eq!(&fs::read(wiiu).unwrap()[..4], &MAGIC0.to_be_bytes());
    assert_eq!(&fs::read(nx).unwrap()[..4], &MAGIC0.to_le_bytes());
}

// ── Refusals ─────────────────────────────────────────────────────────────────

#[test]
fn test_unresolved_kind_writes_nothing() {
    let dir = tempdir().unwrap();
    let json = dir.path().join("scene.json");
    let text = TreeCodec::default().encode(&[HavokRoot::from(container_for("hkxScene"))]).unwrap();
    fs::write(&json, text).unwrap();

    let err = to_binary(&json, None, &BinaryOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::UnresolvedKind { roots: 1 }), "{err}");

    let err = to_binary(&json, Some(dir.path().join("scene.hkrb").as_path()), &BinaryOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::UnresolvedKind { .. }));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_existing_destination_is_never_overwritten() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("Obj.hkcl");
    fs::write(&src, shipped_bytes(&[HavokRoot::from(container_for("hclClothContainer"))], "hkcl", HkxHeader::wiiu())).unwrap();

    let json = dir.path().join("Obj.json");
    fs::write(&json, "keep me").unwrap();
    let err = to_text(&src, None, &TextOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::DestinationExists(ref p) if *p == json));
    assert_eq!(fs::read_to_string(&json).unwrap(), "keep me");

    let fresh = to_text(&src, Some(dir.path().join("fresh.json").as_path()), &TextOptions::default()).unwrap();
    let before = fs::read(&src).unwrap();
    let err = to_binary(&fresh, Some(src.as_path()), &BinaryOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::DestinationExists(_)));
    assert_eq!(fs::read(&src).unwrap(), before);

    // The guessed destination is checked too.
    fs::write(dir.path().join("fresh.hkcl"), "keep me").unwrap();
    let err = to_binary(&fresh, None, &BinaryOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::DestinationExists(_)));
    assert_eq!(fs::read_to_string(dir.path().join("fresh.hkcl")).unwrap(), "keep me");
}

#[test]
fn test_missing_source_is_io_error() {
    let dir = tempdir().unwrap();
    let err = to_text(dir.path().join("absent.hkrb"), None, &TextOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::Io(_)));
    assert!(!dir.path().join("absent.json").exists());
}

#[test]
fn test_malformed_packfile_writes_nothing() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("broken.hkrb");
    fs::write(&src, b"not a packfile").unwrap();
    let err = to_text(&src, None, &TextOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::Container(_)));
    assert!(!dir.path().join("broken.json").exists());
}

// ── Text form ────────────────────────────────────────────────────────────────

#[test]
fn test_tree_codec_round_trip() {
    let roots = compound_roots();
    for pretty in [false, true] {
        let tree = TreeCodec::new(FieldNaming::default(), pretty);
        let text = tree.encode(&roots).unwrap();
        assert_eq!(text.contains('\n'), pretty);
        assert_eq!(tree.decode(&text).unwrap(), roots);
    }
}

#[test]
fn test_verbatim_naming_keeps_internal_names() {
    let tree = TreeCodec::new(FieldNaming::verbatim(), false);
    let text = tree.encode(&[HavokRoot::from(physics_data())]).unwrap();
    assert!(text.contains("\"m_namedVariants\""));
    assert!(text.contains("\"Signature\""));
    assert_eq!(tree.decode(&text).unwrap(), vec![HavokRoot::from(physics_data())]);
}

#[test]
fn test_signature_is_recomputed_on_read() {
    let tree = TreeCodec::new(FieldNaming::verbatim(), false);
    let roots = vec![HavokRoot::from(physics_data())];
    let mut value: Value = serde_json::from_str(&tree.encode(&roots).unwrap()).unwrap();
    let variant = &mut value[0]["m_namedVariants"][0]["m_variant"];
    assert!(variant["Signature"].is_u64());
    variant["Signature"] = Value::from(1);

    let edited = serde_json::to_string(&value).unwrap();
    assert_eq!(tree.decode(&edited).unwrap(), roots);
}

#[test]
fn test_top_level_must_be_array() {
    let err = TreeCodec::default().decode("{\"$type\":\"hkRootLevelContainer\"}").unwrap_err();
    assert!(matches!(err, hkxconv::text::TextError::NotAnArray));
    assert!(TreeCodec::default().decode("[").is_err());
}
