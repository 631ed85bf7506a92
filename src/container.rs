//! Container layer: one file ⇄ one or two root objects.
//!
//! # Static compound files
//!
//! An `hksc` file is two complete packfiles concatenated:
//!
//! ```text
//! [ StaticCompoundInfo packfile | hkRootLevelContainer packfile ]
//!   ^ offset field = length of ── ^
//! ```
//!
//! The descriptor's `offset` field holds the length of the descriptor's own
//! encoding, which is not known until it has been encoded once.  Writing is
//! therefore encode → measure → patch → encode again.  The field is a fixed
//! `u32`, so the second encode has the same length as the first; that is
//! checked rather than assumed.

use thiserror::Error;
use tracing::debug;

use crate::codec::{Codec, CodecError};
use crate::header::HkxHeader;
use crate::kind::{FileKind, COMPOUND_EXTENSION};
use crate::object::{HavokRoot, CLASS_ROOT_LEVEL_CONTAINER, CLASS_STATIC_COMPOUND_INFO};

/// Section offset of the descriptor stream of a compound file.
pub const COMPOUND_DESCRIPTOR_SECTION_OFFSET: i16 = 0;
/// Section offset of the container stream of a compound file.
pub const COMPOUND_CONTAINER_SECTION_OFFSET: i16 = 16;
/// Upper bound on measure/patch/re-encode rounds for the descriptor.
pub const MAX_FIX_POINT_PASSES: usize = 4;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Malformed container: {0}")]
    MalformedContainer(#[from] CodecError),
    #[error("Root {position} is `{found}`, expected `{expected}`")]
    TypeMismatch { position: usize, expected: &'static str, found: &'static str },
    #[error("Unknown file extension `{0}`")]
    UnknownExtension(String),
    #[error("`{extension}` files hold {expected} root(s), got {found}")]
    CardinalityMismatch { extension: String, expected: usize, found: usize },
    #[error("Descriptor length did not settle after {passes} passes (last {last} B, previous {previous} B)")]
    LengthUnstable { passes: usize, previous: usize, last: usize },
    #[error("Descriptor length {0} B does not fit in its offset field")]
    OffsetOverflow(usize),
}

// ── Read ─────────────────────────────────────────────────────────────────────

/// Decode a file's bytes into its root objects.
///
/// Only `hksc` is special-cased; every other extension is read as a single
/// root-level container.
pub fn decode_container<C: Codec>(
    codec:     &C,
    bytes:     &[u8],
    extension: &str,
) -> Result<Vec<HavokRoot>, ContainerError> {
    if extension == COMPOUND_EXTENSION {
        let descriptor = codec.decode(bytes)?.root;
        let offset = descriptor
            .as_compound_info()
            .ok_or_else(|| mismatch(0, CLASS_STATIC_COMPOUND_INFO, &descriptor))?
            .offset as usize;
        debug!(offset, total = bytes.len(), "splitting static compound");

        let rest = bytes.get(offset..).unwrap_or_default();
        let container = expect_container(1, codec.decode(rest)?.root)?;
        return Ok(vec![descriptor, container]);
    }

    Ok(vec![expect_container(0, codec.decode(bytes)?.root)?])
}

fn expect_container(position: usize, root: HavokRoot) -> Result<HavokRoot, ContainerError> {
    match root {
        HavokRoot::RootLevelContainer(_) => Ok(root),
        other => Err(mismatch(position, CLASS_ROOT_LEVEL_CONTAINER, &other)),
    }
}

fn mismatch(position: usize, expected: &'static str, found: &HavokRoot) -> ContainerError {
    ContainerError::TypeMismatch { position, expected, found: found.class_name() }
}

// ── Write ────────────────────────────────────────────────────────────────────

/// Encode `roots` as a file of the kind named by `extension`.
///
/// `header.section_offset` is overwritten to match the kind.  For compound
/// files the descriptor's `offset` field is patched in place and stays
/// patched after return.
pub fn encode_container<C: Codec>(
    codec:     &C,
    roots:     &mut [HavokRoot],
    extension: &str,
    header:    &mut HkxHeader,
) -> Result<Vec<u8>, ContainerError> {
    let kind = FileKind::from_extension(extension)
        .ok_or_else(|| ContainerError::UnknownExtension(extension.to_string()))?;

    match (kind.section_offset(), roots) {
        (Some(section_offset), [root]) => {
            header.section_offset = section_offset;
            Ok(codec.encode(root, header)?)
        }
        (None, [descriptor, container]) => encode_compound(codec, descriptor, container, header),
        (_, roots) => Err(ContainerError::CardinalityMismatch {
            extension: extension.to_string(),
            expected:  kind.root_count(),
            found:     roots.len(),
        }),
    }
}

fn encode_compound<C: Codec>(
    codec:      &C,
    descriptor: &mut HavokRoot,
    container:  &HavokRoot,
    header:     &mut HkxHeader,
) -> Result<Vec<u8>, ContainerError> {
    if descriptor.as_compound_info().is_none() {
        return Err(mismatch(0, CLASS_STATIC_COMPOUND_INFO, descriptor));
    }
    if container.as_container().is_none() {
        return Err(mismatch(1, CLASS_ROOT_LEVEL_CONTAINER, container));
    }

    header.section_offset = COMPOUND_DESCRIPTOR_SECTION_OFFSET;
    // Measurement pass: the offset field still holds its placeholder.
    let mut head = codec.encode(descriptor, header)?;
    let mut passes = 1;
    loop {
        let measured = head.len();
        patch_offset(descriptor, measured)?;
        head = codec.encode(descriptor, header)?;
        passes += 1;
        debug!(passes, measured, encoded = head.len(), "descriptor fix-point pass");
        if head.len() == measured {
            break;
        }
        if passes >= MAX_FIX_POINT_PASSES {
            return Err(ContainerError::LengthUnstable { passes, previous: measured, last: head.len() });
        }
    }

    header.section_offset = COMPOUND_CONTAINER_SECTION_OFFSET;
    let tail = codec.encode(container, header)?;

    let mut out = Vec::with_capacity(head.len() + tail.len());
    out.extend_from_slice(&head);
    out.extend_from_slice(&tail);
    Ok(out)
}

fn patch_offset(descriptor: &mut HavokRoot, len: usize) -> Result<(), ContainerError> {
    let found = descriptor.class_name();
    let info = descriptor.as_compound_info_mut().ok_or(ContainerError::TypeMismatch {
        position: 0,
        expected: CLASS_STATIC_COMPOUND_INFO,
        found,
    })?;
    info.offset = u32::try_from(len).map_err(|_| ContainerError::OffsetOverflow(len))?;
    Ok(())
}
