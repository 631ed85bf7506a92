//! File-level conversions: packfile → JSON and JSON → packfile.
//!
//! ```no_run
//! use hkxconv::convert::{to_binary, to_text, BinaryOptions, TextOptions};
//!
//! let json = to_text("Actor.hkrb", None, &TextOptions { pretty: true, ..Default::default() })?;
//! let hkx  = to_binary(&json, Some("Actor.copy.hkrb".as_ref()), &BinaryOptions::default())?;
//! # Ok::<(), hkxconv::convert::ConvertError>(())
//! ```
//!
//! Neither direction ever overwrites an existing file.  The destination is
//! checked before any work is done, the output is built completely in
//! memory, and the file is created with `create_new` so a destination that
//! appears in the meantime is still left alone.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::codec::{Codec, PackfileCodec};
use crate::container::{decode_container, encode_container, ContainerError};
use crate::header::{HkxHeader, Platform};
use crate::kind::{classify, FileKind};
use crate::text::{FieldNaming, TextError, TreeCodec};

pub const TEXT_EXTENSION: &str = "json";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),
    #[error("Cannot tell which kind of file these {roots} root(s) belong to")]
    UnresolvedKind { roots: usize },
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error("Text error: {0}")]
    Text(#[from] TextError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Options ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct TextOptions {
    pub pretty: bool,
    pub naming: FieldNaming,
}

impl TextOptions {
    fn tree_codec(&self) -> TreeCodec {
        TreeCodec::new(self.naming.clone(), self.pretty)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BinaryOptions {
    pub platform: Platform,
    pub naming:   FieldNaming,
}

// ── In-memory conversions ────────────────────────────────────────────────────

/// Packfile bytes → JSON text.  `extension` selects the container layout.
pub fn hkx_to_text<C: Codec>(
    codec:     &C,
    bytes:     &[u8],
    extension: &str,
    tree:      &TreeCodec,
) -> Result<String, ConvertError> {
    let roots = decode_container(codec, bytes, extension)?;
    debug!(roots = roots.len(), extension, "decoded container");
    Ok(tree.encode(&roots)?)
}

/// JSON text → packfile bytes, plus the kind the roots were classified as.
pub fn text_to_hkx<C: Codec>(
    codec:    &C,
    text:     &str,
    platform: Platform,
    tree:     &TreeCodec,
) -> Result<(FileKind, Vec<u8>), ConvertError> {
    let mut roots = tree.decode(text)?;
    let kind = classify(&roots).ok_or(ConvertError::UnresolvedKind { roots: roots.len() })?;
    debug!(%kind, platform = platform.name(), "classified roots");

    let mut header = HkxHeader::for_platform(platform);
    let bytes = encode_container(codec, &mut roots, kind.extension(), &mut header)?;
    Ok((kind, bytes))
}

// ── File conversions ─────────────────────────────────────────────────────────

/// Convert the packfile at `src` to JSON.  Returns the path written.
///
/// `dst` defaults to `src` with its extension replaced by `json`.
pub fn to_text(src: impl AsRef<Path>, dst: Option<&Path>, opts: &TextOptions) -> Result<PathBuf, ConvertError> {
    let src = src.as_ref();
    let dst = match dst {
        Some(d) => d.to_path_buf(),
        None    => src.with_extension(TEXT_EXTENSION),
    };
    check_destination(&dst)?;

    let bytes = fs::read(src)?;
    let text = hkx_to_text(&PackfileCodec, &bytes, &extension_of(src), &opts.tree_codec())?;

    write_new(&dst, text.as_bytes())?;
    info!(src = %src.display(), dst = %dst.display(), "wrote JSON");
    Ok(dst)
}

/// Convert the JSON at `src` to a packfile.  Returns the path written.
///
/// `dst` defaults to `src` with its extension replaced by the classified
/// kind's extension.
pub fn to_binary(src: impl AsRef<Path>, dst: Option<&Path>, opts: &BinaryOptions) -> Result<PathBuf, ConvertError> {
    let src = src.as_ref();
    if let Some(d) = dst {
        check_destination(d)?;
    }

    let text = fs::read_to_string(src)?;
    let tree = TreeCodec::new(opts.naming.clone(), false);
    let (kind, bytes) = text_to_hkx(&PackfileCodec, &text, opts.platform, &tree)?;

    let dst = match dst {
        Some(d) => d.to_path_buf(),
        None    => {
            let guessed = src.with_extension(kind.extension());
            check_destination(&guessed)?;
            guessed
        }
    };
    write_new(&dst, &bytes)?;
    info!(src = %src.display(), dst = %dst.display(), %kind, "wrote packfile");
    Ok(dst)
}

/// Final extension of `path`, or the empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn check_destination(path: &Path) -> Result<(), ConvertError> {
    if path.exists() {
        return Err(ConvertError::DestinationExists(path.to_path_buf()));
    }
    Ok(())
}

fn write_new(path: &Path, data: &[u8]) -> Result<(), ConvertError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => ConvertError::DestinationExists(path.to_path_buf()),
            _ => ConvertError::Io(e),
        })?;
    if let Err(e) = file.write_all(data) {
        drop(file);
        // Never leave a half-written destination behind.
        let _ = fs::remove_file(path);
        return Err(e.into());
    }
    Ok(())
}
