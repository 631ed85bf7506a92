//! File kinds: extension ⇄ kind ⇄ write convention.
//!
//! Every asset kind the game ships as a packfile has a fixed extension and a
//! fixed header section offset.  Static compound files (`hksc`) are the odd
//! one out: they hold two packfiles back to back and are written with the
//! two-phase protocol in [`crate::container`].

use std::fmt;
use std::path::Path;

use crate::object::HavokRoot;

/// Extension of two-stream static compound files.
pub const COMPOUND_EXTENSION: &str = "hksc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    ClothContainer,
    RigidBodyAnimation,
    PhysicsRigidBody,
    TransformedRigidBody,
    NavMesh,
    /// `StaticCompoundInfo` descriptor followed by a root-level container.
    StaticCompound,
}

impl FileKind {
    pub const ALL: [FileKind; 6] = [
        FileKind::ClothContainer,
        FileKind::RigidBodyAnimation,
        FileKind::PhysicsRigidBody,
        FileKind::TransformedRigidBody,
        FileKind::NavMesh,
        FileKind::StaticCompound,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            FileKind::ClothContainer       => "hkcl",
            FileKind::RigidBodyAnimation   => "hkrg",
            FileKind::PhysicsRigidBody     => "hkrb",
            FileKind::TransformedRigidBody => "hktmrb",
            FileKind::NavMesh              => "hknm2",
            FileKind::StaticCompound       => COMPOUND_EXTENSION,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.extension() == ext)
    }

    /// Kind named by the final extension of `path`.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Class declared by the first named variant of a simple kind's container.
    pub fn root_class_name(self) -> Option<&'static str> {
        match self {
            FileKind::ClothContainer       => Some("hclClothContainer"),
            FileKind::RigidBodyAnimation   => Some("hkaAnimationContainer"),
            FileKind::PhysicsRigidBody     => Some("hkpPhysicsData"),
            FileKind::TransformedRigidBody => Some("hkpRigidBody"),
            FileKind::NavMesh              => Some("hkaiNavMesh"),
            FileKind::StaticCompound       => None,
        }
    }

    pub fn from_class_name(class_name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.root_class_name() == Some(class_name))
    }

    /// Header section offset for single-stream kinds.
    ///
    /// `None` for [`FileKind::StaticCompound`], whose two streams use
    /// different offsets.
    pub fn section_offset(self) -> Option<i16> {
        match self {
            FileKind::ClothContainer       => Some(0),
            FileKind::RigidBodyAnimation   => Some(0),
            FileKind::PhysicsRigidBody     => Some(0),
            FileKind::TransformedRigidBody => Some(16),
            FileKind::NavMesh              => Some(16),
            FileKind::StaticCompound       => None,
        }
    }

    pub fn is_compound(self) -> bool {
        self == FileKind::StaticCompound
    }

    /// Number of root objects a file of this kind holds.
    pub fn root_count(self) -> usize {
        if self.is_compound() { 2 } else { 1 }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Work out which kind of file `roots` should be written as.
///
/// Two roots are always a static compound.  A single root is classified by
/// the class name of its container's first named variant.  Anything else,
/// including a lone descriptor or an empty container, is unresolved.
pub fn classify(roots: &[HavokRoot]) -> Option<FileKind> {
    match roots {
        [_, _] => Some(FileKind::StaticCompound),
        [root] => root
            .as_container()
            .and_then(|c| c.first_class_name())
            .and_then(FileKind::from_class_name),
        _ => None,
    }
}
