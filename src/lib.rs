pub mod object;
pub mod header;
pub mod codec;
pub mod kind;
pub mod container;
pub mod text;
pub mod convert;

pub use codec::{Codec, CodecError, PackfileCodec};
pub use container::{decode_container, encode_container, ContainerError};
pub use convert::ConvertError;
pub use header::{HkxHeader, Platform};
pub use kind::{classify, FileKind};
pub use object::{HavokRoot, HkObject, HkValue, RootLevelContainer, StaticCompoundInfo};
pub use text::{FieldNaming, TreeCodec};
