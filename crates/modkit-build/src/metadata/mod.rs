//! Module metadata (`.psd1`) reading and rewriting

pub mod document;
pub mod patcher;
pub mod value;

pub use document::{FieldEntry, MetadataDocument};
pub use patcher::{MetadataPatcher, PatchReport};
pub use value::MetadataValue;
