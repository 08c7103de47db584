//! YAML configuration tree.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for tree operations
//! - [`path`]: Path splitting, joining and name normalization
//! - [`value`]: Typed scalar coercion (`ValueHolder`)
//! - [`node`]: The lazily resolved node tree
//! - [`serialize`]: Document backend (parse and emit)
//! - [`settings`]: Construction settings
//! - [`manager`]: Document-backed managers
//! - [`combiner`]: Layering of several managers

mod combiner;
mod error;
mod manager;
mod node;
mod path;
mod serialize;
mod settings;
mod value;

// Re-export fyaml types
pub use fyaml::{Number, TaggedValue, Value};

pub use combiner::YamlCombiner;
pub use error::Error;
pub use manager::{SimpleYamlManager, YamlManager, YamlManagerExt};
pub use node::{NodeKind, YamlNode};
pub use path::{join_path, split_path, PathOptions};
pub use serialize::{parse_document, serialize_raw, DocumentBackend, FyamlBackend};
pub use settings::{Settings, DEFAULT_LOG_TARGET};
pub use value::{Blob, FromScalar, ValueHolder};
