//! Document-backed configuration managers.
//!
//! A [`YamlManager`] owns one root [`YamlNode`] and knows how to load and
//! save it. Lookups through the manager never fail: structural errors and
//! impossible coercions are logged and turned into defaults.

use super::error::Error;
use super::node::YamlNode;
use super::serialize::{DocumentBackend, FyamlBackend};
use super::settings::Settings;
use super::value::{Blob, FromScalar};
use fyaml::Value;
use rust_decimal::Decimal;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// A configuration tree backed by a document source.
pub trait YamlManager {
    fn settings(&self) -> &Settings;

    /// Parse the backing document and replace the root node wholesale.
    ///
    /// Failures are logged and reported as `false`.
    fn load(&mut self) -> bool;

    /// Write the dumped root node back to the backing file.
    fn save(&self) -> bool;

    fn root_node(&self) -> YamlNode;

    fn set_root_node(&mut self, node: YamlNode);

    fn exist(&self, path: &str) -> bool {
        let found = self.root_node().has_node(path);
        log::debug!(target: self.settings().log_target.as_str(), "exist '{}': {}", path, found);
        found
    }

    fn get_node(&self, path: &str) -> Option<YamlNode> {
        match self.root_node().get_node(path, false) {
            Ok(node) => node,
            Err(e) => {
                log::debug!(target: self.settings().log_target.as_str(), "lookup of '{}' failed: {}", path, e);
                None
            }
        }
    }

    /// Set the value at `path`, creating missing nodes on the way.
    fn set_node(&mut self, path: &str, value: Value) -> Result<YamlNode, Error> {
        let node = self
            .root_node()
            .get_node(path, true)?
            .ok_or_else(|| Error::structure(path, "node could not be created."))?;
        node.set_value(value);
        Ok(node)
    }

    /// Shallow union of `other`'s top-level entries into this tree.
    fn add_nodes(&mut self, other: &dyn YamlManager) -> Result<(), Error> {
        self.add_nodes_value(other.root_node().dump())
    }

    /// Shallow union of a plain mapping's entries into this tree.
    ///
    /// Entries with an existing name replace the previous node.
    fn add_nodes_value(&mut self, nodes: Value) -> Result<(), Error> {
        match nodes {
            Value::Null => Ok(()),
            Value::Mapping(_) => {
                let added = self.root_node().add_children(nodes)?;
                log::debug!(target: self.settings().log_target.as_str(), "added {} top-level nodes", added.len());
                Ok(())
            }
            _ => Err(Error::Type(
                "only a mapping can be merged into a configuration root.".to_string(),
            )),
        }
    }

    /// Number of scalar leaves; an empty document has none.
    fn final_node_count(&self) -> usize {
        let root = self.root_node();
        if root.is_null() {
            0
        } else {
            root.final_node_count()
        }
    }
}

/// Typed getters available on every manager, including trait objects.
pub trait YamlManagerExt: YamlManager {
    fn get<T: FromScalar>(&self, path: &str) -> Option<T> {
        let node = self.get_node(path)?;
        let value = node.get::<T>();
        if value.is_none() {
            log::debug!(target: self.settings().log_target.as_str(), "no usable value at '{}'", path);
        }
        value
    }

    fn get_or<T: FromScalar>(&self, path: &str, default: T) -> T {
        match self.get(path) {
            Some(value) => value,
            None => {
                log::debug!(target: self.settings().log_target.as_str(), "using default value for '{}'", path);
                default
            }
        }
    }

    fn get_string(&self, path: &str, default: &str) -> String {
        self.get(path).unwrap_or_else(|| default.to_string())
    }

    fn get_int(&self, path: &str, default: i32) -> i32 {
        self.get_or(path, default)
    }

    fn get_long(&self, path: &str, default: i64) -> i64 {
        self.get_or(path, default)
    }

    fn get_big_int(&self, path: &str, default: i128) -> i128 {
        self.get_or(path, default)
    }

    fn get_double(&self, path: &str, default: f64) -> f64 {
        self.get_or(path, default)
    }

    fn get_float(&self, path: &str, default: f32) -> f32 {
        self.get_or(path, default)
    }

    fn get_decimal(&self, path: &str, default: Decimal) -> Decimal {
        self.get_or(path, default)
    }

    fn get_bytes(&self, path: &str, default: Vec<u8>) -> Vec<u8> {
        self.get_or(path, default)
    }

    fn get_date(&self, path: &str, default: OffsetDateTime) -> OffsetDateTime {
        self.get_or(path, default)
    }

    fn get_blob(&self, path: &str, default: Blob) -> Blob {
        self.get_or(path, default)
    }

    fn get_bool(&self, path: &str, default: bool) -> bool {
        self.get_or(path, default)
    }
}

impl<M: YamlManager + ?Sized> YamlManagerExt for M {}

// =============================================================================
// SimpleYamlManager
// =============================================================================

/// Manager over a single document: a pending reader, a resource looked up
/// in the configured resource directories, or a file.
pub struct SimpleYamlManager {
    settings: Settings,
    root: YamlNode,
    reader: Option<Box<dyn Read>>,
    resource: Option<String>,
    file: Option<PathBuf>,
    backend: Box<dyn DocumentBackend>,
}

impl fmt::Debug for SimpleYamlManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleYamlManager")
            .field("settings", &self.settings)
            .field("root", &self.root)
            .field("pending_reader", &self.reader.is_some())
            .field("resource", &self.resource)
            .field("file", &self.file)
            .finish()
    }
}

impl SimpleYamlManager {
    /// Manager with an empty tree and no document source.
    pub fn new(settings: Settings) -> Result<Self, Error> {
        settings.validate()?;
        Ok(Self::in_memory(settings))
    }

    pub(crate) fn in_memory(settings: Settings) -> Self {
        let root = YamlNode::with_options(Value::Null, settings.path_options());
        let backend = Box::new(FyamlBackend::new(settings.indent));
        Self {
            settings,
            root,
            reader: None,
            resource: None,
            file: None,
            backend,
        }
    }

    /// Manager loading from and saving to `path`.
    pub fn from_file(path: impl Into<PathBuf>, settings: Settings) -> Result<Self, Error> {
        let mut manager = Self::new(settings)?;
        manager.file = Some(path.into());
        Ok(manager)
    }

    /// Manager loading `name` from the first of `Settings::resource_dirs`
    /// holding it. Nothing is saved unless a file is set.
    pub fn from_resource(name: impl Into<String>, settings: Settings) -> Result<Self, Error> {
        let mut manager = Self::new(settings)?;
        manager.resource = Some(name.into());
        Ok(manager)
    }

    /// The reader is consumed by the next `load()`.
    pub fn from_reader(reader: impl Read + 'static, settings: Settings) -> Result<Self, Error> {
        let mut manager = Self::new(settings)?;
        manager.reader = Some(Box::new(reader));
        Ok(manager)
    }

    /// Replace the document backend (libfyaml by default).
    pub fn with_backend(mut self, backend: Box<dyn DocumentBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Save target, if any.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Set the save target (and load source when nothing else is pending).
    pub fn set_file(&mut self, path: impl Into<PathBuf>) {
        self.file = Some(path.into());
    }

    /// Resource name, if the manager is resource-backed.
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    fn find_resource(&self, name: &str) -> Option<PathBuf> {
        self.settings
            .resource_dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    fn source_label(&self) -> String {
        if self.reader.is_some() {
            "reader".to_string()
        } else if let Some(name) = &self.resource {
            format!("resource '{}'", name)
        } else if let Some(file) = &self.file {
            format!("file '{}'", file.display())
        } else {
            "no source".to_string()
        }
    }

    /// Text of the first available source, `None` when there is none.
    fn read_source(&mut self) -> Result<Option<String>, Error> {
        if let Some(mut reader) = self.reader.take() {
            let mut text = String::new();
            reader
                .read_to_string(&mut text)
                .map_err(|e| Error::Io(format!("Failed to read from reader: {}", e)))?;
            return Ok(Some(text));
        }
        if let Some(name) = &self.resource {
            let path = self.find_resource(name).ok_or_else(|| {
                Error::Io(format!(
                    "resource '{}' not found in {:?}",
                    name, self.settings.resource_dirs
                ))
            })?;
            let text = fs::read_to_string(&path)
                .map_err(|e| Error::Io(format!("Failed to read '{}': {}", path.display(), e)))?;
            return Ok(Some(text));
        }
        if let Some(file) = &self.file {
            let text = fs::read_to_string(file)
                .map_err(|e| Error::Io(format!("Failed to read '{}': {}", file.display(), e)))?;
            return Ok(Some(text));
        }
        Ok(None)
    }
}

impl YamlManager for SimpleYamlManager {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn load(&mut self) -> bool {
        let label = self.source_label();
        let text = match self.read_source() {
            Ok(Some(text)) => text,
            Ok(None) => {
                log::warn!(target: self.settings.log_target.as_str(), "nothing to load: no document source");
                return false;
            }
            Err(e) => {
                log::error!(target: self.settings.log_target.as_str(), "{}", e);
                return false;
            }
        };
        match self.backend.parse(&text) {
            Ok(value) => {
                self.root = YamlNode::with_options(value, self.settings.path_options());
                log::debug!(target: self.settings.log_target.as_str(), "loaded {}", label);
                true
            }
            Err(e) => {
                log::error!(target: self.settings.log_target.as_str(), "{}: {}", label, e);
                false
            }
        }
    }

    fn save(&self) -> bool {
        let Some(file) = &self.file else {
            log::warn!(target: self.settings.log_target.as_str(), "nothing saved: no file target");
            return false;
        };
        let text = match self.backend.emit(&self.root.dump()) {
            Ok(text) => text,
            Err(e) => {
                log::error!(target: self.settings.log_target.as_str(), "cannot serialize '{}': {}", file.display(), e);
                return false;
            }
        };
        match fs::write(file, text) {
            Ok(()) => {
                log::debug!(target: self.settings.log_target.as_str(), "saved '{}'", file.display());
                true
            }
            Err(e) => {
                log::error!(target: self.settings.log_target.as_str(), "Failed to write '{}': {}", file.display(), e);
                false
            }
        }
    }

    fn root_node(&self) -> YamlNode {
        self.root.clone()
    }

    fn set_root_node(&mut self, node: YamlNode) {
        self.root = node;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
