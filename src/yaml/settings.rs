//! Construction settings for managers and combiners.

use super::error::Error;
use super::path::PathOptions;
use std::path::PathBuf;

pub const DEFAULT_LOG_TARGET: &str = "yamlcfg";

/// Immutable configuration handed to managers at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Path segment delimiter
    pub separator: String,
    /// Whether names are compared case-sensitively
    pub case_sensitive: bool,
    /// Reserved: multi-document streams are not handled yet
    pub multi_document: bool,
    /// Indent width used when saving
    pub indent: usize,
    /// Directories searched, in order, for resource-backed managers
    pub resource_dirs: Vec<PathBuf>,
    /// `log` target of every message emitted by the managers
    pub log_target: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            separator: ".".to_string(),
            case_sensitive: false,
            multi_document: false,
            indent: 2,
            resource_dirs: vec![PathBuf::from(".")],
            log_target: DEFAULT_LOG_TARGET.to_string(),
        }
    }
}

impl Settings {
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_multi_document(mut self, multi_document: bool) -> Self {
        self.multi_document = multi_document;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_resource_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.resource_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_log_target(mut self, target: impl Into<String>) -> Self {
        self.log_target = target.into();
        self
    }

    pub fn path_options(&self) -> PathOptions {
        PathOptions::new(self.separator.clone(), self.case_sensitive)
    }

    /// Reject settings no tree can work with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.separator.is_empty() {
            return Err(Error::Config("path separator cannot be empty".to_string()));
        }
        if self.separator.contains('\\') {
            return Err(Error::Config(format!(
                "path separator '{}' cannot contain a backslash (escape character)",
                self.separator
            )));
        }
        if self.indent == 0 {
            return Err(Error::Config("indent width must be at least 1".to_string()));
        }
        if self.log_target.is_empty() {
            return Err(Error::Config("log target cannot be empty".to_string()));
        }
        Ok(())
    }
}
