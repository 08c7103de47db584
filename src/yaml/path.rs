//! Path handling for configuration tree navigation.
//!
//! Provides utilities for splitting separator-joined paths and normalizing
//! segment names.

/// Path segment delimiter and name comparison policy shared by a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOptions {
    pub separator: String,
    pub case_sensitive: bool,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            separator: ".".to_string(),
            case_sensitive: false,
        }
    }
}

impl PathOptions {
    pub fn new(separator: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            separator: separator.into(),
            case_sensitive,
        }
    }

    /// Key used to index a child by name.
    pub fn normalize(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    pub fn split(&self, path: &str) -> Vec<String> {
        split_path(path, &self.separator)
    }

    pub fn join<S: AsRef<str>>(&self, segments: &[S]) -> String {
        join_path(segments, &self.separator)
    }
}

/// Split a separator-joined path into its components.
///
/// Handles escape sequences: a backslash before the separator keeps it
/// literal, `\\` is a literal backslash. With `.` as separator,
/// `a.b\.c.d` becomes `["a", "b.c", "d"]`.
pub fn split_path(path: &str, separator: &str) -> Vec<String> {
    let mut elements = Vec::new();
    let mut element = String::new();
    let mut rest = path;

    while let Some(c) = rest.chars().next() {
        if c == '\\' {
            let after = &rest[1..];
            if after.starts_with(separator) && !separator.is_empty() {
                element.push_str(separator);
                rest = &after[separator.len()..];
            } else if let Some(next) = after.chars().next() {
                element.push(next);
                rest = &after[next.len_utf8()..];
            } else {
                rest = after;
            }
            continue;
        }
        if !separator.is_empty() && rest.starts_with(separator) {
            elements.push(std::mem::take(&mut element));
            rest = &rest[separator.len()..];
            continue;
        }
        element.push(c);
        rest = &rest[c.len_utf8()..];
    }
    elements.push(element);
    elements
}

/// Join path segments, escaping backslashes and embedded separators.
pub fn join_path<S: AsRef<str>>(segments: &[S], separator: &str) -> String {
    segments
        .iter()
        .map(|s| {
            let escaped = s.as_ref().replace('\\', "\\\\");
            if separator.is_empty() {
                escaped
            } else {
                escaped.replace(separator, &format!("\\{}", separator))
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

// =============================================================================
// Unit Tests
// =============================================================================
