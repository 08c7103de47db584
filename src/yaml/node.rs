//! Lazily resolved configuration tree.
//!
//! A [`YamlNode`] is a cheap handle on one node of the tree. Raw parsed data
//! is kept unresolved until the first structural access, at which point the
//! node commits to being a scalar, a list or a map. Parents own their
//! children; the back-reference to the parent is weak.

use super::error::Error;
use super::path::PathOptions;
use super::serialize::serialize_raw;
use super::value::{Blob, FromScalar, ValueHolder};
use fyaml::Value;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use time::OffsetDateTime;

/// Shape of a resolved node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    List,
    Map,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Scalar => write!(f, "scalar"),
            NodeKind::List => write!(f, "sequence"),
            NodeKind::Map => write!(f, "struct"),
        }
    }
}

enum Content {
    Unresolved(Value),
    Scalar(Value),
    List(Vec<YamlNode>),
    /// Keyed by normalized name.
    Map(IndexMap<String, YamlNode>),
}

struct NodeData {
    name: Option<String>,
    /// Mapping key the node was read under, when it came from a document.
    key: Option<Value>,
    content: Content,
    parent: Weak<RefCell<NodeData>>,
    options: Rc<PathOptions>,
}

/// Handle on a node of the configuration tree.
///
/// Cloning the handle does not copy the node: both handles see the same
/// data. Use [`YamlNode::ptr_eq`] to compare identities.
#[derive(Clone)]
pub struct YamlNode {
    inner: Rc<RefCell<NodeData>>,
}

fn is_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Tagged(t) => is_null(&t.value),
        _ => false,
    }
}

/// Mapping keys become child names.
fn key_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serialize_raw(other),
    }
}

impl YamlNode {
    /// Root node over raw parsed data, with default path options.
    pub fn new(value: Value) -> Self {
        Self::with_options(value, PathOptions::default())
    }

    /// Root node over raw parsed data.
    pub fn with_options(value: Value, options: PathOptions) -> Self {
        Self::build(None, None, value, Weak::new(), Rc::new(options))
    }

    fn build(
        name: Option<String>,
        key: Option<Value>,
        value: Value,
        parent: Weak<RefCell<NodeData>>,
        options: Rc<PathOptions>,
    ) -> Self {
        YamlNode {
            inner: Rc::new(RefCell::new(NodeData {
                name,
                key,
                content: Content::Unresolved(value),
                parent,
                options,
            })),
        }
    }

    fn new_child(&self, name: Option<String>, value: Value) -> YamlNode {
        Self::build(name, None, value, Rc::downgrade(&self.inner), self.options())
    }

    /// Child read from a mapping entry; the original key is kept for dumps.
    fn new_entry(&self, key: Value, value: Value) -> YamlNode {
        let name = key_name(&key);
        Self::build(
            Some(name),
            Some(key),
            value,
            Rc::downgrade(&self.inner),
            self.options(),
        )
    }

    /// True when both handles point at the same node.
    pub fn ptr_eq(&self, other: &YamlNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Path options shared by every node of the tree.
    pub fn options(&self) -> Rc<PathOptions> {
        self.inner.borrow().options.clone()
    }

    /// Name under which the node is stored in its parent map, `None` for
    /// roots and list entries.
    pub fn name(&self) -> Option<String> {
        self.inner.borrow().name.clone()
    }

    /// Mapping key written by [`YamlNode::dump`]: the key read from the
    /// document, else the name as a string.
    fn key(&self) -> Value {
        let data = self.inner.borrow();
        match &data.key {
            Some(key) => key.clone(),
            None => Value::String(data.name.clone().unwrap_or_default()),
        }
    }

    /// Owning node, `None` for a root or a detached node.
    pub fn parent(&self) -> Option<YamlNode> {
        self.inner
            .borrow()
            .parent
            .upgrade()
            .map(|inner| YamlNode { inner })
    }

    fn clear_parent(&self) {
        self.inner.borrow_mut().parent = Weak::new();
    }

    /// Separator-joined names from the root (excluded) down to this node.
    ///
    /// List entries have no name and contribute an empty segment.
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            segments.push(current.name().unwrap_or_default());
            current = parent;
        }
        segments.reverse();
        self.options().join(&segments)
    }

    fn child_path(&self, name: &str) -> String {
        let path = self.path();
        if self.parent().is_none() {
            self.options().join(&[name])
        } else {
            format!("{}{}{}", path, self.options().separator, self.options().join(&[name]))
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Whether the node already committed to a scalar, a list or a map.
    pub fn is_resolved(&self) -> bool {
        !matches!(self.inner.borrow().content, Content::Unresolved(_))
    }

    /// Commit the node to its kind, materializing children from raw data.
    fn resolve(&self) {
        let raw = {
            let mut data = self.inner.borrow_mut();
            match &mut data.content {
                Content::Unresolved(v) => std::mem::replace(v, Value::Null),
                _ => return,
            }
        };
        let content = self.materialize(raw);
        self.inner.borrow_mut().content = content;
    }

    fn materialize(&self, raw: Value) -> Content {
        match raw {
            Value::Tagged(t) if matches!(t.value, Value::Mapping(_) | Value::Sequence(_)) => {
                let tagged = *t;
                self.materialize(tagged.value)
            }
            Value::Mapping(map) => {
                let options = self.options();
                let mut children = IndexMap::with_capacity(map.len());
                for (key, value) in map {
                    let name = key_name(&key);
                    let mut slot = options.normalize(&name);
                    if children.contains_key(&slot) {
                        // Kept for dumps, but only the first entry is
                        // reachable by name.
                        log::warn!(
                            "key '{}' of '{}' collides with an earlier key and cannot be addressed",
                            name,
                            self.path()
                        );
                        slot = format!("{}\0{}", slot, children.len());
                    }
                    children.insert(slot, self.new_entry(key, value));
                }
                Content::Map(children)
            }
            Value::Sequence(seq) => {
                Content::List(seq.into_iter().map(|v| self.new_child(None, v)).collect())
            }
            other => Content::Scalar(other),
        }
    }

    /// Kind of the node, resolving it if needed.
    pub fn kind(&self) -> NodeKind {
        self.resolve();
        match &self.inner.borrow().content {
            Content::List(_) => NodeKind::List,
            Content::Map(_) => NodeKind::Map,
            _ => NodeKind::Scalar,
        }
    }

    /// True for an empty scalar (not yet committed to a container).
    pub fn is_null(&self) -> bool {
        match &self.inner.borrow().content {
            Content::Unresolved(v) | Content::Scalar(v) => is_null(v),
            _ => false,
        }
    }

    /// Commit a null scalar to `want`, or check the node already is one.
    fn commit(&self, want: NodeKind) -> Result<(), Error> {
        self.resolve();
        {
            let mut data = self.inner.borrow_mut();
            let vacant = matches!(&data.content, Content::Scalar(v) if is_null(v));
            if vacant {
                match want {
                    NodeKind::Map => data.content = Content::Map(IndexMap::new()),
                    NodeKind::List => data.content = Content::List(Vec::new()),
                    NodeKind::Scalar => {}
                }
                return Ok(());
            }
        }
        let current = self.kind();
        if current == want {
            return Ok(());
        }
        Err(Error::structure(
            self.path(),
            format!("cannot use a {} node as a {}.", current, want),
        ))
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Whether a map node has a child named `name`. Lists and scalars have
    /// no named children.
    pub fn has_child(&self, name: &str) -> bool {
        self.resolve();
        let key = self.options().normalize(name);
        match &self.inner.borrow().content {
            Content::Map(children) => children.contains_key(&key),
            _ => false,
        }
    }

    /// Look up a named child, creating it as an empty node when `create` is
    /// set. A null node becomes a map on creation.
    ///
    /// # Errors
    ///
    /// Descending into a non-null scalar, or creating a named entry in a
    /// sequence, is a structural error.
    pub fn get_child(&self, name: &str, create: bool) -> Result<Option<YamlNode>, Error> {
        self.resolve();
        let key = self.options().normalize(name);
        {
            let data = self.inner.borrow();
            match &data.content {
                Content::Map(children) => {
                    if let Some(child) = children.get(&key) {
                        return Ok(Some(child.clone()));
                    }
                }
                Content::List(_) => {
                    if create {
                        return Err(Error::structure(
                            self.child_path(name),
                            "cannot address sequence entries by name.",
                        ));
                    }
                    return Ok(None);
                }
                Content::Scalar(v) if is_null(v) => {}
                _ => {
                    return Err(Error::structure(
                        self.child_path(name),
                        format!("cannot traverse scalar at '{}'.", name),
                    ));
                }
            }
        }
        if !create {
            return Ok(None);
        }
        self.commit(NodeKind::Map)?;
        let child = self.new_child(Some(name.to_string()), Value::Null);
        if let Content::Map(children) = &mut self.inner.borrow_mut().content {
            children.insert(key, child.clone());
        }
        Ok(Some(child))
    }

    /// Walk already split path segments from this node.
    pub fn get_node_segments<S: AsRef<str>>(
        &self,
        segments: &[S],
        create: bool,
    ) -> Result<Option<YamlNode>, Error> {
        let mut current = self.clone();
        for segment in segments {
            match current.get_child(segment.as_ref(), create)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Walk a separator-joined path from this node.
    pub fn get_node(&self, path: &str, create: bool) -> Result<Option<YamlNode>, Error> {
        let segments = self.options().split(path);
        self.get_node_segments(&segments, create)
    }

    /// Whether `path` names an existing node. Never fails.
    pub fn has_node(&self, path: &str) -> bool {
        matches!(self.get_node(path, false), Ok(Some(_)))
    }

    /// Children in order. Maps list their values.
    pub fn children_list(&self) -> Result<Vec<YamlNode>, Error> {
        self.resolve();
        match &self.inner.borrow().content {
            Content::List(children) => return Ok(children.clone()),
            Content::Map(children) => return Ok(children.values().cloned().collect()),
            _ => {}
        }
        Err(Error::structure(self.path(), "a scalar has no children."))
    }

    /// Named children, keyed by their original names.
    pub fn children_map(&self) -> Result<IndexMap<String, YamlNode>, Error> {
        self.resolve();
        let kind = match &self.inner.borrow().content {
            Content::Map(children) => {
                return Ok(children
                    .values()
                    .map(|c| (c.name().unwrap_or_default(), c.clone()))
                    .collect());
            }
            Content::List(_) => NodeKind::List,
            _ => NodeKind::Scalar,
        };
        Err(Error::structure(
            self.path(),
            format!("a {} has no named children.", kind),
        ))
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append an anonymous child; a null node becomes a list.
    pub fn add_child(&self, value: Value) -> Result<YamlNode, Error> {
        self.commit(NodeKind::List)?;
        let child = self.new_child(None, value);
        if let Content::List(children) = &mut self.inner.borrow_mut().content {
            children.push(child.clone());
        }
        Ok(child)
    }

    /// Insert a named child, replacing any entry with the same name; a null
    /// node becomes a map.
    pub fn add_named_child(&self, name: &str, value: Value) -> Result<YamlNode, Error> {
        self.commit(NodeKind::Map)?;
        let key = self.options().normalize(name);
        let child = self.new_child(Some(name.to_string()), value);
        let replaced = match &mut self.inner.borrow_mut().content {
            Content::Map(children) => children.insert(key, child.clone()),
            _ => None,
        };
        if let Some(old) = replaced {
            old.clear_parent();
        }
        Ok(child)
    }

    /// Attach a copy of `node` under this node and detach the original from
    /// its previous parent. Returns the handle on the attached copy.
    ///
    /// Lists receive the node anonymously; otherwise its name is kept.
    pub fn add_child_node(&self, node: &YamlNode) -> Result<YamlNode, Error> {
        let name = node.name();
        let value = node.dump();
        node.detach();
        match name {
            Some(name) if self.kind() != NodeKind::List => self.add_named_child(&name, value),
            _ => self.add_child(value),
        }
    }

    /// Bulk add: a mapping adds named children, a sequence anonymous ones.
    pub fn add_children(&self, value: Value) -> Result<Vec<YamlNode>, Error> {
        match value {
            Value::Mapping(map) => {
                self.commit(NodeKind::Map)?;
                map.into_iter()
                    .map(|(k, v)| self.add_named_child(&key_name(&k), v))
                    .collect()
            }
            Value::Sequence(seq) => {
                self.commit(NodeKind::List)?;
                seq.into_iter().map(|v| self.add_child(v)).collect()
            }
            Value::Tagged(t) => self.add_children(t.value),
            other => Err(Error::Type(format!(
                "cannot add children from scalar '{}', expected a mapping or a sequence.",
                serialize_raw(&other)
            ))),
        }
    }

    /// Bulk append of existing nodes; a null node becomes a list.
    pub fn add_child_nodes(&self, nodes: &[YamlNode]) -> Result<Vec<YamlNode>, Error> {
        self.commit(NodeKind::List)?;
        nodes.iter().map(|n| self.add_child_node(n)).collect()
    }

    fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child_node(self);
        }
    }

    /// Remove a named child. Returns it detached, or `None` when absent.
    pub fn remove_child(&self, name: &str) -> Option<YamlNode> {
        self.resolve();
        let key = self.options().normalize(name);
        let removed = match &mut self.inner.borrow_mut().content {
            Content::Map(children) => children.shift_remove(&key),
            _ => None,
        };
        if let Some(child) = &removed {
            child.clear_parent();
        }
        removed
    }

    /// Remove a child by identity.
    pub fn remove_child_node(&self, node: &YamlNode) -> Option<YamlNode> {
        self.resolve();
        let removed = match &mut self.inner.borrow_mut().content {
            Content::Map(children) => children
                .iter()
                .position(|(_, c)| c.ptr_eq(node))
                .and_then(|idx| children.shift_remove_index(idx))
                .map(|(_, c)| c),
            Content::List(children) => children
                .iter()
                .position(|c| c.ptr_eq(node))
                .map(|idx| children.remove(idx)),
            _ => None,
        };
        if let Some(child) = &removed {
            child.clear_parent();
        }
        removed
    }

    /// Drop every child; a list stays a list and a map stays a map.
    pub fn remove_all_children(&self) {
        self.resolve();
        let removed: Vec<YamlNode> = match &mut self.inner.borrow_mut().content {
            Content::List(children) => std::mem::take(children),
            Content::Map(children) => std::mem::take(children).into_values().collect(),
            _ => Vec::new(),
        };
        for child in removed {
            child.clear_parent();
        }
    }

    /// Replace the content. The node goes back to the unresolved state and
    /// previous children are detached.
    pub fn set_value(&self, value: Value) {
        let old = std::mem::replace(
            &mut self.inner.borrow_mut().content,
            Content::Unresolved(value),
        );
        match old {
            Content::List(children) => children.iter().for_each(YamlNode::clear_parent),
            Content::Map(children) => children.values().for_each(YamlNode::clear_parent),
            _ => {}
        }
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Plain nested value of the subtree.
    pub fn dump(&self) -> Value {
        match &self.inner.borrow().content {
            Content::Unresolved(v) | Content::Scalar(v) => v.clone(),
            Content::List(children) => Value::Sequence(children.iter().map(|c| c.dump()).collect()),
            Content::Map(children) => Value::Mapping(
                children.values().map(|c| (c.key(), c.dump())).collect(),
            ),
        }
    }

    /// Number of scalar leaves below this node; a scalar counts as one.
    pub fn final_node_count(&self) -> usize {
        match self.children_list() {
            Ok(children) => children.iter().map(YamlNode::final_node_count).sum(),
            Err(_) => 1,
        }
    }

    // =========================================================================
    // Typed access
    // =========================================================================

    /// Scalar content, `None` for lists and maps.
    pub fn value(&self) -> Option<Value> {
        self.resolve();
        match &self.inner.borrow().content {
            Content::Scalar(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn value_holder(&self) -> ValueHolder {
        ValueHolder::new(self.value())
    }

    pub fn get<T: FromScalar>(&self) -> Option<T> {
        self.value_holder().get()
    }

    pub fn get_or<T: FromScalar>(&self, default: T) -> T {
        self.value_holder().get_or(default)
    }

    pub fn get_string(&self, default: &str) -> String {
        self.value_holder().string_or(default)
    }

    pub fn get_int(&self, default: i32) -> i32 {
        self.get_or(default)
    }

    pub fn get_long(&self, default: i64) -> i64 {
        self.get_or(default)
    }

    pub fn get_big_int(&self, default: i128) -> i128 {
        self.get_or(default)
    }

    pub fn get_double(&self, default: f64) -> f64 {
        self.get_or(default)
    }

    pub fn get_float(&self, default: f32) -> f32 {
        self.get_or(default)
    }

    pub fn get_decimal(&self, default: Decimal) -> Decimal {
        self.get_or(default)
    }

    pub fn get_bytes(&self, default: Vec<u8>) -> Vec<u8> {
        self.get_or(default)
    }

    pub fn get_date(&self, default: OffsetDateTime) -> OffsetDateTime {
        self.get_or(default)
    }

    pub fn get_blob(&self, default: Blob) -> Blob {
        self.get_or(default)
    }

    pub fn get_bool(&self, default: bool) -> bool {
        self.get_or(default)
    }
}

impl fmt::Debug for YamlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YamlNode")
            .field("name", &self.name())
            .field("resolved", &self.is_resolved())
            .field("value", &self.dump())
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
