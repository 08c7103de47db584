//! Several managers presented as one configuration.
//!
//! Reads are first-match-wins in the order managers were added. Writes go
//! to the manager that already holds the path, else under the deepest
//! existing ancestor found in any manager, else to the default manager.
//!
//! The ancestor search and the write that follows are separate steps over
//! several trees; nothing makes them atomic, so concurrent writers must be
//! serialized by the caller.

use super::error::Error;
use super::manager::{SimpleYamlManager, YamlManager};
use super::node::{NodeKind, YamlNode};
use super::settings::Settings;
use fyaml::Value;
use std::path::PathBuf;

/// Ordered set of managers read and written as one tree.
///
/// The first manager added has the highest precedence and is the default
/// target for writes until [`YamlCombiner::set_default_manager`] changes it.
pub struct YamlCombiner {
    settings: Settings,
    managers: Vec<Box<dyn YamlManager>>,
    default: usize,
}

impl YamlCombiner {
    /// Empty combiner; `settings` are used for managers it creates itself.
    pub fn new(settings: Settings) -> Result<Self, Error> {
        settings.validate()?;
        Ok(Self {
            settings,
            managers: Vec::new(),
            default: 0,
        })
    }

    /// Combiner over `managers`, in precedence order.
    pub fn with_managers(
        settings: Settings,
        managers: Vec<Box<dyn YamlManager>>,
    ) -> Result<Self, Error> {
        let mut combiner = Self::new(settings)?;
        for manager in managers {
            combiner.add_manager(manager);
        }
        Ok(combiner)
    }

    /// Append a manager (lowest precedence so far). Returns its index.
    pub fn add_manager(&mut self, manager: Box<dyn YamlManager>) -> usize {
        self.managers.push(manager);
        self.managers.len() - 1
    }

    /// Managers in precedence order.
    pub fn managers(&self) -> &[Box<dyn YamlManager>] {
        &self.managers
    }

    /// Manager at `index`, `None` past the end.
    pub fn manager(&self, index: usize) -> Option<&dyn YamlManager> {
        self.managers.get(index).map(|m| m.as_ref())
    }

    /// Mutable access to the manager at `index`.
    pub fn manager_mut(&mut self, index: usize) -> Option<&mut (dyn YamlManager + 'static)> {
        self.managers.get_mut(index).map(|m| m.as_mut())
    }

    /// Index of the manager receiving unclaimed writes.
    pub fn default_index(&self) -> usize {
        self.default
    }

    /// Manager receiving unclaimed writes, `None` while the combiner is
    /// empty.
    pub fn default_manager(&self) -> Option<&dyn YamlManager> {
        self.manager(self.default)
    }

    /// Designate the manager receiving writes no other manager claims.
    ///
    /// # Errors
    ///
    /// The index must name a managed manager.
    pub fn set_default_manager(&mut self, index: usize) -> Result<(), Error> {
        if index >= self.managers.len() {
            return Err(Error::Config(format!(
                "default manager {} is not one of the {} combined managers",
                index,
                self.managers.len()
            )));
        }
        self.default = index;
        Ok(())
    }

    /// Load a file with the combiner's settings and add it on success.
    pub fn load_file(&mut self, path: impl Into<PathBuf>) -> bool {
        let manager = SimpleYamlManager::from_file(path, self.settings.clone());
        self.add_loaded(manager)
    }

    /// Load a resource with the combiner's settings and add it on success.
    pub fn load_resource(&mut self, name: &str) -> bool {
        let manager = SimpleYamlManager::from_resource(name, self.settings.clone());
        self.add_loaded(manager)
    }

    fn add_loaded(&mut self, manager: Result<SimpleYamlManager, Error>) -> bool {
        match manager {
            Ok(mut manager) => {
                if !manager.load() {
                    return false;
                }
                self.add_manager(Box::new(manager));
                true
            }
            Err(e) => {
                log::error!(target: self.settings.log_target.as_str(), "{}", e);
                false
            }
        }
    }

    /// Index of the first manager holding `path`.
    pub fn locate(&self, path: &str) -> Option<usize> {
        self.managers.iter().position(|m| m.exist(path))
    }

    fn ensure_default(&mut self) -> usize {
        if self.managers.is_empty() {
            log::debug!(target: self.settings.log_target.as_str(), "creating in-memory default manager");
            self.managers
                .push(Box::new(SimpleYamlManager::in_memory(self.settings.clone())));
            self.default = 0;
        }
        self.default
    }

    /// Deepest existing proper ancestor of `segments` across all managers
    /// that can take a named child, with the number of segments it covers.
    ///
    /// Lists and non-null scalars are passed over.
    fn deepest_ancestor(&self, segments: &[String]) -> Option<(usize, usize, YamlNode)> {
        for depth in (1..segments.len()).rev() {
            for (index, manager) in self.managers.iter().enumerate() {
                let found = manager.root_node().get_node_segments(&segments[..depth], false);
                if let Ok(Some(node)) = found {
                    if accepts_named_child(&node) {
                        return Some((index, depth, node));
                    }
                }
            }
        }
        None
    }
}

fn accepts_named_child(node: &YamlNode) -> bool {
    match node.kind() {
        NodeKind::Map => true,
        NodeKind::Scalar => node.is_null(),
        NodeKind::List => false,
    }
}

impl YamlManager for YamlCombiner {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Reload every manager; true when all of them loaded.
    fn load(&mut self) -> bool {
        let mut ok = true;
        for manager in self.managers.iter_mut() {
            ok &= manager.load();
        }
        ok
    }

    /// Save every manager; true when all of them saved.
    fn save(&self) -> bool {
        let mut ok = true;
        for manager in &self.managers {
            ok &= manager.save();
        }
        ok
    }

    fn root_node(&self) -> YamlNode {
        match self.default_manager() {
            Some(manager) => manager.root_node(),
            None => YamlNode::with_options(Value::Null, self.settings.path_options()),
        }
    }

    /// Replace the default manager's root and drop every other manager.
    fn set_root_node(&mut self, node: YamlNode) {
        let index = self.ensure_default();
        let mut kept = self.managers.swap_remove(index);
        self.managers.clear();
        kept.set_root_node(node);
        self.managers.push(kept);
        self.default = 0;
    }

    fn exist(&self, path: &str) -> bool {
        self.locate(path).is_some()
    }

    fn get_node(&self, path: &str) -> Option<YamlNode> {
        let index = self.locate(path)?;
        self.managers[index].get_node(path)
    }

    fn set_node(&mut self, path: &str, value: Value) -> Result<YamlNode, Error> {
        if let Some(index) = self.locate(path) {
            log::debug!(target: self.settings.log_target.as_str(), "'{}' set in manager {}", path, index);
            return self.managers[index].set_node(path, value);
        }

        let segments = self.settings.path_options().split(path);
        if let Some((index, depth, ancestor)) = self.deepest_ancestor(&segments) {
            log::debug!(
                target: self.settings.log_target.as_str(),
                "'{}' created under '{}' in manager {}",
                path,
                self.settings.path_options().join(&segments[..depth]),
                index
            );
            let node = ancestor
                .get_node_segments(&segments[depth..], true)?
                .ok_or_else(|| Error::structure(path, "node could not be created."))?;
            node.set_value(value);
            return Ok(node);
        }

        let index = self.ensure_default();
        log::debug!(target: self.settings.log_target.as_str(), "'{}' created in default manager {}", path, index);
        self.managers[index].set_node(path, value)
    }

    fn add_nodes(&mut self, other: &dyn YamlManager) -> Result<(), Error> {
        let index = self.ensure_default();
        self.managers[index].add_nodes(other)
    }

    fn add_nodes_value(&mut self, nodes: Value) -> Result<(), Error> {
        let index = self.ensure_default();
        self.managers[index].add_nodes_value(nodes)
    }

    fn final_node_count(&self) -> usize {
        self.managers.iter().map(|m| m.final_node_count()).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::manager::YamlManagerExt;
    use std::cell::Cell;
    use std::io::Cursor;
    use std::rc::Rc;

    /// Manager wrapper counting existence checks.
    struct Probe {
        inner: SimpleYamlManager,
        exist_calls: Rc<Cell<usize>>,
    }

    impl YamlManager for Probe {
        fn settings(&self) -> &Settings {
            self.inner.settings()
        }
        fn load(&mut self) -> bool {
            self.inner.load()
        }
        fn save(&self) -> bool {
            self.inner.save()
        }
        fn root_node(&self) -> YamlNode {
            self.inner.root_node()
        }
        fn set_root_node(&mut self, node: YamlNode) {
            self.inner.set_root_node(node)
        }
        fn exist(&self, path: &str) -> bool {
            self.exist_calls.set(self.exist_calls.get() + 1);
            self.inner.exist(path)
        }
    }

    fn loaded(text: &str) -> SimpleYamlManager {
        let mut manager =
            SimpleYamlManager::from_reader(Cursor::new(text.to_string()), Settings::default())
                .unwrap();
        assert!(manager.load());
        manager
    }

    fn counting_manager(text: &str) -> (Box<dyn YamlManager>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let manager = Probe {
            inner: loaded(text),
            exist_calls: calls.clone(),
        };
        (Box::new(manager), calls)
    }

    fn combiner(texts: &[&str]) -> YamlCombiner {
        let managers = texts
            .iter()
            .map(|t| Box::new(loaded(t)) as Box<dyn YamlManager>)
            .collect();
        YamlCombiner::with_managers(Settings::default(), managers).unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let c = combiner(&["a: 1\n", "a: 2\nb: 3\n"]);
        assert_eq!(c.get_int("a", 0), 1);
        assert_eq!(c.get_int("b", 0), 3);
        assert_eq!(c.get_int("c", 7), 7);
        assert!(c.exist("b"));
        assert!(!c.exist("c"));
        assert!(c.get_node("c").is_none());
        assert_eq!(c.locate("b"), Some(1));
    }

    #[test]
    fn test_reads_stop_at_first_owner() {
        let (m1, calls1) = counting_manager("x: 1\n");
        let (m2, calls2) = counting_manager("p: 42\n");
        let (m3, calls3) = counting_manager("p: 99\n");
        let c = YamlCombiner::with_managers(Settings::default(), vec![m1, m2, m3]).unwrap();
        assert_eq!(c.get_int("p", 0), 42);
        assert_eq!(calls1.get(), 1);
        assert_eq!(calls2.get(), 1);
        assert_eq!(calls3.get(), 0);
    }

    #[test]
    fn test_write_to_existing_owner() {
        let mut c = combiner(&["a: 1\n", "b: 2\n"]);
        c.set_node("b", Value::String("changed".into())).unwrap();
        assert_eq!(c.manager(1).unwrap().get_string("b", ""), "changed");
        assert!(!c.manager(0).unwrap().exist("b"));
    }

    #[test]
    fn test_write_extends_deepest_ancestor() {
        let mut c = combiner(&["x:\n  y:\n    w: 0\n", "other: 1\n"]);
        c.set_default_manager(1).unwrap();
        c.set_node("x.y.z", Value::String("v".into())).unwrap();
        assert_eq!(c.manager(0).unwrap().get_string("x.y.z", ""), "v");
        assert!(!c.manager(1).unwrap().exist("x"));
    }

    #[test]
    fn test_write_prefers_deeper_ancestor_in_later_manager() {
        let mut c = combiner(&["x: {}\n", "x:\n  y: {}\n"]);
        c.set_node("x.y.z", Value::Bool(true)).unwrap();
        assert!(c.manager(1).unwrap().exist("x.y.z"));
        assert!(!c.manager(0).unwrap().exist("x.y"));
    }

    #[test]
    fn test_write_creates_multi_level_suffix_under_ancestor() {
        let mut c = combiner(&["root:\n  keep: 1\n", "unrelated: 2\n"]);
        c.set_default_manager(1).unwrap();
        let node = c
            .set_node("root.a.b.c", Value::String("deep".into()))
            .unwrap();
        assert_eq!(node.path(), "root.a.b.c");
        let first = c.manager(0).unwrap();
        assert!(first.exist("root.a"));
        assert!(first.exist("root.a.b"));
        assert_eq!(first.get_string("root.a.b.c", ""), "deep");
        assert_eq!(first.get_int("root.keep", 0), 1);
    }

    #[test]
    fn test_write_skips_ancestor_that_cannot_hold_children() {
        let mut c = combiner(&["x: 5\n", "x: {a: 1}\n"]);
        c.set_node("x.b", Value::String("v".into())).unwrap();
        assert_eq!(c.get_string("x.b", ""), "v");
        assert_eq!(c.manager(1).unwrap().get_string("x.b", ""), "v");
        assert_eq!(c.manager(0).unwrap().get_int("x", 0), 5);

        let mut c = combiner(&["l: [1, 2]\n", "l: {}\n"]);
        c.set_node("l.k", Value::Bool(true)).unwrap();
        assert!(c.manager(1).unwrap().exist("l.k"));
    }

    #[test]
    fn test_write_under_null_ancestor() {
        let mut c = combiner(&["a: 1\n", "n:\n"]);
        c.set_node("n.m", Value::String("v".into())).unwrap();
        assert_eq!(c.manager(1).unwrap().get_string("n.m", ""), "v");
    }

    #[test]
    fn test_write_through_scalar_everywhere_fails() {
        let mut c = combiner(&["x: 5\n", "y: 1\n"]);
        let err = c.set_node("x.b", Value::Bool(true)).unwrap_err();
        assert!(matches!(err, Error::Structure { .. }));
        assert_eq!(c.get_int("x", 0), 5);
    }

    #[test]
    fn test_write_without_ancestor_goes_to_default() {
        let mut c = combiner(&["a: 1\n", "b: 2\n"]);
        c.set_default_manager(1).unwrap();
        c.set_node("n.m", Value::Bool(true)).unwrap();
        assert!(c.manager(1).unwrap().exist("n.m"));
        assert!(!c.manager(0).unwrap().exist("n"));
    }

    #[test]
    fn test_write_on_empty_combiner_creates_default() {
        let mut c = YamlCombiner::new(Settings::default()).unwrap();
        assert!(c.default_manager().is_none());
        c.set_node("a.b", Value::String("1".into())).unwrap();
        assert_eq!(c.managers().len(), 1);
        assert_eq!(c.get_int("a.b", 0), 1);
    }

    #[test]
    fn test_default_manager_must_be_member() {
        let mut c = combiner(&["a: 1\n"]);
        assert_eq!(c.default_index(), 0);
        let err = c.set_default_manager(3).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(c.default_index(), 0);
    }

    #[test]
    fn test_set_root_node_collapses_to_default() {
        let mut c = combiner(&["a: 1\n", "b: 2\n", "c: 3\n"]);
        c.set_default_manager(1).unwrap();
        let root = YamlNode::new("z: 26\n".parse().unwrap());
        c.set_root_node(root.clone());
        assert_eq!(c.managers().len(), 1);
        assert_eq!(c.default_index(), 0);
        assert!(c.root_node().ptr_eq(&root));
        assert_eq!(c.get_int("z", 0), 26);
        assert!(!c.exist("a"));
        assert!(!c.exist("c"));
    }

    #[test]
    fn test_root_node_is_default_managers() {
        let mut c = combiner(&["a: 1\n", "b: 2\n"]);
        c.set_default_manager(1).unwrap();
        assert!(c.root_node().has_node("b"));
        assert!(!c.root_node().has_node("a"));
    }

    #[test]
    fn test_final_node_count_sums() {
        let c = combiner(&["a: 1\nb: [1, 2]\n", "c: {d: 1}\n"]);
        assert_eq!(c.final_node_count(), 4);
    }

    #[test]
    fn test_add_nodes_goes_to_default() {
        let mut c = combiner(&["a: 1\n", "b: 2\n"]);
        c.set_default_manager(1).unwrap();
        let extra = loaded("e: 5\n");
        c.add_nodes(&extra).unwrap();
        assert!(c.manager(1).unwrap().exist("e"));
        assert!(!c.manager(0).unwrap().exist("e"));
    }

    #[test]
    fn test_load_file_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.yaml");
        let second = dir.path().join("second.yaml");
        std::fs::write(&first, "a: 1\n").unwrap();
        std::fs::write(&second, "a: 2\nb: 2\n").unwrap();

        let mut c = YamlCombiner::new(Settings::default()).unwrap();
        assert!(c.load_file(&first));
        assert!(c.load_file(&second));
        assert!(!c.load_file(dir.path().join("missing.yaml")));
        assert_eq!(c.managers().len(), 2);
        assert_eq!(c.get_int("a", 0), 1);

        std::fs::write(&first, "z: 0\n").unwrap();
        assert!(c.load());
        assert_eq!(c.get_int("a", 0), 2);
    }

    #[test]
    fn test_save_all() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.yaml");
        let second = dir.path().join("second.yaml");
        std::fs::write(&first, "a: 1\n").unwrap();
        std::fs::write(&second, "b: 2\n").unwrap();
        let mut c = YamlCombiner::new(Settings::default()).unwrap();
        assert!(c.load_file(&first));
        assert!(c.load_file(&second));
        c.set_node("b", Value::String("three".into())).unwrap();
        assert!(c.save());
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "b: three\n");
        assert_eq!(std::fs::read_to_string(&first).unwrap(), "a: 1\n");
    }

    #[test]
    fn test_load_resource() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("defaults.yaml"), "level: info\n").unwrap();
        let settings = Settings::default().with_resource_dirs([dir.path()]);
        let mut c = YamlCombiner::new(settings).unwrap();
        assert!(c.load_resource("defaults.yaml"));
        assert!(!c.load_resource("absent.yaml"));
        assert_eq!(c.get_string("level", ""), "info");
    }

    #[test]
    fn test_combiner_settings_are_validated() {
        assert!(YamlCombiner::new(Settings::default().with_separator("")).is_err());
    }
}
