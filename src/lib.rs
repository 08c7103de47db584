//! Hierarchical YAML configuration trees.
//!
//! Documents are loaded into a lazily resolved tree of [`yaml::YamlNode`]s,
//! addressed by separator-delimited paths and read through typed getters
//! that fall back to defaults. Several documents can be layered with a
//! [`yaml::YamlCombiner`].

pub mod yaml;
