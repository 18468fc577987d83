//! Spec tree loading
//!
//! A suite is a directory holding `context.yaml`. Every subdirectory that
//! holds its own `context.yaml` becomes a child context.

use std::path::{Path, PathBuf};

use crate::common::paths::CONTEXT_FILE;
use crate::common::{Error, Result};

use super::model::{parse_context, Context};
use super::validate::{validate, ValidationError};

/// A loaded context and its child contexts
#[derive(Debug, Clone)]
pub struct SpecTree {
    /// Directory holding the context file
    pub dir: PathBuf,
    /// Address relative to the suite root ("" for the root)
    pub path: String,
    pub context: Context,
    pub children: Vec<SpecTree>,
}

impl SpecTree {
    /// Path of this node's context file
    pub fn file(&self) -> PathBuf {
        self.dir.join(CONTEXT_FILE)
    }

    /// Validate every context file in the tree, depth-first
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = validate(&self.context, &self.file().display().to_string());
        for child in &self.children {
            errors.extend(child.validate());
        }
        errors
    }
}

/// A loaded suite with every validation problem it contains
#[derive(Debug)]
pub struct LoadedSuite {
    pub tree: SpecTree,
    pub errors: Vec<ValidationError>,
}

impl LoadedSuite {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Read and parse a single context file from a directory
pub fn load_context(dir: &Path) -> Result<Context> {
    let file = dir.join(CONTEXT_FILE);
    let data = std::fs::read(&file).map_err(|e| Error::spec_read(&file, &e))?;
    parse_context(&data).map_err(|e| Error::spec_parse(&file, e))
}

/// Load a context directory and all nested context directories
pub fn load_spec_tree(root: &Path) -> Result<SpecTree> {
    load_node(root, String::new())
}

fn load_node(dir: &Path, path: String) -> Result<SpecTree> {
    let context = load_context(dir)?;

    let mut subdirs: Vec<(String, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let child_dir = entry.path();
        if !child_dir.join(CONTEXT_FILE).is_file() {
            continue;
        }
        subdirs.push((entry.file_name().to_string_lossy().into_owned(), child_dir));
    }
    // read_dir order is platform-dependent
    subdirs.sort();

    let mut children = Vec::with_capacity(subdirs.len());
    for (name, child_dir) in subdirs {
        let child_path = if path.is_empty() {
            name
        } else {
            format!("{path}/{name}")
        };
        children.push(load_node(&child_dir, child_path)?);
    }

    tracing::debug!(dir = %dir.display(), children = children.len(), "Loaded context");

    Ok(SpecTree {
        dir: dir.to_path_buf(),
        path,
        context,
        children,
    })
}

/// Load a suite and validate it
///
/// Parse errors are fatal. Validation problems are collected so the caller
/// can report all of them before refusing to run.
pub fn load_suite(root: &Path) -> Result<LoadedSuite> {
    let tree = load_spec_tree(root)?;
    let errors = tree.validate();
    Ok(LoadedSuite { tree, errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_context(dir: &Path, yaml: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(CONTEXT_FILE), yaml).unwrap();
    }

    #[test]
    fn test_load_context() {
        let temp = tempfile::tempdir().unwrap();
        write_context(temp.path(), "name: \"Test Context\"\n");

        let ctx = load_context(temp.path()).unwrap();
        assert_eq!(ctx.name, "Test Context");
    }

    #[test]
    fn test_load_tree_tracks_paths_in_lexical_order() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write_context(root, "name: Root\n");
        write_context(&root.join("zeta"), "name: Zeta\n");
        write_context(&root.join("alpha"), "name: Alpha\n");
        write_context(&root.join("alpha/nested"), "name: Nested\n");
        // No context file: ignored
        fs::create_dir_all(root.join("fixtures")).unwrap();
        fs::write(root.join("notes.txt"), "not a dir").unwrap();

        let tree = load_spec_tree(root).unwrap();
        assert_eq!(tree.context.name, "Root");
        assert_eq!(tree.path, "");
        let names: Vec<&str> = tree.children.iter().map(|c| c.context.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
        assert_eq!(tree.children[0].path, "alpha");
        assert_eq!(tree.children[0].children[0].path, "alpha/nested");
        assert_eq!(tree.children[0].dir, root.join("alpha"));
    }

    #[test]
    fn test_missing_root_context_is_read_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = load_spec_tree(temp.path()).unwrap_err();
        assert!(matches!(err, Error::SpecRead { .. }));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let temp = tempfile::tempdir().unwrap();
        write_context(temp.path(), "name: Root\n");
        write_context(&temp.path().join("broken"), "scenarios: [\n");

        let err = load_spec_tree(temp.path()).unwrap_err();
        match err {
            Error::SpecParse { path, .. } => assert!(path.contains("broken")),
            other => panic!("Expected SpecParse, got {other:?}"),
        }
    }

    #[test]
    fn test_load_suite_collects_errors_from_every_file() {
        let temp = tempfile::tempdir().unwrap();
        write_context(temp.path(), "on_failure: sometimes\n");
        write_context(
            &temp.path().join("child"),
            "scenarios:\n  - name: no id\n    run: { command: echo }\n",
        );

        let suite = load_suite(temp.path()).unwrap();
        assert!(!suite.is_valid());
        assert_eq!(suite.errors.len(), 2);
        assert_eq!(suite.errors[0].path, "on_failure");
        assert_eq!(suite.errors[1].path, "scenarios[0].id");
        assert!(suite.errors[1].file.contains("child"));
    }
}
