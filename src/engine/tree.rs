//! Flattened suite tree
//!
//! Contexts and scenarios are stored in one arena and addressed by index.
//! A context's children are its scenarios followed by its child contexts.

use std::collections::BTreeMap;
use std::path::PathBuf;

use regex::Regex;

use crate::spec::{Assertion, Hook, OnFailure, RunBlock, Scenario, SpecTree};

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Context,
    Group,
    Leaf,
    /// Scenario with neither a run block nor children
    Empty,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub path: String,
    pub name: String,
    /// Directory of the declaring context file
    pub dir: PathBuf,
    pub env: BTreeMap<String, String>,
    pub on_failure: Option<OnFailure>,
    pub before: Option<Hook>,
    pub after: Option<Hook>,
    pub before_each: Option<Hook>,
    pub after_each: Option<Hook>,
    pub run: Option<RunBlock>,
    pub assertions: Vec<Assertion>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Context | NodeKind::Group)
    }

    /// Leaves and empty scenarios are what the run counts
    pub fn is_counted(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf | NodeKind::Empty)
    }
}

#[derive(Debug, Clone)]
pub struct SuiteTree {
    nodes: Vec<Node>,
}

impl SuiteTree {
    pub const ROOT: NodeId = 0;

    pub fn build(spec: &SpecTree) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.add_context(spec, None);
        tree
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nearest declared policy walking up from `id`, `continue` if none
    pub fn effective_policy(&self, id: NodeId) -> OnFailure {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id];
            if let Some(policy) = node.on_failure {
                return policy;
            }
            current = node.parent;
        }
        OnFailure::Continue
    }

    /// Which nodes take part in a filtered run
    ///
    /// A counted node is selected when its path or name contains `filter`
    /// or the filter, read as a regular expression, matches its path. A
    /// container is selected when any descendant is.
    pub fn select(&self, filter: Option<&str>) -> Vec<bool> {
        let Some(filter) = filter.filter(|f| !f.is_empty()) else {
            return vec![true; self.nodes.len()];
        };
        let pattern = Regex::new(filter).ok();
        let mut selected = vec![false; self.nodes.len()];
        // children always have larger ids than their parent
        for id in (0..self.nodes.len()).rev() {
            let node = &self.nodes[id];
            selected[id] = if node.is_counted() {
                node.path.contains(filter)
                    || node.name.contains(filter)
                    || pattern.as_ref().is_some_and(|p| p.is_match(&node.path))
            } else {
                node.children.iter().any(|&child| selected[child])
            };
        }
        selected
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len();
        if let Some(parent) = node.parent {
            self.nodes[parent].children.push(id);
        }
        self.nodes.push(node);
        id
    }

    fn add_context(&mut self, spec: &SpecTree, parent: Option<NodeId>) {
        let context = &spec.context;
        let name = if !context.name.is_empty() {
            context.name.clone()
        } else {
            spec.dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| spec.path.clone())
        };
        let id = self.push(Node {
            kind: NodeKind::Context,
            path: spec.path.clone(),
            name,
            dir: spec.dir.clone(),
            env: context.env.clone(),
            on_failure: OnFailure::parse(&context.on_failure),
            before: context.before.clone(),
            after: context.after.clone(),
            before_each: context.before_each.clone(),
            after_each: context.after_each.clone(),
            run: None,
            assertions: Vec::new(),
            parent,
            children: Vec::new(),
        });

        for scenario in &context.scenarios {
            self.add_scenario(scenario, id);
        }
        for child in &spec.children {
            self.add_context(child, Some(id));
        }
    }

    fn add_scenario(&mut self, scenario: &Scenario, parent: NodeId) {
        let parent_node = &self.nodes[parent];
        let path = join_path(&parent_node.path, &scenario.id);
        let dir = parent_node.dir.clone();
        let kind = if scenario.is_group() {
            NodeKind::Group
        } else if scenario.run.is_some() {
            NodeKind::Leaf
        } else {
            NodeKind::Empty
        };
        let id = self.push(Node {
            kind,
            path,
            name: scenario.display_name().to_string(),
            dir,
            env: scenario.env.clone(),
            on_failure: OnFailure::parse(&scenario.on_failure),
            before: scenario.before.clone(),
            after: scenario.after.clone(),
            before_each: scenario.before_each.clone(),
            after_each: scenario.after_each.clone(),
            run: scenario.run.clone(),
            assertions: scenario.assertions.clone(),
            parent: Some(parent),
            children: Vec::new(),
        });
        for child in &scenario.scenarios {
            self.add_scenario(child, id);
        }
    }
}

/// Join two address segments with `/`, dropping an empty parent
pub fn join_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}/{segment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::parse_context;

    fn spec_tree(root_yaml: &str, children: Vec<(&str, &str)>) -> SpecTree {
        SpecTree {
            dir: PathBuf::from("/suite"),
            path: String::new(),
            context: parse_context(root_yaml.as_bytes()).unwrap(),
            children: children
                .into_iter()
                .map(|(name, yaml)| SpecTree {
                    dir: PathBuf::from("/suite").join(name),
                    path: name.to_string(),
                    context: parse_context(yaml.as_bytes()).unwrap(),
                    children: Vec::new(),
                })
                .collect(),
        }
    }

    const ROOT: &str = r#"
name: Root
on_failure: skip_children
scenarios:
  - id: login
    run:
      command: "true"
  - id: api
    on_failure: abort_run
    scenarios:
      - id: health
        run:
          command: "true"
      - id: pending
"#;

    #[test]
    fn test_layout_and_paths() {
        let tree = SuiteTree::build(&spec_tree(ROOT, vec![("child", "name: Child\n")]));
        let root = tree.node(SuiteTree::ROOT);
        assert_eq!(root.kind, NodeKind::Context);
        assert_eq!(root.path, "");

        let paths: Vec<&str> = root.children.iter().map(|&id| tree.node(id).path.as_str()).collect();
        assert_eq!(paths, vec!["login", "api", "child"]);

        let api = tree.node(root.children[1]);
        assert_eq!(api.kind, NodeKind::Group);
        let nested: Vec<(&str, NodeKind)> = api
            .children
            .iter()
            .map(|&id| (tree.node(id).path.as_str(), tree.node(id).kind))
            .collect();
        assert_eq!(
            nested,
            vec![("api/health", NodeKind::Leaf), ("api/pending", NodeKind::Empty)]
        );
    }

    #[test]
    fn test_effective_policy_walks_up() {
        let tree = SuiteTree::build(&spec_tree(ROOT, vec![("child", "name: Child\n")]));
        let root = tree.node(SuiteTree::ROOT);
        let login = root.children[0];
        let api = root.children[1];
        let health = tree.node(api).children[0];
        let child = root.children[2];

        assert_eq!(tree.effective_policy(login), OnFailure::SkipChildren);
        assert_eq!(tree.effective_policy(health), OnFailure::AbortRun);
        assert_eq!(tree.effective_policy(child), OnFailure::SkipChildren);
    }

    #[test]
    fn test_default_policy_is_continue() {
        let tree = SuiteTree::build(&spec_tree("scenarios:\n  - id: a\n    run:\n      command: x\n", vec![]));
        assert_eq!(tree.effective_policy(1), OnFailure::Continue);
    }

    #[test]
    fn test_select_without_filter_selects_all() {
        let tree = SuiteTree::build(&spec_tree(ROOT, vec![]));
        assert!(tree.select(None).iter().all(|&s| s));
        assert!(tree.select(Some("")).iter().all(|&s| s));
    }

    #[test]
    fn test_select_marks_ancestors() {
        let tree = SuiteTree::build(&spec_tree(ROOT, vec![("child", "name: Child\n")]));
        let selected = tree.select(Some("health"));
        let root = tree.node(SuiteTree::ROOT);
        let api = root.children[1];

        assert!(selected[SuiteTree::ROOT]);
        assert!(!selected[root.children[0]]);
        assert!(selected[api]);
        assert!(selected[tree.node(api).children[0]]);
        assert!(!selected[tree.node(api).children[1]]);
        assert!(!selected[root.children[2]]);
    }

    #[test]
    fn test_select_by_regex() {
        let tree = SuiteTree::build(&spec_tree(ROOT, vec![]));
        let selected = tree.select(Some("^api/h.*"));
        let api = tree.node(SuiteTree::ROOT).children[1];
        assert!(selected[tree.node(api).children[0]]);
        assert!(!selected[tree.node(SuiteTree::ROOT).children[0]]);
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a", "b"), "a/b");
    }
}
