//! Visibility policy: completed/blocked toggles plus a tag filter.

use super::{TaskGraph, ViewConfig, project};
use crate::scan::TaskCollection;
use crate::types::Task;
use std::collections::HashSet;

/// Whether `task` passes the completed and blocked toggles.
pub fn passes_state(task: &Task, config: &ViewConfig) -> bool {
    (config.show_completed || !task.completed) && (config.show_blocked || !task.is_blocked())
}

/// Whether `task` passes the tag filter.
///
/// With no filter active everything passes. Otherwise a task needs one of the
/// selected tags, or no tags at all while "without tags" is on.
pub fn passes_tags(task: &Task, config: &ViewConfig) -> bool {
    if !config.tag_filter_active() {
        return true;
    }
    if task.tags.is_empty() {
        return config.show_without_tags;
    }
    task.tags.iter().any(|t| config.selected_tags.contains(t))
}

pub fn is_visible(task: &Task, config: &ViewConfig) -> bool {
    passes_state(task, config) && passes_tags(task, config)
}

/// Assemble every visible task and the edges among them.
///
/// A visible child whose parent is filtered out is still shown, as a node
/// without its hierarchy edge.
pub fn assemble_visible(collection: &TaskCollection, config: &ViewConfig) -> TaskGraph {
    let visible: HashSet<&str> = collection
        .iter()
        .filter(|t| is_visible(t, config))
        .map(|t| t.id.as_str())
        .collect();
    project(collection, &visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LinkKind;
    use std::collections::BTreeSet;

    const DOC: &str = "\
- [ ] Launch #work 🆔 launch ⛔ build
  - [x] Draft copy #work
  - [ ] Ping legal ⛔ ghost
- [ ] Build site #work 🆔 build
- [ ] Water plants #home
- [ ] Untagged chore
";

    fn collection() -> TaskCollection {
        TaskCollection::from_document("doc.md", DOC)
    }

    fn ids(graph: &TaskGraph) -> Vec<&str> {
        graph.node_ids().collect()
    }

    #[test]
    fn test_defaults_hide_completed_only() {
        let graph = assemble_visible(&collection(), &ViewConfig::default());
        assert_eq!(
            ids(&graph),
            vec!["launch", "doc.md:3", "build", "doc.md:5", "doc.md:6"]
        );
        assert!(graph.is_consistent());
    }

    #[test]
    fn test_completed_node_text_has_glyph() {
        let config = ViewConfig {
            show_completed: true,
            ..ViewConfig::default()
        };
        let graph = assemble_visible(&collection(), &config);
        assert_eq!(graph.node("doc.md:2").unwrap().text, "✅ Draft copy");
    }

    #[test]
    fn test_hiding_blocked_drops_their_edges() {
        let config = ViewConfig {
            show_blocked: false,
            ..ViewConfig::default()
        };
        let graph = assemble_visible(&collection(), &config);
        assert_eq!(ids(&graph), vec!["build", "doc.md:5", "doc.md:6"]);
        assert!(graph.links.is_empty());
    }

    #[test]
    fn test_edges_hierarchy_and_dependency() {
        let graph = assemble_visible(&collection(), &ViewConfig::default());
        let hierarchy: Vec<(&str, &str)> = graph
            .links
            .iter()
            .filter(|l| l.kind == LinkKind::Hierarchy)
            .map(|l| (l.source.as_str(), l.target.as_str()))
            .collect();
        let deps: Vec<(&str, &str)> = graph
            .links
            .iter()
            .filter(|l| l.kind == LinkKind::Dependency)
            .map(|l| (l.source.as_str(), l.target.as_str()))
            .collect();
        // Completed child is hidden, so only one hierarchy edge survives.
        assert_eq!(hierarchy, vec![("launch", "doc.md:3")]);
        // Blocker points at blocked; the ghost blocker yields nothing.
        assert_eq!(deps, vec![("build", "launch")]);
    }

    #[test]
    fn test_tag_filter_with_and_without_untagged() {
        let only_home = ViewConfig {
            selected_tags: BTreeSet::from(["#home".to_string()]),
            ..ViewConfig::default()
        };
        let graph = assemble_visible(&collection(), &only_home);
        assert_eq!(ids(&graph), vec!["doc.md:5"]);

        let with_untagged = ViewConfig {
            show_without_tags: true,
            ..only_home.clone()
        };
        let graph = assemble_visible(&collection(), &with_untagged);
        assert_eq!(ids(&graph), vec!["doc.md:3", "doc.md:5", "doc.md:6"]);

        let untagged_only = ViewConfig {
            show_without_tags: true,
            ..ViewConfig::default()
        };
        let graph = assemble_visible(&collection(), &untagged_only);
        assert_eq!(ids(&graph), vec!["doc.md:3", "doc.md:6"]);
    }

    #[test]
    fn test_orphaned_child_keeps_node_loses_edge() {
        let config = ViewConfig {
            show_without_tags: true,
            ..ViewConfig::default()
        };
        let graph = assemble_visible(&collection(), &config);
        assert!(graph.node("doc.md:3").is_some());
        assert!(graph.node("launch").is_none());
        assert!(graph.links.iter().all(|l| l.target != "doc.md:3"));
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let c = collection();
        let config = ViewConfig {
            show_completed: true,
            ..ViewConfig::default()
        };
        let first = assemble_visible(&c, &config);
        let second = assemble_visible(&c, &config);
        assert_eq!(first, second);
    }
}
