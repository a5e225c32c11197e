//! Task graph assembly.
//!
//! Turns a [`TaskCollection`] into the render-ready node and edge lists under
//! one of two selectable policies. Assembly is a pure function of the
//! collection and an immutable [`ViewConfig`]; toggling a filter means building
//! a new config and assembling again.

pub mod filter;
pub mod reachability;

use crate::scan::TaskCollection;
use crate::types::{TaskLink, TaskNode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// Which tasks make it into the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Toggle and tag based visibility.
    #[default]
    Visibility,
    /// Pinned tasks and their direct referrers.
    Reachability,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Visibility => "visibility",
            Policy::Reachability => "reachability",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "visibility" | "a" => Ok(Policy::Visibility),
            "reachability" | "pinned" | "b" => Ok(Policy::Reachability),
            other => Err(format!(
                "unknown policy '{}', expected visibility or reachability",
                other
            )),
        }
    }
}

/// Immutable snapshot of every user-facing view toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub show_completed: bool,
    pub show_blocked: bool,
    /// Re-scan when documents change on disk.
    pub live_update: bool,
    /// Bias nodes into date bands.
    pub use_dates: bool,
    /// Cap on tasks collected per scan; 0 means unlimited.
    pub task_limit: usize,
    /// Active tag filter. Empty means no tag filter.
    pub selected_tags: BTreeSet<String>,
    pub show_without_tags: bool,
    /// Tag marking tasks as pinned for the reachability policy.
    pub pinned_tag: String,
    pub policy: Policy,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            show_completed: false,
            show_blocked: true,
            live_update: true,
            use_dates: false,
            task_limit: 500,
            selected_tags: BTreeSet::new(),
            show_without_tags: false,
            pinned_tag: "#pinned".to_string(),
            policy: Policy::Visibility,
        }
    }
}

impl ViewConfig {
    /// Copy with the tag filter cleared ("clear all").
    pub fn with_tags_cleared(&self) -> Self {
        Self {
            selected_tags: BTreeSet::new(),
            show_without_tags: false,
            ..self.clone()
        }
    }

    /// Copy with `tag` toggled in the selection. Tags are matched lowercase.
    pub fn with_tag_toggled(&self, tag: &str) -> Self {
        let tag = tag.to_lowercase();
        let mut next = self.clone();
        if !next.selected_tags.remove(&tag) {
            next.selected_tags.insert(tag);
        }
        next
    }

    /// Whether any tag-based narrowing is in effect.
    pub fn tag_filter_active(&self) -> bool {
        !self.selected_tags.is_empty() || self.show_without_tags
    }

    /// Whether a change from `self` to `other` needs a re-scan rather than
    /// a re-assembly.
    pub fn needs_rescan(&self, other: &ViewConfig) -> bool {
        self.task_limit != other.task_limit
    }
}

/// Render-ready graph: nodes in discovery order and edges between them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskGraph {
    pub nodes: Vec<TaskNode>,
    pub links: Vec<TaskLink>,
}

impl TaskGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&TaskNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    /// Every edge endpoint is a node of this graph.
    pub fn is_consistent(&self) -> bool {
        let ids: HashSet<&str> = self.node_ids().collect();
        self.links
            .iter()
            .all(|l| ids.contains(l.source.as_str()) && ids.contains(l.target.as_str()))
    }
}

/// Assemble the graph for `config`'s policy.
pub fn assemble(collection: &TaskCollection, config: &ViewConfig) -> TaskGraph {
    match config.policy {
        Policy::Visibility => filter::assemble_visible(collection, config),
        Policy::Reachability => reachability::assemble_reachable(collection, config),
    }
}

/// Emit nodes for `included` tasks in collection order, plus every hierarchy
/// and dependency edge whose endpoints are both included.
fn project(collection: &TaskCollection, included: &HashSet<&str>) -> TaskGraph {
    let mut graph = TaskGraph::default();

    for task in collection.iter().filter(|t| included.contains(t.id.as_str())) {
        graph.nodes.push(TaskNode::from_task(task));

        if let Some(parent) = task.parent.as_deref() {
            if included.contains(parent) {
                graph.links.push(TaskLink::hierarchy(parent, &task.id));
            }
        }
        // Blockers that resolve to nothing are dangling and never become edges.
        for blocker in &task.blockers {
            if blocker != &task.id && included.contains(blocker.as_str()) {
                graph.links.push(TaskLink::dependency(blocker, &task.id));
            }
        }
    }

    graph
}
