//! Rebuild the parent/child tree of one document from indentation.
//!
//! Lines are consumed top to bottom with a stack of currently open tasks.
//! Before a line is placed, every open entry indented at least as deep as the
//! line is closed, so equal indentation means sibling and deeper indentation
//! means child. Widths are raw character counts; tabs are not expanded.

use crate::extract::ExtractedTask;
use crate::types::{SourceLocation, Task};

/// One checklist line of a document, with its identity already decided.
#[derive(Debug, Clone)]
pub struct HierarchyEntry {
    pub id: String,
    pub indent: usize,
    pub location: SourceLocation,
    pub task: ExtractedTask,
}

/// Tasks of a single document in source order.
#[derive(Debug, Clone, Default)]
pub struct DocumentTree {
    pub tasks: Vec<Task>,
    /// Ids of top-level tasks in source order.
    pub roots: Vec<String>,
    /// Position in `tasks` of each task's parent.
    pub parent_index: Vec<Option<usize>>,
}

/// Build the tree for one document's entries, given in line order.
pub fn build_tree(entries: impl IntoIterator<Item = HierarchyEntry>) -> DocumentTree {
    let mut tree = DocumentTree::default();
    // (index into tree.tasks, indent)
    let mut open: Vec<(usize, usize)> = Vec::new();

    for entry in entries {
        while let Some(&(_, indent)) = open.last() {
            if indent < entry.indent {
                break;
            }
            open.pop();
        }

        let parent_idx = open.last().map(|&(idx, _)| idx);
        let (parent, depth) = match parent_idx {
            Some(idx) => (Some(tree.tasks[idx].id.clone()), tree.tasks[idx].depth + 1),
            None => (None, 0),
        };

        let ExtractedTask {
            completed,
            text,
            tags,
            id: _,
            blockers,
            scheduled,
            start,
            block_id,
            outlinks,
        } = entry.task;

        let task = Task {
            id: entry.id,
            text,
            completed,
            parent,
            children: Vec::new(),
            depth,
            blockers,
            tags,
            scheduled,
            start,
            location: entry.location,
            block_id,
            outlinks,
        };

        let idx = tree.tasks.len();
        match parent_idx {
            Some(p) => tree.tasks[p].children.push(task.id.clone()),
            None => tree.roots.push(task.id.clone()),
        }
        tree.tasks.push(task);
        tree.parent_index.push(parent_idx);
        open.push((idx, entry.indent));
    }

    tree
}
