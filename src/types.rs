//! Core types shared across the extraction, assembly and layout stages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Prefix added to the display text of completed tasks.
pub const COMPLETED_GLYPH: &str = "✅ ";

/// Where a task was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Document path, relative to the collection root, `/` separated.
    pub file: String,
    /// 1-based line number.
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Identifier used when a task carries no explicit id marker.
    pub fn derived_id(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// A checklist task, rebuilt from scratch on every scan.
///
/// Relations are stored as ids and resolved at assembly time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub parent: Option<String>,
    /// Child ids in source order.
    #[serde(default)]
    pub children: Vec<String>,
    pub depth: usize,
    /// Ids this task is blocked by. May reference ids absent from the scan.
    #[serde(default)]
    pub blockers: BTreeSet<String>,
    /// Lowercase tags including the leading `#`.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub scheduled: Option<NaiveDate>,
    pub start: Option<NaiveDate>,
    pub location: SourceLocation,
    /// Secondary identifier (`^block`) used for reverse-link matching.
    pub block_id: Option<String>,
    /// Block ids this task links to.
    #[serde(default)]
    pub outlinks: BTreeSet<String>,
}

impl Task {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_blocked(&self) -> bool {
        !self.blockers.is_empty()
    }

    /// The date used for horizontal banding: `start` wins over `scheduled`.
    pub fn anchor_date(&self) -> Option<NaiveDate> {
        self.start.or(self.scheduled)
    }
}

/// Kind of a rendered edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Parent to child.
    Hierarchy,
    /// Blocker to blocked.
    Dependency,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Hierarchy => "hierarchy",
            LinkKind::Dependency => "dependency",
        }
    }
}

/// A directed edge in the render-ready graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: LinkKind,
}

impl TaskLink {
    pub fn hierarchy(parent: &str, child: &str) -> Self {
        Self {
            source: parent.to_string(),
            target: child.to_string(),
            kind: LinkKind::Hierarchy,
        }
    }

    pub fn dependency(blocker: &str, blocked: &str) -> Self {
        Self {
            source: blocker.to_string(),
            target: blocked.to_string(),
            kind: LinkKind::Dependency,
        }
    }
}

/// A task projected for rendering.
///
/// Positions live in the layout engine; this carries what the renderer and
/// the forces need to know about the task itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: String,
    /// Display text, prefixed with [`COMPLETED_GLYPH`] when completed.
    pub text: String,
    pub completed: bool,
    pub blocked: bool,
    pub depth: usize,
    pub parent: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub anchor_date: Option<NaiveDate>,
    pub location: SourceLocation,
}

impl TaskNode {
    pub fn from_task(task: &Task) -> Self {
        let text = if task.completed {
            format!("{}{}", COMPLETED_GLYPH, task.text)
        } else {
            task.text.clone()
        };
        Self {
            id: task.id.clone(),
            text,
            completed: task.completed,
            blocked: task.is_blocked(),
            depth: task.depth,
            parent: task.parent.clone(),
            tags: task.tags.clone(),
            anchor_date: task.anchor_date(),
            location: task.location.clone(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.depth == 0
    }
}
