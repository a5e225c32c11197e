//! Output formatting for scan results: markdown and JSON.

use crate::graph::TaskGraph;
use crate::scan::TaskCollection;
use crate::types::Task;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Output format for the `scan` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

/// Render a collection in the requested format.
pub fn format_collection(collection: &TaskCollection, format: OutputFormat) -> String {
    match format {
        OutputFormat::Markdown => format_collection_markdown(collection),
        OutputFormat::Json => {
            // Serializing a `Value` cannot fail.
            serde_json::to_string_pretty(&collection_to_json(collection)).unwrap_or_default()
        }
    }
}

/// Format one task as a checklist line, indented by depth.
pub fn format_task_markdown(task: &Task) -> String {
    let mut line = format!(
        "{}- [{}] {}",
        "  ".repeat(task.depth),
        if task.completed { "x" } else { " " },
        task.text
    );

    line.push_str(&format!(" `{}`", task.id));

    if task.is_blocked() {
        let blockers: Vec<String> = task.blockers.iter().map(|id| format!("`{}`", id)).collect();
        line.push_str(&format!(" [blocked by {}]", blockers.join(", ")));
    }

    if let Some(date) = task.anchor_date() {
        line.push_str(&format!(" ({})", date));
    }

    line.push('\n');
    line
}

/// Format a whole collection as markdown, one section per document.
pub fn format_collection_markdown(collection: &TaskCollection) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Tasks ({})\n", collection.len()));
    if collection.truncated() {
        md.push_str("\n_Task limit reached; later tasks were not scanned._\n");
    }

    let mut current_file: Option<&str> = None;
    for task in collection.iter() {
        if current_file != Some(task.location.file.as_str()) {
            current_file = Some(task.location.file.as_str());
            md.push_str(&format!("\n## {}\n\n", task.location.file));
        }
        md.push_str(&format_task_markdown(task));
    }

    if !collection.tags().is_empty() {
        let tags: Vec<&str> = collection.tags().iter().map(String::as_str).collect();
        md.push_str(&format!("\n**tags**: {}\n", tags.join(", ")));
    }

    md
}

pub fn collection_to_json(collection: &TaskCollection) -> Value {
    json!({
        "total": collection.len(),
        "documents": collection.documents(),
        "truncated": collection.truncated(),
        "roots": collection.roots(),
        "tags": collection.tags(),
        "tasks": collection.iter().collect::<Vec<_>>(),
    })
}

/// Render an assembled graph: the tasks a view would show and its edges.
pub fn format_graph(graph: &TaskGraph, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(graph).unwrap_or_default(),
        OutputFormat::Markdown => {
            let mut md = format!(
                "# Graph ({} tasks, {} links)\n\n",
                graph.nodes.len(),
                graph.links.len()
            );
            for node in &graph.nodes {
                md.push_str(&format!(
                    "{}- {} `{}`\n",
                    "  ".repeat(node.depth),
                    node.text,
                    node.id
                ));
            }
            if !graph.links.is_empty() {
                md.push_str("\n## Links\n\n");
                for link in &graph.links {
                    md.push_str(&format!(
                        "- `{}` -> `{}` ({})\n",
                        link.source,
                        link.target,
                        link.kind.as_str()
                    ));
                }
            }
            md
        }
    }
}
