//! Reachability policy: pinned tasks and the tasks that link to them.
//!
//! Only one hop is followed. A task linking to a referrer of a pinned task is
//! not included unless it links to a pinned task directly.

use super::{TaskGraph, ViewConfig, project};
use crate::scan::TaskCollection;
use std::collections::HashSet;
use tracing::debug;

pub fn assemble_reachable(collection: &TaskCollection, config: &ViewConfig) -> TaskGraph {
    let pinned_tag = config.pinned_tag.to_lowercase();

    let pinned: Vec<&str> = collection
        .iter()
        .filter(|t| t.tags.contains(&pinned_tag))
        .map(|t| t.id.as_str())
        .collect();
    let pinned_blocks: HashSet<&str> = collection
        .iter()
        .filter(|t| t.tags.contains(&pinned_tag))
        .filter_map(|t| t.block_id.as_deref())
        .collect();

    let included: HashSet<&str> = collection
        .iter()
        .filter(|t| {
            t.tags.contains(&pinned_tag)
                || t.outlinks.iter().any(|b| pinned_blocks.contains(b.as_str()))
        })
        .map(|t| t.id.as_str())
        .collect();

    debug!(
        pinned = pinned.len(),
        included = included.len(),
        tag = %pinned_tag,
        "Assembled reachability view"
    );
    project(collection, &included)
}
