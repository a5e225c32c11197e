//! Full scans of a document collection into a task arena.
//!
//! Every scan starts from nothing: documents are listed, read one at a time
//! and parsed independently, and each finished document is merged into a
//! fresh [`TaskCollection`]. A scan stops early once the task cap is reached.
//! Scans may overlap with newer ones; [`ScanGeneration`] decides whose
//! results win.

use crate::error::GraphResult;
use crate::extract::extract_line;
use crate::hierarchy::{DocumentTree, HierarchyEntry, build_tree};
use crate::source::DocumentSource;
use crate::types::{SourceLocation, Task};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Every task of one scan, keyed by id in discovery order.
///
/// Discovery order is document order, then line order, which is also a
/// depth-first pre-order walk of each document's tree.
#[derive(Debug, Clone, Default)]
pub struct TaskCollection {
    tasks: IndexMap<String, Task>,
    roots: Vec<String>,
    tags: BTreeSet<String>,
    block_index: HashMap<String, String>,
    documents: usize,
    truncated: bool,
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a single document into a collection. Handy for tests and tools.
    pub fn from_document(path: &str, text: &str) -> Self {
        let mut collection = Self::new();
        collection.merge(parse_document(path, text, None));
        collection
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Tasks in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Ids of top-level tasks across all documents.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Every tag seen in this scan, sorted.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Id of the task that owns `block_id`.
    pub fn block_owner(&self, block_id: &str) -> Option<&str> {
        self.block_index.get(block_id).map(String::as_str)
    }

    /// Number of documents that contributed to this scan.
    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Whether the task cap cut the scan short.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Merge one finished document.
    ///
    /// A task whose explicit id is already taken keeps its place in the tree
    /// but falls back to its location-derived id; the first owner keeps the id.
    pub fn merge(&mut self, tree: DocumentTree) {
        let mut seen_in_doc: BTreeSet<String> = BTreeSet::new();

        let DocumentTree {
            mut tasks,
            parent_index,
            ..
        } = tree;
        for task in &mut tasks {
            if self.tasks.contains_key(&task.id) || seen_in_doc.contains(&task.id) {
                let fresh = self.unique_derived_id(&task.location, &seen_in_doc);
                debug!(id = %task.id, replacement = %fresh, "Duplicate task id");
                task.id = fresh;
            }
            seen_in_doc.insert(task.id.clone());
        }

        // Links are rebuilt from positions; an id string may name two tasks
        // of this document before renaming.
        for task in &mut tasks {
            task.children.clear();
        }
        for (idx, parent) in parent_index.into_iter().enumerate() {
            let Some(p) = parent else {
                tasks[idx].parent = None;
                continue;
            };
            let parent_id = tasks[p].id.clone();
            let child_id = tasks[idx].id.clone();
            tasks[idx].parent = Some(parent_id);
            tasks[p].children.push(child_id);
        }

        for task in tasks {
            if task.parent.is_none() {
                self.roots.push(task.id.clone());
            }
            self.tags.extend(task.tags.iter().cloned());
            if let Some(block) = &task.block_id {
                self.block_index
                    .entry(block.clone())
                    .or_insert_with(|| task.id.clone());
            }
            self.tasks.insert(task.id.clone(), task);
        }
        self.documents += 1;
    }

    fn unique_derived_id(&self, location: &SourceLocation, pending: &BTreeSet<String>) -> String {
        let base = location.derived_id();
        let mut candidate = base.clone();
        let mut n = 1;
        while self.tasks.contains_key(&candidate) || pending.contains(&candidate) {
            n += 1;
            candidate = format!("{}~{}", base, n);
        }
        candidate
    }
}

/// Parse one document's checklist lines into a tree.
///
/// `budget` caps how many tasks are taken from this document.
pub fn parse_document(path: &str, text: &str, budget: Option<usize>) -> DocumentTree {
    parse_capped(path, text, budget).0
}

/// Like [`parse_document`], also reporting whether the cap dropped a task.
fn parse_capped(path: &str, text: &str, budget: Option<usize>) -> (DocumentTree, bool) {
    let mut entries = text.lines().enumerate().filter_map(|(idx, line)| {
        let parsed = extract_line(line)?;
        let location = SourceLocation::new(path, idx + 1);
        let id = parsed
            .task
            .id
            .clone()
            .unwrap_or_else(|| location.derived_id());
        Some(HierarchyEntry {
            id,
            indent: parsed.indent,
            location,
            task: parsed.task,
        })
    });
    let kept: Vec<HierarchyEntry> = entries
        .by_ref()
        .take(budget.unwrap_or(usize::MAX))
        .collect();
    let dropped = entries.next().is_some();
    (build_tree(kept), dropped)
}

/// Reads a whole collection, honoring a task cap.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scanner {
    /// Maximum number of tasks to collect; `None` is unlimited.
    limit: Option<usize>,
}

impl Scanner {
    pub fn new(limit: Option<usize>) -> Self {
        Self { limit }
    }

    /// Build a scanner from a configured cap, where 0 means unlimited.
    pub fn with_task_limit(task_limit: usize) -> Self {
        Self::new((task_limit > 0).then_some(task_limit))
    }

    pub async fn scan(&self, source: &dyn DocumentSource) -> GraphResult<TaskCollection> {
        let docs = source.list().await?;
        let mut collection = TaskCollection::new();

        for doc in &docs {
            let budget = self.limit.map(|limit| limit.saturating_sub(collection.len()));

            let text = match source.read(doc).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %doc.path, error = %e, "Skipping unreadable document");
                    continue;
                }
            };

            let (tree, dropped) = parse_capped(&doc.path, &text, budget);
            if budget != Some(0) {
                debug!(path = %doc.path, tasks = tree.tasks.len(), "Scanned document");
                collection.merge(tree);
            }
            if dropped {
                collection.truncated = true;
                break;
            }

            // Let the host breathe between documents.
            tokio::task::yield_now().await;
        }

        if collection.truncated {
            info!(
                tasks = collection.len(),
                limit = self.limit.unwrap_or_default(),
                "Scan stopped at task limit"
            );
        } else {
            info!(
                tasks = collection.len(),
                documents = collection.documents,
                "Scan complete"
            );
        }
        Ok(collection)
    }
}

/// Proof that a scan was started, checked when its results arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTicket {
    generation: u64,
}

impl ScanTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Last-writer-wins bookkeeping for overlapping scans.
///
/// Only the most recently started scan may publish results; a scan that
/// finishes after a newer one began is stale and its results are dropped.
#[derive(Debug, Default)]
pub struct ScanGeneration {
    issued: u64,
    applied: Option<u64>,
}

impl ScanGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> ScanTicket {
        self.issued += 1;
        ScanTicket {
            generation: self.issued,
        }
    }

    pub fn is_current(&self, ticket: ScanTicket) -> bool {
        ticket.generation == self.issued
    }

    /// Record `ticket` as applied if it is still current.
    pub fn accept(&mut self, ticket: ScanTicket) -> bool {
        if !self.is_current(ticket) {
            debug!(
                stale = ticket.generation,
                latest = self.issued,
                "Discarding stale scan results"
            );
            return false;
        }
        self.applied = Some(ticket.generation);
        true
    }

    pub fn latest_applied(&self) -> Option<u64> {
        self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    const INBOX: &str = "\
# Inbox
- [ ] Plan trip #travel 🆔 trip
  - [ ] Book flights ⛔ visa
  - [x] Renew passport 🆔 visa
Some notes in between.
- [ ] Call plumber
";

    #[test]
    fn test_from_document_builds_tree_and_ids() {
        let c = TaskCollection::from_document("inbox.md", INBOX);
        let ids: Vec<&str> = c.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["trip", "inbox.md:3", "visa", "inbox.md:6"]);
        assert_eq!(c.roots(), &["trip".to_string(), "inbox.md:6".to_string()]);
        assert_eq!(c.get("visa").unwrap().parent.as_deref(), Some("trip"));
        assert_eq!(c.tags(), &BTreeSet::from(["#travel".to_string()]));
    }

    #[test]
    fn test_derived_ids_are_stable_across_rescans() {
        let a = TaskCollection::from_document("inbox.md", INBOX);
        let b = TaskCollection::from_document("inbox.md", INBOX);
        let ids_a: Vec<&str> = a.iter().map(|t| t.id.as_str()).collect();
        let ids_b: Vec<&str> = b.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_duplicate_explicit_id_falls_back_to_location() {
        let mut c = TaskCollection::new();
        c.merge(parse_document("a.md", "- [ ] First 🆔 x", None));
        c.merge(parse_document(
            "b.md",
            "- [ ] Second 🆔 x\n  - [ ] Child of second",
            None,
        ));
        assert_eq!(c.get("x").unwrap().text, "First");
        let second = c.get("b.md:1").unwrap();
        assert_eq!(second.text, "Second");
        assert_eq!(second.children, vec!["b.md:2".to_string()]);
        assert_eq!(c.get("b.md:2").unwrap().parent.as_deref(), Some("b.md:1"));
    }

    #[test]
    fn test_block_index_first_owner_wins() {
        let c = TaskCollection::from_document("a.md", "- [ ] One ^blk\n- [ ] Two ^blk");
        assert_eq!(c.block_owner("blk"), Some("a.md:1"));
        assert_eq!(c.block_owner("missing"), None);
    }

    #[tokio::test]
    async fn test_scan_respects_task_limit() {
        let source = MemorySource::new()
            .with_document("a.md", "- [ ] a1\n- [ ] a2\n- [ ] a3")
            .with_document("b.md", "- [ ] b1\n- [ ] b2");

        let full = Scanner::new(None).scan(&source).await.unwrap();
        assert_eq!(full.len(), 5);
        assert!(!full.truncated());
        assert_eq!(full.documents(), 2);

        let capped = Scanner::with_task_limit(4).scan(&source).await.unwrap();
        assert_eq!(capped.len(), 4);
        assert!(capped.truncated());
        let ids: Vec<&str> = capped.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a.md:1", "a.md:2", "a.md:3", "b.md:1"]);

        let first_doc = Scanner::with_task_limit(3).scan(&source).await.unwrap();
        assert_eq!(first_doc.len(), 3);
        assert!(first_doc.truncated());
        assert_eq!(first_doc.documents(), 1);
    }

    #[tokio::test]
    async fn test_scan_filling_limit_exactly_is_not_truncated() {
        let source = MemorySource::new()
            .with_document("a.md", "- [ ] a1\n- [ ] a2")
            .with_document("b.md", "- [ ] b1\nno tasks after this");

        let exact = Scanner::with_task_limit(3).scan(&source).await.unwrap();
        assert_eq!(exact.len(), 3);
        assert!(!exact.truncated());

        let trailing_empty = MemorySource::new()
            .with_document("a.md", "- [ ] a1\n- [ ] a2")
            .with_document("b.md", "just prose");
        let c = Scanner::with_task_limit(2).scan(&trailing_empty).await.unwrap();
        assert_eq!(c.len(), 2);
        assert!(!c.truncated());
    }

    #[test]
    fn test_duplicate_sibling_ids_keep_children_with_first_owner() {
        let c = TaskCollection::from_document(
            "d.md",
            "- [ ] A 🆔 x\n  - [ ] child of A\n- [ ] B 🆔 x",
        );
        let a = c.get("x").unwrap();
        assert_eq!(a.text, "A");
        assert_eq!(a.children, vec!["d.md:2".to_string()]);
        assert_eq!(c.get("d.md:2").unwrap().parent.as_deref(), Some("x"));
        let b = c.get("d.md:3").unwrap();
        assert_eq!(b.text, "B");
        assert!(b.children.is_empty());
        assert_eq!(c.roots(), &["x".to_string(), "d.md:3".to_string()]);
    }

    #[test]
    fn test_nested_duplicate_id_keeps_parent_relation_acyclic() {
        let c = TaskCollection::from_document(
            "d.md",
            "- [ ] A 🆔 x\n  - [ ] C\n    - [ ] B 🆔 x\n",
        );
        assert_eq!(c.get("d.md:2").unwrap().parent.as_deref(), Some("x"));
        assert_eq!(c.get("d.md:3").unwrap().parent.as_deref(), Some("d.md:2"));
        assert_eq!(c.get("d.md:2").unwrap().children, vec!["d.md:3".to_string()]);

        for task in c.iter() {
            if let Some(parent) = task.parent.as_deref().and_then(|p| c.get(p)) {
                assert_eq!(task.depth, parent.depth + 1);
                assert!(parent.children.contains(&task.id));
            }
            let mut seen = BTreeSet::new();
            let mut cursor = Some(task.id.as_str());
            while let Some(id) = cursor {
                assert!(seen.insert(id.to_string()), "{} is its own ancestor", task.id);
                cursor = c.get(id).and_then(|t| t.parent.as_deref());
            }
        }
    }

    #[tokio::test]
    async fn test_scan_of_empty_source() {
        let c = Scanner::default().scan(&MemorySource::new()).await.unwrap();
        assert!(c.is_empty());
        assert!(c.tags().is_empty());
    }

    #[test]
    fn test_stale_scan_is_discarded() {
        let mut generation = ScanGeneration::new();
        let first = generation.begin();
        let second = generation.begin();

        // The newer scan finishes first and wins.
        assert!(generation.accept(second));
        // The older one completes afterwards and must be ignored.
        assert!(!generation.accept(first));
        assert_eq!(generation.latest_applied(), Some(second.generation()));
    }

    #[test]
    fn test_single_scan_is_accepted() {
        let mut generation = ScanGeneration::new();
        let ticket = generation.begin();
        assert!(generation.is_current(ticket));
        assert!(generation.accept(ticket));
    }
}
