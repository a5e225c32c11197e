//! Document collections the scanner reads from.
//!
//! The scanner only needs three things from its host: an ordered list of
//! eligible documents, the text of one document, and a way to turn a stored
//! path back into a handle. `VaultSource` does this for a directory of
//! Markdown notes; `MemorySource` keeps everything in memory.

use crate::error::{GraphError, GraphResult};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A document in the collection, addressed by its root-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentHandle {
    /// Root-relative path with `/` separators.
    pub path: String,
}

impl DocumentHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Host collaborator that enumerates and reads documents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// All eligible documents, in a stable order.
    async fn list(&self) -> GraphResult<Vec<DocumentHandle>>;

    /// Full text of one document.
    async fn read(&self, doc: &DocumentHandle) -> GraphResult<String>;

    /// Resolve a stored path to a handle, if the document still exists.
    async fn resolve(&self, path: &str) -> Option<DocumentHandle>;
}

/// A directory tree of notes on disk.
#[derive(Debug, Clone)]
pub struct VaultSource {
    root: PathBuf,
    extensions: Vec<String>,
    ignore_dirs: Vec<String>,
}

impl VaultSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: vec!["md".to_string()],
            ignore_dirs: Vec::new(),
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_ignore_dirs(mut self, ignore_dirs: Vec<String>) -> Self {
        self.ignore_dirs = ignore_dirs;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` has one of the eligible extensions.
    pub fn is_eligible(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
    }

    /// Whether any component of `path` names an ignored directory.
    pub fn is_ignored(&self, path: &Path) -> bool {
        path.components().any(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|name| self.ignore_dirs.iter().any(|d| d == name))
        })
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = rel
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }

    /// On-disk location of a root-relative document path.
    pub fn absolute(&self, doc_path: &str) -> PathBuf {
        doc_path
            .split('/')
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

#[async_trait]
impl DocumentSource for VaultSource {
    async fn list(&self) -> GraphResult<Vec<DocumentHandle>> {
        let root_display = self.root.display().to_string();
        let mut pending = vec![self.root.clone()];
        let mut found = Vec::new();

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| GraphError::io(&root_display, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| GraphError::io(&root_display, e))?
            {
                let path = entry.path();
                let Ok(kind) = entry.file_type().await else {
                    continue;
                };
                if self.is_ignored(path.strip_prefix(&self.root).unwrap_or(path.as_path())) {
                    continue;
                }
                if kind.is_dir() {
                    pending.push(path);
                } else if kind.is_file() && self.is_eligible(&path) {
                    if let Some(rel) = self.relative(&path) {
                        found.push(DocumentHandle::new(rel));
                    }
                }
            }
        }

        found.sort();
        debug!(root = %root_display, count = found.len(), "Enumerated documents");
        Ok(found)
    }

    async fn read(&self, doc: &DocumentHandle) -> GraphResult<String> {
        tokio::fs::read_to_string(self.absolute(&doc.path))
            .await
            .map_err(|e| GraphError::io(&doc.path, e))
    }

    async fn resolve(&self, path: &str) -> Option<DocumentHandle> {
        let abs = self.absolute(path);
        match tokio::fs::metadata(&abs).await {
            Ok(meta) if meta.is_file() => Some(DocumentHandle::new(path)),
            _ => None,
        }
    }
}

/// In-memory documents, listed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    docs: IndexMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.docs.insert(path.into(), text.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.docs.shift_remove(path)
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn list(&self) -> GraphResult<Vec<DocumentHandle>> {
        Ok(self.docs.keys().map(DocumentHandle::new).collect())
    }

    async fn read(&self, doc: &DocumentHandle) -> GraphResult<String> {
        self.docs
            .get(&doc.path)
            .cloned()
            .ok_or_else(|| GraphError::document_not_found(&doc.path))
    }

    async fn resolve(&self, path: &str) -> Option<DocumentHandle> {
        self.docs.contains_key(path).then(|| DocumentHandle::new(path))
    }
}
