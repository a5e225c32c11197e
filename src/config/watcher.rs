//! Live-update watcher for the document collection.
//!
//! Watches the vault root recursively and reports changes to eligible
//! documents (by extension, outside ignored directories) through a tokio
//! watch channel. Debouncing coalesces bursts such as an editor's
//! write-rename-fsync sequence into one notification. Dropping the handle
//! unsubscribes.

use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind, new_debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// A change to the watched collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentChangeEvent {
    /// One document changed; root-relative path with `/` separators.
    Changed(String),
    /// Several documents changed in quick succession.
    Batch(Vec<String>),
    /// Watcher encountered an error
    Error(String),
}

impl DocumentChangeEvent {
    /// Returns true if this event should trigger a re-scan.
    pub fn requires_rescan(&self) -> bool {
        !matches!(self, DocumentChangeEvent::Error(_))
    }

    pub fn paths(&self) -> Vec<&str> {
        match self {
            DocumentChangeEvent::Changed(p) => vec![p.as_str()],
            DocumentChangeEvent::Batch(paths) => paths.iter().map(String::as_str).collect(),
            DocumentChangeEvent::Error(_) => vec![],
        }
    }
}

/// Configuration for the file watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce duration for coalescing rapid changes.
    pub debounce_duration: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
        }
    }
}

/// Which paths under the root count as documents.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    pub root: PathBuf,
    pub extensions: Vec<String>,
    pub ignore_dirs: Vec<String>,
}

impl WatchFilter {
    /// Root-relative path of an eligible document, or `None`.
    pub fn classify(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let ext = rel.extension()?.to_str()?;
        if !self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            return None;
        }
        let parts: Vec<&str> = rel
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        if parts[..parts.len().saturating_sub(1)]
            .iter()
            .any(|p| self.ignore_dirs.iter().any(|d| d == p))
        {
            return None;
        }
        Some(parts.join("/"))
    }
}

/// Handle to a running document watcher.
pub struct DocumentWatcherHandle {
    /// Receiver for change events.
    /// Cloning this receiver will allow multiple consumers to receive events.
    pub events: watch::Receiver<Option<DocumentChangeEvent>>,
    /// Handle to the watcher task (dropping this will stop the watcher).
    _task_handle: tokio::task::JoinHandle<()>,
}

impl DocumentWatcherHandle {
    /// Wait for the next change event.
    pub async fn wait_for_change(&mut self) -> Option<DocumentChangeEvent> {
        // Skip the initial None value
        loop {
            if self.events.changed().await.is_err() {
                return None; // Sender dropped
            }
            let event = self.events.borrow().clone();
            if event.is_some() {
                return event;
            }
        }
    }

    /// Get the latest event without waiting.
    pub fn latest_event(&self) -> Option<DocumentChangeEvent> {
        self.events.borrow().clone()
    }
}

/// Starts watching `filter.root` for document changes.
///
/// # Example
/// ```ignore
/// let filter = WatchFilter {
///     root: PathBuf::from("./notes"),
///     extensions: vec!["md".into()],
///     ignore_dirs: vec![".obsidian".into()],
/// };
/// let mut handle = start_document_watcher(filter, WatcherConfig::default())?;
/// while let Some(event) = handle.wait_for_change().await {
///     if event.requires_rescan() {
///         // start a new scan
///     }
/// }
/// ```
pub fn start_document_watcher(
    filter: WatchFilter,
    config: WatcherConfig,
) -> Result<DocumentWatcherHandle, notify::Error> {
    let (event_tx, event_rx) = watch::channel(None);
    let (notify_tx, notify_rx) = mpsc::channel();

    let mut debouncer = new_debouncer(config.debounce_duration, notify_tx)?;
    debouncer
        .watcher()
        .watch(&filter.root, notify::RecursiveMode::Recursive)?;
    info!("Watching documents under {}", filter.root.display());

    // Spawn the event processing task
    let task_handle = tokio::task::spawn_blocking(move || {
        // Keep the debouncer alive
        let _debouncer = debouncer;
        process_notify_events(notify_rx, event_tx, &filter);
    });

    Ok(DocumentWatcherHandle {
        events: event_rx,
        _task_handle: task_handle,
    })
}

fn process_notify_events(
    rx: mpsc::Receiver<Result<Vec<DebouncedEvent>, notify::Error>>,
    tx: watch::Sender<Option<DocumentChangeEvent>>,
    filter: &WatchFilter,
) {
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let Some(event) = classify_events(events, filter) else {
                    continue;
                };
                debug!("Document change detected: {:?}", event);
                if tx.send(Some(event)).is_err() {
                    info!("Document watcher receiver dropped, stopping");
                    return;
                }
            }
            Ok(Err(e)) => {
                error!("File watcher error: {}", e);
                let _ = tx.send(Some(DocumentChangeEvent::Error(e.to_string())));
            }
            Err(_) => {
                info!("Document watcher channel closed, stopping");
                return;
            }
        }
    }
}

/// Collapse one debounced batch into at most one event.
fn classify_events(events: Vec<DebouncedEvent>, filter: &WatchFilter) -> Option<DocumentChangeEvent> {
    let mut changed: Vec<String> = events
        .into_iter()
        .filter(|e| {
            matches!(
                e.kind,
                DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
            )
        })
        .filter_map(|e| filter.classify(&e.path))
        .collect();
    changed.sort();
    changed.dedup();

    match changed.len() {
        0 => None,
        1 => changed.pop().map(DocumentChangeEvent::Changed),
        _ => Some(DocumentChangeEvent::Batch(changed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> WatchFilter {
        WatchFilter {
            root: PathBuf::from("/vault"),
            extensions: vec!["md".to_string()],
            ignore_dirs: vec![".obsidian".to_string()],
        }
    }

    fn event(path: &str) -> DebouncedEvent {
        DebouncedEvent {
            path: PathBuf::from(path),
            kind: DebouncedEventKind::Any,
        }
    }

    #[test]
    fn test_classify_eligible_document() {
        assert_eq!(
            filter().classify(Path::new("/vault/projects/plan.MD")),
            Some("projects/plan.MD".to_string())
        );
    }

    #[test]
    fn test_classify_rejects_other_types_and_ignored_dirs() {
        let f = filter();
        assert!(f.classify(Path::new("/vault/image.png")).is_none());
        assert!(f.classify(Path::new("/vault/.obsidian/workspace.md")).is_none());
        assert!(f.classify(Path::new("/elsewhere/notes.md")).is_none());
        assert!(f.classify(Path::new("/vault/projects")).is_none());
    }

    #[test]
    fn test_single_change_event() {
        let result = classify_events(vec![event("/vault/a.md"), event("/vault/a.md")], &filter());
        assert_eq!(result, Some(DocumentChangeEvent::Changed("a.md".to_string())));
    }

    #[test]
    fn test_batch_event_is_sorted() {
        let result = classify_events(
            vec![event("/vault/b.md"), event("/vault/x.txt"), event("/vault/a.md")],
            &filter(),
        );
        assert_eq!(
            result,
            Some(DocumentChangeEvent::Batch(vec![
                "a.md".to_string(),
                "b.md".to_string()
            ]))
        );
    }

    #[test]
    fn test_irrelevant_batch_yields_nothing() {
        assert!(classify_events(vec![event("/vault/x.txt")], &filter()).is_none());
    }

    #[test]
    fn test_event_requires_rescan() {
        assert!(DocumentChangeEvent::Changed("a.md".into()).requires_rescan());
        assert!(DocumentChangeEvent::Batch(vec![]).requires_rescan());
        assert!(!DocumentChangeEvent::Error("test".to_string()).requires_rescan());
    }
}
