//! "Open at location": hand a task's source line to an editor.

use crate::config::EditorSettings;
use crate::error::{GraphError, GraphResult};
use crate::interaction::{OpenContext, OpenRequest};
use crate::source::{DocumentSource, VaultSource};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::process::{Command, Stdio};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenOutcome {
    Opened,
    /// The document no longer exists; nothing was done.
    Missing,
}

#[async_trait]
pub trait Opener: Send + Sync {
    async fn open(&self, request: &OpenRequest) -> GraphResult<OpenOutcome>;
}

/// Runs an editor command built from a template.
///
/// Templates are split on whitespace before placeholders are substituted, so
/// a path containing spaces stays a single argument.
#[derive(Debug, Clone)]
pub struct CommandOpener {
    source: Arc<VaultSource>,
    command: String,
    split_command: Option<String>,
}

impl CommandOpener {
    pub fn new(source: Arc<VaultSource>, settings: &EditorSettings) -> Self {
        Self {
            source,
            command: settings.command.clone(),
            split_command: settings.split_command.clone(),
        }
    }

    /// Program and arguments for `request`, or `None` for an empty template.
    pub fn command_line(&self, request: &OpenRequest, file: &str) -> Option<Vec<String>> {
        let template = match request.context {
            OpenContext::Split => self
                .split_command
                .as_deref()
                .unwrap_or(self.command.as_str()),
            OpenContext::Current => self.command.as_str(),
        };
        let args: Vec<String> = template
            .split_whitespace()
            .map(|token| {
                token
                    .replace("{file}", file)
                    .replace("{line}", &request.line.to_string())
                    .replace("{from}", &request.reveal_from.to_string())
                    .replace("{to}", &request.reveal_to.to_string())
            })
            .collect();
        (!args.is_empty()).then_some(args)
    }
}

#[async_trait]
impl Opener for CommandOpener {
    async fn open(&self, request: &OpenRequest) -> GraphResult<OpenOutcome> {
        let Some(doc) = self.source.resolve(&request.file).await else {
            debug!(file = %request.file, "Open skipped, document is gone");
            return Ok(OpenOutcome::Missing);
        };
        let path = self.source.absolute(&doc.path);
        let path_str = path.to_string_lossy();
        let Some(args) = self.command_line(request, &path_str) else {
            return Err(GraphError::config("editor command is empty").with_field("editor.command"));
        };

        Command::new(&args[0])
            .args(&args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| GraphError::open_failed(&request.file, e))?;

        info!(file = %request.file, line = request.line, context = ?request.context, "Opened task");
        Ok(OpenOutcome::Opened)
    }
}

/// Accepts every request and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOpener;

#[async_trait]
impl Opener for NullOpener {
    async fn open(&self, request: &OpenRequest) -> GraphResult<OpenOutcome> {
        debug!(file = %request.file, line = request.line, "Open ignored");
        Ok(OpenOutcome::Opened)
    }
}
