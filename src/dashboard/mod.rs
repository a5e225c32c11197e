//! Interactive graph view over HTTP.
//!
//! Serves a single page that draws session snapshots and forwards pointer
//! input back to the session. Started by the `serve` command.

mod server;
pub mod templates;

pub use server::{
    ApiError, GraphViewServer, ServerHandle, ServerStatus, ViewUpdate, build_router,
    start_server, start_server_with_retry,
};

/// Identifier of the graph view, used as the page's root element id.
pub const VIEW_TYPE: &str = "checklist-graph-view";

/// Display title of the graph view.
pub const TITLE: &str = "Task Graph";
