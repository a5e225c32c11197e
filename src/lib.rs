//! Checklist Graph Library
//!
//! Extracts checklist tasks from Markdown notes, assembles them into a
//! dependency graph and lays it out with a force simulation. The binary wraps
//! this in a CLI and an HTTP view.

pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod format;
pub mod graph;
pub mod hierarchy;
pub mod interaction;
pub mod layout;
pub mod logging;
pub mod opener;
pub mod render;
pub mod scan;
pub mod session;
pub mod source;
pub mod types;
