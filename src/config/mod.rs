//! Layered configuration.
//!
//! Tiers, lowest first, merged field-by-field:
//! 1. **Defaults** - [`Config::default`]
//! 2. **Project** - `./.checklist-graph/config.yaml`
//! 3. **User** - `<config dir>/checklist-graph/config.yaml`
//! 4. **Environment** - the variables below
//!
//! ## Environment Variables
//! - `CHECKLIST_GRAPH_CONFIG_PATH` - Explicit config file (replaces tiers 2 and 3)
//! - `CHECKLIST_GRAPH_VAULT` - Vault root
//! - `CHECKLIST_GRAPH_PORT` - Graph view port
//! - `CHECKLIST_GRAPH_USER_DIR` - User config dir
//! - `CHECKLIST_GRAPH_PROJECT_DIR` - Project config dir

mod loader;
mod merge;
mod types;
pub mod watcher;

pub use loader::{CONFIG_DIR_NAME, ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::deep_merge;
pub use types::*;
