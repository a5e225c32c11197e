//! Configuration types and structures.
//!
//! Every section is `#[serde(default)]`-tolerant so a partial YAML file only
//! overrides what it names.

use crate::format::OutputFormat;
use crate::graph::{Policy, ViewConfig};
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default port for the graph view.
pub const DEFAULT_UI_PORT: u16 = 31995;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub vault: VaultConfig,

    #[serde(default)]
    pub view: ViewSettings,

    #[serde(default)]
    pub layout: LayoutSettings,

    #[serde(default)]
    pub ui: UiConfig,

    #[serde(default)]
    pub editor: EditorSettings,
}

impl Config {
    /// Load configuration from a single file, without tier merging.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.vault.extensions.is_empty() {
            return Err(anyhow!("vault.extensions must name at least one extension"));
        }
        self.layout.validate()
    }
}

/// Where documents live and which of them are scanned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Root directory of the note collection (default: ".").
    #[serde(default = "default_vault_root")]
    pub root: PathBuf,

    /// Eligible document extensions, without the dot (default: ["md"]).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names skipped while scanning and watching.
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,

    /// Debounce window for change notifications in milliseconds (default: 500).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Default output format of the `scan` command.
    #[serde(default)]
    pub default_format: OutputFormat,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: default_vault_root(),
            extensions: default_extensions(),
            ignore_dirs: default_ignore_dirs(),
            debounce_ms: default_debounce_ms(),
            default_format: OutputFormat::default(),
        }
    }
}

fn default_vault_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

fn default_ignore_dirs() -> Vec<String> {
    [".obsidian", ".git", ".trash", "node_modules", ".checklist-graph"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_debounce_ms() -> u64 {
    500
}

/// Persisted starting values for the in-view toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewSettings {
    #[serde(default)]
    pub show_completed: bool,

    #[serde(default = "default_true")]
    pub show_blocked: bool,

    #[serde(default = "default_true")]
    pub live_update: bool,

    #[serde(default)]
    pub use_dates: bool,

    /// Task cap per scan; 0 disables the cap (default: 500).
    #[serde(default = "default_task_limit")]
    pub task_limit: usize,

    #[serde(default)]
    pub show_without_tags: bool,

    /// Tags selected when the view opens.
    #[serde(default)]
    pub selected_tags: BTreeSet<String>,

    /// Tag that marks tasks for the reachability policy (default: "#pinned").
    #[serde(default = "default_pinned_tag")]
    pub pinned_tag: String,

    #[serde(default)]
    pub policy: Policy,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            show_completed: false,
            show_blocked: true,
            live_update: true,
            use_dates: false,
            task_limit: default_task_limit(),
            show_without_tags: false,
            selected_tags: BTreeSet::new(),
            pinned_tag: default_pinned_tag(),
            policy: Policy::default(),
        }
    }
}

impl ViewSettings {
    /// The initial immutable view configuration.
    pub fn to_view_config(&self) -> ViewConfig {
        let pinned_tag = if self.pinned_tag.starts_with('#') {
            self.pinned_tag.to_lowercase()
        } else {
            format!("#{}", self.pinned_tag.to_lowercase())
        };
        ViewConfig {
            show_completed: self.show_completed,
            show_blocked: self.show_blocked,
            live_update: self.live_update,
            use_dates: self.use_dates,
            task_limit: self.task_limit,
            selected_tags: self.selected_tags.iter().map(|t| t.to_lowercase()).collect(),
            show_without_tags: self.show_without_tags,
            pinned_tag,
            policy: self.policy,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_task_limit() -> usize {
    500
}

fn default_pinned_tag() -> String {
    "#pinned".to_string()
}

/// Force simulation and view constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Rest length of parent/child edges.
    pub hierarchy_distance: f64,
    /// Rest length of blocker/blocked edges.
    pub dependency_distance: f64,
    pub link_strength: f64,
    /// Charge of non-root nodes; negative repels.
    pub charge: f64,
    /// Charge of root nodes.
    pub root_charge: f64,
    /// Radius of a root node; deeper nodes shrink by `radius_falloff` per level.
    pub node_radius: f64,
    pub radius_falloff: f64,
    pub min_radius: f64,
    pub collision_padding: f64,
    pub collision_strength: f64,
    /// Pull toward the date band and the vertical center.
    pub axial_strength: f64,
    /// Band offset from center as a fraction of viewport width.
    pub band_fraction: f64,
    /// Root seeding circle radius as a fraction of min(width, height).
    pub root_circle_fraction: f64,
    pub alpha_decay: f64,
    pub alpha_min: f64,
    pub velocity_decay: f64,
    /// Temperature held while a node is dragged.
    pub drag_alpha_target: f64,
    /// Simulation ticks per second.
    pub tick_rate: f64,
    /// Auto-fit after this long even if not converged.
    pub settle_delay_ms: u64,
    /// Margin kept around the fitted bounding box, as a fraction.
    pub fit_margin: f64,
    pub transition_ms: u64,
    pub zoom_min: f64,
    pub zoom_max: f64,
    /// Below this zoom nodes are drawn as bare dots.
    pub lod_threshold: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            hierarchy_distance: 60.0,
            dependency_distance: 140.0,
            link_strength: 0.5,
            charge: -150.0,
            root_charge: -500.0,
            node_radius: 14.0,
            radius_falloff: 0.8,
            min_radius: 4.0,
            collision_padding: 2.0,
            collision_strength: 0.7,
            axial_strength: 0.08,
            band_fraction: 0.3,
            root_circle_fraction: 0.35,
            // 1 - alpha_min^(1/300): cools from 1 to alpha_min in 300 ticks.
            alpha_decay: 1.0 - 0.001_f64.powf(1.0 / 300.0),
            alpha_min: 0.001,
            velocity_decay: 0.4,
            drag_alpha_target: 0.3,
            tick_rate: 60.0,
            settle_delay_ms: 4_000,
            fit_margin: 0.15,
            transition_ms: 750,
            zoom_min: 0.1,
            zoom_max: 5.0,
            lod_threshold: 0.6,
        }
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.zoom_min > 0.0 && self.zoom_min <= self.zoom_max) {
            return Err(anyhow!(
                "layout.zoom_min ({}) must be positive and not above zoom_max ({})",
                self.zoom_min,
                self.zoom_max
            ));
        }
        if !(0.0..1.0).contains(&self.fit_margin) {
            return Err(anyhow!("layout.fit_margin must be in [0, 1)"));
        }
        if self.tick_rate <= 0.0 {
            return Err(anyhow!("layout.tick_rate must be positive"));
        }
        if !(0.0..=1.0).contains(&self.velocity_decay) {
            return Err(anyhow!("layout.velocity_decay must be in [0, 1]"));
        }
        Ok(())
    }

    /// Circle radius of a node at `depth`.
    pub fn radius_for_depth(&self, depth: usize) -> f64 {
        let r = self.node_radius * self.radius_falloff.powi(depth as i32);
        r.max(self.min_radius)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn transition_duration(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }
}

/// HTTP view configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Bind address (default: 127.0.0.1).
    #[serde(default = "default_ui_host")]
    pub host: String,

    /// Port for the graph view (default: 31995).
    #[serde(default = "default_ui_port")]
    pub port: u16,

    /// Initial viewport size until the page reports its own.
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f64,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,

    /// Initial retry delay in milliseconds when the server fails to start (default: 15000).
    #[serde(default = "default_retry_initial_ms")]
    pub retry_initial_ms: u64,

    /// Jitter range in milliseconds for retry delay (default: 5000, meaning ±5s).
    #[serde(default = "default_retry_jitter_ms")]
    pub retry_jitter_ms: u64,

    /// Maximum retry interval in milliseconds (default: 240000 = 4 minutes).
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,

    /// Exponential backoff multiplier (default: 2.0).
    #[serde(default = "default_retry_multiplier")]
    pub retry_multiplier: f64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            host: default_ui_host(),
            port: default_ui_port(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            retry_initial_ms: default_retry_initial_ms(),
            retry_jitter_ms: default_retry_jitter_ms(),
            retry_max_ms: default_retry_max_ms(),
            retry_multiplier: default_retry_multiplier(),
        }
    }
}

fn default_ui_host() -> String {
    "127.0.0.1".to_string()
}

fn default_ui_port() -> u16 {
    DEFAULT_UI_PORT
}

fn default_viewport_width() -> f64 {
    1200.0
}

fn default_viewport_height() -> f64 {
    800.0
}

fn default_retry_initial_ms() -> u64 {
    15_000 // 15 seconds
}

fn default_retry_jitter_ms() -> u64 {
    5_000 // ±5 seconds
}

fn default_retry_max_ms() -> u64 {
    240_000 // 4 minutes
}

fn default_retry_multiplier() -> f64 {
    2.0
}

/// How "open at location" requests reach an editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorSettings {
    /// Command template for the current context. Placeholders: `{file}`,
    /// `{line}`, `{from}`, `{to}`.
    #[serde(default = "default_editor_command")]
    pub command: String,

    /// Command template for a new split or tab. Falls back to `command`.
    #[serde(default)]
    pub split_command: Option<String>,

    /// Lines revealed above and below the target line (default: 5).
    #[serde(default = "default_reveal_lines")]
    pub reveal_lines: usize,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            command: default_editor_command(),
            split_command: None,
            reveal_lines: default_reveal_lines(),
        }
    }
}

fn default_editor_command() -> String {
    "code --goto {file}:{line}".to_string()
}

fn default_reveal_lines() -> usize {
    5
}
