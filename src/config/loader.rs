//! Configuration loader with tier-based merging.
//!
//! Loads configuration from multiple tiers and merges them field-by-field.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the per-project and per-user configuration directories.
pub const CONFIG_DIR_NAME: &str = "checklist-graph";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Embedded defaults (lowest priority)
    Defaults = 0,
    /// Project-level config (`.checklist-graph/` in the working directory)
    Project = 1,
    /// User-level config (`<config dir>/checklist-graph/`)
    User = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Paths for each configuration tier.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover() -> Self {
        // User dir: CHECKLIST_GRAPH_USER_DIR or <config dir>/checklist-graph
        let user_dir = std::env::var("CHECKLIST_GRAPH_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME)));

        // Project dir: CHECKLIST_GRAPH_PROJECT_DIR or $CWD/.checklist-graph
        let project_dir = std::env::var("CHECKLIST_GRAPH_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from(format!(".{}", CONFIG_DIR_NAME))));

        Self {
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }

    fn config_file(dir: Option<&Path>) -> Option<PathBuf> {
        let file = dir?.join("config.yaml");
        file.exists().then_some(file)
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each tier
    pub paths: ConfigPaths,
    /// Loaded configuration
    config: Config,
    /// Files that contributed, lowest tier first
    sources: Vec<(ConfigTier, PathBuf)>,
}

impl ConfigLoader {
    /// Load configuration from all tiers with proper merging.
    ///
    /// An explicit file (from `--config` or `CHECKLIST_GRAPH_CONFIG_PATH`)
    /// replaces the file tiers; environment overrides still apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit.map(Path::to_path_buf).or_else(|| {
            std::env::var("CHECKLIST_GRAPH_CONFIG_PATH")
                .ok()
                .map(PathBuf::from)
        });
        Self::load_with(ConfigPaths::discover(), explicit, |key| std::env::var(key).ok())
    }

    /// Load configuration with explicit paths and environment lookup.
    pub fn load_with(
        paths: ConfigPaths,
        explicit: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut configs: Vec<Value> = Vec::new();
        let mut sources = Vec::new();

        // Tier 1: Defaults (embedded)
        configs.push(
            serde_json::to_value(Config::default()).context("serializing default config")?,
        );

        match explicit {
            Some(path) => {
                configs.push(read_yaml(&path)?);
                sources.push((ConfigTier::User, path));
            }
            None => {
                // Tier 2 and 3: project then user file. Unreadable files are
                // skipped with a warning rather than failing startup.
                let tiers = [
                    (ConfigTier::Project, paths.project_dir.as_deref()),
                    (ConfigTier::User, paths.user_dir.as_deref()),
                ];
                for (tier, dir) in tiers {
                    let Some(file) = ConfigPaths::config_file(dir) else {
                        continue;
                    };
                    match read_yaml(&file) {
                        Ok(value) => {
                            debug!(%tier, path = %file.display(), "Loaded config tier");
                            configs.push(value);
                            sources.push((tier, file));
                        }
                        Err(e) => warn!(%tier, error = %e, "Ignoring config file"),
                    }
                }
            }
        }

        let merged = deep_merge_all(configs);
        let mut config: Config =
            serde_json::from_value(merged).context("invalid configuration")?;

        // Tier 4: Environment variable overrides
        Self::apply_env_overrides(&mut config, env);
        config.validate()?;

        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config, env: impl Fn(&str) -> Option<String>) {
        if let Some(vault) = env("CHECKLIST_GRAPH_VAULT") {
            config.vault.root = PathBuf::from(vault);
        }

        if let Some(port) = env("CHECKLIST_GRAPH_PORT") {
            match port.parse() {
                Ok(port) => config.ui.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid CHECKLIST_GRAPH_PORT"),
            }
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Config files that were merged, lowest tier first.
    pub fn sources(&self) -> &[(ConfigTier, PathBuf)] {
        &self.sources
    }
}

fn read_yaml(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value: Value = serde_yaml::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    // An empty file parses as null; treat it as "no overrides".
    Ok(if value.is_null() {
        Value::Object(Default::default())
    } else {
        value
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_config_paths_discover() {
        let paths = ConfigPaths::discover();
        assert!(paths.project_dir.is_some());
        // user_dir may or may not exist depending on environment
    }

    #[test]
    fn test_load_defaults_only() {
        // Create empty temp dirs so no config files are found
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_dirs(
            Some(temp.path().join("project")),
            Some(temp.path().join("user")),
        );

        let loader = ConfigLoader::load_with(paths, None, no_env).unwrap();
        let config = loader.config();

        assert_eq!(config.view.task_limit, 500);
        assert_eq!(config.ui.port, super::super::types::DEFAULT_UI_PORT);
        assert!(loader.sources().is_empty());
    }

    #[test]
    fn test_project_config_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join(".checklist-graph");
        std::fs::create_dir_all(&project_dir).unwrap();

        let config_content = r#"
view:
  task_limit: 50
layout:
  charge: -80
"#;
        std::fs::write(project_dir.join("config.yaml"), config_content).unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), Some(temp.path().join("user")));

        let loader = ConfigLoader::load_with(paths, None, no_env).unwrap();
        let config = loader.config();

        assert_eq!(config.view.task_limit, 50);
        assert_eq!(config.layout.charge, -80.0);
        // Untouched siblings keep their defaults
        assert_eq!(config.layout.root_charge, -500.0);
        assert!(config.view.show_blocked);
        assert_eq!(loader.sources()[0].0, ConfigTier::Project);
    }

    #[test]
    fn test_user_config_overrides_project() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("project");
        let user_dir = temp.path().join("user");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::create_dir_all(&user_dir).unwrap();

        std::fs::write(
            project_dir.join("config.yaml"),
            "view:\n  task_limit: 50\n  use_dates: true\n",
        )
        .unwrap();
        std::fs::write(user_dir.join("config.yaml"), "view:\n  task_limit: 75\n").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), Some(user_dir));
        let loader = ConfigLoader::load_with(paths, None, no_env).unwrap();
        let config = loader.config();

        assert_eq!(config.view.task_limit, 75);
        assert!(config.view.use_dates);
        assert_eq!(loader.sources().len(), 2);
    }

    #[test]
    fn test_explicit_file_replaces_tiers() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("project");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("config.yaml"), "view:\n  task_limit: 50\n").unwrap();
        let explicit = temp.path().join("custom.yaml");
        std::fs::write(&explicit, "ui:\n  port: 4100\n").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), None);
        let loader = ConfigLoader::load_with(paths, Some(explicit), no_env).unwrap();
        assert_eq!(loader.config().ui.port, 4100);
        assert_eq!(loader.config().view.task_limit, 500);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_dirs(None, None);
        let result = ConfigLoader::load_with(paths, Some(temp.path().join("nope.yaml")), no_env);
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_overrides_win() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_dirs(Some(temp.path().join("p")), None);
        let env = |key: &str| match key {
            "CHECKLIST_GRAPH_VAULT" => Some("/notes".to_string()),
            "CHECKLIST_GRAPH_PORT" => Some("5123".to_string()),
            _ => None,
        };
        let loader = ConfigLoader::load_with(paths, None, env).unwrap();
        assert_eq!(loader.config().vault.root, PathBuf::from("/notes"));
        assert_eq!(loader.config().ui.port, 5123);
    }

    #[test]
    fn test_empty_file_is_no_override() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("p");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.yaml"), "").unwrap();
        let loader =
            ConfigLoader::load_with(ConfigPaths::with_dirs(Some(dir), None), None, no_env).unwrap();
        assert_eq!(loader.config().view.task_limit, 500);
    }
}
