//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/coasync/coasync.toml`
//! 3. Local config: `<source_dir>/.coasync.toml` (next to the imported sheet)
//! 4. Environment variables: `COASYNC_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{expand_env_vars, DomainError, PathSeparator};
use crate::infrastructure::ColumnMap;

/// Spreadsheet columns holding the category cells.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ColumnsConfig {
    /// Numeric category id
    pub id: String,
    /// Group path, segments joined by `path_separator`
    pub group: String,
    /// Category name
    pub name: String,
    /// Primary account range
    pub range_a: String,
    /// Secondary account range
    pub range_b: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            id: "A".into(),
            group: "B".into(),
            name: "C".into(),
            range_a: "M".into(),
            range_b: "N".into(),
        }
    }
}

impl ColumnsConfig {
    /// Decode the letters into zero-based positions.
    pub fn to_column_map(&self) -> Result<ColumnMap, DomainError> {
        ColumnMap::from_letters(
            &self.id,
            &self.group,
            &self.name,
            &self.range_a,
            &self.range_b,
        )
    }

    fn overlay(&self, raw: &RawColumnsConfig) -> Self {
        Self {
            id: raw.id.clone().unwrap_or_else(|| self.id.clone()),
            group: raw.group.clone().unwrap_or_else(|| self.group.clone()),
            name: raw.name.clone().unwrap_or_else(|| self.name.clone()),
            range_a: raw.range_a.clone().unwrap_or_else(|| self.range_a.clone()),
            range_b: raw.range_b.clone().unwrap_or_else(|| self.range_b.clone()),
        }
    }
}

/// Raw columns config for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawColumnsConfig {
    pub id: Option<String>,
    pub group: Option<String>,
    pub name: Option<String>,
    pub range_a: Option<String>,
    pub range_b: Option<String>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub store_path: Option<PathBuf>,
    pub path_separator: Option<String>,
    pub has_headers: Option<bool>,
    #[serde(default)]
    pub columns: RawColumnsConfig,
}

/// Unified configuration for coasync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// JSON store file (default: ~/.coasync/store.json)
    pub store_path: PathBuf,
    /// Separator between segments of a group path (default: "-")
    pub path_separator: String,
    /// Whether the first source row is a header row
    pub has_headers: bool,
    /// Source column layout
    pub columns: ColumnsConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            path_separator: "-".into(),
            has_headers: false,
            columns: ColumnsConfig::default(),
        }
    }
}

/// Get the default store file (~/.coasync/store.json).
fn default_store_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".coasync").join("store.json"))
        .unwrap_or_else(|| PathBuf::from("~/.coasync/store.json"))
}

/// Get the XDG config directory for coasync.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "coasync").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("coasync.toml"))
}

/// Get the path to the local config file in a source directory.
pub fn local_config_path(source_dir: &Path) -> PathBuf {
    source_dir.join(".coasync.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Separator validated for use by the tree builder.
    pub fn separator(&self) -> Result<PathSeparator, DomainError> {
        PathSeparator::new(&self.path_separator)
    }

    /// Expand shell variables and tilde in the store path.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.store_path.to_string_lossy().as_ref());
        self.store_path = PathBuf::from(expanded);
    }

    /// Overlay a config file onto self: every specified value wins.
    fn overlay(&self, raw: &RawSettings) -> Self {
        Self {
            store_path: raw
                .store_path
                .clone()
                .unwrap_or_else(|| self.store_path.clone()),
            path_separator: raw
                .path_separator
                .clone()
                .unwrap_or_else(|| self.path_separator.clone()),
            has_headers: raw.has_headers.unwrap_or(self.has_headers),
            columns: self.columns.overlay(&raw.columns),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `source_dir` - Optional directory of the imported sheet, for local config
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/coasync/coasync.toml`
    /// 3. Local config: `<source_dir>/.coasync.toml`
    /// 4. Environment variables: `COASYNC_*` prefix, `__` between levels
    pub fn load(source_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.overlay(&raw);
            }
        }

        if let Some(dir) = source_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.overlay(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;

        // Expand ~ and $VAR in path-like fields
        current.expand_paths();

        current.validate()?;
        Ok(current)
    }

    /// Apply COASYNC_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("COASYNC")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("store_path") {
            settings.store_path = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("path_separator") {
            settings.path_separator = val;
        }
        if let Ok(val) = config.get_bool("has_headers") {
            settings.has_headers = val;
        }
        let columns = &mut settings.columns;
        for (key, slot) in [
            ("columns.id", &mut columns.id),
            ("columns.group", &mut columns.group),
            ("columns.name", &mut columns.name),
            ("columns.range_a", &mut columns.range_a),
            ("columns.range_b", &mut columns.range_b),
        ] {
            if let Ok(val) = config.get_string(key) {
                *slot = val;
            }
        }

        Ok(settings)
    }

    /// Reject settings the importer cannot work with.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        self.separator()?;
        self.columns.to_column_map()?;
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# coasync configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/coasync/coasync.toml  (defines your baseline)
#   Local:  <source_dir>/.coasync.toml      (per-sheet overrides)
#   Env:    COASYNC_* environment variables (e.g. COASYNC_COLUMNS__ID=A)

# Each import reads one CSV export of a single worksheet. Export the income
# and expense sheet and the balance sheet separately, not the whole workbook.

# JSON file holding categories, groups and the category tree
# store_path = "~/.coasync/store.json"

# Separator between segments of a group path ("Income - Sales")
# path_separator = "-"

# Set to true if the first row holds column titles
# has_headers = false

[columns]
# id = "A"
# group = "B"
# name = "C"
# range_a = "M"
# range_b = "N"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_config_when_loading_then_uses_defaults() {
        let settings = Settings::load(None).expect("load defaults");
        assert!(settings
            .store_path
            .to_string_lossy()
            .ends_with("store.json"));
        assert_eq!(settings.path_separator, "-");
        assert_eq!(settings.columns, ColumnsConfig::default());
    }

    #[test]
    fn given_tilde_in_store_path_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            store_path: PathBuf::from("~/.coasync/store.json"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let store = settings.store_path.to_string_lossy();
        assert!(
            store.starts_with(&home),
            "store_path should start with home dir: {}",
            store
        );
        assert!(!store.contains('~'), "store_path should not contain tilde");
    }

    #[test]
    fn given_partial_overlay_when_merging_then_keeps_unspecified_values() {
        let base = Settings::default();
        let raw = RawSettings {
            path_separator: Some("/".into()),
            columns: RawColumnsConfig {
                group: Some("E".into()),
                name: Some("F".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let result = base.overlay(&raw);

        assert_eq!(result.path_separator, "/");
        assert_eq!(result.columns.group, "E");
        assert_eq!(result.columns.name, "F");
        assert_eq!(result.columns.id, "A");
        assert_eq!(result.columns.range_a, "M");
        assert_eq!(result.store_path, base.store_path);
        assert!(!result.has_headers);
    }

    #[test]
    fn given_default_columns_when_decoding_then_matches_sheet_layout() {
        let map = ColumnsConfig::default().to_column_map().unwrap();
        assert_eq!(map, ColumnMap::default());
    }

    #[test]
    fn given_empty_separator_when_validating_then_fails() {
        let settings = Settings {
            path_separator: String::new(),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ApplicationError::Domain(DomainError::EmptySeparator))
        ));
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("parse template");
        assert!(raw.store_path.is_none());
    }
}
