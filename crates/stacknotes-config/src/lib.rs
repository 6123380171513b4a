use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Namespace used for storage keys when the config does not name one
pub const DEFAULT_NAMESPACE: &str = "stacknotes";

/// Delay between the last edit of a region and its write to storage
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one snapshot file per region
    #[serde(default = "Config::default_data_path")]
    pub data_path: PathBuf,
    /// Application namespace prefixed to every storage key
    #[serde(default = "Config::default_namespace")]
    pub namespace: String,
    #[serde(default = "Config::default_debounce_ms")]
    pub autosave_debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: Self::default_data_path(),
            namespace: Self::default_namespace(),
            autosave_debounce_ms: Self::default_debounce_ms(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded data path
        config.data_path = Self::expand_path(&config.data_path).unwrap_or(config.data_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/stacknotes");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    fn default_data_path() -> PathBuf {
        let data_dir = shellexpand::tilde("~/.local/share/stacknotes");
        PathBuf::from(data_dir.as_ref())
    }

    fn default_namespace() -> String {
        DEFAULT_NAMESPACE.to_string()
    }

    fn default_debounce_ms() -> u64 {
        DEFAULT_AUTOSAVE_DEBOUNCE_MS
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/stacknotes/config.toml"));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.namespace, "stacknotes");
        assert_eq!(config.autosave_debounce(), Duration::from_millis(500));
        assert!(!config.data_path.to_string_lossy().starts_with('~'));
        assert!(
            config
                .data_path
                .to_string_lossy()
                .ends_with(".local/share/stacknotes")
        );
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: Config = toml::from_str(r#"namespace = "work""#).unwrap();

        assert_eq!(config.namespace, "work");
        assert_eq!(config.autosave_debounce_ms, DEFAULT_AUTOSAVE_DEBOUNCE_MS);
        assert_eq!(config.data_path, Config::default_data_path());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = Config {
            data_path: PathBuf::from("/tmp/test-notes"),
            namespace: "scratch".to_string(),
            autosave_debounce_ms: 250,
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("STACKNOTES_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$STACKNOTES_TEST_VAR/subdir");
        let expanded = Config::expand_path(&path);

        assert_eq!(expanded, Some(PathBuf::from("/test/env/path/subdir")));

        unsafe {
            env::remove_var("STACKNOTES_TEST_VAR");
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_config_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "autosave_debounce_ms = \"soon\"").unwrap();

        let result = Config::load_from_path(&config_file);

        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            data_path: PathBuf::from("/tmp/test-notes"),
            namespace: "stacknotes".to_string(),
            autosave_debounce_ms: 1000,
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_config_with_env_var_in_toml() {
        unsafe {
            env::set_var("STACKNOTES_ROOT", "/custom/notes");
        }

        let config_content = r#"
data_path = "$STACKNOTES_ROOT/regions"
"#;

        let mut config: Config = toml::from_str(config_content).unwrap();
        config.data_path = Config::expand_path(&config.data_path).unwrap_or(config.data_path);

        assert_eq!(config.data_path, PathBuf::from("/custom/notes/regions"));

        unsafe {
            env::remove_var("STACKNOTES_ROOT");
        }
    }
}
