//! Settings file and command line merging

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable naming an alternative settings file
pub const CONFIG_ENV: &str = "PODSTATUS_CONFIG";

/// Namespace used when nothing else names one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Contents of the optional TOML settings file
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub context: Option<String>,
    pub namespace: Option<String>,
    pub show_events: Option<bool>,
    pub headers: Option<bool>,
}

impl FileConfig {
    /// Default location of the settings file
    fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".config").join("podstatus").join("config.toml"))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse config file")
    }

    /// Read the settings file at `path`
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&raw).context(format!("Invalid config file: {}", path.display()))
    }

    /// Load the explicit file if one is given, else the default one if present
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Self::read(Path::new(&path));
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::read(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Command line values that may override the settings file
#[derive(Debug, Default)]
pub struct Overrides {
    pub context: Option<String>,
    pub namespace: Option<String>,
    pub no_events: bool,
    pub no_headers: bool,
}

/// Effective settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Kubeconfig context, `None` for the current one
    pub context: Option<String>,
    /// Namespace from the command line or settings file
    pub namespace: Option<String>,
    pub show_events: bool,
    pub headers: bool,
}

impl Config {
    pub fn new(file: FileConfig, overrides: Overrides) -> Self {
        Self {
            context: overrides.context.or(file.context),
            namespace: overrides.namespace.or(file.namespace),
            show_events: !overrides.no_events && file.show_events.unwrap_or(true),
            headers: !overrides.no_headers && file.headers.unwrap_or(true),
        }
    }

    /// Namespace to use, given the one configured on the kubeconfig context
    pub fn namespace_or(&self, context_namespace: Option<String>) -> String {
        self.namespace
            .clone()
            .or(context_namespace)
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file() {
        let file = FileConfig::parse(
            r#"
            context = "staging"
            namespace = "payments"
            show_events = false
            "#,
        )
        .unwrap();

        assert_eq!(file.context.as_deref(), Some("staging"));
        assert_eq!(file.namespace.as_deref(), Some("payments"));
        assert_eq!(file.show_events, Some(false));
        assert_eq!(file.headers, None);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(FileConfig::parse("colour = true").is_err());
    }

    #[test]
    fn test_command_line_wins() {
        let file = FileConfig {
            context: Some("staging".to_string()),
            namespace: Some("payments".to_string()),
            show_events: Some(true),
            headers: Some(true),
        };
        let overrides = Overrides {
            context: Some("prod".to_string()),
            namespace: None,
            no_events: true,
            no_headers: false,
        };

        let config = Config::new(file, overrides);
        assert_eq!(config.context.as_deref(), Some("prod"));
        assert_eq!(config.namespace.as_deref(), Some("payments"));
        assert!(!config.show_events);
        assert!(config.headers);
    }

    #[test]
    fn test_file_can_disable_headers() {
        let file = FileConfig {
            headers: Some(false),
            ..Default::default()
        };
        let config = Config::new(file, Overrides::default());
        assert!(!config.headers);
        assert!(config.show_events);
    }

    #[test]
    fn test_namespace_fallback() {
        let config = Config::new(FileConfig::default(), Overrides::default());
        assert_eq!(config.namespace_or(None), "default");
        assert_eq!(config.namespace_or(Some("team-a".to_string())), "team-a");

        let config = Config::new(
            FileConfig::default(),
            Overrides {
                namespace: Some("kube-system".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(config.namespace_or(Some("team-a".to_string())), "kube-system");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let missing = Path::new("/nonexistent/podstatus/config.toml");
        assert!(FileConfig::load(Some(missing)).is_err());
    }
}
