//! Engine configuration.
//!
//! Configuration is optional YAML; every field has a default so an empty
//! file (or no file) yields the stock engine.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::classify::EventType;

/// File names searched for in the working directory, in order.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["svcs.yaml", ".svcs.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub version: String,
    /// Event type names to drop from results.
    #[serde(default)]
    pub disabled_events: Vec<String>,
    /// Glob patterns for paths the engine skips (e.g., "**/migrations/**").
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// File extensions routed to the engine, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["py".to_string(), "pyi".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: String::new(),
            disabled_events: Vec::new(),
            excluded_paths: Vec::new(),
            extensions: default_extensions(),
        }
    }
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse_str(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Load the configuration named on the command line, or the first one
    /// discovered. No file at all yields the default configuration.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => discover(),
        };
        let config = match path {
            Some(p) => {
                tracing::debug!(path = %p.display(), "loading config");
                Self::parse_file(&p)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parsed disabled event types. Unknown names are skipped here; use
    /// [`Config::validate`] to reject them.
    pub fn disabled(&self) -> Vec<EventType> {
        self.disabled_events
            .iter()
            .filter_map(|name| EventType::parse(name))
            .collect()
    }

    pub fn is_event_enabled(&self, event: EventType) -> bool {
        !self.disabled_events.iter().any(|name| name == event.as_str())
    }

    pub fn handles_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }

    /// Compile `excluded_paths` into a matcher.
    pub fn exclusions(&self) -> anyhow::Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern)
                .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
            builder.add(glob);
        }
        Ok(builder.build()?)
    }

    /// Validate a configuration for correctness.
    pub fn validate(&self) -> anyhow::Result<()> {
        for name in &self.disabled_events {
            if EventType::parse(name).is_none() {
                anyhow::bail!("unknown event type {:?} in disabled_events", name);
            }
        }

        self.exclusions()?;

        if self.extensions.iter().any(|e| e.starts_with('.') || e.is_empty()) {
            anyhow::bail!("extensions must be given without a leading dot");
        }

        Ok(())
    }
}

/// Find a configuration file: working directory first, then the user
/// config directory.
pub fn discover() -> Option<PathBuf> {
    for name in DEFAULT_CONFIG_NAMES {
        let path = PathBuf::from(name);
        if path.exists() {
            return Some(path);
        }
    }
    user_config_path().filter(|p| p.exists())
}

/// `svcs.yaml` in the platform config directory.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "svcs").map(|dirs| dirs.config_dir().join(DEFAULT_CONFIG_NAMES[0]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
version: "1"
disabled_events:
  - string_literal_usage_changed
  - numeric_literal_usage_changed
excluded_paths:
  - "**/migrations/**"
"#;
        let config = Config::parse_str(yaml).unwrap();
        assert_eq!(config.disabled_events.len(), 2);
        assert_eq!(config.extensions, vec!["py", "pyi"]);
        assert!(config.validate().is_ok());
        assert!(!config.is_event_enabled(EventType::StringLiteralUsageChanged));
        assert!(config.is_event_enabled(EventType::FunctionComplexityChanged));
        assert_eq!(
            config.disabled(),
            vec![
                EventType::StringLiteralUsageChanged,
                EventType::NumericLiteralUsageChanged
            ]
        );
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::parse_str("  \n").unwrap();
        assert!(config.disabled_events.is_empty());
        assert!(config.handles_extension("py"));
        assert!(!config.handles_extension("rs"));
    }

    #[test]
    fn test_unknown_event_rejected() {
        let config = Config::parse_str("disabled_events: [made_up_event]\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("made_up_event"));
    }

    #[test]
    fn test_bad_glob_rejected() {
        let config = Config::parse_str("excluded_paths: [\"a/[\"]\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_exclusions_match() {
        let config = Config::parse_str("excluded_paths: [\"**/migrations/**\"]\n").unwrap();
        let set = config.exclusions().unwrap();
        assert!(set.is_match("app/migrations/0001_initial.py"));
        assert!(!set.is_match("app/models.py"));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "extensions: [py]").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.extensions, vec!["py"]);
    }
}
