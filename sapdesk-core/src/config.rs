use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::{ApiClient, HttpTransport, DEFAULT_API_PREFIX};
use crate::view::DEFAULT_EMPTY_MESSAGE;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Console settings stored as YAML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the project API server
    pub api_url: String,
    /// Path prefix every resource lives under
    pub api_prefix: String,
    /// Empty-state message per collection, e.g. `requirements`
    pub empty_messages: BTreeMap<String, String>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        let empty_messages = [
            ("projects", "No projects yet. Create one to get started."),
            ("scenarios", "No scenarios defined for this project."),
            ("requirements", "No requirements match the current filters."),
            ("wricef-items", "No WRICEF items yet. Convert a Gap requirement to create one."),
            ("config-items", "No configuration items yet. Convert a Fit requirement to create one."),
            ("tests", "No test cases yet."),
            ("analyses", "No analyses yet."),
            ("sessions", "No sessions yet."),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            empty_messages,
        }
    }
}

impl ConsoleConfig {
    /// Loads the configuration from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Loads the configuration, or the defaults if the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save the configuration to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Writes a default configuration file if none exists; returns true if written
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<bool> {
        if path.as_ref().exists() {
            return Ok(false);
        }
        Self::default().save(path)?;
        Ok(true)
    }

    /// Applies the environment override, then the command-line one
    pub fn apply_overrides(&mut self, env_url: Option<String>, flag_url: Option<&str>) {
        if let Some(url) = env_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
        if let Some(url) = flag_url {
            self.api_url = url.to_string();
        }
    }

    /// Empty-state message for a collection
    pub fn empty_message(&self, collection: &str) -> &str {
        self.empty_messages
            .get(collection)
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_EMPTY_MESSAGE)
    }

    /// Builds an HTTP-backed client for the configured server
    pub fn client(&self) -> Result<ApiClient> {
        let transport = HttpTransport::new(&self.api_url)
            .with_context(|| format!("Failed to set up HTTP client for {}", self.api_url))?;
        Ok(ApiClient::with_prefix(Box::new(transport), &self.api_prefix))
    }
}

/// Gets the path to the configuration file
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("SAPDESK_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    let config_dir = dirs::config_dir().context("Failed to determine config directory")?;

    Ok(config_dir.join("sapdesk").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConsoleConfig::load_or_default(dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.api_prefix, "/api/v1");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "api_url: http://sap-pm.internal:9000\n").unwrap();

        let config = ConsoleConfig::load(&path).unwrap();
        assert_eq!(config.api_url, "http://sap-pm.internal:9000");
        assert_eq!(config.api_prefix, DEFAULT_API_PREFIX);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "api_url: [unterminated\n").unwrap();
        let err = ConsoleConfig::load_or_default(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_create_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        assert!(ConsoleConfig::create_default(&path).unwrap());

        let mut edited = ConsoleConfig::load(&path).unwrap();
        edited.api_url = "http://other:1".into();
        edited.save(&path).unwrap();

        assert!(!ConsoleConfig::create_default(&path).unwrap());
        assert_eq!(ConsoleConfig::load(&path).unwrap().api_url, "http://other:1");
    }

    #[test]
    fn test_flag_beats_environment() {
        let mut config = ConsoleConfig::default();
        config.apply_overrides(Some("http://env:1".into()), None);
        assert_eq!(config.api_url, "http://env:1");
        config.apply_overrides(Some("http://env:1".into()), Some("http://flag:2"));
        assert_eq!(config.api_url, "http://flag:2");
    }

    #[test]
    fn test_empty_message_lookup() {
        let config = ConsoleConfig::default();
        assert!(config.empty_message("wricef-items").contains("Gap"));
        assert_eq!(config.empty_message("unknown"), DEFAULT_EMPTY_MESSAGE);
    }
}
