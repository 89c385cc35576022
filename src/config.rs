use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::gemini_client::DEFAULT_MODEL;

const SCHEMA_VERSION: u32 = 1;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration exposed to the frontend.
///
/// Secrets are reported only as present/absent so they never travel back over IPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    pub gemini_model: String,
    pub request_timeout_secs: u64,
    pub has_gemini_api_key: bool,
    pub has_firebase_api_key: bool,
    pub firebase_project_id: String,
    pub storage_dir: Option<String>,
}

/// Fields the frontend may change. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub firebase_api_key: Option<String>,
    pub firebase_project_id: Option<String>,
}

/// Internal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub schema_version: u32,
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default = "default_model")]
    pub gemini_model: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub firebase_api_key: String,
    #[serde(default)]
    pub firebase_project_id: String,
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            gemini_api_key: String::new(),
            gemini_model: default_model(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            firebase_api_key: String::new(),
            firebase_project_id: String::new(),
            storage_dir: None,
        }
    }
}

impl Config {
    /// Get the default config directory
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".rupveda"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Directory holding the key/value files of the local store
    pub fn resolved_storage_dir(&self) -> Result<PathBuf> {
        match self.storage_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => Ok(Self::config_dir()?.join("storage")),
        }
    }

    /// Load config from file or return default, then apply environment overrides
    pub fn load_or_default() -> Self {
        let mut config = match Self::load() {
            Ok(config) => config,
            Err(e) => {
                debug!("Failed to load config, using default: {}", e);
                Self::default()
            }
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Load config from file
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// `GEMINI_API_KEY` wins over `API_KEY`; both win over the file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = lookup("GEMINI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .or_else(|| lookup("API_KEY").filter(|k| !k.trim().is_empty()));
        if let Some(key) = key {
            self.gemini_api_key = key;
        }
        if let Some(key) = lookup("FIREBASE_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.firebase_api_key = key;
        }
        if let Some(project) = lookup("FIREBASE_PROJECT_ID").filter(|p| !p.trim().is_empty()) {
            self.firebase_project_id = project;
        }
    }

    /// Returns a list of human-readable problems; empty means the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.gemini_model.trim().is_empty() {
            problems.push("Gemini model name must not be empty".to_string());
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 600 {
            problems.push(format!(
                "Request timeout must be between 1 and 600 seconds, got {}",
                self.request_timeout_secs
            ));
        }
        if !self.firebase_api_key.is_empty() && self.firebase_project_id.trim().is_empty() {
            problems.push("Firebase project id is required when a Firebase API key is set".to_string());
        }
        problems
    }

    pub fn has_firebase(&self) -> bool {
        !self.firebase_api_key.trim().is_empty() && !self.firebase_project_id.trim().is_empty()
    }

    /// Convert to frontend view
    pub fn to_view(&self) -> ConfigView {
        ConfigView {
            gemini_model: self.gemini_model.clone(),
            request_timeout_secs: self.request_timeout_secs,
            has_gemini_api_key: !self.gemini_api_key.trim().is_empty(),
            has_firebase_api_key: !self.firebase_api_key.trim().is_empty(),
            firebase_project_id: self.firebase_project_id.clone(),
            storage_dir: self
                .storage_dir
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
        }
    }

    /// Update from frontend changes
    pub fn apply_update(&mut self, update: &ConfigUpdate) {
        if let Some(ref key) = update.gemini_api_key {
            self.gemini_api_key = key.trim().to_string();
        }
        if let Some(ref model) = update.gemini_model {
            self.gemini_model = model.trim().to_string();
        }
        if let Some(timeout) = update.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
        if let Some(ref key) = update.firebase_api_key {
            self.firebase_api_key = key.trim().to_string();
        }
        if let Some(ref project) = update.firebase_project_id {
            self.firebase_project_id = project.trim().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_version, 1);
        assert_eq!(config.gemini_model, "gemini-2.5-flash-image");
        assert_eq!(config.request_timeout_secs, 60);
        assert!(config.gemini_api_key.is_empty());
        assert!(config.storage_dir.is_none());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_view_hides_secrets() {
        let mut config = Config::default();
        config.gemini_api_key = "secret-key".to_string();

        let view = config.to_view();
        assert!(view.has_gemini_api_key);
        assert!(!view.has_firebase_api_key);

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("secret-key"));
    }

    #[test]
    fn test_env_override_precedence() {
        let env: HashMap<&str, &str> =
            [("GEMINI_API_KEY", "from-gemini"), ("API_KEY", "from-api")].into();
        let mut config = Config::default();
        config.gemini_api_key = "from-file".to_string();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.gemini_api_key, "from-gemini");

        let env: HashMap<&str, &str> = [("API_KEY", "from-api")].into();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.gemini_api_key, "from-api");
    }

    #[test]
    fn test_blank_env_does_not_override() {
        let mut config = Config::default();
        config.gemini_api_key = "from-file".to_string();
        config.apply_env_overrides(|k| (k == "GEMINI_API_KEY").then(|| "  ".to_string()));
        assert_eq!(config.gemini_api_key, "from-file");
    }

    #[test]
    fn test_validate_reports_problems() {
        let mut config = Config::default();
        config.gemini_model = " ".to_string();
        config.request_timeout_secs = 0;
        config.firebase_api_key = "abc".to_string();

        let problems = config.validate();
        assert_eq!(problems.len(), 3);
        assert!(!config.has_firebase());
    }

    #[test]
    fn test_apply_update_partial() {
        let mut config = Config::default();
        config.apply_update(&ConfigUpdate {
            gemini_model: Some(" gemini-custom ".to_string()),
            ..Default::default()
        });
        assert_eq!(config.gemini_model, "gemini-custom");
        assert_eq!(config.request_timeout_secs, 60);

        config.apply_update(&ConfigUpdate {
            firebase_api_key: Some("k".to_string()),
            firebase_project_id: Some("p".to_string()),
            ..Default::default()
        });
        assert!(config.has_firebase());
    }

    #[test]
    fn test_old_file_without_new_fields_parses() {
        let config: Config = serde_json::from_str(r#"{"schema_version": 1}"#).unwrap();
        assert_eq!(config.gemini_model, "gemini-2.5-flash-image");
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    fn test_storage_dir_resolution() {
        let mut config = Config::default();
        let path = config.resolved_storage_dir().unwrap();
        assert!(path.to_string_lossy().contains(".rupveda"));
        assert!(path.ends_with("storage"));

        config.storage_dir = Some(PathBuf::from("/tmp/custom"));
        assert_eq!(config.resolved_storage_dir().unwrap(), PathBuf::from("/tmp/custom"));
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path().unwrap();
        assert!(path.to_string_lossy().ends_with("config.json"));
    }
}
