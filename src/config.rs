//! Configuration for SheetDB
//!
//! Configuration lives in a YAML file:
//!
//! ```yaml
//! spreadsheet_id: "1AbCdEf..."
//! access_token: "ya29...."       # or set SHEETDB_ACCESS_TOKEN
//! api_base_url: "https://sheets.googleapis.com/v4/spreadsheets"
//! request_timeout_secs: 30
//! ```
//!
//! `SHEETDB_SPREADSHEET_ID` and `SHEETDB_ACCESS_TOKEN` override the file, so
//! credentials can stay out of it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_SPREADSHEET_ID: &str = "SHEETDB_SPREADSHEET_ID";
pub const ENV_ACCESS_TOKEN: &str = "SHEETDB_ACCESS_TOKEN";

pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identifier of the spreadsheet holding every table
    #[serde(default)]
    pub spreadsheet_id: String,
    /// OAuth bearer token, treated as opaque
    #[serde(default)]
    pub access_token: Option<String>,
    /// Sheets API endpoint, overridable for proxies and test servers
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            access_token: None,
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Load from a YAML file, apply environment overrides, and validate.
    ///
    /// A missing file is not an error when the environment supplies
    /// everything.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
                message: format!("failed to read '{}': {}", path.display(), e),
            })?;
            Self::from_yaml_str(&content)?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using environment only");
            Self::default()
        };

        let config = config.with_overrides(
            std::env::var(ENV_SPREADSHEET_ID).ok(),
            std::env::var(ENV_ACCESS_TOKEN).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML without consulting the environment
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Replace fields with values that are present and non-empty
    pub fn with_overrides(mut self, spreadsheet_id: Option<String>, access_token: Option<String>) -> Self {
        if let Some(id) = spreadsheet_id.filter(|v| !v.trim().is_empty()) {
            self.spreadsheet_id = id;
        }
        if let Some(token) = access_token.filter(|v| !v.trim().is_empty()) {
            self.access_token = Some(token);
        }
        self
    }

    /// Check that the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(Error::Config {
                message: format!("spreadsheet_id is required (or set {})", ENV_SPREADSHEET_ID),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config {
                message: "request_timeout_secs must be greater than zero".to_string(),
            });
        }
        self.access_token()?;
        Ok(())
    }

    /// The bearer token, or a config error naming where to put it
    pub fn access_token(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Config {
                message: format!("access_token is required (or set {})", ENV_ACCESS_TOKEN),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_fill_in() {
        let config = Config::from_yaml_str("spreadsheet_id: abc\naccess_token: t\n").unwrap();
        assert_eq!(config.spreadsheet_id, "abc");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let config = Config::from_yaml_str("spreadsheet_id: from-file\n")
            .unwrap()
            .with_overrides(Some("from-env".into()), Some("secret".into()));
        assert_eq!(config.spreadsheet_id, "from-env");
        assert_eq!(config.access_token().unwrap(), "secret");
    }

    #[test]
    fn test_blank_overrides_are_ignored() {
        let config = Config::from_yaml_str("spreadsheet_id: keep\n")
            .unwrap()
            .with_overrides(Some("  ".into()), None);
        assert_eq!(config.spreadsheet_id, "keep");
    }

    #[test]
    fn test_missing_fields_fail_validation() {
        let no_token = Config::from_yaml_str("spreadsheet_id: abc\n").unwrap();
        assert!(matches!(no_token.validate(), Err(Error::Config { .. })));

        let no_id = Config::from_yaml_str("access_token: t\n").unwrap();
        assert!(matches!(no_id.validate(), Err(Error::Config { .. })));

        let zero_timeout =
            Config::from_yaml_str("spreadsheet_id: a\naccess_token: t\nrequest_timeout_secs: 0\n").unwrap();
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            Config::from_yaml_str("spreadsheet_id: [unclosed"),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sheetdb.yaml");
        std::fs::write(
            &path,
            "spreadsheet_id: file-id\naccess_token: file-token\nrequest_timeout_secs: 5\n",
        )
        .unwrap();

        let config = Config::load(&path);
        // Environment may override in CI, but the file alone must be valid
        assert!(config.is_ok());
        assert_eq!(config.unwrap().request_timeout_secs, 5);
    }
}
