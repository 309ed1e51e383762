use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.zephyrscale.smartbear.com/v2/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZephyrConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ZephyrConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ZephyrConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("Base URL must start with http:// or https://".to_string());
        }

        if self.timeout.is_zero() {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Identity used for every call against one Zephyr Scale project.
///
/// `folder_id` is only needed when a new test cycle has to be created.
#[derive(Debug)]
pub struct Credentials {
    pub project_key: String,
    pub auth_token: SecretString,
    pub user_id: String,
    pub folder_id: Option<u64>,
}

impl Credentials {
    pub fn new(
        project_key: impl Into<String>,
        auth_token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            project_key: project_key.into(),
            auth_token: SecretString::from(auth_token.into()),
            user_id: user_id.into(),
            folder_id: None,
        }
    }

    pub fn with_folder_id(mut self, folder_id: u64) -> Self {
        self.folder_id = Some(folder_id);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.project_key.trim().is_empty() {
            return Err("Project key cannot be empty".to_string());
        }

        if self.auth_token.expose_secret().trim().is_empty() {
            return Err("Auth token cannot be empty".to_string());
        }

        if self.user_id.trim().is_empty() {
            return Err("User ID cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ZephyrConfig::default();
        assert_eq!(config.base_url, "https://api.zephyrscale.smartbear.com/v2/");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ZephyrConfig::new()
            .with_base_url("http://127.0.0.1:8080")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ZephyrConfig::default();

        config.base_url = "".to_string();
        assert!(config.validate().is_err());

        config.base_url = "api.zephyrscale.smartbear.com".to_string();
        assert!(config.validate().is_err());

        config.base_url = DEFAULT_BASE_URL.to_string();
        config.timeout = Duration::from_secs(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credentials_validation() {
        let creds = Credentials::new("PROJ", "token", "user-1").with_folder_id(12);
        assert!(creds.validate().is_ok());
        assert_eq!(creds.folder_id, Some(12));

        assert!(Credentials::new("", "token", "user-1").validate().is_err());
        assert!(Credentials::new("PROJ", "  ", "user-1").validate().is_err());
        assert!(Credentials::new("PROJ", "token", "").validate().is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let creds = Credentials::new("PROJ", "super-secret-token", "user-1");
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("super-secret-token"));
        assert!(rendered.contains("PROJ"));
    }
}
