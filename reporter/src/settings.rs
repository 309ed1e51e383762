//! Reporter settings loaded from environment variables or a TOML file.

use crate::registry::{RegistryResult, TestCaseRegistry};
use crate::reporter::CycleOptions;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use zephyr::{Credentials, ZephyrConfig, DEFAULT_BASE_URL};

pub mod defaults {
    pub const CYCLE_TITLE: &str = "Zephyr Automated Cycle";
    pub const CYCLE_DESCRIPTION: &str = "Test Cycle created through Zephyr Reporter";
    pub const TIMEOUT_SECS: u64 = 30;
}

pub mod vars {
    pub const PROJECT_KEY: &str = "ZEPHYR_PROJECT_KEY";
    pub const AUTH_TOKEN: &str = "ZEPHYR_AUTH_TOKEN";
    pub const USER_ID: &str = "ZEPHYR_USER_ID";
    pub const FOLDER_ID: &str = "ZEPHYR_FOLDER_ID";
    pub const CYCLE_KEY: &str = "ZEPHYR_CYCLE_KEY";
    pub const CYCLE_TITLE: &str = "ZEPHYR_CYCLE_TITLE";
    pub const CYCLE_DESCRIPTION: &str = "ZEPHYR_CYCLE_DESCRIPTION";
    pub const BASE_URL: &str = "ZEPHYR_BASE_URL";
    pub const TIMEOUT_SECS: &str = "ZEPHYR_TIMEOUT_SECS";
    pub const FAIL_ON_CYCLE_ERROR: &str = "ZEPHYR_FAIL_ON_CYCLE_ERROR";
    pub const CASES_FILE: &str = "ZEPHYR_CASES_FILE";
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Missing required setting: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid setting: {0}")]
    InvalidValue(&'static str),

    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    project_key: String,
    auth_token: Option<SecretString>,
    user_id: String,
    folder_id: Option<u64>,
    cycle_key: Option<String>,
    cycle_title: Option<String>,
    cycle_description: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    fail_on_cycle_error: Option<bool>,
    cases_file: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ReporterSettings {
    pub project_key: String,
    pub auth_token: SecretString,
    pub user_id: String,
    pub folder_id: Option<u64>,
    /// Report into this cycle instead of creating one.
    pub existing_cycle_key: Option<String>,
    pub cycle_title: String,
    pub cycle_description: String,
    pub base_url: String,
    pub timeout: Duration,
    pub fail_on_cycle_error: bool,
    pub cases_file: Option<PathBuf>,
}

impl ReporterSettings {
    /// Load settings from `ZEPHYR_*` environment variables.
    ///
    /// Required: `ZEPHYR_PROJECT_KEY`, `ZEPHYR_AUTH_TOKEN`, `ZEPHYR_USER_ID`.
    /// Everything else has a default or is optional.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`ReporterSettings::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let project_key =
            get(vars::PROJECT_KEY).ok_or(SettingsError::MissingEnvVar(vars::PROJECT_KEY))?;
        let auth_token =
            get(vars::AUTH_TOKEN).ok_or(SettingsError::MissingEnvVar(vars::AUTH_TOKEN))?;
        let user_id =
            get(vars::USER_ID).ok_or(SettingsError::MissingEnvVar(vars::USER_ID))?;

        let folder_id = get(vars::FOLDER_ID)
            .map(|value| value.trim().parse::<u64>())
            .transpose()
            .map_err(|_| SettingsError::InvalidValue("ZEPHYR_FOLDER_ID must be a number"))?;

        let timeout_secs = get(vars::TIMEOUT_SECS)
            .map(|value| value.trim().parse::<u64>())
            .transpose()
            .map_err(|_| SettingsError::InvalidValue("ZEPHYR_TIMEOUT_SECS must be a number"))?
            .unwrap_or(defaults::TIMEOUT_SECS);

        let fail_on_cycle_error = match get(vars::FAIL_ON_CYCLE_ERROR) {
            Some(value) => parse_flag(&value).ok_or(SettingsError::InvalidValue(
                "ZEPHYR_FAIL_ON_CYCLE_ERROR must be true or false",
            ))?,
            None => false,
        };

        let settings = Self {
            project_key,
            auth_token: SecretString::from(auth_token),
            user_id,
            folder_id,
            existing_cycle_key: get(vars::CYCLE_KEY),
            cycle_title: get(vars::CYCLE_TITLE)
                .unwrap_or_else(|| defaults::CYCLE_TITLE.to_string()),
            cycle_description: get(vars::CYCLE_DESCRIPTION)
                .unwrap_or_else(|| defaults::CYCLE_DESCRIPTION.to_string()),
            base_url: get(vars::BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            fail_on_cycle_error,
            cases_file: get(vars::CASES_FILE).map(PathBuf::from),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file. A missing `auth_token` falls back to
    /// `ZEPHYR_AUTH_TOKEN` so the token can stay out of the file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let file: SettingsFile = toml::from_str(content)?;

        let auth_token = file
            .auth_token
            .filter(|token| !token.expose_secret().trim().is_empty())
            .or_else(|| env::var(vars::AUTH_TOKEN).ok().map(SecretString::from))
            .filter(|token| !token.expose_secret().trim().is_empty())
            .ok_or(SettingsError::MissingEnvVar(vars::AUTH_TOKEN))?;

        let settings = Self {
            project_key: file.project_key,
            auth_token,
            user_id: file.user_id,
            folder_id: file.folder_id,
            existing_cycle_key: file.cycle_key.filter(|key| !key.trim().is_empty()),
            cycle_title: file
                .cycle_title
                .unwrap_or_else(|| defaults::CYCLE_TITLE.to_string()),
            cycle_description: file
                .cycle_description
                .unwrap_or_else(|| defaults::CYCLE_DESCRIPTION.to_string()),
            base_url: file
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(defaults::TIMEOUT_SECS)),
            fail_on_cycle_error: file.fail_on_cycle_error.unwrap_or(false),
            cases_file: file.cases_file,
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.project_key.trim().is_empty() {
            return Err(SettingsError::InvalidValue("project key cannot be empty"));
        }

        if self.user_id.trim().is_empty() {
            return Err(SettingsError::InvalidValue("user id cannot be empty"));
        }

        if self.timeout.is_zero() {
            return Err(SettingsError::InvalidValue("timeout must be greater than 0"));
        }

        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        let mut credentials = Credentials::new(
            self.project_key.clone(),
            self.auth_token.expose_secret().to_string(),
            self.user_id.clone(),
        );
        credentials.folder_id = self.folder_id;
        credentials
    }

    pub fn client_config(&self) -> ZephyrConfig {
        ZephyrConfig::new()
            .with_base_url(self.base_url.clone())
            .with_timeout(self.timeout)
    }

    pub fn cycle_options(&self) -> CycleOptions {
        let mut options = CycleOptions::new()
            .with_title(self.cycle_title.clone())
            .with_description(self.cycle_description.clone())
            .fail_on_cycle_error(self.fail_on_cycle_error);
        if let Some(key) = &self.existing_cycle_key {
            options = options.with_existing_cycle_key(key.clone());
        }
        options
    }

    /// The test case registry named by `cases_file`, or an empty one.
    pub fn load_registry(&self) -> RegistryResult<TestCaseRegistry> {
        match &self.cases_file {
            Some(path) => TestCaseRegistry::from_toml_file(path),
            None => Ok(TestCaseRegistry::new()),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        (vars::PROJECT_KEY, "PROJ"),
        (vars::AUTH_TOKEN, "secret-token"),
        (vars::USER_ID, "user-1"),
        (vars::FOLDER_ID, "42"),
    ];

    #[test]
    fn test_from_lookup_defaults() {
        let settings = ReporterSettings::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(settings.project_key, "PROJ");
        assert_eq!(settings.auth_token.expose_secret(), "secret-token");
        assert_eq!(settings.user_id, "user-1");
        assert_eq!(settings.folder_id, Some(42));
        assert_eq!(settings.existing_cycle_key, None);
        assert_eq!(settings.cycle_title, defaults::CYCLE_TITLE);
        assert_eq!(settings.cycle_description, defaults::CYCLE_DESCRIPTION);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(!settings.fail_on_cycle_error);
        assert!(settings.cases_file.is_none());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            (vars::CYCLE_KEY, "PROJ-R9"),
            (vars::CYCLE_TITLE, "Nightly"),
            (vars::BASE_URL, "http://127.0.0.1:9999"),
            (vars::TIMEOUT_SECS, "5"),
            (vars::FAIL_ON_CYCLE_ERROR, "yes"),
            (vars::CASES_FILE, "cases.toml"),
        ]);

        let settings = ReporterSettings::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(settings.existing_cycle_key.as_deref(), Some("PROJ-R9"));
        assert_eq!(settings.cycle_title, "Nightly");
        assert_eq!(settings.base_url, "http://127.0.0.1:9999");
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert!(settings.fail_on_cycle_error);
        assert_eq!(settings.cases_file, Some(PathBuf::from("cases.toml")));
    }

    #[test]
    fn test_from_lookup_missing_required() {
        let result = ReporterSettings::from_lookup(lookup_from(&REQUIRED[1..]));
        assert!(matches!(
            result,
            Err(SettingsError::MissingEnvVar("ZEPHYR_PROJECT_KEY"))
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs[1] = (vars::AUTH_TOKEN, "   ");
        let result = ReporterSettings::from_lookup(lookup_from(&pairs));
        assert!(matches!(
            result,
            Err(SettingsError::MissingEnvVar("ZEPHYR_AUTH_TOKEN"))
        ));
    }

    #[test]
    fn test_from_lookup_invalid_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs[3] = (vars::FOLDER_ID, "abc");
        assert!(matches!(
            ReporterSettings::from_lookup(lookup_from(&pairs)),
            Err(SettingsError::InvalidValue(_))
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push((vars::FAIL_ON_CYCLE_ERROR, "maybe"));
        assert!(matches!(
            ReporterSettings::from_lookup(lookup_from(&pairs)),
            Err(SettingsError::InvalidValue(_))
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs.push((vars::TIMEOUT_SECS, "0"));
        assert!(matches!(
            ReporterSettings::from_lookup(lookup_from(&pairs)),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_folder_and_cycle_are_optional() {
        let settings = ReporterSettings::from_lookup(lookup_from(&REQUIRED[..3])).unwrap();
        assert_eq!(settings.folder_id, None);
        assert_eq!(settings.existing_cycle_key, None);

        let mut pairs = REQUIRED[..3].to_vec();
        pairs.push((vars::CYCLE_KEY, "CYC-9"));
        let settings = ReporterSettings::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(settings.folder_id, None);
        assert_eq!(settings.existing_cycle_key.as_deref(), Some("CYC-9"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let settings = ReporterSettings::from_lookup(lookup_from(&REQUIRED)).unwrap();
        assert!(!format!("{:?}", settings).contains("secret-token"));
    }

    #[test]
    fn test_derived_client_settings() {
        let settings = ReporterSettings::from_lookup(lookup_from(&REQUIRED)).unwrap();

        let credentials = settings.credentials();
        assert_eq!(credentials.project_key, "PROJ");
        assert_eq!(credentials.auth_token.expose_secret(), "secret-token");
        assert_eq!(credentials.folder_id, Some(42));

        let config = settings.client_config();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));

        let options = settings.cycle_options();
        assert_eq!(options.existing_cycle_key, None);
        assert_eq!(options.title, defaults::CYCLE_TITLE);

        assert!(settings.load_registry().unwrap().is_empty());
    }

    #[test]
    fn test_from_toml_str() {
        let settings = ReporterSettings::from_toml_str(
            r#"
            project_key = "PROJ"
            auth_token = "file-token"
            user_id = "user-1"
            cycle_key = "PROJ-R3"
            timeout_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(settings.auth_token.expose_secret(), "file-token");
        assert!(!format!("{:?}", settings).contains("file-token"));
        assert_eq!(settings.existing_cycle_key.as_deref(), Some("PROJ-R3"));
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.cycle_title, defaults::CYCLE_TITLE);
    }

    #[test]
    fn test_from_toml_str_rejects_unknown_fields() {
        let result = ReporterSettings::from_toml_str(
            r#"
            project_key = "PROJ"
            auth_token = "t"
            user_id = "u"
            folder_id = 1
            folderid = 2
            "#,
        );
        assert!(matches!(result, Err(SettingsError::Parse(_))));
    }

    #[test]
    #[serial]
    fn test_from_toml_file_token_falls_back_to_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "project_key = \"PROJ\"\nuser_id = \"user-1\"\nfolder_id = 5\n"
        )
        .unwrap();

        env::set_var(vars::AUTH_TOKEN, "env-token");
        let settings = ReporterSettings::from_toml_file(file.path());
        env::remove_var(vars::AUTH_TOKEN);

        let settings = settings.unwrap();
        assert_eq!(settings.auth_token.expose_secret(), "env-token");
        assert_eq!(settings.folder_id, Some(5));

        let blank = ReporterSettings::from_toml_str(
            "project_key = \"PROJ\"\nauth_token = \" \"\nuser_id = \"user-1\"\n",
        );
        assert!(matches!(
            blank,
            Err(SettingsError::MissingEnvVar("ZEPHYR_AUTH_TOKEN"))
        ));

        let missing = ReporterSettings::from_toml_file(file.path());
        assert!(matches!(
            missing,
            Err(SettingsError::MissingEnvVar("ZEPHYR_AUTH_TOKEN"))
        ));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        for (name, value) in REQUIRED {
            env::set_var(name, value);
        }
        let settings = ReporterSettings::from_env();
        for (name, _) in REQUIRED {
            env::remove_var(name);
        }

        let settings = settings.unwrap();
        assert_eq!(settings.project_key, "PROJ");
        assert_eq!(settings.folder_id, Some(42));
    }
}
