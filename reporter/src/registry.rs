//! Lookup table from test id (`class::method`) to Zephyr test case keys.
//!
//! Tests that do not declare keys on their descriptor are resolved here. The
//! table can be filled in code or loaded from a TOML companion file:
//!
//! ```toml
//! [cases]
//! "checkout::pays_with_card" = ["SHOP-T12", "SHOP-T13"]
//! ```

use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid test case key '{key}' for test '{test_id}'")]
    InvalidKey { test_id: String, key: String },

    #[error("Failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse registry file: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Deserialize)]
struct RegistryFile {
    #[serde(default)]
    cases: HashMap<String, Vec<String>>,
}

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_]*-T[0-9]+$").expect("test case key pattern is valid")
    })
}

pub fn is_valid_test_case_key(key: &str) -> bool {
    key_pattern().is_match(key)
}

#[derive(Debug, Clone, Default)]
pub struct TestCaseRegistry {
    cases: HashMap<String, Vec<String>>,
}

impl TestCaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<I, S>(&mut self, test_id: impl Into<String>, keys: I) -> RegistryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let test_id = test_id.into();
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();

        if let Some(bad) = keys.iter().find(|key| !is_valid_test_case_key(key)) {
            return Err(RegistryError::InvalidKey {
                test_id,
                key: bad.clone(),
            });
        }

        self.cases.insert(test_id, keys);
        Ok(())
    }

    /// Keys declared for `test_id`; empty when the test is unknown.
    pub fn lookup(&self, test_id: &str) -> &[String] {
        self.cases.get(test_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn from_toml_str(content: &str) -> RegistryResult<Self> {
        let file: RegistryFile = toml::from_str(content)?;
        let mut registry = Self::new();
        for (test_id, keys) in file.cases {
            registry.register(test_id, keys)?;
        }
        Ok(registry)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_key_validation() {
        assert!(is_valid_test_case_key("PROJ-T1"));
        assert!(is_valid_test_case_key("shop_2-T104"));
        assert!(!is_valid_test_case_key("PROJ-1"));
        assert!(!is_valid_test_case_key("-T1"));
        assert!(!is_valid_test_case_key("PROJ-T"));
        assert!(!is_valid_test_case_key(" PROJ-T1"));
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = TestCaseRegistry::new();
        registry
            .register("FooTest::test_bar", ["PROJ-T1", "PROJ-T2"])
            .unwrap();

        assert_eq!(registry.lookup("FooTest::test_bar"), ["PROJ-T1", "PROJ-T2"]);
        assert!(registry.lookup("FooTest::unknown").is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_bad_key() {
        let mut registry = TestCaseRegistry::new();
        let err = registry
            .register("FooTest::test_bar", ["PROJ-T1", "not a key"])
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidKey { ref key, .. } if key == "not a key"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_from_toml_str() {
        let registry = TestCaseRegistry::from_toml_str(
            r#"
            [cases]
            "checkout::pays_with_card" = ["SHOP-T12", "SHOP-T13"]
            "checkout::refunds" = []
            "#,
        )
        .unwrap();

        assert_eq!(
            registry.lookup("checkout::pays_with_card"),
            ["SHOP-T12", "SHOP-T13"]
        );
        assert!(registry.lookup("checkout::refunds").is_empty());
    }

    #[test]
    fn test_from_toml_str_without_cases_table() {
        let registry = TestCaseRegistry::from_toml_str("").unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cases]\n\"a::b\" = [\"PROJ-T7\"]").unwrap();

        let registry = TestCaseRegistry::from_toml_file(file.path()).unwrap();
        assert_eq!(registry.lookup("a::b"), ["PROJ-T7"]);

        assert!(matches!(
            TestCaseRegistry::from_toml_file("/nonexistent/cases.toml"),
            Err(RegistryError::Io(_))
        ));
        assert!(matches!(
            TestCaseRegistry::from_toml_str("[cases]\n\"a::b\" = 5"),
            Err(RegistryError::Parse(_))
        ));
    }
}
