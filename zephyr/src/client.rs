use crate::api::{TestManagementApi, ZephyrError, ZephyrResult};
use crate::comment::{format_comment, Platform};
use crate::config::{Credentials, ZephyrConfig};
use crate::types::{CreatedTestResult, NewTestCycle, ResultSubmission, TestCycle, TestResult};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

const TEST_CYCLES_PATH: &str = "testcycles";
const TEST_EXECUTIONS_PATH: &str = "testexecutions";

/// Blocking client for the Zephyr Scale Cloud REST API.
///
/// Every request leaves with the bearer token and a JSON content type; both
/// are installed once as default headers when the client is built.
pub struct ZephyrClient {
    http_client: Client,
    base_url: String,
    credentials: Credentials,
    platform: Platform,
}

impl ZephyrClient {
    pub fn new(config: ZephyrConfig, credentials: Credentials) -> ZephyrResult<Self> {
        config
            .validate()
            .map_err(|msg| ZephyrError::InvalidConfig { message: msg })?;
        credentials
            .validate()
            .map_err(|msg| ZephyrError::InvalidConfig { message: msg })?;

        let base_url = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };

        let http_client = Client::builder()
            .timeout(config.timeout)
            .default_headers(Self::auth_headers(&credentials.auth_token)?)
            .build()
            .map_err(|e| ZephyrError::InvalidConfig {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            base_url,
            credentials,
            platform: Platform::detect(),
        })
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn project_key(&self) -> &str {
        &self.credentials.project_key
    }

    fn auth_headers(token: &SecretString) -> ZephyrResult<HeaderMap> {
        let mut authorization =
            HeaderValue::from_str(&format!("Bearer {}", token.expose_secret())).map_err(|_| {
                ZephyrError::InvalidConfig {
                    message: "Auth token contains characters not allowed in a header".to_string(),
                }
            })?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build_cycle_body(&self, title: &str, description: &str) -> ZephyrResult<NewTestCycle> {
        let folder_id = self
            .credentials
            .folder_id
            .ok_or_else(|| ZephyrError::InvalidConfig {
                message: "Folder ID is required to create a test cycle".to_string(),
            })?;

        Ok(NewTestCycle {
            description: description.to_string(),
            folder_id,
            name: title.to_string(),
            project_key: self.credentials.project_key.clone(),
        })
    }

    fn build_result_body(&self, submission: &ResultSubmission) -> TestResult {
        TestResult {
            assigned_to_id: self.credentials.user_id.clone(),
            comment: format_comment(&self.platform, &submission.script, &submission.comment),
            executed_by_id: self.credentials.user_id.clone(),
            execution_time: submission.elapsed_millis,
            project_key: self.credentials.project_key.clone(),
            status_name: submission.status,
            test_case_key: submission.test_case_key.clone(),
            test_cycle_key: submission.test_cycle_key.clone(),
        }
    }

    fn handle_http_error(err: reqwest::Error) -> ZephyrError {
        if err.is_timeout() {
            ZephyrError::ServiceUnavailable {
                message: "Request timeout".to_string(),
            }
        } else if err.is_connect() {
            ZephyrError::ServiceUnavailable {
                message: "Cannot connect to Zephyr Scale".to_string(),
            }
        } else {
            ZephyrError::Network(err)
        }
    }

    fn error_for_status(status: u16, body: String) -> ZephyrError {
        match status {
            401 | 403 => ZephyrError::Authentication,
            429 => ZephyrError::RateLimit,
            503 => ZephyrError::ServiceUnavailable {
                message: "Zephyr Scale is unavailable".to_string(),
            },
            _ => ZephyrError::Http { status, body },
        }
    }

    fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> ZephyrResult<R> {
        let url = self.endpoint(path);
        let payload = serde_json::to_string(body)?;
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .body(payload)
            .send()
            .map_err(Self::handle_http_error)?;

        let status = response.status();
        let text = response.text().map_err(Self::handle_http_error)?;
        if !status.is_success() {
            return Err(Self::error_for_status(status.as_u16(), text));
        }

        Ok(serde_json::from_str(&text)?)
    }
}

impl TestManagementApi for ZephyrClient {
    fn try_create_test_cycle(&self, title: &str, description: &str) -> ZephyrResult<TestCycle> {
        let body = self.build_cycle_body(title, description)?;
        debug!(
            "Creating test cycle '{}' in folder {} for {}",
            body.name, body.folder_id, body.project_key
        );
        self.post(TEST_CYCLES_PATH, &body)
    }

    fn try_add_test_result(
        &self,
        submission: &ResultSubmission,
    ) -> ZephyrResult<CreatedTestResult> {
        let body = self.build_result_body(submission);
        debug!(
            "Adding {} result for {} in cycle '{}'",
            body.status_name, body.test_case_key, body.test_cycle_key
        );
        self.post(TEST_EXECUTIONS_PATH, &body)
    }

    fn folder_id(&self) -> Option<u64> {
        self.credentials.folder_id
    }

    fn service_name(&self) -> &'static str {
        "zephyr-scale"
    }
}
