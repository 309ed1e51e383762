use crate::clock::{elapsed_millis, Clock, SystemClock};
use crate::lifecycle::{TestDescriptor, TestFailure, TestListener};
use crate::registry::{RegistryError, TestCaseRegistry};
use crate::settings::{defaults, ReporterSettings, SettingsError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use zephyr::{
    escape_html, ExecutionStatus, ResultSubmission, TestManagementApi, ZephyrClient, ZephyrError,
};

pub const PASSED_COMMENT: &str = "Passed by the automation";

#[derive(Error, Debug)]
pub enum ReporterError {
    #[error("Folder ID to create test cycle was not provided")]
    MissingFolderId,

    #[error("Test cycle creation failed: {0}")]
    CycleCreation(#[source] ZephyrError),

    #[error("Zephyr client error: {0}")]
    Client(#[from] ZephyrError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

pub type ReporterResult<T> = Result<T, ReporterError>;

/// How the reporter gets the cycle its results go into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOptions {
    pub existing_cycle_key: Option<String>,
    pub title: String,
    pub description: String,
    /// Refuse to start when a new cycle cannot be created, instead of
    /// reporting every result against an empty cycle key.
    pub fail_on_cycle_error: bool,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            existing_cycle_key: None,
            title: defaults::CYCLE_TITLE.to_string(),
            description: defaults::CYCLE_DESCRIPTION.to_string(),
            fail_on_cycle_error: false,
        }
    }
}

impl CycleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing_cycle_key(mut self, key: impl Into<String>) -> Self {
        self.existing_cycle_key = Some(key.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn fail_on_cycle_error(mut self, fail: bool) -> Self {
        self.fail_on_cycle_error = fail;
        self
    }
}

/// Mirrors test outcomes into Zephyr Scale test results.
///
/// The cycle is resolved once in [`ZephyrReporter::new`] and never changes
/// afterwards. Start times are tracked per calling thread and test id, so one
/// reporter can be shared by tests running in parallel, including concurrent
/// runs of the same test body.
pub struct ZephyrReporter {
    api: Arc<dyn TestManagementApi>,
    cycle_key: String,
    registry: TestCaseRegistry,
    clock: Arc<dyn Clock>,
    started: Mutex<HashMap<(ThreadId, String), DateTime<Utc>>>,
}

impl ZephyrReporter {
    pub fn new(api: Arc<dyn TestManagementApi>, options: CycleOptions) -> ReporterResult<Self> {
        let cycle_key = Self::resolve_cycle(api.as_ref(), &options)?;

        Ok(Self {
            api,
            cycle_key,
            registry: TestCaseRegistry::new(),
            clock: Arc::new(SystemClock),
            started: Mutex::new(HashMap::new()),
        })
    }

    /// Build a reporter from `ZEPHYR_*` environment variables.
    pub fn from_env() -> ReporterResult<Self> {
        let settings = ReporterSettings::from_env()?;
        Self::from_settings(&settings)
    }

    pub fn from_settings(settings: &ReporterSettings) -> ReporterResult<Self> {
        let client = ZephyrClient::new(settings.client_config(), settings.credentials())?;
        let registry = settings.load_registry()?;
        Ok(Self::new(Arc::new(client), settings.cycle_options())?.with_registry(registry))
    }

    pub fn with_registry(mut self, registry: TestCaseRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Key every result is posted against. Empty when cycle creation failed.
    pub fn cycle_key(&self) -> &str {
        &self.cycle_key
    }

    pub fn registry(&self) -> &TestCaseRegistry {
        &self.registry
    }

    fn resolve_cycle(api: &dyn TestManagementApi, options: &CycleOptions) -> ReporterResult<String> {
        if let Some(key) = options.existing_cycle_key.as_ref().filter(|key| !key.is_empty()) {
            info!("Reporting into existing test cycle {}", key);
            return Ok(key.clone());
        }

        if api.folder_id().is_none() {
            error!("Folder ID to create test cycle was not provided");
            return Err(ReporterError::MissingFolderId);
        }

        if options.fail_on_cycle_error {
            let cycle = api
                .try_create_test_cycle(&options.title, &options.description)
                .map_err(ReporterError::CycleCreation)?;
            info!("Created test cycle {}", cycle.key);
            return Ok(cycle.key);
        }

        let key = api.create_test_cycle(&options.title, &options.description);
        if key.is_empty() {
            warn!("No test cycle available; results will be posted with an empty cycle key");
        }
        Ok(key)
    }

    /// Keys declared on the descriptor, or the registry entry for its id.
    pub fn test_case_keys(&self, test: &TestDescriptor) -> Vec<String> {
        if !test.test_case_keys.is_empty() {
            return test.test_case_keys.clone();
        }
        self.registry.lookup(&test.id()).to_vec()
    }

    /// Post one result per test case key of `test` and return the created ids
    /// in key order, with 0 for each submission that failed.
    pub fn report(
        &self,
        test: &TestDescriptor,
        status: ExecutionStatus,
        comment: &str,
        elapsed_millis: u64,
    ) -> Vec<u64> {
        let keys = self.test_case_keys(test);
        if keys.is_empty() {
            debug!("No Zephyr test cases declared for {}", test);
            return Vec::new();
        }

        let script = test.display_name();
        keys.into_iter()
            .map(|key| {
                let submission =
                    ResultSubmission::new(key.as_str(), self.cycle_key.as_str(), status)
                        .with_comment(comment)
                        .with_elapsed_millis(elapsed_millis)
                        .with_script(script.as_str());

                let id = self.api.add_test_result(&submission);
                if id > 0 {
                    info!("Test result added to Zephyr for {}, result ID: {}", key, id);
                } else {
                    warn!("Error trying to add result to Zephyr for {}", key);
                }
                id
            })
            .collect()
    }

    fn finish(&self, test: &TestDescriptor) -> u64 {
        let now = self.clock.now();
        let started = self
            .started
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(thread::current().id(), test.id()));

        match started {
            Some(start) => elapsed_millis(start, now),
            None => 0,
        }
    }
}

impl TestListener for ZephyrReporter {
    fn on_start(&self, test: &TestDescriptor) {
        let now = self.clock.now();
        self.started
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((thread::current().id(), test.id()), now);
    }

    fn on_success(&self, test: &TestDescriptor) {
        let elapsed = self.finish(test);
        self.report(test, ExecutionStatus::Pass, PASSED_COMMENT, elapsed);
    }

    fn on_failure(&self, test: &TestDescriptor, failure: &TestFailure) {
        let elapsed = self.finish(test);
        self.report(test, ExecutionStatus::Fail, &failure_comment(failure), elapsed);
    }

    fn on_skip(&self, test: &TestDescriptor, reason: &str) {
        let elapsed = self.finish(test);
        self.report(
            test,
            ExecutionStatus::Blocked,
            &blocked_comment(test, reason),
            elapsed,
        );
    }
}

pub fn failure_comment(failure: &TestFailure) -> String {
    format!(
        "<br/><b>Error:</b> <i>{}</i><br/><br/><b>Full Stack Trace:</b><br/><i>{}</i>",
        escape_html(&failure.message),
        escape_html(&failure.stack_trace).replace('\n', "<br/>")
    )
}

pub fn blocked_comment(test: &TestDescriptor, reason: &str) -> String {
    format!(
        "Blocked due to: ignored test method '{}()': '{}'",
        escape_html(&test.method_name),
        escape_html(reason)
    )
}
