pub mod clock;
pub mod lifecycle;
pub mod logging;
pub mod registry;
pub mod reporter;
pub mod settings;

pub use clock::{elapsed_millis, Clock, ManualClock, SystemClock};
pub use lifecycle::{install_panic_hook, observe, TestDescriptor, TestFailure, TestListener};
pub use logging::init_logging;
pub use registry::{is_valid_test_case_key, RegistryError, RegistryResult, TestCaseRegistry};
pub use reporter::{
    blocked_comment, failure_comment, CycleOptions, ReporterError, ReporterResult,
    ZephyrReporter, PASSED_COMMENT,
};
pub use settings::{ReporterSettings, SettingsError};

// Re-export the client crate so test suites only need one dependency.
pub use zephyr;
