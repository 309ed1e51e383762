pub mod api;
pub mod client;
pub mod comment;
pub mod config;
pub mod types;

pub use api::{TestManagementApi, ZephyrError, ZephyrResult};
pub use client::ZephyrClient;
pub use comment::{escape_html, format_comment, Platform};
pub use config::{Credentials, ZephyrConfig, DEFAULT_BASE_URL};
pub use types::{
    CreatedTestResult, ExecutionStatus, NewTestCycle, ResultSubmission, TestCycle, TestResult,
};

pub mod prelude {
    pub use crate::api::*;
    pub use crate::client::*;
    pub use crate::config::*;
    pub use crate::types::*;
}
