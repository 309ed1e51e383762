use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Execution status names as Zephyr Scale matches them, byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    #[serde(rename = "Blocked")]
    Blocked,
    #[serde(rename = "Fail")]
    Fail,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Not Executed")]
    NotExecuted,
    #[serde(rename = "Pass")]
    Pass,
}

impl ExecutionStatus {
    pub const ALL: [ExecutionStatus; 5] = [
        ExecutionStatus::Blocked,
        ExecutionStatus::Fail,
        ExecutionStatus::InProgress,
        ExecutionStatus::NotExecuted,
        ExecutionStatus::Pass,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Blocked => "Blocked",
            ExecutionStatus::Fail => "Fail",
            ExecutionStatus::InProgress => "In Progress",
            ExecutionStatus::NotExecuted => "Not Executed",
            ExecutionStatus::Pass => "Pass",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown execution status '{}', expected one of: {}",
                    s,
                    Self::ALL.map(|status| status.as_str()).join(", ")
                )
            })
    }
}

/// Body of `POST /testcycles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestCycle {
    pub description: String,
    pub folder_id: u64,
    pub name: String,
    pub project_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCycle {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

/// Body of `POST /testexecutions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub assigned_to_id: String,
    pub comment: String,
    pub executed_by_id: String,
    pub execution_time: u64,
    pub project_key: String,
    pub status_name: ExecutionStatus,
    pub test_case_key: String,
    pub test_cycle_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTestResult {
    pub id: u64,
}

/// A single outcome to record against a test case in a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSubmission {
    pub test_case_key: String,
    pub test_cycle_key: String,
    pub status: ExecutionStatus,
    pub comment: String,
    pub elapsed_millis: u64,
    pub script: String,
}

impl ResultSubmission {
    pub fn new(
        test_case_key: impl Into<String>,
        test_cycle_key: impl Into<String>,
        status: ExecutionStatus,
    ) -> Self {
        Self {
            test_case_key: test_case_key.into(),
            test_cycle_key: test_cycle_key.into(),
            status,
            comment: String::new(),
            elapsed_millis: 0,
            script: String::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_elapsed_millis(mut self, elapsed_millis: u64) -> Self {
        self.elapsed_millis = elapsed_millis;
        self
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = script.into();
        self
    }
}
