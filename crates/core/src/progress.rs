//! Analysis Progress Types
//!
//! Progress and error records attached to a loading session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stage of a running analysis.
///
/// Stage names the backend sends that are not known here are preserved in
/// [`ProgressStage::Other`] so they round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProgressStage {
    Initializing,
    Waiting,
    Schema,
    Query,
    Analyzing,
    Visualization,
    Generating,
    Complete,
    Other(String),
}

impl ProgressStage {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initializing => "initializing",
            Self::Waiting => "waiting",
            Self::Schema => "schema",
            Self::Query => "query",
            Self::Analyzing => "analyzing",
            Self::Visualization => "visualization",
            Self::Generating => "generating",
            Self::Complete => "complete",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for ProgressStage {
    fn from(s: &str) -> Self {
        match s {
            "initializing" => Self::Initializing,
            "waiting" => Self::Waiting,
            "schema" => Self::Schema,
            "query" => Self::Query,
            // the backend's pipeline calls this stage "analysis"
            "analyzing" | "analysis" => Self::Analyzing,
            "visualization" => Self::Visualization,
            "generating" => Self::Generating,
            "complete" => Self::Complete,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ProgressStage {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<ProgressStage> for String {
    fn from(stage: ProgressStage) -> String {
        stage.as_str().to_string()
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress snapshot of one analysis session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    pub stage: ProgressStage,
    /// Percentage in `0..=100`.
    pub progress: u8,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub step: u32,
    #[serde(default)]
    pub total: u32,
    /// Tool being executed, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl ProgressInfo {
    /// Build a progress record, clamping `progress` into `0..=100`.
    pub fn new(
        stage: impl Into<ProgressStage>,
        progress: i64,
        message: impl Into<String>,
        step: u32,
        total: u32,
    ) -> Self {
        Self {
            stage: stage.into(),
            progress: clamp_percent(progress),
            message: message.into(),
            step,
            total,
            tool_name: None,
        }
    }

    /// The forced "done" record used when the backend reports completion.
    pub fn complete() -> Self {
        Self::new(ProgressStage::Complete, 100, "", 0, 0)
    }

    /// Whether this record marks the end of the analysis.
    pub fn is_terminal(&self) -> bool {
        self.stage == ProgressStage::Complete || self.progress >= 100
    }
}

/// Clamp an arbitrary integer percentage into `0..=100`.
pub fn clamp_percent(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

/// User-visible analysis failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingError {
    pub code: String,
    pub message: String,
}

impl LoadingError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
