//! Analysis Error Info
//!
//! Error codes reported with `analysis-error`, their default user-facing
//! messages and recovery suggestions.

use serde::{Deserialize, Serialize};

/// Known analysis error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AnalysisError,
    AnalysisTimeout,
    AnalysisCancelled,
    PythonExecution,
    PythonSyntax,
    PythonImport,
    PythonMemory,
    DataNotFound,
    DataInvalid,
    DataEmpty,
    DataTooLarge,
    ConnectionFailed,
    ConnectionTimeout,
    PermissionDenied,
    ResourceBusy,
    ResourceNotFound,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 16] = [
        Self::AnalysisError,
        Self::AnalysisTimeout,
        Self::AnalysisCancelled,
        Self::PythonExecution,
        Self::PythonSyntax,
        Self::PythonImport,
        Self::PythonMemory,
        Self::DataNotFound,
        Self::DataInvalid,
        Self::DataEmpty,
        Self::DataTooLarge,
        Self::ConnectionFailed,
        Self::ConnectionTimeout,
        Self::PermissionDenied,
        Self::ResourceBusy,
        Self::ResourceNotFound,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalysisError => "ANALYSIS_ERROR",
            Self::AnalysisTimeout => "ANALYSIS_TIMEOUT",
            Self::AnalysisCancelled => "ANALYSIS_CANCELLED",
            Self::PythonExecution => "PYTHON_EXECUTION",
            Self::PythonSyntax => "PYTHON_SYNTAX",
            Self::PythonImport => "PYTHON_IMPORT",
            Self::PythonMemory => "PYTHON_MEMORY",
            Self::DataNotFound => "DATA_NOT_FOUND",
            Self::DataInvalid => "DATA_INVALID",
            Self::DataEmpty => "DATA_EMPTY",
            Self::DataTooLarge => "DATA_TOO_LARGE",
            Self::ConnectionFailed => "CONNECTION_FAILED",
            Self::ConnectionTimeout => "CONNECTION_TIMEOUT",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceBusy => "RESOURCE_BUSY",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::AnalysisError => "An error occurred during analysis",
            Self::AnalysisTimeout => "Analysis timed out, please try again later",
            Self::AnalysisCancelled => "Analysis was cancelled",
            Self::PythonExecution => "Code execution failed",
            Self::PythonSyntax => "Generated code has a syntax error",
            Self::PythonImport => "A required analysis library is missing",
            Self::PythonMemory => "Out of memory, the data set may be too large",
            Self::DataNotFound => "The requested data was not found",
            Self::DataInvalid => "The data format is invalid",
            Self::DataEmpty => "The query returned no data",
            Self::DataTooLarge => "The data exceeds the size limit",
            Self::ConnectionFailed => "Connection failed, please check the network",
            Self::ConnectionTimeout => "Connection timed out",
            Self::PermissionDenied => "Permission denied",
            Self::ResourceBusy => "The resource is busy, please try again later",
            Self::ResourceNotFound => "Resource not found",
        }
    }

    pub fn recovery_suggestions(&self) -> &'static [&'static str] {
        match self {
            Self::AnalysisError => &[
                "Check that your question is clear and specific",
                "Try simplifying the query conditions",
                "If the problem persists, reload and try again",
            ],
            Self::AnalysisTimeout => &[
                "Simplify the query or narrow the data range",
                "Check that the network connection is stable",
                "Try again later, the system may be busy with other tasks",
            ],
            Self::AnalysisCancelled => &[
                "You can start the analysis again",
                "If this was a mistake, submit the same question again",
            ],
            Self::PythonExecution => &[
                "Check that the data format is correct",
                "Try a different kind of analysis",
                "If the problem persists, contact support",
            ],
            Self::PythonSyntax => &[
                "The generated code has a syntax problem",
                "Try describing your analysis differently",
                "Use a simpler question",
            ],
            Self::PythonImport => &[
                "A required analysis library may not be installed",
                "Ask an administrator to check the system setup",
                "Try a different analysis method",
            ],
            Self::PythonMemory => &[
                "The data may be too large, narrow the query range",
                "Try processing the data in batches",
                "Try again later, the system may be freeing resources",
            ],
            Self::DataNotFound => &[
                "Check that the data source is configured correctly",
                "Confirm the table and column names in the query",
                "Check whether the data was deleted or moved",
            ],
            Self::DataInvalid => &[
                "Check that the data format meets the requirements",
                "Confirm the data types are correct",
                "Try cleaning or re-importing the data",
            ],
            Self::DataEmpty => &[
                "There is no data for the current query conditions",
                "Try adjusting the filters",
                "Check that the data source contains the data you need",
            ],
            Self::DataTooLarge => &[
                "Narrow the data range of the query",
                "Add more filter conditions",
                "Consider paging or batching the query",
            ],
            Self::ConnectionFailed => &[
                "Check the network connection",
                "Confirm the service is running",
                "Try again later",
            ],
            Self::ConnectionTimeout => &[
                "The connection timed out, check the network status",
                "The service may be busy, try again later",
                "If the problem persists, contact support",
            ],
            Self::PermissionDenied => &[
                "You may not have access to this resource",
                "Ask an administrator for the required permissions",
                "Check your account status",
            ],
            Self::ResourceBusy => &[
                "The resource is in use by another task",
                "Try again later",
                "If the problem persists, contact support",
            ],
            Self::ResourceNotFound => &[
                "Check that the resource path is correct",
                "Confirm the resource has not been deleted",
                "Ask an administrator to confirm the resource status",
            ],
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const FALLBACK_SUGGESTIONS: [&str; 2] = [
    "Please try again later",
    "If the problem persists, contact support",
];

/// Error details attached to an `analysis-error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub code: String,
    /// User-facing message
    pub message: String,
    /// Technical details, may be empty
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub recovery_suggestions: Vec<String>,
    pub timestamp: i64,
}

impl ErrorInfo {
    /// Build error info for `code`. A non-empty `message` is kept as is;
    /// otherwise the code's default message is used.
    pub fn new(code: &str, message: &str, details: &str, timestamp: i64) -> Self {
        let known = ErrorCode::from_code(code);

        let message = if !message.is_empty() {
            message.to_string()
        } else {
            known
                .map(|c| c.default_message())
                .unwrap_or("An unknown error occurred")
                .to_string()
        };

        let recovery_suggestions = known
            .map(|c| c.recovery_suggestions())
            .unwrap_or(&FALLBACK_SUGGESTIONS)
            .iter()
            .map(|s| s.to_string())
            .collect();

        Self {
            code: code.to_string(),
            message,
            details: details.to_string(),
            recovery_suggestions,
            timestamp,
        }
    }
}
