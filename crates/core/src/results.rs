//! Analysis Result Types
//!
//! Result items produced by an analysis request and the batches they are
//! delivered in. Shared by the producer side (event aggregator) and the
//! consumer side (result store).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Discriminant of a [`ResultData`] payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultItemType {
    Metric,
    Insight,
    Echarts,
    Table,
    Image,
    File,
    Csv,
}

impl ResultItemType {
    pub const ALL: [ResultItemType; 7] = [
        Self::Metric,
        Self::Insight,
        Self::Echarts,
        Self::Table,
        Self::Image,
        Self::File,
        Self::Csv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Insight => "insight",
            Self::Echarts => "echarts",
            Self::Table => "table",
            Self::Image => "image",
            Self::File => "file",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ResultItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultItemType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                CoreError::validation(format!(
                    "invalid item type: {} (valid types: metric, insight, echarts, table, image, file, csv)",
                    s
                ))
            })
    }
}

/// A key figure shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricData {
    pub title: String,
    pub value: String,
    #[serde(default)]
    pub change: String,
}

/// A textual finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightData {
    pub text: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

/// A generated file offered for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub file_name: String,
    pub file_path: String,
    #[serde(default)]
    pub file_type: String,
}

/// Type-tagged payload of a result item. Serialized as
/// `{"type": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ResultData {
    Metric(MetricData),
    Insight(InsightData),
    /// Chart option object, or its JSON text as the backend sometimes sends it.
    Echarts(serde_json::Value),
    Table(serde_json::Value),
    /// Data URL or file path.
    Image(String),
    File(FileData),
    Csv(String),
}

impl ResultData {
    pub fn item_type(&self) -> ResultItemType {
        match self {
            Self::Metric(_) => ResultItemType::Metric,
            Self::Insight(_) => ResultItemType::Insight,
            Self::Echarts(_) => ResultItemType::Echarts,
            Self::Table(_) => ResultItemType::Table,
            Self::Image(_) => ResultItemType::Image,
            Self::File(_) => ResultItemType::File,
            Self::Csv(_) => ResultItemType::Csv,
        }
    }

    /// Whether the payload carries nothing displayable (null or empty string).
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Echarts(v) | Self::Table(v) => {
                v.is_null() || v.as_str().is_some_and(|s| s.is_empty())
            }
            Self::Image(s) | Self::Csv(s) => s.is_empty(),
            Self::Metric(_) | Self::Insight(_) | Self::File(_) => false,
        }
    }
}

/// Where a result item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// Streamed live while the analysis runs.
    #[default]
    Realtime,
    Completed,
    Cached,
    /// Replayed from history.
    Restored,
}

/// Scope and time of a result item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// One unit of analysis output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub id: String,
    #[serde(flatten)]
    pub data: ResultData,
    #[serde(default)]
    pub metadata: ResultMetadata,
    #[serde(default)]
    pub source: ResultSource,
}

impl ResultItem {
    pub fn item_type(&self) -> ResultItemType {
        self.data.item_type()
    }
}

/// A chunk of result items delivered for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResultBatch {
    pub session_id: String,
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub items: Vec<ResultItem>,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub timestamp: i64,
}
