//! Display Flags
//!
//! Pure functions of the store state deciding what the dashboard shows.
//! Analysis results and the data-source statistics fallback are mutually
//! exclusive.

use insight_desk_core::{ResultItem, ResultItemType};
use serde::Serialize;

/// Current items grouped the way the dashboard renders them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultBuckets {
    pub charts: Vec<ResultItem>,
    pub images: Vec<ResultItem>,
    /// Tables and CSV exports
    pub tables: Vec<ResultItem>,
    pub metrics: Vec<ResultItem>,
    pub insights: Vec<ResultItem>,
    pub files: Vec<ResultItem>,
}

impl ResultBuckets {
    pub fn from_items(items: &[ResultItem]) -> Self {
        let mut buckets = Self::default();
        for item in items {
            let bucket = match item.item_type() {
                ResultItemType::Echarts => &mut buckets.charts,
                ResultItemType::Image => &mut buckets.images,
                ResultItemType::Table | ResultItemType::Csv => &mut buckets.tables,
                ResultItemType::Metric => &mut buckets.metrics,
                ResultItemType::Insight => &mut buckets.insights,
                ResultItemType::File => &mut buckets.files,
            };
            bucket.push(item.clone());
        }
        buckets
    }

    pub fn len(&self) -> usize {
        self.charts.len()
            + self.images.len()
            + self.tables.len()
            + self.metrics.len()
            + self.insights.len()
            + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Derived booleans gating the dashboard panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFlags {
    pub has_any_analysis_results: bool,
    pub is_viewing_historical_empty_result: bool,
    pub should_show_data_source_stats: bool,
}

impl DisplayFlags {
    pub fn compute(buckets: &ResultBuckets, is_viewing_historical_empty_result: bool) -> Self {
        let has_any_analysis_results = !buckets.is_empty();
        Self {
            has_any_analysis_results,
            is_viewing_historical_empty_result,
            should_show_data_source_stats: !has_any_analysis_results
                && !is_viewing_historical_empty_result,
        }
    }
}
