//! Services
//!
//! State managers and the event plumbing that drives them.

pub mod analysis_results;
pub mod event_aggregator;
pub mod event_bridge;
pub mod listeners;
pub mod loading;

pub use analysis_results::{
    AnalysisResultState, AnalysisResultStore, DisplayFlags, ResultBuckets, ResultStoreEvent,
    ResultStoreEventKind,
};
pub use event_aggregator::{AggregatorConfig, DashboardData, ErrorCode, ErrorInfo, EventAggregator};
pub use event_bridge::EventBridge;
pub use listeners::SubscriptionId;
pub use loading::{LoadingRegistryConfig, SessionLoadingRegistry, SessionLoadingState};
