//! Analysis Result Service
//!
//! Session/message-scoped cache of analysis results with stale-request
//! filtering, a typed event bus and the derived dashboard display flags.

pub mod display;
pub mod events;
pub mod state;
pub mod store;

pub use display::{DisplayFlags, ResultBuckets};
pub use events::{ResultStoreEvent, ResultStoreEventKind};
pub use state::{AnalysisResultState, HistoricalEmptyMarker};
pub use store::AnalysisResultStore;
