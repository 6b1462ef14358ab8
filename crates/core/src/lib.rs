//! Insight Desk Core
//!
//! Foundational types for the Insight Desk workspace. This crate has zero
//! dependencies on application-level code (state managers, storage, CLI).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `clock` - Injected time source (`Clock`, `SystemClock`, `ManualClock`)
//! - `timers` - Keyed cancellable delayed tasks (`TimerArena`)
//! - `progress` - Loading progress and error records
//! - `results` - Analysis result items and batches
//! - `events` - Backend push events and stream adapters
//!
//! ## Design Principles
//!
//! 1. **Minimal dependencies (serde, thiserror, chrono)** - keeps build times minimal
//! 2. **No hidden time** - every deadline is computed from an injected clock
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod clock;
pub mod error;
pub mod events;
pub mod progress;
pub mod results;
pub mod timers;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Time ───────────────────────────────────────────────────────────────
pub use clock::{duration_ms, Clock, ManualClock, SystemClock};
pub use timers::{TimerArena, TimerToken};

// ── Progress ───────────────────────────────────────────────────────────
pub use progress::{LoadingError, ProgressInfo, ProgressStage};

// ── Results ────────────────────────────────────────────────────────────
pub use results::{
    AnalysisResultBatch, FileData, InsightData, MetricData, ResultData, ResultItem,
    ResultItemType, ResultMetadata, ResultSource,
};

// ── Events ─────────────────────────────────────────────────────────────
pub use events::{
    AdapterError, BackendEvent, BackendEventKind, EventAdapter, JsonLinesAdapter, QueueStatus,
    RecordedEvent,
};
