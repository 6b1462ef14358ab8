//! Insight Desk - Analysis State Library
//!
//! Client-side state synchronization for an AI data-analysis desktop app.
//! It includes:
//! - Per-session loading registry with progress, errors and timeouts
//! - Analysis result store keyed by session and message
//! - Event bridge and aggregator for backend push events
//! - Storage layer (JSON config, dashboard layouts)
//! - Data models and utilities

pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::settings::{AppConfig, SettingsUpdate};
pub use services::{
    AnalysisResultStore, ErrorCode, ErrorInfo, EventAggregator, EventBridge,
    SessionLoadingRegistry, SessionLoadingState,
};
pub use state::{AppState, StateSnapshot};
pub use utils::error::{AppError, AppResult};
