//! Session Loading Service
//!
//! Tracks, per analysis session, whether it is loading, its progress and its
//! error, with timeout auto-recovery and deferred clearing.
//!
//! ## Components
//! - **State**: per-session snapshot and timing configuration
//! - **Registry**: the state machine and its subscriptions

pub mod registry;
pub mod state;

pub use registry::SessionLoadingRegistry;
pub use state::{LoadingRegistryConfig, LoadingTimer, SessionLoadingState};
