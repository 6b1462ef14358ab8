//! Storage Layer
//!
//! Handles all data persistence: JSON config and dashboard layouts.

pub mod config;
pub mod layout;

pub use config::*;
pub use layout::*;
