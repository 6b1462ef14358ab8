//! Data Models
//!
//! Configuration and persisted record types.

pub mod layout;
pub mod settings;

pub use layout::*;
pub use settings::*;
