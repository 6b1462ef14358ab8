//! Integration Tests Module
//!
//! End-to-end tests for the Insight Desk state managers: loading registry,
//! result store, event routing through `AppState`, layout persistence and
//! property tests over random operation sequences.

// Session loading lifecycle tests
mod loading_registry_test;

// Result store selection and stale filtering tests
mod result_store_test;


// Layout and result item persistence tests
mod persistence_test;

// Property tests over random operation sequences
mod properties_test;
