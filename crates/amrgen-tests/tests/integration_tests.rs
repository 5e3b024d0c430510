//! Integration tests module that includes all integration test files.

#[path = "integration/config_tests.rs"]
mod config_tests;

#[path = "integration/generation_tests.rs"]
mod generation_tests;

#[path = "integration/reorder_tests.rs"]
mod reorder_tests;

#[path = "integration/structural_tests.rs"]
mod structural_tests;
