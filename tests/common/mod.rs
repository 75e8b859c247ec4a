//! Common test utilities for quick-export integration tests

#[allow(dead_code)]
pub mod collaborators;
#[allow(dead_code)]
pub mod fixtures;

pub use collaborators::*;
pub use fixtures::*;
