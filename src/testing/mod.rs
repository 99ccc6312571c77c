//! Testing utilities and mock implementations
//!
//! This module provides mock collaborators for running the workflow
//! without an automation server, Nexus, tracking or reporting service.

pub mod mocks;

pub use mocks::*;
