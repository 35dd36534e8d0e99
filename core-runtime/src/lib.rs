//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the enrichment tool:
//! - Logging and tracing infrastructure
//! - Run configuration and credentials loading
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the binary sets up before
//! any file is touched. It establishes the logging conventions used
//! throughout the workspace and validates the invocation (root directory,
//! worker count, provider credentials).

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
