//! # Host Bridge Traits
//!
//! Platform abstraction traits that the enrichment core depends on.
//!
//! ## Overview
//!
//! This crate defines the contract between the core library and concrete
//! host implementations. The core never talks to the network directly; it is
//! handed an [`HttpClient`](http::HttpClient), which lets tests drive provider
//! clients with scripted responses.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP with per-request timeouts
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert their native errors into it and keep the
//! message actionable (URL, timeout, status).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so a single client can be
//! shared by every enrichment worker.

pub mod error;
pub mod http;
pub mod logging;

pub use error::BridgeError;

pub use http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
pub use logging::LogLevel;
