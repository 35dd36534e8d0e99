//! # Desktop Bridge
//!
//! Host implementation of [`bridge_traits::HttpClient`] for the command-line
//! tool, built on `reqwest` with rustls.
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let http_client = Arc::new(ReqwestHttpClient::with_timeout(
//!     "TrackMetadataEnricher/0.1.0",
//!     Duration::from_secs(30),
//! )?);
//! ```

mod http;

pub use http::ReqwestHttpClient;
