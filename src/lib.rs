//! # Track Enricher
//!
//! Fills missing genre, year and mood tags on MP3 files from MusicBrainz,
//! Last.fm and Discogs.
//!
//! The binary is a thin shell over [`cli::run`]; the workspace crates are
//! re-exported for hosts that want to drive a run themselves.

pub mod cli;

pub use bridge_desktop;
pub use bridge_traits;
pub use core_metadata;
pub use core_runtime;
