//! Sample asset loading for the beatgrid engine.
//!
//! Samples are addressed by URL, fetched through a pluggable
//! [`SampleSource`], decoded from WAV, and memoized in a bounded
//! [`SampleCache`] shared by every voice that plays the same asset.

mod cache;
mod sample;
mod source;

use thiserror::Error;

pub use cache::{SampleCache, DEFAULT_CAPACITY};
pub use sample::{decode_wav, DecodedSample};
pub use source::{DirSource, MemorySource, SampleSource};

/// Errors from fetching or decoding sample assets.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("decode failed: {0}")]
    Decode(#[from] hound::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
