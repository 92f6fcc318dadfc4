#![allow(async_fn_in_trait)]
//! Resolves embedded video pages into playable stream urls, including source
//! lists that the host only hands out encrypted.

pub mod crypto;
pub mod download;
pub mod error;
pub mod extractors;
pub mod manifest;
pub mod media;

pub use error::{ExtractError, NetworkFailure, Stage};
pub use extractors::{find_extractor_for_url, DispatchExtractor, ExtractFrom, ResolveSources};
pub use media::{ExtractionResult, SourceKind, Track, VideoSource};
