use std::fmt::Display;

use reqwest::StatusCode;
use thiserror::Error;

/// The point of an extraction at which something went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Resolving the page reference into a video id.
    PageReference,
    /// The `getSources` style metadata endpoint.
    Metadata,
    /// The player script carrying the offset scheme.
    PlayerScript,
    /// Splitting the encrypted string into secret and ciphertext.
    Secret,
    /// Decrypting and parsing the source list.
    Payload,
    /// The hex encoded sources endpoint.
    SourcesApi,
    /// The raw video page markup.
    VideoPage,
    /// The HLS master playlist.
    Manifest,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::PageReference => write!(f, "page reference"),
            Stage::Metadata => write!(f, "metadata"),
            Stage::PlayerScript => write!(f, "player script"),
            Stage::Secret => write!(f, "secret"),
            Stage::Payload => write!(f, "payload"),
            Stage::SourcesApi => write!(f, "sources api"),
            Stage::VideoPage => write!(f, "video page"),
            Stage::Manifest => write!(f, "manifest"),
        }
    }
}

#[derive(Debug, Error)]
pub enum NetworkFailure {
    #[error("request failed")]
    Request(#[source] reqwest_middleware::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("failed to read response body")]
    Body(#[source] reqwest::Error),
    #[error("too many redirects")]
    Redirects,
    #[error("timed out")]
    Timeout,
    #[error("cancelled")]
    Cancelled,
}

/// Every way a single `extract` call can fail.
///
/// None of the variants ever carry the recovered passphrase, key or IV.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{stage}: not found: {reason}")]
    NotFound { stage: Stage, reason: String },

    #[error("{stage}: {failure}")]
    Network {
        stage: Stage,
        #[source]
        failure: NetworkFailure,
    },

    #[error("{stage}: failed to parse script: {reason}")]
    ScriptParse { stage: Stage, reason: String },

    #[error("player script: failed to match the value of variable `{variable}`")]
    KeyMatch { variable: String },

    #[error("{stage}: cipher failure: {reason}")]
    Cipher { stage: Stage, reason: &'static str },

    #[error("{stage}: decrypted payload is not a source list")]
    Decryption {
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },

    #[error("{stage}: unsupported format: {reason}")]
    UnsupportedFormat { stage: Stage, reason: String },
}

impl ExtractError {
    pub fn stage(&self) -> Stage {
        match self {
            ExtractError::NotFound { stage, .. }
            | ExtractError::Network { stage, .. }
            | ExtractError::ScriptParse { stage, .. }
            | ExtractError::Cipher { stage, .. }
            | ExtractError::Decryption { stage, .. }
            | ExtractError::UnsupportedFormat { stage, .. } => *stage,
            ExtractError::KeyMatch { .. } => Stage::PlayerScript,
        }
    }

    pub(crate) fn not_found(stage: Stage, reason: impl Into<String>) -> Self {
        ExtractError::NotFound {
            stage,
            reason: reason.into(),
        }
    }

    pub(crate) fn network(stage: Stage, failure: NetworkFailure) -> Self {
        ExtractError::Network { stage, failure }
    }

    pub(crate) fn script_parse(stage: Stage, reason: impl Into<String>) -> Self {
        ExtractError::ScriptParse {
            stage,
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(stage: Stage, reason: impl Into<String>) -> Self {
        ExtractError::UnsupportedFormat {
            stage,
            reason: reason.into(),
        }
    }
}
