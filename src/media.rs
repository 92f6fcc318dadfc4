use serde::{Deserialize, Serialize};

pub const DEFAULT_TRACK_LABEL: &str = "Thumbnails";
pub const AUTO_QUALITY: &str = "auto";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Direct,
    Hls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoSource {
    url: String,
    kind: SourceKind,
    quality: String,
}

impl VideoSource {
    pub fn new(url: impl Into<String>, kind: SourceKind, quality: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            quality: quality.into(),
        }
    }

    /// Tags the source as HLS when the url points at a playlist.
    pub fn detect(url: impl Into<String>, quality: impl Into<String>) -> Self {
        let url = url.into();
        let kind = if crate::extractors::utils::is_hls_url(&url) {
            SourceKind::Hls
        } else {
            SourceKind::Direct
        };

        Self::new(url, kind, quality)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn quality(&self) -> &str {
        &self.quality
    }

    pub fn is_hls(&self) -> bool {
        self.kind == SourceKind::Hls
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub url: String,
    pub label: String,
}

impl Track {
    pub fn new(url: impl Into<String>, label: Option<String>) -> Self {
        Self {
            url: url.into(),
            label: label
                .filter(|label| !label.is_empty())
                .unwrap_or_else(|| DEFAULT_TRACK_LABEL.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

/// The complete outcome of one extraction. Built once per call and handed over to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub sources: Vec<VideoSource>,
    pub tracks: Vec<Track>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intro: Option<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outro: Option<TimeRange>,
}

impl ExtractionResult {
    pub fn from_sources(sources: Vec<VideoSource>) -> Self {
        Self {
            sources,
            ..Default::default()
        }
    }

    pub fn episode_sources(&self) -> Vec<EpisodeSource> {
        self.sources
            .iter()
            .map(|source| EpisodeSource {
                source: source.url.clone(),
                quality: source.quality.clone(),
            })
            .collect()
    }
}

/// The `{source, quality}` shape exposed to API consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeSource {
    pub source: String,
    pub quality: String,
}
