//! Wire types of the `getSources` style metadata endpoint shared by the
//! MegaCloud and RapidCloud players.

use reqwest::header::HeaderName;
use serde::Deserialize;
use url::Url;

use super::PageReference;
use crate::crypto::RawSource;
use crate::download::HttpClient;
use crate::error::{ExtractError, Stage};
use crate::media::{ExtractionResult, TimeRange, Track, VideoSource};

#[derive(Debug, Deserialize)]
pub struct SourcesResponse {
    pub sources: SourceList,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(flatten)]
    pub extras: SourceExtras,
}

/// Either the plain `{file, type}` list or the encrypted blob standing in for it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SourceList {
    Plain(Vec<RawSource>),
    Encrypted(String),
}

/// Everything in a metadata response besides the sources, passed through as is.
#[derive(Debug, Default, Deserialize)]
pub struct SourceExtras {
    #[serde(default)]
    pub tracks: Vec<RawTrack>,
    #[serde(default)]
    pub intro: Option<TimeRange>,
    #[serde(default)]
    pub outro: Option<TimeRange>,
}

#[derive(Debug, Deserialize)]
pub struct RawTrack {
    pub file: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl SourceExtras {
    pub fn into_result(self, sources: Vec<RawSource>) -> ExtractionResult {
        ExtractionResult {
            sources: sources
                .into_iter()
                .map(|source| VideoSource::detect(source.file, source.kind))
                .collect(),
            tracks: self
                .tracks
                .into_iter()
                .map(|track| Track::new(track.file, track.label))
                .collect(),
            intro: self.intro,
            outro: self.outro,
        }
    }
}

/// `GET <endpoint>?id=<video id>` the way the embedded player does it, with the
/// embed page as referer.
pub(crate) async fn fetch_sources(
    client: &HttpClient,
    endpoint: &str,
    page: &PageReference,
) -> Result<SourcesResponse, ExtractError> {
    let video_id = page.last_path_segment()?;
    let mut url = Url::parse(endpoint)
        .map_err(|_| ExtractError::unsupported(Stage::Metadata, format!("invalid sources endpoint: {endpoint}")))?;
    url.query_pairs_mut().append_pair("id", video_id);

    let extra_headers = [
        (reqwest::header::ACCEPT, "*/*"),
        (HeaderName::from_static("x-requested-with"), "XMLHttpRequest"),
    ];

    log::debug!("Requesting sources of video {video_id}");
    client
        .get_page_json(
            Stage::Metadata,
            url,
            page.user_agent.as_deref(),
            Some(page.url.as_str()),
            Some(&extra_headers),
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::{SourceList, SourcesResponse};
    use crate::media::{SourceKind, TimeRange};

    #[test]
    fn test_plain_response() {
        let json = r#"{
            "sources": [{"file": "https://cdn.example.net/a.mp4", "type": "mp4"}],
            "tracks": [
                {"file": "https://cdn.example.net/en.vtt", "label": "English", "kind": "captions", "default": true},
                {"file": "https://cdn.example.net/thumbnails.vtt", "kind": "thumbnails"}
            ],
            "encrypted": false,
            "intro": {"start": 0, "end": 84},
            "outro": {"start": 1325.5, "end": 1415},
            "server": 1
        }"#;

        let response = serde_json::from_str::<SourcesResponse>(json).unwrap();
        assert!(!response.encrypted);
        let SourceList::Plain(sources) = response.sources else {
            panic!("expected plain sources");
        };

        let result = response.extras.into_result(sources);
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].kind(), SourceKind::Direct);
        assert_eq!(result.sources[0].quality(), "mp4");
        assert_eq!(result.tracks[0].label, "English");
        assert_eq!(result.tracks[1].label, "Thumbnails");
        assert_eq!(result.intro, Some(TimeRange { start: 0.0, end: 84.0 }));
        assert_eq!(result.outro, Some(TimeRange { start: 1325.5, end: 1415.0 }));
    }

    #[test]
    fn test_encrypted_response() {
        let json = r#"{"sources": "U2FsdGVkX19A", "tracks": [], "encrypted": true, "intro": null}"#;
        let response = serde_json::from_str::<SourcesResponse>(json).unwrap();
        assert!(response.encrypted);
        assert!(matches!(response.sources, SourceList::Encrypted(ref blob) if blob == "U2FsdGVkX19A"));
        assert_eq!(response.extras.intro, None);
    }
}
