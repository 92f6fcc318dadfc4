use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::utils::decode_packed_codes;
use super::{ExtractFrom, Extractor, ResolveSources, SupportedFrom};
use crate::download::HttpClient;
use crate::error::{ExtractError, Stage};
use crate::manifest;
use crate::media::{ExtractionResult, VideoSource};

const DEFAULT_QUALITY: &str = "default";
const BACKUP_QUALITY: &str = "backup";

#[derive(Debug, Clone, Default)]
pub struct StreamWish;

impl StreamWish {
    /// Urls of all `file: "..."` assignments, in page order.
    fn file_assignments(source: &str) -> Vec<String> {
        static FILE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"file:\s*"([^"]+)""#).unwrap());
        static PACKED_SCRIPT_REGEX: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"eval\(function\(p,a,c,k,e,[dr]\)[\s\S]*?\.split\('\|'\)").unwrap());

        let scan = |text: &str| {
            FILE_REGEX
                .captures_iter(text)
                .filter_map(|captures| captures.get(1))
                .map(|file| file.as_str().to_string())
                .collect::<Vec<_>>()
        };

        let files = scan(source);
        if !files.is_empty() {
            return files;
        }

        log::trace!("{}: no plain file assignments, trying packed scripts", Self::DISPLAY_NAME);
        PACKED_SCRIPT_REGEX
            .find_iter(source)
            .filter_map(|packed| decode_packed_codes(packed.as_str()))
            .flat_map(|unpacked| scan(&unpacked))
            .collect()
    }

    fn is_image(url: &str) -> bool {
        url.contains(".jpg") || url.contains(".png")
    }
}

impl Extractor for StreamWish {
    const DISPLAY_NAME: &'static str = "StreamWish";
    const NAMES: &'static [&'static str] = &["StreamWish", "AWish", "EmbedWish"];
    const HOSTS: &'static [&'static str] = &["awish.pro", "streamwish.to", "streamwish.com", "embedwish.com"];

    fn supported_from() -> SupportedFrom {
        SupportedFrom::all()
    }
}

impl ResolveSources for StreamWish {
    async fn extract(&self, client: &HttpClient, from: ExtractFrom) -> Result<ExtractionResult, ExtractError> {
        let (page_url, user_agent) = match &from {
            ExtractFrom::Url { url, user_agent, .. } => (Url::parse(url).ok(), user_agent.clone()),
            ExtractFrom::Source(_) => (None, None),
        };
        let source = from.get_source(client, None).await?;

        let mut sources = Vec::new();
        for file in Self::file_assignments(&source) {
            if Self::is_image(&file) {
                continue;
            }

            let quality = if sources.is_empty() {
                DEFAULT_QUALITY
            } else {
                BACKUP_QUALITY
            };
            sources.push(VideoSource::detect(file, quality));
        }

        if sources.is_empty() {
            return Err(ExtractError::unsupported(Stage::VideoPage, "no file assignments in page"));
        }

        if let Some(hls) = sources.iter().find(|source| source.is_hls()) {
            let manifest_url = match &page_url {
                Some(page_url) => page_url.join(hls.url()),
                None => Url::parse(hls.url()),
            }
            .map_err(|_| ExtractError::unsupported(Stage::VideoPage, format!("invalid manifest url: {}", hls.url())))?;

            let renditions = manifest::fetch_renditions(
                client,
                &manifest_url,
                user_agent.as_deref(),
                page_url.as_ref().map(Url::as_str),
            )
            .await?;
            sources.extend(renditions);
        }

        Ok(ExtractionResult::from_sources(sources))
    }
}
