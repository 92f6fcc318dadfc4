use url::Url;

use super::sources_api::{self, SourceList};
use super::{ExtractFrom, Extractor, ResolveSources, SupportedFrom};
use crate::crypto::{self, CaseBranchPattern};
use crate::download::HttpClient;
use crate::error::{ExtractError, Stage};
use crate::media::ExtractionResult;

const SOURCES_ENDPOINT: &str = "https://megacloud.tv/embed-2/ajax/e-1/getSources";
const SCRIPT_ENDPOINT: &str = "https://megacloud.tv/js/player/a/prod/e1-player.min.js";

/// Encrypted source lists, keyed by an offset scheme hidden in the player script.
#[derive(Debug, Clone)]
pub struct Megacloud {
    sources_endpoint: String,
    script_endpoint: String,
    pattern: CaseBranchPattern,
}

impl Megacloud {
    pub fn with_endpoints(sources_endpoint: impl Into<String>, script_endpoint: impl Into<String>) -> Self {
        Self {
            sources_endpoint: sources_endpoint.into(),
            script_endpoint: script_endpoint.into(),
            pattern: CaseBranchPattern::default(),
        }
    }

    pub fn with_pattern(mut self, pattern: CaseBranchPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// The script changes over time, so it is never served from a cache.
    fn script_url(&self) -> Result<Url, ExtractError> {
        let mut url = Url::parse(&self.script_endpoint).map_err(|_| {
            ExtractError::unsupported(
                Stage::PlayerScript,
                format!("invalid script endpoint: {}", self.script_endpoint),
            )
        })?;
        url.query_pairs_mut()
            .append_pair("v", &chrono::Utc::now().timestamp_millis().to_string());

        Ok(url)
    }
}

impl Default for Megacloud {
    fn default() -> Self {
        Self::with_endpoints(SOURCES_ENDPOINT, SCRIPT_ENDPOINT)
    }
}

impl Extractor for Megacloud {
    const DISPLAY_NAME: &'static str = "MegaCloud";
    const NAMES: &'static [&'static str] = &["MegaCloud", "VidCloud"];
    const HOSTS: &'static [&'static str] = &["megacloud.tv"];

    fn supported_from() -> SupportedFrom {
        SupportedFrom::Url
    }
}

impl ResolveSources for Megacloud {
    async fn extract(&self, client: &HttpClient, from: ExtractFrom) -> Result<ExtractionResult, ExtractError> {
        let page = from.into_page(Self::DISPLAY_NAME)?;
        let response = sources_api::fetch_sources(client, &self.sources_endpoint, &page).await?;

        // A list is usable as is, whatever the flag says
        let sources = match response.sources {
            SourceList::Plain(sources) => sources,
            SourceList::Encrypted(encrypted) => {
                log::debug!("{}: sources are encrypted, fetching player script", Self::DISPLAY_NAME);
                let script = client
                    .get_page_text(
                        Stage::PlayerScript,
                        self.script_url()?,
                        page.user_agent.as_deref(),
                        None,
                        None,
                    )
                    .await?;

                if script.trim().is_empty() {
                    return Err(ExtractError::not_found(Stage::PlayerScript, "player script is empty"));
                }

                crypto::recover_sources(&encrypted, &script, &self.pattern)?
            }
        };

        Ok(response.extras.into_result(sources))
    }
}
