use super::sources_api::{self, SourceList};
use super::{ExtractFrom, Extractor, ResolveSources, SupportedFrom};
use crate::download::HttpClient;
use crate::error::{ExtractError, Stage};
use crate::media::ExtractionResult;

const SOURCES_ENDPOINT: &str = "https://rapid-cloud.co/ajax/embed-6-v2/getSources";

/// Same metadata endpoint as MegaCloud, but the source list always comes in the clear.
#[derive(Debug, Clone)]
pub struct Rapidcloud {
    sources_endpoint: String,
}

impl Rapidcloud {
    pub fn with_endpoint(sources_endpoint: impl Into<String>) -> Self {
        Self {
            sources_endpoint: sources_endpoint.into(),
        }
    }
}

impl Default for Rapidcloud {
    fn default() -> Self {
        Self::with_endpoint(SOURCES_ENDPOINT)
    }
}

impl Extractor for Rapidcloud {
    const DISPLAY_NAME: &'static str = "RapidCloud";
    const NAMES: &'static [&'static str] = &["RapidCloud", "rapid-cloud"];
    const HOSTS: &'static [&'static str] = &["rapid-cloud.co"];

    fn supported_from() -> SupportedFrom {
        SupportedFrom::Url
    }
}

impl ResolveSources for Rapidcloud {
    async fn extract(&self, client: &HttpClient, from: ExtractFrom) -> Result<ExtractionResult, ExtractError> {
        let page = from.into_page(Self::DISPLAY_NAME)?;
        let response = sources_api::fetch_sources(client, &self.sources_endpoint, &page).await?;

        match response.sources {
            SourceList::Plain(sources) => Ok(response.extras.into_result(sources)),
            SourceList::Encrypted(_) => Err(ExtractError::unsupported(
                Stage::Metadata,
                "expected a plain source list, got an encrypted one",
            )),
        }
    }
}
