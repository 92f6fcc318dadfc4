use url::Url;

use crate::download::HttpClient;
use crate::error::{ExtractError, Stage};
use crate::media::{SourceKind, VideoSource};

pub const UNKNOWN_QUALITY: &str = "unknown";

/// Turns an HLS master playlist into one source per rendition, in playlist order.
///
/// I-frame streams are skipped. A media playlist has no renditions and yields an
/// empty list.
pub fn expand_manifest(manifest_url: &Url, bytes: &[u8]) -> Result<Vec<VideoSource>, ExtractError> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches('\u{feff}').trim_start();

    if !text.starts_with("#EXTM3U") {
        return Err(ExtractError::unsupported(Stage::Manifest, "missing #EXTM3U tag"));
    }

    let playlist = match m3u8_rs::parse_playlist_res(text.as_bytes()) {
        Ok(m3u8_rs::Playlist::MasterPlaylist(playlist)) => playlist,
        Ok(m3u8_rs::Playlist::MediaPlaylist(_)) => {
            log::debug!("Manifest {manifest_url} is a media playlist");
            return Ok(Vec::new());
        }
        Err(_) => return Err(ExtractError::unsupported(Stage::Manifest, "failed to parse m3u8")),
    };

    let mut renditions = Vec::with_capacity(playlist.variants.len());

    for variant in playlist.variants.into_iter().filter(|variant| !variant.is_i_frame) {
        let url = manifest_url.join(&variant.uri).map_err(|_| {
            ExtractError::unsupported(Stage::Manifest, format!("invalid rendition uri: {}", variant.uri))
        })?;
        let quality = match variant.resolution {
            Some(resolution) => format!("{}p", resolution.height),
            None => UNKNOWN_QUALITY.to_string(),
        };

        renditions.push(VideoSource::new(url, SourceKind::Hls, quality));
    }

    log::debug!("Manifest {manifest_url} lists {} renditions", renditions.len());

    Ok(renditions)
}

/// Requests the manifest and expands it.
pub(crate) async fn fetch_renditions(
    client: &HttpClient,
    manifest_url: &Url,
    user_agent: Option<&str>,
    referer: Option<&str>,
) -> Result<Vec<VideoSource>, ExtractError> {
    let response = client
        .get_response(Stage::Manifest, manifest_url.clone(), user_agent, referer, None)
        .await?;
    let bytes = client.read_bytes(Stage::Manifest, response).await?;

    expand_manifest(manifest_url, &bytes)
}
