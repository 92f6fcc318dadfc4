use bitmask_enum::bitmask;
use enum_dispatch::enum_dispatch;
use url::Url;

use crate::download::HttpClient;
use crate::error::{ExtractError, Stage};
use crate::extractors::megacloud::Megacloud;
use crate::extractors::rapidcloud::Rapidcloud;
use crate::extractors::streamsb::StreamSb;
use crate::extractors::streamwish::StreamWish;
use crate::media::ExtractionResult;

pub mod megacloud;
pub mod rapidcloud;
pub mod sources_api;
pub mod streamsb;
pub mod streamwish;

macro_rules! enum_dispatch {
    {
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: $trait:ident {
            $($ty:ident),*$(,)?
        }
    } => {
        #[enum_dispatch($trait)]
        $(#[$meta])*
        $vis enum $name {
            $($ty($ty),)*
        }

        impl $name {
            pub fn display_name(&self) -> &'static str {
                match self {
                    $($name::$ty(_) => <$ty>::DISPLAY_NAME,)*
                }
            }

            pub fn supported_from(&self) -> SupportedFrom {
                match self {
                    $($name::$ty(_) => <$ty>::supported_from(),)*
                }
            }
        }
    }
}

macro_rules! normalized_name {
    ($extractor:expr, $ext:ty $(, $tail:ty)* $(,)?) => {
        if <$ext>::NAMES.iter().any(|name| $extractor.eq_ignore_ascii_case(name)) {
            Some(<$ext>::DISPLAY_NAME)
        } else {
            normalized_name!($extractor, $($tail),*)
        }
    };
    ($extractor:expr $(,)?) => {
        None
    };
}

macro_rules! exists_extractor_with_name {
    ($extractor:expr, $ext:ty $(, $tail:ty)* $(,)?) => {
        if <$ext>::NAMES.iter().any(|name| $extractor.eq_ignore_ascii_case(name)) {
            true
        } else {
            exists_extractor_with_name!($extractor, $($tail),*)
        }
    };
    ($extractor:expr $(,)?) => {
        false
    };
}

macro_rules! extractor_with_name {
    ($extractor:expr, $ext:ident $(, $tail:ident)* $(,)?) => {
        if <$ext>::NAMES.iter().any(|name| $extractor.eq_ignore_ascii_case(name)) {
            Some(DispatchExtractor::from(<$ext>::default()))
        } else {
            extractor_with_name!($extractor, $($tail),*)
        }
    };
    ($extractor:expr $(,)?) => {
        None
    };
}

macro_rules! find_extractor_for_url {
    ($url:expr, $ext:ident $(, $tail:ident)* $(,)?) => {
        if <$ext>::supports_url($url) {
            Some(DispatchExtractor::from(<$ext>::default()))
        } else {
            find_extractor_for_url!($url, $($tail),*)
        }
    };
    ($url:expr $(,)?) => {
        None
    };
}

macro_rules! create_functions_for_extractors {
    ($( $ext:ident ),* $(,)?) => {
        enum_dispatch! {
            #[derive(Debug, Clone)]
            pub enum DispatchExtractor: ResolveSources {
                $($ext),*
            }
        }

        pub fn normalized_name(extractor: &str) -> Option<&'static str> {
            normalized_name!(extractor, $($ext),*)
        }

        pub fn exists_extractor_with_name(extractor: &str) -> bool {
            exists_extractor_with_name!(extractor, $($ext),*)
        }

        /// Default configured extractor registered under `extractor`, ignoring ASCII case.
        pub fn extractor_with_name(extractor: &str) -> Option<DispatchExtractor> {
            extractor_with_name!(extractor, $($ext),*)
        }

        /// First extractor whose hosts match `url`.
        pub fn find_extractor_for_url(url: &str) -> Option<DispatchExtractor> {
            find_extractor_for_url!(url, $($ext),*)
        }

        pub fn extractor_names() -> Vec<&'static str> {
            vec![$(<$ext>::DISPLAY_NAME),*]
        }

        const _CHECK_UNIQUE_NAMES: () = {
            let names = [$(<$ext>::NAMES),*];

            let mut i = 0;
            while i < names.len() {
                let mut j = 0;
                while j < names[i].len() {
                    let mut count = 0;
                    let mut i2 = 0;
                    while i2 < names.len() {
                        let mut j2 = 0;
                        while j2 < names[i2].len() {
                            if const_eq_ignore_ascii_case(names[i][j], names[i2][j2]) {
                                count += 1;
                            }
                            j2 += 1;
                        }
                        i2 += 1;
                    }

                    if count != 1 {
                        panic!("Non-unique extractor name!");
                    }
                    j += 1;
                }
                i += 1;
            }
        };
    };
    () => {};
}

create_functions_for_extractors! {
    Megacloud,
    Rapidcloud,
    StreamSb,
    StreamWish,
}

const fn const_eq_ignore_ascii_case(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());

    if a.len() != b.len() {
        return false;
    }

    let mut k = 0;
    while k < a.len() {
        if a[k].to_ascii_lowercase() != b[k].to_ascii_lowercase() {
            return false;
        }
        k += 1;
    }

    true
}

/// What an extractor starts from.
#[derive(Debug, Clone)]
pub enum ExtractFrom {
    /// The embed page, with optional overrides for the headers sent along.
    Url {
        url: String,
        user_agent: Option<String>,
        referer: Option<String>,
    },
    /// Markup of the embed page that the caller already fetched.
    Source(String),
}

impl ExtractFrom {
    pub fn url(url: impl Into<String>) -> Self {
        ExtractFrom::Url {
            url: url.into(),
            user_agent: None,
            referer: None,
        }
    }

    /// Returns the page markup, requesting it first if only the url is known.
    pub(crate) async fn get_source(self, client: &HttpClient, referer: Option<&str>) -> Result<String, ExtractError> {
        match self {
            ExtractFrom::Url {
                url,
                user_agent,
                referer: referer_input,
            } => {
                let url = parse_page_url(&url)?;
                client
                    .get_page_text(
                        Stage::VideoPage,
                        url,
                        user_agent.as_deref(),
                        referer_input.as_deref().or(referer),
                        None,
                    )
                    .await
            }
            ExtractFrom::Source(source) => Ok(source),
        }
    }

    /// Rejects raw markup for extractors that only work from the page url.
    pub(crate) fn into_page(self, extractor: &'static str) -> Result<PageReference, ExtractError> {
        match self {
            ExtractFrom::Url { url, user_agent, .. } => Ok(PageReference {
                url: parse_page_url(&url)?,
                user_agent,
            }),
            ExtractFrom::Source(_) => Err(ExtractError::unsupported(
                Stage::PageReference,
                format!("{extractor}: page source is not supported"),
            )),
        }
    }
}

/// A parsed embed page url. Requests made on its behalf use it as the referer.
#[derive(Debug, Clone)]
pub struct PageReference {
    pub url: Url,
    pub user_agent: Option<String>,
}

impl PageReference {
    /// Last path segment of the page url, without the query.
    pub(crate) fn last_path_segment(&self) -> Result<&str, ExtractError> {
        self.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| ExtractError::not_found(Stage::PageReference, "video id is empty"))
    }
}

fn parse_page_url(url: &str) -> Result<Url, ExtractError> {
    Url::parse(url).map_err(|_| ExtractError::not_found(Stage::PageReference, format!("invalid page url: {url}")))
}

#[bitmask]
pub enum SupportedFrom {
    Url,
    Source,
}

/// Registry facing side of a backend.
pub trait Extractor: ResolveSources + Default {
    const DISPLAY_NAME: &'static str;
    const NAMES: &'static [&'static str];
    const HOSTS: &'static [&'static str];
    const ALLOW_HTTP: bool = false;

    fn supported_from() -> SupportedFrom;

    fn supports_url(url: &str) -> bool {
        Self::HOSTS
            .iter()
            .any(|host| utils::is_url_host_and_has_path(url, host, Self::ALLOW_HTTP, true))
    }
}

/// Resolves one page into its playable sources.
///
/// Implementations only hold immutable configuration, so the same instance can
/// serve any number of concurrent calls. Every call builds its own result.
#[enum_dispatch]
pub trait ResolveSources {
    async fn extract(&self, client: &HttpClient, from: ExtractFrom) -> Result<ExtractionResult, ExtractError>;
}

pub mod utils {
    use std::collections::{HashMap, VecDeque};
    use std::num::NonZeroUsize;

    use once_cell::sync::Lazy;
    use regex::Regex;

    pub fn is_url_host_and_has_path(url: &str, host: &str, allow_http: bool, allow_www: bool) -> bool {
        url::Url::parse(url)
            .map(|url| {
                let scheme = url.scheme();
                let is_correct_scheme = scheme == "https" || (allow_http && scheme == "http");

                let no_username = url.username().is_empty();
                let no_password = url.password().is_none();
                let no_port = url.port().is_none();

                let is_same_host = url
                    .host_str()
                    .map(|url_host| {
                        let new_url_host = if allow_www {
                            url_host.strip_prefix("www.").unwrap_or(url_host)
                        } else {
                            url_host
                        };

                        host.eq_ignore_ascii_case(new_url_host)
                    })
                    .unwrap_or(false);

                let path = url.path();
                let path_is_empty = path.strip_prefix('/').unwrap_or(path).is_empty();

                is_correct_scheme && no_username && no_password && no_port && is_same_host && !path_is_empty
            })
            .unwrap_or(false)
    }

    pub fn is_hls_url(url: &str) -> bool {
        url.contains(".m3u8")
    }

    /// Port of https://github.com/yt-dlp/yt-dlp/blob/4e38e2ae9d7380015349e6aee59c78bb3938befd/yt_dlp/utils/_utils.py#L4354-L4361
    fn base_n_table(base: NonZeroUsize, table: Option<&'static [u8]>) -> Option<&'static [u8]> {
        const DEFAULT_TABLE: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let table = table.unwrap_or(DEFAULT_TABLE);

        table.get(..base.get())
    }

    /// Port of https://github.com/yt-dlp/yt-dlp/blob/4e38e2ae9d7380015349e6aee59c78bb3938befd/yt_dlp/utils/_utils.py#L4364-L4374
    pub fn encode_base_n(mut num: usize, base: NonZeroUsize, table: Option<&'static [u8]>) -> Option<String> {
        let table = base_n_table(base, table)?;

        if num == 0 {
            return Some(char::from(table[0]).to_string());
        }

        let mut result = VecDeque::new();
        let base = table.len();

        while num > 0 {
            result.push_front(table[num % base]);
            num /= base;
        }

        String::from_utf8(result.into()).ok()
    }

    /// Port of https://github.com/yt-dlp/yt-dlp/blob/4e38e2ae9d7380015349e6aee59c78bb3938befd/yt_dlp/utils/_utils.py#L4386-L4401
    pub fn decode_packed_codes(code: &str) -> Option<String> {
        static PACKED_CODES_REGEX: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"}\('(.+)',(\d+),(\d+),'([^']+)'\.split\('\|'\)").unwrap());
        static WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\w+)\b").unwrap());

        let mobj = PACKED_CODES_REGEX.captures(code)?;
        let obfuscated_code = mobj.get(1)?.as_str();
        let base = mobj.get(2)?.as_str().parse::<NonZeroUsize>().ok()?;
        let mut count = mobj.get(3)?.as_str().parse::<usize>().ok()?;
        let symbols = mobj.get(4)?.as_str().split('|').collect::<Vec<_>>();
        let mut symbol_table = HashMap::with_capacity(count);

        while count > 0 {
            count -= 1;
            let base_n_count = encode_base_n(count, base, None)?;
            let symbols_value = symbols.get(count)?;
            let value = if symbols_value.is_empty() {
                base_n_count.clone()
            } else {
                symbols_value.to_string()
            };
            symbol_table.insert(base_n_count, value);
        }

        let mut replace_errored = false;
        let replaced = WORD_REGEX.replace_all(obfuscated_code, |captures: &regex::Captures| {
            match symbol_table.get(&captures[0]) {
                Some(group) => group.as_str(),
                None => {
                    replace_errored = true;
                    ""
                }
            }
        });

        if replace_errored {
            return None;
        }

        Some(replaced.to_string())
    }

}
