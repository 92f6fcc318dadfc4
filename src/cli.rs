use std::num::NonZeroUsize;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use embedsrc::download::{ClientConfig, DEFAULT_USER_AGENT};
use embedsrc::extractors::{exists_extractor_with_name, extractor_names};

#[derive(Parser, Debug)]
#[command(version)]
/// Resolve embedded video pages into playable stream urls
pub(crate) struct Args {
    /// Use a specific extractor instead of matching by host
    #[arg(short = 'u', long, value_parser = parse_extractor, default_value = "auto", hide_default_value = true, value_name = "NAME")]
    pub(crate) extractor: Extractor,

    /// Pages resolved at the same time
    #[arg(short = 'N', long = "concurrent", default_value = "4", value_name = "NUMBER")]
    pub(crate) concurrent: NonZeroUsize,

    /// Timeout for a whole request in seconds
    #[arg(long, value_parser = parse_seconds, default_value = "20", value_name = "SECONDS")]
    pub(crate) timeout: Duration,

    /// Timeout for establishing a connection in seconds
    #[arg(long, value_parser = parse_seconds, default_value = "10", value_name = "SECONDS")]
    pub(crate) connect_timeout: Duration,

    /// Retries of transient transport failures
    #[arg(short = 'R', long, default_value_t = 0, value_name = "NUMBER")]
    pub(crate) retries: u32,

    /// User agent sent with every request
    #[arg(long, default_value = DEFAULT_USER_AGENT, hide_default_value = true)]
    pub(crate) user_agent: String,

    /// Referer sent with the embed page request
    #[arg(long, value_name = "URL")]
    pub(crate) referer: Option<String>,

    /// Output format
    #[arg(value_enum, short, long, ignore_case = true, default_value_t = OutputFormat::Sources)]
    pub(crate) output: OutputFormat,

    /// Enable debug mode
    #[arg(short, long)]
    pub(crate) debug: bool,

    /// Embed page urls
    #[arg(required = true, value_name = "URL")]
    pub(crate) urls: Vec<String>,
}

impl Args {
    pub(crate) fn client_config(&self) -> ClientConfig {
        ClientConfig {
            user_agent: self.user_agent.clone(),
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            retries: self.retries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Extractor {
    Auto,
    Name(String),
}

fn parse_extractor(input: &str) -> Result<Extractor, String> {
    if input.eq_ignore_ascii_case("auto") {
        Ok(Extractor::Auto)
    } else if exists_extractor_with_name(input) {
        Ok(Extractor::Name(input.to_owned()))
    } else {
        Err(format!(
            "no extractor with name: {input} (available: {})",
            extractor_names().join(", ")
        ))
    }
}

fn parse_seconds(input: &str) -> Result<Duration, String> {
    let seconds = input.parse::<f64>().map_err(|err| format!("{err}"))?;

    if !seconds.is_finite() || seconds <= 0.0 {
        return Err("timeout must be greater than 0".to_string());
    }

    Ok(Duration::from_secs_f64(seconds))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// JSON list of `{source, quality}`
    Sources,
    /// JSON of the complete result with tracks and intro/outro
    Full,
    /// One `quality<TAB>url` line per source
    Plain,
}
