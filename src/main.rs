use anyhow::Context;
use clap::Parser;
use cli::{Args, Extractor, OutputFormat};
use embedsrc::download::HttpClient;
use embedsrc::extractors::{self, DispatchExtractor, ExtractFrom, ResolveSources};
use embedsrc::media::ExtractionResult;
use futures_util::StreamExt;

mod cli;
mod logger;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();

    if let Err(err) = logger::init(args.debug) {
        eprintln!("Failed to set up logger: {err}");
    }

    let client = match HttpClient::new(&args.client_config()) {
        Ok(client) => client,
        Err(err) => {
            log::error!("Failed to create http client: {}", err);
            std::process::exit(1);
        }
    };

    // Abort everything that is still in flight on Ctrl-C
    let cancel = client.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling requests");
            cancel.cancel();
        }
    });

    let results = futures_util::stream::iter(args.urls.iter())
        .map(|url| resolve(&client, &args, url))
        .buffered(args.concurrent.get())
        .collect::<Vec<_>>()
        .await;

    let mut should_error_quit = false;
    let mut resolved = Vec::with_capacity(results.len());

    for (url, result) in args.urls.iter().zip(results) {
        match result {
            Ok(result) => resolved.push(result),
            Err(err) => {
                log::error!("Failed to resolve {}: {:#}", url, err);
                should_error_quit = true;
            }
        }
    }

    if let Err(err) = print_results(&resolved, args.output) {
        log::error!("Failed to write output: {:#}", err);
        should_error_quit = true;
    }

    if should_error_quit {
        std::process::exit(1);
    }
}

fn select_extractor(url: &str, extractor: &Extractor) -> Result<DispatchExtractor, anyhow::Error> {
    match extractor {
        Extractor::Auto => {
            extractors::find_extractor_for_url(url).with_context(|| format!("no extractor supports the url: {url}"))
        }
        Extractor::Name(name) => {
            extractors::extractor_with_name(name).with_context(|| format!("no extractor with name: {name}"))
        }
    }
}

async fn resolve(client: &HttpClient, args: &Args, url: &str) -> Result<ExtractionResult, anyhow::Error> {
    let extractor = select_extractor(url, &args.extractor)?;
    log::debug!("Using {} for {}", extractor.display_name(), url);

    let from = ExtractFrom::Url {
        url: url.to_owned(),
        user_agent: None,
        referer: args.referer.clone(),
    };
    let result = extractor
        .extract(client, from)
        .await
        .with_context(|| format!("{} failed", extractor.display_name()))?;
    log::info!("{}: found {} sources", url, result.sources.len());

    Ok(result)
}

fn print_results(resolved: &[ExtractionResult], output: OutputFormat) -> Result<(), anyhow::Error> {
    match output {
        OutputFormat::Sources => {
            let sources = resolved
                .iter()
                .flat_map(ExtractionResult::episode_sources)
                .collect::<Vec<_>>();
            println!("{}", serde_json::to_string_pretty(&sources)?);
        }
        OutputFormat::Full => {
            println!("{}", serde_json::to_string_pretty(resolved)?);
        }
        OutputFormat::Plain => {
            for result in resolved {
                for source in &result.sources {
                    println!("{}\t{}", source.quality(), source.url());
                }
            }
        }
    }

    Ok(())
}
