use std::future::Future;
use std::time::Duration;

use reqwest::header::HeaderName;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::policies::ExponentialBackoffBuilder;
use reqwest_retry::RetryTransientMiddleware;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use self::retry::strategy::CustomRetryStrategy;
use crate::error::{ExtractError, NetworkFailure, Stage};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

const MAX_REDIRECTS: u32 = 10;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    /// Upper bound for a whole request, including reading the body.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Transport level retries for transient failures. Zero disables the retry middleware.
    pub retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(10),
            retries: 0,
        }
    }
}

/// Shared HTTP client for all extractors.
///
/// Cloning is cheap. Every in-flight request is abandoned as soon as the attached
/// [CancellationToken] is cancelled.
#[derive(Clone)]
pub struct HttpClient {
    client: ClientWithMiddleware,
    cancel: CancellationToken,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(Policy::none()) // redirects handled in get_response
            .build()?;

        let mut builder = reqwest_middleware::ClientBuilder::new(client);

        if config.retries > 0 {
            builder = builder.with(RetryTransientMiddleware::new_with_policy_and_strategy(
                ExponentialBackoffBuilder::default()
                    .retry_bounds(Duration::from_secs(1), Duration::from_secs(10))
                    .build_with_max_retries(config.retries),
                CustomRetryStrategy,
            ));
        }

        Ok(Self {
            client: builder.build(),
            cancel: CancellationToken::new(),
        })
    }

    /// Same connection pool, different cancellation scope.
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        Self {
            client: self.client.clone(),
            cancel,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    async fn cancellable<T>(&self, stage: Stage, future: impl Future<Output = T>) -> Result<T, ExtractError> {
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => Err(ExtractError::network(stage, NetworkFailure::Cancelled)),
            output = future => Ok(output),
        }
    }

    pub(crate) async fn get_response(
        &self,
        stage: Stage,
        url: Url,
        user_agent: Option<&str>,
        referer: Option<&str>,
        extra_headers: Option<&[(HeaderName, &str)]>,
    ) -> Result<reqwest::Response, ExtractError> {
        // We need to handle redirects ourself, because reqwest changes the Referer
        // header on redirection
        let mut last_url = url;
        let mut redirect_count = 0u32;

        loop {
            log::trace!("{stage}: GET {last_url}");
            let mut request = self.client.get(last_url.clone());

            if let Some(user_agent) = user_agent {
                request = request.header(reqwest::header::USER_AGENT, user_agent);
            }

            request = request.header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.5");

            if let Some(referer) = referer {
                request = request.header(reqwest::header::REFERER, referer);
            }

            if let Some(extra_headers) = extra_headers {
                for (header, value) in extra_headers {
                    request = request.header(header, *value);
                }
            }

            let response = self
                .cancellable(stage, request.send())
                .await?
                .map_err(|err| ExtractError::network(stage, request_failure(err)))?;

            let status = response.status();
            let is_redirect_code = [301, 308, 302, 303, 307].contains(&status.as_u16());
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|location| location.to_str().ok());

            match (is_redirect_code, location) {
                (true, Some(location)) => {
                    if redirect_count >= MAX_REDIRECTS {
                        return Err(ExtractError::network(stage, NetworkFailure::Redirects));
                    }

                    redirect_count += 1;
                    last_url = last_url.join(location).map_err(|_| {
                        ExtractError::unsupported(stage, format!("invalid redirect location: {location}"))
                    })?;
                }
                _ if status == StatusCode::NOT_FOUND => {
                    return Err(ExtractError::not_found(stage, "server responded with 404"));
                }
                _ if !status.is_success() => {
                    return Err(ExtractError::network(stage, NetworkFailure::Status(status)));
                }
                _ => return Ok(response),
            }
        }
    }

    pub(crate) async fn get_page_text(
        &self,
        stage: Stage,
        url: Url,
        user_agent: Option<&str>,
        referer: Option<&str>,
        extra_headers: Option<&[(HeaderName, &str)]>,
    ) -> Result<String, ExtractError> {
        let response = self
            .get_response(stage, url, user_agent, referer, extra_headers)
            .await?;

        self.cancellable(stage, response.text())
            .await?
            .map_err(|err| ExtractError::network(stage, body_failure(err)))
    }

    pub(crate) async fn read_bytes(&self, stage: Stage, response: reqwest::Response) -> Result<Vec<u8>, ExtractError> {
        let bytes = self
            .cancellable(stage, response.bytes())
            .await?
            .map_err(|err| ExtractError::network(stage, body_failure(err)))?;

        Ok(bytes.to_vec())
    }

    pub(crate) async fn get_page_json<T: DeserializeOwned>(
        &self,
        stage: Stage,
        url: Url,
        user_agent: Option<&str>,
        referer: Option<&str>,
        extra_headers: Option<&[(HeaderName, &str)]>,
    ) -> Result<T, ExtractError> {
        let text = self
            .get_page_text(stage, url, user_agent, referer, extra_headers)
            .await?;

        if text.trim().is_empty() {
            return Err(ExtractError::not_found(stage, "empty response body"));
        }

        serde_json::from_str(&text)
            .map_err(|err| ExtractError::unsupported(stage, format!("response is not the expected json: {err}")))
    }
}

fn request_failure(err: reqwest_middleware::Error) -> NetworkFailure {
    match &err {
        reqwest_middleware::Error::Reqwest(inner) if inner.is_timeout() => NetworkFailure::Timeout,
        _ => NetworkFailure::Request(err),
    }
}

fn body_failure(err: reqwest::Error) -> NetworkFailure {
    if err.is_timeout() {
        NetworkFailure::Timeout
    } else {
        NetworkFailure::Body(err)
    }
}

mod retry {
    // Based on reqwest_retry::DefaultRetryableStrategy
    pub(crate) mod strategy {
        use reqwest::StatusCode;
        use reqwest_retry::{Retryable, RetryableStrategy};

        pub struct CustomRetryStrategy;

        impl RetryableStrategy for CustomRetryStrategy {
            fn handle(&self, res: &Result<reqwest::Response, reqwest_middleware::Error>) -> Option<Retryable> {
                match res {
                    Ok(success) => on_request_success(success),
                    Err(error) => on_request_failure(error),
                }
            }
        }

        /// Retries server errors, 408 and 429. Redirects are passed through
        /// untouched, since they are followed by the caller.
        pub fn on_request_success(success: &reqwest::Response) -> Option<Retryable> {
            let status = success.status();

            if status.is_success() || status.is_redirection() {
                None
            } else if status.is_server_error() || [StatusCode::REQUEST_TIMEOUT, StatusCode::TOO_MANY_REQUESTS].contains(&status)
            {
                Some(Retryable::Transient)
            } else {
                Some(Retryable::Fatal)
            }
        }

        pub fn on_request_failure(error: &reqwest_middleware::Error) -> Option<Retryable> {
            let error = match error {
                reqwest_middleware::Error::Middleware(_) => return Some(Retryable::Fatal),
                reqwest_middleware::Error::Reqwest(error) => error,
            };

            if error.is_timeout() || error.is_connect() {
                Some(Retryable::Transient)
            } else if error.is_body() || error.is_decode() || error.is_builder() || error.is_redirect() {
                Some(Retryable::Fatal)
            } else if error.is_request() {
                Some(classify_transport_error(error))
            } else {
                None
            }
        }

        // A connection cut halfway through a response surfaces as a hyper error
        // wrapped inside the reqwest one.
        fn classify_transport_error(error: &reqwest::Error) -> Retryable {
            let Some(hyper_error) = find_source::<hyper::Error>(error) else {
                return Retryable::Fatal;
            };

            if hyper_error.is_incomplete_message() || hyper_error.is_canceled() {
                return Retryable::Transient;
            }

            match find_source::<std::io::Error>(hyper_error).map(std::io::Error::kind) {
                Some(std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted) => {
                    Retryable::Transient
                }
                _ => Retryable::Fatal,
            }
        }

        fn find_source<T: std::error::Error + 'static>(err: &dyn std::error::Error) -> Option<&T> {
            std::iter::successors(err.source(), |err| err.source()).find_map(|err| err.downcast_ref::<T>())
        }
    }
}
