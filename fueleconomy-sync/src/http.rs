//! Conditional dataset fetch over HTTP with native-tls support.
//!
//! [`DatasetSource`] is the seam between the sync engine and the network;
//! [`HttpSource`] is the production implementation on top of `ureq`.

use crate::error::SyncError;
use crate::timestamp::{LastModified, normalize_last_modified};
use crate::validators::ValidationTokens;
use fueleconomy_config::Config;
use std::io::Read;
use std::time::Duration;
use ureq::Agent;
use ureq::tls::{RootCerts, TlsConfig, TlsProvider};

/// Header carrying the stored `ETag`.
pub const IF_NONE_MATCH: &str = "If-None-Match";
/// Header carrying the stored `Last-Modified` value.
pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";
/// Identifies this client to the server operators.
pub const USER_AGENT: &str = "User-Agent";

/// Preconditions for one fetch. Either, both, or neither may be set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionalRequest {
    /// Sent as `If-None-Match`.
    pub etag: Option<String>,
    /// Normalized and sent as `If-Modified-Since`.
    pub last_modified: Option<LastModified>,
}

impl ConditionalRequest {
    /// Preconditions matching the validators of the current dataset.
    pub fn from_tokens(tokens: &ValidationTokens) -> Self {
        Self {
            etag: tokens.etag.clone(),
            last_modified: tokens.last_modified.clone().map(LastModified::Http),
        }
    }

    /// Unconditional request; the server always sends the payload.
    pub fn unconditional() -> Self {
        Self::default()
    }
}

/// Precondition headers a request carries, in sending order.
pub fn conditional_headers(request: &ConditionalRequest) -> Vec<(&'static str, String)> {
    let mut headers = Vec::with_capacity(2);
    if let Some(etag) = request.etag.as_deref().filter(|etag| !etag.is_empty()) {
        headers.push((IF_NONE_MATCH, etag.to_string()));
    }
    if let Some(since) = request.last_modified.as_ref().and_then(normalize_last_modified) {
        headers.push((IF_MODIFIED_SINCE, since));
    }
    headers
}

/// Outcome of a conditional fetch that reached the server and got 200 or 304.
pub enum RemoteResponse {
    /// 304: the cached dataset is current.
    NotModified,
    /// 200: a new payload follows.
    Modified {
        /// `ETag` and `Last-Modified` of the new payload.
        tokens: ValidationTokens,
        /// Declared body length, when the transfer makes it checkable.
        content_length: Option<u64>,
        /// The archive bytes.
        body: Box<dyn Read>,
    },
}

impl std::fmt::Debug for RemoteResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteResponse::NotModified => f.write_str("NotModified"),
            RemoteResponse::Modified {
                tokens,
                content_length,
                ..
            } => f
                .debug_struct("Modified")
                .field("tokens", tokens)
                .field("content_length", content_length)
                .finish_non_exhaustive(),
        }
    }
}

/// Something that can answer a conditional request for the dataset.
pub trait DatasetSource {
    /// Where the dataset comes from, for log and error messages.
    fn location(&self) -> &str;

    /// Issue one conditional request.
    ///
    /// Transport failures map to [`SyncError::Unreachable`]; statuses other
    /// than 200 and 304 map to [`SyncError::Unexpected`].
    fn fetch(&self, request: &ConditionalRequest) -> Result<RemoteResponse, SyncError>;
}

/// Validate that a URL is usable as the dataset location.
///
/// Enforces:
/// - `http` or `https` scheme (no `file://`, `ftp://`, etc.)
/// - a non-empty host
pub fn validate_dataset_url(url: &str) -> Result<(), SyncError> {
    let parsed =
        url::Url::parse(url).map_err(|e| SyncError::InvalidUrl(format!("'{}': {}", url, e)))?;

    match parsed.scheme() {
        "https" | "http" => {}
        scheme => {
            return Err(SyncError::InvalidUrl(format!(
                "scheme '{}' rejected; only http and https are allowed. URL: {}",
                scheme, url
            )));
        }
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(SyncError::InvalidUrl(format!("'{}' has no host", url)));
    }

    Ok(())
}

/// Create a new HTTP agent configured with native-tls and a global timeout.
///
/// Status codes are never turned into errors by the agent: 304 is a normal
/// answer here, and other codes are classified by [`HttpSource::fetch`].
pub fn agent(timeout: Duration) -> Agent {
    let tls_config = TlsConfig::builder()
        .provider(TlsProvider::NativeTls)
        .root_certs(RootCerts::PlatformVerifier)
        .build();

    Agent::config_builder()
        .tls_config(tls_config)
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Fetches the dataset archive from a fixed URL.
pub struct HttpSource {
    url: String,
    user_agent: String,
    max_download_bytes: u64,
    agent: Agent,
}

impl HttpSource {
    /// Source configured from `config`.
    ///
    /// Fails with [`SyncError::InvalidUrl`] for an unusable URL and with
    /// [`SyncError::InvalidConfig`] for a zero timeout, a zero size cap, or
    /// an empty user agent.
    pub fn new(config: &Config) -> Result<Self, SyncError> {
        validate_dataset_url(&config.dataset_url)?;
        config.validate().map_err(SyncError::InvalidConfig)?;
        Ok(Self {
            url: config.dataset_url.clone(),
            user_agent: config.user_agent.clone(),
            max_download_bytes: config.max_download_bytes,
            agent: agent(Duration::from_secs(config.http_timeout_secs)),
        })
    }

    fn unreachable(&self, reason: impl std::fmt::Display) -> SyncError {
        SyncError::Unreachable {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

impl DatasetSource for HttpSource {
    fn location(&self) -> &str {
        &self.url
    }

    fn fetch(&self, request: &ConditionalRequest) -> Result<RemoteResponse, SyncError> {
        let headers = conditional_headers(request);
        log::info!("Requesting {} with preconditions {:?}", self.url, headers);

        let mut builder = self
            .agent
            .get(&self.url)
            .header(USER_AGENT, self.user_agent.as_str());
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let response = builder.call().map_err(|e| self.unreachable(e))?;
        let status = response.status().as_u16();

        match status {
            304 => {
                log::info!("{} not modified", self.url);
                Ok(RemoteResponse::NotModified)
            }
            200 => {
                let header = |name: &str| {
                    response
                        .headers()
                        .get(name)
                        .and_then(|value| value.to_str().ok())
                        .map(str::trim)
                        .filter(|value| !value.is_empty())
                        .map(str::to_string)
                };

                let tokens = ValidationTokens {
                    etag: header("etag"),
                    last_modified: header("last-modified"),
                };

                // A decoded body no longer matches the declared wire length
                let identity = header("content-encoding")
                    .is_none_or(|encoding| encoding.eq_ignore_ascii_case("identity"));
                let content_length = header("content-length")
                    .filter(|_| identity)
                    .and_then(|length| length.parse::<u64>().ok());

                log::info!(
                    "{} modified: etag={:?} last_modified={:?} length={:?}",
                    self.url,
                    tokens.etag,
                    tokens.last_modified,
                    content_length
                );

                let body = response
                    .into_body()
                    .into_with_config()
                    .limit(self.max_download_bytes)
                    .reader();

                Ok(RemoteResponse::Modified {
                    tokens,
                    content_length,
                    body: Box::new(body),
                })
            }
            other => Err(SyncError::Unexpected {
                url: self.url.clone(),
                status: other,
            }),
        }
    }
}
