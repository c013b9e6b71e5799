use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use manga_core::ErrorKind;
use manga_logging::manga_debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};

use crate::html::looks_like_challenge;
use crate::{FetchError, FetchMetadata, FetchOutput, ProgressEvent};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Bytes of an error body inspected for challenge markers.
const CHALLENGE_SNIFF_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 20 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<ProgressEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sink that only writes progress to the debug log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: ProgressEvent) {
        manga_debug!("progress: {:?}", event);
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,image/avif,image/webp,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| FetchError::new(ErrorKind::TransientNetwork, err.to_string()))?;

        Ok(Self {
            client,
            max_bytes: settings.max_bytes,
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(ErrorKind::Parse, format!("invalid url: {err}")))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(classify_status(status.as_u16(), &body));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.max_bytes {
                return Err(too_large(self.max_bytes, content_len));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut buffer = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = buffer.len() as u64 + chunk.len() as u64;
            if next_len > self.max_bytes {
                return Err(too_large(self.max_bytes, next_len));
            }
            buffer.extend_from_slice(&chunk);
        }
        let bytes: Bytes = buffer.freeze();

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url,
            status: status.as_u16(),
            content_type,
            byte_len: bytes.len() as u64,
        };

        Ok(FetchOutput { bytes, metadata })
    }
}

/// Maps a non-success status to a failure kind. Challenge markers win over the status code.
pub(crate) fn classify_status(status: u16, body: &str) -> FetchError {
    let kind = if looks_like_challenge(body) {
        ErrorKind::Blocked
    } else {
        match status {
            404 | 410 => ErrorKind::NotFound,
            408 | 425 | 429 | 500..=599 => ErrorKind::TransientNetwork,
            401 | 403 | 451 => ErrorKind::Blocked,
            _ => ErrorKind::NotFound,
        }
    };
    FetchError::new(kind, format!("http status {status}")).with_status(status)
}

async fn read_error_body(response: reqwest::Response) -> String {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(Ok(chunk)) = stream.next().await {
        body.extend_from_slice(&chunk);
        if body.len() >= CHALLENGE_SNIFF_BYTES {
            break;
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

fn too_large(max_bytes: u64, actual: u64) -> FetchError {
    FetchError::new(
        ErrorKind::Parse,
        format!("response too large (max {max_bytes}, actual {actual})"),
    )
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_redirect() {
        // Redirect loops are how most challenge pages present themselves.
        return FetchError::new(ErrorKind::Blocked, err.to_string());
    }
    if err.is_builder() {
        return FetchError::new(ErrorKind::Parse, err.to_string());
    }
    FetchError::new(ErrorKind::TransientNetwork, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::classify_status;
    use manga_core::ErrorKind;

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(404, "").kind, ErrorKind::NotFound);
        assert_eq!(classify_status(410, "").kind, ErrorKind::NotFound);
        assert_eq!(classify_status(502, "").kind, ErrorKind::TransientNetwork);
        assert_eq!(classify_status(429, "").kind, ErrorKind::TransientNetwork);
        assert_eq!(classify_status(403, "").kind, ErrorKind::Blocked);
        assert_eq!(classify_status(418, "").kind, ErrorKind::NotFound);
        assert_eq!(classify_status(404, "").status, Some(404));
    }

    #[test]
    fn challenge_page_is_blocked_even_on_5xx() {
        let body = "<html><title>Just a moment...</title><div id=\"cf-chl-widget\"></div></html>";
        assert_eq!(classify_status(503, body).kind, ErrorKind::Blocked);
    }
}
