use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_core::Stream;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::BridgeError;

/// GET request handed to a transport.
///
/// The crate only ever fetches remote payloads, so there is no method or body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
    /// Largest body the caller accepts; transports should stop reading past it.
    pub max_body_bytes: Option<usize>,
}

impl HttpRequest {
    /// Builds a GET request without limits.
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_bridge::http::HttpRequest;
    ///
    /// let request = HttpRequest::get("https://example.com/cat.png").with_max_body_bytes(1024);
    /// assert_eq!(request.max_body_bytes, Some(1024));
    /// assert!(request.timeout.is_none());
    /// ```
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
            max_body_bytes: None,
        }
    }

    /// Sets a per-request timeout enforced by the transport.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = Some(limit);
        self
    }
}

/// Minimal HTTP response representation.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns `true` for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Declared `Content-Length`, matched case-insensitively.
    pub fn content_length(&self) -> Option<u64> {
        declared_content_length(&self.headers)
    }
}

fn declared_content_length(headers: &HashMap<String, String>) -> Option<u64> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
}

fn body_too_large(size: impl Display, limit: usize) -> BridgeError {
    BridgeError::transport(format!("payload of {size} bytes exceeds limit of {limit}"))
}

/// Rejects a response whose declared `Content-Length` is above `limit`.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use kotoba_bridge::http::check_content_length;
///
/// let huge = HashMap::from([("Content-Length".to_string(), "5368709120".to_string())]);
/// assert!(check_content_length(&huge, 1024).is_err());
/// assert!(check_content_length(&HashMap::new(), 1024).is_ok());
/// ```
///
/// # Errors
///
/// Returns [`BridgeError::Transport`] when the declared length is too large.
pub fn check_content_length(
    headers: &HashMap<String, String>,
    limit: usize,
) -> Result<(), BridgeError> {
    match declared_content_length(headers) {
        Some(length) if length > limit as u64 => Err(body_too_large(length, limit)),
        _ => Ok(()),
    }
}

/// Drains a chunked body, stopping as soon as it grows past `limit`.
///
/// Chunks after the one that crosses the limit are never polled.
///
/// # Errors
///
/// Returns [`BridgeError::Transport`] when a chunk fails or the limit is exceeded.
pub async fn collect_body<S, B, E>(chunks: S, limit: Option<usize>) -> Result<Vec<u8>, BridgeError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut body = Vec::new();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|err| BridgeError::transport(err.to_string()))?;
        let chunk = chunk.as_ref();
        if let Some(limit) = limit {
            let size = body.len() + chunk.len();
            if size > limit {
                return Err(body_too_large(format!("at least {size}"), limit));
            }
        }
        body.extend_from_slice(chunk);
    }
    Ok(body)
}

/// Transport abstraction used to decouple the translator from the concrete HTTP client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and resolves when the full response is available.
    ///
    /// # Examples
    ///
    /// ```
    /// # use async_trait::async_trait;
    /// # use kotoba_bridge::http::{HttpTransport, HttpRequest, HttpResponse};
    /// # use kotoba_bridge::error::BridgeError;
    /// struct MemoryTransport;
    ///
    /// #[async_trait]
    /// impl HttpTransport for MemoryTransport {
    ///     async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BridgeError> {
    ///         Ok(HttpResponse { status: 200, headers: request.headers, body: b"ok".to_vec() })
    ///     }
    /// }
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let response = MemoryTransport
    ///     .send(HttpRequest::get("https://example.com"))
    ///     .await
    ///     .unwrap();
    /// assert_eq!(response.status, 200);
    /// # });
    /// ```
    ///
    /// # Errors
    ///
    /// Implementations should map network failures to [`BridgeError::Transport`].
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, BridgeError>;
}

/// Thread-safe handle to a transport implementation.
pub type DynHttpTransport = Arc<dyn HttpTransport>;

/// Caller-owned deadline and cancellation signal for a single fetch.
///
/// The context is cheap to clone; clones share the same cancellation token.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    /// Upper bound for the whole fetch, including reading the body.
    pub timeout: Option<Duration>,
    /// Cancelling this token aborts an in-flight fetch.
    pub cancel: CancellationToken,
}

impl FetchContext {
    /// Builds a context with a deadline and a fresh cancellation token.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the cancellation token, e.g. with a child of a request-scoped token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Fetches `url` and returns its body encoded as standard base64.
///
/// The fetch is issued exactly once: no retries, no redirects beyond what the
/// transport does on its own. It stops early when the context's token is
/// cancelled or its deadline elapses.
///
/// # Examples
///
/// ```
/// # use async_trait::async_trait;
/// # use kotoba_bridge::http::{download_base64, FetchContext, HttpTransport, HttpRequest, HttpResponse};
/// # use kotoba_bridge::error::BridgeError;
/// struct PixelTransport;
///
/// #[async_trait]
/// impl HttpTransport for PixelTransport {
///     async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, BridgeError> {
///         Ok(HttpResponse { status: 200, headers: Default::default(), body: vec![1, 2, 3] })
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let encoded = download_base64(&PixelTransport, &FetchContext::default(), "https://example.com/p.png", 1024)
///     .await
///     .unwrap();
/// assert_eq!(encoded, "AQID");
/// # });
/// ```
///
/// # Errors
///
/// - [`BridgeError::Aborted`] when cancelled or timed out.
/// - [`BridgeError::Transport`] for non-2xx statuses, oversized bodies, or
///   errors raised by the transport.
pub async fn download_base64(
    transport: &dyn HttpTransport,
    ctx: &FetchContext,
    url: &str,
    max_bytes: usize,
) -> Result<String, BridgeError> {
    tracing::debug!(url = %url, "downloading image payload");

    let request = HttpRequest::get(url)
        .with_timeout(ctx.timeout)
        .with_max_body_bytes(max_bytes);
    let send = transport.send(request);
    let response = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => {
            return Err(BridgeError::Aborted {
                message: format!("download of {url} cancelled"),
            });
        }
        result = with_deadline(ctx.timeout, send) => result.ok_or_else(|| BridgeError::Aborted {
            message: format!("download of {url} timed out"),
        })??,
    };

    if !response.is_success() {
        return Err(BridgeError::transport(format!(
            "status {} while fetching {url}",
            response.status
        )));
    }
    // 不遵守 max_body_bytes 的 transport 在这里兜底
    check_content_length(&response.headers, max_bytes)?;
    if response.body.len() > max_bytes {
        return Err(body_too_large(response.body.len(), max_bytes));
    }

    tracing::debug!(url = %url, bytes = response.body.len(), "downloaded image payload");
    Ok(STANDARD.encode(&response.body))
}

async fn with_deadline<F, T>(timeout: Option<Duration>, future: F) -> Option<T>
where
    F: std::future::Future<Output = T>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future).await.ok(),
        None => Some(future.await),
    }
}

pub mod reqwest;
