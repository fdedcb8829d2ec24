//! Sync facade over a shared async HTTP client.
//!
//! Uses async reqwest behind a shared tokio runtime, presenting blocking
//! calls for worker-pool code. The client keeps a cookie store because the
//! DMS download handshake spans two requests in one session.

use std::sync::LazyLock;
use std::time::Duration;

use crate::backoff::Retryable;

/// Whole-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// The portal rejects unknown clients; present a browser UA like the web app.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Longest response excerpt kept for the error journal.
const BODY_EXCERPT_LEN: usize = 2048;

/// Error from one HTTP exchange.
#[derive(Debug)]
pub enum ApiError {
    /// Transport failure or non-2xx status
    Http {
        status: Option<u16>,
        message: String,
    },
    /// 2xx response whose body is not the expected shape
    Malformed { message: String, body: String },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Malformed { message, .. } => write!(f, "malformed response: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    pub fn malformed(message: impl Into<String>, body: &str) -> Self {
        Self::Malformed {
            message: message.into(),
            body: excerpt(body),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            Self::Malformed { .. } => None,
        }
    }
}

impl Retryable for ApiError {
    fn is_retryable(&self) -> bool {
        match self {
            // No status = transport-level failure (refused, reset, timeout)
            Self::Http { status: None, .. } => true,
            Self::Http {
                status: Some(s), ..
            } => matches!(s, 408 | 429 | 500..=599),
            // A clean 2xx with a broken body will not heal by retrying;
            // it is journaled and treated as empty instead.
            Self::Malformed { .. } => false,
        }
    }
}

/// Truncate a response body for logs and the error journal.
pub fn excerpt(body: &str) -> String {
    let mut end = body.len().min(BODY_EXCERPT_LEN);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

/// Operator-supplied bearer token plus the portal headers that go with it.
#[derive(Clone)]
pub struct Session {
    token: String,
    origin: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print the token
        f.debug_struct("Session")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            origin: None,
        }
    }

    /// Attach an `Origin`/`Referer` pair (the paginator endpoints check it).
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let mut req = req
            .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {}", self.token));
        if let Some(origin) = &self.origin {
            req = req
                .header(reqwest::header::ORIGIN, origin.clone())
                .header(reqwest::header::REFERER, format!("{origin}/"));
        }
        req
    }
}

/// Shared async HTTP client with connection pooling and a cookie store.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .pool_max_idle_per_host(8)
        .cookie_store(true)
        .user_agent(USER_AGENT)
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// POST a JSON body with bearer auth; parse the response as JSON.
///
/// A 2xx response that fails to parse is a `Malformed` error carrying a
/// body excerpt, so the caller can journal the full exchange context.
pub fn post_json(
    url: &str,
    session: &Session,
    payload: &serde_json::Value,
) -> Result<serde_json::Value, ApiError> {
    let text = SHARED_RUNTIME.handle().block_on(async {
        let resp = session
            .apply(http_client().post(url))
            .json(payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ApiError::from_reqwest(&e))?;
        resp.text().await.map_err(|e| ApiError::from_reqwest(&e))
    })?;
    serde_json::from_str(&text).map_err(|e| ApiError::malformed(format!("not JSON: {e}"), &text))
}

/// Plain GET returning the response body as text (the DMS landing page).
pub fn get_text(url: &str) -> Result<String, ApiError> {
    SHARED_RUNTIME.handle().block_on(async {
        let resp = http_client()
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ApiError::from_reqwest(&e))?;
        resp.text().await.map_err(|e| ApiError::from_reqwest(&e))
    })
}

/// Response to a form POST: raw bytes plus the declared content type.
#[derive(Debug)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// POST a urlencoded form (the DMS `download_file` endpoint).
pub fn post_form(
    url: &str,
    referer: &str,
    fields: &[(&str, &str)],
) -> Result<Download, ApiError> {
    SHARED_RUNTIME.handle().block_on(async {
        let resp = http_client()
            .post(url)
            .header(reqwest::header::REFERER, referer)
            .form(fields)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ApiError::from_reqwest(&e))?;
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_ascii_lowercase());
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?
            .to_vec();
        Ok(Download {
            bytes,
            content_type,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_err(status: u16) -> ApiError {
        ApiError::Http {
            status: Some(status),
            message: "test".to_string(),
        }
    }

    #[test]
    fn http_500_retryable() {
        assert!(http_err(500).is_retryable());
    }

    #[test]
    fn http_429_retryable() {
        assert!(http_err(429).is_retryable());
    }

    #[test]
    fn http_401_not_retryable() {
        // expired bearer token — retrying cannot help
        assert!(!http_err(401).is_retryable());
    }

    #[test]
    fn http_404_not_retryable() {
        assert!(!http_err(404).is_retryable());
    }

    #[test]
    fn network_error_retryable() {
        let err = ApiError::Http {
            status: None,
            message: "connection refused".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn malformed_not_retryable() {
        let err = ApiError::malformed("not JSON", "<html>oops</html>");
        assert!(!err.is_retryable());
    }

    #[test]
    fn display_with_status() {
        assert_eq!(format!("{}", http_err(503)), "HTTP 503: test");
    }

    #[test]
    fn excerpt_truncates() {
        let long = "x".repeat(5000);
        assert_eq!(excerpt(&long).len(), 2048);
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let s = "ș".repeat(2048); // 2 bytes each
        let e = excerpt(&s);
        assert!(e.len() <= 2048);
        assert!(s.starts_with(&e));
    }
}
