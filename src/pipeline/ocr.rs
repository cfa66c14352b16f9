//! Text recognition: send one page image to the OCR service, get text back.
//!
//! The service contract is a single synchronous call per page image:
//! `POST {base_url}/v3/text` with `app_id`/`app_key` headers and a JSON body
//! carrying the image as a base64 data-URI. On success the response carries a
//! `text` field with plain text plus inline LaTeX/AsciiMath markers.
//!
//! [`TextRecognizer`] is the seam between the pipeline and the network:
//! production uses [`MathpixClient`], tests inject a scripted recognizer, and
//! callers can wrap either with caching or rate-limiting middleware.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 5xx from recognition APIs are transient and frequent. Exponential
//! backoff (`retry_backoff_ms * 2^(attempt-1)`) avoids thundering-herd: with
//! 500 ms base and 2 retries the wait sequence is 500 ms → 1 s. An OK response
//! with blank text is *not* retried — the service answered; the page simply
//! has nothing recognisable on it.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, PageError};
use crate::output::RecognizedPage;
use crate::pipeline::encode::EncodedPage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Environment variables consulted by [`OcrCredentials::from_env`].
pub const APP_ID_ENV: &str = "MATHPIX_APP_ID";
pub const APP_KEY_ENV: &str = "MATHPIX_APP_KEY";

/// Credential pair for the recognition service.
///
/// Always injected — never read from ambient state inside the pipeline, so
/// the core stays unit-testable without environment mocking.
#[derive(Clone, PartialEq, Eq)]
pub struct OcrCredentials {
    pub app_id: String,
    pub app_key: String,
}

impl OcrCredentials {
    pub fn new(app_id: impl Into<String>, app_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_key: app_key.into(),
        }
    }

    /// Read credentials from `MATHPIX_APP_ID` / `MATHPIX_APP_KEY`.
    ///
    /// Absence of either is a fatal configuration error — the caller should
    /// surface it at startup, before accepting any document.
    pub fn from_env() -> Result<Self, ExtractError> {
        let app_id = std::env::var(APP_ID_ENV).unwrap_or_default();
        let app_key = std::env::var(APP_KEY_ENV).unwrap_or_default();
        if app_id.is_empty() || app_key.is_empty() {
            return Err(ExtractError::CredentialsMissing {
                hint: format!(
                    "Set {APP_ID_ENV} and {APP_KEY_ENV}, or pass credentials explicitly \
                     via ExtractionConfig::builder().credentials(...)."
                ),
            });
        }
        Ok(Self { app_id, app_key })
    }
}

impl fmt::Debug for OcrCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The key must never reach logs.
        f.debug_struct("OcrCredentials")
            .field("app_id", &self.app_id)
            .field("app_key", &"<redacted>")
            .finish()
    }
}

/// One recognition backend: turns a page image into text.
///
/// Implementations must be cheap to call repeatedly — the pipeline issues one
/// call per page and handles retry/backoff itself in [`recognize_page`].
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognise the text on one page image.
    ///
    /// `Ok` carries the recognised text, which may legitimately be empty
    /// (blank page); the caller decides how to treat that. `Err` means the
    /// call itself failed and may be retried.
    async fn recognize(&self, page_num: usize, image: &EncodedPage) -> Result<String, PageError>;
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TextRequest<'a> {
    src: String,
    formats: [&'a str; 1],
    data_options: DataOptions,
}

#[derive(Serialize)]
struct DataOptions {
    include_latex: bool,
    include_asciimath: bool,
}

#[derive(Deserialize)]
struct TextResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// ── HTTP client ──────────────────────────────────────────────────────────

/// Recognition client for the Mathpix `v3/text` API.
pub struct MathpixClient {
    http: reqwest::Client,
    base_url: String,
    credentials: OcrCredentials,
    timeout_secs: u64,
}

impl MathpixClient {
    /// Build a client with the per-call timeout applied at the HTTP layer.
    pub fn new(
        base_url: impl Into<String>,
        credentials: OcrCredentials,
        timeout_secs: u64,
    ) -> Result<Self, ExtractError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            timeout_secs,
        })
    }

    /// Check the credential pair against the account endpoint.
    ///
    /// Meant to run once at startup so a bad key surfaces before any document
    /// is accepted, not on page 1 of the first upload.
    pub async fn verify_credentials(&self) -> Result<(), ExtractError> {
        let url = format!("{}/v3/account", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("app_id", &self.credentials.app_id)
            .header("app_key", &self.credentials.app_key)
            .send()
            .await
            .map_err(|e| ExtractError::CredentialsRejected {
                detail: e.to_string(),
            })?;

        if response.status().is_success() {
            debug!("OCR credentials verified");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ExtractError::CredentialsRejected {
                detail: format!("HTTP {}: {}", status, truncate(&body, 200)),
            })
        }
    }
}

#[async_trait]
impl TextRecognizer for MathpixClient {
    async fn recognize(&self, page_num: usize, image: &EncodedPage) -> Result<String, PageError> {
        let url = format!("{}/v3/text", self.base_url);
        let body = TextRequest {
            src: image.data_uri(),
            formats: ["text"],
            data_options: DataOptions {
                include_latex: true,
                include_asciimath: true,
            },
        };

        let response = self
            .http
            .post(&url)
            .header("app_id", &self.credentials.app_id)
            .header("app_key", &self.credentials.app_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PageError::Timeout {
                        page: page_num,
                        secs: self.timeout_secs,
                    }
                } else {
                    PageError::OcrFailed {
                        page: page_num,
                        retries: 0,
                        detail: e.to_string(),
                    }
                }
            })?;

        // Success is determined purely by the transport-level status.
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PageError::OcrFailed {
                page: page_num,
                retries: 0,
                detail: format!("HTTP {}: {}", status, truncate(&body, 200)),
            });
        }

        let parsed: TextResponse = response.json().await.map_err(|e| PageError::OcrFailed {
            page: page_num,
            retries: 0,
            detail: format!("malformed response: {}", e),
        })?;

        // Some failures arrive as 200s with an error field in the body.
        if let Some(err) = parsed.error {
            return Err(PageError::OcrFailed {
                page: page_num,
                retries: 0,
                detail: err,
            });
        }

        Ok(parsed.text.unwrap_or_default())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Per-page driver ──────────────────────────────────────────────────────

/// Recognise one page with retry/backoff, never propagating the error.
///
/// Always returns a [`RecognizedPage`] so a single bad page cannot abort the
/// document; callers check `result.error` to decide whether the page
/// contributes text. An OK-but-blank response becomes
/// [`PageError::EmptyText`] without retrying.
pub async fn recognize_page(
    recognizer: &Arc<dyn TextRecognizer>,
    page_num: usize,
    image: &EncodedPage,
    config: &ExtractionConfig,
) -> RecognizedPage {
    let start = Instant::now();
    let mut last_err: Option<PageError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Page {}: retry {}/{} after {}ms",
                page_num, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match recognizer.recognize(page_num, image).await {
            Ok(text) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                if text.trim().is_empty() {
                    debug!("Page {}: recognition returned blank text", page_num);
                    return RecognizedPage {
                        page_num,
                        text: String::new(),
                        duration_ms,
                        retries: attempt as u8,
                        error: Some(PageError::EmptyText { page: page_num }),
                    };
                }
                debug!("Page {}: {} bytes of text", page_num, text.len());
                return RecognizedPage {
                    page_num,
                    text,
                    duration_ms,
                    retries: attempt as u8,
                    error: None,
                };
            }
            Err(e) => {
                warn!("Page {}: attempt {} failed — {}", page_num, attempt + 1, e);
                last_err = Some(e);
            }
        }
    }

    // All retries exhausted; stamp the final retry count onto the error.
    let error = match last_err {
        Some(PageError::OcrFailed { page, detail, .. }) => PageError::OcrFailed {
            page,
            retries: config.max_retries as u8,
            detail,
        },
        Some(other) => other,
        None => PageError::OcrFailed {
            page: page_num,
            retries: config.max_retries as u8,
            detail: "unknown error".into(),
        },
    };

    RecognizedPage {
        page_num,
        text: String::new(),
        duration_ms: start.elapsed().as_millis() as u64,
        retries: config.max_retries as u8,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn png_stub() -> EncodedPage {
        EncodedPage {
            data: "aGVsbG8=".into(),
            mime_type: "image/png",
        }
    }

    fn fast_config() -> ExtractionConfig {
        ExtractionConfig::builder()
            .max_retries(2)
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    /// Scripted recognizer: fails `failures` times, then returns `text`.
    struct FlakyRecognizer {
        failures: usize,
        text: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextRecognizer for FlakyRecognizer {
        async fn recognize(
            &self,
            page_num: usize,
            _image: &EncodedPage,
        ) -> Result<String, PageError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(PageError::OcrFailed {
                    page: page_num,
                    retries: 0,
                    detail: "HTTP 503".into(),
                })
            } else {
                Ok(self.text.clone())
            }
        }
    }

    #[test]
    fn credentials_debug_redacts_key() {
        let creds = OcrCredentials::new("app_123", "secret_456");
        let dbg = format!("{:?}", creds);
        assert!(dbg.contains("app_123"));
        assert!(!dbg.contains("secret_456"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn request_body_shape() {
        let body = TextRequest {
            src: png_stub().data_uri(),
            formats: ["text"],
            data_options: DataOptions {
                include_latex: true,
                include_asciimath: true,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value["src"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert_eq!(value["formats"][0], "text");
        assert_eq!(value["data_options"]["include_latex"], true);
        assert_eq!(value["data_options"]["include_asciimath"], true);
    }

    #[test]
    fn response_parses_with_and_without_text() {
        let with: TextResponse = serde_json::from_str(r#"{"text":"1. Q (A) x"}"#).unwrap();
        assert_eq!(with.text.as_deref(), Some("1. Q (A) x"));

        let without: TextResponse = serde_json::from_str(r#"{"error":"bad image"}"#).unwrap();
        assert!(without.text.is_none());
        assert_eq!(without.error.as_deref(), Some("bad image"));
    }

    #[tokio::test]
    async fn recognize_page_recovers_after_transient_failure() {
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(FlakyRecognizer {
            failures: 1,
            text: "1. What is 2+2? (A) 3 (B) 4".into(),
            calls: AtomicUsize::new(0),
        });
        let page = recognize_page(&recognizer, 1, &png_stub(), &fast_config()).await;
        assert!(page.is_success());
        assert_eq!(page.retries, 1);
        assert!(page.text.contains("2+2"));
    }

    #[tokio::test]
    async fn recognize_page_exhausts_retries() {
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(FlakyRecognizer {
            failures: usize::MAX,
            text: String::new(),
            calls: AtomicUsize::new(0),
        });
        let config = fast_config();
        let page = recognize_page(&recognizer, 3, &png_stub(), &config).await;
        assert!(!page.is_success());
        match page.error {
            Some(PageError::OcrFailed { page, retries, .. }) => {
                assert_eq!(page, 3);
                assert_eq!(retries as u32, config.max_retries);
            }
            other => panic!("expected OcrFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn recognize_page_classifies_blank_text_without_retry() {
        let recognizer: Arc<dyn TextRecognizer> = Arc::new(FlakyRecognizer {
            failures: 0,
            text: "   \n ".into(),
            calls: AtomicUsize::new(0),
        });
        let page = recognize_page(&recognizer, 2, &png_stub(), &fast_config()).await;
        assert!(matches!(page.error, Some(PageError::EmptyText { page: 2 })));
        assert_eq!(page.retries, 0, "blank text must not be retried");
        assert!(page.text.is_empty());
    }
}
