//! Configuration types for PDF question extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across threads, serialise them for logging, and
//! diff two runs to understand why their outputs differ.
//!
//! The core never reads ambient global state: credentials, DPI, and the OCR
//! endpoint all arrive through this struct, constructed once at process start.

use crate::error::ExtractError;
use crate::pipeline::ocr::{OcrCredentials, TextRecognizer};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for a PDF question extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2quiz::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(300)
///     .max_retries(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 300.
    ///
    /// 300 DPI keeps subscript-sized math legible to the recognition service.
    /// Lower values shrink upload size but cost accuracy on dense exam sheets.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 4096.
    ///
    /// A safety cap independent of DPI. A 300-DPI render of an A0 poster could
    /// produce a 28 000 px image and exhaust memory; this field caps either
    /// dimension, scaling the other proportionally.
    pub max_rendered_pixels: u32,

    /// Number of concurrent recognition calls. Default: 1 (strictly serial).
    ///
    /// Recognition calls are I/O-bound and the service is rate-limited per
    /// credential pair, so serial calls are the correct default. Raising this
    /// fans pages out concurrently; assembled output is always re-ordered by
    /// page index, never by completion order.
    pub concurrency: usize,

    /// OCR service credentials. If `None`, read from `MATHPIX_APP_ID` /
    /// `MATHPIX_APP_KEY` at extraction time.
    pub credentials: Option<OcrCredentials>,

    /// Base URL of the recognition service. Default: `https://api.mathpix.com`.
    pub ocr_base_url: String,

    /// Pre-constructed recognizer. Takes precedence over `credentials`.
    ///
    /// Lets callers supply custom middleware (caching, rate-limiting) or a
    /// scripted recognizer in tests — no network required.
    pub recognizer: Option<Arc<dyn TextRecognizer>>,

    /// Maximum retry attempts on a transient recognition failure. Default: 2.
    ///
    /// Most 5xx and timeout errors are transient (overloaded backend, network
    /// blip). Permanent errors are not retried — they surface as
    /// [`crate::error::PageError`] for that page only.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s, so concurrent workers
    /// never hammer a recovering endpoint in lockstep.
    pub retry_backoff_ms: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// Page marker used in the display form of the assembled text. Default:
    /// [`PageMarker::Numbered`].
    ///
    /// Markers exist for diagnostics only; the parser always operates on the
    /// marker-free form.
    pub page_marker: PageMarker,

    /// Per-recognition-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-page progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 4096,
            concurrency: 1,
            credentials: None,
            ocr_base_url: "https://api.mathpix.com".to_string(),
            recognizer: None,
            max_retries: 2,
            retry_backoff_ms: 500,
            password: None,
            pages: PageSelection::default(),
            page_marker: PageMarker::default(),
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("credentials", &self.credentials)
            .field("ocr_base_url", &self.ocr_base_url)
            .field("recognizer", &self.recognizer.as_ref().map(|_| "<dyn TextRecognizer>"))
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("pages", &self.pages)
            .field("page_marker", &self.page_marker)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn credentials(mut self, creds: OcrCredentials) -> Self {
        self.config.credentials = Some(creds);
        self
    }

    pub fn ocr_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.ocr_base_url = url.into();
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn page_marker(mut self, marker: PageMarker) -> Self {
        self.config.page_marker = marker;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ExtractError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(ExtractError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.ocr_base_url.is_empty() {
            return Err(ExtractError::InvalidConfig(
                "OCR base URL must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Process all pages (default).
    #[default]
    All,
    /// Process a single page (1-indexed).
    Single(usize),
    /// Process a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Process specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed
    /// page numbers, clipped to `total_pages`.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let in_range = |p: usize| p >= 1 && p <= total_pages;
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => in_range(*p).then(|| p - 1).into_iter().collect(),
            PageSelection::Range(start, end) => {
                ((*start).max(1) - 1..(*end).min(total_pages)).collect()
            }
            PageSelection::Set(pages) => {
                pages.iter().filter(|&&p| in_range(p)).map(|p| p - 1).collect()
            }
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// Page marker inserted between page texts in the display form of the
/// assembled document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageMarker {
    /// `--- Page N ---` heading before each page's text. (default)
    #[default]
    Numbered,
    /// No markers; pages joined with a blank line.
    None,
    /// Custom prefix; `{page}` is replaced with the 1-indexed page number.
    Custom(String),
}

impl PageMarker {
    /// Render the marker line for the given page number (1-indexed), or
    /// `None` when markers are disabled.
    pub fn render(&self, page_num: usize) -> Option<String> {
        match self {
            PageMarker::Numbered => Some(format!("--- Page {} ---", page_num)),
            PageMarker::None => None,
            PageMarker::Custom(tpl) => Some(tpl.replace("{page}", &page_num.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_are_serial() {
        let config = ExtractionConfig::builder().build().unwrap();
        assert_eq!(config.dpi, 300);
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn builder_clamps_dpi() {
        let config = ExtractionConfig::builder().dpi(1200).build().unwrap();
        assert_eq!(config.dpi, 600);
        let config = ExtractionConfig::builder().dpi(10).build().unwrap();
        assert_eq!(config.dpi, 72);
    }

    #[test]
    fn builder_rejects_empty_base_url() {
        let result = ExtractionConfig::builder().ocr_base_url("").build();
        assert!(result.is_err());
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(PageSelection::Range(3, 10).to_indices(4), vec![2, 3]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2] // deduplicated and sorted
        );
    }

    #[test]
    fn page_marker_render() {
        assert_eq!(
            PageMarker::Numbered.render(2).as_deref(),
            Some("--- Page 2 ---")
        );
        assert_eq!(PageMarker::None.render(2), None);
        assert_eq!(
            PageMarker::Custom("[p{page}]".into()).render(7).as_deref(),
            Some("[p7]")
        );
    }
}
