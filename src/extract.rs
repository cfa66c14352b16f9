//! Eager (full-document) extraction entry points.
//!
//! The pipeline runs once per call: resolve the input to a local PDF,
//! rasterise the selected pages, recognise each page against the OCR
//! service, assemble the per-page texts, and parse questions out of the
//! assembled document. Per-page recognition failures never abort the run;
//! the whole document fails only when the PDF cannot be opened or when no
//! page produced any text.
//!
//! Everything a request touches is request-scoped: rendered images live in
//! memory, byte inputs go to a [`tempfile::NamedTempFile`], URL downloads to
//! a [`tempfile::TempDir`] — all reclaimed by RAII on every exit path,
//! including mid-document failure.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, PageError};
use crate::output::{DocumentMetadata, ExtractionOutput, ExtractionStats, RecognizedPage};
use crate::parse;
use crate::pipeline::ocr::{MathpixClient, OcrCredentials, TextRecognizer};
use crate::pipeline::{assemble, encode, input, ocr, render};
use futures::stream::{self, StreamExt};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract questions from a PDF file or URL.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input_str` — Local file path or HTTP/HTTPS URL to a PDF
/// * `config` — Extraction configuration
///
/// # Returns
/// `Ok(ExtractionOutput)` on success, even if some pages failed
/// (check `output.stats.failed_pages`).
///
/// # Errors
/// Returns `Err(ExtractError)` only for fatal errors:
/// - File not found / permission denied / not a valid PDF
/// - Corrupt, empty, or password-protected PDF
/// - Missing OCR credentials
/// - Every page failed recognition (no text to parse)
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    // ── Step 2: Resolve recognizer ───────────────────────────────────────
    let recognizer = resolve_recognizer(config)?;

    // ── Step 3: Extract metadata ─────────────────────────────────────────
    let metadata = render::extract_metadata(&pdf_path, config.password.as_deref()).await?;
    let total_pages = metadata.page_count;
    if total_pages == 0 {
        return Err(ExtractError::EmptyPdf { path: pdf_path });
    }
    info!("PDF has {} pages", total_pages);

    // ── Step 4: Compute page indices ─────────────────────────────────────
    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(ExtractError::PageOutOfRange {
            page: 0,
            total: total_pages,
        });
    }
    debug!("Selected {} pages for extraction", page_indices.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(page_indices.len());
    }

    // ── Step 5: Rasterise pages ──────────────────────────────────────────
    let render_start = Instant::now();
    let rendered = render::render_pages(&pdf_path, config, &page_indices).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Rendered {} pages in {}ms",
        rendered.len(),
        render_duration_ms
    );

    // ── Step 6: Encode images to base64 PNG ──────────────────────────────
    // Encode failures become per-page records immediately; the page is
    // skipped, not the document.
    let mut failed_encodes: Vec<RecognizedPage> = Vec::new();
    let encoded: Vec<(usize, encode::EncodedPage)> = rendered
        .iter()
        .filter_map(|(idx, img)| match encode::encode_page(img) {
            Ok(page) => Some((*idx, page)),
            Err(e) => {
                warn!("Failed to encode page {}: {}", idx + 1, e);
                failed_encodes.push(RecognizedPage {
                    page_num: idx + 1,
                    text: String::new(),
                    duration_ms: 0,
                    retries: 0,
                    error: Some(PageError::EncodeFailed {
                        page: idx + 1,
                        detail: e.to_string(),
                    }),
                });
                None
            }
        })
        .collect();

    // ── Step 7: Recognise pages ──────────────────────────────────────────
    let ocr_start = Instant::now();
    let mut pages = recognize_pages(&recognizer, &encoded, config).await;
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    pages.extend(failed_encodes);
    // Page order, never completion order.
    pages.sort_by_key(|p| p.page_num);

    // ── Step 8: Assemble document ────────────────────────────────────────
    let document = assemble::assemble(&pages, &config.page_marker);
    let recognized = pages.iter().filter(|p| p.is_success()).count();
    let failed = pages.len() - recognized;

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(page_indices.len(), recognized);
    }

    if document.is_empty() {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "all pages returned empty text".to_string());
        return Err(ExtractError::NoTextExtracted {
            total: page_indices.len(),
            first_error,
        });
    }

    // ── Step 9: Parse questions ──────────────────────────────────────────
    let parsed = parse::parse_questions(document.pure());
    info!(
        "Parsed {} questions ({} blocks skipped)",
        parsed.questions.len(),
        parsed.skipped_blocks
    );

    // ── Step 10: Compute stats ───────────────────────────────────────────
    let stats = ExtractionStats {
        total_pages,
        recognized_pages: recognized,
        failed_pages: failed,
        skipped_pages: page_indices.len().saturating_sub(pages.len()),
        skipped_blocks: parsed.skipped_blocks,
        question_count: parsed.questions.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
        ocr_duration_ms,
    };

    info!(
        "Extraction complete: {}/{} pages, {} questions, {}ms total",
        recognized,
        page_indices.len(),
        stats.question_count,
        stats.total_duration_ms
    );

    Ok(ExtractionOutput {
        text: document.display().to_string(),
        questions: parsed.questions,
        pages,
        metadata,
        stats,
    })
}

/// Extract questions from PDF bytes in memory.
///
/// This avoids the need for the caller to create a temporary file.
/// Internally the library writes `bytes` to a managed [`tempfile`] and cleans
/// it up automatically on return or panic.
///
/// This is the recommended API when PDF data comes from an upload, a
/// database, or an in-memory buffer rather than a file on disk.
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    // `tmp` is dropped (and the file deleted) when `extract` returns
    extract(&path, config).await
}

/// Extract questions and write the JSON payload to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, ExtractError> {
    let output = extract(input_str, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ExtractError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let payload = serde_json::to_string_pretty(&output.to_payload())
        .map_err(|e| ExtractError::Internal(format!("payload serialisation: {e}")))?;

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, payload)
        .await
        .map_err(|e| ExtractError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ExtractError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output.stats)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, config))
}

/// Extract PDF metadata without recognising content.
///
/// Does not require OCR credentials.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentMetadata, ExtractError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    let pdf_path = resolved.path().to_path_buf();
    render::extract_metadata(&pdf_path, None).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the recognizer, from most-specific to least-specific.
///
/// The three-level fallback chain lets library users and CLI users each set
/// exactly as much or as little as they need:
///
/// 1. **Pre-built recognizer** (`config.recognizer`) — the caller constructed
///    it entirely; we use it as-is. Useful in tests or when the caller needs
///    custom middleware (caching, rate-limiting).
///
/// 2. **Explicit credentials** (`config.credentials`) — the caller supplied a
///    credential pair; we build a [`MathpixClient`] against
///    `config.ocr_base_url`.
///
/// 3. **Environment credentials** — `MATHPIX_APP_ID` / `MATHPIX_APP_KEY`.
///    Missing credentials are the fatal, startup-class
///    [`ExtractError::CredentialsMissing`].
fn resolve_recognizer(config: &ExtractionConfig) -> Result<Arc<dyn TextRecognizer>, ExtractError> {
    if let Some(ref recognizer) = config.recognizer {
        return Ok(Arc::clone(recognizer));
    }

    let credentials = match config.credentials {
        Some(ref creds) => creds.clone(),
        None => OcrCredentials::from_env()?,
    };

    let client = MathpixClient::new(&config.ocr_base_url, credentials, config.api_timeout_secs)?;
    Ok(Arc::new(client))
}

/// Recognise the encoded pages, at most `config.concurrency` in flight.
///
/// The default concurrency of 1 keeps calls strictly serial (the service is
/// rate-limited per credential pair). With fan-out enabled, results arrive
/// in completion order here — the caller re-sorts by page index before
/// assembly.
async fn recognize_pages(
    recognizer: &Arc<dyn TextRecognizer>,
    pages: &[(usize, encode::EncodedPage)],
    config: &ExtractionConfig,
) -> Vec<RecognizedPage> {
    let total_pages = pages.len();
    stream::iter(pages.iter().map(|(idx, image)| {
        let recognizer = Arc::clone(recognizer);
        let page_num = idx + 1;
        let image = image.clone();
        let config = config.clone();
        async move {
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_start(page_num, total_pages);
            }
            let result = ocr::recognize_page(&recognizer, page_num, &image, &config).await;
            if let Some(ref cb) = config.progress_callback {
                match &result.error {
                    None => cb.on_page_complete(page_num, total_pages, result.text.len()),
                    Some(e) => cb.on_page_error(page_num, total_pages, &e.to_string()),
                }
            }
            result
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await
}
