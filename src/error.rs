//! Error types for the pdf2quiz library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — **Fatal**: the extraction cannot proceed at all
//!   (bad input file, corrupt PDF, missing OCR credentials, zero usable
//!   text). Returned as `Err(ExtractError)` from the top-level `extract*`
//!   functions.
//!
//! * [`PageError`] — **Non-fatal**: recognition failed for a single page
//!   (transient API error, empty OCR result) but all other pages are fine.
//!   Stored inside [`crate::output::RecognizedPage`] so callers can inspect
//!   partial success rather than losing the whole document to one bad page.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! page failure, log and continue, or collect all errors for a post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2quiz library.
///
/// Page-level recognition failures use [`PageError`] and are stored in
/// [`crate::output::RecognizedPage`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The PDF opened cleanly but contains no pages.
    #[error("PDF '{path}' contains no pages")]
    EmptyPdf { path: PathBuf },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Recognition errors ────────────────────────────────────────────────
    /// No OCR credentials were supplied and none were found in the environment.
    #[error("OCR credentials are not configured.\n{hint}")]
    CredentialsMissing { hint: String },

    /// The OCR account check failed — the credentials are rejected outright.
    #[error("OCR credential verification failed: {detail}")]
    CredentialsRejected { detail: String },

    /// Every page failed recognition (or returned empty text); there is
    /// nothing to parse.
    ///
    /// Distinct from rasterisation failure: the PDF rendered fine but the
    /// recognition service produced no usable text for any page.
    #[error("No text could be extracted from any of the {total} pages.\nFirst error: {first_error}")]
    NoTextExtracted { total: usize, first_error: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy,\n\
or install pdfium from https://github.com/bblanchon/pdfium-binaries.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Whether the failure is attributable to the caller's input rather than
    /// the service itself.
    ///
    /// Transport layers use this to pick a 4xx-vs-5xx status class for the
    /// error payload.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExtractError::FileNotFound { .. }
                | ExtractError::PermissionDenied { .. }
                | ExtractError::InvalidInput { .. }
                | ExtractError::NotAPdf { .. }
                | ExtractError::CorruptPdf { .. }
                | ExtractError::EmptyPdf { .. }
                | ExtractError::PasswordRequired { .. }
                | ExtractError::WrongPassword { .. }
                | ExtractError::PageOutOfRange { .. }
                | ExtractError::NoTextExtracted { .. }
                | ExtractError::InvalidConfig(_)
        )
    }
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::RecognizedPage`] when a page fails.
/// The overall extraction continues unless ALL pages fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page image could not be PNG-encoded for the API request.
    #[error("Page {page}: image encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The recognition call failed after retries (transport error or non-2xx
    /// status from the OCR service).
    #[error("Page {page}: recognition failed after {retries} retries: {detail}")]
    OcrFailed {
        page: usize,
        retries: u8,
        detail: String,
    },

    /// The OCR call succeeded but the `text` field was missing or blank.
    ///
    /// Kept distinct from [`PageError::OcrFailed`] for diagnostics; the
    /// pipeline treats both the same way (skip the page, continue).
    #[error("Page {page}: recognition returned no text")]
    EmptyText { page: usize },

    /// The recognition call timed out.
    #[error("Page {page}: recognition timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_text_extracted_display() {
        let e = ExtractError::NoTextExtracted {
            total: 5,
            first_error: "HTTP 401".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("5 pages"), "got: {msg}");
        assert!(msg.contains("HTTP 401"));
    }

    #[test]
    fn empty_pdf_display() {
        let e = ExtractError::EmptyPdf {
            path: PathBuf::from("blank.pdf"),
        };
        assert!(e.to_string().contains("no pages"));
    }

    #[test]
    fn ocr_failed_display() {
        let e = PageError::OcrFailed {
            page: 3,
            retries: 2,
            detail: "HTTP 429".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Page 3"));
        assert!(msg.contains("HTTP 429"));
    }

    #[test]
    fn empty_text_is_distinct_from_failure() {
        let empty = PageError::EmptyText { page: 1 };
        let failed = PageError::OcrFailed {
            page: 1,
            retries: 0,
            detail: "x".into(),
        };
        assert_ne!(empty.to_string(), failed.to_string());
    }

    #[test]
    fn client_error_classification() {
        let client = ExtractError::NotAPdf {
            path: PathBuf::from("x.pdf"),
            magic: *b"<htm",
        };
        assert!(client.is_client_error());

        let server = ExtractError::Internal("boom".into());
        assert!(!server.is_client_error());

        // Zero extractable text is the caller's document, not our bug.
        let no_text = ExtractError::NoTextExtracted {
            total: 2,
            first_error: "blank".into(),
        };
        assert!(no_text.is_client_error());
    }
}
