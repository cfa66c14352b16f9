//! # pdf2quiz
//!
//! Extract multiple-choice questions — math notation included — from PDF
//! documents, using an external text-recognition (OCR) service.
//!
//! ## Why this crate?
//!
//! Exam sheets and problem sets are full of mathematics that plain
//! PDF-to-text tools garble: subscripts collapse, fractions flatten, and
//! symbols vanish. Instead this crate rasterises each page into a PNG and
//! sends it to a math-aware recognition service, which returns text with
//! inline LaTeX markers intact. The recognised document is then parsed into
//! structured question/option records ready for rendering.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Render    rasterise pages via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 3. Encode    PNG → base64 data-URI
//!  ├─ 4. Recognise one OCR call per page, failures isolated per page
//!  ├─ 5. Assemble  per-page text → document (display + parser views)
//!  └─ 6. Parse     question blocks → normalised Question records
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2quiz::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials auto-detected from MATHPIX_APP_ID / MATHPIX_APP_KEY
//!     let config = ExtractionConfig::default();
//!     let output = extract("exam.pdf", &config).await?;
//!     for question in &output.questions {
//!         println!("{}: {} ({} options)",
//!             question.number, question.text, question.options.len());
//!     }
//!     eprintln!("pages: {} ok / {} failed",
//!         output.stats.recognized_pages,
//!         output.stats.failed_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! A failed recognition call affects only its own page: a 5-page document
//! where page 3 fails still yields questions from pages 1, 2, 4, and 5.
//! The run as a whole fails only when the PDF cannot be opened or when not
//! a single page produced text — see [`ExtractError`] vs [`PageError`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2quiz` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2quiz = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod parse;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, PageMarker, PageSelection};
pub use error::{ExtractError, PageError};
pub use extract::{extract, extract_from_bytes, extract_sync, extract_to_file, inspect};
pub use output::{
    error_payload, DocumentMetadata, ExtractionOutput, ExtractionStats, Question, RecognizedPage,
};
pub use parse::normalize::normalize_math;
pub use parse::parse_questions;
pub use pipeline::ocr::{MathpixClient, OcrCredentials, TextRecognizer};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
