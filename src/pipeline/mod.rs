//! Pipeline stages for PDF question extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch recognition backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ ocr ──▶ assemble
//! (URL/path)  (pdfium)  (base64)  (API)   (document views)
//! ```
//!
//! 1. [`input`]    — canonicalise the user-supplied path or URL to a local file
//! 2. [`render`]   — rasterise selected pages; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`]   — PNG-encode and base64-wrap each page image for the
//!    recognition request body
//! 4. [`ocr`]      — drive the recognition call with retry/backoff; the only
//!    stage with network I/O
//! 5. [`assemble`] — stitch per-page texts into one document with a display
//!    view (page markers) and a pure view for the parser

pub mod assemble;
pub mod encode;
pub mod input;
pub mod ocr;
pub mod render;
