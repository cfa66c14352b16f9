//! Image encoding: `DynamicImage` → base64 PNG ready for the OCR request.
//!
//! The recognition service accepts images as base64 data-URIs embedded in the
//! JSON request body. PNG is chosen over JPEG because it is lossless — text
//! crispness matters far more than file size for recognition accuracy, and
//! JPEG artefacts around glyph edges measurably degrade math OCR.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// A page image encoded for the recognition request body.
#[derive(Debug, Clone)]
pub struct EncodedPage {
    /// Base64-encoded PNG bytes.
    pub data: String,
    /// MIME type of the encoded bytes (always `image/png` today).
    pub mime_type: &'static str,
}

impl EncodedPage {
    /// The `data:` URI form the recognition API expects in its `src` field.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Encode a rasterised page as a base64 PNG.
pub fn encode_page(img: &DynamicImage) -> Result<EncodedPage, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let data = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", data.len());

    Ok(EncodedPage {
        data,
        mime_type: "image/png",
    })
}
