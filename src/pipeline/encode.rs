//! Image encoding: `DynamicImage` → JPEG bytes → base64 `ImageData`.
//!
//! ## Why JPEG?
//!
//! The page artifacts this service caches on disk are `.jpg` files, and the
//! vision payload reuses those exact bytes, so one encode serves both the
//! cache and the API call. JPEG also keeps multi-megapixel page renders far
//! below vision-API upload limits; at render resolution the compression does
//! not measurably hurt transcription.
//!
//! ## Why `detail: "high"`?
//!
//! OpenAI's tiling algorithm divides images into 512 px tiles. `detail: "high"`
//! enables up to 10 tiles, allowing fine print and small tables to be seen.
//! `detail: "low"` forces a single 512 px overview tile and loses all fine
//! structure.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page as JPEG bytes.
pub fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    // JPEG has no alpha channel; pdfium renders RGBA.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)?;
    Ok(buf)
}

/// Wrap JPEG bytes as a base64 image attachment for the vision API.
pub fn to_image_data(jpeg: &[u8]) -> ImageData {
    let b64 = STANDARD.encode(jpeg);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, "image/jpeg").with_detail("high")
}
