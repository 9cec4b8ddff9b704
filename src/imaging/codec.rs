//! Decode and encode between bytes and [`RasterImage`].
//!
//! Decoding sniffs the real format from magic bytes and falls back to the
//! declared MIME type. Encoding supports `image/jpeg` (flattened onto
//! white, since JPEG has no alpha) and `image/png` (RGBA).

use crate::types::MimeType;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageReader, RgbImage, RgbaImage};
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to encode {mime}: {message}")]
    Encode { mime: MimeType, message: String },
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unsupported MIME type: {0}")]
    UnsupportedMime(String),
    #[error("malformed data URL")]
    MalformedDataUrl,
}

/// Decoded bitmap plus the encoding it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub pixels: RgbaImage,
    pub mime: MimeType,
}

impl RasterImage {
    pub fn new(pixels: RgbaImage, mime: MimeType) -> Self {
        Self { pixels, mime }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Decode `bytes`, trusting magic bytes over the declared `mime`.
    pub fn decode(bytes: &[u8], mime: MimeType) -> Result<Self, CodecError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        let sniffed = reader.format().and_then(MimeType::from_image_format);
        let image = match reader.format() {
            Some(_) => reader.decode(),
            None => image::load_from_memory_with_format(bytes, mime.image_format()),
        }
        .map_err(|e| CodecError::Decode(format!("{mime}: {e}")))?;

        Ok(Self {
            pixels: image.to_rgba8(),
            mime: sniffed.unwrap_or(mime),
        })
    }

    /// Encode as `mime`. `jpeg_quality` is clamped to 1–100 and ignored for PNG.
    pub fn encode(&self, mime: MimeType, jpeg_quality: u8) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Vec::new();
        let (width, height) = self.dimensions();
        let result = match mime {
            MimeType::Jpeg => {
                let rgb = flatten_onto_white(&self.pixels);
                JpegEncoder::new_with_quality(Cursor::new(&mut buffer), jpeg_quality.clamp(1, 100))
                    .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
            }
            MimeType::Png => PngEncoder::new(Cursor::new(&mut buffer)).write_image(
                self.pixels.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            ),
        };
        result.map_err(|e| CodecError::Encode {
            mime,
            message: e.to_string(),
        })?;
        Ok(buffer)
    }
}

fn flatten_onto_white(pixels: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let p = pixels.get_pixel(x, y);
        let a = u16::from(p[3]);
        let mix = |c: u8| ((u16::from(c) * a + 255 * (255 - a) + 127) / 255) as u8;
        image::Rgb([mix(p[0]), mix(p[1]), mix(p[2])])
    })
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(text: &str) -> Result<Vec<u8>, CodecError> {
    Ok(STANDARD.decode(text.trim().as_bytes())?)
}

/// `data:<mime>;base64,<payload>`
pub fn to_data_url(mime: MimeType, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, encode_base64(bytes))
}

/// Split a base64 data URL into its MIME type and decoded bytes.
pub fn parse_data_url(url: &str) -> Result<(MimeType, Vec<u8>), CodecError> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or(CodecError::MalformedDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(CodecError::MalformedDataUrl)?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or(CodecError::MalformedDataUrl)?;
    let mime = mime
        .parse::<MimeType>()
        .map_err(|_| CodecError::UnsupportedMime(mime.to_string()))?;
    Ok((mime, decode_base64(payload)?))
}
