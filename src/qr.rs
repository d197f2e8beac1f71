//! QR code rendering
//!
//! Produces PNG images of QR symbols in memory, ready to upload as a photo.

use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use std::io::Cursor;
use thiserror::Error;

/// Errors that can occur while rendering a QR code
#[derive(Debug, Error)]
pub enum QrError {
    /// The payload does not fit into any QR symbol version
    #[error("Payload cannot be encoded as a QR symbol: {0}")]
    Encode(#[from] qrcode::types::QrError),
    /// The rendered image could not be written as PNG
    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Renders text into a PNG QR code.
#[cfg_attr(test, mockall::automock)]
pub trait QrEncoder: Send + Sync {
    /// Returns PNG bytes of a QR code whose payload is exactly `payload`.
    ///
    /// # Errors
    ///
    /// Returns `QrError` if the payload cannot be encoded or the PNG cannot be written.
    fn encode_png(&self, payload: &str) -> Result<Vec<u8>, QrError>;
}

/// QR encoder using error-correction level M and square pixel modules.
#[derive(Debug, Clone, Copy)]
pub struct PngQrEncoder {
    module_px: u32,
}

impl PngQrEncoder {
    /// Default edge length of one module in pixels.
    pub const DEFAULT_MODULE_PX: u32 = 8;

    /// Creates an encoder drawing each module as a `module_px` square.
    ///
    /// A size of zero is treated as one pixel.
    #[must_use]
    pub fn new(module_px: u32) -> Self {
        Self {
            module_px: module_px.max(1),
        }
    }
}

impl Default for PngQrEncoder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MODULE_PX)
    }
}

impl QrEncoder for PngQrEncoder {
    fn encode_png(&self, payload: &str) -> Result<Vec<u8>, QrError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)?;
        let image = code
            .render::<Luma<u8>>()
            .quiet_zone(true)
            .module_dimensions(self.module_px, self.module_px)
            .build();

        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}
