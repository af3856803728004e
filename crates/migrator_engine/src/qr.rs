use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, Luma};
use qrcode::render::svg;
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest edge, in pixels, of a rendered code.
const MIN_EDGE: u32 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QrFormat {
    #[default]
    Svg,
    Png,
}

#[derive(Debug, Error)]
pub enum QrError {
    #[error("nothing to encode")]
    Empty,
    #[error("cannot encode QR payload: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("cannot write PNG: {0}")]
    Png(#[from] image::ImageError),
}

/// Renders `payload` as a QR code wrapped in a `data:` URL, ready for an
/// `<img src>`.
pub fn render_qr_data_url(payload: &str, format: QrFormat) -> Result<String, QrError> {
    if payload.trim().is_empty() {
        return Err(QrError::Empty);
    }
    let code = QrCode::new(payload.as_bytes())?;
    match format {
        QrFormat::Svg => {
            let image = code
                .render::<svg::Color>()
                .min_dimensions(MIN_EDGE, MIN_EDGE)
                .quiet_zone(true)
                .dark_color(svg::Color("#000000"))
                .light_color(svg::Color("#ffffff"))
                .build();
            Ok(data_url("image/svg+xml", image.as_bytes()))
        }
        QrFormat::Png => {
            let image = code
                .render::<Luma<u8>>()
                .min_dimensions(MIN_EDGE, MIN_EDGE)
                .quiet_zone(true)
                .build();
            let mut bytes = Vec::new();
            image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
            Ok(data_url("image/png", &bytes))
        }
    }
}

fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
