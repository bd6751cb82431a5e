use std::io::Cursor;

use image::codecs::jpeg::JpegDecoder;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageFormat};

use crate::model::Image;

use super::canvas::DrawOp;
use super::layout::{Flow, MIN_EXTENT};

/// Pixel data in the form it will be written to the PDF.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ImagePayload {
    /// Baseline JPEG passed through untouched as a DCT stream.
    Jpeg { data: Vec<u8>, gray: bool },
    /// Raw 8-bit RGB samples plus an optional 8-bit alpha plane.
    Raw { rgb: Vec<u8>, alpha: Option<Vec<u8>> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub(crate) payload: ImagePayload,
}

fn declared_format(content_type: &str) -> Option<ImageFormat> {
    let subtype = content_type
        .trim()
        .to_ascii_lowercase()
        .rsplit('/')
        .next()
        .map(str::to_string)?;
    match subtype.as_str() {
        "png" | "x-png" => Some(ImageFormat::Png),
        "jpeg" | "jpg" | "pjpeg" => Some(ImageFormat::Jpeg),
        "gif" => Some(ImageFormat::Gif),
        "bmp" | "x-bmp" | "x-ms-bmp" => Some(ImageFormat::Bmp),
        _ => None,
    }
}

/// Decode an extracted image. The declared type is tried first, then the PNG
/// and JPEG decoders, then whatever the bytes look like. Returns `None` (and
/// logs) when nothing can read it; the document goes on without the image.
pub(crate) fn prepare_image(image: &Image, index: usize) -> Option<PreparedImage> {
    let mut candidates: Vec<ImageFormat> = Vec::with_capacity(4);
    let sniffed = image::guess_format(&image.data).ok();
    for fmt in [
        declared_format(&image.content_type),
        Some(ImageFormat::Png),
        Some(ImageFormat::Jpeg),
        sniffed,
    ]
    .into_iter()
    .flatten()
    {
        if !candidates.contains(&fmt) {
            candidates.push(fmt);
        }
    }

    for fmt in candidates {
        let prepared = match fmt {
            ImageFormat::Jpeg => prepare_jpeg(&image.data),
            other => decode_raw(&image.data, other),
        };
        match prepared {
            Ok(prepared) => {
                log::debug!(
                    "Image {index}: {}x{} via {:?} (declared {:?})",
                    prepared.width,
                    prepared.height,
                    fmt,
                    image.content_type
                );
                return Some(prepared);
            }
            Err(e) => log::debug!("Image {index}: {fmt:?} decoder failed: {e}"),
        }
    }

    log::warn!(
        "Skipping image {index} ({}, {} bytes): no decoder could read it",
        image.content_type,
        image.data.len()
    );
    None
}

fn prepare_jpeg(data: &[u8]) -> image::ImageResult<PreparedImage> {
    let decoder = JpegDecoder::new(Cursor::new(data))?;
    let color = decoder.original_color_type();
    let decoded = DynamicImage::from_decoder(decoder)?;
    let (width, height) = (decoded.width(), decoded.height());
    match color {
        ExtendedColorType::L8 | ExtendedColorType::Rgb8 => Ok(PreparedImage {
            width,
            height,
            payload: ImagePayload::Jpeg {
                data: data.to_vec(),
                gray: color == ExtendedColorType::L8,
            },
        }),
        // CMYK and friends: let the decoder convert, store as RGB.
        _ => Ok(raw_from_dynamic(&decoded)),
    }
}

fn decode_raw(data: &[u8], format: ImageFormat) -> image::ImageResult<PreparedImage> {
    let decoded = image::load_from_memory_with_format(data, format)?;
    Ok(raw_from_dynamic(&decoded))
}

fn raw_from_dynamic(decoded: &DynamicImage) -> PreparedImage {
    let rgba = decoded.to_rgba8();
    let (width, height) = (rgba.width(), rgba.height());
    let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);
    let rgb: Vec<u8> = rgba
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
        .collect();
    let alpha = has_alpha.then(|| rgba.pixels().map(|p| p.0[3]).collect());
    PreparedImage {
        width,
        height,
        payload: ImagePayload::Raw { rgb, alpha },
    }
}

/// Display size: never upscaled, bounded by both limits, aspect ratio kept.
pub(crate) fn fit_image(width: u32, height: u32, max_width: f32, max_height: f32) -> (f32, f32) {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    let scale = (max_width / w).min(max_height / h).min(1.0);
    ((w * scale).max(MIN_EXTENT), (h * scale).max(MIN_EXTENT))
}

/// Place an image centered in the content column as one atomic unit.
pub(crate) fn place_image(flow: &mut Flow, index: usize, image: &PreparedImage) {
    let typo = &flow.config.typography;
    let (space_before, space_after) = (typo.image_space_before, typo.image_space_after);
    let max_height = typo
        .image_max_height
        .min(flow.config.page.content_height());
    let (width, height) = fit_image(image.width, image.height, flow.width(), max_height);

    flow.reserve(space_before + height);
    flow.gap(space_before);

    let x = flow.left() + (flow.width() - width) / 2.0;
    let y = flow.cursor().y - height;
    flow.canvas().push(DrawOp::Image {
        index,
        x,
        y,
        width,
        height,
    });
    flow.advance(height);
    flow.gap(space_after);
}
