use std::io::Cursor;

use anyhow::Context as _;

use crate::{
    foundation::error::{ArkError, ArkResult},
    imaging::buffer::{ChannelOrder, ImageBuffer, PixelFormat},
};

/// Encodes as straight-alpha RGBA PNG regardless of the buffer's channel order.
pub fn encode_png(img: &ImageBuffer) -> ArkResult<Vec<u8>> {
    let mut rgba = Vec::with_capacity(img.width as usize * img.height as usize * 4);
    for y in 0..img.height {
        for x in 0..img.width {
            rgba.extend_from_slice(&img.rgba_at(x, y));
        }
    }
    let rgba = image::RgbaImage::from_raw(img.width, img.height, rgba)
        .ok_or_else(|| ArkError::validation("image data does not match its dimensions"))?;

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(rgba)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(buf)
}

/// Decodes backend output into a 3-channel RGB buffer. Alpha, if any, is dropped.
pub fn decode_png(bytes: &[u8]) -> ArkResult<ImageBuffer> {
    let rgb = image::load_from_memory(bytes)
        .context("decode image from memory")?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    ImageBuffer::from_raw(
        width,
        height,
        PixelFormat::Rgb8,
        ChannelOrder::Rgba,
        rgb.into_raw(),
    )
}

#[cfg(test)]
#[path = "../../tests/unit/imaging/codec.rs"]
mod tests;
