use crate::{
    foundation::error::{ArkError, ArkResult},
    imaging::buffer::{ChannelOrder, ImageBuffer, PixelFormat},
};

const OPAQUE_BLACK: [u8; 4] = [0, 0, 0, 0xff];

fn ensure_layout(img: &ImageBuffer, what: &str) -> ArkResult<()> {
    if img.layout_is_valid() {
        Ok(())
    } else {
        Err(ArkError::validation(format!(
            "{what} image has order {:?} on a {:?} {}x{} buffer of {} bytes",
            img.order,
            img.format,
            img.width,
            img.height,
            img.data.len()
        )))
    }
}

/// Copies `src` into `dst`, converting pixel layout and scale as needed.
///
/// `downsample` is the host's proxy factor per axis; it only matters when `src` is larger
/// than `dst`, where each destination pixel averages one `dx * dy` block of the source.
pub fn copy_image(src: &ImageBuffer, dst: &mut ImageBuffer, downsample: (u32, u32)) -> ArkResult<()> {
    ensure_layout(src, "source")?;
    ensure_layout(dst, "destination")?;

    let same_dims = src.same_dimensions(dst);
    if same_dims && src.format == dst.format {
        if src.order == dst.order {
            dst.data.copy_from_slice(&src.data);
        } else {
            for_each_pixel(dst, |dst, x, y| dst.set_rgba_at(x, y, src.rgba_at(x, y)));
        }
        return Ok(());
    }

    if same_dims && src.format == PixelFormat::Rgba8 && dst.order == ChannelOrder::Aaa {
        for_each_pixel(dst, |dst, x, y| dst.set_alpha_at(x, y, src.alpha_at(x, y)));
        return Ok(());
    }

    if same_dims && src.order == ChannelOrder::Aaa && dst.format == PixelFormat::Rgba8 {
        for_each_pixel(dst, |dst, x, y| dst.set_alpha_at(x, y, src.pixel(x, y)[0]));
        return Ok(());
    }

    if same_dims {
        for_each_pixel(dst, |dst, x, y| dst.set_rgba_at(x, y, src.rgba_at(x, y)));
        return Ok(());
    }

    if dst.width <= src.width && dst.height <= src.height {
        block_average(src, dst, downsample);
        return Ok(());
    }

    for_each_pixel(dst, |dst, x, y| {
        let rgba = if x < src.width && y < src.height {
            src.rgba_at(x, y)
        } else {
            OPAQUE_BLACK
        };
        dst.set_rgba_at(x, y, rgba);
    });
    Ok(())
}

fn for_each_pixel(dst: &mut ImageBuffer, mut f: impl FnMut(&mut ImageBuffer, u32, u32)) {
    for y in 0..dst.height {
        for x in 0..dst.width {
            f(dst, x, y);
        }
    }
}

fn block_average(src: &ImageBuffer, dst: &mut ImageBuffer, (dx, dy): (u32, u32)) {
    let (dx, dy) = (dx.max(1), dy.max(1));
    for_each_pixel(dst, |dst, x, y| {
        let x0 = x.saturating_mul(dx);
        let y0 = y.saturating_mul(dy);
        let x1 = x0.saturating_add(dx).min(src.width);
        let y1 = y0.saturating_add(dy).min(src.height);

        let mut sum = [0u32; 4];
        let mut n = 0u32;
        for sy in y0..y1 {
            for sx in x0..x1 {
                let px = src.rgba_at(sx, sy);
                for (acc, c) in sum.iter_mut().zip(px) {
                    *acc += u32::from(c);
                }
                n += 1;
            }
        }

        let rgba = if n == 0 {
            OPAQUE_BLACK
        } else {
            sum.map(|c| (c / n) as u8)
        };
        dst.set_rgba_at(x, y, rgba);
    });
}

/// Writes the grey channel of an `Aaa` image into the alpha of an equally sized RGBA image.
pub fn copy_alpha_to_image(src: &ImageBuffer, dst: &mut ImageBuffer) -> ArkResult<()> {
    if src.order != ChannelOrder::Aaa || src.format != PixelFormat::Rgb8 {
        return Err(ArkError::validation(format!(
            "alpha source must be 3-channel grey, got {:?}/{:?}",
            src.format, src.order
        )));
    }
    if dst.format != PixelFormat::Rgba8 {
        return Err(ArkError::validation("alpha destination must have 4 channels"));
    }
    if !src.same_dimensions(dst) {
        return Err(ArkError::validation(format!(
            "alpha source is {}x{}, destination is {}x{}",
            src.width, src.height, dst.width, dst.height
        )));
    }
    ensure_layout(src, "alpha source")?;
    ensure_layout(dst, "destination")?;

    for_each_pixel(dst, |dst, x, y| dst.set_alpha_at(x, y, src.pixel(x, y)[0]));
    Ok(())
}

/// Bilinear resample to exactly `width` x `height`, keeping format and channel order.
pub fn resize_up(img: &ImageBuffer, width: u32, height: u32) -> ArkResult<ImageBuffer> {
    use image::imageops::{self, FilterType};

    let raw_err = || ArkError::validation("image data does not match its dimensions");
    let data = match img.format {
        PixelFormat::Rgb8 => {
            let view = image::RgbImage::from_raw(img.width, img.height, img.data.clone())
                .ok_or_else(raw_err)?;
            imageops::resize(&view, width, height, FilterType::Triangle).into_raw()
        }
        PixelFormat::Rgba8 => {
            let view = image::RgbaImage::from_raw(img.width, img.height, img.data.clone())
                .ok_or_else(raw_err)?;
            imageops::resize(&view, width, height, FilterType::Triangle).into_raw()
        }
    };
    ImageBuffer::from_raw(width, height, img.format, img.order, data)
}

#[cfg(test)]
#[path = "../../tests/unit/imaging/ops.rs"]
mod tests;
