use crate::foundation::{
    core::Color,
    error::{ArkError, ArkResult},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

/// Byte order of the channels inside a pixel.
///
/// `Aaa` is a 3-channel grey/coverage image where every channel holds the same value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    Rgba,
    Bgra,
    Argb,
    Aaa,
}

/// Tightly packed 8-bit frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub order: ChannelOrder,
    pub data: Vec<u8>,
}

impl ImageBuffer {
    /// Opaque black frame.
    pub fn new(width: u32, height: u32, format: PixelFormat, order: ChannelOrder) -> Self {
        let mut img = Self {
            width,
            height,
            format,
            order,
            data: vec![0; width as usize * height as usize * format.channels()],
        };
        img.fill(Color::default());
        img
    }

    pub fn from_raw(
        width: u32,
        height: u32,
        format: PixelFormat,
        order: ChannelOrder,
        data: Vec<u8>,
    ) -> ArkResult<Self> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(ArkError::validation(format!(
                "image data is {} bytes, expected {expected} for {width}x{height} {format:?}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            order,
            data,
        })
    }

    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    pub fn stride(&self) -> usize {
        self.width as usize * self.channels()
    }

    pub fn same_dimensions(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.stride() + x as usize * self.channels()
    }

    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let at = self.offset(x, y);
        &self.data[at..at + self.channels()]
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let at = self.offset(x, y);
        let n = self.channels();
        &mut self.data[at..at + n]
    }

    /// Reads a pixel as straight `[r, g, b, a]`.
    pub fn rgba_at(&self, x: u32, y: u32) -> [u8; 4] {
        read_rgba(self.pixel(x, y), self.order)
    }

    pub fn set_rgba_at(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let order = self.order;
        write_rgba(self.pixel_mut(x, y), order, rgba);
    }

    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        read_alpha(self.pixel(x, y), self.order)
    }

    pub fn set_alpha_at(&mut self, x: u32, y: u32, a: u8) {
        let order = self.order;
        write_alpha(self.pixel_mut(x, y), order, a);
    }

    pub fn fill(&mut self, color: Color) {
        let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let rgba = [to_u8(color.r), to_u8(color.g), to_u8(color.b), to_u8(color.a)];
        let order = self.order;
        let n = self.channels();
        for px in self.data.chunks_exact_mut(n) {
            write_rgba(px, order, rgba);
        }
    }

    /// Whether `order` can address this buffer's channel count and `data` covers every pixel.
    pub fn layout_is_valid(&self) -> bool {
        let order_fits = match self.order {
            ChannelOrder::Argb => self.format == PixelFormat::Rgba8,
            ChannelOrder::Aaa => self.format == PixelFormat::Rgb8,
            ChannelOrder::Rgba | ChannelOrder::Bgra => true,
        };
        order_fits && self.data.len() == self.stride() * self.height as usize
    }
}

fn read_rgba(px: &[u8], order: ChannelOrder) -> [u8; 4] {
    let a = |i: usize| px.get(i).copied().unwrap_or(0xff);
    match order {
        ChannelOrder::Rgba => [px[0], px[1], px[2], a(3)],
        ChannelOrder::Bgra => [px[2], px[1], px[0], a(3)],
        ChannelOrder::Argb => [px[1], px[2], px[3], px[0]],
        ChannelOrder::Aaa => [px[0], px[1], px[2], px[0]],
    }
}

fn write_rgba(px: &mut [u8], order: ChannelOrder, [r, g, b, a]: [u8; 4]) {
    match order {
        ChannelOrder::Rgba => {
            px[..3].copy_from_slice(&[r, g, b]);
            if let Some(slot) = px.get_mut(3) {
                *slot = a;
            }
        }
        ChannelOrder::Bgra => {
            px[..3].copy_from_slice(&[b, g, r]);
            if let Some(slot) = px.get_mut(3) {
                *slot = a;
            }
        }
        ChannelOrder::Argb => px[..4].copy_from_slice(&[a, r, g, b]),
        ChannelOrder::Aaa => px[..3].copy_from_slice(&[r, g, b]),
    }
}

fn read_alpha(px: &[u8], order: ChannelOrder) -> u8 {
    match order {
        ChannelOrder::Rgba | ChannelOrder::Bgra => px.get(3).copied().unwrap_or(0xff),
        ChannelOrder::Argb | ChannelOrder::Aaa => px[0],
    }
}

fn write_alpha(px: &mut [u8], order: ChannelOrder, a: u8) {
    match order {
        ChannelOrder::Rgba | ChannelOrder::Bgra => {
            if let Some(slot) = px.get_mut(3) {
                *slot = a;
            }
        }
        ChannelOrder::Argb => px[0] = a,
        ChannelOrder::Aaa => px[..3].fill(a),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/imaging/buffer.rs"]
mod tests;
