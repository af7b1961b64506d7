//! Raster pages handed from the rasterizer to the OCR engine.

use image::{DynamicImage, RgbImage};

/// Byte order of the three color channels in a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Red, green, blue.
    Rgb,
    /// Blue, green, red (the layout PaddleOCR-style engines consume).
    Bgr,
}

/// A height × width × 3 raster in an explicit channel order.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    order: ChannelOrder,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Channels per pixel.
    pub const CHANNELS: usize = 3;

    /// Wrap raw interleaved bytes. Returns `None` if the length does not
    /// match the dimensions.
    pub fn from_raw(width: u32, height: u32, order: ChannelOrder, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * Self::CHANNELS {
            return None;
        }
        Some(Self {
            width,
            height,
            order,
            data,
        })
    }

    /// Convert an RGB image into the BGR layout.
    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            order: ChannelOrder::Rgb,
            data: image.into_raw(),
        }
        .into_order(ChannelOrder::Bgr)
    }

    /// Build a BGR buffer from a BGRA bitmap whose rows are `stride` bytes.
    ///
    /// A zero-height bitmap yields an empty buffer; a zero stride with rows
    /// to read is rejected.
    pub fn from_bgra(width: u32, height: u32, stride: usize, raw: &[u8]) -> Option<Self> {
        if height == 0 {
            return Some(Self {
                width,
                height: 0,
                order: ChannelOrder::Bgr,
                data: Vec::new(),
            });
        }

        let row_bytes = width as usize * 4;
        if stride == 0 || stride < row_bytes || raw.len() < stride * height as usize {
            return None;
        }

        let mut data = Vec::with_capacity(width as usize * height as usize * Self::CHANNELS);
        for row in raw.chunks(stride).take(height as usize) {
            for px in row[..row_bytes].chunks_exact(4) {
                data.extend_from_slice(&px[..3]);
            }
        }

        Some(Self {
            width,
            height,
            order: ChannelOrder::Bgr,
            data,
        })
    }

    /// Reorder channels in place if `order` differs from the current one.
    pub fn into_order(mut self, order: ChannelOrder) -> Self {
        if self.order != order {
            for px in self.data.chunks_exact_mut(Self::CHANNELS) {
                px.swap(0, 2);
            }
            self.order = order;
        }
        self
    }

    /// Copy into an RGB image regardless of the stored order.
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        let rgb = self.clone().into_order(ChannelOrder::Rgb);
        RgbImage::from_raw(rgb.width, rgb.height, rgb.data)
    }

    /// Copy into a [`DynamicImage`] for engines built on the `image` crate.
    pub fn to_dynamic_image(&self) -> Option<DynamicImage> {
        self.to_rgb_image().map(DynamicImage::ImageRgb8)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.order
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
