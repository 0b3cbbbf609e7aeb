use crate::decode::SourceFormat;
use crate::error::{ViewerError, ViewerResult};

/// Target display box, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, width: u32, height: u32) -> bool {
        width <= self.width && height <= self.height
    }

    /// Size of a `width` x `height` source once fitted into this box.
    ///
    /// Returns `None` when the source already fits (it is never upscaled).
    /// Otherwise both sides are scaled by the same factor, rounded, and
    /// clamped to `1..=box side`.
    pub fn fit(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width == 0 || height == 0 {
            return None;
        }
        let scale = f64::min(
            self.width as f64 / width as f64,
            self.height as f64 / height as f64,
        );
        if scale >= 1.0 {
            return None;
        }
        let fitted_width = (scale * width as f64).round() as u32;
        let fitted_height = (scale * height as f64).round() as u32;
        Some((
            fitted_width.clamp(1, self.width.max(1)),
            fitted_height.clamp(1, self.height.max(1)),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb8,
    Rgba8,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Rgb8 => 3,
            PixelLayout::Rgba8 => 4,
        }
    }
}

/// A decoded picture in one of the two canonical 8-bit layouts.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedRaster {
    width: u32,
    height: u32,
    layout: PixelLayout,
    pixels: Vec<u8>,
    format: SourceFormat,
}

impl DecodedRaster {
    pub fn new(
        width: u32,
        height: u32,
        layout: PixelLayout,
        pixels: Vec<u8>,
        format: SourceFormat,
    ) -> ViewerResult<Self> {
        let expected = width as usize * height as usize * layout.channels();
        if pixels.len() != expected {
            return Err(ViewerError::render(format!(
                "pixel buffer holds {} bytes, {}x{} {:?} needs {}",
                pixels.len(),
                width,
                height,
                layout,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            pixels,
            format,
        })
    }

    pub fn from_image(image: image::DynamicImage, format: SourceFormat) -> Self {
        let (width, height) = (image.width(), image.height());
        if image.color().has_alpha() {
            Self {
                width,
                height,
                layout: PixelLayout::Rgba8,
                pixels: image.into_rgba8().into_raw(),
                format,
            }
        } else {
            Self {
                width,
                height,
                layout: PixelLayout::Rgb8,
                pixels: image.into_rgb8().into_raw(),
                format,
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }
}

impl std::fmt::Debug for DecodedRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedRaster")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layout", &self.layout)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Where and how large a texture is drawn on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl Placement {
    /// Letterbox a `width` x `height` texture centred inside `screen`,
    /// scaling it up or down while preserving its aspect ratio.
    pub fn letterbox(width: u32, height: u32, screen: Bounds) -> Self {
        if width == 0 || height == 0 {
            return Self {
                x: screen.width as f32 * 0.5,
                y: screen.height as f32 * 0.5,
                scale: 1.0,
            };
        }
        let scale = f32::min(
            screen.width as f32 / width as f32,
            screen.height as f32 / height as f32,
        );
        Self {
            x: screen.width as f32 * 0.5 - width as f32 * 0.5 * scale,
            y: screen.height as f32 * 0.5 - height as f32 * 0.5 * scale,
            scale,
        }
    }
}
