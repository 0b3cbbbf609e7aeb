use std::cell::Cell;
use std::fs;
use std::io::{self, Cursor};
use std::path::Path;
use std::time::Instant;

use exif::{In, Reader, Tag, Value};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Limits};
use log::{debug, info, warn};

use crate::animation::Animation;
use crate::cache::ResizeCache;
use crate::error::{ViewerError, ViewerResult};
use crate::raster::{Bounds, DecodedRaster};

/// Process-wide imaging state.
///
/// Built once by the entry point and passed by reference to every decode.
/// Also counts the expensive operations so callers can observe cache hits.
pub struct ImagingContext {
    filter: FilterType,
    limits: Limits,
    decodes: Cell<u64>,
    resizes: Cell<u64>,
    cache_hits: Cell<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeStats {
    pub decodes: u64,
    pub resizes: u64,
    pub cache_hits: u64,
}

impl ImagingContext {
    pub fn new() -> Self {
        Self::with_filter(FilterType::Lanczos3)
    }

    pub fn with_filter(filter: FilterType) -> Self {
        debug!("Imaging backend started (resize filter {:?})", filter);
        Self {
            filter,
            limits: Limits::default(),
            decodes: Cell::new(0),
            resizes: Cell::new(0),
            cache_hits: Cell::new(0),
        }
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }

    pub fn stats(&self) -> DecodeStats {
        DecodeStats {
            decodes: self.decodes.get(),
            resizes: self.resizes.get(),
            cache_hits: self.cache_hits.get(),
        }
    }

    pub(crate) fn count_decode(&self) {
        self.decodes.set(self.decodes.get() + 1);
    }

    pub(crate) fn count_resize(&self) {
        self.resizes.set(self.resizes.get() + 1);
    }

    pub(crate) fn count_cache_hit(&self) {
        self.cache_hits.set(self.cache_hits.get() + 1);
    }
}

impl Default for ImagingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ImagingContext {
    fn drop(&mut self) {
        let stats = self.stats();
        info!(
            "Imaging backend shut down: {} decodes, {} resizes, {} cache hits",
            stats.decodes, stats.resizes, stats.cache_hits
        );
    }
}

/// Every file format the viewer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Jpeg,
    Png,
    Bmp,
    Qoi,
    Gif,
    Webp,
    Tiff,
    Tga,
    Pnm,
    Hdr,
    Exr,
    Ico,
}

/// Which decoder handles a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Format known up front, decoded directly.
    Native,
    /// Format sniffed from the bytes, then normalised to 8-bit RGB(A).
    General,
    /// Multi-frame source handled by the animation compositor.
    Animated,
}

impl SourceFormat {
    pub const EXTENSIONS: &'static [&'static str] = &[
        "jpg", "jpeg", "png", "bmp", "qoi", "gif", "webp", "tif", "tiff", "tga", "pnm", "ppm",
        "pgm", "pbm", "hdr", "exr", "ico",
    ];

    pub fn from_extension(extension: &str) -> Option<Self> {
        let format = match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => SourceFormat::Jpeg,
            "png" => SourceFormat::Png,
            "bmp" => SourceFormat::Bmp,
            "qoi" => SourceFormat::Qoi,
            "gif" => SourceFormat::Gif,
            "webp" => SourceFormat::Webp,
            "tif" | "tiff" => SourceFormat::Tiff,
            "tga" => SourceFormat::Tga,
            "pnm" | "ppm" | "pgm" | "pbm" => SourceFormat::Pnm,
            "hdr" => SourceFormat::Hdr,
            "exr" => SourceFormat::Exr,
            "ico" => SourceFormat::Ico,
            _ => return None,
        };
        Some(format)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn backend(self) -> Backend {
        match self {
            SourceFormat::Jpeg | SourceFormat::Png | SourceFormat::Bmp | SourceFormat::Qoi => {
                Backend::Native
            }
            SourceFormat::Gif => Backend::Animated,
            SourceFormat::Webp
            | SourceFormat::Tiff
            | SourceFormat::Tga
            | SourceFormat::Pnm
            | SourceFormat::Hdr
            | SourceFormat::Exr
            | SourceFormat::Ico => Backend::General,
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            SourceFormat::Jpeg => ImageFormat::Jpeg,
            SourceFormat::Png => ImageFormat::Png,
            SourceFormat::Bmp => ImageFormat::Bmp,
            SourceFormat::Qoi => ImageFormat::Qoi,
            SourceFormat::Gif => ImageFormat::Gif,
            SourceFormat::Webp => ImageFormat::WebP,
            SourceFormat::Tiff => ImageFormat::Tiff,
            SourceFormat::Tga => ImageFormat::Tga,
            SourceFormat::Pnm => ImageFormat::Pnm,
            SourceFormat::Hdr => ImageFormat::Hdr,
            SourceFormat::Exr => ImageFormat::OpenExr,
            SourceFormat::Ico => ImageFormat::Ico,
        }
    }

    fn carries_exif(self) -> bool {
        matches!(
            self,
            SourceFormat::Jpeg | SourceFormat::Tiff | SourceFormat::Png | SourceFormat::Webp
        )
    }
}

/// What a path resolves to.
pub enum Picture {
    Still(DecodedRaster),
    Animated(Animation),
}

impl Picture {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Picture::Still(raster) => (raster.width(), raster.height()),
            Picture::Animated(animation) => animation.canvas_size(),
        }
    }
}

/// Turns a path into a [`Picture`] no larger than the display box.
pub struct Decoder {
    bounds: Bounds,
    cache: Option<ResizeCache>,
}

impl Decoder {
    pub fn new(bounds: Bounds, cache: Option<ResizeCache>) -> Self {
        Self { bounds, cache }
    }

    pub fn cache(&self) -> Option<&ResizeCache> {
        self.cache.as_ref()
    }

    pub fn load(&self, ctx: &ImagingContext, path: &Path) -> ViewerResult<Picture> {
        let format = SourceFormat::from_path(path)
            .ok_or_else(|| ViewerError::decode(path, "unsupported file extension"))?;
        let start = Instant::now();
        let picture = match format.backend() {
            Backend::Animated => Picture::Animated(Animation::decode(ctx, path)?),
            Backend::Native | Backend::General => {
                Picture::Still(self.load_still(ctx, path, format)?)
            }
        };
        debug!("Time to decode {:?}: {:?}", path, start.elapsed());
        Ok(picture)
    }

    fn load_still(
        &self,
        ctx: &ImagingContext,
        path: &Path,
        format: SourceFormat,
    ) -> ViewerResult<DecodedRaster> {
        // A cache entry outlives its source; a vanished source is still missing.
        if let Err(e) = fs::metadata(path) {
            if e.kind() == io::ErrorKind::NotFound {
                return Err(ViewerError::missing(path));
            }
        }
        if let Some(raster) = self.cache.as_ref().and_then(|cache| cache.load(path, format)) {
            ctx.count_cache_hit();
            return Ok(raster);
        }

        let bytes = read_source(path)?;
        ctx.count_decode();
        let image = match format.backend() {
            Backend::Native => decode_native(&bytes, format),
            Backend::General | Backend::Animated => decode_general(ctx, &bytes),
        }
        .map_err(|e| ViewerError::decode(path, e))?;
        let image = if format.carries_exif() {
            apply_orientation(image, exif_orientation(&bytes, path))
        } else {
            image
        };

        let Some((width, height)) = self.bounds.fit(image.width(), image.height()) else {
            return Ok(DecodedRaster::from_image(image, format));
        };
        debug!(
            "Downsizing {:?} from {}x{} to {}x{}",
            path,
            image.width(),
            image.height(),
            width,
            height
        );
        ctx.count_resize();
        let resized = image.resize_exact(width, height, ctx.filter());

        match &self.cache {
            Some(cache) => match cache.store(path, format, &resized) {
                Ok(raster) => Ok(raster),
                Err(e) => {
                    warn!("{}. Continuing without cache for this image", e);
                    Ok(DecodedRaster::from_image(resized, format))
                }
            },
            None => Ok(DecodedRaster::from_image(resized, format)),
        }
    }
}

pub(crate) fn read_source(path: &Path) -> ViewerResult<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ViewerError::missing(path),
        _ => ViewerError::decode(path, e),
    })
}

fn decode_native(bytes: &[u8], format: SourceFormat) -> image::ImageResult<DynamicImage> {
    image::load_from_memory_with_format(bytes, format.image_format())
}

fn decode_general(ctx: &ImagingContext, bytes: &[u8]) -> image::ImageResult<DynamicImage> {
    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    reader.limits(ctx.limits.clone());
    reader.decode()
}

/// Read the EXIF orientation tag, 1 (upright) when absent or unreadable.
fn exif_orientation(bytes: &[u8], path: &Path) -> u16 {
    match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => match exif.get_field(Tag::Orientation, In::PRIMARY) {
            Some(field) => match &field.value {
                Value::Short(values) if !values.is_empty() => values[0],
                _ => 1,
            },
            None => 1,
        },
        Err(exif::Error::NotFound(_)) => 1,
        Err(e) => {
            debug!("Could not read EXIF data for {:?}: {}", path, e);
            1
        }
    }
}

// 1 = upright, 2 = mirrored, 3 = 180, 4 = flipped vertically,
// 5 = transposed, 6 = 90 cw, 7 = transversed, 8 = 90 ccw
fn apply_orientation(image: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}
