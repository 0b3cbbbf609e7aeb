//! On-disk store of downscaled rasters.
//!
//! Entries mirror the source tree under `<root>/<W>x<H>/` and are always
//! JPEG, named `<source file name>.jpg`. Presence of a non-empty file is
//! the only state; there is no index and no staleness check against the
//! source's modification time.

use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use log::{debug, warn};

use crate::constants::CACHE_JPEG_QUALITY;
use crate::decode::SourceFormat;
use crate::error::{ViewerError, ViewerResult};
use crate::raster::{Bounds, DecodedRaster};

#[derive(Debug, Clone)]
pub struct ResizeCache {
    root: PathBuf,
    bounds: Bounds,
}

impl ResizeCache {
    pub fn new(root: impl Into<PathBuf>, bounds: Bounds) -> Self {
        Self {
            root: root.into(),
            bounds,
        }
    }

    /// Where the entry for `source` lives. Entries are keyed by display box
    /// so a resolution change never serves a raster sized for another screen.
    pub fn entry_path(&self, source: &Path) -> PathBuf {
        let mut path = self
            .root
            .join(format!("{}x{}", self.bounds.width, self.bounds.height));
        if let Some(parent) = source.parent() {
            for component in parent.components() {
                if let Component::Normal(part) = component {
                    path.push(part);
                }
            }
        }
        let mut name = source
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".jpg");
        path.push(name);
        path
    }

    /// Load the cached raster for `source`, if a usable entry exists.
    pub fn load(&self, source: &Path, format: SourceFormat) -> Option<DecodedRaster> {
        let entry = self.entry_path(source);
        let metadata = fs::metadata(&entry).ok()?;
        if !metadata.is_file() || metadata.len() == 0 {
            return None;
        }
        let decoded = fs::read(&entry)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)
                    .map_err(|e| e.to_string())
            });
        match decoded {
            Ok(image) => {
                debug!("Loaded {:?} from cache {:?}", source, entry);
                Some(DecodedRaster::from_image(image, format))
            }
            Err(e) => {
                warn!("Ignoring unreadable cache entry {:?}: {}", entry, e);
                None
            }
        }
    }

    /// Persist a resized image and return the raster as it will be read back,
    /// so a later [`ResizeCache::load`] yields identical pixels.
    pub fn store(
        &self,
        source: &Path,
        format: SourceFormat,
        image: &DynamicImage,
    ) -> ViewerResult<DecodedRaster> {
        let entry = self.entry_path(source);
        let bytes = encode_jpeg(image).map_err(|e| ViewerError::cache_write(&entry, e))?;
        write_entry(&entry, &bytes)?;
        let stored = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)
            .map_err(|e| ViewerError::cache_write(&entry, e))?;
        debug!("Cached {:?} as {:?}", source, entry);
        Ok(DecodedRaster::from_image(stored, format))
    }
}

fn encode_jpeg(image: &DynamicImage) -> image::ImageResult<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, CACHE_JPEG_QUALITY).encode_image(&rgb)?;
    Ok(bytes)
}

fn write_entry(entry: &Path, bytes: &[u8]) -> ViewerResult<()> {
    if let Some(parent) = entry.parent() {
        fs::create_dir_all(parent).map_err(|e| ViewerError::cache_write(entry, e))?;
    }
    let mut partial = OsString::from(entry.as_os_str());
    partial.push(".part");
    let partial = PathBuf::from(partial);
    fs::write(&partial, bytes).map_err(|e| ViewerError::cache_write(entry, e))?;
    fs::rename(&partial, entry).map_err(|e| {
        let _ = fs::remove_file(&partial);
        ViewerError::cache_write(entry, e)
    })
}
