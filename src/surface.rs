use crate::error::ViewerResult;
use crate::raster::DecodedRaster;

/// Whatever turns rasters into drawable textures.
///
/// A texture is released by dropping it; the playback engine owns every
/// texture it uploads and drops each exactly once, when it is superseded.
pub trait Surface {
    type Texture;

    fn upload(&mut self, raster: &DecodedRaster) -> ViewerResult<Self::Texture>;
    /// Replace the pixels of an RGBA texture of unchanged size.
    fn update(&mut self, texture: &mut Self::Texture, rgba: &[u8]) -> ViewerResult<()>;
}
