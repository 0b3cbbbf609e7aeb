//! Image presentation pipeline for a kiosk slideshow.
//!
//! Paths go into a [`Navigator`], which decodes them on demand through a
//! [`Decoder`] (optionally backed by a [`ResizeCache`]). Animated sources are
//! rebuilt frame by frame by the [`Animation`] compositor. A [`Playback`]
//! decides each tick what to hand the renderer, through whatever
//! [`Surface`] the caller provides.

pub mod animation;
pub mod cache;
pub mod config;
pub mod constants;
pub mod decode;
pub mod error;
pub mod files;
pub mod navigator;
pub mod playback;
pub mod raster;
pub mod screen;
pub mod surface;

pub use animation::Animation;
pub use cache::ResizeCache;
pub use config::{Args, OverlayMode, PlaybackConfig, Settings, SortMode};
pub use decode::{Decoder, ImagingContext, Picture, SourceFormat};
pub use error::{ViewerError, ViewerResult};
pub use navigator::Navigator;
pub use playback::{Playback, PlaybackPhase, Step};
pub use raster::{Bounds, DecodedRaster, Placement};
pub use surface::Surface;
