use std::path::{Path, PathBuf};

use crate::animation::Animation;
use crate::decode::Picture;
use crate::error::{ViewerError, ViewerResult};
use crate::navigator::{Resolved, caption_for, file_label};
use crate::raster::{Bounds, Placement};
use crate::surface::Surface;

/// One displayed item: its texture, where it sits on screen, and its
/// animation playback position when it is animated.
pub struct Slide<T> {
    path: PathBuf,
    texture: T,
    placement: Placement,

    animation: Option<Animation>,
    frame: usize,
    frame_timer: f32,

    filename: String,
    caption: String,
}

impl<T> Slide<T> {
    /// Upload a resolved picture. A still raster is consumed here; an
    /// animation is kept so later frames can be composited on demand.
    pub fn load<S>(resolved: Resolved, screen: Bounds, surface: &mut S) -> ViewerResult<Self>
    where
        S: Surface<Texture = T>,
    {
        let Resolved { path, picture } = resolved;
        let size = picture.dimensions();
        let (texture, animation) = match picture {
            Picture::Still(raster) => (surface.upload(&raster)?, None),
            Picture::Animated(animation) => {
                let first = animation.first_frame()?;
                (surface.upload(&first)?, Some(animation))
            }
        };

        Ok(Self {
            filename: file_label(&path),
            caption: caption_for(&path),
            path,
            texture,
            placement: Placement::letterbox(size.0, size.1, screen),
            animation,
            frame: 0,
            frame_timer: 0.0,
        })
    }

    /// Advance the animation clock by `dt` seconds, stepping at most one
    /// frame per call. Returns whether the texture changed.
    pub fn update<S>(&mut self, dt: f32, surface: &mut S) -> ViewerResult<bool>
    where
        S: Surface<Texture = T>,
    {
        let Some(animation) = self.animation.as_mut() else {
            return Ok(false);
        };
        let count = animation.frame_count();
        if count <= 1 {
            return Ok(false);
        }

        self.frame_timer += dt;
        let delay = animation.delay_seconds(self.frame);
        if self.frame_timer < delay {
            return Ok(false);
        }
        self.frame_timer -= delay;
        self.frame = (self.frame + 1) % count;
        // Never bank more than one pending frame after a slow tick.
        self.frame_timer = self.frame_timer.min(animation.delay_seconds(self.frame));

        let pixels = animation
            .frame_at(self.frame)
            .ok_or_else(|| ViewerError::render(format!("missing animation frame {}", self.frame)))?;
        surface.update(&mut self.texture, pixels)?;
        Ok(true)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn texture(&self) -> &T {
        &self.texture
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn is_animated(&self) -> bool {
        self.animation.is_some()
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }
}
