use log::debug;

use crate::config::{OverlayMode, PlaybackConfig};
use crate::decode::ImagingContext;
use crate::error::ViewerResult;
use crate::navigator::Navigator;
use crate::raster::{Bounds, Placement};
use crate::surface::Surface;

use super::slide::Slide;
use super::state::PlaybackPhase;

/// A user-initiated move through the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Advance,
    Retreat,
}

/// One texture to draw this tick.
pub struct Layer<'a, T> {
    pub texture: &'a T,
    pub placement: Placement,
    pub alpha: u8,
}

/// Everything the renderer draws for one tick, back to front.
pub struct Scene<'a, T> {
    pub layers: Vec<Layer<'a, T>>,
    pub overlay: Option<&'a str>,
}

/// Opacity of the incoming item `elapsed` seconds into a crossfade.
pub fn crossfade_opacity(elapsed: f32, duration: f32) -> u8 {
    if duration <= 0.0 || elapsed >= duration {
        return u8::MAX;
    }
    (255.0 * (elapsed / duration)).clamp(0.0, 255.0) as u8
}

pub struct Playback<T> {
    navigator: Navigator,
    config: PlaybackConfig,
    screen: Bounds,

    current: Slide<T>,
    next: Option<Slide<T>>, // Only filled when crossfading

    hold_timer: f32,
    transition: Option<f32>, // Seconds into the crossfade
}

impl<T> Playback<T> {
    pub fn new<S>(
        mut navigator: Navigator,
        config: PlaybackConfig,
        screen: Bounds,
        ctx: &ImagingContext,
        surface: &mut S,
    ) -> ViewerResult<Self>
    where
        S: Surface<Texture = T>,
    {
        config.validate()?;
        let current = Slide::load(navigator.current(ctx)?, screen, surface)?;
        let mut playback = Self {
            navigator,
            config,
            screen,
            current,
            next: None,
            hold_timer: 0.0,
            transition: None,
        };
        playback.prefetch(ctx, surface)?;
        Ok(playback)
    }

    /// Advance playback by one tick of `dt` seconds.
    ///
    /// A manual step is applied first and ends the tick; it discards any
    /// running hold or crossfade.
    pub fn tick<S>(
        &mut self,
        ctx: &ImagingContext,
        surface: &mut S,
        dt: f32,
        step: Option<Step>,
    ) -> ViewerResult<()>
    where
        S: Surface<Texture = T>,
    {
        if let Some(step) = step {
            return self.step(ctx, surface, step);
        }

        if let Some(elapsed) = self.transition.as_mut() {
            *elapsed += dt;
            if *elapsed >= self.config.transition_duration {
                return self.commit(ctx, surface);
            }
        } else if self.config.is_timed() {
            self.hold_timer += dt;
            if self.hold_timer >= self.config.hold_duration {
                if self.config.crossfades() {
                    debug!("Crossfading from {:?}", self.current.path());
                    self.transition = Some(0.0);
                } else {
                    return self.step(ctx, surface, Step::Advance);
                }
            }
        }

        self.current.update(dt, surface)?;
        Ok(())
    }

    /// Move the cursor and load whatever is now current.
    pub fn step<S>(&mut self, ctx: &ImagingContext, surface: &mut S, step: Step) -> ViewerResult<()>
    where
        S: Surface<Texture = T>,
    {
        match step {
            Step::Advance => self.navigator.advance(),
            Step::Retreat => self.navigator.retreat(),
        }
        self.next = None;
        self.current = Slide::load(self.navigator.current(ctx)?, self.screen, surface)?;
        self.reset_timers();
        self.prefetch(ctx, surface)
    }

    fn commit<S>(&mut self, ctx: &ImagingContext, surface: &mut S) -> ViewerResult<()>
    where
        S: Surface<Texture = T>,
    {
        self.navigator.advance();
        self.current = match self.next.take() {
            Some(next) => next,
            None => Slide::load(self.navigator.current(ctx)?, self.screen, surface)?,
        };
        self.reset_timers();
        self.prefetch(ctx, surface)
    }

    fn prefetch<S>(&mut self, ctx: &ImagingContext, surface: &mut S) -> ViewerResult<()>
    where
        S: Surface<Texture = T>,
    {
        if !self.config.crossfades() {
            return Ok(());
        }
        self.next = None;
        let resolved = self.navigator.peek_next(ctx)?;
        self.next = Some(Slide::load(resolved, self.screen, surface)?);
        Ok(())
    }

    fn reset_timers(&mut self) {
        self.hold_timer = 0.0;
        self.transition = None;
    }

    pub fn phase(&self) -> PlaybackPhase {
        if self.transition.is_some() {
            PlaybackPhase::Transitioning
        } else if self.config.is_timed() {
            PlaybackPhase::TimedHold
        } else if self.current.is_animated() {
            PlaybackPhase::AnimationPlaying
        } else {
            PlaybackPhase::Static
        }
    }

    /// Opacity of the incoming item while crossfading.
    pub fn opacity(&self) -> Option<u8> {
        self.transition
            .map(|elapsed| crossfade_opacity(elapsed, self.config.transition_duration))
    }

    pub fn scene(&self) -> Scene<'_, T> {
        let mut layers = Vec::with_capacity(2);
        match (self.opacity(), self.next.as_ref()) {
            (Some(opacity), Some(next)) => {
                layers.push(Layer {
                    texture: self.current.texture(),
                    placement: self.current.placement(),
                    alpha: u8::MAX - opacity,
                });
                layers.push(Layer {
                    texture: next.texture(),
                    placement: next.placement(),
                    alpha: opacity,
                });
            }
            _ => layers.push(Layer {
                texture: self.current.texture(),
                placement: self.current.placement(),
                alpha: u8::MAX,
            }),
        }

        let overlay = match self.config.overlay {
            OverlayMode::None => None,
            OverlayMode::Filename => Some(self.current.filename()),
            OverlayMode::Caption => Some(self.current.caption()).filter(|text| !text.is_empty()),
        };

        Scene { layers, overlay }
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn current(&self) -> &Slide<T> {
        &self.current
    }

    pub fn next(&self) -> Option<&Slide<T>> {
        self.next.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Decoder;
    use crate::error::ViewerError;
    use crate::raster::DecodedRaster;
    use image::{Rgb, RgbImage};
    use std::borrow::Cow;
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;
    use std::rc::Rc;
    use tempfile::{TempDir, tempdir};

    struct MockTexture {
        id: usize,
        released: Rc<RefCell<Vec<usize>>>,
    }

    impl Drop for MockTexture {
        fn drop(&mut self) {
            self.released.borrow_mut().push(self.id);
        }
    }

    #[derive(Default)]
    struct MockSurface {
        uploads: usize,
        updates: usize,
        released: Rc<RefCell<Vec<usize>>>,
    }

    impl MockSurface {
        fn live(&self) -> usize {
            self.uploads - self.released.borrow().len()
        }
    }

    impl Surface for MockSurface {
        type Texture = MockTexture;

        fn upload(&mut self, _raster: &DecodedRaster) -> ViewerResult<MockTexture> {
            self.uploads += 1;
            Ok(MockTexture {
                id: self.uploads,
                released: Rc::clone(&self.released),
            })
        }

        fn update(&mut self, _texture: &mut MockTexture, _rgba: &[u8]) -> ViewerResult<()> {
            self.updates += 1;
            Ok(())
        }
    }

    fn corpus(names: &[&str]) -> (TempDir, Vec<PathBuf>) {
        let dir = tempdir().unwrap();
        let paths = names
            .iter()
            .map(|name| {
                let path = dir.path().join(name);
                RgbImage::from_pixel(4, 2, Rgb([10, 20, 30])).save(&path).unwrap();
                path
            })
            .collect();
        (dir, paths)
    }

    fn write_gif(path: &std::path::Path) {
        let palette = [255, 0, 0, 0, 0, 255];
        let mut bytes = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut bytes, 2, 2, &palette).unwrap();
            for index in [0u8, 1, 0] {
                let frame = gif::Frame {
                    width: 2,
                    height: 2,
                    delay: 10,
                    buffer: Cow::Owned(vec![index; 4]),
                    ..gif::Frame::default()
                };
                encoder.write_frame(&frame).unwrap();
            }
        }
        fs::write(path, bytes).unwrap();
    }

    fn playback(
        paths: Vec<PathBuf>,
        config: PlaybackConfig,
        ctx: &ImagingContext,
        surface: &mut MockSurface,
    ) -> Playback<MockTexture> {
        let screen = Bounds::new(64, 64);
        let navigator = Navigator::new(paths, Decoder::new(screen, None)).unwrap();
        Playback::new(navigator, config, screen, ctx, surface).unwrap()
    }

    fn timed(hold: f32, transition: f32) -> PlaybackConfig {
        PlaybackConfig {
            hold_duration: hold,
            transition_duration: transition,
            overlay: OverlayMode::None,
        }
    }

    fn current_name(playback: &Playback<MockTexture>) -> String {
        playback.current().filename().to_string()
    }

    #[test]
    fn opacity_ramps_from_zero_to_full() {
        assert_eq!(crossfade_opacity(0.0, 2.0), 0);
        assert_eq!(crossfade_opacity(1.0, 2.0), 127);
        assert_eq!(crossfade_opacity(2.0, 2.0), 255);
        assert_eq!(crossfade_opacity(5.0, 2.0), 255);
        assert_eq!(crossfade_opacity(0.3, 0.0), 255);

        let mut last = 0;
        for i in 0..=100 {
            let opacity = crossfade_opacity(i as f32 * 0.01, 1.0);
            assert!(opacity >= last);
            last = opacity;
        }
        assert_eq!(last, 255);
    }

    #[test]
    fn still_without_timer_is_static() {
        let (_dir, paths) = corpus(&["a.png", "b.png"]);
        let ctx = ImagingContext::new();
        let mut surface = MockSurface::default();
        let mut playback = playback(paths, PlaybackConfig::default(), &ctx, &mut surface);

        assert_eq!(playback.phase(), PlaybackPhase::Static);
        for _ in 0..100 {
            playback.tick(&ctx, &mut surface, 1.0, None).unwrap();
        }
        assert_eq!(current_name(&playback), "a.png");
        assert_eq!(surface.uploads, 1);
        assert!(playback.next().is_none());
    }

    #[test]
    fn hold_without_transition_cuts_to_next() {
        let (_dir, paths) = corpus(&["a.png", "b.png", "c.png"]);
        let ctx = ImagingContext::new();
        let mut surface = MockSurface::default();
        let mut playback = playback(paths, timed(2.0, 0.0), &ctx, &mut surface);

        assert_eq!(playback.phase(), PlaybackPhase::TimedHold);
        playback.tick(&ctx, &mut surface, 1.5, None).unwrap();
        assert_eq!(current_name(&playback), "a.png");
        playback.tick(&ctx, &mut surface, 0.5, None).unwrap();
        assert_eq!(current_name(&playback), "b.png");
        assert_eq!(playback.opacity(), None);
        assert_eq!(surface.live(), 1);
    }

    #[test]
    fn crossfade_runs_then_promotes_prefetched_item() {
        let (_dir, paths) = corpus(&["a.png", "b.png", "c.png"]);
        let ctx = ImagingContext::new();
        let mut surface = MockSurface::default();
        let mut playback = playback(paths, timed(1.0, 1.0), &ctx, &mut surface);

        assert_eq!(playback.next().map(|s| s.filename()), Some("b.png"));
        assert_eq!(surface.uploads, 2);

        playback.tick(&ctx, &mut surface, 1.0, None).unwrap();
        assert_eq!(playback.phase(), PlaybackPhase::Transitioning);
        assert_eq!(playback.opacity(), Some(0));

        let mut last = 0;
        for _ in 0..9 {
            playback.tick(&ctx, &mut surface, 0.1, None).unwrap();
            let opacity = playback.opacity().unwrap();
            assert!(opacity >= last);
            last = opacity;

            let scene = playback.scene();
            assert_eq!(scene.layers.len(), 2);
            assert_eq!(scene.layers[0].alpha, 255 - opacity);
            assert_eq!(scene.layers[1].alpha, opacity);
        }

        playback.tick(&ctx, &mut surface, 0.2, None).unwrap();
        assert_eq!(playback.phase(), PlaybackPhase::TimedHold);
        assert_eq!(current_name(&playback), "b.png");
        assert_eq!(playback.next().map(|s| s.filename()), Some("c.png"));
        // Promotion reuses the prefetched texture; only c was uploaded.
        assert_eq!(surface.uploads, 3);
        assert_eq!(*surface.released.borrow(), vec![1]);
        assert_eq!(playback.scene().layers.len(), 1);
    }

    #[test]
    fn manual_step_overrides_running_crossfade() {
        let (_dir, paths) = corpus(&["a.png", "b.png", "c.png"]);
        let ctx = ImagingContext::new();
        let mut surface = MockSurface::default();
        let mut playback = playback(paths, timed(1.0, 2.0), &ctx, &mut surface);

        playback.tick(&ctx, &mut surface, 1.0, None).unwrap();
        playback.tick(&ctx, &mut surface, 0.5, None).unwrap();
        assert_eq!(playback.phase(), PlaybackPhase::Transitioning);

        playback
            .tick(&ctx, &mut surface, 0.0, Some(Step::Retreat))
            .unwrap();
        assert_eq!(current_name(&playback), "c.png");
        assert_eq!(playback.phase(), PlaybackPhase::TimedHold);
        assert_eq!(playback.opacity(), None);
        assert_eq!(playback.next().map(|s| s.filename()), Some("a.png"));
        assert_eq!(surface.live(), 2);
    }

    #[test]
    fn every_texture_is_released_exactly_once() {
        let (_dir, paths) = corpus(&["a.png", "b.png", "c.png"]);
        let ctx = ImagingContext::new();
        let mut surface = MockSurface::default();
        let released = Rc::clone(&surface.released);
        {
            let mut playback = playback(paths, timed(0.5, 0.25), &ctx, &mut surface);
            for i in 0..200 {
                let step = match i % 37 {
                    0 => Some(Step::Advance),
                    18 => Some(Step::Retreat),
                    _ => None,
                };
                playback.tick(&ctx, &mut surface, 0.05, step).unwrap();
                assert!(surface.live() <= 2);
            }
        }

        let mut ids = released.borrow().clone();
        ids.sort_unstable();
        assert_eq!(ids, (1..=surface.uploads).collect::<Vec<_>>());
    }

    #[test]
    fn animation_steps_one_frame_per_delay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blink.gif");
        write_gif(&path);
        let ctx = ImagingContext::new();
        let mut surface = MockSurface::default();
        let mut playback = playback(vec![path], PlaybackConfig::default(), &ctx, &mut surface);

        assert_eq!(playback.phase(), PlaybackPhase::AnimationPlaying);
        playback.tick(&ctx, &mut surface, 0.05, None).unwrap();
        assert_eq!(playback.current().frame(), 0);
        playback.tick(&ctx, &mut surface, 0.06, None).unwrap();
        assert_eq!(playback.current().frame(), 1);
        // A long stall still moves a single frame.
        playback.tick(&ctx, &mut surface, 5.0, None).unwrap();
        assert_eq!(playback.current().frame(), 2);
        playback.tick(&ctx, &mut surface, 0.1, None).unwrap();
        assert_eq!(playback.current().frame(), 0);
        assert_eq!(surface.updates, 3);
        assert_eq!(surface.uploads, 1);
    }

    #[test]
    fn overlay_follows_mode() {
        let (_dir, paths) = corpus(&["a.png", "b.png"]);
        fs::write(format!("{}.txt", paths[0].display()), "  Harbour at dusk \n").unwrap();
        let ctx = ImagingContext::new();

        let mut surface = MockSurface::default();
        let config = PlaybackConfig {
            overlay: OverlayMode::Caption,
            ..PlaybackConfig::default()
        };
        let mut playback = playback(paths.clone(), config, &ctx, &mut surface);
        assert_eq!(playback.scene().overlay, Some("Harbour at dusk"));
        playback.step(&ctx, &mut surface, Step::Advance).unwrap();
        assert_eq!(playback.scene().overlay, None);

        let config = PlaybackConfig {
            overlay: OverlayMode::Filename,
            ..PlaybackConfig::default()
        };
        let playback = self::playback(paths.clone(), config, &ctx, &mut surface);
        assert_eq!(playback.scene().overlay, Some("a.png"));

        let playback = self::playback(paths, PlaybackConfig::default(), &ctx, &mut surface);
        assert_eq!(playback.scene().overlay, None);
    }

    #[test]
    fn invalid_config_is_refused() {
        let (_dir, paths) = corpus(&["a.png"]);
        let ctx = ImagingContext::new();
        let mut surface = MockSurface::default();
        let screen = Bounds::new(64, 64);
        let navigator = Navigator::new(paths, Decoder::new(screen, None)).unwrap();
        let result = Playback::new(navigator, timed(0.0, 1.0), screen, &ctx, &mut surface);
        assert!(matches!(result, Err(ViewerError::InvalidConfig(_))));
        assert_eq!(surface.uploads, 0);
    }

    #[test]
    fn broken_files_are_skipped_while_stepping() {
        let (dir, mut paths) = corpus(&["a.png", "c.png"]);
        let broken = dir.path().join("b.png");
        fs::write(&broken, b"not a png").unwrap();
        paths.insert(1, broken);

        let ctx = ImagingContext::new();
        let mut surface = MockSurface::default();
        let mut playback = playback(paths, PlaybackConfig::default(), &ctx, &mut surface);
        playback.step(&ctx, &mut surface, Step::Advance).unwrap();
        assert_eq!(current_name(&playback), "c.png");
        assert_eq!(playback.navigator().len(), 2);
    }
}
