use std::time::{Duration, Instant};

use log::warn;
use raylib::prelude::*;

use rayview::constants::{ERROR_SCREEN_SECONDS, FONT_SIZE, OVERLAY_MARGIN, OVERLAY_SHADE_ALPHA};
use rayview::error::{ViewerError, ViewerResult};
use rayview::playback::Scene;
use rayview::raster::{DecodedRaster, PixelLayout};
use rayview::surface::Surface;

/// Texture uploads for one tick. Borrows the window so the playback engine
/// can create and refresh textures without owning raylib handles.
pub struct RaylibSurface<'a> {
    rl: &'a mut RaylibHandle,
    thread: &'a RaylibThread,
}

impl<'a> RaylibSurface<'a> {
    pub fn new(rl: &'a mut RaylibHandle, thread: &'a RaylibThread) -> Self {
        Self { rl, thread }
    }
}

impl Surface for RaylibSurface<'_> {
    type Texture = Texture2D;

    fn upload(&mut self, raster: &DecodedRaster) -> ViewerResult<Texture2D> {
        let width = raster.width() as i32;
        let height = raster.height() as i32;

        // Blank RGBA image of the right size, pixels copied in once on the GPU side
        let image = Image::gen_image_color(width, height, Color::BLANK);
        let mut texture = self
            .rl
            .load_texture_from_image(self.thread, &image)
            .map_err(|e| ViewerError::render(format!("Failed to create texture: {}", e)))?;
        drop(image);

        let rgba = match raster.layout() {
            PixelLayout::Rgba8 => std::borrow::Cow::Borrowed(raster.pixels()),
            PixelLayout::Rgb8 => std::borrow::Cow::Owned(rgb_to_rgba(raster.pixels())),
        };
        texture
            .update_texture(&rgba)
            .map_err(|e| ViewerError::render(format!("Failed to fill texture: {}", e)))?;
        texture.set_texture_filter(self.thread, TextureFilter::TEXTURE_FILTER_BILINEAR);
        Ok(texture)
    }

    fn update(&mut self, texture: &mut Texture2D, rgba: &[u8]) -> ViewerResult<()> {
        texture
            .update_texture(rgba)
            .map_err(|e| ViewerError::render(format!("Failed to update animation frame: {}", e)))
    }
}

fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for px in rgb.chunks_exact(3) {
        rgba.extend_from_slice(&[px[0], px[1], px[2], u8::MAX]);
    }
    rgba
}

/// Overlay font: the one passed with `--font`, else raylib's default.
pub fn load_overlay_font(
    rl: &mut RaylibHandle,
    thread: &RaylibThread,
    path: Option<&std::path::Path>,
) -> Option<Font> {
    let path = path?;
    match rl.load_font_ex(thread, &path.to_string_lossy(), FONT_SIZE, None) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!("Could not load font {:?}, using the default one: {}", path, e);
            None
        }
    }
}

pub fn draw_scene(d: &mut RaylibDrawHandle, scene: &Scene<'_, Texture2D>, font: Option<&Font>) {
    d.clear_background(Color::BLACK);

    for layer in &scene.layers {
        d.draw_texture_ex(
            layer.texture,
            Vector2::new(layer.placement.x, layer.placement.y),
            0.0,
            layer.placement.scale,
            Color::new(255, 255, 255, layer.alpha),
        );
    }

    if let Some(text) = scene.overlay {
        draw_overlay(d, text, font);
    }
}

fn draw_overlay(d: &mut RaylibDrawHandle, text: &str, font: Option<&Font>) {
    let screen_width = d.get_screen_width();
    let screen_height = d.get_screen_height();
    let band = FONT_SIZE + 2 * OVERLAY_MARGIN;

    d.draw_rectangle_gradient_v(
        0,
        screen_height - band,
        screen_width,
        band,
        Color::new(0, 0, 0, 0),
        Color::new(0, 0, 0, OVERLAY_SHADE_ALPHA),
    );

    let x = OVERLAY_MARGIN;
    let y = screen_height - FONT_SIZE - 10;
    match font {
        Some(font) => d.draw_text_ex(
            font,
            text,
            Vector2::new(x as f32, y as f32),
            FONT_SIZE as f32,
            0.0,
            Color::RAYWHITE,
        ),
        None => d.draw_text(text, x, y, FONT_SIZE, Color::RAYWHITE),
    }
}

/// Keep a fatal error on screen for a few seconds (or until the window is
/// closed).
pub fn show_error(rl: &mut RaylibHandle, thread: &RaylibThread, message: &str) {
    let deadline = Instant::now() + Duration::from_secs(ERROR_SCREEN_SECONDS);
    while !rl.window_should_close() && Instant::now() < deadline {
        let mut d = rl.begin_drawing(thread);
        d.clear_background(Color::BLACK);
        d.draw_text(&format!("Error: {}", message), 20, 20, 40, Color::RED);
    }
}
