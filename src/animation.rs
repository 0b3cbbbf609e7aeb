//! Animated GIF playback data.
//!
//! A GIF stores each frame after the first as a palette-indexed sub-rectangle
//! of the canvas. Frame 0 is expanded directly; every later frame `i` is
//! composited from frame `i - 1` and delta `i` only, lazily, in increasing
//! order, and kept for the lifetime of the [`Animation`].

use std::path::Path;

use log::debug;

use crate::constants::DEFAULT_FRAME_DELAY;
use crate::decode::{ImagingContext, SourceFormat, read_source};
use crate::error::{ViewerError, ViewerResult};
use crate::raster::{DecodedRaster, PixelLayout};

const M: u32 = 0xffff;

/// One frame as stored in the file: a palette-indexed rectangle placed on the
/// canvas. Palette entries are premultiplied RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaFrame {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
    indices: Vec<u8>,
    palette: Vec<[u8; 4]>,
}

impl DeltaFrame {
    pub fn new(
        left: u32,
        top: u32,
        width: u32,
        height: u32,
        indices: Vec<u8>,
        palette: Vec<[u8; 4]>,
    ) -> ViewerResult<Self> {
        if indices.len() != width as usize * height as usize {
            return Err(ViewerError::render(format!(
                "delta frame {}x{} has {} indices",
                width,
                height,
                indices.len()
            )));
        }
        if left.checked_add(width).is_none() || top.checked_add(height).is_none() {
            return Err(ViewerError::render(format!(
                "delta frame {}x{} at ({}, {}) runs past the coordinate range",
                width, height, left, top
            )));
        }
        Ok(Self {
            left,
            top,
            width,
            height,
            indices,
            palette,
        })
    }

    /// Colour at canvas position `(x, y)`, or `None` when the position lies
    /// outside this frame's rectangle or names a missing palette entry.
    fn color_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x < self.left || y < self.top {
            return None;
        }
        let (dx, dy) = (x - self.left, y - self.top);
        if dx >= self.width || dy >= self.height {
            return None;
        }
        let index = self.indices[dy as usize * self.width as usize + dx as usize];
        self.palette.get(index as usize).copied()
    }
}

/// Source-over blend of `src` onto `dst` at 16-bit precision.
///
/// `src` must be premultiplied; the sum then stays within 16 bits before the
/// final shift back to 8 bits per channel.
pub fn blend_over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    let sa = u32::from(src[3]) * 0x101;
    let alpha = (M - sa) * 0x101;
    let mut out = [0u8; 4];
    for channel in 0..4 {
        let s = u32::from(src[channel]) * 0x101;
        let d = u32::from(dst[channel]);
        out[channel] = ((d * alpha / M + s) >> 8) as u8;
    }
    out
}

pub struct Animation {
    width: u32,
    height: u32,
    deltas: Vec<DeltaFrame>,
    delays: Vec<u16>,
    frames: Vec<Option<Vec<u8>>>,
}

impl Animation {
    pub fn decode(ctx: &ImagingContext, path: &Path) -> ViewerResult<Self> {
        let bytes = read_source(path)?;
        ctx.count_decode();
        let (width, height, deltas, delays) =
            parse_gif(&bytes).map_err(|e| ViewerError::decode(path, e))?;
        debug!(
            "Decoded {:?}: {}x{} canvas, {} frames",
            path,
            width,
            height,
            deltas.len()
        );
        Self::from_deltas(width, height, deltas, delays).map_err(|e| ViewerError::decode(path, e))
    }

    /// Build an animation from raw frames. `delays` are in hundredths of a
    /// second, one per frame.
    pub fn from_deltas(
        width: u32,
        height: u32,
        deltas: Vec<DeltaFrame>,
        delays: Vec<u16>,
    ) -> ViewerResult<Self> {
        if width == 0 || height == 0 {
            return Err(ViewerError::render("animation canvas is empty"));
        }
        if deltas.is_empty() {
            return Err(ViewerError::render("animation has no frames"));
        }
        if deltas.len() != delays.len() {
            return Err(ViewerError::render(format!(
                "{} frames but {} delays",
                deltas.len(),
                delays.len()
            )));
        }

        let mut first = vec![0u8; width as usize * height as usize * 4];
        let delta = &deltas[0];
        for y in delta.top..(delta.top + delta.height).min(height) {
            for x in delta.left..(delta.left + delta.width).min(width) {
                if let Some(color) = delta.color_at(x, y) {
                    let offset = (y as usize * width as usize + x as usize) * 4;
                    first[offset..offset + 4].copy_from_slice(&color);
                }
            }
        }

        let mut frames = vec![None; deltas.len()];
        frames[0] = Some(first);
        Ok(Self {
            width,
            height,
            deltas,
            delays,
            frames,
        })
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame_count(&self) -> usize {
        self.deltas.len()
    }

    /// Delay of frame `index` in hundredths of a second. Zero delays, which
    /// many encoders write to mean "as fast as possible", become a sane default.
    pub fn delay(&self, index: usize) -> u16 {
        match self.delays.get(index).copied() {
            Some(0) | None => DEFAULT_FRAME_DELAY,
            Some(delay) => delay,
        }
    }

    pub fn delay_seconds(&self, index: usize) -> f32 {
        self.delay(index) as f32 / 100.0
    }

    pub fn first_frame(&self) -> ViewerResult<DecodedRaster> {
        let pixels = self.frames[0].clone().unwrap_or_default();
        DecodedRaster::new(
            self.width,
            self.height,
            PixelLayout::Rgba8,
            pixels,
            SourceFormat::Gif,
        )
    }

    /// Fully composited RGBA pixels of frame `index`, or `None` past the end.
    ///
    /// Missing predecessors are composited first, in order; results are kept,
    /// so repeated calls return the same buffer.
    pub fn frame_at(&mut self, index: usize) -> Option<&[u8]> {
        if index >= self.frames.len() {
            return None;
        }
        let first_missing = (1..=index).find(|&i| self.frames[i].is_none());
        if let Some(start) = first_missing {
            for i in start..=index {
                let composited = match &self.frames[i - 1] {
                    Some(previous) => self.composite(previous, &self.deltas[i]),
                    None => return None,
                };
                self.frames[i] = Some(composited);
            }
        }
        self.frames[index].as_deref()
    }

    fn composite(&self, previous: &[u8], delta: &DeltaFrame) -> Vec<u8> {
        let mut out = previous.to_vec();
        let x_end = (delta.left + delta.width).min(self.width);
        let y_end = (delta.top + delta.height).min(self.height);
        for y in delta.top..y_end {
            for x in delta.left..x_end {
                let Some(src) = delta.color_at(x, y) else {
                    continue;
                };
                // Fully transparent keeps whatever the previous frame had.
                if src[3] == 0 {
                    continue;
                }
                let offset = (y as usize * self.width as usize + x as usize) * 4;
                let dst = [
                    out[offset],
                    out[offset + 1],
                    out[offset + 2],
                    out[offset + 3],
                ];
                out[offset..offset + 4].copy_from_slice(&blend_over(dst, src));
            }
        }
        out
    }
}

type ParsedGif = (u32, u32, Vec<DeltaFrame>, Vec<u16>);

fn parse_gif(bytes: &[u8]) -> Result<ParsedGif, String> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options.read_info(bytes).map_err(|e| e.to_string())?;

    let width = u32::from(decoder.width());
    let height = u32::from(decoder.height());
    let global_palette = decoder.global_palette().map(|p| p.to_vec());

    let mut deltas = Vec::new();
    let mut delays = Vec::new();
    while let Some(frame) = decoder.read_next_frame().map_err(|e| e.to_string())? {
        let rgb = frame
            .palette
            .as_deref()
            .or(global_palette.as_deref())
            .unwrap_or(&[]);
        let palette = expand_palette(rgb, frame.transparent);
        deltas.push(
            DeltaFrame::new(
                u32::from(frame.left),
                u32::from(frame.top),
                u32::from(frame.width),
                u32::from(frame.height),
                frame.buffer.to_vec(),
                palette,
            )
            .map_err(|e| e.to_string())?,
        );
        delays.push(frame.delay);
    }
    if deltas.is_empty() {
        return Err("gif contains no frames".to_string());
    }
    Ok((width, height, deltas, delays))
}

fn expand_palette(rgb: &[u8], transparent: Option<u8>) -> Vec<[u8; 4]> {
    rgb.chunks_exact(3)
        .enumerate()
        .map(|(index, c)| {
            if transparent == Some(index as u8) {
                [0, 0, 0, 0]
            } else {
                [c[0], c[1], c[2], 255]
            }
        })
        .collect()
}
