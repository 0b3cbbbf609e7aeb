use std::process::Command;

use anyhow::{Context, Result, bail};
use log::{info, warn};

use crate::constants::{DEFAULT_SCREEN_HEIGHT, DEFAULT_SCREEN_WIDTH};
use crate::raster::Bounds;

/// Read `WxH` from the first `mode "WxH-R"` line of `fbset -s` output.
pub fn parse_fbset(output: &str) -> Option<(u32, u32)> {
    let line = output
        .lines()
        .map(str::trim_start)
        .find(|line| line.starts_with("mode"))?;
    let quoted = line.split_whitespace().nth(1)?.trim_matches('"');
    let geometry = quoted.split('-').next()?;
    let (width, height) = geometry.split_once('x')?;
    let width = width.parse().ok()?;
    let height = height.parse().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

fn query_fbset() -> Result<(u32, u32)> {
    let output = Command::new("fbset")
        .arg("-s")
        .output()
        .context("Unable to run fbset, can't determine resolution")?;
    if !output.status.success() {
        bail!("fbset -s exited with {}", output.status);
    }
    let text = String::from_utf8_lossy(&output.stdout);
    parse_fbset(&text).context("No mode line in 'fbset -s' output")
}

/// The display box: explicit size when given, else the framebuffer mode,
/// else 1920x1080.
pub fn detect_resolution(explicit: Option<(u32, u32)>) -> Bounds {
    if let Some((width, height)) = explicit {
        return Bounds::new(width, height);
    }
    match query_fbset() {
        Ok((width, height)) => {
            info!("Display resolution {}x{}", width, height);
            Bounds::new(width, height)
        }
        Err(e) => {
            warn!(
                "{:#}. Using {}x{}",
                e, DEFAULT_SCREEN_WIDTH, DEFAULT_SCREEN_HEIGHT
            );
            Bounds::new(DEFAULT_SCREEN_WIDTH, DEFAULT_SCREEN_HEIGHT)
        }
    }
}
