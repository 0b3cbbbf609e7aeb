use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use log::{info, warn};
use serde::Deserialize;

use crate::constants::{CACHE_DIR_ENV, SETTINGS_FILE};
use crate::error::{ViewerError, ViewerResult};

/// Text drawn over the picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayMode {
    #[default]
    None,
    Filename,
    Caption,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Filename,
    Natural,
    Random,
}

/// What the playback engine needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackConfig {
    /// Seconds each item stays up, 0 to hold forever.
    pub hold_duration: f32,
    /// Seconds of crossfade, 0 to cut.
    pub transition_duration: f32,
    pub overlay: OverlayMode,
}

impl PlaybackConfig {
    pub fn validate(&self) -> ViewerResult<()> {
        if !(self.hold_duration >= 0.0) {
            return Err(ViewerError::config("--duration must be positive"));
        }
        if !(self.transition_duration >= 0.0) {
            return Err(ViewerError::config("--transition-duration must be positive"));
        }
        if self.transition_duration > 0.0 && self.hold_duration <= 0.0 {
            return Err(ViewerError::config(
                "--transition-duration can only be used when --duration is also set",
            ));
        }
        Ok(())
    }

    pub fn is_timed(&self) -> bool {
        self.hold_duration > 0.0
    }

    pub fn crossfades(&self) -> bool {
        self.is_timed() && self.transition_duration > 0.0
    }
}

/// Kiosk image viewer and slideshow
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "rayview", version)]
pub struct Args {
    /// Directories or image files to display (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(long)]
    pub recursive: bool,

    /// Sort mode for pictures
    #[arg(long, value_enum)]
    pub sort: Option<SortMode>,

    /// Text to overlay on the image
    #[arg(long, value_enum)]
    pub display: Option<OverlayMode>,

    /// Seconds to display each image in a slideshow (0 for always)
    #[arg(long)]
    pub duration: Option<f32>,

    /// Length of the crossfade in seconds during a slideshow
    #[arg(long)]
    pub transition_duration: Option<f32>,

    /// Print the file paths that will be displayed
    #[arg(long)]
    pub list: bool,

    /// Directory for downscaled copies of oversized images
    #[arg(long, env = CACHE_DIR_ENV)]
    pub cache_dir: Option<PathBuf>,

    /// Display width in pixels (default: detected)
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Display height in pixels (default: detected)
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// TTF font for the overlay text
    #[arg(long)]
    pub font: Option<PathBuf>,
}

/// Contents of `slide_settings.ini` (TOML syntax, every key optional).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub duration: Option<f32>,
    pub recursive: Option<bool>,
    pub sort: Option<SortMode>,
    pub display: Option<OverlayMode>,
    pub transition_duration: Option<f32>,
}

impl Settings {
    pub fn parse(text: &str) -> ViewerResult<Self> {
        toml::from_str(text).map_err(|e| {
            ViewerError::config(format!(
                "unable to read {SETTINGS_FILE} (ensure strings are double quoted): {e}"
            ))
        })
    }

    /// Find and read the settings file that applies to `paths`.
    ///
    /// Only a single directory (or the working directory when no path is
    /// given) is searched; with several inputs the file is ambiguous.
    pub fn discover(paths: &[PathBuf]) -> ViewerResult<Option<Self>> {
        if paths.len() > 1 {
            if paths.iter().any(|path| path.join(SETTINGS_FILE).is_file()) {
                warn!("Can't load {SETTINGS_FILE} when multiple paths are passed in");
            }
            return Ok(None);
        }

        let directory = match paths.first() {
            Some(path) => path.clone(),
            None => match std::env::current_dir() {
                Ok(dir) => dir,
                Err(e) => {
                    warn!("Cannot get current directory to look for {SETTINGS_FILE}: {e}");
                    return Ok(None);
                }
            },
        };
        Self::load(&directory.join(SETTINGS_FILE))
    }

    pub fn load(location: &Path) -> ViewerResult<Option<Self>> {
        if !location.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(location)
            .map_err(|e| ViewerError::config(format!("unable to read {:?}: {e}", location)))?;
        info!("Loading settings from {:?}", location);
        Self::parse(&text).map(Some)
    }
}

/// Command line merged with the settings file; flags always win.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub paths: Vec<PathBuf>,
    pub recursive: bool,
    pub sort: SortMode,
    pub list: bool,
    pub playback: PlaybackConfig,
    pub cache_dir: Option<PathBuf>,
    pub resolution: Option<(u32, u32)>,
    pub font: Option<PathBuf>,
}

impl Args {
    pub fn resolve(self, settings: Option<Settings>) -> ViewerResult<Options> {
        let settings = settings.unwrap_or_default();
        let playback = PlaybackConfig {
            hold_duration: self.duration.or(settings.duration).unwrap_or(0.0),
            transition_duration: self
                .transition_duration
                .or(settings.transition_duration)
                .unwrap_or(0.0),
            overlay: self.display.or(settings.display).unwrap_or_default(),
        };
        playback.validate()?;

        Ok(Options {
            recursive: self.recursive || settings.recursive.unwrap_or(false),
            sort: self.sort.or(settings.sort).unwrap_or_default(),
            list: self.list,
            playback,
            cache_dir: self.cache_dir,
            resolution: self.width.zip(self.height),
            font: self.font,
            paths: self.paths,
        })
    }
}
