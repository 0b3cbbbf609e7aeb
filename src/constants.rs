pub const DEFAULT_SCREEN_WIDTH: u32 = 1920;   // Used when the display size can't be detected
pub const DEFAULT_SCREEN_HEIGHT: u32 = 1080;
pub const TARGET_FPS: u32 = 60;               // Render loop rate (ticks per second)

pub const FONT_SIZE: i32 = 72;                // Overlay text size (pixels)
pub const OVERLAY_MARGIN: i32 = 20;           // Left margin of overlay text (pixels)
pub const OVERLAY_SHADE_ALPHA: u8 = 192;      // Opacity at the bottom of the overlay gradient

pub const DEFAULT_FRAME_DELAY: u16 = 10;      // Replacement for zero frame delays (hundredths of a second)
pub const CACHE_JPEG_QUALITY: u8 = 90;        // Quality of resized cache entries
pub const ERROR_SCREEN_SECONDS: u64 = 5;      // How long a fatal error stays on screen

pub const SETTINGS_FILE: &str = "slide_settings.ini";
pub const CACHE_DIR_ENV: &str = "RAYVIEW_CACHE_DIR";
