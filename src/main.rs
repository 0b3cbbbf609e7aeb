use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use raylib::prelude::*;

mod display;

use rayview::config::{Args, Options, Settings};
use rayview::constants::TARGET_FPS;
use rayview::error::ViewerResult;
use rayview::files::load_sorted_image_paths;
use rayview::playback::{Playback, Step};
use rayview::screen::detect_resolution;
use rayview::{Bounds, Decoder, ImagingContext, Navigator, ResizeCache};

use crate::display::{RaylibSurface, draw_scene, load_overlay_font, show_error};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let settings = Settings::discover(&args.paths)?;
    let options = args.resolve(settings)?;

    let paths = load_sorted_image_paths(&options.paths, options.recursive, options.sort)
        .context("Error loading images")?;
    if options.list {
        for path in &paths {
            println!("{}", path.display());
        }
    }

    let ctx = ImagingContext::new();
    let screen = detect_resolution(options.resolution);

    let (mut rl, thread) = raylib::init()
        .size(screen.width as i32, screen.height as i32)
        .title("rayview")
        .vsync()
        .build();
    rl.set_target_fps(TARGET_FPS);
    rl.set_trace_log(TraceLogLevel::LOG_WARNING);
    rl.hide_cursor();

    if let Err(e) = show(&mut rl, &thread, &ctx, &options, paths, screen) {
        error!("{}", e);
        if e.is_fatal() {
            show_error(&mut rl, &thread, &e.to_string());
        }
        process::exit(1);
    }
    Ok(())
}

// --- Main Loop ---
fn show(
    rl: &mut RaylibHandle,
    thread: &RaylibThread,
    ctx: &ImagingContext,
    options: &Options,
    paths: Vec<std::path::PathBuf>,
    screen: Bounds,
) -> ViewerResult<()> {
    let cache = options.cache_dir.as_ref().map(|root| {
        info!("Caching resized pictures under {:?}", root);
        ResizeCache::new(root, screen)
    });
    let navigator = Navigator::new(paths, Decoder::new(screen, cache))?;
    let font = load_overlay_font(rl, thread, options.font.as_deref());

    let mut playback = Playback::new(
        navigator,
        options.playback,
        screen,
        ctx,
        &mut RaylibSurface::new(rl, thread),
    )?;

    while !rl.window_should_close() {
        let step = if rl.is_key_pressed(KeyboardKey::KEY_RIGHT) {
            Some(Step::Advance)
        } else if rl.is_key_pressed(KeyboardKey::KEY_LEFT) {
            Some(Step::Retreat)
        } else {
            None
        };
        let dt = rl.get_frame_time();

        playback.tick(ctx, &mut RaylibSurface::new(rl, thread), dt, step)?;

        let mut d = rl.begin_drawing(thread);
        draw_scene(&mut d, &playback.scene(), font.as_ref());
    }
    Ok(())
}
