//! Terrasoft: software terrain renderer
//!
//! Renders a small terrain scene entirely on the CPU:
//! - Painter's algorithm for distant geometry, Z-buffer up close
//! - Perspective-correct procedural textures
//! - Low resolution framebuffer scaled up to the window
//!
//! Controls: WASD/QE fly, right mouse look, arrows walk the character,
//! Tab toggles the debug overlay, R cycles weather, P saves a snapshot.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod app;
mod config;
mod rasterizer;
mod textures;
mod world;

use app::{App, Controls};
use config::{RenderConfig, CONFIG_PATH};
use env_logger::Env;
use log::{error, info};
use macroquad::prelude::*;
use rasterizer::{DebugOverlay, FrameReport};

fn window_conf() -> Conf {
    let config = RenderConfig::load(CONFIG_PATH).unwrap_or_default();
    let scale = config.window_scale.max(1) as i32;
    Conf {
        window_title: format!("Terrasoft v{}", VERSION),
        window_width: config.width as i32 * scale,
        window_height: config.height as i32 * scale,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

fn to_screen_color(c: rasterizer::Color) -> Color {
    Color::from_rgba(c.r, c.g, c.b, c.a)
}

/// Largest rectangle with the framebuffer's aspect ratio that fits the window
fn fit_rect(fb_width: usize, fb_height: usize) -> (f32, f32, f32, f32) {
    let (sw, sh) = (screen_width(), screen_height());
    let scale = (sw / fb_width as f32).min(sh / fb_height as f32);
    let (w, h) = (fb_width as f32 * scale, fb_height as f32 * scale);
    ((sw - w) * 0.5, (sh - h) * 0.5, w, h)
}

fn draw_overlay(overlay: &DebugOverlay, rect: (f32, f32, f32, f32), fb_width: usize, fb_height: usize) {
    let (x, y, w, h) = rect;
    let sx = w / fb_width as f32;
    let sy = h / fb_height as f32;
    for seg in &overlay.segments {
        draw_line(
            x + seg.from.0 * sx,
            y + seg.from.1 * sy,
            x + seg.to.0 * sx,
            y + seg.to.1 * sy,
            2.0,
            to_screen_color(seg.color),
        );
    }
}

fn draw_hud(app: &App, report: &FrameReport) {
    let cam = app.camera.position;
    let stats = &report.stats;
    let fb = app.renderer.framebuffer();
    let center_depth = fb.depth_at(fb.width / 2, fb.height / 2).unwrap_or(f32::INFINITY);
    let lines = [
        format!(
            "fps {}  weather {:?} {:.1}",
            get_fps(),
            app.weather.kind,
            app.weather.intensity
        ),
        format!("cam {:.1} {:.1} {:.1}", cam.x, cam.y, cam.z),
        format!(
            "tris {} near {} far {} culled {} clipped {}",
            stats.cull.submitted,
            stats.near,
            stats.far,
            stats.cull.rejected(),
            stats.cull.near_clipped
        ),
        format!("pixels {}  center depth {:.1}", stats.pixels_written, center_depth),
    ];
    for (i, line) in lines.iter().enumerate() {
        draw_text(line, 8.0, 18.0 + i as f32 * 16.0, 16.0, WHITE);
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("=== Terrasoft v{} ===", VERSION);

    let config = RenderConfig::load_or_default(CONFIG_PATH);
    let (fb_width, fb_height) = (config.width, config.height);
    let mut app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to build scene: {}", e);
            return;
        }
    };

    let mut last_mouse = mouse_position();

    loop {
        let controls = Controls::poll(&mut last_mouse);
        app.update(&controls, get_frame_time());

        clear_background(BLACK);
        match app.render() {
            Ok(report) => {
                let rect = fit_rect(fb_width, fb_height);
                app.renderer.present(rect.0, rect.1, rect.2, rect.3);
                if let Some(overlay) = &report.overlay {
                    draw_overlay(overlay, rect, fb_width, fb_height);
                    draw_hud(&app, &report);
                }
            }
            Err(e) => error!("Render failed: {}", e),
        }

        if controls.snapshot {
            match app.snapshot() {
                Ok(path) => info!("Saved snapshot {}", path.display()),
                Err(e) => error!("Snapshot failed: {}", e),
            }
        }

        next_frame().await;
    }
}
