//! Demo application state
//!
//! Owns the scene (terrain, boxes, character, weather), the texture registry
//! and the renderer. Input is sampled once per frame into `Controls` so the
//! update step can run without a window.

use std::fs;
use std::path::{Path, PathBuf};
use log::{debug, info};
use macroquad::prelude::{is_key_down, is_key_pressed, is_mouse_button_down, mouse_position, KeyCode, MouseButton};
use thiserror::Error;
use crate::config::{ConfigError, RenderConfig};
use crate::rasterizer::{Camera, Color, FrameInput, FrameReport, RenderError, Renderer, TextureError, TriangleSource, Vec3};
use crate::textures::TextureRegistry;
use crate::world::{Character, PhysicsBox, Terrain, Weather, WeatherKind};

/// Terrain vertices per side
const TERRAIN_SIZE: usize = 65;
/// World units per terrain cell
const TERRAIN_CELL: f32 = 4.0;

const FLY_SPEED: f32 = 40.0;
const WALK_SPEED: f32 = 6.0;
const TURN_SPEED: f32 = 2.0;
const MOUSE_SENSITIVITY: f32 = 0.005;

const SNAPSHOT_DIR: &str = "snapshots";

/// Error type for building and driving the demo
#[derive(Debug, Error)]
pub enum AppError {
    #[error("texture error: {0}")]
    Texture(#[from] TextureError),
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("terrain grid is empty")]
    EmptyTerrain,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One frame of user input
#[derive(Debug, Clone, Copy, Default)]
pub struct Controls {
    /// Camera movement along forward, right and up, each in [-1, 1]
    pub fly: (f32, f32, f32),
    /// Mouse look delta in pixels (only while the right button is held)
    pub look: (f32, f32),
    /// Character walk and turn, each in [-1, 1]
    pub walk: f32,
    pub turn: f32,
    pub toggle_debug: bool,
    pub cycle_weather: bool,
    pub snapshot: bool,
}

fn axis(neg: KeyCode, pos: KeyCode) -> f32 {
    match (is_key_down(neg), is_key_down(pos)) {
        (false, true) => 1.0,
        (true, false) => -1.0,
        _ => 0.0,
    }
}

impl Controls {
    /// Sample the keyboard and mouse. `last_mouse` is updated in place.
    pub fn poll(last_mouse: &mut (f32, f32)) -> Self {
        let mouse = mouse_position();
        let look = if is_mouse_button_down(MouseButton::Right) {
            (mouse.0 - last_mouse.0, mouse.1 - last_mouse.1)
        } else {
            (0.0, 0.0)
        };
        *last_mouse = mouse;

        Self {
            fly: (axis(KeyCode::S, KeyCode::W), axis(KeyCode::A, KeyCode::D), axis(KeyCode::Q, KeyCode::E)),
            look,
            walk: axis(KeyCode::Down, KeyCode::Up),
            turn: axis(KeyCode::Right, KeyCode::Left),
            toggle_debug: is_key_pressed(KeyCode::Tab),
            cycle_weather: is_key_pressed(KeyCode::R),
            snapshot: is_key_pressed(KeyCode::P),
        }
    }
}

pub struct App {
    pub camera: Camera,
    pub terrain: Terrain,
    pub boxes: Vec<PhysicsBox>,
    pub character: Character,
    pub weather: Weather,
    pub textures: TextureRegistry,
    pub renderer: Renderer,
    pub show_debug: bool,
    /// Simulation time in seconds, advanced by `update`
    pub frame_time: f32,
    snapshots_taken: u32,
}

impl App {
    pub fn new(config: RenderConfig) -> Result<Self, AppError> {
        let textures = TextureRegistry::with_procedural(config.texture_seed)?;
        let terrain = Terrain::rolling(TERRAIN_SIZE, TERRAIN_CELL, &textures).ok_or(AppError::EmptyTerrain)?;
        let mid = terrain.extent() * 0.5;

        let mut camera = Camera::new(Vec3::new(mid, 70.0, terrain.extent() - 8.0), config.fov_radians());
        camera.rotate(-0.35, 0.0);

        let mut character = Character::new(Vec3::new(mid + 40.0, 0.0, mid + 60.0));
        character.update_ground(&terrain);

        let crate_color = Color::from_hex("#8b5a2b").unwrap_or(Color::WHITE);
        let boxes = [(30.0, 50.0), (50.0, 45.0), (44.0, 70.0)]
            .into_iter()
            .map(|(dx, dz)| {
                let (x, z) = (mid + dx, mid + dz);
                let y = terrain.ground_at(x, z).map(|(_, h)| h).unwrap_or(0.0);
                PhysicsBox::new(Vec3::new(x, y + 1.5, z), Vec3::new(1.5, 1.5, 1.5), crate_color)
            })
            .collect();

        let renderer = Renderer::new(config)?;
        info!(
            "Scene ready: {} terrain triangles, {} textures",
            terrain.triangles().len(),
            textures.len()
        );
        for (id, texture) in textures.iter() {
            debug!("texture {} = {}", id.index(), texture.name);
        }

        Ok(Self {
            camera,
            terrain,
            boxes,
            character,
            weather: Weather::default(),
            textures,
            renderer,
            show_debug: false,
            frame_time: 0.0,
            snapshots_taken: 0,
        })
    }

    /// Advance the simulation by `dt` seconds
    pub fn update(&mut self, controls: &Controls, dt: f32) {
        self.frame_time += dt;

        let (dx, dy) = controls.look;
        if dx != 0.0 || dy != 0.0 {
            self.camera.rotate(-dy * MOUSE_SENSITIVITY, -dx * MOUSE_SENSITIVITY);
        }
        let (f, r, u) = controls.fly;
        self.camera.move_local(f * FLY_SPEED * dt, r * FLY_SPEED * dt, u * FLY_SPEED * dt);

        if controls.walk != 0.0 || controls.turn != 0.0 {
            self.character.walk(controls.walk * WALK_SPEED * dt, controls.turn * TURN_SPEED * dt);
            self.character.update_ground(&self.terrain);
        }

        if controls.toggle_debug {
            self.show_debug = !self.show_debug;
        }
        if controls.cycle_weather {
            let kind = self.weather.kind.next();
            let intensity = if kind == WeatherKind::Clear { 0.0 } else { 0.7 };
            self.weather = Weather::new(kind, intensity);
        }
    }

    /// Render the scene into the renderer's framebuffer
    pub fn render(&mut self) -> Result<FrameReport, RenderError> {
        let objects: Vec<&dyn TriangleSource> = self.boxes.iter().map(|b| b as &dyn TriangleSource).collect();
        let input = FrameInput {
            terrain: &self.terrain,
            physics_objects: &objects,
            character: Some(&self.character),
            weather: Some(&self.weather),
            show_debug_panel: self.show_debug,
            frame_time: self.frame_time,
        };
        self.renderer.render(&self.camera, &input, &self.textures)
    }

    /// Write the last rendered frame to the snapshot directory
    pub fn snapshot(&mut self) -> Result<PathBuf, AppError> {
        self.snapshot_into(Path::new(SNAPSHOT_DIR))
    }

    /// Save the frame as PNG with the config that produced it alongside
    fn snapshot_into(&mut self, dir: &Path) -> Result<PathBuf, AppError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("frame_{:04}.png", self.snapshots_taken));
        self.renderer.save_snapshot(&path)?;
        self.renderer.config().save(path.with_extension("ron"))?;
        self.snapshots_taken += 1;
        Ok(path)
    }
}
