//! Procedural textures and the registry that owns them

pub mod procedural;
mod registry;

pub use registry::*;
