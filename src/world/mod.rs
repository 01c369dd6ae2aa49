//! World stand-ins that feed the renderer
//!
//! - Height-grid terrain with water and material bands
//! - Static boxes for physics objects
//! - A walking character with a model matrix
//! - Weather state

mod character;
mod objects;
mod terrain;
mod weather;

pub use character::*;
pub use objects::*;
pub use terrain::*;
pub use weather::*;
