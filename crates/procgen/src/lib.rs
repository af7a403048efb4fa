//! Procedural terrain: noise evaluation, height field shaping and terrain mesh building.

pub mod error;
pub mod heightmap;
mod loader;
pub mod mesh;
pub mod noise_field;
pub mod options;
pub mod shaping;

pub use error::{Result, TerrainError};
pub use heightmap::HeightMap;
pub use mesh::{cube_mesh, generate_terrain_mesh, quad_mesh, update_terrain_mesh};
pub use noise_field::NoiseField;
pub use options::{DetailLayer, FractalMode, NoiseKind, TerrainGenerationOptions};
