//! Mesh upload and offscreen rendering on wgpu.

pub mod camera;
pub mod context;
pub mod error;
pub mod gpu_mesh;
pub mod light;
pub mod mesh;
pub mod pipeline;
pub mod scene;
pub mod sink;
pub mod vertex;

pub use camera::*;
pub use context::*;
pub use error::*;
pub use gpu_mesh::*;
pub use light::*;
pub use mesh::*;
pub use pipeline::*;
pub use scene::*;
pub use sink::*;
pub use vertex::*;
