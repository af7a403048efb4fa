//! Rigid-body physics on Rapier3D, with static trimesh colliders built from render meshes.

pub mod collision;
pub mod physics_world;
pub mod raycast;
pub mod triangle_soup;

pub use collision::*;
pub use physics_world::*;
pub use raycast::*;
pub use triangle_soup::*;

// Re-export Rapier for downstream crates
pub use rapier3d;

pub use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};
