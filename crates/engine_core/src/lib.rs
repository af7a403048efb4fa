//! Core engine types and utilities for the terrain sandbox.
//!
//! This crate provides the foundational types used across all engine systems:
//! - Transform and spatial components
//! - Frame timing and section profiling
//! - CPU-side mesh arrays shared by the generator, renderer and physics

pub mod components;
pub mod mesh;
pub mod profiler;
pub mod time;
pub mod transform;

pub use components::*;
pub use mesh::*;
pub use profiler::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
pub use hecs::{Entity, World};
