//! Common ECS components used by the sandbox world.

/// Tag for dynamic boxes dropped onto the terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsBox {
    pub half_extents: glam::Vec3,
}

/// Tag component for the player capsule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Player {
    pub half_height: f32,
    pub radius: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            half_height: 0.9,
            radius: 0.4,
        }
    }
}

/// Tag for static, non-terrain collision meshes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProp;

/// Flat water surface that follows the terrain's base-height normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaterPlane;

/// Mesh reference component - links entity to a mesh for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshInstance {
    pub mesh_id: u32,
    pub material_id: u32,
}

impl MeshInstance {
    pub fn new(mesh_id: u32, material_id: u32) -> Self {
        Self { mesh_id, material_id }
    }
}
