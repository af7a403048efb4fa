//! Static triangle-mesh colliders built from render meshes.

use engine_core::mesh::MeshData;
use glam::Vec3;
use rapier3d::prelude::*;

/// Unindexed triangle list: every triangle owns its three corners.
#[derive(Debug, Clone, Default)]
pub struct TriangleSoup {
    vertices: Vec<Point<Real>>,
}

impl TriangleSoup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `mesh.indices` three at a time and copy each triangle's positions.
    pub fn from_mesh(mesh: &MeshData) -> Self {
        Self::from_mesh_scaled(mesh, Vec3::ONE)
    }

    /// As [`TriangleSoup::from_mesh`] with positions multiplied by `scale`.
    pub fn from_mesh_scaled(mesh: &MeshData, scale: Vec3) -> Self {
        let mut soup = Self {
            vertices: Vec::with_capacity(mesh.triangle_count() * 3),
        };
        for [a, b, c] in mesh.triangles() {
            soup.add_triangle(
                Vec3::from(a) * scale,
                Vec3::from(b) * scale,
                Vec3::from(c) * scale,
            );
        }
        soup
    }

    pub fn add_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        self.vertices.push(point![a.x, a.y, a.z]);
        self.vertices.push(point![b.x, b.y, b.z]);
        self.vertices.push(point![c.x, c.y, c.z]);
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Corners of triangle `i`.
    pub fn triangle(&self, i: usize) -> [Vec3; 3] {
        let p = &self.vertices[i * 3..i * 3 + 3];
        [0, 1, 2].map(|k| Vec3::new(p[k].x, p[k].y, p[k].z))
    }

    /// Collider shape over this soup.
    ///
    /// # Panics
    /// If the soup has no triangles.
    pub fn to_shape(&self) -> SharedShape {
        assert!(!self.is_empty(), "triangle soup has no triangles");
        let indices = (0..self.triangle_count() as u32)
            .map(|t| [t * 3, t * 3 + 1, t * 3 + 2])
            .collect();
        SharedShape::trimesh(self.vertices.clone(), indices)
    }
}

/// A fixed rigid body with a trimesh collider, together with the soup it was built from.
///
/// All three live and die together: the world only hands one out from
/// [`crate::PhysicsWorld::add_static_mesh`] and only takes it back through
/// [`crate::PhysicsWorld::remove_static_mesh`].
#[derive(Debug)]
pub struct StaticMeshCollider {
    pub(crate) soup: TriangleSoup,
    pub(crate) body: RigidBodyHandle,
    pub(crate) collider: ColliderHandle,
}

impl StaticMeshCollider {
    pub fn soup(&self) -> &TriangleSoup {
        &self.soup
    }

    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    pub fn collider(&self) -> ColliderHandle {
        self.collider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::mesh::BasicVertex;

    fn quad() -> MeshData {
        let n = [0.0, 1.0, 0.0];
        MeshData {
            vertices: vec![
                BasicVertex::new([0.0, 0.0, 0.0], [0.0, 0.0], n),
                BasicVertex::new([1.0, 0.0, 0.0], [1.0, 0.0], n),
                BasicVertex::new([0.0, 0.0, 1.0], [0.0, 1.0], n),
                BasicVertex::new([1.0, 0.0, 1.0], [1.0, 1.0], n),
            ],
            indices: vec![0, 2, 1, 1, 2, 3],
        }
    }

    #[test]
    fn soup_copies_each_triangle() {
        let soup = TriangleSoup::from_mesh(&quad());
        assert_eq!(soup.triangle_count(), 2);
        assert_eq!(
            soup.triangle(1),
            [Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 1.0)]
        );
    }

    #[test]
    fn scaling_applies_to_positions() {
        let soup = TriangleSoup::from_mesh_scaled(&quad(), Vec3::splat(2.0));
        assert_eq!(
            soup.triangle(0),
            [Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0), Vec3::new(2.0, 0.0, 0.0)]
        );
    }

    #[test]
    #[should_panic(expected = "no triangles")]
    fn empty_soup_has_no_shape() {
        TriangleSoup::new().to_shape();
    }
}
