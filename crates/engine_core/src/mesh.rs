//! CPU-side mesh arrays.
//!
//! `MeshData` is owned by whoever generated it (usually the frame loop). GPU sinks and
//! collision adapters only ever borrow it and keep derived copies.

use bytemuck::{Pod, Zeroable};

/// Vertex with position, texture coordinate and normal, in that memory order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct BasicVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl BasicVertex {
    pub fn new(position: [f32; 3], tex_coords: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            position,
            tex_coords,
            normal,
        }
    }
}

/// Indexed triangle mesh before GPU upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<BasicVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize, indices: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            indices: Vec::with_capacity(indices),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Raw vertex bytes in the layout expected by vertex buffers.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Iterate triangles as three vertex positions each. Trailing indices that do not
    /// form a full triangle are ignored.
    pub fn triangles(&self) -> impl Iterator<Item = [[f32; 3]; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |tri| {
            [
                self.vertices[tri[0] as usize].position,
                self.vertices[tri[1] as usize].position,
                self.vertices[tri[2] as usize].position,
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<BasicVertex>(), 8 * 4);
    }

    #[test]
    fn triangles_follow_indices() {
        let mesh = MeshData {
            vertices: vec![
                BasicVertex::new([0.0, 0.0, 0.0], [0.0, 0.0], [0.0, 1.0, 0.0]),
                BasicVertex::new([1.0, 0.0, 0.0], [1.0, 0.0], [0.0, 1.0, 0.0]),
                BasicVertex::new([0.0, 0.0, 1.0], [0.0, 1.0], [0.0, 1.0, 0.0]),
            ],
            indices: vec![0, 2, 1],
        };
        let tris: Vec<_> = mesh.triangles().collect();
        assert_eq!(tris.len(), 1);
        assert_eq!(tris[0][1], [0.0, 0.0, 1.0]);
        assert_eq!(mesh.vertex_bytes().len(), 3 * 32);
    }
}
