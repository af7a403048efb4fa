//! Terrain and primitive mesh construction.
//!
//! The terrain mesh has one vertex per height sample and a topology that depends only on the
//! grid size, so a regeneration at the same size only ever touches vertex data.

use engine_core::mesh::{BasicVertex, MeshData};
use glam::Vec3;

use crate::heightmap::HeightMap;

/// Number of indices a `size × size` grid produces.
pub fn terrain_index_count(size: usize) -> usize {
    let cells = size.saturating_sub(1);
    cells * cells * 6
}

/// Finite-difference normal at grid cell `(x, z)`.
///
/// Neighbours outside the grid read as height 0, so edge normals lean toward the border.
pub fn terrain_normal(map: &HeightMap, x: usize, z: usize) -> [f32; 3] {
    let (x, z) = (x as isize, z as isize);
    let left = map.height_or_zero(x - 1, z);
    let right = map.height_or_zero(x + 1, z);
    let down = map.height_or_zero(x, z - 1);
    let up = map.height_or_zero(x, z + 1);
    Vec3::new(left - right, 2.0, down - up).normalize().to_array()
}

fn terrain_vertex(map: &HeightMap, x: usize, z: usize) -> BasicVertex {
    let (fx, fz) = (x as f32, z as f32);
    BasicVertex::new(
        [fx, map.get_height(x, z), fz],
        [fx, fz],
        terrain_normal(map, x, z),
    )
}

/// Two triangles per cell, `(top_left, bottom_left, top_right)` and
/// `(top_right, bottom_left, bottom_right)`. Counter-clockwise seen from +Y.
fn push_terrain_indices(indices: &mut Vec<u32>, size: usize) {
    let size = size as u32;
    for z in 0..size.saturating_sub(1) {
        for x in 0..size - 1 {
            let top_left = z * size + x;
            let top_right = top_left + 1;
            let bottom_left = (z + 1) * size + x;
            let bottom_right = bottom_left + 1;

            indices.push(top_left);
            indices.push(bottom_left);
            indices.push(top_right);

            indices.push(top_right);
            indices.push(bottom_left);
            indices.push(bottom_right);
        }
    }
}

/// Build the full terrain mesh for `map`.
pub fn generate_terrain_mesh(map: &HeightMap) -> MeshData {
    let size = map.size();
    let mut mesh = MeshData::with_capacity(size * size, terrain_index_count(size));

    for z in 0..size {
        for x in 0..size {
            mesh.vertices.push(terrain_vertex(map, x, z));
        }
    }
    push_terrain_indices(&mut mesh.indices, size);
    mesh
}

/// Refresh `mesh` from `map`.
///
/// When `mesh` already has one vertex per sample only positions and normals are rewritten
/// and the index buffer is left alone. Returns `false` if the mesh had to be rebuilt because
/// the grid size changed.
pub fn update_terrain_mesh(mesh: &mut MeshData, map: &HeightMap) -> bool {
    let size = map.size();
    if mesh.vertices.len() != size * size || mesh.indices.len() != terrain_index_count(size) {
        *mesh = generate_terrain_mesh(map);
        return false;
    }

    for z in 0..size {
        for x in 0..size {
            let vertex = &mut mesh.vertices[z * size + x];
            vertex.position[1] = map.get_height(x, z);
            vertex.normal = terrain_normal(map, x, z);
        }
    }
    true
}

/// Axis-aligned quad in the XY plane facing +Z, spanning `(0, 0)` to `(w, h)`.
pub fn quad_mesh(w: f32, h: f32) -> MeshData {
    let normal = [0.0, 0.0, 1.0];
    MeshData {
        vertices: vec![
            BasicVertex::new([w, h, 0.0], [0.0, 1.0], normal),
            BasicVertex::new([0.0, h, 0.0], [1.0, 1.0], normal),
            BasicVertex::new([0.0, 0.0, 0.0], [1.0, 0.0], normal),
            BasicVertex::new([w, 0.0, 0.0], [0.0, 0.0], normal),
        ],
        indices: vec![0, 1, 2, 2, 3, 0],
    }
}

/// Box spanning the origin to `dimensions`, four vertices per face so each face gets a flat
/// normal. With `repeat_texture` the UVs scale with the face size so a tiling material keeps
/// its texel density.
pub fn cube_mesh(dimensions: Vec3, repeat_texture: bool) -> MeshData {
    let Vec3 { x: w, y: h, z: d } = dimensions;

    // (corners, normal, uv extent) per face, corners wound counter-clockwise from outside.
    let faces: [([[f32; 3]; 4], [f32; 3], [f32; 2]); 6] = [
        ([[w, h, d], [0.0, h, d], [0.0, 0.0, d], [w, 0.0, d]], [0.0, 0.0, 1.0], [w, h]),
        ([[0.0, h, d], [0.0, h, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, d]], [-1.0, 0.0, 0.0], [d, h]),
        ([[0.0, h, 0.0], [w, h, 0.0], [w, 0.0, 0.0], [0.0, 0.0, 0.0]], [0.0, 0.0, -1.0], [w, h]),
        ([[w, h, 0.0], [w, h, d], [w, 0.0, d], [w, 0.0, 0.0]], [1.0, 0.0, 0.0], [d, h]),
        ([[w, h, 0.0], [0.0, h, 0.0], [0.0, h, d], [w, h, d]], [0.0, 1.0, 0.0], [w, d]),
        ([[0.0, 0.0, 0.0], [w, 0.0, 0.0], [w, 0.0, d], [0.0, 0.0, d]], [0.0, -1.0, 0.0], [w, d]),
    ];

    let mut mesh = MeshData::with_capacity(24, 36);
    for (corners, normal, extent) in faces {
        let [su, sv] = if repeat_texture { extent } else { [1.0, 1.0] };
        let uvs = [[su, 0.0], [0.0, 0.0], [0.0, sv], [su, sv]];

        let base = mesh.vertices.len() as u32;
        for (corner, uv) in corners.into_iter().zip(uvs) {
            mesh.vertices.push(BasicVertex::new(corner, uv, normal));
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TerrainGenerationOptions;

    fn face_normal(tri: [[f32; 3]; 3]) -> Vec3 {
        let [a, b, c] = tri.map(Vec3::from);
        (b - a).cross(c - a).normalize()
    }

    #[test]
    fn topology_depends_only_on_size() {
        for size in [2, 4, 9] {
            let mut map = HeightMap::new(size).unwrap();
            map.generate_terrain(&TerrainGenerationOptions {
                octaves: 3,
                ..Default::default()
            })
            .unwrap();
            let mesh = generate_terrain_mesh(&map);
            assert_eq!(mesh.vertex_count(), size * size);
            assert_eq!(mesh.index_count(), (size - 1) * (size - 1) * 6);
            assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
        }
    }

    #[test]
    fn small_grid_scenario() {
        let options = TerrainGenerationOptions {
            octaves: 1,
            amplitude: 10.0,
            seed: 42,
            generate_island: false,
            water_level_damper: false,
            ..Default::default()
        };
        let mut map = HeightMap::new(4).unwrap();
        map.generate_terrain(&options).unwrap();
        let mesh = generate_terrain_mesh(&map);
        assert_eq!(mesh.vertex_count(), 16);
        assert_eq!(mesh.index_count(), 54);

        let v = mesh.vertices[2 * 4 + 3];
        assert_eq!(v.position, [3.0, map.get_height(3, 2), 2.0]);
        assert_eq!(v.tex_coords, [3.0, 2.0]);
    }

    #[test]
    fn flat_interior_normal_points_up() {
        let map = HeightMap::from_heights(3, vec![4.0; 9]).unwrap();
        assert_eq!(terrain_normal(&map, 1, 1), [0.0, 1.0, 0.0]);

        // Edge cells see height 0 past the border.
        let edge = terrain_normal(&map, 0, 1);
        assert!(edge[0] < 0.0);
    }

    #[test]
    fn flat_terrain_faces_up() {
        let map = HeightMap::new(3).unwrap();
        let mesh = generate_terrain_mesh(&map);
        for tri in mesh.triangles() {
            let n = face_normal(tri);
            assert!((n - Vec3::Y).length() < 1e-6, "triangle faces {n}");
        }
    }

    #[test]
    fn update_in_place_matches_fresh_build() {
        let mut map = HeightMap::new(8).unwrap();
        map.generate_terrain(&TerrainGenerationOptions::default()).unwrap();
        let mut mesh = generate_terrain_mesh(&map);

        map.generate_terrain(&TerrainGenerationOptions {
            seed: 99,
            ..Default::default()
        })
        .unwrap();
        assert!(update_terrain_mesh(&mut mesh, &map));
        assert_eq!(mesh, generate_terrain_mesh(&map));
    }

    #[test]
    fn update_rebuilds_on_size_change() {
        let small = HeightMap::new(4).unwrap();
        let large = HeightMap::new(6).unwrap();
        let mut mesh = generate_terrain_mesh(&small);
        assert!(!update_terrain_mesh(&mut mesh, &large));
        assert_eq!(mesh.vertex_count(), 36);
        assert_eq!(mesh.index_count(), terrain_index_count(6));
    }

    #[test]
    fn cube_faces_point_outward() {
        let dims = Vec3::new(2.0, 1.0, 3.0);
        let mesh = cube_mesh(dims, false);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.index_count(), 36);

        let centre = dims * 0.5;
        for tri in mesh.triangles() {
            let n = face_normal(tri);
            let mid = (Vec3::from(tri[0]) + Vec3::from(tri[1]) + Vec3::from(tri[2])) / 3.0;
            assert!(n.dot(mid - centre) > 0.0);
        }
    }

    #[test]
    fn cube_texture_repeat_scales_uvs() {
        let mesh = cube_mesh(Vec3::new(4.0, 2.0, 1.0), true);
        // First face spans w x h.
        assert_eq!(mesh.vertices[3].tex_coords, [4.0, 2.0]);
        let plain = cube_mesh(Vec3::new(4.0, 2.0, 1.0), false);
        assert_eq!(plain.vertices[3].tex_coords, [1.0, 1.0]);
    }

    #[test]
    fn quad_faces_positive_z() {
        let mesh = quad_mesh(2.0, 3.0);
        for tri in mesh.triangles() {
            assert!((face_normal(tri) - Vec3::Z).length() < 1e-6);
        }
    }
}
