//! Terrain lifecycle: generation, base-height normalization, mesh upload and collider.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use engine_core::mesh::MeshData;
use glam::Vec3;
use physics::{PhysicsWorld, StaticMeshCollider, TriangleSoup};
use procgen::{generate_terrain_mesh, update_terrain_mesh, HeightMap, TerrainGenerationOptions};
use renderer::{Mesh, MeshSink, UploadKind};

use crate::config::CollisionPolicy;

/// Friction of the terrain collider.
pub const TERRAIN_FRICTION: f32 = 1.25;

/// Start height for downward ground probes.
const PROBE_HEIGHT: f32 = 1.0e4;

/// Outcome of one successful regeneration.
#[derive(Debug, Clone, Copy)]
pub struct RegenerationReport {
    pub upload: UploadKind,
    /// Amount added to every sample by base-height normalization.
    pub base_shift: f32,
    pub collider_rebuilt: bool,
    pub duration: Duration,
}

/// Owns the height grid, its render mesh and (once attached) its collider, and keeps the
/// three consistent according to the configured [`CollisionPolicy`].
pub struct TerrainSystem<S: MeshSink> {
    heightmap: HeightMap,
    options: TerrainGenerationOptions,
    mesh: Mesh<S>,
    collider: Option<StaticMeshCollider>,
    policy: CollisionPolicy,
    base_shift: f32,
}

impl<S: MeshSink> TerrainSystem<S> {
    /// Generate a `size × size` terrain and upload its mesh to `sink`.
    pub fn generate(
        size: usize,
        options: TerrainGenerationOptions,
        sink: S,
        policy: CollisionPolicy,
    ) -> Result<Self> {
        let mut heightmap = HeightMap::new(size)?;
        heightmap
            .generate_terrain(&options)
            .context("initial terrain generation failed")?;
        Ok(Self::from_heightmap(heightmap, options, sink, policy))
    }

    /// Wrap an existing height grid (procedural or loaded from a file).
    pub fn from_heightmap(
        mut heightmap: HeightMap,
        options: TerrainGenerationOptions,
        sink: S,
        policy: CollisionPolicy,
    ) -> Self {
        let base_shift = heightmap.set_base_height();
        let mesh = Mesh::buffered(generate_terrain_mesh(&heightmap), sink);
        log::info!(
            "Terrain {}x{} ready, heights [{:.1}, {:.1}], {} triangles",
            heightmap.size(),
            heightmap.size(),
            heightmap.min_height(),
            heightmap.max_height(),
            mesh.data().triangle_count()
        );
        Self {
            heightmap,
            options,
            mesh,
            collider: None,
            policy,
            base_shift,
        }
    }

    /// Build the terrain collider from the current mesh, replacing any previous one.
    pub fn attach_collider(&mut self, physics: &mut PhysicsWorld) {
        if let Some(old) = self.collider.take() {
            physics.remove_static_mesh(old);
        }
        let soup = TriangleSoup::from_mesh(self.mesh.data());
        self.collider = Some(physics.add_static_mesh(soup, Vec3::ZERO, TERRAIN_FRICTION));
    }

    /// Regenerate from `options`: generation, base height, mesh rebuild and GPU update, in
    /// that order, followed by the collision policy.
    ///
    /// Invalid options are rejected before anything changes, leaving the height grid, mesh,
    /// GPU buffers and collider as they were.
    pub fn regenerate(
        &mut self,
        options: &TerrainGenerationOptions,
        physics: &mut PhysicsWorld,
    ) -> Result<RegenerationReport> {
        let start = Instant::now();

        self.heightmap
            .generate_terrain(options)
            .context("terrain regeneration rejected")?;
        self.options = options.clone();
        self.base_shift = self.heightmap.set_base_height();

        let in_place = update_terrain_mesh(self.mesh.data_mut(), &self.heightmap);
        let upload = self.mesh.update();
        if !in_place {
            log::info!("Terrain topology changed, mesh rebuilt");
        }

        let collider_rebuilt = match (self.policy, self.collider.is_some()) {
            (CollisionPolicy::RebuildOnChange, true) => {
                self.attach_collider(physics);
                physics.wake_all();
                log::info!("Terrain collider rebuilt");
                true
            }
            (CollisionPolicy::StaticOnce, true) => {
                physics.update_query_pipeline();
                let centre = self.centre();
                let drift = physics
                    .ground_height(centre.x, centre.z, PROBE_HEIGHT)
                    .map(|y| y - centre.y);
                log::info!(
                    "Terrain collider kept from startup; physics surface off by {:?} at the centre",
                    drift
                );
                false
            }
            (_, false) => false,
        };

        let report = RegenerationReport {
            upload,
            base_shift: self.base_shift,
            collider_rebuilt,
            duration: start.elapsed(),
        };
        log::debug!(
            "Regenerated {}x{} terrain in {:.2?} via {:?}, heights [{:.1}, {:.1}]",
            self.heightmap.size(),
            self.heightmap.size(),
            report.duration,
            report.upload,
            self.heightmap.min_height(),
            self.heightmap.max_height()
        );
        Ok(report)
    }

    pub fn heightmap(&self) -> &HeightMap {
        &self.heightmap
    }

    pub fn options(&self) -> &TerrainGenerationOptions {
        &self.options
    }

    pub fn mesh(&self) -> &Mesh<S> {
        &self.mesh
    }

    pub fn mesh_data(&self) -> &MeshData {
        self.mesh.data()
    }

    pub fn collider(&self) -> Option<&StaticMeshCollider> {
        self.collider.as_ref()
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// World height of the water surface: the configured level moved by the same shift
    /// base-height normalization applied to the terrain.
    pub fn water_height(&self) -> f32 {
        self.options.water_level + self.base_shift
    }

    /// Terrain height under a world position, interpolated on the rendered triangles.
    pub fn ground_height(&self, x: f32, z: f32) -> f32 {
        self.heightmap.sample_height(x, z)
    }

    /// World-space centre of the grid at ground level.
    pub fn centre(&self) -> Vec3 {
        let c = (self.heightmap.size() - 1) as f32 * 0.5;
        Vec3::new(c, self.ground_height(c, c), c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::MemorySink;

    fn options(seed: u64) -> TerrainGenerationOptions {
        TerrainGenerationOptions {
            seed,
            octaves: 4,
            frequency: 0.05,
            amplitude: 20.0,
            ..Default::default()
        }
    }

    fn system(policy: CollisionPolicy) -> (TerrainSystem<MemorySink>, PhysicsWorld) {
        let mut physics = PhysicsWorld::new();
        let mut terrain =
            TerrainSystem::generate(16, options(1), MemorySink::new(), policy).unwrap();
        terrain.attach_collider(&mut physics);
        (terrain, physics)
    }

    #[test]
    fn regeneration_updates_in_place_and_rebuilds_collider() {
        let (mut terrain, mut physics) = system(CollisionPolicy::RebuildOnChange);
        let first_collider = terrain.collider().unwrap().collider();

        let report = terrain.regenerate(&options(2), &mut physics).unwrap();
        assert_eq!(report.upload, UploadKind::InPlace);
        assert!(report.collider_rebuilt);
        assert_ne!(terrain.collider().unwrap().collider(), first_collider);
        assert_eq!(terrain.mesh().sink().allocations(), 1);

        // GPU-visible data matches a fresh build of the regenerated grid.
        let fresh = generate_terrain_mesh(terrain.heightmap());
        assert_eq!(terrain.mesh().sink().vertices(), &fresh.vertices[..]);
        assert!(terrain.heightmap().min_height().abs() < 1e-4);

        // The collider soup follows the new mesh.
        let soup = terrain.collider().unwrap().soup();
        assert_eq!(soup.triangle_count(), fresh.triangle_count());
        let [a, _, _] = soup.triangle(0);
        assert_eq!(a.to_array(), fresh.vertices[fresh.indices[0] as usize].position);

        physics.update_query_pipeline();
        let c = terrain.centre();
        let ground = physics.ground_height(c.x, c.z, PROBE_HEIGHT).unwrap();
        assert!((ground - c.y).abs() < 1e-3, "collider at {}, terrain at {}", ground, c.y);
    }

    #[test]
    fn static_once_keeps_startup_collider() {
        let (mut terrain, mut physics) = system(CollisionPolicy::StaticOnce);
        let startup = terrain.collider().unwrap().soup().triangle(0);
        let startup_centre = terrain.centre();

        let report = terrain.regenerate(&options(9), &mut physics).unwrap();
        assert!(!report.collider_rebuilt);
        assert_eq!(terrain.collider().unwrap().soup().triangle(0), startup);

        // Physics still sees the startup surface.
        let ground = physics
            .ground_height(startup_centre.x, startup_centre.z, PROBE_HEIGHT)
            .unwrap();
        assert!((ground - startup_centre.y).abs() < 1e-3);
    }

    #[test]
    fn rejected_regeneration_changes_nothing() {
        let (mut terrain, mut physics) = system(CollisionPolicy::RebuildOnChange);
        let heights = terrain.heightmap().heights().to_vec();
        let uploaded = terrain.mesh().sink().vertex_bytes().to_vec();
        let collider = terrain.collider().unwrap().collider();
        let water = terrain.water_height();

        let bad = TerrainGenerationOptions {
            frequency: f64::NAN,
            ..options(3)
        };
        assert!(terrain.regenerate(&bad, &mut physics).is_err());

        assert_eq!(terrain.heightmap().heights(), &heights[..]);
        assert_eq!(terrain.mesh().sink().vertex_bytes(), &uploaded[..]);
        assert_eq!(terrain.mesh().sink().writes(), 0);
        assert_eq!(terrain.collider().unwrap().collider(), collider);
        assert_eq!(terrain.water_height(), water);
    }

    #[test]
    fn water_tracks_base_shift() {
        let heights = vec![-5.0, 0.0, 0.0, 10.0];
        let map = HeightMap::from_heights(2, heights).unwrap();
        let opts = TerrainGenerationOptions {
            water_level: 1.0,
            ..Default::default()
        };
        let terrain =
            TerrainSystem::from_heightmap(map, opts, MemorySink::new(), CollisionPolicy::default());
        assert_eq!(terrain.water_height(), 6.0);
        assert_eq!(terrain.heightmap().max_height(), 15.0);
    }
}
