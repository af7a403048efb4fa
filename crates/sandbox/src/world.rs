//! Sandbox entities: physics boxes, the player capsule, a static prop, the water plane and
//! light markers, kept in a hecs world and mirrored from Rapier each frame.

use std::f32::consts::FRAC_PI_2;

use engine_core::mesh::MeshData;
use engine_core::{MeshInstance, PhysicsBox, Player, StaticProp, Transform, WaterPlane};
use glam::{Quat, Vec3};
use hecs::{Entity, World};
use physics::{PhysicsWorld, RigidBodyHandle, StaticMeshCollider, TriangleSoup};
use procgen::{cube_mesh, HeightMap};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use renderer::{InstanceData, MeshSink};

use crate::config::SandboxConfig;
use crate::settings::RenderSettings;
use crate::terrain::{TerrainSystem, TERRAIN_FRICTION};

pub const TERRAIN_MESH: u32 = 0;
pub const BOX_MESH: u32 = 1;
pub const WATER_MESH: u32 = 2;
pub const PROP_MESH: u32 = 3;

pub const MATERIAL_TERRAIN: u32 = 0;
pub const MATERIAL_BOX: u32 = 1;
pub const MATERIAL_PLAYER: u32 = 2;
pub const MATERIAL_WATER: u32 = 3;
pub const MATERIAL_PROP: u32 = 4;
pub const MATERIAL_LIGHT: u32 = 5;

const BOX_HALF_EXTENTS: Vec3 = Vec3::splat(0.5);
const BOX_FRICTION: f32 = 0.9;
const BOX_MASS: f32 = 1.0;
const PROP_SCALE: f32 = 2.0;
const LIGHT_HOVER: f32 = 3.0;
const LIGHT_MARKER_SIZE: f32 = 0.3;

/// Rapier body driving an entity's transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Body(pub RigidBodyHandle);

/// Instance colour for a material id.
pub fn material_color(material: u32) -> [f32; 4] {
    match material {
        MATERIAL_TERRAIN => [0.45, 0.6, 0.35, 1.0],
        MATERIAL_BOX => [0.8, 0.5, 0.3, 1.0],
        MATERIAL_PLAYER => [0.3, 0.5, 0.9, 1.0],
        MATERIAL_WATER => [0.2, 0.4, 0.8, 0.6],
        MATERIAL_PROP => [0.6, 0.6, 0.6, 1.0],
        MATERIAL_LIGHT => [1.0, 1.0, 0.9, 1.0],
        _ => [1.0, 0.0, 1.0, 1.0],
    }
}

/// Unit cube centred on the origin, drawn for every physics box.
pub fn box_mesh() -> MeshData {
    let mut mesh = cube_mesh(Vec3::ONE, false);
    for v in &mut mesh.vertices {
        for c in &mut v.position {
            *c -= 0.5;
        }
    }
    mesh
}

pub struct SandboxWorld {
    pub ecs: World,
    pub physics: PhysicsWorld,
    props: Vec<StaticMeshCollider>,
    light_positions: Vec<Vec3>,
    rng: StdRng,
}

impl SandboxWorld {
    pub fn new(seed: u64) -> Self {
        Self {
            ecs: World::new(),
            physics: PhysicsWorld::new(),
            props: Vec::new(),
            light_positions: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Fill the world around `terrain`: the box tower over the centre, scattered boxes,
    /// the player, the prop, the water plane and the point-light markers.
    pub fn populate<S: MeshSink>(&mut self, terrain: &TerrainSystem<S>, config: &SandboxConfig) {
        let map = terrain.heightmap();
        let centre = terrain.centre();

        self.spawn_tower(map, centre, config.stack_height);
        self.scatter_boxes(map, config.scattered_boxes);
        self.spawn_player(map, centre + Vec3::new(5.0, 0.0, 5.0));
        self.spawn_prop(map, centre + Vec3::new(-6.0, 0.0, -6.0));
        self.spawn_water(map.size(), terrain.water_height());
        self.place_lights(map, config.render.point_light_count);

        log::info!(
            "Populated world: {} entities, {} bodies",
            self.ecs.len(),
            self.physics.body_count()
        );
    }

    pub fn spawn_box(&mut self, position: Vec3, half_extents: Vec3, mass: f32) -> Entity {
        let handle = self
            .physics
            .add_dynamic_box(position, half_extents, mass, BOX_FRICTION);
        self.ecs.spawn((
            Transform::from_position_scale(position, half_extents * 2.0),
            PhysicsBox { half_extents },
            MeshInstance::new(BOX_MESH, MATERIAL_BOX),
            Body(handle),
        ))
    }

    /// Hollow tower: each level is the eight-box ring around a 3×3 footprint, dropped just
    /// above the highest ground under it.
    pub fn spawn_tower(&mut self, map: &HeightMap, centre: Vec3, levels: usize) -> usize {
        let size = BOX_HALF_EXTENTS * 2.0;
        let ring: Vec<Vec3> = (-1..=1)
            .flat_map(|i| (-1..=1).map(move |j| (i, j)))
            .filter(|&(i, j)| i != 0 || j != 0)
            .map(|(i, j)| Vec3::new(centre.x + i as f32 * size.x, 0.0, centre.z + j as f32 * size.z))
            .collect();
        let ground = ring
            .iter()
            .map(|p| map.sample_height(p.x, p.z))
            .fold(f32::MIN, f32::max);

        let mut spawned = 0;
        for level in 0..levels {
            let y = ground + 0.05 + BOX_HALF_EXTENTS.y + level as f32 * size.y;
            for p in &ring {
                self.spawn_box(Vec3::new(p.x, y, p.z), BOX_HALF_EXTENTS, BOX_MASS);
                spawned += 1;
            }
        }
        spawned
    }

    pub fn scatter_boxes(&mut self, map: &HeightMap, count: usize) {
        let max = (map.size() - 1) as f32;
        for _ in 0..count {
            let x = self.rng.gen_range(0.0..=max);
            let z = self.rng.gen_range(0.0..=max);
            let y = map.sample_height(x, z) + 5.0;
            self.spawn_box(Vec3::new(x, y, z), BOX_HALF_EXTENTS, BOX_MASS);
        }
    }

    /// Player capsule standing on the ground at `at`'s XZ.
    pub fn spawn_player(&mut self, map: &HeightMap, at: Vec3) -> Entity {
        let player = Player::default();
        let (x, z) = clamp_to_map(map, at);
        let y = map.sample_height(x, z) + player.half_height + player.radius + 0.05;
        let position = Vec3::new(x, y, z);
        let handle = self
            .physics
            .add_player_capsule(position, player.half_height, player.radius);
        let scale = Vec3::new(
            player.radius * 2.0,
            (player.half_height + player.radius) * 2.0,
            player.radius * 2.0,
        );
        self.ecs.spawn((
            Transform::from_position_scale(position, scale),
            player,
            MeshInstance::new(BOX_MESH, MATERIAL_PLAYER),
            Body(handle),
        ))
    }

    /// Static cube prop resting on the ground, collided as a scaled triangle soup.
    pub fn spawn_prop(&mut self, map: &HeightMap, at: Vec3) -> Entity {
        let (x, z) = clamp_to_map(map, at);
        let position = Vec3::new(x, map.sample_height(x, z), z);
        let soup = TriangleSoup::from_mesh_scaled(&cube_mesh(Vec3::ONE, true), Vec3::splat(PROP_SCALE));
        let collider = self.physics.add_static_mesh(soup, position, TERRAIN_FRICTION);
        self.props.push(collider);
        self.ecs.spawn((
            Transform::from_position_scale(position, Vec3::splat(PROP_SCALE)),
            StaticProp,
            MeshInstance::new(PROP_MESH, MATERIAL_PROP),
        ))
    }

    /// Horizontal water quad covering the whole grid at `height`.
    pub fn spawn_water(&mut self, size: usize, height: f32) -> Entity {
        let extent = (size - 1) as f32;
        let transform = Transform {
            position: Vec3::new(0.0, height, extent),
            rotation: Quat::from_rotation_x(-FRAC_PI_2),
            scale: Vec3::new(extent, extent, 1.0),
        };
        self.ecs
            .spawn((transform, WaterPlane, MeshInstance::new(WATER_MESH, MATERIAL_WATER)))
    }

    pub fn set_water_height(&mut self, height: f32) {
        for (_, (transform, _)) in self.ecs.query_mut::<(&mut Transform, &WaterPlane)>() {
            transform.position.y = height;
        }
    }

    pub fn place_lights(&mut self, map: &HeightMap, count: usize) {
        let max = (map.size() - 1) as f32;
        for _ in 0..count {
            let x = self.rng.gen_range(0.0..=max);
            let z = self.rng.gen_range(0.0..=max);
            let position = Vec3::new(x, map.sample_height(x, z) + LIGHT_HOVER, z);
            self.light_positions.push(position);
            self.ecs.spawn((
                Transform::from_position_scale(position, Vec3::splat(LIGHT_MARKER_SIZE)),
                MeshInstance::new(BOX_MESH, MATERIAL_LIGHT),
            ));
        }
    }

    pub fn light_positions(&self) -> &[Vec3] {
        &self.light_positions
    }

    /// Launch a box from `origin` along `direction`.
    pub fn throw_box(&mut self, origin: Vec3, direction: Vec3, settings: &RenderSettings) -> Entity {
        let direction = direction.normalize_or_zero();
        let start = origin + direction * 2.0;
        let entity = self.spawn_box(start, BOX_HALF_EXTENTS, settings.throw_mass);
        if let Ok(body) = self.ecs.get::<&Body>(entity) {
            self.physics
                .apply_impulse(body.0, direction * settings.throw_force * settings.throw_mass);
        }
        log::debug!("Threw box from {:?} towards {:?}", start, direction);
        entity
    }

    /// Step physics and copy body poses into entity transforms.
    pub fn step(&mut self) {
        self.physics.step();
        self.sync_transforms();
    }

    pub fn sync_transforms(&mut self) {
        for (_, (body, transform)) in self.ecs.query_mut::<(&Body, &mut Transform)>() {
            if let Some(pose) = self.physics.get_body_transform(body.0) {
                transform.position = pose.position;
                transform.rotation = pose.rotation;
            }
        }
    }

    /// Remove bodies that fell below `min_y` along with their entities.
    pub fn despawn_fallen(&mut self, min_y: f32) -> usize {
        let fallen = self.physics.remove_fallen_bodies(min_y);
        if fallen.is_empty() {
            return 0;
        }
        let doomed: Vec<Entity> = self
            .ecs
            .query::<&Body>()
            .iter()
            .filter(|(_, body)| fallen.contains(&body.0))
            .map(|(entity, _)| entity)
            .collect();
        for &entity in &doomed {
            let _ = self.ecs.despawn(entity);
        }
        log::debug!("Removed {} fallen bodies", doomed.len());
        doomed.len()
    }

    /// Instance data for every entity drawn with `mesh_id`.
    pub fn instances(&self, mesh_id: u32) -> Vec<InstanceData> {
        self.ecs
            .query::<(&Transform, &MeshInstance)>()
            .iter()
            .filter(|(_, (_, mesh))| mesh.mesh_id == mesh_id)
            .map(|(_, (transform, mesh))| {
                InstanceData::new(transform.to_matrix(), material_color(mesh.material_id))
            })
            .collect()
    }

    pub fn count<C: hecs::Component>(&self) -> usize {
        self.ecs.query::<&C>().iter().count()
    }
}

fn clamp_to_map(map: &HeightMap, at: Vec3) -> (f32, f32) {
    let max = (map.size() - 1) as f32;
    (at.x.clamp(0.0, max), at.z.clamp(0.0, max))
}
