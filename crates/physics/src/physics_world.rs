//! Physics world management with Rapier3D.

use crate::collision::CollisionGroup;
use crate::triangle_soup::{StaticMeshCollider, TriangleSoup};
use engine_core::{Transform, Vec3};
use rapier3d::prelude::*;

/// Gravity along -Y in m/s².
pub const GRAVITY: f32 = -10.0;

fn groups((membership, filter): (Group, Group)) -> InteractionGroups {
    InteractionGroups::new(membership, filter)
}

/// Main physics world containing all simulation state.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Create a new physics world stepping at 60 Hz.
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity: vector![0.0, GRAVITY, 0.0],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Set the length of one simulation step.
    pub fn set_timestep(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
    }

    /// Step the physics simulation by one timestep. Also refreshes the query pipeline.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Update query pipeline for raycasting outside of `step`.
    pub fn update_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Add a dynamic box with a cuboid collider. Returns the body handle.
    pub fn add_dynamic_box(
        &mut self,
        position: Vec3,
        half_extents: Vec3,
        mass: f32,
        friction: f32,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y, position.z])
            .build();
        let handle = self.rigid_body_set.insert(body);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .mass(mass)
            .friction(friction)
            .collision_groups(groups(CollisionGroup::debris()))
            .build();
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        handle
    }

    /// Add an upright capsule for a character. Rotation is locked so it never tips over.
    pub fn add_player_capsule(
        &mut self,
        position: Vec3,
        half_height: f32,
        radius: f32,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y, position.z])
            .lock_rotations()
            .build();
        let handle = self.rigid_body_set.insert(body);
        let collider = ColliderBuilder::capsule_y(half_height, radius)
            .collision_groups(groups(CollisionGroup::player()))
            .build();
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        handle
    }

    /// Attach `soup` to a new fixed body at `position` as a trimesh collider.
    ///
    /// # Panics
    /// If `soup` is empty.
    pub fn add_static_mesh(
        &mut self,
        soup: TriangleSoup,
        position: Vec3,
        friction: f32,
    ) -> StaticMeshCollider {
        let shape = soup.to_shape();
        let body = RigidBodyBuilder::fixed()
            .translation(vector![position.x, position.y, position.z])
            .build();
        let body = self.rigid_body_set.insert(body);
        let collider = ColliderBuilder::new(shape)
            .friction(friction)
            .collision_groups(groups(CollisionGroup::environment()))
            .build();
        let collider = self
            .collider_set
            .insert_with_parent(collider, body, &mut self.rigid_body_set);
        log::debug!(
            "Added static mesh collider with {} triangles",
            soup.triangle_count()
        );
        StaticMeshCollider {
            soup,
            body,
            collider,
        }
    }

    /// Remove a static mesh's body and collider, handing back its soup.
    pub fn remove_static_mesh(&mut self, mesh: StaticMeshCollider) -> TriangleSoup {
        self.remove_body(mesh.body);
        mesh.soup
    }

    /// Get the transform of a rigid body.
    pub fn get_body_transform(&self, handle: RigidBodyHandle) -> Option<Transform> {
        self.rigid_body_set.get(handle).map(|body| {
            let pos = body.translation();
            let rot = body.rotation();
            Transform {
                position: Vec3::new(pos.x, pos.y, pos.z),
                rotation: glam::Quat::from_xyzw(rot.i, rot.j, rot.k, rot.w),
                scale: Vec3::ONE,
            }
        })
    }

    /// Apply an impulse to a dynamic body.
    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.apply_impulse(vector![impulse.x, impulse.y, impulse.z], true);
        }
    }

    /// Remove a rigid body and its colliders.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
    }

    /// Remove every dynamic body whose centre has fallen below `min_y`.
    pub fn remove_fallen_bodies(&mut self, min_y: f32) -> Vec<RigidBodyHandle> {
        let fallen: Vec<RigidBodyHandle> = self
            .rigid_body_set
            .iter()
            .filter(|(_, body)| body.is_dynamic() && body.translation().y < min_y)
            .map(|(handle, _)| handle)
            .collect();
        for &handle in &fallen {
            self.remove_body(handle);
        }
        fallen
    }

    /// Wake every dynamic body, e.g. after the static geometry under them changed.
    pub fn wake_all(&mut self) {
        for (_, body) in self.rigid_body_set.iter_mut() {
            if body.is_dynamic() {
                body.wake_up(true);
            }
        }
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::mesh::{BasicVertex, MeshData};

    /// 2x2-cell flat floor at height `y`, spanning [0, 20] in x and z.
    fn floor(y: f32) -> MeshData {
        let n = [0.0, 1.0, 0.0];
        let mut mesh = MeshData::new();
        for z in 0..3 {
            for x in 0..3 {
                let (fx, fz) = (x as f32 * 10.0, z as f32 * 10.0);
                mesh.vertices.push(BasicVertex::new([fx, y, fz], [fx, fz], n));
            }
        }
        for z in 0..2u32 {
            for x in 0..2u32 {
                let tl = z * 3 + x;
                let bl = tl + 3;
                mesh.indices.extend_from_slice(&[tl, bl, tl + 1, tl + 1, bl, bl + 1]);
            }
        }
        mesh
    }

    fn settle(world: &mut PhysicsWorld, steps: usize) {
        for _ in 0..steps {
            world.step();
        }
    }

    #[test]
    fn box_comes_to_rest_on_static_mesh() {
        let mut world = PhysicsWorld::new();
        world.add_static_mesh(TriangleSoup::from_mesh(&floor(3.0)), Vec3::ZERO, 1.25);
        let cube = world.add_dynamic_box(Vec3::new(10.0, 8.0, 10.0), Vec3::splat(0.5), 1.0, 0.9);

        settle(&mut world, 240);
        let y = world.get_body_transform(cube).unwrap().position.y;
        assert!((y - 3.5).abs() < 0.1, "box rests at {y}");
    }

    #[test]
    fn removing_static_mesh_lets_bodies_fall() {
        let mut world = PhysicsWorld::new();
        let ground = world.add_static_mesh(TriangleSoup::from_mesh(&floor(0.0)), Vec3::ZERO, 1.0);
        let cube = world.add_dynamic_box(Vec3::new(10.0, 2.0, 10.0), Vec3::splat(0.5), 1.0, 0.9);
        settle(&mut world, 120);

        let soup = world.remove_static_mesh(ground);
        assert_eq!(soup.triangle_count(), 8);
        world.apply_impulse(cube, Vec3::new(0.0, -1.0, 0.0));
        settle(&mut world, 120);
        assert!(world.get_body_transform(cube).unwrap().position.y < -5.0);

        let removed = world.remove_fallen_bodies(-5.0);
        assert_eq!(removed, vec![cube]);
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn capsule_stays_upright() {
        let mut world = PhysicsWorld::new();
        world.add_static_mesh(TriangleSoup::from_mesh(&floor(0.0)), Vec3::ZERO, 1.0);
        let player = world.add_player_capsule(Vec3::new(5.0, 3.0, 5.0), 0.9, 0.4);
        world.apply_impulse(player, Vec3::new(2.0, 0.0, 0.0));
        settle(&mut world, 180);

        let t = world.get_body_transform(player).unwrap();
        assert!(t.rotation.angle_between(glam::Quat::IDENTITY) < 1e-3);
        assert!((t.position.y - 1.3).abs() < 0.1);
    }
}
