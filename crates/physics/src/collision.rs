//! Collision groups and filtering.

use rapier3d::prelude::*;

/// Collision groups for different body types.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionGroup {
    /// Static environment (terrain, static meshes)
    Environment = 1 << 0,
    /// Player character
    Player = 1 << 1,
    /// Boxes and other loose physics objects
    Debris = 1 << 2,
}

impl CollisionGroup {
    fn bits(groups: &[CollisionGroup]) -> Group {
        Group::from_bits_retain(groups.iter().fold(0, |acc, g| acc | *g as u32))
    }

    /// Environment collides with everything.
    pub fn environment() -> (Group, Group) {
        (Self::bits(&[Self::Environment]), Group::ALL)
    }

    pub fn player() -> (Group, Group) {
        (
            Self::bits(&[Self::Player]),
            Self::bits(&[Self::Environment, Self::Debris]),
        )
    }

    pub fn debris() -> (Group, Group) {
        (
            Self::bits(&[Self::Debris]),
            Self::bits(&[Self::Environment, Self::Player, Self::Debris]),
        )
    }

    /// Query filter that only reports environment colliders.
    pub fn environment_only() -> QueryFilter<'static> {
        QueryFilter::default().groups(InteractionGroups::new(
            Group::ALL,
            Self::bits(&[Self::Environment]),
        ))
    }
}
