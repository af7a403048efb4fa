//! Rendering and interaction settings.

use glam::Vec3;
use renderer::{Attenuation, Light, LightBase};
use serde::{Deserialize, Serialize};

/// Immutable render/interaction settings. Every field has a named default so a config
/// file only needs to mention what it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default = "default_material_shine")]
    pub material_shine: f32,
    /// Draw the terrain as lines instead of filled triangles.
    #[serde(default)]
    pub wireframe: bool,
    /// Impulse magnitude for thrown boxes.
    #[serde(default = "default_throw_force")]
    pub throw_force: f32,
    #[serde(default = "default_throw_mass")]
    pub throw_mass: f32,
    #[serde(default = "default_sun")]
    pub sun: Light,
    /// Template for the point lights scattered over the terrain.
    #[serde(default = "default_point_light")]
    pub point_light: Light,
    /// Spot light attached to the camera.
    #[serde(default = "default_spot_light")]
    pub spot_light: Light,
    #[serde(default = "default_point_light_count")]
    pub point_light_count: usize,
}

fn default_material_shine() -> f32 {
    32.0
}
fn default_throw_force() -> f32 {
    // Applied as one impulse rather than a per-step force.
    4000.0 / 60.0
}
fn default_throw_mass() -> f32 {
    1.0
}
fn default_sun() -> Light {
    Light::directional(
        LightBase {
            ambient_intensity: 0.2,
            diffuse_intensity: 0.6,
            specular_intensity: 0.0,
            ..Default::default()
        },
        Vec3::new(0.8, -0.2, 0.1),
    )
}
fn default_point_light() -> Light {
    Light::point(
        LightBase {
            ambient_intensity: 0.3,
            diffuse_intensity: 1.0,
            specular_intensity: 1.0,
            ..Default::default()
        },
        Vec3::ZERO,
        Attenuation {
            constant: 1.0,
            linear: 0.045,
            exponent: 0.0075,
        },
    )
}
fn default_spot_light() -> Light {
    Light::spot(
        LightBase {
            ambient_intensity: 0.012,
            diffuse_intensity: 0.35,
            specular_intensity: 1.0,
            ..Default::default()
        },
        Vec3::ZERO,
        Vec3::X,
        Attenuation {
            constant: 0.2,
            linear: 0.016,
            exponent: 0.003,
        },
        50.0,
    )
}
fn default_point_light_count() -> usize {
    2
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            material_shine: default_material_shine(),
            wireframe: false,
            throw_force: default_throw_force(),
            throw_mass: default_throw_mass(),
            sun: default_sun(),
            point_light: default_point_light(),
            spot_light: default_spot_light(),
            point_light_count: default_point_light_count(),
        }
    }
}

impl RenderSettings {
    /// The frame's light list: sun, camera spot light, then point lights at `point_positions`.
    pub fn lights(&self, camera_position: Vec3, camera_forward: Vec3, point_positions: &[Vec3]) -> Vec<Light> {
        let mut lights = vec![self.sun];

        let mut spot = self.spot_light;
        if let renderer::LightKind::Spot {
            position,
            direction,
            ..
        } = &mut spot.kind
        {
            *position = camera_position;
            *direction = camera_forward;
        }
        lights.push(spot);

        for &p in point_positions {
            let mut light = self.point_light;
            if let renderer::LightKind::Point { position, .. } = &mut light.kind {
                *position = p;
            }
            lights.push(light);
        }
        lights
    }
}
