//! Scene lights and their GPU representation.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Maximum lights packed into [`LightsUniform`].
pub const MAX_LIGHTS: usize = 4;

/// Intensities shared by every light kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightBase {
    pub color: [f32; 3],
    pub ambient_intensity: f32,
    pub diffuse_intensity: f32,
    pub specular_intensity: f32,
}

impl Default for LightBase {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            ambient_intensity: 0.2,
            diffuse_intensity: 0.2,
            specular_intensity: 0.2,
        }
    }
}

/// Distance falloff `1 / (constant + linear * d + exponent * d^2)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub exponent: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.045,
            exponent: 0.0075,
        }
    }
}

impl Attenuation {
    pub fn at(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.exponent * distance * distance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LightKind {
    Directional {
        direction: Vec3,
    },
    Point {
        position: Vec3,
        attenuation: Attenuation,
    },
    Spot {
        position: Vec3,
        direction: Vec3,
        attenuation: Attenuation,
        /// Half-angle of the cone in degrees.
        cutoff_degrees: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub base: LightBase,
    pub kind: LightKind,
}

impl Light {
    pub fn directional(base: LightBase, direction: Vec3) -> Self {
        Self {
            base,
            kind: LightKind::Directional {
                direction: direction.normalize_or_zero(),
            },
        }
    }

    pub fn point(base: LightBase, position: Vec3, attenuation: Attenuation) -> Self {
        Self {
            base,
            kind: LightKind::Point {
                position,
                attenuation,
            },
        }
    }

    pub fn spot(
        base: LightBase,
        position: Vec3,
        direction: Vec3,
        attenuation: Attenuation,
        cutoff_degrees: f32,
    ) -> Self {
        Self {
            base,
            kind: LightKind::Spot {
                position,
                direction: direction.normalize_or_zero(),
                attenuation,
                cutoff_degrees,
            },
        }
    }

    fn to_raw(self) -> LightRaw {
        let b = self.base;
        let mut raw = LightRaw {
            color: [b.color[0], b.color[1], b.color[2], 0.0],
            intensities: [b.ambient_intensity, b.diffuse_intensity, b.specular_intensity, 0.0],
            ..Zeroable::zeroed()
        };
        match self.kind {
            LightKind::Directional { direction } => {
                raw.color[3] = 0.0;
                raw.direction = direction.extend(0.0).to_array();
            }
            LightKind::Point {
                position,
                attenuation,
            } => {
                raw.color[3] = 1.0;
                raw.position = position.extend(1.0).to_array();
                raw.attenuation = [attenuation.constant, attenuation.linear, attenuation.exponent, 0.0];
            }
            LightKind::Spot {
                position,
                direction,
                attenuation,
                cutoff_degrees,
            } => {
                raw.color[3] = 2.0;
                raw.position = position.extend(1.0).to_array();
                raw.direction = direction.extend(0.0).to_array();
                raw.attenuation = [
                    attenuation.constant,
                    attenuation.linear,
                    attenuation.exponent,
                    cutoff_degrees.to_radians().cos(),
                ];
            }
        }
        raw
    }
}

/// One light as laid out in the shader. `color.w` holds the kind (0 directional, 1 point,
/// 2 spot) and `attenuation.w` the spot cone cosine.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightRaw {
    pub color: [f32; 4],
    pub intensities: [f32; 4],
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub attenuation: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightsUniform {
    pub lights: [LightRaw; MAX_LIGHTS],
    /// x = light count, y = material shininess.
    pub params: [f32; 4],
}

impl LightsUniform {
    /// Pack up to [`MAX_LIGHTS`] lights; extras are dropped with a warning.
    pub fn new(lights: &[Light], shininess: f32) -> Self {
        if lights.len() > MAX_LIGHTS {
            log::warn!(
                "{} lights configured, only the first {} are used",
                lights.len(),
                MAX_LIGHTS
            );
        }
        let mut uniform = Self::zeroed();
        let count = lights.len().min(MAX_LIGHTS);
        for (slot, light) in uniform.lights.iter_mut().zip(lights) {
            *slot = light.to_raw();
        }
        uniform.params = [count as f32, shininess, 0.0, 0.0];
        uniform
    }
}
