//! Generation options for the height field.
//!
//! Options are a plain value: the UI (or a config file) edits any field independently and
//! passes the whole struct by reference to [`HeightMap::generate_terrain`]. Validation runs
//! before any sample is written.
//!
//! [`HeightMap::generate_terrain`]: crate::HeightMap::generate_terrain

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

/// Highest octave count accepted by [`TerrainGenerationOptions::validate`].
pub const MAX_OCTAVES: u32 = 16;

/// Underlying coherent noise algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoiseKind {
    #[default]
    OpenSimplex2,
    SuperSimplex,
    Simplex,
    Perlin,
    Value,
    /// Worley / Voronoi cell noise.
    Cellular,
}

/// How octaves are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum FractalMode {
    /// Plain fractal Brownian motion.
    #[default]
    Fbm,
    /// Inverted absolute value per octave, giving sharp crests.
    Ridged,
    /// Folds each octave back and forth; `strength` scales the fold input.
    PingPong { strength: f64 },
}

/// Secondary high-frequency layer added on top of the base noise for surface detail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetailLayer {
    /// Multiplier applied to the base frequency.
    pub frequency_scale: f64,
    /// Fraction of `amplitude` the layer contributes at most.
    pub weight: f32,
}

impl Default for DetailLayer {
    fn default() -> Self {
        Self {
            frequency_scale: 6.0,
            weight: 0.125,
        }
    }
}

/// Configuration for heightmap generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainGenerationOptions {
    /// Noise algorithm sampled by every octave.
    pub noise: NoiseKind,
    /// Octave combination mode.
    pub fractal: FractalMode,
    /// Base noise frequency per grid cell (lower = smoother).
    pub frequency: f64,
    /// Height range covered by the normalized base noise.
    pub amplitude: f32,
    /// Per-octave weight multiplier (persistence / roughness).
    pub amplitude_dampen: f64,
    /// Per-octave frequency multiplier.
    pub lacunarity: f64,
    /// Number of octaves for fractal noise.
    pub octaves: u32,
    /// Height added to every sample after scaling.
    pub offset: f32,
    /// Seed for the noise source.
    pub seed: u64,
    /// Absolute height of the water surface used by the damping pass.
    pub water_level: f32,
    /// Pull heights toward `water_level` to flatten shorelines.
    pub water_level_damper: bool,
    /// Multiply heights by a radial falloff that reaches zero at the grid edges.
    pub generate_island: bool,
    /// Sharpness of the island falloff; higher keeps more of the interior untouched.
    pub island_bump_power: f32,
    /// Optional high-frequency detail layer.
    pub detail: Option<DetailLayer>,
}

impl Default for TerrainGenerationOptions {
    fn default() -> Self {
        Self {
            noise: NoiseKind::OpenSimplex2,
            fractal: FractalMode::Fbm,
            frequency: 0.0025,
            amplitude: 256.0,
            amplitude_dampen: 0.5,
            lacunarity: 2.0,
            octaves: 8,
            offset: -45.0,
            seed: 523523,
            water_level: 20.0,
            water_level_damper: false,
            generate_island: false,
            island_bump_power: 3.0,
            detail: Some(DetailLayer::default()),
        }
    }
}

fn check(ok: bool, field: &'static str, value: f64, reason: &'static str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(TerrainError::InvalidOption {
            field,
            value,
            reason,
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<()> {
    check(value.is_finite() && value > 0.0, field, value, "must be finite and > 0")
}

fn finite(field: &'static str, value: f64) -> Result<()> {
    check(value.is_finite(), field, value, "must be finite")
}

impl TerrainGenerationOptions {
    /// Reject options that would produce NaN or degenerate geometry.
    pub fn validate(&self) -> Result<()> {
        check(
            (1..=MAX_OCTAVES).contains(&self.octaves),
            "octaves",
            self.octaves as f64,
            "must be between 1 and 16",
        )?;
        positive("frequency", self.frequency)?;
        positive("lacunarity", self.lacunarity)?;
        positive("amplitude_dampen", self.amplitude_dampen)?;
        check(
            self.amplitude.is_finite() && self.amplitude >= 0.0,
            "amplitude",
            self.amplitude as f64,
            "must be finite and >= 0",
        )?;
        finite("offset", self.offset as f64)?;
        finite("water_level", self.water_level as f64)?;

        if self.generate_island {
            positive("island_bump_power", self.island_bump_power as f64)?;
        }
        if let FractalMode::PingPong { strength } = self.fractal {
            positive("ping_pong_strength", strength)?;
        }
        if let Some(detail) = &self.detail {
            positive("detail.frequency_scale", detail.frequency_scale)?;
            check(
                detail.weight.is_finite() && detail.weight >= 0.0,
                "detail.weight",
                detail.weight as f64,
                "must be finite and >= 0",
            )?;
        }

        let (floor, ceiling) = (self.height_floor(), self.height_ceiling());
        check(
            floor.is_finite() && ceiling.is_finite() && (ceiling - floor).is_finite(),
            "amplitude",
            self.amplitude as f64,
            "height range overflows with this offset and detail weight",
        )?;
        Ok(())
    }

    /// Lowest height the noise stage can produce before shaping. Both noise layers are
    /// normalized to [0, 1], so this is the offset itself.
    pub fn height_floor(&self) -> f32 {
        self.offset
    }

    /// Highest height the noise stage can produce before shaping.
    pub fn height_ceiling(&self) -> f32 {
        let detail = self.detail.map_or(0.0, |d| d.weight);
        self.offset + self.amplitude * (1.0 + detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(TerrainGenerationOptions::default().validate().is_ok());
    }

    #[test]
    fn zero_octaves_rejected() {
        let options = TerrainGenerationOptions {
            octaves: 0,
            ..Default::default()
        };
        match options.validate() {
            Err(TerrainError::InvalidOption { field, .. }) => assert_eq!(field, "octaves"),
            other => panic!("expected octave rejection, got {:?}", other),
        }
    }

    #[test]
    fn non_finite_amplitude_rejected() {
        let options = TerrainGenerationOptions {
            amplitude: f32::NAN,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn overflowing_height_range_rejected() {
        let options = TerrainGenerationOptions {
            amplitude: f32::MAX,
            offset: f32::MAX,
            ..Default::default()
        };
        match options.validate() {
            Err(TerrainError::InvalidOption { field, .. }) => assert_eq!(field, "amplitude"),
            other => panic!("expected range rejection, got {:?}", other),
        }

        // Each value is finite on its own, but the span from floor to ceiling is not.
        let options = TerrainGenerationOptions {
            amplitude: f32::MAX,
            offset: -f32::MAX * 0.5,
            detail: None,
            ..Default::default()
        };
        assert!(options.height_ceiling().is_finite());
        assert!(options.validate().is_err());
    }

    #[test]
    fn island_power_checked_only_when_enabled() {
        let mut options = TerrainGenerationOptions {
            island_bump_power: 0.0,
            ..Default::default()
        };
        assert!(options.validate().is_ok());
        options.generate_island = true;
        assert!(options.validate().is_err());
    }

    #[test]
    fn partial_ron_uses_defaults() {
        let options: TerrainGenerationOptions =
            ron::from_str("(octaves: 3, noise: Perlin, fractal: PingPong(strength: 2.0))")
                .expect("parse");
        assert_eq!(options.octaves, 3);
        assert_eq!(options.noise, NoiseKind::Perlin);
        assert_eq!(options.fractal, FractalMode::PingPong { strength: 2.0 });
        assert_eq!(options.seed, TerrainGenerationOptions::default().seed);
    }
}
