//! Multi-octave coherent noise evaluated per grid cell.
//!
//! **Seed-based determinism:** the noise source is derived only from the option seed, so the
//! same `(x, z, seed, options)` always gives the same height. Evaluation is pure and can run
//! from several threads at once.

use noise::{NoiseFn, OpenSimplex, Perlin, Simplex, SuperSimplex, Value, Worley};

use crate::options::{FractalMode, NoiseKind, TerrainGenerationOptions};

/// Coordinate shift between octaves so they do not all pass through the same lattice point.
const OCTAVE_SHIFT: f64 = 1013.0;

/// Derive a deterministic u32 noise seed from a world seed and an offset.
/// Same (seed, offset) always gives the same result so terrain is reproducible.
#[inline]
pub fn deterministic_noise_seed(seed: u64, offset: u64) -> u32 {
    ((seed.wrapping_add(offset))
        .wrapping_mul(0x9e3779b97f4a7c15_u64)
        .wrapping_add(offset.wrapping_mul(0x6c078965_u64))
        >> 32) as u32
}

#[derive(Clone)]
enum NoiseSource {
    OpenSimplex(OpenSimplex),
    SuperSimplex(SuperSimplex),
    Simplex(Simplex),
    Perlin(Perlin),
    Value(Value),
    Cellular(Worley),
}

impl NoiseSource {
    fn new(kind: NoiseKind, seed: u32) -> Self {
        match kind {
            NoiseKind::OpenSimplex2 => Self::OpenSimplex(OpenSimplex::new(seed)),
            NoiseKind::SuperSimplex => Self::SuperSimplex(SuperSimplex::new(seed)),
            NoiseKind::Simplex => Self::Simplex(Simplex::new(seed)),
            NoiseKind::Perlin => Self::Perlin(Perlin::new(seed)),
            NoiseKind::Value => Self::Value(Value::new(seed)),
            NoiseKind::Cellular => Self::Cellular(Worley::new(seed)),
        }
    }

    /// Raw sample, clamped to [-1, 1].
    #[inline]
    fn get(&self, x: f64, z: f64) -> f64 {
        let point = [x, z];
        let n = match self {
            Self::OpenSimplex(n) => n.get(point),
            Self::SuperSimplex(n) => n.get(point),
            Self::Simplex(n) => n.get(point),
            Self::Perlin(n) => n.get(point),
            Self::Value(n) => n.get(point),
            Self::Cellular(n) => n.get(point),
        };
        n.clamp(-1.0, 1.0)
    }
}

/// Triangle wave folding `t` into [0, 1].
#[inline]
fn ping_pong(t: f64) -> f64 {
    let t = t - (t * 0.5).floor() * 2.0;
    if t < 1.0 {
        t
    } else {
        2.0 - t
    }
}

/// Seeded fractal noise evaluator.
#[derive(Clone)]
pub struct NoiseField {
    kind: NoiseKind,
    seed: u64,
    source: NoiseSource,
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField")
            .field("kind", &self.kind)
            .field("seed", &self.seed)
            .finish()
    }
}

impl NoiseField {
    pub fn new(kind: NoiseKind, seed: u64) -> Self {
        Self {
            kind,
            seed,
            source: NoiseSource::new(kind, deterministic_noise_seed(seed, 0)),
        }
    }

    pub fn for_options(options: &TerrainGenerationOptions) -> Self {
        Self::new(options.noise, options.seed)
    }

    pub fn kind(&self) -> NoiseKind {
        self.kind
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// True if this field already samples the source that `options` asks for.
    pub fn matches(&self, options: &TerrainGenerationOptions) -> bool {
        self.kind == options.noise && self.seed == options.seed
    }

    /// Fractal noise at `(x, z)` normalized to [0, 1].
    pub fn fractal(&self, x: f64, z: f64, frequency: f64, options: &TerrainGenerationOptions) -> f64 {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut max_value = 0.0;
        let mut frequency = frequency;

        for octave in 0..options.octaves {
            let shift = octave as f64 * OCTAVE_SHIFT;
            let n = self.source.get(x * frequency + shift, z * frequency + shift);
            let sample = match options.fractal {
                FractalMode::Fbm => (n + 1.0) * 0.5,
                FractalMode::Ridged => 1.0 - n.abs(),
                FractalMode::PingPong { strength } => ping_pong((n + 1.0) * strength),
            };

            value += sample * amplitude;
            max_value += amplitude;

            amplitude *= options.amplitude_dampen;
            frequency *= options.lacunarity;
        }

        if max_value > 0.0 {
            (value / max_value).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Height contribution at grid cell `(x, z)`: base fractal scaled by amplitude and
    /// shifted by offset, plus the optional detail layer.
    pub fn evaluate(&self, x: f64, z: f64, options: &TerrainGenerationOptions) -> f32 {
        let base = self.fractal(x, z, options.frequency, options) as f32;
        let mut height = base * options.amplitude + options.offset;

        if let Some(detail) = &options.detail {
            let frequency = options.frequency * detail.frequency_scale;
            let fine = self.fractal(x, z, frequency, options) as f32;
            height += fine * options.amplitude * detail.weight;
        }
        height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DetailLayer;

    fn options(noise: NoiseKind, fractal: FractalMode) -> TerrainGenerationOptions {
        TerrainGenerationOptions {
            noise,
            fractal,
            frequency: 0.05,
            octaves: 4,
            amplitude: 10.0,
            offset: -2.0,
            detail: None,
            ..Default::default()
        }
    }

    #[test]
    fn same_seed_same_output() {
        let opts = options(NoiseKind::OpenSimplex2, FractalMode::Fbm);
        let a = NoiseField::for_options(&opts);
        let b = NoiseField::for_options(&opts);
        for &(x, z) in &[(0.0, 0.0), (3.5, 17.25), (250.0, 99.0)] {
            assert_eq!(a.evaluate(x, z, &opts), b.evaluate(x, z, &opts));
        }
    }

    #[test]
    fn different_seed_different_output() {
        let opts = options(NoiseKind::Perlin, FractalMode::Fbm);
        let a = NoiseField::new(NoiseKind::Perlin, 1);
        let b = NoiseField::new(NoiseKind::Perlin, 2);
        let differs = (0..64).any(|i| {
            let x = i as f64 * 1.7 + 0.3;
            a.evaluate(x, x * 0.5, &opts) != b.evaluate(x, x * 0.5, &opts)
        });
        assert!(differs);
    }

    #[test]
    fn every_kind_and_mode_stays_in_range() {
        let kinds = [
            NoiseKind::OpenSimplex2,
            NoiseKind::SuperSimplex,
            NoiseKind::Simplex,
            NoiseKind::Perlin,
            NoiseKind::Value,
            NoiseKind::Cellular,
        ];
        let modes = [
            FractalMode::Fbm,
            FractalMode::Ridged,
            FractalMode::PingPong { strength: 2.0 },
        ];
        for kind in kinds {
            for mode in modes {
                let opts = options(kind, mode);
                let field = NoiseField::for_options(&opts);
                for i in 0..50 {
                    let h = field.evaluate(i as f64 * 3.1, i as f64 * 1.3, &opts);
                    assert!(h.is_finite());
                    assert!(
                        (opts.offset - 1e-4..=opts.height_ceiling() + 1e-4).contains(&h),
                        "{:?}/{:?} produced {}",
                        kind,
                        mode,
                        h
                    );
                }
            }
        }
    }

    #[test]
    fn detail_layer_raises_ceiling() {
        let mut opts = options(NoiseKind::OpenSimplex2, FractalMode::Fbm);
        let field = NoiseField::for_options(&opts);
        let without = field.evaluate(12.0, 7.0, &opts);
        opts.detail = Some(DetailLayer {
            frequency_scale: 6.0,
            weight: 0.5,
        });
        let with = field.evaluate(12.0, 7.0, &opts);
        assert!(with >= without);
    }

    #[test]
    fn ping_pong_folds_into_unit_range() {
        assert_eq!(ping_pong(0.25), 0.25);
        assert_eq!(ping_pong(1.5), 0.5);
        assert_eq!(ping_pong(2.25), 0.25);
    }

    #[test]
    fn matches_tracks_kind_and_seed() {
        let mut opts = TerrainGenerationOptions::default();
        let field = NoiseField::for_options(&opts);
        assert!(field.matches(&opts));
        opts.seed += 1;
        assert!(!field.matches(&opts));
    }
}
