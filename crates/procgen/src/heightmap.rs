//! Dense square height field populated from noise or loaded from an external source.

use crate::error::{Result, TerrainError};
use crate::noise_field::NoiseField;
use crate::options::TerrainGenerationOptions;
use crate::shaping::{damp_to_water_level, island_falloff};

/// Smallest grid that still has one quad.
pub const MIN_SIZE: usize = 2;
/// Largest grid whose terrain mesh index count, `(size - 1)² * 6`, still fits in a `u32`.
pub const MAX_SIZE: usize = 26755;

/// `size × size` height samples in row-major order (`index = z * size + x`).
///
/// The size is fixed for the lifetime of the map. Generation rewrites every sample and
/// refreshes the cached min/max; readers (renderer, physics, gameplay) only see whole
/// generations because all mutation goes through `&mut self`.
#[derive(Debug, Clone)]
pub struct HeightMap {
    size: usize,
    heights: Vec<f32>,
    min_height: f32,
    max_height: f32,
    /// Noise source reused across regenerations until kind or seed change.
    noise: Option<NoiseField>,
}

fn check_size(size: usize) -> Result<()> {
    if (MIN_SIZE..=MAX_SIZE).contains(&size) {
        Ok(())
    } else {
        Err(TerrainError::InvalidSize {
            size,
            min: MIN_SIZE,
            max: MAX_SIZE,
        })
    }
}

/// Min and max of `heights`. NaN samples turn both into NaN.
fn bounds(heights: &[f32]) -> (f32, f32) {
    heights.iter().fold((f32::MAX, f32::MIN), |(lo, hi), &h| {
        if h.is_nan() || lo.is_nan() {
            (f32::NAN, f32::NAN)
        } else {
            (lo.min(h), hi.max(h))
        }
    })
}

impl HeightMap {
    /// Create a flat map of the given size.
    pub fn new(size: usize) -> Result<Self> {
        check_size(size)?;
        Ok(Self {
            size,
            heights: vec![0.0; size * size],
            min_height: 0.0,
            max_height: 0.0,
            noise: None,
        })
    }

    /// Wrap samples produced elsewhere (image, ASCII grid, tests).
    pub fn from_heights(size: usize, heights: Vec<f32>) -> Result<Self> {
        check_size(size)?;
        if heights.len() != size * size {
            return Err(TerrainError::SizeMismatch {
                expected: size * size,
                actual: heights.len(),
            });
        }
        let mut map = Self {
            size,
            heights,
            min_height: 0.0,
            max_height: 0.0,
            noise: None,
        };
        map.refresh_bounds();
        Ok(map)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// All samples, row-major.
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    #[inline]
    fn index(&self, x: usize, z: usize) -> usize {
        assert!(
            x < self.size && z < self.size,
            "height query ({}, {}) outside {}x{} grid",
            x,
            z,
            self.size,
            self.size
        );
        z * self.size + x
    }

    /// Sample at grid cell `(x, z)`. Panics outside the grid.
    #[inline]
    pub fn get_height(&self, x: usize, z: usize) -> f32 {
        self.heights[self.index(x, z)]
    }

    /// Sample at `(x, z)`, or 0 when the cell lies outside the grid. The grid never wraps.
    #[inline]
    pub fn height_or_zero(&self, x: isize, z: isize) -> f32 {
        if x < 0 || z < 0 || x as usize >= self.size || z as usize >= self.size {
            0.0
        } else {
            self.heights[z as usize * self.size + x as usize]
        }
    }

    /// Lowest sample as of the last generation or normalization.
    pub fn min_height(&self) -> f32 {
        self.min_height
    }

    /// Highest sample as of the last generation or normalization.
    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    fn refresh_bounds(&mut self) {
        (self.min_height, self.max_height) = bounds(&self.heights);
    }

    /// Repopulate every sample from `options`.
    ///
    /// Options are validated before anything is written, so a rejected call leaves the
    /// previous terrain intact.
    pub fn generate_terrain(&mut self, options: &TerrainGenerationOptions) -> Result<()> {
        options.validate()?;

        if !self.noise.as_ref().is_some_and(|n| n.matches(options)) {
            log::debug!("Rebuilding {:?} noise source (seed {})", options.noise, options.seed);
            self.noise = Some(NoiseField::for_options(options));
        }
        let Some(noise) = self.noise.take() else {
            unreachable!("noise source set above");
        };

        let size = self.size;
        let ceiling = options.height_ceiling();
        let mut heights = Vec::with_capacity(size * size);
        for z in 0..size {
            for x in 0..size {
                let mut height = noise.evaluate(x as f64, z as f64, options);

                if options.water_level_damper {
                    height = damp_to_water_level(height, options.water_level, ceiling);
                }
                if options.generate_island {
                    height *= island_falloff(x, z, size, options.island_bump_power);
                }

                heights.push(height);
            }
        }
        self.noise = Some(noise);

        // Shaping changes the range, so bounds are taken from the final samples. The grid is
        // only replaced once the range is known to be usable.
        let (min, max) = bounds(&heights);
        if !(min.is_finite() && max.is_finite() && (max - min).is_finite()) {
            return Err(TerrainError::NonFiniteHeights { min, max });
        }
        self.heights = heights;
        self.min_height = min;
        self.max_height = max;

        log::debug!(
            "Generated {}x{} heightmap, range [{:.2}, {:.2}]",
            size,
            size,
            self.min_height,
            self.max_height
        );
        Ok(())
    }

    /// Shift every sample so the lowest sits at height 0.
    ///
    /// Returns the amount added to each sample; callers move dependent transforms (the
    /// water plane) by the same amount. A second call without regeneration returns 0.
    pub fn set_base_height(&mut self) -> f32 {
        let base = 0.0;
        let shift = base - self.min_height;
        if shift != 0.0 {
            for h in &mut self.heights {
                *h += shift;
            }
        }
        self.min_height = base;
        self.max_height += shift;
        shift
    }

    /// Nearest-sample height at a world position, clamped to the grid.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let max = (self.size - 1) as f32;
        let gx = x.round().clamp(0.0, max) as usize;
        let gz = z.round().clamp(0.0, max) as usize;
        self.get_height(gx, gz)
    }

    /// Height interpolated on the same triangle split the terrain mesh uses.
    ///
    /// Each cell is split along the diagonal from bottom-left `(x0, z1)` to top-right
    /// `(x1, z0)`, so the result lies exactly on the rendered and collided surface.
    pub fn sample_height(&self, x: f32, z: f32) -> f32 {
        let max_cell = (self.size - 2) as f32;
        let gx = x.clamp(0.0, (self.size - 1) as f32);
        let gz = z.clamp(0.0, (self.size - 1) as f32);

        let x0 = gx.floor().min(max_cell) as usize;
        let z0 = gz.floor().min(max_cell) as usize;
        let fx = (gx - x0 as f32).clamp(0.0, 1.0);
        let fz = (gz - z0 as f32).clamp(0.0, 1.0);

        let h00 = self.get_height(x0, z0);
        let h10 = self.get_height(x0 + 1, z0);
        let h01 = self.get_height(x0, z0 + 1);
        let h11 = self.get_height(x0 + 1, z0 + 1);

        if fx + fz <= 1.0 {
            h00 + fx * (h10 - h00) + fz * (h01 - h00)
        } else {
            h11 + (1.0 - fx) * (h01 - h11) + (1.0 - fz) * (h10 - h11)
        }
    }

    /// True if a world position lies over the grid.
    pub fn contains(&self, x: f32, z: f32) -> bool {
        let max = (self.size - 1) as f32;
        (0.0..=max).contains(&x) && (0.0..=max).contains(&z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_options(seed: u64) -> TerrainGenerationOptions {
        TerrainGenerationOptions {
            octaves: 1,
            amplitude: 10.0,
            seed,
            generate_island: false,
            water_level_damper: false,
            ..Default::default()
        }
    }

    #[test]
    fn size_is_validated() {
        assert!(matches!(HeightMap::new(0), Err(TerrainError::InvalidSize { .. })));
        assert!(matches!(HeightMap::new(1), Err(TerrainError::InvalidSize { .. })));
        assert!(HeightMap::new(2).is_ok());
        assert!(matches!(
            HeightMap::from_heights(3, vec![0.0; 8]),
            Err(TerrainError::SizeMismatch { expected: 9, actual: 8 })
        ));
    }

    /// Same options on fresh maps must produce identical grids.
    #[test]
    fn generation_is_deterministic() {
        let options = flat_options(42);
        let mut a = HeightMap::new(4).unwrap();
        let mut b = HeightMap::new(4).unwrap();
        a.generate_terrain(&options).unwrap();
        b.generate_terrain(&options).unwrap();
        assert_eq!(a.heights(), b.heights());

        // Regenerating in place with the same options is also stable.
        let before = a.heights().to_vec();
        a.generate_terrain(&options).unwrap();
        assert_eq!(a.heights(), &before[..]);
    }

    #[test]
    fn bounds_match_samples_after_generation() {
        let options = TerrainGenerationOptions {
            frequency: 0.05,
            water_level_damper: true,
            generate_island: true,
            ..Default::default()
        };
        let mut map = HeightMap::new(33).unwrap();
        map.generate_terrain(&options).unwrap();

        let min = map.heights().iter().cloned().fold(f32::MAX, f32::min);
        let max = map.heights().iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(map.min_height(), min);
        assert_eq!(map.max_height(), max);
    }

    #[test]
    fn base_height_moves_min_to_zero() {
        let mut map = HeightMap::new(16).unwrap();
        map.generate_terrain(&TerrainGenerationOptions::default()).unwrap();
        map.set_base_height();
        assert!(map.min_height().abs() < 1e-4);
        let true_min = map.heights().iter().cloned().fold(f32::MAX, f32::min);
        assert!(true_min.abs() < 1e-4);

        // Idempotent without regeneration.
        let second = map.set_base_height();
        assert!(second.abs() < 1e-6);
    }

    #[test]
    fn base_height_scenario() {
        let mut heights = vec![0.0; 9];
        heights[0] = -5.0;
        heights[4] = 10.0;
        let mut map = HeightMap::from_heights(3, heights.clone()).unwrap();
        assert_eq!(map.min_height(), -5.0);
        assert_eq!(map.max_height(), 10.0);

        let shift = map.set_base_height();
        assert_eq!(shift, 5.0);
        assert_eq!(map.min_height(), 0.0);
        assert_eq!(map.max_height(), 15.0);
        for (before, after) in heights.iter().zip(map.heights()) {
            assert_eq!(*after, before + 5.0);
        }
    }

    #[test]
    fn island_forces_corners_to_zero() {
        let options = TerrainGenerationOptions {
            generate_island: true,
            island_bump_power: 1.0,
            frequency: 0.05,
            ..Default::default()
        };
        let mut map = HeightMap::new(17).unwrap();
        map.generate_terrain(&options).unwrap();
        for (x, z) in [(0, 0), (16, 0), (0, 16), (16, 16)] {
            assert_eq!(map.get_height(x, z), 0.0);
        }

        // Falloff is exactly 1 at the centre, so it matches the unshaped sample.
        let mut plain = HeightMap::new(17).unwrap();
        plain
            .generate_terrain(&TerrainGenerationOptions {
                generate_island: false,
                ..options.clone()
            })
            .unwrap();
        assert_eq!(map.get_height(8, 8), plain.get_height(8, 8));
    }

    #[test]
    fn rejected_options_leave_terrain_intact() {
        let mut map = HeightMap::new(8).unwrap();
        map.generate_terrain(&flat_options(7)).unwrap();
        let before = map.heights().to_vec();
        let (min, max) = (map.min_height(), map.max_height());

        let bad = TerrainGenerationOptions {
            octaves: 0,
            ..flat_options(7)
        };
        assert!(map.generate_terrain(&bad).is_err());
        assert_eq!(map.heights(), &before[..]);
        assert_eq!((map.min_height(), map.max_height()), (min, max));
    }

    #[test]
    fn overflowing_amplitude_leaves_terrain_intact() {
        let mut map = HeightMap::new(8).unwrap();
        map.generate_terrain(&flat_options(7)).unwrap();
        let before = map.heights().to_vec();

        let bad = TerrainGenerationOptions {
            amplitude: f32::MAX,
            offset: f32::MAX,
            ..flat_options(7)
        };
        assert!(matches!(
            map.generate_terrain(&bad),
            Err(TerrainError::InvalidOption { field: "amplitude", .. })
        ));
        assert_eq!(map.heights(), &before[..]);
        assert!(map.min_height().is_finite() && map.max_height().is_finite());
    }

    /// Options that validate can still shape into infinities; the grid is only replaced
    /// when the generated range is finite.
    #[test]
    fn non_finite_shaping_leaves_terrain_intact() {
        let mut map = HeightMap::new(8).unwrap();
        map.generate_terrain(&flat_options(7)).unwrap();
        let before = map.heights().to_vec();
        let (min, max) = (map.min_height(), map.max_height());

        let bad = TerrainGenerationOptions {
            amplitude: 1.0,
            offset: -f32::MAX * 0.5,
            water_level: f32::MAX,
            water_level_damper: true,
            detail: None,
            ..flat_options(7)
        };
        assert!(bad.validate().is_ok());
        assert!(matches!(
            map.generate_terrain(&bad),
            Err(TerrainError::NonFiniteHeights { .. })
        ));
        assert_eq!(map.heights(), &before[..]);
        assert_eq!((map.min_height(), map.max_height()), (min, max));

        // The map is still usable afterwards.
        map.generate_terrain(&flat_options(7)).unwrap();
        assert_eq!(map.heights(), &before[..]);
    }

    #[test]
    fn largest_size_keeps_indices_in_u32() {
        assert!(crate::mesh::terrain_index_count(MAX_SIZE) <= u32::MAX as usize);
        assert!(crate::mesh::terrain_index_count(MAX_SIZE + 1) > u32::MAX as usize);
        assert!(matches!(
            HeightMap::new(MAX_SIZE + 1),
            Err(TerrainError::InvalidSize { .. })
        ));
    }

    #[test]
    fn switching_noise_kind_reuses_map() {
        let mut map = HeightMap::new(8).unwrap();
        let mut options = flat_options(3);
        map.generate_terrain(&options).unwrap();
        let simplex = map.heights().to_vec();

        options.noise = crate::options::NoiseKind::Perlin;
        map.generate_terrain(&options).unwrap();
        assert_ne!(map.heights(), &simplex[..]);
    }

    #[test]
    fn out_of_range_neighbours_read_zero() {
        let map = HeightMap::from_heights(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(map.height_or_zero(-1, 0), 0.0);
        assert_eq!(map.height_or_zero(0, 2), 0.0);
        assert_eq!(map.height_or_zero(1, 1), 4.0);
    }

    #[test]
    fn nearest_and_interpolated_queries() {
        let map = HeightMap::from_heights(2, vec![0.0, 2.0, 4.0, 6.0]).unwrap();
        assert_eq!(map.height_at(0.4, 0.4), 0.0);
        assert_eq!(map.height_at(0.6, 0.6), 6.0);
        assert_eq!(map.height_at(-10.0, 50.0), 4.0);

        // Planar data interpolates exactly on either triangle.
        assert!((map.sample_height(0.25, 0.25) - 1.5).abs() < 1e-5);
        assert!((map.sample_height(0.75, 0.75) - 4.5).abs() < 1e-5);
        assert!(map.contains(1.0, 0.0));
        assert!(!map.contains(1.5, 0.0));
    }

    #[test]
    #[should_panic]
    fn get_height_outside_grid_panics() {
        let map = HeightMap::new(4).unwrap();
        map.get_height(4, 0);
    }
}
