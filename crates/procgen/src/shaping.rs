//! Shaping passes applied to raw noise heights.

/// Fraction of depth kept below the water level is `1 / WATER_DAMPING`.
pub const WATER_DAMPING: f32 = 1.25;

/// Pull `height` toward `water_level`.
///
/// Below the water level the depth is divided by [`WATER_DAMPING`]. Above it, heights are
/// compressed more the closer they get to `ceiling`, which flattens the shoreline into
/// plateaus. The mapping is continuous and monotonically increasing.
pub fn damp_to_water_level(height: f32, water_level: f32, ceiling: f32) -> f32 {
    if height < water_level {
        return water_level - (water_level - height) / WATER_DAMPING;
    }

    let above = height - water_level;
    let range = (ceiling - water_level).max(f32::EPSILON);
    let pull = 1.0 - 1.0 / WATER_DAMPING;
    let t = (above / range).min(1.0);
    water_level + above * (1.0 - pull * 0.5 * t)
}

/// Radial falloff on one axis: `max(0, 1 - |t|^(2 * bump_power))` for `t` in [-1, 1].
#[inline]
pub fn island(t: f32, bump_power: f32) -> f32 {
    (1.0 - t.abs().powf(2.0 * bump_power)).max(0.0)
}

/// Map a grid index to [-1, 1] so the first and last samples land exactly on the edges.
#[inline]
pub fn normalized_coord(i: usize, size: usize) -> f32 {
    if size < 2 {
        return 0.0;
    }
    (i as f32 / (size - 1) as f32) * 2.0 - 1.0
}

/// Product of the per-axis island falloff at grid cell `(x, z)`.
pub fn island_falloff(x: usize, z: usize, size: usize, bump_power: f32) -> f32 {
    island(normalized_coord(x, size), bump_power) * island(normalized_coord(z, size), bump_power)
}
