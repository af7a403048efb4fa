//! Sandbox configuration. Loaded from `sandbox.ron` (or the path given as the first
//! argument) at startup.

use std::path::{Path, PathBuf};

use procgen::TerrainGenerationOptions;
use serde::{Deserialize, Serialize};

use crate::settings::RenderSettings;

/// What happens to the terrain collider when the terrain is regenerated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Replace the collider in the same call that updates the render mesh.
    #[default]
    RebuildOnChange,
    /// Build the collider once at startup. After a regeneration, physics keeps colliding
    /// with the startup surface.
    StaticOnce,
}

/// Terrain regeneration applied at the start of a given frame, standing in for an
/// interactive options edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledRegeneration {
    pub frame: u64,
    pub options: TerrainGenerationOptions,
}

/// Box thrown from the camera at a given frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScheduledThrow {
    pub frame: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Side length of the height grid in samples.
    #[serde(default = "default_terrain_size")]
    pub terrain_size: usize,
    #[serde(default)]
    pub terrain: TerrainGenerationOptions,
    /// Load heights from an image or whitespace-separated text grid instead of noise.
    #[serde(default)]
    pub heightmap_file: Option<PathBuf>,
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
    /// Frames to simulate before exiting.
    #[serde(default = "default_frames")]
    pub frames: u64,
    /// Seed for entity scattering.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_scattered_boxes")]
    pub scattered_boxes: usize,
    /// Height of the box tower dropped above the terrain centre, in boxes.
    #[serde(default = "default_stack_height")]
    pub stack_height: usize,
    /// Bodies falling below this height are removed.
    #[serde(default = "default_kill_height")]
    pub kill_height: f32,
    #[serde(default = "default_render_width")]
    pub render_width: u32,
    #[serde(default = "default_render_height")]
    pub render_height: u32,
    /// Skip GPU setup even when an adapter is available.
    #[serde(default)]
    pub headless: bool,
    /// Write the last rendered frame to this PNG.
    #[serde(default)]
    pub screenshot: Option<PathBuf>,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub regenerations: Vec<ScheduledRegeneration>,
    #[serde(default)]
    pub throws: Vec<ScheduledThrow>,
}

fn default_terrain_size() -> usize {
    256
}
fn default_frames() -> u64 {
    600
}
fn default_seed() -> u64 {
    523523
}
fn default_scattered_boxes() -> usize {
    16
}
fn default_stack_height() -> usize {
    10
}
fn default_kill_height() -> f32 {
    -5.0
}
fn default_render_width() -> u32 {
    1280
}
fn default_render_height() -> u32 {
    720
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            terrain_size: default_terrain_size(),
            terrain: TerrainGenerationOptions::default(),
            heightmap_file: None,
            collision_policy: CollisionPolicy::default(),
            frames: default_frames(),
            seed: default_seed(),
            scattered_boxes: default_scattered_boxes(),
            stack_height: default_stack_height(),
            kill_height: default_kill_height(),
            render_width: default_render_width(),
            render_height: default_render_height(),
            headless: false,
            screenshot: None,
            render: RenderSettings::default(),
            regenerations: Vec::new(),
            throws: Vec::new(),
        }
    }
}

impl SandboxConfig {
    /// Load from `path`. A missing or invalid file logs a warning and yields defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => match ron::from_str(&data) {
                Ok(config) => {
                    log::info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    log::warn!("Invalid config at {:?}: {}, using defaults", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read config {:?}: {}, using defaults", path, e);
                Self::default()
            }
        }
    }

    /// Regenerations scheduled for `frame`, in file order.
    pub fn regenerations_at(&self, frame: u64) -> impl Iterator<Item = &TerrainGenerationOptions> {
        self.regenerations
            .iter()
            .filter(move |r| r.frame == frame)
            .map(|r| &r.options)
    }

    pub fn throws_at(&self, frame: u64) -> usize {
        self.throws.iter().filter(|t| t.frame == frame).count()
    }
}

/// Config path from the first CLI argument, else `sandbox.ron` in the working directory.
pub fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("sandbox.ron")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use procgen::NoiseKind;

    #[test]
    fn parses_scripted_regenerations() {
        let text = r#"(
            terrain_size: 64,
            collision_policy: StaticOnce,
            regenerations: [
                (frame: 10, options: (seed: 7, noise: Perlin)),
                (frame: 10, options: (octaves: 2)),
                (frame: 30, options: ()),
            ],
            throws: [(frame: 5)],
        )"#;
        let config: SandboxConfig = ron::from_str(text).unwrap();
        assert_eq!(config.terrain_size, 64);
        assert_eq!(config.collision_policy, CollisionPolicy::StaticOnce);
        assert_eq!(config.frames, 600);

        let at_10: Vec<_> = config.regenerations_at(10).collect();
        assert_eq!(at_10.len(), 2);
        assert_eq!(at_10[0].noise, NoiseKind::Perlin);
        assert_eq!(at_10[1].octaves, 2);
        assert_eq!(config.regenerations_at(11).count(), 0);
        assert_eq!(config.throws_at(5), 1);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = SandboxConfig::load(Path::new("/definitely/not/here.ron"));
        assert_eq!(config.terrain_size, 256);
        assert_eq!(config.collision_policy, CollisionPolicy::RebuildOnChange);
    }
}
