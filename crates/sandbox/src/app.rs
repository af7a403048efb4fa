//! Frame loop: scripted input, terrain regeneration, physics and rendering.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use engine_core::{Profiler, Time};
use glam::{Mat4, Vec3};
use procgen::{quad_mesh, HeightMap, TerrainGenerationOptions};
use renderer::{
    Camera, DrawItem, DrawLog, GpuContext, GpuMesh, InstanceBuffer, InstanceData, Light,
    MemorySink, Mesh, MeshSink, SceneRenderer, Topology,
};

use crate::config::SandboxConfig;
use crate::settings::RenderSettings;
use crate::terrain::TerrainSystem;
use crate::world::{
    box_mesh, material_color, SandboxWorld, BOX_MESH, MATERIAL_TERRAIN, PROP_MESH, WATER_MESH,
};

/// Simulated duration of one frame.
pub const FRAME_STEP: Duration = Duration::from_micros(16_667);

/// Profiler section wrapping each terrain regeneration.
pub const REGEN_SECTION: &str = "Terrain Re-Gen";
/// Profiler section wrapping frame submission.
pub const RENDER_SECTION: &str = "Render";

/// One mesh and the instances to draw it with this frame.
pub struct FrameItem<'a, S: MeshSink> {
    pub mesh: &'a Mesh<S>,
    pub instances: Vec<InstanceData>,
    pub topology: Topology,
}

/// Everything a backend needs to draw one frame.
pub struct FrameView<'a, S: MeshSink> {
    pub camera: &'a Camera,
    pub lights: &'a [Light],
    pub shininess: f32,
    pub items: Vec<FrameItem<'a, S>>,
}

/// Where meshes live and frames go.
pub trait FrameBackend {
    type Sink: MeshSink;

    fn make_sink(&mut self, label: &str) -> Self::Sink;

    fn render(&mut self, frame: FrameView<'_, Self::Sink>);

    /// Last rendered frame as an image, if this backend produces pixels.
    fn capture(&self) -> Result<Option<image::RgbaImage>>;
}

/// Offscreen wgpu rendering.
pub struct GpuBackend {
    ctx: GpuContext,
    scene: SceneRenderer,
    instance_buffers: Vec<InstanceBuffer>,
}

impl GpuBackend {
    pub fn new(ctx: GpuContext) -> Self {
        let scene = SceneRenderer::new(&ctx);
        Self {
            ctx,
            scene,
            instance_buffers: Vec::new(),
        }
    }
}

impl FrameBackend for GpuBackend {
    type Sink = GpuMesh;

    fn make_sink(&mut self, label: &str) -> GpuMesh {
        GpuMesh::new(&self.ctx, label)
    }

    fn render(&mut self, frame: FrameView<'_, GpuMesh>) {
        self.scene.update_camera(&self.ctx, frame.camera);
        self.scene
            .update_lights(&self.ctx, frame.lights, frame.shininess);

        for (i, item) in frame.items.iter().enumerate() {
            match self.instance_buffers.get_mut(i) {
                Some(buffer) => buffer.update(&self.ctx, &item.instances),
                None => self
                    .instance_buffers
                    .push(InstanceBuffer::new(&self.ctx, &item.instances)),
            }
        }

        let draws: Vec<DrawItem<'_>> = frame
            .items
            .iter()
            .zip(&self.instance_buffers)
            .map(|(item, instances)| DrawItem {
                mesh: item.mesh,
                instances,
                topology: item.topology,
            })
            .collect();
        self.scene.render(&self.ctx, &draws);
    }

    fn capture(&self) -> Result<Option<image::RgbaImage>> {
        let pixels = self.ctx.read_pixels()?;
        let image = image::RgbaImage::from_raw(self.ctx.width, self.ctx.height, pixels)
            .context("pixel buffer does not match the render target size")?;
        Ok(Some(image))
    }
}

/// CPU-only backend. Uploads land in [`MemorySink`]s and draws are recorded in a log.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    pub last_frame: DrawLog,
    pub frames: u64,
}

impl FrameBackend for HeadlessBackend {
    type Sink = MemorySink;

    fn make_sink(&mut self, _label: &str) -> MemorySink {
        MemorySink::new()
    }

    fn render(&mut self, frame: FrameView<'_, MemorySink>) {
        let mut log = DrawLog::default();
        for item in frame.items.iter().filter(|item| !item.instances.is_empty()) {
            item.mesh.bind(&mut log);
            item.mesh.draw(&mut log, item.topology);
        }
        self.last_frame = log;
        self.frames += 1;
    }

    fn capture(&self) -> Result<Option<image::RgbaImage>> {
        Ok(None)
    }
}

/// Load a height grid from disk: `.txt`/`.asc` as whitespace-separated text, anything else
/// as an image.
pub fn load_heightmap(path: &Path) -> Result<HeightMap> {
    let text = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("txt") | Some("asc")
    );
    let map = if text {
        HeightMap::from_ascii(path)
    } else {
        HeightMap::from_image(path)
    };
    map.with_context(|| format!("failed to load heightmap {:?}", path))
}

/// Shared meshes drawn once per instance of their entity kind.
struct SceneMeshes<S: MeshSink> {
    boxes: Mesh<S>,
    water: Mesh<S>,
    prop: Mesh<S>,
}

pub struct App<B: FrameBackend> {
    config: SandboxConfig,
    backend: B,
    terrain: TerrainSystem<B::Sink>,
    world: SandboxWorld,
    meshes: SceneMeshes<B::Sink>,
    camera: Camera,
    time: Time,
    profiler: Profiler,
}

impl<B: FrameBackend> App<B> {
    pub fn new(config: SandboxConfig, mut backend: B) -> Result<Self> {
        let sink = backend.make_sink("Terrain");
        let mut terrain = match &config.heightmap_file {
            Some(path) => TerrainSystem::from_heightmap(
                load_heightmap(path)?,
                config.terrain.clone(),
                sink,
                config.collision_policy,
            ),
            None => TerrainSystem::generate(
                config.terrain_size,
                config.terrain.clone(),
                sink,
                config.collision_policy,
            )?,
        };

        let time = Time::new();
        let mut world = SandboxWorld::new(config.seed);
        world.physics.set_timestep(time.fixed_timestep_seconds());
        terrain.attach_collider(&mut world.physics);
        world.populate(&terrain, &config);

        let meshes = SceneMeshes {
            boxes: Mesh::buffered(box_mesh(), backend.make_sink("Box")),
            water: Mesh::buffered(quad_mesh(1.0, 1.0), backend.make_sink("Water")),
            prop: Mesh::buffered(procgen::cube_mesh(Vec3::ONE, true), backend.make_sink("Prop")),
        };

        let mut camera = Camera::new(Self::camera_home(&terrain));
        camera.set_aspect(config.render_width, config.render_height);
        camera.look_at(terrain.centre());

        Ok(Self {
            config,
            backend,
            terrain,
            world,
            meshes,
            camera,
            time,
            profiler: Profiler::new(),
        })
    }

    /// Above the grid's origin corner, high enough to see the whole surface.
    fn camera_home(terrain: &TerrainSystem<B::Sink>) -> Vec3 {
        let size = terrain.heightmap().size() as f32;
        let top = terrain.heightmap().max_height();
        Vec3::new(-0.15 * size, top + 0.4 * size, -0.15 * size)
    }

    /// Run the configured number of frames, then report timings and save the screenshot.
    pub fn run(&mut self) -> Result<()> {
        log::info!("Running {} frames", self.config.frames);
        for _ in 0..self.config.frames {
            self.frame();
        }
        log::info!(
            "Simulated {:.1}s over {} frames",
            self.time.elapsed_seconds(),
            self.time.frame_count()
        );
        self.profiler.report();

        if let Some(path) = self.config.screenshot.clone() {
            match self.backend.capture()? {
                Some(image) => {
                    image
                        .save(&path)
                        .with_context(|| format!("failed to write screenshot {:?}", path))?;
                    log::info!("Saved screenshot to {:?}", path);
                }
                None => log::warn!("Backend produced no pixels, screenshot skipped"),
            }
        }
        Ok(())
    }

    pub fn frame(&mut self) {
        let frame = self.time.frame_count();
        self.time.advance(FRAME_STEP);

        {
            let _physics = self.profiler.begin_section("Physics");
            while self.time.should_fixed_update() {
                self.world.step();
            }
        }

        for _ in 0..self.config.throws_at(frame) {
            self.world
                .throw_box(self.camera.position(), self.camera.forward(), &self.config.render);
        }

        let pending: Vec<TerrainGenerationOptions> =
            self.config.regenerations_at(frame).cloned().collect();
        for options in &pending {
            self.regenerate(options);
        }

        let removed = self.world.despawn_fallen(self.config.kill_height);
        if removed > 0 {
            log::debug!("Frame {}: {} bodies fell out of the world", frame, removed);
        }

        {
            // The timer holds the profiler, so rendering borrows the other fields directly.
            let _render = self.profiler.begin_section(RENDER_SECTION);
            render_scene(
                &mut self.backend,
                &self.config.render,
                &self.camera,
                &self.terrain,
                &self.world,
                &self.meshes,
            );
        }
        self.profiler.end_frame();
    }

    /// Apply new generation options. A rejected set is logged and the current terrain stays.
    pub fn regenerate(&mut self, options: &TerrainGenerationOptions) {
        let _timer = self.profiler.begin_section(REGEN_SECTION);
        match self.terrain.regenerate(options, &mut self.world.physics) {
            Ok(report) => {
                self.world.set_water_height(self.terrain.water_height());
                log::info!(
                    "Terrain regenerated in {:.2?} ({:?}, base shift {:.2})",
                    report.duration,
                    report.upload,
                    report.base_shift
                );
            }
            Err(e) => log::warn!("{:#}, keeping current terrain", e),
        }
    }

    pub fn terrain(&self) -> &TerrainSystem<B::Sink> {
        &self.terrain
    }

    pub fn world(&self) -> &SandboxWorld {
        &self.world
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }
}

fn render_scene<B: FrameBackend>(
    backend: &mut B,
    settings: &RenderSettings,
    camera: &Camera,
    terrain: &TerrainSystem<B::Sink>,
    world: &SandboxWorld,
    meshes: &SceneMeshes<B::Sink>,
) {
    let lights = settings.lights(camera.position(), camera.forward(), world.light_positions());
    let terrain_topology = if settings.wireframe {
        Topology::Lines
    } else {
        Topology::Triangles
    };

    let items = vec![
        FrameItem {
            mesh: terrain.mesh(),
            instances: vec![InstanceData::new(
                Mat4::IDENTITY,
                material_color(MATERIAL_TERRAIN),
            )],
            topology: terrain_topology,
        },
        FrameItem {
            mesh: &meshes.boxes,
            instances: world.instances(BOX_MESH),
            topology: Topology::Triangles,
        },
        FrameItem {
            mesh: &meshes.prop,
            instances: world.instances(PROP_MESH),
            topology: Topology::Triangles,
        },
        // Blended, so last.
        FrameItem {
            mesh: &meshes.water,
            instances: world.instances(WATER_MESH),
            topology: Topology::Triangles,
        },
    ];

    backend.render(FrameView {
        camera,
        lights: &lights,
        shininess: settings.material_shine,
        items,
    });
}
