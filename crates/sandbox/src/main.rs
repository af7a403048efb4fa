//! Terrain sandbox: generates a heightmap terrain, drops physics boxes on it and renders
//! the scene offscreen, regenerating the terrain on a configured schedule.

mod app;
mod config;
mod settings;
mod terrain;
mod world;

use anyhow::Result;
use renderer::GpuContext;

use crate::app::{App, GpuBackend, HeadlessBackend};
use crate::config::{config_path, SandboxConfig};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SandboxConfig::load(&config_path());

    if !config.headless {
        match GpuContext::new_blocking(config.render_width, config.render_height) {
            Ok(ctx) => {
                log::info!("Rendering offscreen at {}x{}", ctx.width, ctx.height);
                return App::new(config, GpuBackend::new(ctx))?.run();
            }
            Err(e) => log::warn!("GPU unavailable ({}), running headless", e),
        }
    }

    App::new(config, HeadlessBackend::default())?.run()
}
