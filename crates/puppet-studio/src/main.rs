mod bone_renderer;
mod marionette;
mod studio;

use anyhow::Result;
use winit::dpi::LogicalSize;

use puppet_engine::device::GpuInit;
use puppet_engine::logging::{filter_for, init_logging, LoggingConfig};
use puppet_engine::schedule::FRAMES_IN_FLIGHT;
use puppet_engine::window::{Runtime, RuntimeConfig};

use studio::Studio;

fn main() -> Result<()> {
    init_logging(LoggingConfig {
        env_filter: std::env::var("RUST_LOG")
            .ok()
            .or_else(|| Some(filter_for("puppet_studio"))),
        ..Default::default()
    });

    log::info!(
        "keys: space play/pause, up/down speed, F frame rate, delete/insert cast, R reverse order"
    );

    let config = RuntimeConfig {
        title: "Puppet Studio".to_string(),
        initial_size: LogicalSize::new(1280.0, 720.0),
    };

    let gpu = GpuInit {
        desired_maximum_frame_latency: (FRAMES_IN_FLIGHT as u32 - 1).max(1),
        ..GpuInit::default()
    };

    Runtime::run(config, gpu, Studio::new())
}
