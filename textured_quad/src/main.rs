//! Textured quad demo
//!
//! Usage: `textured_quad [config.toml|config.ron]`. Without an argument,
//! `textured_quad.toml` in the working directory is used when present.

mod app;

use app::{AppError, TexturedQuadApp};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use vulkan_basic::foundation::logging;
use vulkan_basic::prelude::*;

const DEFAULT_CONFIG: &str = "textured_quad.toml";

fn run() -> Result<(), AppError> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ApplicationConfig::load_or_default(config_path.as_deref(), Path::new(DEFAULT_CONFIG))?;

    logging::init_with_level(&config.engine.log_level);
    log::info!("Starting textured quad demo");
    match &config_path {
        Some(path) => log::info!("Configuration loaded from {}", path.display()),
        None => log::debug!("Using {} or built-in defaults", DEFAULT_CONFIG),
    }

    config.validate()?;

    let mut app = TexturedQuadApp::new(&config)?;
    app.run()
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => {
            log::info!("Textured quad demo finished successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Application error: {}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
