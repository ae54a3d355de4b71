//! # Vulkan Basic
//!
//! Vulkan setup for a spinning textured quad, built around a frame presentation
//! loop that survives window resizes and stale swap chains.
//!
//! ## Layout
//!
//! - [`render::frame`]: the acquire / submit / present state machine and the
//!   [`render::frame::PresentationBackend`] seam it drives
//! - [`render::backends::vulkan`]: the `ash` implementation of that seam
//! - [`core::config`]: application configuration loaded from TOML or RON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vulkan_basic::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::default();
//!     let mut window = Window::new(&config.window)?;
//!     let renderer = VulkanRenderer::new(&window, &config)?;
//!     let mut presenter = FramePresenter::new(renderer);
//!
//!     while !window.should_close() {
//!         window.poll_events();
//!         for event in window.drain_events() {
//!             if let WindowEvent::Resized { width, height } = event {
//!                 presenter.notify_resize(width, height);
//!             }
//!         }
//!         presenter.draw_frame()?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod assets;
pub mod render;

/// Common imports for applications
pub mod prelude {
    pub use crate::{
        core::config::{ApplicationConfig, Config, ConfigError},
        foundation::math::{Mat4, Vec3},
        render::frame::{
            FrameError, FrameOutcome, FramePresenter, FrameState, PresentStatus,
            PresentationBackend,
        },
        render::backends::vulkan::{
            VulkanError, VulkanRenderer, VulkanResult, Window, WindowError, WindowEvent,
        },
    };
}
