//! Window, renderer and presenter wired into one event loop

use std::time::Instant;
use thiserror::Error;
use vulkan_basic::prelude::*;

/// Anything that ends the application early
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The window could not be created
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Vulkan setup or resource upload failed
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),

    /// A frame could not be drawn
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

/// Spinning textured quad application
pub struct TexturedQuadApp {
    // Presenter (and with it the renderer) must drop before the window.
    presenter: FramePresenter<VulkanRenderer>,
    window: Window,
    start_time: Instant,
}

impl TexturedQuadApp {
    /// Create the window and every Vulkan object
    pub fn new(config: &ApplicationConfig) -> Result<Self, AppError> {
        let window = Window::new(&config.window)?;
        let renderer = VulkanRenderer::new(&window, config)?;
        let presenter = FramePresenter::new(renderer);

        Ok(Self {
            presenter,
            window,
            start_time: Instant::now(),
        })
    }

    /// Run until the window is closed
    pub fn run(&mut self) -> Result<(), AppError> {
        log::info!("Entering main loop");

        while !self.window.should_close() {
            if self.presenter.is_minimized() {
                // Nothing to draw; sleep until the window changes.
                self.window.wait_events();
            } else {
                self.window.poll_events();
            }

            for event in self.window.drain_events() {
                match event {
                    WindowEvent::Resized { width, height } => self.presenter.notify_resize(width, height),
                    WindowEvent::CloseRequested => log::info!("Close requested"),
                }
            }

            if self.window.should_close() || self.presenter.is_minimized() {
                continue;
            }

            let elapsed = self.start_time.elapsed().as_secs_f32();
            self.presenter.backend_mut().set_animation_time(elapsed);

            match self.presenter.draw_frame()? {
                FrameOutcome::Presented { status, .. } if status != PresentStatus::Optimal => {
                    log::debug!("Presented with {:?} swap chain", status);
                }
                FrameOutcome::SwapchainRebuilt => log::debug!("Frame skipped for swap chain rebuild"),
                _ => {}
            }
        }

        let stats = self.presenter.stats();
        log::info!(
            "Main loop finished: {} frames presented, {} swap chain rebuilds",
            stats.frames_presented,
            stats.swapchain_rebuilds
        );

        self.presenter.backend().wait_idle()?;
        Ok(())
    }
}
