//! Window management using GLFW
//!
//! GLFW events are polled into a channel and translated into the few events
//! the presentation loop cares about.

use crate::core::config::WindowConfig;
use ash::vk;
use thiserror::Error;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed: {0}")]
    InitializationFailed(String),

    /// GLFW found no Vulkan loader
    #[error("Vulkan is not supported by this GLFW installation")]
    VulkanUnsupported,

    /// Window creation failed
    #[error("Window creation failed")]
    CreationFailed,

    /// Other GLFW error
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// Window events relevant to presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// Framebuffer size changed; zero in either dimension means minimized
    Resized {
        /// New framebuffer width in pixels
        width: u32,
        /// New framebuffer height in pixels
        height: u32,
    },
    /// The user asked the window to close
    CloseRequested,
}

/// GLFW window wrapper with proper resource management
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl Window {
    /// Create a window with no client API attached
    pub fn new(config: &WindowConfig) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| WindowError::InitializationFailed(e.to_string()))?;

        if !glfw.vulkan_supported() {
            return Err(WindowError::VulkanUnsupported);
        }

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(config.resizable));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        log::info!("Created window '{}' ({}x{})", config.title, config.width, config.height);

        Ok(Self { glfw, window, events })
    }

    /// Whether the window has been asked to close
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Process pending events without blocking
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    /// Block until at least one event arrives
    pub fn wait_events(&mut self) {
        self.glfw.wait_events();
    }

    /// Drain queued events, keeping resizes and close requests
    ///
    /// Escape marks the window for closing.
    pub fn drain_events(&mut self) -> Vec<WindowEvent> {
        let mut out = Vec::new();
        for (_, event) in glfw::flush_messages(&self.events) {
            match event {
                glfw::WindowEvent::FramebufferSize(width, height) => out.push(WindowEvent::Resized {
                    width: u32::try_from(width).unwrap_or(0),
                    height: u32::try_from(height).unwrap_or(0),
                }),
                glfw::WindowEvent::Close => out.push(WindowEvent::CloseRequested),
                glfw::WindowEvent::Key(glfw::Key::Escape, _, glfw::Action::Press, _) => {
                    self.window.set_should_close(true);
                    out.push(WindowEvent::CloseRequested);
                }
                _ => {}
            }
        }
        out
    }

    /// Current framebuffer size in pixels
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (u32::try_from(width).unwrap_or(0), u32::try_from(height).unwrap_or(0))
    }

    /// Current framebuffer size as a Vulkan extent
    pub fn framebuffer_extent(&self) -> vk::Extent2D {
        let (width, height) = self.framebuffer_size();
        vk::Extent2D { width, height }
    }

    /// Mark the window for closing
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Get required Vulkan instance extensions from GLFW
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Failed to get required extensions".to_string()))
    }

    /// Create Vulkan surface using GLFW's built-in functionality
    pub fn create_vulkan_surface(&self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {result:?}")))
        }
    }
}
