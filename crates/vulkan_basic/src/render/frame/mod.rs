//! Frame presentation loop
//!
//! Each frame walks `Idle -> ImageRequested -> Submitted -> Presented -> Idle`.
//! A surface that stops matching the swap chain moves the loop to `Stale`,
//! and the next frame boundary rebuilds the whole presentation chain before
//! drawing again.
//!
//! The GPU side is reached only through [`PresentationBackend`], implemented
//! by the Vulkan renderer and by [`HeadlessBackend`] for tests.

pub mod backend;
pub mod error;
pub mod headless;
pub mod presenter;
pub mod resize;
pub mod state;

pub use backend::PresentationBackend;
pub use error::{FrameError, FrameResult};
pub use headless::{HeadlessBackend, RebuildStep, ResourceCounts};
pub use presenter::{FramePresenter, PresenterStats};
pub use resize::ResizeTracker;
pub use state::{FrameOutcome, FrameState, PresentStatus};
