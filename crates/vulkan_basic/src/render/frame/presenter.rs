//! Frame presenter: acquire, submit, present and rebuild
//!
//! The presenter owns its backend and is the only code that moves
//! [`FrameState`]. Rebuilds happen at frame boundaries only; a request made
//! mid-frame is remembered and honored once the frame has been presented.

use super::backend::PresentationBackend;
use super::error::{FrameError, FrameResult};
use super::resize::ResizeTracker;
use super::state::{FrameOutcome, FrameState, PresentStatus};
use crate::render::backends::vulkan::VulkanError;
use ash::vk;

/// Counters describing what the presenter has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresenterStats {
    /// Images queued for presentation
    pub frames_presented: u64,
    /// Completed swap chain rebuilds
    pub swapchain_rebuilds: u64,
    /// Acquires or presents that reported a suboptimal swap chain
    pub suboptimal_reports: u64,
    /// Acquires or presents that reported an out-of-date swap chain
    pub out_of_date_reports: u64,
}

/// Drives one [`PresentationBackend`] through the frame state machine
pub struct FramePresenter<B: PresentationBackend> {
    backend: B,
    state: FrameState,
    resize: ResizeTracker,
    rebuild_requested: bool,
    slot: usize,
    stats: PresenterStats,
}

impl<B: PresentationBackend> FramePresenter<B> {
    /// Wrap a backend whose presentation chain is already built
    pub fn new(backend: B) -> Self {
        log::debug!(
            "Frame presenter ready: {} images, {} frame(s) in flight",
            backend.image_count(),
            backend.frames_in_flight()
        );
        Self {
            backend,
            state: FrameState::Idle,
            resize: ResizeTracker::new(),
            rebuild_requested: false,
            slot: 0,
            stats: PresenterStats::default(),
        }
    }

    /// Current state
    pub const fn state(&self) -> FrameState {
        self.state
    }

    /// Counters
    pub const fn stats(&self) -> PresenterStats {
        self.stats
    }

    /// Ring slot the next frame will use
    pub const fn current_slot(&self) -> usize {
        self.slot
    }

    /// Borrow the backend
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Borrow the backend mutably, e.g. to update uniforms between frames
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Give the backend back
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Resize bookkeeping
    pub const fn resize_tracker(&self) -> &ResizeTracker {
        &self.resize
    }

    /// Whether the surface currently has zero area
    pub const fn is_minimized(&self) -> bool {
        self.resize.is_minimized()
    }

    /// Whether a rebuild will run at the next frame boundary
    pub const fn rebuild_pending(&self) -> bool {
        self.rebuild_requested || self.resize.is_pending() || matches!(self.state, FrameState::Stale)
    }

    /// Record a framebuffer size change; acted on at the next frame boundary
    pub fn notify_resize(&mut self, width: u32, height: u32) {
        log::debug!("Framebuffer resized to {}x{}", width, height);
        self.resize.notify(width, height);
    }

    /// Ask for a rebuild at the next frame boundary
    pub fn request_rebuild(&mut self) {
        self.rebuild_requested = true;
    }

    /// Acquire the next swap chain image
    ///
    /// Waits without timeout. Returns [`FrameError::SurfaceOutOfDate`] and
    /// moves to `Stale` when the surface no longer matches; a suboptimal
    /// acquire succeeds and schedules a rebuild.
    pub fn acquire_image(&mut self) -> FrameResult<u32> {
        match self.state {
            FrameState::Idle | FrameState::Presented => {}
            state => {
                return Err(FrameError::InvalidTransition {
                    state,
                    operation: "acquire an image",
                })
            }
        }
        self.state = FrameState::Idle;

        self.backend
            .wait_for_slot(self.slot)
            .map_err(FrameError::SlotWait)?;

        match self.backend.acquire_next_image(self.slot, u64::MAX) {
            Ok((image_index, suboptimal)) => {
                if suboptimal {
                    log::debug!("Acquired image {} from a suboptimal swap chain", image_index);
                    self.stats.suboptimal_reports += 1;
                    self.rebuild_requested = true;
                }
                self.state = FrameState::ImageRequested;
                Ok(image_index)
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::debug!("Swap chain out of date at acquire");
                self.stats.out_of_date_reports += 1;
                self.state = FrameState::Stale;
                Err(FrameError::SurfaceOutOfDate)
            }
            Err(result) => Err(FrameError::Acquire(result)),
        }
    }

    /// Submit the command buffer recorded for `image_index`
    ///
    /// The index is checked against the current image count before anything
    /// reaches the queue.
    pub fn submit_frame(&mut self, image_index: u32) -> FrameResult<()> {
        if self.state != FrameState::ImageRequested {
            return Err(FrameError::InvalidTransition {
                state: self.state,
                operation: "submit a frame",
            });
        }

        let image_count = self.backend.image_count();
        if image_index >= image_count {
            // The acquired image can no longer be used; only a rebuild recovers.
            self.state = FrameState::Stale;
            return Err(FrameError::ImageIndexOutOfRange { index: image_index, image_count });
        }

        self.backend
            .submit(self.slot, image_index)
            .map_err(FrameError::Submit)?;
        self.state = FrameState::Submitted;
        Ok(())
    }

    /// Present `image_index` and advance the ring
    ///
    /// `Suboptimal` and `OutOfDate` both leave the presenter `Stale`.
    pub fn present_frame(&mut self, image_index: u32) -> FrameResult<PresentStatus> {
        if self.state != FrameState::Submitted {
            return Err(FrameError::InvalidTransition {
                state: self.state,
                operation: "present a frame",
            });
        }

        let result = self.backend.present(self.slot, image_index);
        self.slot = (self.slot + 1) % self.backend.frames_in_flight().max(1);

        let status = match result {
            Ok(false) => PresentStatus::Optimal,
            Ok(true) => PresentStatus::Suboptimal,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => PresentStatus::OutOfDate,
            Err(result) => {
                self.state = FrameState::Idle;
                return Err(FrameError::Present(result));
            }
        };

        match status {
            PresentStatus::Optimal => {
                self.stats.frames_presented += 1;
                self.state = FrameState::Presented;
            }
            PresentStatus::Suboptimal => {
                self.stats.frames_presented += 1;
                self.stats.suboptimal_reports += 1;
                self.state = FrameState::Stale;
            }
            PresentStatus::OutOfDate => {
                self.stats.out_of_date_reports += 1;
                self.state = FrameState::Stale;
            }
        }
        Ok(status)
    }

    /// Wait for the device to go idle, then rebuild the presentation chain
    ///
    /// Not allowed between acquire and present; use
    /// [`request_rebuild`](Self::request_rebuild) there instead. A zero-area
    /// surface returns [`FrameError::SurfaceMinimized`], leaves the presenter
    /// `Stale` and keeps the current chain.
    pub fn rebuild_swapchain(&mut self) -> FrameResult<()> {
        if self.state.is_mid_frame() {
            return Err(FrameError::InvalidTransition {
                state: self.state,
                operation: "rebuild the swap chain",
            });
        }

        let extent = self.resize.take_pending();
        self.backend.wait_idle().map_err(FrameError::DeviceIdle)?;
        let image_count = match self.backend.rebuild_swapchain(extent) {
            Ok(image_count) => image_count,
            Err(VulkanError::ZeroAreaSurface { width, height }) => {
                log::debug!("Deferring swap chain rebuild for {}x{} surface", width, height);
                self.state = FrameState::Stale;
                return Err(FrameError::SurfaceMinimized);
            }
            Err(err) => return Err(FrameError::Rebuild(err)),
        };

        self.rebuild_requested = false;
        self.state = FrameState::Idle;
        self.stats.swapchain_rebuilds += 1;
        log::info!("Swap chain rebuilt with {} images", image_count);
        Ok(())
    }

    /// Rebuild, reporting `false` when the surface has zero area
    fn try_rebuild(&mut self) -> FrameResult<bool> {
        match self.rebuild_swapchain() {
            Ok(()) => Ok(true),
            Err(FrameError::SurfaceMinimized) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Run one frame
    ///
    /// Skips drawing while minimized, rebuilds first when one is owed, then
    /// acquires, submits and presents. A stale present is followed by an
    /// immediate rebuild so the next frame starts from a fresh chain. A
    /// rebuild that meets a zero-area surface skips the frame and is retried
    /// on the next one.
    pub fn draw_frame(&mut self) -> FrameResult<FrameOutcome> {
        if self.resize.is_minimized() {
            return Ok(FrameOutcome::SkippedMinimized);
        }

        if self.rebuild_pending() && !self.try_rebuild()? {
            return Ok(FrameOutcome::SkippedMinimized);
        }

        let image_index = match self.acquire_image() {
            Ok(index) => index,
            Err(FrameError::SurfaceOutOfDate) => {
                return Ok(if self.try_rebuild()? {
                    FrameOutcome::SwapchainRebuilt
                } else {
                    FrameOutcome::SkippedMinimized
                });
            }
            Err(err) => return Err(err),
        };

        self.submit_frame(image_index)?;
        let status = self.present_frame(image_index)?;

        if self.rebuild_pending() {
            self.try_rebuild()?;
        } else {
            self.state = FrameState::Idle;
        }

        Ok(FrameOutcome::Presented { image_index, status })
    }
}
