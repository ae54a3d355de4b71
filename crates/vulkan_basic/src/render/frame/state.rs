//! Frame states and per-frame results

/// Where the presenter is within the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Ready to acquire the next image
    Idle,
    /// An image index was acquired and "image available" will be signaled
    ImageRequested,
    /// The command buffer for the acquired image was submitted
    Submitted,
    /// The image was queued for presentation
    Presented,
    /// The swap chain no longer matches the surface and must be rebuilt
    Stale,
}

impl FrameState {
    /// True between a successful acquire and the matching present
    pub const fn is_mid_frame(self) -> bool {
        matches!(self, Self::ImageRequested | Self::Submitted)
    }
}

/// How the surface judged a presented image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    /// Swap chain matches the surface exactly
    Optimal,
    /// Presented, but the swap chain should be rebuilt
    Suboptimal,
    /// Not presented; the swap chain must be rebuilt
    OutOfDate,
}

impl PresentStatus {
    /// Whether this status schedules a rebuild
    pub const fn needs_rebuild(self) -> bool {
        !matches!(self, Self::Optimal)
    }
}

/// Result of one [`draw_frame`](super::FramePresenter::draw_frame) call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame went through acquire, submit and present
    Presented {
        /// Swap chain image that was drawn
        image_index: u32,
        /// Surface verdict from the present call
        status: PresentStatus,
    },
    /// The surface was out of date at acquire; the chain was rebuilt and
    /// drawing resumes next frame
    SwapchainRebuilt,
    /// The surface has zero area; nothing was drawn
    SkippedMinimized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mid_frame_states() {
        assert!(FrameState::ImageRequested.is_mid_frame());
        assert!(FrameState::Submitted.is_mid_frame());
        assert!(!FrameState::Idle.is_mid_frame());
        assert!(!FrameState::Presented.is_mid_frame());
        assert!(!FrameState::Stale.is_mid_frame());
    }

    #[test]
    fn test_only_optimal_skips_rebuild() {
        assert!(!PresentStatus::Optimal.needs_rebuild());
        assert!(PresentStatus::Suboptimal.needs_rebuild());
        assert!(PresentStatus::OutOfDate.needs_rebuild());
    }
}
