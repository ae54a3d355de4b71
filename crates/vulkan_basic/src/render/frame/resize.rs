//! Resize notification bookkeeping
//!
//! Window callbacks only record what happened. The presenter reads the
//! tracker at frame boundaries, so a resize can never re-enter a frame.

use ash::vk;

/// Coalesces framebuffer-size notifications into at most one pending rebuild
#[derive(Debug, Clone, Default)]
pub struct ResizeTracker {
    latest: Option<vk::Extent2D>,
    pending: bool,
    minimized: bool,
    notifications: u64,
}

impl ResizeTracker {
    /// Create a tracker with nothing pending
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a framebuffer size change
    ///
    /// A zero width or height marks the surface minimized and is otherwise
    /// ignored. Any non-zero size replaces the previous one.
    pub fn notify(&mut self, width: u32, height: u32) {
        self.notifications += 1;

        if width == 0 || height == 0 {
            log::debug!("Ignoring zero-area resize {}x{}", width, height);
            self.minimized = true;
            return;
        }

        self.minimized = false;
        self.latest = Some(vk::Extent2D { width, height });
        self.pending = true;
    }

    /// Whether a rebuild is owed
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether the last notification reported a zero-area surface
    pub const fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Most recent non-zero extent, if any was reported
    pub const fn latest_extent(&self) -> Option<vk::Extent2D> {
        self.latest
    }

    /// Notifications received so far, including ignored ones
    pub const fn notification_count(&self) -> u64 {
        self.notifications
    }

    /// Clear the pending flag and return the extent to rebuild for
    pub fn take_pending(&mut self) -> Option<vk::Extent2D> {
        if std::mem::take(&mut self.pending) {
            self.latest
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_is_ignored() {
        let mut tracker = ResizeTracker::new();
        tracker.notify(0, 0);
        assert!(tracker.is_minimized());
        assert!(!tracker.is_pending());

        tracker.notify(640, 0);
        assert!(!tracker.is_pending());
        assert_eq!(tracker.take_pending(), None);
    }

    #[test]
    fn test_restore_after_minimize_schedules_one_rebuild() {
        let mut tracker = ResizeTracker::new();
        tracker.notify(0, 0);
        tracker.notify(1024, 768);

        assert!(!tracker.is_minimized());
        assert_eq!(tracker.take_pending(), Some(vk::Extent2D { width: 1024, height: 768 }));
        assert_eq!(tracker.take_pending(), None);
    }

    #[test]
    fn test_bursts_coalesce_to_latest() {
        let mut tracker = ResizeTracker::new();
        for width in [801, 802, 803, 900] {
            tracker.notify(width, 600);
        }
        assert_eq!(tracker.notification_count(), 4);
        assert_eq!(tracker.take_pending(), Some(vk::Extent2D { width: 900, height: 600 }));
        assert!(!tracker.is_pending());
        assert_eq!(tracker.latest_extent(), Some(vk::Extent2D { width: 900, height: 600 }));
    }
}
