//! Presentation loop behavior against the headless backend
//!
//! Drives a [`FramePresenter`] through resizes, stale surfaces and long runs
//! and checks the resource bookkeeping the backend keeps.

use ash::vk;
use vulkan_basic::render::frame::{
    FrameError, FrameOutcome, FramePresenter, FrameState, HeadlessBackend, PresentStatus,
    PresentationBackend,
};

fn extent(width: u32, height: u32) -> vk::Extent2D {
    vk::Extent2D { width, height }
}

fn presenter(min_images: u32, max_images: u32, frames_in_flight: usize) -> FramePresenter<HeadlessBackend> {
    let backend = HeadlessBackend::new(
        HeadlessBackend::capabilities(min_images, max_images, extent(800, 600)),
        extent(800, 600),
        frames_in_flight,
    )
    .unwrap();
    FramePresenter::new(backend)
}

fn assert_chain_intact(presenter: &FramePresenter<HeadlessBackend>) {
    let backend = presenter.backend();
    assert!(backend.resource_counts().is_consistent());
    assert_eq!(backend.resource_counts().images, backend.image_count() as usize);
    assert_eq!(
        backend.live_objects(),
        HeadlessBackend::chain_object_count(backend.image_count())
    );
    assert_eq!(backend.validation_errors(), 0);
}

#[test]
fn test_counts_stay_consistent_across_rebuild_triggers() {
    let mut presenter = presenter(2, 4, 2);
    assert_chain_intact(&presenter);

    presenter.notify_resize(1024, 768);
    presenter.draw_frame().unwrap();
    assert_eq!(presenter.backend().extent(), extent(1024, 768));
    assert_chain_intact(&presenter);

    presenter
        .backend_mut()
        .script_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR));
    assert_eq!(presenter.draw_frame().unwrap(), FrameOutcome::SwapchainRebuilt);
    assert_chain_intact(&presenter);

    presenter.backend_mut().script_present(Ok(true));
    assert!(matches!(
        presenter.draw_frame().unwrap(),
        FrameOutcome::Presented { status: PresentStatus::Suboptimal, .. }
    ));
    assert_chain_intact(&presenter);

    presenter
        .backend_mut()
        .script_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR));
    assert!(matches!(
        presenter.draw_frame().unwrap(),
        FrameOutcome::Presented { status: PresentStatus::OutOfDate, .. }
    ));
    assert_chain_intact(&presenter);

    assert_eq!(presenter.stats().swapchain_rebuilds, 4);
}

#[test]
fn test_back_to_back_rebuilds_leave_one_chain() {
    let mut presenter = presenter(2, 3, 2);
    let image_count = presenter.backend().image_count();

    for _ in 0..5 {
        presenter.rebuild_swapchain().unwrap();
        assert_eq!(presenter.state(), FrameState::Idle);
        assert_eq!(presenter.backend().image_count(), image_count);
        assert_chain_intact(&presenter);
    }

    assert_eq!(presenter.backend().idle_waits(), 5);
    assert!(matches!(presenter.draw_frame().unwrap(), FrameOutcome::Presented { .. }));
}

#[test]
fn test_minimize_then_restore_rebuilds_once() {
    let mut presenter = presenter(2, 3, 2);
    presenter.draw_frame().unwrap();

    presenter.notify_resize(0, 0);
    for _ in 0..3 {
        assert_eq!(presenter.draw_frame().unwrap(), FrameOutcome::SkippedMinimized);
    }
    assert_eq!(presenter.stats().swapchain_rebuilds, 0);

    presenter.notify_resize(640, 360);
    for _ in 0..3 {
        assert!(matches!(
            presenter.draw_frame().unwrap(),
            FrameOutcome::Presented { status: PresentStatus::Optimal, .. }
        ));
    }

    assert_eq!(presenter.stats().swapchain_rebuilds, 1);
    assert_eq!(presenter.backend().extent(), extent(640, 360));
    assert_chain_intact(&presenter);
}

#[test]
fn test_out_of_range_image_is_never_submitted() {
    let mut presenter = presenter(2, 3, 2);
    let image_count = presenter.backend().image_count();
    presenter.backend_mut().script_acquire(Ok((image_count + 4, false)));

    assert!(matches!(
        presenter.draw_frame(),
        Err(FrameError::ImageIndexOutOfRange { index, image_count: count })
            if index == image_count + 4 && count == image_count
    ));
    assert_eq!(presenter.state(), FrameState::Stale);
    assert!(presenter.backend().submissions().is_empty());
    assert_eq!(presenter.backend().present_calls(), 0);

    // The next frame rebuilds and draws normally.
    assert!(matches!(
        presenter.draw_frame().unwrap(),
        FrameOutcome::Presented { status: PresentStatus::Optimal, .. }
    ));
    assert_eq!(presenter.stats().swapchain_rebuilds, 1);
    assert!(presenter
        .backend()
        .submissions()
        .iter()
        .all(|&index| index < image_count));
    assert_chain_intact(&presenter);
}

#[test]
fn test_two_image_chain_cycles_cleanly() {
    let mut presenter = presenter(2, 2, 1);
    assert_eq!(presenter.backend().image_count(), 2);

    for _ in 0..8 {
        let outcome = presenter.draw_frame().unwrap();
        assert!(matches!(
            outcome,
            FrameOutcome::Presented { status: PresentStatus::Optimal, .. }
        ));
        assert!(!presenter.backend().any_semaphore_signaled());
    }

    assert_eq!(presenter.backend().submissions(), &[0, 1, 0, 1, 0, 1, 0, 1]);
    assert_eq!(presenter.stats().frames_presented, 8);
    assert_eq!(presenter.stats().swapchain_rebuilds, 0);
    assert_chain_intact(&presenter);
}

#[test]
fn test_thousand_clean_cycles_keep_counts_stable() {
    let mut presenter = presenter(2, 3, 2);
    let image_count = presenter.backend().image_count();

    for _ in 0..1000 {
        assert!(matches!(
            presenter.draw_frame().unwrap(),
            FrameOutcome::Presented { status: PresentStatus::Optimal, .. }
        ));
        assert_eq!(presenter.backend().image_count(), image_count);
        assert_chain_intact(&presenter);
        assert!(!presenter.backend().any_semaphore_signaled());
    }

    assert_eq!(presenter.stats().frames_presented, 1000);
    assert_eq!(presenter.stats().swapchain_rebuilds, 0);
}

#[test]
fn test_steady_frames_never_drain_the_device() {
    let mut presenter = presenter(2, 4, 2);

    for _ in 0..100 {
        presenter.draw_frame().unwrap();
    }

    // Only the slot about to be reused is waited on.
    assert_eq!(presenter.backend().idle_waits(), 0);
    assert_eq!(presenter.backend().slot_waits(), 100);
}

#[test]
fn test_first_frame_after_resize_uses_new_extent() {
    let mut presenter = presenter(2, 3, 2);
    presenter.draw_frame().unwrap();

    presenter.notify_resize(1024, 768);
    presenter.draw_frame().unwrap();

    assert_eq!(
        presenter.backend().submitted_extents(),
        &[extent(800, 600), extent(1024, 768)]
    );
}

#[test]
fn test_minimized_before_acquire_recovers_on_restore() {
    let mut presenter = presenter(2, 3, 2);
    presenter.draw_frame().unwrap();

    presenter
        .backend_mut()
        .set_capabilities(HeadlessBackend::capabilities(2, 3, extent(0, 0)));
    presenter
        .backend_mut()
        .script_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR));
    for _ in 0..3 {
        assert_eq!(presenter.draw_frame().unwrap(), FrameOutcome::SkippedMinimized);
        assert_chain_intact(&presenter);
    }
    assert_eq!(presenter.stats().swapchain_rebuilds, 0);

    presenter.notify_resize(0, 0);
    presenter
        .backend_mut()
        .set_capabilities(HeadlessBackend::capabilities(2, 3, extent(640, 480)));
    presenter.notify_resize(640, 480);

    assert!(matches!(
        presenter.draw_frame().unwrap(),
        FrameOutcome::Presented { status: PresentStatus::Optimal, .. }
    ));
    assert_eq!(presenter.stats().swapchain_rebuilds, 1);
    assert_eq!(presenter.backend().extent(), extent(640, 480));
    assert_chain_intact(&presenter);
}

#[test]
fn test_long_run_with_periodic_disruption() {
    let mut presenter = presenter(2, 4, 2);
    let mut skipped = 0;

    for frame in 0..1000u32 {
        match frame % 100 {
            10 => presenter.notify_resize(800 + frame % 300, 600),
            30 => presenter
                .backend_mut()
                .script_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)),
            50 => presenter.backend_mut().script_present(Ok(true)),
            70 => presenter.notify_resize(0, 0),
            75 => presenter.notify_resize(800, 600),
            _ => {}
        }

        match presenter.draw_frame().unwrap() {
            FrameOutcome::SkippedMinimized => skipped += 1,
            FrameOutcome::Presented { .. } | FrameOutcome::SwapchainRebuilt => {}
        }
        assert!(!presenter.state().is_mid_frame());
    }

    // Frames 70..=74 of every hundred are minimized.
    assert_eq!(skipped, 50);
    assert_eq!(presenter.stats().swapchain_rebuilds, 40);
    assert_eq!(presenter.stats().out_of_date_reports, 10);
    assert!(!presenter.backend().any_semaphore_signaled());
    assert_chain_intact(&presenter);
}
