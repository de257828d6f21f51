//! Frame capture and deletion.
//!
//! Capturing one frame is a two-stage affair: a quick grab from the
//! running preview stream gives the low-resolution frame that playback,
//! onion-skinning, and the encoder use, then the camera is switched to
//! its still configuration for a full-quality shot and switched back.
//! White balance is frozen across the switch so the still matches the
//! preview's color.

use std::thread;
use std::time::Duration;

use crate::camera::{CameraControl, CameraError, CameraSettings, Resolution, WhiteBalanceMode};
use crate::session::SessionState;
use crate::store::{FrameStore, StorageError};

/// How a capture can fail.
///
/// Camera failures are fatal to the session. Storage failures are
/// recoverable: the frame counter is rolled back so session state and
/// files on disk stay consistent, and the user is told.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Camera failure: {0}")]
    Camera(#[from] CameraError),

    #[error("Frame {index} could not be stored: {source}")]
    Storage {
        /// 1-based index of the frame that was being written
        index: u32,
        source: StorageError,
    },
}

/// Camera configuration a capture switches between.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub preview_sensor_mode: u8,
    pub still_sensor_mode: u8,
    pub preview_resolution: Resolution,
    pub still_resolution: Resolution,
    /// Pause after reconfiguring the sensor, letting it settle before
    /// gains are applied and again before the shot
    pub settle: Duration,
}

impl CaptureConfig {
    pub fn from_settings(settings: &CameraSettings, settle: Duration) -> Self {
        Self {
            preview_sensor_mode: settings.preview_sensor_mode,
            still_sensor_mode: settings.still_sensor_mode,
            preview_resolution: settings.preview_resolution,
            still_resolution: settings.still_resolution,
            settle,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::from_settings(&CameraSettings::default(), Duration::from_millis(800))
    }
}

/// Capture the next frame of the animation.
///
/// Increments the frame counter, grabs a low-resolution frame from the
/// preview stream, writes it, reloads it as the onion-skin frame, then
/// interrupts the preview for a full-resolution still at the same index.
/// The preview is restored afterwards even when the still fails.
///
/// Returns the 1-based index of the captured frame.
pub fn take_frame(
    camera: &mut dyn CameraControl,
    store: &FrameStore,
    session: &mut SessionState,
    config: &CaptureConfig,
) -> Result<u32, CaptureError> {
    let index = session.increment();

    let low = camera.capture_low_res()?;
    if let Err(source) = store.save_low_res(index, &low) {
        session.decrement();
        return Err(CaptureError::Storage { index, source });
    }
    // Reload from disk rather than reusing the buffer, so the onion skin
    // shows exactly what the encoder will see
    match store.load_low_res(index) {
        Ok(frame) => session.set_last_frame(frame),
        Err(source) => {
            session.decrement();
            return Err(CaptureError::Storage { index, source });
        }
    }

    // Freeze color before the mode switch: gains must be read while the
    // preview configuration is still live
    let wb_mode = camera.white_balance_mode();
    let wb_gains = camera.white_balance_gains();
    camera.set_white_balance_mode(WhiteBalanceMode::Off)?;

    camera.stop_preview();
    camera.set_sensor_mode(config.still_sensor_mode)?;
    camera.set_resolution(config.still_resolution)?;
    thread::sleep(config.settle);
    camera.set_white_balance_gains(wb_gains)?;
    thread::sleep(config.settle);

    let still = capture_still(camera, store, index);
    if matches!(still, Err(CaptureError::Storage { .. })) {
        session.decrement();
        refresh_last_frame(store, session);
    }

    camera.set_sensor_mode(config.preview_sensor_mode)?;
    camera.set_resolution(config.preview_resolution)?;
    camera.set_white_balance_mode(wb_mode)?;
    camera.start_preview()?;

    still?;
    Ok(index)
}

fn capture_still(
    camera: &mut dyn CameraControl,
    store: &FrameStore,
    index: u32,
) -> Result<(), CaptureError> {
    let frame = camera.capture_full_res()?;
    store
        .save_full_res(index, &frame)
        .map_err(|source| CaptureError::Storage { index, source })
}

/// Drop the most recent frame.
///
/// Only the counter moves; no file is removed. The next capture at this
/// index overwrites the abandoned files. A session with no frames is
/// left untouched.
pub fn delete_last_frame(store: &FrameStore, session: &mut SessionState) {
    if session.frame_count() == 0 {
        return;
    }
    session.decrement();
    refresh_last_frame(store, session);
}

/// Point the onion-skin frame at the current top of the counter, or
/// blank it when the counter is at zero.
fn refresh_last_frame(store: &FrameStore, session: &mut SessionState) {
    let count = session.frame_count();
    if count == 0 {
        session.clear_last_frame();
        return;
    }
    match store.load_low_res(count) {
        Ok(frame) => session.set_last_frame(frame),
        Err(e) => {
            log::warn!("could not reload frame {}: {}", count, e);
            session.clear_last_frame();
        }
    }
}
