//! The narrow camera interface the rest of the app depends on.

use std::fmt::Debug;

use super::types::{
    CameraError, DrcStrength, Frame, Resolution, WhiteBalanceGains, WhiteBalanceMode,
};

/// Everything the capture loop needs from a camera.
///
/// The production implementation is [`super::NokhwaCamera`]; tests substitute
/// a fake. Parameter setters forward values to the driver without validating
/// them first - out-of-range values are the driver's problem, and rejections
/// are logged rather than surfaced. Getters report the adapter's view of the
/// parameter set, which is authoritative for this process since nothing else
/// touches the device.
pub trait CameraControl: Debug {
    /// Start the live preview stream.
    fn start_preview(&mut self) -> Result<(), CameraError>;

    /// Stop the live preview stream. No-op when not running.
    fn stop_preview(&mut self);

    /// Whether the preview stream is currently running.
    fn is_preview_running(&self) -> bool;

    /// Latest frame from the running preview, if one has arrived yet.
    fn preview_frame(&self) -> Option<Frame>;

    /// Grab a frame through the fast streaming path.
    ///
    /// Requires a running preview; used for the low-resolution shot.
    fn capture_low_res(&mut self) -> Result<Frame, CameraError>;

    /// Grab a frame through the slow still path at the current resolution.
    ///
    /// Used for the archival shot while the preview is stopped.
    fn capture_full_res(&mut self) -> Result<Frame, CameraError>;

    fn sensor_mode(&self) -> u8;
    fn set_sensor_mode(&mut self, mode: u8) -> Result<(), CameraError>;

    fn resolution(&self) -> Resolution;
    fn set_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError>;

    fn white_balance_mode(&self) -> WhiteBalanceMode;
    fn set_white_balance_mode(&mut self, mode: WhiteBalanceMode) -> Result<(), CameraError>;

    fn white_balance_gains(&self) -> WhiteBalanceGains;
    fn set_white_balance_gains(&mut self, gains: WhiteBalanceGains) -> Result<(), CameraError>;

    fn set_iso(&mut self, iso: u32) -> Result<(), CameraError>;

    fn set_saturation(&mut self, saturation: i32) -> Result<(), CameraError>;

    fn set_drc_strength(&mut self, strength: DrcStrength) -> Result<(), CameraError>;

    fn exposure_compensation(&self) -> i32;
    fn set_exposure_compensation(&mut self, value: i32) -> Result<(), CameraError>;
}
