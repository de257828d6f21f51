//! Camera access for the capture session.
//!
//! This module provides a high-level API for camera operations:
//! - Device enumeration via [`list_devices`]
//! - The control surface the rest of the app programs against, [`CameraControl`]
//! - The nokhwa-backed implementation, [`NokhwaCamera`]
//! - Configuration via [`CameraSettings`] and [`Resolution`]

mod control;
mod device;
mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use control::CameraControl;
pub use device::{list_devices, NokhwaCamera};
pub use types::{
    CameraError, CameraInfo, CameraSettings, DrcStrength, Frame, FrameFormat, Resolution,
    WhiteBalanceGains, WhiteBalanceMode,
};
