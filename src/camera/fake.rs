//! In-memory camera used by unit tests.

use std::collections::VecDeque;

use super::control::CameraControl;
use super::types::{
    CameraError, CameraSettings, DrcStrength, Frame, Resolution, WhiteBalanceGains,
    WhiteBalanceMode,
};

/// A scripted camera that records every call made against it.
///
/// Captures are served from `Frame::filled` so tests can tell preview
/// grabs and stills apart by pixel value. Queued errors let tests walk
/// the failure paths without hardware.
#[derive(Debug)]
pub(crate) struct FakeCamera {
    pub preview_running: bool,
    pub sensor_mode: u8,
    pub resolution: Resolution,
    pub wb_mode: WhiteBalanceMode,
    pub wb_gains: WhiteBalanceGains,
    pub iso: Option<u32>,
    pub saturation: Option<i32>,
    pub drc: Option<DrcStrength>,
    pub exposure_compensation: i32,
    /// Every trait call in order, formatted like `set_sensor_mode(2)`
    pub calls: Vec<String>,
    /// Errors served by the next `capture_low_res` calls
    pub low_res_failures: VecDeque<CameraError>,
    /// Errors served by the next `capture_full_res` calls
    pub full_res_failures: VecDeque<CameraError>,
    /// Fill color of preview frames
    pub low_res_fill: [u8; 3],
    /// Fill color of full-resolution stills
    pub full_res_fill: [u8; 3],
}

impl FakeCamera {
    pub(crate) fn new() -> Self {
        let settings = CameraSettings::default();
        Self {
            preview_running: false,
            sensor_mode: settings.preview_sensor_mode,
            resolution: settings.preview_resolution,
            wb_mode: WhiteBalanceMode::Auto,
            wb_gains: WhiteBalanceGains::default(),
            iso: None,
            saturation: None,
            drc: None,
            exposure_compensation: 0,
            calls: Vec::new(),
            low_res_failures: VecDeque::new(),
            full_res_failures: VecDeque::new(),
            low_res_fill: [10, 20, 30],
            full_res_fill: [200, 100, 50],
        }
    }

    /// Position of the first matching call in the journal.
    pub(crate) fn position(&self, call: &str) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }

    fn record(&mut self, call: impl Into<String>) {
        self.calls.push(call.into());
    }
}

impl Default for FakeCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraControl for FakeCamera {
    fn start_preview(&mut self) -> Result<(), CameraError> {
        self.record("start_preview");
        if self.preview_running {
            return Err(CameraError::AlreadyRunning);
        }
        self.preview_running = true;
        Ok(())
    }

    fn stop_preview(&mut self) {
        self.record("stop_preview");
        self.preview_running = false;
    }

    fn is_preview_running(&self) -> bool {
        self.preview_running
    }

    fn preview_frame(&self) -> Option<Frame> {
        if !self.preview_running {
            return None;
        }
        Some(Frame::filled(32, 24, self.low_res_fill))
    }

    fn capture_low_res(&mut self) -> Result<Frame, CameraError> {
        self.record("capture_low_res");
        if let Some(err) = self.low_res_failures.pop_front() {
            return Err(err);
        }
        if !self.preview_running {
            return Err(CameraError::PreviewNotRunning);
        }
        Ok(Frame::filled(32, 24, self.low_res_fill))
    }

    fn capture_full_res(&mut self) -> Result<Frame, CameraError> {
        self.record("capture_full_res");
        if let Some(err) = self.full_res_failures.pop_front() {
            return Err(err);
        }
        if self.preview_running {
            return Err(CameraError::AlreadyRunning);
        }
        Ok(Frame::filled(64, 48, self.full_res_fill))
    }

    fn sensor_mode(&self) -> u8 {
        self.sensor_mode
    }

    fn set_sensor_mode(&mut self, mode: u8) -> Result<(), CameraError> {
        self.record(format!("set_sensor_mode({})", mode));
        self.sensor_mode = mode;
        Ok(())
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn set_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        self.record(format!("set_resolution({})", resolution));
        self.resolution = resolution;
        Ok(())
    }

    fn white_balance_mode(&self) -> WhiteBalanceMode {
        self.wb_mode
    }

    fn set_white_balance_mode(&mut self, mode: WhiteBalanceMode) -> Result<(), CameraError> {
        self.record(format!("set_white_balance_mode({})", mode));
        self.wb_mode = mode;
        Ok(())
    }

    fn white_balance_gains(&self) -> WhiteBalanceGains {
        self.wb_gains
    }

    fn set_white_balance_gains(&mut self, gains: WhiteBalanceGains) -> Result<(), CameraError> {
        self.record(format!(
            "set_white_balance_gains({:.2},{:.2})",
            gains.red, gains.blue
        ));
        self.wb_gains = gains;
        Ok(())
    }

    fn set_iso(&mut self, iso: u32) -> Result<(), CameraError> {
        self.record(format!("set_iso({})", iso));
        self.iso = Some(iso);
        Ok(())
    }

    fn set_saturation(&mut self, saturation: i32) -> Result<(), CameraError> {
        self.record(format!("set_saturation({})", saturation));
        self.saturation = Some(saturation);
        Ok(())
    }

    fn set_drc_strength(&mut self, strength: DrcStrength) -> Result<(), CameraError> {
        self.record(format!("set_drc_strength({})", strength));
        self.drc = Some(strength);
        Ok(())
    }

    fn exposure_compensation(&self) -> i32 {
        self.exposure_compensation
    }

    fn set_exposure_compensation(&mut self, value: i32) -> Result<(), CameraError> {
        self.record(format!("set_exposure_compensation({})", value));
        self.exposure_compensation = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_low_res_requires_preview() {
        let mut camera = FakeCamera::new();
        assert!(matches!(
            camera.capture_low_res(),
            Err(CameraError::PreviewNotRunning)
        ));
    }

    #[test]
    fn test_capture_full_res_requires_stopped_preview() {
        let mut camera = FakeCamera::new();
        camera.start_preview().unwrap();
        assert!(matches!(
            camera.capture_full_res(),
            Err(CameraError::AlreadyRunning)
        ));
        camera.stop_preview();
        assert!(camera.capture_full_res().is_ok());
    }

    #[test]
    fn test_journal_records_call_order() {
        let mut camera = FakeCamera::new();
        camera.start_preview().unwrap();
        camera.set_sensor_mode(2).unwrap();
        camera.stop_preview();
        assert_eq!(
            camera.calls,
            vec!["start_preview", "set_sensor_mode(2)", "stop_preview"]
        );
        assert!(camera.position("start_preview") < camera.position("stop_preview"));
    }

    #[test]
    fn test_queued_failure_is_served_once() {
        let mut camera = FakeCamera::new();
        camera.start_preview().unwrap();
        camera
            .low_res_failures
            .push_back(CameraError::CaptureFailed("scripted".to_string()));
        assert!(camera.capture_low_res().is_err());
        assert!(camera.capture_low_res().is_ok());
    }
}
