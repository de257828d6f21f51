//! Device enumeration and the nokhwa-backed camera implementation.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, ControlValueSetter, FrameFormat as NokhwaFrameFormat,
    KnownCameraControl, RequestedFormat, RequestedFormatType,
};
use nokhwa::{query, Camera};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::control::CameraControl;
use super::types::{
    CameraError, CameraInfo, CameraSettings, DrcStrength, Frame, Resolution, WhiteBalanceGains,
    WhiteBalanceMode,
};

// V4L2 control ids forwarded through nokhwa's Other() escape hatch.
const V4L2_CID_AUTO_WHITE_BALANCE: u128 = 0x0098_090c;
const V4L2_CID_RED_BALANCE: u128 = 0x0098_090e;
const V4L2_CID_BLUE_BALANCE: u128 = 0x0098_090f;
const V4L2_CID_WHITE_BALANCE_TEMPERATURE: u128 = 0x0098_091a;
const V4L2_CID_AUTO_EXPOSURE_BIAS: u128 = 0x009a_0913;
const V4L2_CID_ISO_SENSITIVITY: u128 = 0x009a_0917;
const V4L2_CID_ISO_SENSITIVITY_AUTO: u128 = 0x009a_0918;

/// How long `capture_low_res` waits for the preview stream to deliver
/// a frame before giving up.
const LOW_RES_FRAME_TIMEOUT: Duration = Duration::from_secs(2);

/// List all available camera devices on the system.
///
/// Returns a vector of `CameraInfo` structs, or an error if querying fails.
/// If no cameras are found, returns an empty vector (not an error).
pub fn list_devices() -> Result<Vec<CameraInfo>, CameraError> {
    let devices = query(ApiBackend::Auto).map_err(|e| CameraError::QueryFailed(e.to_string()))?;

    Ok(devices
        .into_iter()
        .map(|d| CameraInfo {
            index: d.index().as_index().unwrap_or(0),
            name: d.human_name(),
            description: d.description().to_string(),
        })
        .collect())
}

/// Convert a nokhwa buffer to our RGB Frame format.
///
/// Handles the camera's native format (MJPEG, YUYV, NV12, etc.) via
/// nokhwa's built-in decode. Returns `None` if the conversion fails.
fn convert_to_rgb(buffer: &nokhwa::Buffer) -> Option<Frame> {
    let decoded = buffer.decode_image::<RgbFormat>().ok()?;
    let resolution = buffer.resolution();

    Some(Frame {
        data: decoded.into_raw(),
        width: resolution.width(),
        height: resolution.height(),
        format: super::types::FrameFormat::Rgb,
        timestamp: Instant::now(),
    })
}

/// A parameter change pushed to whichever Camera handle is live.
#[derive(Debug, Clone)]
enum ControlPush {
    WhiteBalanceMode(WhiteBalanceMode),
    WhiteBalanceGains(WhiteBalanceGains),
    Iso(u32),
    Saturation(i32),
    Drc(DrcStrength),
    ExposureCompensation(i32),
}

/// Commands sent to the preview pump thread.
enum PumpCommand {
    Apply(ControlPush),
    Stop,
}

/// The adapter's view of the camera parameter set.
///
/// Getters answer from here. V4L2 read-back is unreliable across drivers,
/// and nothing else in the process touches the device, so the last value
/// written is the truth.
#[derive(Debug, Clone)]
struct ParamState {
    sensor_mode: u8,
    resolution: Resolution,
    wb_mode: WhiteBalanceMode,
    wb_gains: WhiteBalanceGains,
    iso: u32,
    saturation: i32,
    drc: DrcStrength,
    exposure_compensation: i32,
}

impl ParamState {
    fn new(settings: &CameraSettings) -> Self {
        Self {
            sensor_mode: settings.preview_sensor_mode,
            resolution: settings.preview_resolution,
            wb_mode: WhiteBalanceMode::Auto,
            wb_gains: WhiteBalanceGains::default(),
            iso: 0,
            saturation: 0,
            drc: DrcStrength::Off,
            exposure_compensation: 0,
        }
    }

    /// Everything that should be re-applied when a Camera handle opens.
    fn pushes(&self) -> Vec<ControlPush> {
        vec![
            ControlPush::WhiteBalanceMode(self.wb_mode),
            ControlPush::WhiteBalanceGains(self.wb_gains),
            ControlPush::Iso(self.iso),
            ControlPush::Saturation(self.saturation),
            ControlPush::Drc(self.drc),
            ControlPush::ExposureCompensation(self.exposure_compensation),
        ]
    }
}

/// Camera implementation over nokhwa.
///
/// The live preview runs a pump thread that continuously captures frames
/// into a shared buffer, the way the driver's own hardware overlay would.
/// The Camera handle lives inside that thread; parameter changes made while
/// the preview runs are forwarded over a channel. Full-resolution stills
/// open a separate short-lived handle at the still resolution, which is why
/// the preview must be stopped first.
pub struct NokhwaCamera {
    /// Latest preview frame (shared with the pump thread)
    frame_buffer: Arc<Mutex<Option<Frame>>>,
    /// Pump thread handle
    preview_thread: Option<JoinHandle<()>>,
    /// Channel to the pump thread
    command_tx: Option<Sender<PumpCommand>>,
    /// Signal to stop the pump thread
    stop_signal: Arc<AtomicBool>,
    /// Settings the camera was opened with
    settings: CameraSettings,
    /// Shadowed parameter state
    params: ParamState,
    /// Actual resolution (set after the preview opens)
    actual_resolution: Option<Resolution>,
    /// Actual FPS (set after the preview opens)
    actual_fps: Option<u32>,
}

impl std::fmt::Debug for NokhwaCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NokhwaCamera")
            .field("settings", &self.settings)
            .field("params", &self.params)
            .field("is_preview_running", &self.is_preview_running())
            .finish_non_exhaustive()
    }
}

impl NokhwaCamera {
    /// Open a camera with the specified settings.
    ///
    /// This validates that the camera exists but doesn't open the stream
    /// until `start_preview()` is called. The Camera handle is created
    /// inside the pump thread to avoid thread-safety issues.
    ///
    /// # Errors
    /// * `CameraError::DeviceNotFound` - If the device index doesn't exist
    pub fn open(settings: CameraSettings) -> Result<Self, CameraError> {
        let devices = list_devices()?;
        if !devices.iter().any(|d| d.index == settings.device_index) {
            return Err(CameraError::DeviceNotFound(settings.device_index));
        }

        let params = ParamState::new(&settings);
        Ok(Self {
            frame_buffer: Arc::new(Mutex::new(None)),
            preview_thread: None,
            command_tx: None,
            stop_signal: Arc::new(AtomicBool::new(false)),
            settings,
            params,
            actual_resolution: None,
            actual_fps: None,
        })
    }

    /// Get the settings the camera was opened with.
    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Get the actual resolution the preview stream is using.
    ///
    /// Returns `None` until the preview has been started. May differ from
    /// the requested resolution if the camera doesn't support it exactly.
    pub fn actual_resolution(&self) -> Option<Resolution> {
        self.actual_resolution
    }

    /// Get the actual frame rate the preview stream is using.
    pub fn actual_fps(&self) -> Option<u32> {
        self.actual_fps
    }

    /// Push a parameter change to the pump thread if it is running.
    fn push_control(&self, push: ControlPush) {
        if let Some(tx) = &self.command_tx {
            let _ = tx.send(PumpCommand::Apply(push));
        }
    }
}

impl CameraControl for NokhwaCamera {
    fn start_preview(&mut self) -> Result<(), CameraError> {
        if self.is_preview_running() {
            return Err(CameraError::AlreadyRunning);
        }

        self.stop_signal.store(false, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel();
        self.command_tx = Some(tx);

        let buffer = Arc::clone(&self.frame_buffer);
        let stop = Arc::clone(&self.stop_signal);
        let device_index = self.settings.device_index;
        let resolution = self.params.resolution;
        let fps = self.settings.fps;
        let initial = self.params.pushes();

        // Channel to receive actual resolution/fps from the thread
        let (info_tx, info_rx) = mpsc::channel::<Result<(Resolution, u32), CameraError>>();

        let handle = thread::spawn(move || {
            run_preview_pump(device_index, resolution, fps, initial, buffer, stop, rx, info_tx);
        });

        self.preview_thread = Some(handle);

        // Wait for the thread to report success or failure
        match info_rx.recv() {
            Ok(Ok((res, fps))) => {
                self.actual_resolution = Some(res);
                self.actual_fps = Some(fps);
                Ok(())
            }
            Ok(Err(e)) => {
                self.stop_signal.store(true, Ordering::SeqCst);
                if let Some(h) = self.preview_thread.take() {
                    let _ = h.join();
                }
                Err(e)
            }
            Err(_) => {
                self.stop_signal.store(true, Ordering::SeqCst);
                if let Some(h) = self.preview_thread.take() {
                    let _ = h.join();
                }
                Err(CameraError::StreamFailed(
                    "Preview thread terminated unexpectedly".to_string(),
                ))
            }
        }
    }

    fn stop_preview(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);

        // Also send stop via channel in case the thread is blocked
        if let Some(tx) = self.command_tx.take() {
            let _ = tx.send(PumpCommand::Stop);
        }

        if let Some(handle) = self.preview_thread.take() {
            let _ = handle.join();
        }

        // A stale frame from a closed stream should not be served later
        if let Ok(mut buf) = self.frame_buffer.lock() {
            *buf = None;
        }
    }

    fn is_preview_running(&self) -> bool {
        self.preview_thread
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    fn preview_frame(&self) -> Option<Frame> {
        let buffer = self.frame_buffer.lock().ok()?;
        buffer.clone()
    }

    fn capture_low_res(&mut self) -> Result<Frame, CameraError> {
        if !self.is_preview_running() {
            return Err(CameraError::PreviewNotRunning);
        }

        // The pump may not have delivered its first frame yet
        let deadline = Instant::now() + LOW_RES_FRAME_TIMEOUT;
        loop {
            if let Some(frame) = self.preview_frame() {
                return Ok(frame);
            }
            if Instant::now() >= deadline {
                return Err(CameraError::CaptureFailed(
                    "No frame arrived from the preview stream".to_string(),
                ));
            }
            thread::sleep(Duration::from_millis(20));
        }
    }

    fn capture_full_res(&mut self) -> Result<Frame, CameraError> {
        if self.is_preview_running() {
            // The device can't serve two handles; stills need it exclusively
            return Err(CameraError::AlreadyRunning);
        }

        let index = CameraIndex::Index(self.settings.device_index);
        let mut camera = open_camera_with_fallback(&index, self.params.resolution, self.settings.fps)?;

        camera
            .open_stream()
            .map_err(|e| CameraError::StreamFailed(e.to_string()))?;

        for push in self.params.pushes() {
            apply_control(&mut camera, &push);
        }

        // The first frames after open are often underexposed while the
        // sensor's auto-exposure converges
        for _ in 0..2 {
            let _ = camera.frame();
        }

        let frame = camera
            .frame()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))
            .and_then(|buf| {
                convert_to_rgb(&buf).ok_or_else(|| {
                    CameraError::CaptureFailed("Could not decode still frame".to_string())
                })
            });

        let _ = camera.stop_stream();
        frame
    }

    fn sensor_mode(&self) -> u8 {
        self.params.sensor_mode
    }

    fn set_sensor_mode(&mut self, mode: u8) -> Result<(), CameraError> {
        // Webcams don't expose numbered sensor modes; the value still
        // selects which resolution the next stream open will request
        log::debug!("sensor mode -> {}", mode);
        self.params.sensor_mode = mode;
        Ok(())
    }

    fn resolution(&self) -> Resolution {
        self.params.resolution
    }

    fn set_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        log::debug!("resolution -> {}", resolution);
        self.params.resolution = resolution;
        Ok(())
    }

    fn white_balance_mode(&self) -> WhiteBalanceMode {
        self.params.wb_mode
    }

    fn set_white_balance_mode(&mut self, mode: WhiteBalanceMode) -> Result<(), CameraError> {
        self.params.wb_mode = mode;
        self.push_control(ControlPush::WhiteBalanceMode(mode));
        Ok(())
    }

    fn white_balance_gains(&self) -> WhiteBalanceGains {
        self.params.wb_gains
    }

    fn set_white_balance_gains(&mut self, gains: WhiteBalanceGains) -> Result<(), CameraError> {
        self.params.wb_gains = gains;
        self.push_control(ControlPush::WhiteBalanceGains(gains));
        Ok(())
    }

    fn set_iso(&mut self, iso: u32) -> Result<(), CameraError> {
        self.params.iso = iso;
        self.push_control(ControlPush::Iso(iso));
        Ok(())
    }

    fn set_saturation(&mut self, saturation: i32) -> Result<(), CameraError> {
        self.params.saturation = saturation;
        self.push_control(ControlPush::Saturation(saturation));
        Ok(())
    }

    fn set_drc_strength(&mut self, strength: DrcStrength) -> Result<(), CameraError> {
        self.params.drc = strength;
        self.push_control(ControlPush::Drc(strength));
        Ok(())
    }

    fn exposure_compensation(&self) -> i32 {
        self.params.exposure_compensation
    }

    fn set_exposure_compensation(&mut self, value: i32) -> Result<(), CameraError> {
        self.params.exposure_compensation = value;
        self.push_control(ControlPush::ExposureCompensation(value));
        Ok(())
    }
}

impl Drop for NokhwaCamera {
    fn drop(&mut self) {
        self.stop_preview();
    }
}

/// Run the preview pump in a background thread.
#[allow(clippy::too_many_arguments)]
fn run_preview_pump(
    device_index: u32,
    resolution: Resolution,
    fps: u32,
    initial: Vec<ControlPush>,
    buffer: Arc<Mutex<Option<Frame>>>,
    stop: Arc<AtomicBool>,
    rx: Receiver<PumpCommand>,
    info_tx: Sender<Result<(Resolution, u32), CameraError>>,
) {
    let index = CameraIndex::Index(device_index);

    let mut camera = match open_camera_with_fallback(&index, resolution, fps) {
        Ok(cam) => cam,
        Err(e) => {
            let _ = info_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = info_tx.send(Err(CameraError::StreamFailed(e.to_string())));
        return;
    }

    for push in &initial {
        apply_control(&mut camera, push);
    }

    // Send back the actual resolution and fps
    let res = camera.resolution();
    let actual_res = Resolution {
        width: res.width(),
        height: res.height(),
    };
    let actual_fps = camera.frame_rate();
    let _ = info_tx.send(Ok((actual_res, actual_fps)));

    while !stop.load(Ordering::Relaxed) {
        // Drain commands (non-blocking)
        let mut stopped = false;
        while let Ok(cmd) = rx.try_recv() {
            match cmd {
                PumpCommand::Apply(push) => apply_control(&mut camera, &push),
                PumpCommand::Stop => {
                    stopped = true;
                    break;
                }
            }
        }
        if stopped {
            break;
        }

        if let Ok(raw_frame) = camera.frame() {
            if let Some(frame) = convert_to_rgb(&raw_frame) {
                if let Ok(mut buf) = buffer.lock() {
                    *buf = Some(frame);
                }
            }
            // Conversion failures skip the frame; the next one will land
        }

        // Small sleep to allow checking the stop signal
        thread::sleep(Duration::from_millis(1));
    }

    let _ = camera.stop_stream();
}

/// Try to open a camera with multiple format fallback strategies.
fn open_camera_with_fallback(
    index: &CameraIndex,
    resolution: Resolution,
    fps: u32,
) -> Result<Camera, CameraError> {
    // In order of preference:
    // 1. Closest match with NV12 (common on macOS)
    // 2. Closest match with MJPEG (widely supported)
    // 3. Highest resolution available (let the camera decide format)
    let format_attempts: Vec<RequestedFormat> = vec![
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            nokhwa::utils::Resolution::new(resolution.width, resolution.height),
            NokhwaFrameFormat::NV12,
            fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            nokhwa::utils::Resolution::new(resolution.width, resolution.height),
            NokhwaFrameFormat::MJPEG,
            fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution),
    ];

    let mut last_error = None;

    for requested in format_attempts {
        match Camera::new(index.clone(), requested) {
            Ok(cam) => return Ok(cam),
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        }
    }

    let msg = match last_error {
        Some(e) => e.to_string(),
        None => "No camera formats to request".to_string(),
    };
    let lower = msg.to_lowercase();
    if lower.contains("permission")
        || lower.contains("denied")
        || lower.contains("authorization")
        || lower.contains("access")
    {
        Err(CameraError::PermissionDenied)
    } else {
        Err(CameraError::OpenFailed(msg))
    }
}

/// Apply one parameter push to a live Camera handle.
///
/// Rejections are logged at warn level and otherwise ignored - unsupported
/// values are left to the driver, same as the exposure guard's contract.
fn apply_control(camera: &mut Camera, push: &ControlPush) {
    let result = match push {
        ControlPush::WhiteBalanceMode(mode) => apply_white_balance_mode(camera, *mode),
        ControlPush::WhiteBalanceGains(gains) => {
            // Driver units are device specific; forwarded best-effort
            set_raw(camera, V4L2_CID_RED_BALANCE, (gains.red * 1000.0) as i64).and_then(|_| {
                set_raw(camera, V4L2_CID_BLUE_BALANCE, (gains.blue * 1000.0) as i64)
            })
        }
        ControlPush::Iso(0) => set_raw(camera, V4L2_CID_ISO_SENSITIVITY_AUTO, 1),
        ControlPush::Iso(iso) => set_raw(camera, V4L2_CID_ISO_SENSITIVITY_AUTO, 0)
            .and_then(|_| set_raw(camera, V4L2_CID_ISO_SENSITIVITY, *iso as i64)),
        ControlPush::Saturation(sat) => camera
            .set_camera_control(
                KnownCameraControl::Saturation,
                ControlValueSetter::Integer(*sat as i64),
            )
            .map_err(|e| e.to_string()),
        ControlPush::Drc(strength) => {
            // Nearest V4L2 analogue to dynamic-range compression
            let level = match strength {
                DrcStrength::Off => 0,
                DrcStrength::Low => 1,
                DrcStrength::Medium => 2,
                DrcStrength::High => 3,
            };
            camera
                .set_camera_control(
                    KnownCameraControl::BacklightComp,
                    ControlValueSetter::Integer(level),
                )
                .map_err(|e| e.to_string())
        }
        ControlPush::ExposureCompensation(value) => {
            set_raw(camera, V4L2_CID_AUTO_EXPOSURE_BIAS, *value as i64)
        }
    };

    if let Err(e) = result {
        log::warn!("driver rejected {:?}: {}", push, e);
    }
}

fn apply_white_balance_mode(camera: &mut Camera, mode: WhiteBalanceMode) -> Result<(), String> {
    match mode {
        WhiteBalanceMode::Auto => set_bool(camera, V4L2_CID_AUTO_WHITE_BALANCE, true),
        WhiteBalanceMode::Off => set_bool(camera, V4L2_CID_AUTO_WHITE_BALANCE, false),
        WhiteBalanceMode::Tungsten | WhiteBalanceMode::Fluorescent | WhiteBalanceMode::Sunlight => {
            let kelvin = match mode {
                WhiteBalanceMode::Tungsten => 3200,
                WhiteBalanceMode::Fluorescent => 4000,
                _ => 5500,
            };
            set_bool(camera, V4L2_CID_AUTO_WHITE_BALANCE, false)
                .and_then(|_| set_raw(camera, V4L2_CID_WHITE_BALANCE_TEMPERATURE, kelvin))
        }
    }
}

fn set_raw(camera: &mut Camera, id: u128, value: i64) -> Result<(), String> {
    camera
        .set_camera_control(
            KnownCameraControl::Other(id),
            ControlValueSetter::Integer(value),
        )
        .map_err(|e| e.to_string())
}

fn set_bool(camera: &mut Camera, id: u128, value: bool) -> Result<(), String> {
    camera
        .set_camera_control(
            KnownCameraControl::Other(id),
            ControlValueSetter::Boolean(value),
        )
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices_does_not_error() {
        // Should not error even if no cameras are present
        // (returns empty list instead)
        let result = list_devices();
        assert!(result.is_ok());
    }

    #[test]
    fn test_camera_open_invalid_device() {
        // Use a device index that is very unlikely to exist
        let settings = CameraSettings {
            device_index: 999,
            ..CameraSettings::default()
        };
        let result = NokhwaCamera::open(settings);
        assert!(result.is_err());
        match result.unwrap_err() {
            CameraError::DeviceNotFound(idx) => assert_eq!(idx, 999),
            other => panic!("Expected DeviceNotFound, got {:?}", other),
        }
    }
}
