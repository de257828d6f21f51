//! Camera types and data structures.

use std::fmt;
use std::time::Instant;

/// Information about an available camera device.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    /// Device index for selection
    pub index: u32,
    /// Human-readable device name
    pub name: String,
    /// Device description
    pub description: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.description)
    }
}

/// Camera resolution settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Live preview resolution (1920x1080) - streams fast enough for the UI loop
    pub const PREVIEW: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };

    /// Archival still resolution (2592x1944) - the sensor's full frame
    pub const STILL: Resolution = Resolution {
        width: 2592,
        height: 1944,
    };
}

impl Default for Resolution {
    fn default() -> Self {
        Self::PREVIEW
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel format of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// RGB format (3 bytes per pixel)
    Rgb,
}

/// A captured camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw pixel data in RGB format
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format
    pub format: FrameFormat,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl Frame {
    /// Get the number of bytes per pixel (3 for RGB).
    pub fn bytes_per_pixel(&self) -> usize {
        match self.format {
            FrameFormat::Rgb => 3,
        }
    }

    /// Build a frame filled with a single RGB color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            data.extend_from_slice(&rgb);
        }
        Frame {
            data,
            width,
            height,
            format: FrameFormat::Rgb,
            timestamp: Instant::now(),
        }
    }
}

/// White-balance operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhiteBalanceMode {
    /// Manual gains only; the sensor stops adapting
    Off,
    Auto,
    Tungsten,
    Fluorescent,
    Sunlight,
}

impl WhiteBalanceMode {
    pub fn name(&self) -> &'static str {
        match self {
            WhiteBalanceMode::Off => "off",
            WhiteBalanceMode::Auto => "auto",
            WhiteBalanceMode::Tungsten => "tungsten",
            WhiteBalanceMode::Fluorescent => "fluorescent",
            WhiteBalanceMode::Sunlight => "sunlight",
        }
    }
}

impl fmt::Display for WhiteBalanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Red/blue channel gains, saved and restored around a still capture so the
/// color of the archival shot matches the preview shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhiteBalanceGains {
    pub red: f32,
    pub blue: f32,
}

impl Default for WhiteBalanceGains {
    fn default() -> Self {
        Self {
            red: 1.0,
            blue: 1.0,
        }
    }
}

/// Dynamic-range-compression strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrcStrength {
    Off,
    Low,
    Medium,
    High,
}

impl DrcStrength {
    pub fn name(&self) -> &'static str {
        match self {
            DrcStrength::Off => "off",
            DrcStrength::Low => "low",
            DrcStrength::Medium => "medium",
            DrcStrength::High => "high",
        }
    }
}

impl fmt::Display for DrcStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings used when opening a camera.
#[derive(Debug, Clone)]
pub struct CameraSettings {
    /// Camera device index
    pub device_index: u32,
    /// Resolution for the streaming preview
    pub preview_resolution: Resolution,
    /// Resolution for full stills
    pub still_resolution: Resolution,
    /// Sensor mode used while previewing
    pub preview_sensor_mode: u8,
    /// Sensor mode used for full stills
    pub still_sensor_mode: u8,
    /// Target preview FPS (actual may vary)
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            preview_resolution: Resolution::PREVIEW,
            still_resolution: Resolution::STILL,
            preview_sensor_mode: 1,
            still_sensor_mode: 2,
            fps: 30,
        }
    }
}

/// Errors that can occur during camera operations.
#[derive(Debug)]
pub enum CameraError {
    /// No cameras found on the system
    NoDevices,
    /// Failed to query camera devices
    QueryFailed(String),
    /// Failed to open camera
    OpenFailed(String),
    /// Camera permission denied (macOS/iOS)
    PermissionDenied,
    /// Camera device not found at specified index
    DeviceNotFound(u32),
    /// Failed to start video stream
    StreamFailed(String),
    /// Asked for a frame while the preview is stopped
    PreviewNotRunning,
    /// The sensor produced no usable frame
    CaptureFailed(String),
    /// Preview thread is already running
    AlreadyRunning,
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NoDevices => write!(f, "No cameras found"),
            CameraError::QueryFailed(msg) => write!(f, "Failed to query cameras: {}", msg),
            CameraError::OpenFailed(msg) => write!(f, "Failed to open camera: {}", msg),
            CameraError::PermissionDenied => {
                write!(
                    f,
                    "Camera permission denied. On macOS, grant access in System Settings > Privacy & Security > Camera"
                )
            }
            CameraError::DeviceNotFound(index) => {
                write!(
                    f,
                    "Camera device {} not found. Run 'list-cameras' to see available devices",
                    index
                )
            }
            CameraError::StreamFailed(msg) => write!(f, "Failed to start camera stream: {}", msg),
            CameraError::PreviewNotRunning => {
                write!(f, "Live preview is not running")
            }
            CameraError::CaptureFailed(msg) => write!(f, "Failed to capture frame: {}", msg),
            CameraError::AlreadyRunning => write!(f, "Preview thread is already running"),
        }
    }
}

impl std::error::Error for CameraError {}
