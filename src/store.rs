//! On-disk layout of a capture project.
//!
//! A project directory holds three subdirectories: `pics` for the
//! low-resolution frames the preview, playback, and encoder consume,
//! `fullres` for the full-quality stills, and `data` for the intro
//! screen image. Files are named by 1-based frame index so the image
//! sequence feeds straight into the encoder.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::{ImageReader, RgbImage};

use crate::camera::{Frame, FrameFormat};

/// Directory of low-resolution frames, relative to the project root.
pub const LOW_RES_DIR: &str = "pics";
/// Directory of full-resolution stills, relative to the project root.
pub const FULL_RES_DIR: &str = "fullres";
/// Directory of bundled assets (intro screen), relative to the project root.
pub const DATA_DIR: &str = "data";
/// Filename of the intro screen image inside [`DATA_DIR`].
pub const INTRO_IMAGE: &str = "start_screen.jpg";
/// Filename of the rendered video, relative to the project root.
pub const VIDEO_FILE: &str = "video.mp4";

/// Errors that can occur while reading or writing project files.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Could not create directory {path}: {source}")]
    CreateDirFailed {
        /// Directory that could not be created
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not write {path}: {source}")]
    WriteFailed {
        /// File that could not be written
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Could not read {path}: {source}")]
    ReadFailed {
        /// File that could not be read
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Could not open {path}: {source}")]
    OpenFailed {
        /// File that could not be opened
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Frame buffer does not match its {width}x{height} dimensions")]
    MalformedFrame { width: u32, height: u32 },
}

/// Handle to a project directory.
///
/// All paths are derived from the root; nothing is cached, so two stores
/// pointed at the same directory see each other's writes.
#[derive(Debug, Clone)]
pub struct FrameStore {
    root: PathBuf,
}

impl FrameStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the `pics`, `fullres`, and `data` directories if missing.
    ///
    /// Existing directories (and their frames, which a new session will
    /// overwrite index by index) are left alone.
    pub fn ensure_layout(&self) -> Result<(), StorageError> {
        for dir in [LOW_RES_DIR, FULL_RES_DIR, DATA_DIR] {
            let path = self.root.join(dir);
            fs::create_dir_all(&path)
                .map_err(|source| StorageError::CreateDirFailed { path: path.clone(), source })?;
        }
        Ok(())
    }

    /// Path of the low-resolution frame at a 1-based index.
    pub fn low_res_path(&self, index: u32) -> PathBuf {
        self.root
            .join(LOW_RES_DIR)
            .join(format!("image_{}.jpg", index))
    }

    /// Path of the full-resolution still at a 1-based index.
    pub fn full_res_path(&self, index: u32) -> PathBuf {
        self.root
            .join(FULL_RES_DIR)
            .join(format!("image_{}.jpg", index))
    }

    /// Path of the intro screen image.
    pub fn intro_path(&self) -> PathBuf {
        self.root.join(DATA_DIR).join(INTRO_IMAGE)
    }

    /// Input pattern the video encoder expands, e.g. `pics/image_%d.jpg`.
    pub fn encoder_input_pattern(&self) -> PathBuf {
        self.root.join(LOW_RES_DIR).join("image_%d.jpg")
    }

    /// Path the rendered video is written to.
    pub fn video_path(&self) -> PathBuf {
        self.root.join(VIDEO_FILE)
    }

    /// Write a frame as the low-resolution file at `index`.
    pub fn save_low_res(&self, index: u32, frame: &Frame) -> Result<(), StorageError> {
        self.save(self.low_res_path(index), frame)
    }

    /// Write a frame as the full-resolution still at `index`.
    pub fn save_full_res(&self, index: u32, frame: &Frame) -> Result<(), StorageError> {
        self.save(self.full_res_path(index), frame)
    }

    /// Load the low-resolution frame at `index`.
    pub fn load_low_res(&self, index: u32) -> Result<Frame, StorageError> {
        self.load(self.low_res_path(index))
    }

    /// Load the intro screen image, if the project bundles one.
    pub fn load_intro(&self) -> Option<Frame> {
        let path = self.intro_path();
        if !path.is_file() {
            return None;
        }
        self.load(path).ok()
    }

    fn save(&self, path: PathBuf, frame: &Frame) -> Result<(), StorageError> {
        let image = RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or(
            StorageError::MalformedFrame {
                width: frame.width,
                height: frame.height,
            },
        )?;
        image
            .save(&path)
            .map_err(|source| StorageError::WriteFailed { path, source })
    }

    fn load(&self, path: PathBuf) -> Result<Frame, StorageError> {
        let reader = ImageReader::open(&path).map_err(|source| StorageError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let image = reader
            .decode()
            .map_err(|source| StorageError::ReadFailed { path, source })?
            .into_rgb8();

        Ok(Frame {
            width: image.width(),
            height: image.height(),
            data: image.into_raw(),
            format: FrameFormat::Rgb,
            timestamp: Instant::now(),
        })
    }
}
