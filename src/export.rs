//! Video rendering via an FFmpeg subprocess.
//!
//! This module handles building the encode invocation, spawning FFmpeg,
//! and turning its exit into a checked result.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::store::FrameStore;

/// Errors that can occur while rendering the video
#[derive(Debug)]
pub enum EncodeError {
    /// Encoder executable not found
    EncoderNotFound { program: String },
    /// Failed to spawn the encoder process
    SpawnFailed(std::io::Error),
    /// Encoder exited with a non-zero status
    EncodeFailed {
        exit_code: Option<i32>,
        stderr: String,
    },
    /// The encode was interrupted by Ctrl+C
    Interrupted,
    /// I/O error while supervising the process
    IoError(std::io::Error),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::EncoderNotFound { program } => {
                write!(
                    f,
                    "'{}' not found. Install it with your package manager, e.g.:\n\n    apt install ffmpeg\n",
                    program
                )
            }
            EncodeError::SpawnFailed(e) => write!(f, "Failed to spawn the encoder: {}", e),
            EncodeError::EncodeFailed { exit_code, stderr } => {
                write!(f, "Encoder exited with code {:?}\n{}", exit_code, stderr)
            }
            EncodeError::Interrupted => write!(f, "Encode interrupted"),
            EncodeError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Which program renders the video and how the output is encoded.
///
/// The defaults invoke `ffmpeg` with libx264; `avconv` accepts the same
/// argument set for installs that still ship it.
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub program: String,
    pub codec: String,
    /// Extra arguments inserted just before the output path.
    pub extra_args: Vec<String>,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            codec: "libx264".to_string(),
            extra_args: Vec::new(),
        }
    }
}

/// One video render: frame sequence in, H.264 MP4 out.
#[derive(Debug, Clone)]
pub struct Encoder {
    fps: u32,
    input_pattern: PathBuf,
    output: PathBuf,
    settings: EncoderSettings,
}

impl Encoder {
    /// Encoder for a project's low-resolution frame sequence.
    pub fn for_store(store: &FrameStore, fps: u32) -> Self {
        Self::with_settings(store, fps, EncoderSettings::default())
    }

    pub fn with_settings(store: &FrameStore, fps: u32, settings: EncoderSettings) -> Self {
        Self {
            fps,
            input_pattern: store.encoder_input_pattern(),
            output: store.video_path(),
            settings,
        }
    }

    pub fn output(&self) -> &PathBuf {
        &self.output
    }

    /// FFmpeg command-line arguments for this render.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // Overwrite without prompting: stdin is detached, so an
        // interactive "file exists" prompt would hang forever
        args.push("-y".to_string());

        // Input: the frame sequence at the animation's rate.
        // Frame indices start at 1, not FFmpeg's default of 0.
        args.extend([
            "-framerate".to_string(),
            self.fps.to_string(),
            "-start_number".to_string(),
            "1".to_string(),
            "-i".to_string(),
            self.input_pattern.to_string_lossy().to_string(),
        ]);

        // Output: H.264 in a pixel format every player accepts
        args.extend([
            "-c:v".to_string(),
            self.settings.codec.clone(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]);
        args.extend(self.settings.extra_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }

    /// Run the encode to completion.
    ///
    /// The encoder's progress output is echoed to stderr as it arrives.
    /// A Ctrl+C during the encode is forwarded as SIGINT (ffmpeg
    /// finalizes the file on SIGINT) and reported as `Interrupted`.
    pub fn run(&self) -> Result<(), EncodeError> {
        let args = self.args();
        log::debug!("{} {}", self.settings.program, args.join(" "));

        let mut child = Command::new(&self.settings.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EncodeError::EncoderNotFound {
                        program: self.settings.program.clone(),
                    }
                } else {
                    EncodeError::SpawnFailed(e)
                }
            })?;

        // Read stderr on a thread so the pipe never fills up
        let stderr = child.stderr.take();
        let program = self.settings.program.clone();
        let stderr_thread = stderr.map(|stderr| {
            thread::spawn(move || {
                let reader = BufReader::new(stderr);
                let mut lines = Vec::new();
                for line in reader.lines() {
                    match line {
                        Ok(l) => {
                            eprintln!("[{}] {}", program, l);
                            lines.push(l);
                        }
                        Err(_) => break,
                    }
                }
                lines
            })
        });

        let status = loop {
            if ctrlc_received() {
                interrupt(&mut child);
                let _ = stderr_thread.map(|h| h.join());
                return Err(EncodeError::Interrupted);
            }
            match child.try_wait().map_err(EncodeError::IoError)? {
                Some(status) => break status,
                None => thread::sleep(Duration::from_millis(50)),
            }
        };

        let stderr_lines = stderr_thread
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(EncodeError::EncodeFailed {
                exit_code: status.code(),
                stderr: tail(&stderr_lines, 15),
            })
        }
    }
}

/// Send SIGINT and give FFmpeg a moment to finalize; kill if it won't.
fn interrupt(child: &mut std::process::Child) {
    #[cfg(unix)]
    {
        unsafe {
            let pid = child.id() as i32;
            libc::kill(pid, libc::SIGINT);
        }
    }

    #[cfg(not(unix))]
    {
        let _ = child.kill();
    }

    let start = Instant::now();
    let timeout = Duration::from_secs(2);
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return;
                }
                thread::sleep(Duration::from_millis(50));
            }
            Err(_) => return,
        }
    }
}

fn tail(lines: &[String], n: usize) -> String {
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

/// Global flag for handling Ctrl+C across the application
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Check if Ctrl+C has been received.
pub fn ctrlc_received() -> bool {
    CTRLC_RECEIVED.load(Ordering::SeqCst)
}

/// Set up the Ctrl+C handler.
///
/// This should be called once at program startup.
pub fn setup_ctrlc_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        CTRLC_RECEIVED.store(true, Ordering::SeqCst);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_shape() {
        let store = FrameStore::new("/project");
        let encoder = Encoder::for_store(&store, 12);
        let args = encoder.args();

        assert_eq!(
            args,
            vec![
                "-y",
                "-framerate",
                "12",
                "-start_number",
                "1",
                "-i",
                "/project/pics/image_%d.jpg",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "/project/video.mp4",
            ]
        );
    }

    #[test]
    fn test_framerate_follows_config() {
        let store = FrameStore::new("/p");
        let args = Encoder::for_store(&store, 24).args();
        let at = args.iter().position(|a| a == "-framerate").unwrap();
        assert_eq!(args[at + 1], "24");
    }

    #[test]
    fn test_output_path() {
        let store = FrameStore::new("/p");
        let encoder = Encoder::for_store(&store, 12);
        assert_eq!(encoder.output(), &PathBuf::from("/p/video.mp4"));
    }

    #[test]
    fn test_missing_frames_is_a_checked_failure() {
        // ffmpeg exists on dev machines; absent frames must surface as
        // EncodeFailed (or EncoderNotFound where ffmpeg is missing)
        let dir = tempfile::tempdir().unwrap();
        let store = FrameStore::new(dir.path());
        store.ensure_layout().unwrap();

        let encoder = Encoder::for_store(&store, 12);
        match encoder.run() {
            Err(EncodeError::EncodeFailed { exit_code, .. }) => {
                assert_ne!(exit_code, Some(0));
            }
            Err(EncodeError::EncoderNotFound { .. }) => {
                eprintln!("SKIP: ffmpeg not installed");
            }
            Ok(()) => panic!("Encoding an empty sequence should fail"),
            Err(other) => panic!("Expected EncodeFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_settings_shape_the_command() {
        let store = FrameStore::new("/p");
        let settings = EncoderSettings {
            program: "avconv".to_string(),
            codec: "mpeg4".to_string(),
            extra_args: vec!["-preset".to_string(), "fast".to_string()],
        };
        let encoder = Encoder::with_settings(&store, 12, settings);
        let args = encoder.args();

        let codec_at = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[codec_at + 1], "mpeg4");

        // Extra args sit between the codec section and the output path
        let preset_at = args.iter().position(|a| a == "-preset").unwrap();
        assert!(preset_at > codec_at);
        assert_eq!(args[preset_at + 1], "fast");
        assert_eq!(args.last().map(String::as_str), Some("/p/video.mp4"));
    }

    #[test]
    fn test_error_display() {
        let err = EncodeError::EncoderNotFound {
            program: "ffmpeg".to_string(),
        };
        assert!(format!("{}", err).contains("'ffmpeg' not found"));

        let err = EncodeError::EncodeFailed {
            exit_code: Some(1),
            stderr: "No such file".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("1"));
        assert!(msg.contains("No such file"));
    }

    #[test]
    fn test_tail_keeps_last_lines() {
        let lines: Vec<String> = (0..20).map(|i| format!("line {}", i)).collect();
        let t = tail(&lines, 3);
        assert_eq!(t, "line 17\nline 18\nline 19");
        assert_eq!(tail(&lines[..2], 5), "line 0\nline 1");
    }
}
