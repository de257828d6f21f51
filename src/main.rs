use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use stopmo::app::{App, AppError, AppSettings, Outcome};
use stopmo::camera::{self, CameraControl, CameraError, CameraSettings, NokhwaCamera, Resolution};
use stopmo::capture::CaptureConfig;
use stopmo::config::{Config, ConfigError};
use stopmo::display::{Screen, TerminalSession};
use stopmo::export::{setup_ctrlc_handler, EncodeError, Encoder, EncoderSettings};
use stopmo::store::{FrameStore, StorageError};

/// Parse and validate a frame rate (1-60 fps)
fn parse_fps(s: &str) -> Result<u32, String> {
    let fps: u32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid frame rate", s))?;
    if !(1..=60).contains(&fps) {
        return Err(format!("Frame rate must be between 1 and 60 fps, got {}", fps));
    }
    Ok(fps)
}

/// stopmo: keyboard-driven stop motion capture in the terminal
#[derive(Parser)]
#[command(name = "stopmo")]
#[command(version, about = "Keyboard-driven stop motion capture")]
#[command(long_about = "Capture stop motion frames from a camera with an onion-skin \
    preview in the terminal, play the animation back, and render the frame \
    sequence to a video with ffmpeg.")]
#[command(after_help = "EXAMPLES:
    # Capture into the current directory
    stopmo

    # Dedicated project directory, slower animation
    stopmo --project-dir film/ --fps 8

    # Use the second camera
    stopmo --device 1

    # List available cameras
    stopmo list-cameras

KEYS (while running):
    Space   Capture a frame
    Enter   Render the video and exit
    F1      Help screen with the full key reference
    Esc     Quit")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Camera device index (default: 0, or from config file)
    #[arg(long, short = 'd')]
    device: Option<u32>,

    /// Playback and encode frame rate (1-60 fps, default: 12)
    #[arg(long, short = 'f', value_parser = parse_fps)]
    fps: Option<u32>,

    /// Directory for pics/, fullres/, data/ and the rendered video
    /// (default: current directory, or from config file)
    #[arg(long, short = 'p')]
    project_dir: Option<PathBuf>,

    /// Custom config file path (default: ~/.config/stopmo/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available camera devices
    ListCameras,
}

/// Everything that can end the program with an error.
#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn run_session(cli: &Cli) -> Result<(), RunError> {
    let config = Config::load(cli.config.as_deref())?;

    // Merge settings: CLI args > config file > built-in defaults
    let device = cli.device.unwrap_or(config.camera.device);
    let fps = cli.fps.unwrap_or(config.playback.fps);
    let project_dir = cli
        .project_dir
        .clone()
        .or_else(|| config.project.dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let store = FrameStore::new(project_dir);
    store.ensure_layout()?;

    if let Err(e) = setup_ctrlc_handler() {
        eprintln!("Warning: Could not set up Ctrl+C handler: {}", e);
    }

    let camera_settings = CameraSettings {
        device_index: device,
        preview_resolution: Resolution {
            width: config.camera.preview_resolution[0],
            height: config.camera.preview_resolution[1],
        },
        still_resolution: Resolution {
            width: config.camera.still_resolution[0],
            height: config.camera.still_resolution[1],
        },
        preview_sensor_mode: config.camera.preview_sensor_mode,
        still_sensor_mode: config.camera.still_sensor_mode,
        fps: config.display.refresh_hz,
    };
    let app_settings = AppSettings {
        capture: CaptureConfig::from_settings(
            &camera_settings,
            Duration::from_millis(config.camera.settle_ms),
        ),
        playback_fps: fps,
        refresh_hz: config.display.refresh_hz,
        half_alpha: config.display.half_alpha,
    };

    // Open the camera before touching the terminal so open failures
    // print on a normal screen
    let mut camera = NokhwaCamera::open(camera_settings)?;
    camera.set_saturation(config.camera.saturation)?;

    let mut terminal = TerminalSession::open()?;
    let mut screen = Screen::stdout()?;

    let mut app = App::new(&mut camera, &store, &mut screen, app_settings);
    let result = app.run();
    let frames = app.frame_count();
    drop(app);
    drop(camera);

    // Back to the normal screen before anything else prints
    terminal.close()?;
    let outcome = result?;

    match outcome {
        Outcome::Quit => print_summary(frames, &store, false),
        Outcome::Export => {
            println!("Rendering the video. This can take a while!");
            let encoder = Encoder::with_settings(
                &store,
                fps,
                EncoderSettings {
                    program: config.encoder.program.clone(),
                    codec: config.encoder.codec.clone(),
                    extra_args: config.encoder.extra_args.clone(),
                },
            );
            encoder.run()?;
            print_summary(frames, &store, true);
        }
    }
    Ok(())
}

/// Session report printed on every clean exit.
fn print_summary(frames: u32, store: &FrameStore, video: bool) {
    println!();
    if frames == 0 {
        println!("No frames captured.");
    } else {
        println!(
            "Captured {} frame{} under {}",
            frames,
            if frames == 1 { "" } else { "s" },
            store.root().display()
        );
    }
    if video {
        println!("Video written to {}", store.video_path().display());
        println!("Play it with: mpv {}", store.video_path().display());
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::ListCameras) => match camera::list_devices() {
            Ok(devices) => {
                if devices.is_empty() {
                    println!("No cameras found.");
                } else {
                    for device in devices {
                        println!("  {}", device);
                    }
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            if let Err(e) = run_session(&cli) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
