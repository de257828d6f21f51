//! The interactive capture session.
//!
//! A single-threaded poll loop: drain pending key events, dispatch each
//! to a camera/capture/playback action, redraw, pace to the refresh
//! rate. An intro screen gates entry; F1 moves between it and the live
//! view. The loop only returns when the user quits or asks for the
//! video, and the caller runs the encoder after tearing the terminal
//! down.

use std::io::Write;
use std::time::Duration;

use crossterm::event::{self, Event};

use crate::camera::{CameraControl, CameraError, WhiteBalanceMode};
use crate::capture::{self, CaptureConfig, CaptureError};
use crate::display::{Clock, Screen};
use crate::export;
use crate::keymap::{self, Action, BINDINGS};
use crate::playback::{self, PlaybackError};
use crate::session::{SessionState, OPAQUE_ALPHA};
use crate::store::FrameStore;

/// Exposure compensation the driver accepts, as +/- this bound.
const EXPOSURE_BOUND: i32 = 25;

/// Errors that end the session.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Camera failure: {0}")]
    Camera(#[from] CameraError),

    #[error("Playback failed: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// How an interactive session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// User quit; nothing left to do.
    Quit,
    /// User asked for the video; the caller runs the encoder next.
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Intro,
    Active,
}

/// Knobs the loop needs beyond the devices themselves.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub capture: CaptureConfig,
    /// Rate for the in-terminal animation preview.
    pub playback_fps: u32,
    /// Rate the live view is redrawn at.
    pub refresh_hz: u32,
    /// Alpha the live preview drops to when onion skinning is on.
    pub half_alpha: u8,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            playback_fps: 12,
            refresh_hz: 30,
            half_alpha: 128,
        }
    }
}

/// The running session: camera, frame store, screen, and counters.
pub struct App<'a, W: Write> {
    camera: &'a mut dyn CameraControl,
    store: &'a FrameStore,
    screen: &'a mut Screen<W>,
    session: SessionState,
    settings: AppSettings,
    phase: Phase,
    /// Most recent feedback line, shown in the status bar.
    notice: String,
}

impl<'a, W: Write> App<'a, W> {
    pub fn new(
        camera: &'a mut dyn CameraControl,
        store: &'a FrameStore,
        screen: &'a mut Screen<W>,
        settings: AppSettings,
    ) -> Self {
        let session = SessionState::new(settings.half_alpha);
        Self {
            camera,
            store,
            screen,
            session,
            settings,
            phase: Phase::Intro,
            notice: String::new(),
        }
    }

    /// Number of frames captured so far.
    pub fn frame_count(&self) -> u32 {
        self.session.frame_count()
    }

    /// Run until the user quits or requests the export.
    ///
    /// Starts on the intro screen. The preview is stopped before
    /// returning so the camera is released on every path.
    pub fn run(&mut self) -> Result<Outcome, AppError> {
        self.draw_intro()?;
        let mut clock = Clock::start(self.settings.refresh_hz);

        loop {
            if export::ctrlc_received() {
                self.camera.stop_preview();
                return Ok(Outcome::Quit);
            }

            // Drain everything that queued up since the last tick
            while event::poll(Duration::ZERO)? {
                match event::read()? {
                    Event::Key(key) => {
                        if let Some(action) = keymap::action_for(&key) {
                            if let Some(outcome) = self.dispatch(action)? {
                                self.camera.stop_preview();
                                return Ok(outcome);
                            }
                        }
                    }
                    Event::Resize(cols, rows) => {
                        self.screen.resize(cols, rows);
                        if self.phase == Phase::Intro {
                            self.draw_intro()?;
                        }
                    }
                    _ => {}
                }
            }

            if self.phase == Phase::Active {
                self.draw()?;
            }
            clock.tick();
        }
    }

    /// Apply one action. `Some(outcome)` means the session is over.
    fn dispatch(&mut self, action: Action) -> Result<Option<Outcome>, AppError> {
        if self.phase == Phase::Intro {
            return self.dispatch_intro(action);
        }

        match action {
            Action::Quit => return Ok(Some(Outcome::Quit)),
            Action::ExportVideo => return Ok(Some(Outcome::Export)),
            Action::CaptureFrame => self.capture_frame()?,
            Action::DeleteLastFrame => {
                capture::delete_last_frame(self.store, &mut self.session);
                self.notice = format!("frames: {}", self.session.frame_count());
            }
            Action::ToggleAlpha => {
                self.session.toggle_alpha();
                self.notice.clear();
            }
            Action::ShowIntro => {
                self.camera.stop_preview();
                self.phase = Phase::Intro;
                self.draw_intro()?;
            }
            Action::PlayAnimation => self.play_animation()?,
            Action::FreezeWhiteBalance => {
                // Pin the gains auto white balance has converged on
                let gains = self.camera.white_balance_gains();
                self.camera.set_white_balance_mode(WhiteBalanceMode::Off)?;
                self.camera.set_white_balance_gains(gains)?;
                self.notice = "white balance locked".to_string();
            }
            Action::SetWhiteBalance(mode) => {
                self.camera.set_white_balance_mode(mode)?;
                self.notice = format!("white balance: {}", mode);
            }
            Action::SetIso(iso) => {
                self.camera.set_iso(iso)?;
                self.notice = if iso == 0 {
                    "iso: auto".to_string()
                } else {
                    format!("iso: {}", iso)
                };
            }
            Action::SetDrc(strength) => {
                self.camera.set_drc_strength(strength)?;
                self.notice = format!("drc: {}", strength);
            }
            Action::SetSaturation(level) => {
                self.camera.set_saturation(level)?;
                self.notice = format!("saturation: {}", level);
            }
            Action::NudgeExposure(step) => self.nudge_exposure(step)?,
        }
        Ok(None)
    }

    /// The intro screen answers to two keys and swallows the rest.
    fn dispatch_intro(&mut self, action: Action) -> Result<Option<Outcome>, AppError> {
        match action {
            Action::Quit => Ok(Some(Outcome::Quit)),
            Action::ShowIntro => {
                self.camera.start_preview()?;
                self.phase = Phase::Active;
                self.notice.clear();
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn capture_frame(&mut self) -> Result<(), AppError> {
        match capture::take_frame(
            self.camera,
            self.store,
            &mut self.session,
            &self.settings.capture,
        ) {
            Ok(index) => self.notice = format!("frame {} captured", index),
            Err(CaptureError::Storage { index, source }) => {
                // Counter already rolled back; tell the user and keep going
                log::warn!("frame {} not stored: {}", index, source);
                self.notice = format!("frame {} not stored: {}", index, source);
            }
            Err(CaptureError::Camera(e)) => return Err(AppError::Camera(e)),
        }
        Ok(())
    }

    fn play_animation(&mut self) -> Result<(), AppError> {
        let count = self.session.frame_count();
        if count > 1 {
            playback::preview_animation(
                self.camera,
                self.store,
                self.screen,
                count,
                self.settings.playback_fps,
            )?;
            self.notice.clear();
        } else {
            self.notice = "need at least two frames to play".to_string();
        }
        Ok(())
    }

    /// One notch of exposure compensation.
    ///
    /// Reads the current value and only writes back while inside the
    /// accepted range, so the driver never sees a value it would reject.
    fn nudge_exposure(&mut self, step: i32) -> Result<(), AppError> {
        let current = self.camera.exposure_compensation();
        let within = if step < 0 {
            current > -EXPOSURE_BOUND
        } else {
            current < EXPOSURE_BOUND
        };
        if within {
            let value = current + step;
            self.camera.set_exposure_compensation(value)?;
            self.notice = format!("exposure: {:+}", value);
        }
        Ok(())
    }

    fn draw(&mut self) -> Result<(), AppError> {
        let live = self.camera.preview_frame();
        let status = self.status_line();
        self.screen.draw_composite(
            self.session.last_frame(),
            live.as_ref(),
            self.session.preview_alpha(),
            &status,
        )?;
        Ok(())
    }

    fn draw_intro(&mut self) -> Result<(), AppError> {
        match self.store.load_intro() {
            Some(frame) => self.screen.draw_frame(&frame, "[f1] start  [esc] quit")?,
            None => self.screen.draw_text(&help_lines())?,
        }
        Ok(())
    }

    fn status_line(&self) -> String {
        let onion = if self.session.preview_alpha() == OPAQUE_ALPHA {
            "off"
        } else {
            "on"
        };
        let mut line = format!(
            "frames: {}  onion: {}  [space] capture  [backspace] delete  [p] play  [enter] export  [f1] help",
            self.session.frame_count(),
            onion
        );
        if !self.notice.is_empty() {
            line.push_str("  |  ");
            line.push_str(&self.notice);
        }
        line
    }
}

/// Key reference shown when no intro image is installed.
fn help_lines() -> Vec<String> {
    let mut lines = vec!["stopmo".to_string(), String::new()];
    for binding in BINDINGS {
        lines.push(format!(
            "  {:<9} {}",
            keymap::key_label(binding.key),
            binding.help
        ));
    }
    lines.push(String::new());
    lines.push("press f1 to start the camera".to_string());
    lines
}
