//! Terminal display: raw-mode session, cell rendering, pacing.
//!
//! - Terminal ownership via [`TerminalSession`]
//! - Frame-to-cell conversion and blending via [`render`]
//! - Screen drawing via [`Screen`]
//! - Loop pacing via [`Clock`]

mod clock;
mod raw_mode;
mod screen;

pub mod render;

pub use clock::Clock;
pub use raw_mode::TerminalSession;
pub use screen::Screen;
