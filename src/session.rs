//! Mutable state of one capture session.

use crate::camera::Frame;

/// Fully opaque preview. The counterpart half-transparent level comes
/// from configuration.
pub const OPAQUE_ALPHA: u8 = 255;

/// Counters and display state the key handlers mutate.
///
/// The frame counter is the single source of truth for how many frames
/// the session has; files on disk are a side effect of it. Deleting only
/// moves the counter down, so the next capture overwrites the abandoned
/// index.
#[derive(Debug)]
pub struct SessionState {
    frame_count: u32,
    preview_alpha: u8,
    half_alpha: u8,
    last_frame: Option<Frame>,
}

impl SessionState {
    /// New session with zero frames and an opaque preview.
    pub fn new(half_alpha: u8) -> Self {
        Self {
            frame_count: 0,
            preview_alpha: OPAQUE_ALPHA,
            half_alpha,
            last_frame: None,
        }
    }

    /// Number of frames captured so far.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Record a capture. Returns the new count, which is also the
    /// 1-based index of the frame being captured.
    pub fn increment(&mut self) -> u32 {
        self.frame_count += 1;
        self.frame_count
    }

    /// Drop the most recent frame from the count. Floors at zero.
    /// Returns the new count.
    pub fn decrement(&mut self) -> u32 {
        self.frame_count = self.frame_count.saturating_sub(1);
        self.frame_count
    }

    /// Current preview transparency.
    pub fn preview_alpha(&self) -> u8 {
        self.preview_alpha
    }

    /// Flip between the half-transparent and opaque levels.
    /// Returns the level now in effect.
    pub fn toggle_alpha(&mut self) -> u8 {
        self.preview_alpha = if self.preview_alpha == OPAQUE_ALPHA {
            self.half_alpha
        } else {
            OPAQUE_ALPHA
        };
        self.preview_alpha
    }

    /// The low-resolution frame shown under the live preview for
    /// onion-skinning, if any frame is on the counter.
    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    pub fn set_last_frame(&mut self, frame: Frame) {
        self.last_frame = Some(frame);
    }

    pub fn clear_last_frame(&mut self) {
        self.last_frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty_and_opaque() {
        let session = SessionState::new(128);
        assert_eq!(session.frame_count(), 0);
        assert_eq!(session.preview_alpha(), 255);
        assert!(session.last_frame().is_none());
    }

    #[test]
    fn test_increment_returns_one_based_index() {
        let mut session = SessionState::new(128);
        assert_eq!(session.increment(), 1);
        assert_eq!(session.increment(), 2);
        assert_eq!(session.frame_count(), 2);
    }

    #[test]
    fn test_decrement_floors_at_zero() {
        let mut session = SessionState::new(128);
        assert_eq!(session.decrement(), 0);
        assert_eq!(session.decrement(), 0);
        session.increment();
        assert_eq!(session.decrement(), 0);
    }

    #[test]
    fn test_first_toggle_goes_half_transparent() {
        let mut session = SessionState::new(128);
        assert_eq!(session.toggle_alpha(), 128);
        assert_eq!(session.preview_alpha(), 128);
    }

    #[test]
    fn test_toggle_is_an_involution() {
        let mut session = SessionState::new(128);
        session.toggle_alpha();
        assert_eq!(session.toggle_alpha(), 255);
        assert_eq!(session.toggle_alpha(), 128);
    }

    #[test]
    fn test_last_frame_slot() {
        let mut session = SessionState::new(128);
        session.set_last_frame(Frame::filled(4, 4, [1, 2, 3]));
        assert!(session.last_frame().is_some());
        session.clear_last_frame();
        assert!(session.last_frame().is_none());
    }
}
