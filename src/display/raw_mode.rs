//! Raw terminal mode management with panic-safe cleanup.

use crossterm::cursor::{Hide, Show};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use std::io;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};

/// Static flag to track if the session is active (for panic handler)
pub(crate) static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Guard over the terminal's raw mode and alternate screen.
///
/// Entering takes the terminal over completely; dropping (or `close`)
/// hands it back. Cleanup runs on normal exits and panics both.
pub struct TerminalSession {
    /// Whether this guard is responsible for cleanup
    active: bool,
}

impl TerminalSession {
    /// Enter raw mode on the alternate screen with the cursor hidden.
    ///
    /// # Errors
    /// Returns an error if the terminal refuses raw mode (not a TTY).
    pub fn open() -> io::Result<Self> {
        // Install panic hook before touching the terminal
        install_panic_hook();

        enable_raw_mode()?;
        SESSION_ACTIVE.store(true, Ordering::SeqCst);
        crossterm::execute!(io::stdout(), EnterAlternateScreen, Hide)?;

        Ok(Self { active: true })
    }

    /// Restore the terminal without dropping the guard.
    /// After calling this, the guard's drop is a no-op.
    ///
    /// The export path needs this: the encoder's output should land on a
    /// normal screen while the guard is still in scope.
    pub fn close(&mut self) -> io::Result<()> {
        if self.active {
            self.active = false;
            SESSION_ACTIVE.store(false, Ordering::SeqCst);
            crossterm::execute!(io::stdout(), Show, LeaveAlternateScreen)?;
            disable_raw_mode()?;
        }
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if self.active {
            SESSION_ACTIVE.store(false, Ordering::SeqCst);
            // Best-effort cleanup - ignore errors during drop
            let _ = crossterm::execute!(io::stdout(), Show, LeaveAlternateScreen);
            let _ = disable_raw_mode();
        }
    }
}

/// Install a panic hook that restores terminal state before panicking.
/// This ensures the panic message lands on a readable screen.
pub(crate) fn install_panic_hook() {
    // Only install once
    static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

    if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }

    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        if SESSION_ACTIVE.load(Ordering::SeqCst) {
            let _ = crossterm::execute!(io::stdout(), Show, LeaveAlternateScreen);
            let _ = disable_raw_mode();
            SESSION_ACTIVE.store(false, Ordering::SeqCst);
        }

        // Call the original panic hook to print the panic message
        original_hook(panic_info);
    }));
}
