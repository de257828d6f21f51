//! Full-screen terminal drawing.
//!
//! Each refresh builds one string of ANSI escapes and writes it in a
//! single syscall to keep flicker down. A character cell shows two image
//! rows via the upper-half-block glyph: foreground colors the top half,
//! background the bottom. The bottom terminal row is reserved for the
//! status line.

use std::io::{self, Write};

use crate::camera::Frame;

use super::render::{blend_into, downsample_into, CellColor};

/// Drawing surface over any writer. Production uses stdout; tests hand
/// in a `Vec<u8>` and inspect the escapes.
pub struct Screen<W: Write> {
    out: W,
    cols: u16,
    rows: u16,
    base_cells: Vec<CellColor>,
    live_cells: Vec<CellColor>,
}

impl Screen<io::Stdout> {
    /// Screen over stdout, sized to the current terminal.
    pub fn stdout() -> io::Result<Self> {
        let (cols, rows) = crossterm::terminal::size()?;
        Ok(Self::new(io::stdout(), cols, rows))
    }
}

impl<W: Write> Screen<W> {
    pub fn new(out: W, cols: u16, rows: u16) -> Self {
        Self {
            out,
            cols,
            rows,
            base_cells: Vec::new(),
            live_cells: Vec::new(),
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
    }

    pub fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    /// Wipe the whole screen.
    pub fn clear(&mut self) -> io::Result<()> {
        self.out.write_all(b"\x1b[2J\x1b[H")?;
        self.out.flush()
    }

    /// Draw the live preview composited over the last captured frame.
    ///
    /// `base` is drawn opaque; `live` is blended on top at `alpha`
    /// (255 hides the base entirely). A missing base means black, the
    /// state of a session with no frames yet.
    pub fn draw_composite(
        &mut self,
        base: Option<&Frame>,
        live: Option<&Frame>,
        alpha: u8,
        status: &str,
    ) -> io::Result<()> {
        let image_rows = self.rows.saturating_sub(1);
        if self.cols == 0 {
            return Ok(());
        }
        let grid_w = self.cols;
        let grid_h = image_rows * 2;
        let cell_count = grid_w as usize * grid_h as usize;

        match base {
            Some(frame) => {
                downsample_into(frame, grid_w, grid_h, &mut self.base_cells);
            }
            None => {
                self.base_cells.clear();
                self.base_cells.resize(cell_count, CellColor::default());
            }
        }

        if let Some(frame) = live {
            if alpha > 0 {
                downsample_into(frame, grid_w, grid_h, &mut self.live_cells);
                blend_into(&mut self.base_cells, &self.live_cells, alpha);
            }
        }

        let mut output = String::new();
        for row in 0..image_rows {
            let top = 2 * row as usize * grid_w as usize;
            let bottom = (2 * row as usize + 1) * grid_w as usize;

            output.push_str(&format!("\x1b[{};1H", row + 1));
            for col in 0..grid_w as usize {
                let t = self.base_cells.get(top + col).copied().unwrap_or_default();
                let b = self
                    .base_cells
                    .get(bottom + col)
                    .copied()
                    .unwrap_or_default();
                output.push_str(&format!(
                    "\x1b[38;2;{};{};{}m\x1b[48;2;{};{};{}m\u{2580}",
                    t.r, t.g, t.b, b.r, b.g, b.b
                ));
            }
            output.push_str("\x1b[0m");
        }

        push_status(&mut output, self.rows, self.cols, status);

        // Write all at once to keep the frame tear-free
        self.out.write_all(output.as_bytes())?;
        self.out.flush()
    }

    /// Draw one frame full-screen with a status line. Used by playback
    /// and the bundled intro image.
    pub fn draw_frame(&mut self, frame: &Frame, status: &str) -> io::Result<()> {
        self.draw_composite(Some(frame), None, 0, status)
    }

    /// Draw a plain text screen, one line per row. Used by the generated
    /// help card when no intro image is bundled.
    pub fn draw_text(&mut self, lines: &[String]) -> io::Result<()> {
        let mut output = String::from("\x1b[2J\x1b[0m");

        let max_rows = self.rows.saturating_sub(1) as usize;
        for (i, line) in lines.iter().take(max_rows).enumerate() {
            output.push_str(&format!("\x1b[{};3H", i + 2));
            output.extend(line.chars().take(self.cols.saturating_sub(3) as usize));
        }

        self.out.write_all(output.as_bytes())?;
        self.out.flush()
    }

    /// Take the writer back. Tests use this to inspect what was drawn.
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn push_status(output: &mut String, rows: u16, cols: u16, status: &str) {
    if rows == 0 {
        return;
    }
    output.push_str(&format!("\x1b[{};1H\x1b[0m\x1b[2K", rows));
    output.extend(status.chars().take(cols as usize));
}
