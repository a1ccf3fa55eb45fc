//! Canvas — the persistent drawing surface.
//!
//! A fixed grid of terminal cells addressed in canvas-centred, y-up
//! coordinates, so scripts keep their pixel-ish scale regardless of
//! terminal size. The canvas holds only what the pen has traced; the
//! turtle sprite is composited over it by the player each frame and never
//! becomes part of the image.

use crate::types::{Cell, Rgba};

/// The renderer contract instruction effects draw through. The player backs
/// it with a [`Canvas`]; turtle tests back it with a recorder.
pub trait Surface {
    /// Trace a stroke between two points in canvas coordinates.
    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, width: f64, color: Rgba);

    /// Write `text` just above the given point.
    fn text(&mut self, x: f64, y: f64, text: &str);

    /// Wipe the surface.
    fn clear(&mut self);
}

/// Canvas units per terminal column. Keeps scripts written in "pixels" at
/// a sensible size on an 80-column grid.
const SCALE: f64 = 4.0;

/// Terminal cells are roughly twice as tall as wide; squash y so squares
/// look square.
const Y_SQUASH: f64 = 0.5;

pub struct Canvas {
    width: u16,
    height: u16,
    cells: Vec<Vec<Cell>>,
}

impl Canvas {
    pub fn new(width: u16, height: u16) -> Canvas {
        Canvas {
            width,
            height,
            cells: vec![vec![Cell::default(); width as usize]; height as usize],
        }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.cells
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Map canvas coordinates (centred origin, y up) to a grid column/row,
    /// or `None` when the point lies outside the grid. Drawing simply drops
    /// off-canvas points; it never wraps and never fails.
    pub fn locate(&self, x: f64, y: f64) -> Option<(u16, u16)> {
        let col = (self.width as f64 / 2.0 + x / SCALE).round();
        let row = (self.height as f64 / 2.0 - y * Y_SQUASH / SCALE).round();
        if col < 0.0 || row < 0.0 || col >= self.width as f64 || row >= self.height as f64 {
            return None;
        }
        Some((col as u16, row as u16))
    }

    fn plot(&mut self, x: f64, y: f64, width: f64, color: Rgba) {
        // Cell-resolution pen: widths up to the default stay one cell, a
        // wider pen paints a square dab.
        let reach = (width / (SCALE * 2.0)).floor() as i32;
        if let Some((col, row)) = self.locate(x, y) {
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let c = col as i32 + dx;
                    let r = row as i32 + dy;
                    if c >= 0 && r >= 0 && c < self.width as i32 && r < self.height as i32 {
                        self.cells[r as usize][c as usize] = Cell {
                            ch: '█',
                            color: Some(color),
                        };
                    }
                }
            }
        }
    }
}

impl Surface for Canvas {
    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, width: f64, color: Rgba) {
        // Sample the segment at sub-cell granularity. Good enough at cell
        // resolution; nobody will miss anti-aliasing here.
        let length = (x2 - x1).hypot(y2 - y1);
        let samples = ((length / SCALE) * 2.0).ceil().max(1.0) as usize;
        for i in 0..=samples {
            let t = i as f64 / samples as f64;
            self.plot(x1 + (x2 - x1) * t, y1 + (y2 - y1) * t, width, color);
        }
    }

    fn text(&mut self, x: f64, y: f64, text: &str) {
        let Some((col, row)) = self.locate(x, y) else {
            return;
        };
        // One row above the pose so the sprite doesn't sit on the words.
        let row = row.saturating_sub(1);
        let start = col as i32 - text.chars().count() as i32 / 2;
        for (i, ch) in text.chars().enumerate() {
            let c = start + i as i32;
            if c >= 0 && c < self.width as i32 {
                self.cells[row as usize][c as usize] = Cell { ch, color: None };
            }
        }
    }

    fn clear(&mut self) {
        for row in &mut self.cells {
            row.fill(Cell::default());
        }
    }
}
