//! Player — the frame driver and the script surface.
//!
//! Runs the compile-and-execute pipeline against a live terminal: each tick
//! measures elapsed wall time, scales it by the turtle's speed, and feeds
//! it to the machine, whose effects mutate the turtle and the stroke
//! canvas. The right-hand script panel mirrors the source with the current
//! instruction highlighted and failing lines marked, and the script file is
//! watched so saving an edit reruns the drawing from scratch.

pub mod config;

use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use crossterm::{cursor, event, execute, queue, style, terminal};

use crate::canvas::Canvas;
use crate::engine::Engine;
use crate::machine::{Effect, EffectSink, Machine};
use crate::turtle::{Sprite, Turtle};
use crate::types::Rgba;
use config::{PlayerConfig, matches_binding};

/// Rows reserved above the canvas for the menu bar.
const CANVAS_OFFSET: u16 = 1;
/// Columns reserved right of the canvas for the script panel.
const PANEL_WIDTH: u16 = 34;

/// Everything instruction effects touch, behind one sink: the turtle, the
/// stroke canvas, and the script-panel highlight.
struct Scene {
    turtle: Turtle,
    canvas: Canvas,
    current_line: Option<usize>,
}

impl Scene {
    fn new(width: u16, height: u16) -> Scene {
        Scene {
            turtle: Turtle::new(),
            canvas: Canvas::new(width, height),
            current_line: None,
        }
    }

    /// Fresh turtle, blank canvas, no highlight — the reset that precedes
    /// every (re)run.
    fn reset(&mut self) {
        use crate::canvas::Surface;
        self.turtle = Turtle::new();
        self.canvas.clear();
        self.current_line = None;
    }
}

impl EffectSink for Scene {
    fn apply(&mut self, _line: usize, effect: Effect) {
        self.turtle.apply(effect, &mut self.canvas);
    }

    fn highlight(&mut self, line: Option<usize>) {
        self.current_line = line;
    }
}

pub struct Player {
    path: String,
    source: String,
    config: PlayerConfig,
    machine: Machine,
    scene: Scene,
    error_lines: Vec<usize>,
    paused: bool,
    fullscreen: bool,
}

impl Player {
    /// Load a script for playback. Compilation happens on (re)start so a
    /// broken script still opens with its error markers shown.
    pub fn open(path: &str) -> Result<Player> {
        let source =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
        Ok(Player {
            path: path.to_string(),
            source,
            config: PlayerConfig::load(),
            machine: Machine::new(),
            scene: Scene::new(0, 0),
            error_lines: Vec::new(),
            paused: false,
            fullscreen: false,
        })
    }

    /// Play the script in the terminal.
    ///
    /// Sets up the terminal, enters the frame loop, and restores the
    /// terminal on exit (even on error).
    pub fn play(&mut self) -> Result<()> {
        let (term_w, term_h) = terminal::size()?;
        let min_w = PANEL_WIDTH + 20;
        let min_h = 10;
        if term_w < min_w || term_h < min_h {
            bail!("Terminal too small: need {min_w}x{min_h}, have {term_w}x{term_h}");
        }
        // +2: one row for the menu bar, one for the status bar.
        self.scene = Scene::new(term_w - PANEL_WIDTH, term_h - 2);

        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All),
        )?;

        let result = self.run_loop(&mut stdout);

        // Always restore terminal state.
        let _ = execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();

        result
    }

    /// Recompile the current source and rerun it from a clean slate.
    fn restart(&mut self) {
        let program = Engine::compile(&self.source);
        self.error_lines = program.error_lines;
        self.scene.reset();
        self.machine.load(program.instructions);
        self.machine.start(&mut self.scene);
        self.paused = false;
    }

    // -----------------------------------------------------------------------
    // Frame loop
    // -----------------------------------------------------------------------

    fn run_loop(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        self.restart();
        self.render_menubar(stdout)?;

        let tick = Duration::from_millis(u64::from(1000 / self.config.frame_rate.max(1)));
        let mut last_tick = Instant::now();
        let mut last_watch = Instant::now();

        loop {
            if event::poll(tick)? {
                match event::read()? {
                    event::Event::Key(key) => {
                        let keys = self.config.key_bindings.clone();
                        if matches_binding(&keys.quit, &key) || key.code == event::KeyCode::Esc {
                            break;
                        }
                        if matches_binding(&keys.replay, &key) {
                            self.restart();
                        } else if matches_binding(&keys.pause, &key) {
                            self.paused = !self.paused;
                        } else if matches_binding(&keys.fullscreen, &key) {
                            self.fullscreen = !self.fullscreen;
                            if self.fullscreen {
                                stdout.write_all(b"\x1b[10;1t")?;
                            } else {
                                stdout.write_all(b"\x1b[10;0t")?;
                            }
                            stdout.flush()?;
                        }
                    }
                    event::Event::Resize(_, _) => {
                        // The canvas keeps its size; just repaint the chrome.
                        execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
                        self.render_menubar(stdout)?;
                    }
                    _ => {}
                }
            }

            let now = Instant::now();
            let delta = now.duration_since(last_tick);
            last_tick = now;

            // Pick up saved edits about twice a second.
            if last_watch.elapsed() >= Duration::from_millis(500) {
                last_watch = now;
                self.reload_if_changed();
            }

            if !self.paused {
                let beats = delta.as_secs_f64() * self.scene.turtle.speed;
                self.machine.advance(beats, &mut self.scene);
            }

            self.render(stdout)?;
        }

        Ok(())
    }

    /// Rerun when the script file's contents changed on disk. Read errors
    /// are ignored — editors briefly swap files around while saving.
    fn reload_if_changed(&mut self) {
        if let Ok(latest) = std::fs::read_to_string(&self.path) {
            if latest != self.source {
                self.source = latest;
                self.restart();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Terminal output
    // -----------------------------------------------------------------------

    fn render(&self, stdout: &mut io::Stdout) -> Result<()> {
        self.render_canvas(stdout)?;
        self.render_panel(stdout)?;
        self.render_status(stdout)?;
        stdout.flush()?;
        Ok(())
    }

    fn render_menubar(&self, stdout: &mut io::Stdout) -> Result<()> {
        let keys = &self.config.key_bindings;
        let items = [
            format!("[{}] replay", keys.replay),
            format!("[{}] pause", keys.pause),
            format!("[{}] fullscreen", keys.fullscreen),
            format!("[{}] quit", keys.quit),
        ];

        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::Print(" "),
        )?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                queue!(stdout, style::Print("  "))?;
            }
            print_menu_item(stdout, item)?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn render_canvas(&self, stdout: &mut io::Stdout) -> Result<()> {
        let sprite = self.sprite_overlay();
        for (y, row) in self.scene.canvas.rows().iter().enumerate() {
            queue!(stdout, cursor::MoveTo(0, y as u16 + CANVAS_OFFSET))?;
            for (x, cell) in row.iter().enumerate() {
                let styled = match &sprite {
                    Some((col, row_s, cs, ch)) if *col == x as u16 && *row_s == y as u16 => {
                        style::StyledContent::new(*cs, *ch)
                    }
                    _ => {
                        let mut cs = style::ContentStyle::default();
                        if let Some(color) = cell.color {
                            cs.foreground_color = Some(to_ct_color(color));
                        }
                        style::StyledContent::new(cs, cell.ch)
                    }
                };
                queue!(stdout, style::PrintStyledContent(styled))?;
            }
        }
        Ok(())
    }

    /// Where and how to composite the turtle over the strokes, if at all.
    fn sprite_overlay(&self) -> Option<(u16, u16, style::ContentStyle, char)> {
        let turtle = &self.scene.turtle;
        if !turtle.visible || turtle.fade <= 0.0 {
            return None;
        }
        let (col, row) = self.scene.canvas.locate(turtle.x, turtle.y)?;

        let mut cs = style::ContentStyle::default();
        if turtle.fade < 50.0 {
            cs.attributes.set(style::Attribute::Dim);
        }
        let ch = match turtle.sprite {
            // The flipped-over pose reads better as a burst than an arrow.
            Sprite::Peng => '✶',
            Sprite::Pen => {
                cs.foreground_color = Some(to_ct_color(turtle.color));
                heading_arrow(turtle)
            }
            Sprite::Normal => heading_arrow(turtle),
        };
        Some((col, row, cs, ch))
    }

    fn render_panel(&self, stdout: &mut io::Stdout) -> Result<()> {
        let panel_x = self.scene.canvas.width();
        let visible = self.scene.canvas.height() as usize;
        let text_width = PANEL_WIDTH as usize - 7;

        let lines: Vec<&str> = self.source.lines().collect();
        // Keep the highlighted line in view on long scripts.
        let scroll = match self.scene.current_line {
            Some(current) if current >= visible => current + 1 - visible,
            _ => 0,
        };

        for row in 0..visible {
            let idx = scroll + row;
            queue!(stdout, cursor::MoveTo(panel_x, row as u16 + CANVAS_OFFSET))?;

            let Some(line) = lines.get(idx) else {
                queue!(stdout, style::Print(format!("{:1$}", "", PANEL_WIDTH as usize)))?;
                continue;
            };

            let is_error = self.error_lines.contains(&idx);
            let is_current = self.scene.current_line == Some(idx);
            let marker = if is_error { '!' } else { ' ' };
            let text: String = line.chars().take(text_width).collect();
            let body = format!(" {marker}{:>3} {text:<text_width$}", idx + 1);

            let mut cs = style::ContentStyle::default();
            if is_error {
                cs.foreground_color = Some(style::Color::Red);
            }
            if is_current {
                cs.attributes.set(style::Attribute::Reverse);
            }
            queue!(stdout, style::PrintStyledContent(style::StyledContent::new(cs, body)))?;
        }
        Ok(())
    }

    fn render_status(&self, stdout: &mut io::Stdout) -> Result<()> {
        let status_y = self.scene.canvas.height() + CANVAS_OFFSET;

        let state = if self.paused {
            "paused"
        } else if self.machine.is_running() {
            "running"
        } else {
            "done"
        };
        let errors = match self.error_lines.len() {
            0 => String::new(),
            n => format!(" | {n} line(s) not understood"),
        };
        let status = format!(
            " {state} | speed x{:.1} | {} instruction(s){errors} ",
            self.scene.turtle.speed,
            self.machine.program().len(),
        );

        let mut cs = style::ContentStyle::default();
        cs.attributes.set(style::Attribute::Dim);

        queue!(
            stdout,
            cursor::MoveTo(0, status_y),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::PrintStyledContent(style::StyledContent::new(cs, status)),
        )?;
        Ok(())
    }
}

/// Quantize heading plus spin to one of eight arrows. Roll is subtractive
/// in the pose, so a roll-over reads as a clockwise spin.
fn heading_arrow(turtle: &Turtle) -> char {
    const ARROWS: [char; 8] = ['↑', '↗', '→', '↘', '↓', '↙', '←', '↖'];
    let spin = (turtle.heading - turtle.roll).to_degrees();
    let octant = (spin / 45.0).round().rem_euclid(8.0) as usize % 8;
    ARROWS[octant]
}

/// Print a menu item, bolding the `[key]` part and dimming the label.
fn print_menu_item(stdout: &mut io::Stdout, item: &str) -> Result<()> {
    match item.split_once(']') {
        Some((key, label)) => queue!(
            stdout,
            style::SetAttribute(style::Attribute::Bold),
            style::Print(key),
            style::Print("]"),
            style::SetAttribute(style::Attribute::Reset),
            style::SetAttribute(style::Attribute::Dim),
            style::Print(label),
            style::SetAttribute(style::Attribute::Reset),
        )?,
        None => queue!(stdout, style::Print(item))?,
    }
    Ok(())
}

fn to_ct_color(c: Rgba) -> style::Color {
    style::Color::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}
