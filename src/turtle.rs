//! Turtle — the pose/appearance record and the effect interpreter.
//!
//! All instruction side effects funnel through [`Turtle::apply`], which
//! mutates this state and traces strokes through the [`Surface`] trait.
//! One turtle exists per running program; it is rebuilt from scratch on
//! every reset or recompile, never patched.

use crate::canvas::Surface;
use crate::machine::{Effect, Motion};
use crate::types::Rgba;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sprite {
    Normal,
    Pen,
    Peng,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turtle {
    pub x: f64,
    pub y: f64,
    /// Heading in radians; 0 faces up, positive turns clockwise.
    pub heading: f64,
    /// Cosmetic sprite spin in radians, independent of heading.
    pub roll: f64,
    pub pen_down: bool,
    pub width: f64,
    pub visible: bool,
    /// 0 = fully faded out, 100 = fully visible.
    pub fade: f64,
    pub color: Rgba,
    /// Playback speed multiplier, always > 0.
    pub speed: f64,
    pub sprite: Sprite,
    peng_saved: Option<Sprite>,
}

impl Turtle {
    pub fn new() -> Turtle {
        Turtle {
            x: 0.0,
            y: 0.0,
            heading: 0.0,
            roll: 0.0,
            pen_down: false,
            width: 4.0,
            visible: true,
            fade: 100.0,
            color: Rgba::opaque(255, 128, 255),
            speed: 1.0,
            sprite: Sprite::Normal,
            peng_saved: None,
        }
    }

    /// Interpret one effect: mutate the pose and trace any stroke onto
    /// `surface`. This is the single place instruction kinds turn into
    /// drawing calls.
    pub fn apply(&mut self, effect: Effect, surface: &mut dyn Surface) {
        match effect {
            Effect::PenDown => {
                self.pen_down = true;
                self.sprite = Sprite::Pen;
            }
            Effect::PenUp => {
                self.pen_down = false;
                self.sprite = Sprite::Normal;
            }
            Effect::PenWidth(w) => self.width = w,
            Effect::PenColor(r, g, b) => self.color = Rgba::opaque(r, g, b),
            // A requested speed of 0 would freeze the clock; coerce to 1.
            Effect::Speed(s) => self.speed = if s == 0.0 { 1.0 } else { s },
            Effect::Bark => surface.text(self.x, self.y, "bork!"),
            Effect::PengOn => {
                self.roll -= 90.0_f64.to_radians();
                self.peng_saved = Some(self.sprite);
                self.sprite = Sprite::Peng;
            }
            Effect::PengOff => {
                self.roll += 90.0_f64.to_radians();
                if let Some(saved) = self.peng_saved.take() {
                    self.sprite = saved;
                }
            }
            Effect::Move(motion) => self.step(motion, surface),
        }
    }

    fn step(&mut self, motion: Motion, surface: &mut dyn Surface) {
        match motion {
            Motion::Forward(d) => {
                let nx = self.x + self.heading.sin() * d;
                let ny = self.y + self.heading.cos() * d;
                if self.pen_down {
                    surface.line(self.x, self.y, nx, ny, self.width, self.color);
                }
                self.x = nx;
                self.y = ny;
            }
            Motion::TurnRight(deg) => self.heading += deg.to_radians(),
            Motion::TurnLeft(deg) => self.heading -= deg.to_radians(),
            Motion::Roll(deg) => self.roll -= deg.to_radians(),
            Motion::FadeOut(levels) => self.fade = (self.fade - levels).clamp(0.0, 100.0),
            Motion::FadeIn(levels) => self.fade = (self.fade + levels).clamp(0.0, 100.0),
        }
    }
}

impl Default for Turtle {
    fn default() -> Self {
        Turtle::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::engine::Engine;
    use crate::machine::{EffectSink, Machine};

    /// Records strokes instead of rasterizing them.
    #[derive(Default)]
    struct Trace {
        lines: Vec<(f64, f64, f64, f64)>,
        texts: Vec<String>,
    }

    impl Surface for Trace {
        fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, _width: f64, _color: Rgba) {
            self.lines.push((x1, y1, x2, y2));
        }

        fn text(&mut self, _x: f64, _y: f64, text: &str) {
            self.texts.push(text.to_string());
        }

        fn clear(&mut self) {}
    }

    #[test]
    fn forward_traces_only_with_pen_down() {
        let mut turtle = Turtle::new();
        let mut trace = Trace::default();
        turtle.apply(Effect::Move(Motion::Forward(10.0)), &mut trace);
        assert!(trace.lines.is_empty());
        assert!((turtle.y - 10.0).abs() < 1e-9);

        turtle.apply(Effect::PenDown, &mut trace);
        turtle.apply(Effect::Move(Motion::Forward(5.0)), &mut trace);
        assert_eq!(trace.lines.len(), 1);
        assert!((turtle.y - 15.0).abs() < 1e-9);
    }

    #[test]
    fn turns_steer_subsequent_motion() {
        let mut turtle = Turtle::new();
        let mut trace = Trace::default();
        turtle.apply(Effect::Move(Motion::TurnRight(90.0)), &mut trace);
        turtle.apply(Effect::Move(Motion::Forward(10.0)), &mut trace);
        assert!((turtle.x - 10.0).abs() < 1e-9);
        assert!(turtle.y.abs() < 1e-9);
    }

    #[test]
    fn fade_is_clamped_to_its_range() {
        let mut turtle = Turtle::new();
        let mut trace = Trace::default();
        turtle.apply(Effect::Move(Motion::FadeOut(250.0)), &mut trace);
        assert_eq!(turtle.fade, 0.0);
        turtle.apply(Effect::Move(Motion::FadeIn(9999.0)), &mut trace);
        assert_eq!(turtle.fade, 100.0);
    }

    #[test]
    fn zero_speed_is_coerced_to_one() {
        let mut turtle = Turtle::new();
        let mut trace = Trace::default();
        turtle.apply(Effect::Speed(0.0), &mut trace);
        assert_eq!(turtle.speed, 1.0);
        turtle.apply(Effect::Speed(3.0), &mut trace);
        assert_eq!(turtle.speed, 3.0);
    }

    #[test]
    fn peng_saves_and_restores_the_sprite() {
        let mut turtle = Turtle::new();
        let mut trace = Trace::default();
        turtle.apply(Effect::PenDown, &mut trace);
        let roll_before = turtle.roll;
        turtle.apply(Effect::PengOn, &mut trace);
        assert_eq!(turtle.sprite, Sprite::Peng);
        turtle.apply(Effect::PengOff, &mut trace);
        assert_eq!(turtle.sprite, Sprite::Pen);
        assert!((turtle.roll - roll_before).abs() < 1e-9);
    }

    // ------------------------------------------------------------------
    // Whole-pipeline checks: compile, drive, inspect the final pose.
    // ------------------------------------------------------------------

    struct Scene {
        turtle: Turtle,
        canvas: Canvas,
    }

    impl EffectSink for Scene {
        fn apply(&mut self, _line: usize, effect: Effect) {
            self.turtle.apply(effect, &mut self.canvas);
        }

        fn highlight(&mut self, _line: Option<usize>) {}
    }

    fn drive(source: &str, deltas: &[f64]) -> Scene {
        let program = Engine::compile(source);
        assert!(program.error_lines.is_empty(), "source must compile");
        let mut machine = Machine::new();
        machine.load(program.instructions);
        let mut scene = Scene {
            turtle: Turtle::new(),
            canvas: Canvas::new(80, 24),
        };
        machine.start(&mut scene);
        for &delta in deltas {
            machine.advance(delta, &mut scene);
        }
        scene
    }

    #[test]
    fn repeated_forward_covers_the_full_distance() {
        let scene = drive(
            "repeat this sublist 2 times:\n  run 10 pixel forward",
            &[2.0, 2.0],
        );
        assert!((scene.turtle.y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn reslicing_elapsed_time_gives_the_same_pose() {
        let source = "\
hold pen down
run 40 pixel forward
turn 90 degree right
run 30 pixel forward
roll over
hide";
        let coarse = drive(source, &[7.0]);
        let fine_deltas: Vec<f64> = std::iter::repeat(0.05).take(140).collect();
        let fine = drive(source, &fine_deltas);

        assert!((coarse.turtle.x - fine.turtle.x).abs() < 1e-6);
        assert!((coarse.turtle.y - fine.turtle.y).abs() < 1e-6);
        assert!((coarse.turtle.heading - fine.turtle.heading).abs() < 1e-6);
        assert!((coarse.turtle.roll - fine.turtle.roll).abs() < 1e-6);
        assert!((coarse.turtle.fade - fine.turtle.fade).abs() < 1e-6);
    }
}
