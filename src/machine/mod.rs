//! Machine — the time-sliced scheduler.
//!
//! Holds the compiled program, the current-instruction pointer, and a stack
//! of loop activation frames. `advance` consumes an elapsed-time budget in
//! beats, splitting it at instruction boundaries so no instruction ever
//! receives more delta than it has remaining — a huge frame delta (say,
//! after the terminal was suspended) walks cleanly across several
//! instructions, firing every enter and exit hook exactly once.
//!
//! The machine is speed-agnostic: the frame loop scales raw elapsed time by
//! the turtle's speed before calling in. It also never draws — every side
//! effect goes through the [`EffectSink`] the caller supplies.

mod instruction;

pub use instruction::{Effect, Instruction, Motion, Op};

/// Where instruction side effects land.
///
/// The player backs this with the turtle, the canvas, and the script panel;
/// tests back it with a recorder.
pub trait EffectSink {
    /// Apply an instantaneous effect originating from source `line`.
    fn apply(&mut self, line: usize, effect: Effect);

    /// `Some(line)` whenever an instruction becomes current; `None` exactly
    /// once per transition into the idle state.
    fn highlight(&mut self, line: Option<usize>);
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameKind {
    Base,
    /// A live repeat: jump-back target and iterations left to run.
    Loop { body: usize, left: u32 },
}

/// One loop-context frame. The top of the stack always times the currently
/// executing instruction.
#[derive(Debug, Clone, Copy)]
struct Frame {
    /// Beats left before the current instruction exits.
    remaining: f64,
    /// Set on landing, cleared once the enter hook has fired.
    fresh: bool,
    kind: FrameKind,
}

impl Frame {
    fn base() -> Frame {
        Frame {
            remaining: 0.0,
            fresh: false,
            kind: FrameKind::Base,
        }
    }
}

pub struct Machine {
    program: Vec<Instruction>,
    /// Index of the current instruction; `None` while idle.
    ip: Option<usize>,
    /// Never empty — the bottom entry is the base frame.
    stack: Vec<Frame>,
}

impl Machine {
    pub fn new() -> Machine {
        Machine {
            program: Vec::new(),
            ip: None,
            stack: vec![Frame::base()],
        }
    }

    /// Replace the program wholesale and reset to idle. Always called with
    /// a freshly compiled sequence; instructions are never edited in place.
    pub fn load(&mut self, program: Vec<Instruction>) {
        self.program = program;
        self.reset();
    }

    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    pub fn is_running(&self) -> bool {
        self.ip.is_some()
    }

    fn reset(&mut self) {
        self.ip = None;
        self.stack.clear();
        self.stack.push(Frame::base());
    }

    /// Point at the first instruction and jump to it. A machine with an
    /// empty program stays idle.
    pub fn start(&mut self, sink: &mut dyn EffectSink) {
        self.reset();
        if !self.program.is_empty() {
            self.ip = Some(0);
            self.jump(sink);
        }
    }

    /// Cancel immediately: all in-flight timing state is discarded and
    /// pending exit hooks are deliberately not fired.
    pub fn stop(&mut self, sink: &mut dyn EffectSink) {
        let was_running = self.ip.is_some();
        self.reset();
        if was_running {
            sink.highlight(None);
        }
    }

    /// Consume a non-negative time budget, in beats, possibly crossing
    /// several instruction boundaries. Calling while idle is a no-op.
    pub fn advance(&mut self, total: f64, sink: &mut dyn EffectSink) {
        if self.ip.is_none() {
            return;
        }
        let mut budget = total.max(0.0);
        while let Some(ip) = self.ip {
            if budget <= 0.0 {
                break;
            }
            let top = self.top_mut();
            let step = top.remaining.min(budget);
            top.remaining -= step;
            budget -= step;
            self.exact_step(ip, step, sink);
        }
        if self.ip.is_none() {
            sink.highlight(None);
        }
    }

    /// Run the current instruction for exactly `step` beats of its
    /// remaining time. Ordering contract: enter before animate, animate
    /// before exit, exit before jump.
    fn exact_step(&mut self, ip: usize, step: f64, sink: &mut dyn EffectSink) {
        if self.top_mut().fresh {
            self.top_mut().fresh = false;
            self.enter(ip, sink);
        }
        self.animate(ip, step, sink);
        if self.top_mut().remaining == 0.0 {
            self.ip = Some(ip + 1);
            self.exit(ip, sink);
            self.jump(sink);
        }
    }

    fn enter(&mut self, ip: usize, sink: &mut dyn EffectSink) {
        let inst = self.program[ip];
        match inst.op {
            Op::Enter(effect) | Op::EnterExit(effect, _) => sink.apply(inst.line, effect),
            _ => {}
        }
    }

    fn animate(&mut self, ip: usize, step: f64, sink: &mut dyn EffectSink) {
        let inst = self.program[ip];
        if let Op::Animate(motion) = inst.op {
            sink.apply(inst.line, Effect::Move(motion.step(step)));
        }
    }

    /// The exit hook is also where control flow lives: loop headers push an
    /// activation frame (or skip a zero-count body) and loop footers jump
    /// back while iterations remain.
    fn exit(&mut self, ip: usize, sink: &mut dyn EffectSink) {
        let inst = self.program[ip];
        match inst.op {
            Op::EnterExit(_, effect) => sink.apply(inst.line, effect),
            Op::RepeatStart { times, end } => {
                if times == 0 {
                    self.ip = Some(end);
                } else {
                    self.stack.push(Frame {
                        remaining: 0.0,
                        fresh: false,
                        kind: FrameKind::Loop {
                            body: ip + 1,
                            left: times,
                        },
                    });
                }
            }
            Op::RepeatEnd { body } => {
                if let FrameKind::Loop { left, .. } = &mut self.top_mut().kind {
                    if *left > 1 {
                        *left -= 1;
                        self.ip = Some(body);
                    } else {
                        self.stack.pop();
                    }
                }
            }
            _ => {}
        }
    }

    /// Land on whatever the pointer now names: arm the top frame with the
    /// instruction's duration and announce it, or fall back to idle.
    fn jump(&mut self, sink: &mut dyn EffectSink) {
        match self.ip {
            Some(ip) if ip < self.program.len() => {
                let beats = self.program[ip].beats();
                let line = self.program[ip].line;
                let top = self.top_mut();
                top.remaining = beats;
                top.fresh = true;
                sink.highlight(Some(line));
            }
            _ => {
                self.ip = None;
                self.stack.clear();
                self.stack.push(Frame::base());
            }
        }
    }

    fn top_mut(&mut self) -> &mut Frame {
        // The stack always holds at least the base frame.
        let top = self.stack.len() - 1;
        &mut self.stack[top]
    }
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        effects: Vec<(usize, Effect)>,
        highlights: Vec<Option<usize>>,
    }

    impl EffectSink for RecordingSink {
        fn apply(&mut self, line: usize, effect: Effect) {
            self.effects.push((line, effect));
        }

        fn highlight(&mut self, line: Option<usize>) {
            self.highlights.push(line);
        }
    }

    impl RecordingSink {
        fn forward_total(&self) -> f64 {
            self.effects
                .iter()
                .map(|(_, e)| match e {
                    Effect::Move(Motion::Forward(d)) => *d,
                    _ => 0.0,
                })
                .sum()
        }

        fn count(&self, wanted: Effect) -> usize {
            self.effects.iter().filter(|(_, e)| *e == wanted).count()
        }

        fn stops(&self) -> usize {
            self.highlights.iter().filter(|h| h.is_none()).count()
        }
    }

    fn animate(motion: Motion, line: usize) -> Instruction {
        Instruction {
            op: Op::Animate(motion),
            line,
        }
    }

    fn loaded(program: Vec<Instruction>) -> Machine {
        let mut machine = Machine::new();
        machine.load(program);
        machine
    }

    #[test]
    fn empty_program_stays_idle() {
        let mut machine = loaded(vec![]);
        let mut sink = RecordingSink::default();
        machine.start(&mut sink);
        assert!(!machine.is_running());
        machine.advance(1.0, &mut sink);
        assert!(sink.effects.is_empty());
        assert!(sink.highlights.is_empty());
    }

    #[test]
    fn splits_delta_within_one_instruction() {
        let mut machine = loaded(vec![animate(Motion::Forward(10.0), 0)]);
        let mut sink = RecordingSink::default();
        machine.start(&mut sink);
        machine.advance(0.25, &mut sink);
        assert_eq!(sink.effects, vec![(0, Effect::Move(Motion::Forward(2.5)))]);
        assert!(machine.is_running());
        machine.advance(0.75, &mut sink);
        assert_eq!(sink.effects[1], (0, Effect::Move(Motion::Forward(7.5))));
        assert!(!machine.is_running());
        assert_eq!(sink.highlights, vec![Some(0), None]);
    }

    #[test]
    fn one_call_spans_several_instructions() {
        let mut machine = loaded(vec![
            animate(Motion::Forward(10.0), 0),
            animate(Motion::TurnLeft(90.0), 1),
            animate(Motion::Forward(10.0), 2),
        ]);
        let mut sink = RecordingSink::default();
        machine.start(&mut sink);
        machine.advance(2.5, &mut sink);
        assert_eq!(
            sink.effects,
            vec![
                (0, Effect::Move(Motion::Forward(10.0))),
                (1, Effect::Move(Motion::TurnLeft(90.0))),
                (2, Effect::Move(Motion::Forward(5.0))),
            ]
        );
        assert!(machine.is_running());
        machine.advance(0.5, &mut sink);
        assert_eq!(sink.forward_total(), 20.0);
        assert!(!machine.is_running());
    }

    #[test]
    fn zero_duration_instructions_exhaust_in_one_call() {
        let mut machine = loaded(vec![
            Instruction {
                op: Op::Enter(Effect::PenDown),
                line: 0,
            },
            Instruction {
                op: Op::Enter(Effect::Bark),
                line: 1,
            },
        ]);
        let mut sink = RecordingSink::default();
        machine.start(&mut sink);
        machine.advance(1.0, &mut sink);
        assert_eq!(
            sink.effects,
            vec![(0, Effect::PenDown), (1, Effect::Bark)]
        );
        assert_eq!(sink.highlights, vec![Some(0), Some(1), None]);
    }

    #[test]
    fn paired_pose_fires_enter_and_exit_once() {
        let mut machine = loaded(vec![Instruction {
            op: Op::EnterExit(Effect::PengOn, Effect::PengOff),
            line: 3,
        }]);
        let mut sink = RecordingSink::default();
        machine.start(&mut sink);
        for _ in 0..3 {
            machine.advance(0.3, &mut sink);
        }
        assert_eq!(sink.count(Effect::PengOn), 1);
        assert_eq!(sink.count(Effect::PengOff), 0);
        machine.advance(0.3, &mut sink);
        assert_eq!(sink.count(Effect::PengOn), 1);
        assert_eq!(sink.count(Effect::PengOff), 1);
        assert!(!machine.is_running());
    }

    #[test]
    fn stop_discards_pending_exit_hooks() {
        let mut machine = loaded(vec![Instruction {
            op: Op::EnterExit(Effect::PengOn, Effect::PengOff),
            line: 0,
        }]);
        let mut sink = RecordingSink::default();
        machine.start(&mut sink);
        machine.advance(0.5, &mut sink);
        machine.stop(&mut sink);
        assert_eq!(sink.count(Effect::PengOn), 1);
        assert_eq!(sink.count(Effect::PengOff), 0);
        assert_eq!(sink.highlights.last(), Some(&None));

        // Restarting replays from a clean slate.
        machine.start(&mut sink);
        machine.advance(1.0, &mut sink);
        assert_eq!(sink.count(Effect::PengOn), 2);
        assert_eq!(sink.count(Effect::PengOff), 1);
    }

    #[test]
    fn repeat_runs_body_exactly_count_times() {
        // repeat this sublist 2 times: / run 10 pixel forward
        let mut machine = loaded(vec![
            Instruction {
                op: Op::RepeatStart { times: 2, end: 3 },
                line: 0,
            },
            animate(Motion::Forward(10.0), 1),
            Instruction {
                op: Op::RepeatEnd { body: 1 },
                line: 0,
            },
        ]);
        let mut sink = RecordingSink::default();
        machine.start(&mut sink);
        machine.advance(2.0, &mut sink);
        machine.advance(2.0, &mut sink);

        assert_eq!(sink.forward_total(), 20.0);
        assert_eq!(sink.count(Effect::Move(Motion::Forward(10.0))), 2);
        let body_entries = sink
            .highlights
            .iter()
            .filter(|h| **h == Some(1))
            .count();
        assert_eq!(body_entries, 2);
        assert!(!machine.is_running());
    }

    #[test]
    fn nested_repeats_multiply() {
        // 2 * (3 * forward 1)
        let mut machine = loaded(vec![
            Instruction {
                op: Op::RepeatStart { times: 2, end: 6 },
                line: 0,
            },
            Instruction {
                op: Op::RepeatStart { times: 3, end: 5 },
                line: 1,
            },
            animate(Motion::Forward(1.0), 2),
            Instruction {
                op: Op::RepeatEnd { body: 2 },
                line: 1,
            },
            Instruction {
                op: Op::RepeatEnd { body: 1 },
                line: 0,
            },
        ]);
        let mut sink = RecordingSink::default();
        machine.start(&mut sink);
        machine.advance(100.0, &mut sink);
        assert_eq!(sink.count(Effect::Move(Motion::Forward(1.0))), 6);
        assert!(!machine.is_running());
    }

    #[test]
    fn zero_count_repeat_skips_body() {
        let mut machine = loaded(vec![
            Instruction {
                op: Op::RepeatStart { times: 0, end: 3 },
                line: 0,
            },
            animate(Motion::Forward(10.0), 1),
            Instruction {
                op: Op::RepeatEnd { body: 1 },
                line: 0,
            },
            Instruction {
                op: Op::Enter(Effect::Bark),
                line: 2,
            },
        ]);
        let mut sink = RecordingSink::default();
        machine.start(&mut sink);
        machine.advance(5.0, &mut sink);
        assert_eq!(sink.forward_total(), 0.0);
        assert_eq!(sink.count(Effect::Bark), 1);
    }

    #[test]
    fn reslicing_the_same_total_is_deterministic() {
        let program = vec![
            animate(Motion::Forward(10.0), 0),
            animate(Motion::TurnLeft(90.0), 1),
            animate(Motion::Forward(10.0), 2),
        ];

        let mut coarse = loaded(program.clone());
        let mut coarse_sink = RecordingSink::default();
        coarse.start(&mut coarse_sink);
        coarse.advance(3.0, &mut coarse_sink);

        let mut fine = loaded(program);
        let mut fine_sink = RecordingSink::default();
        fine.start(&mut fine_sink);
        for _ in 0..30 {
            fine.advance(0.1, &mut fine_sink);
        }

        assert!((coarse_sink.forward_total() - fine_sink.forward_total()).abs() < 1e-9);
        assert!(!coarse.is_running());
        assert!(!fine.is_running());
    }

    #[test]
    fn idle_advance_reports_stop_only_once() {
        let mut machine = loaded(vec![animate(Motion::Forward(10.0), 0)]);
        let mut sink = RecordingSink::default();
        machine.start(&mut sink);
        machine.advance(2.0, &mut sink);
        assert_eq!(sink.stops(), 1);
        machine.advance(1.0, &mut sink);
        machine.advance(1.0, &mut sink);
        assert_eq!(sink.stops(), 1);
    }
}
