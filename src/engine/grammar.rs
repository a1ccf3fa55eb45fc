//! The command grammar.
//!
//! An ordered table of rules, each owning a token pattern and a builder
//! from the captured numbers to an instruction kind. A `#` slot matches one
//! unsigned integer token; everything else matches literally. The first
//! matching rule wins — the table has no overlapping patterns, and keeping
//! evaluation deterministic means a line can never fire twice.

use crate::machine::{Effect, Motion, Op};

/// What a successful match tells the compiler to do.
pub enum Match {
    /// Append one instruction.
    Instr(Op),
    /// Open a repeat scope around the following deeper-indented lines.
    Repeat { times: u32 },
}

enum Build {
    Instr(fn(&[f64]) -> Op),
    RepeatHeader,
}

struct Rule {
    pattern: &'static [&'static str],
    build: Build,
}

const RULES: &[Rule] = &[
    Rule {
        pattern: &["bark"],
        build: Build::Instr(|_| Op::Enter(Effect::Bark)),
    },
    Rule {
        pattern: &["hide"],
        build: Build::Instr(|_| Op::Animate(Motion::FadeOut(100.0))),
    },
    Rule {
        pattern: &["show"],
        build: Build::Instr(|_| Op::Animate(Motion::FadeIn(100.0))),
    },
    Rule {
        pattern: &["hold", "pen", "down"],
        build: Build::Instr(|_| Op::Enter(Effect::PenDown)),
    },
    Rule {
        pattern: &["pick", "pen", "up"],
        build: Build::Instr(|_| Op::Enter(Effect::PenUp)),
    },
    Rule {
        pattern: &["peng"],
        build: Build::Instr(|_| Op::EnterExit(Effect::PengOn, Effect::PengOff)),
    },
    Rule {
        pattern: &["roll", "over"],
        build: Build::Instr(|_| Op::Animate(Motion::Roll(360.0))),
    },
    Rule {
        pattern: &["run", "#", "pixel", "forward"],
        build: Build::Instr(|args| Op::Animate(Motion::Forward(args[0]))),
    },
    Rule {
        pattern: &["turn", "#", "degree", "left"],
        build: Build::Instr(|args| Op::Animate(Motion::TurnLeft(args[0]))),
    },
    Rule {
        pattern: &["turn", "#", "degree", "right"],
        build: Build::Instr(|args| Op::Animate(Motion::TurnRight(args[0]))),
    },
    Rule {
        pattern: &["change", "pen", "width", "to", "#", "pixel"],
        build: Build::Instr(|args| Op::Enter(Effect::PenWidth(args[0]))),
    },
    Rule {
        pattern: &["change", "pen", "color", "to", "#", "#", "#"],
        build: Build::Instr(|args| {
            Op::Enter(Effect::PenColor(args[0] as u8, args[1] as u8, args[2] as u8))
        }),
    },
    Rule {
        pattern: &["change", "speed", "to", "#"],
        build: Build::Instr(|args| Op::Enter(Effect::Speed(args[0]))),
    },
    Rule {
        pattern: &["repeat", "this", "sublist", "#", "times:"],
        build: Build::RepeatHeader,
    },
];

/// Try every rule, in order, against one canonical line. `None` means the
/// line is not a command — including the case of a word where a number was
/// required, which deliberately surfaces as the same condition.
pub fn match_line(tokens: &[&str]) -> Option<Match> {
    for rule in RULES {
        if let Some(args) = match_pattern(rule.pattern, tokens) {
            return Some(match rule.build {
                Build::Instr(build) => Match::Instr(build(&args)),
                Build::RepeatHeader => Match::Repeat {
                    times: args[0] as u32,
                },
            });
        }
    }
    None
}

fn match_pattern(pattern: &[&str], tokens: &[&str]) -> Option<Vec<f64>> {
    if pattern.len() != tokens.len() {
        return None;
    }
    let mut args = Vec::new();
    for (slot, token) in pattern.iter().zip(tokens) {
        if *slot == "#" {
            args.push(parse_number(token)?);
        } else if slot != token {
            return None;
        }
    }
    Some(args)
}

/// Arguments are unsigned integer literals, nothing fancier.
fn parse_number(token: &str) -> Option<f64> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}
