//! Engine — the semantic compiler.
//!
//! Turns script text into a flat instruction sequence, one line at a time.
//! The engine understands normalization, the command grammar, and repeat
//! scoping. It never deals with timing or the terminal — those belong to
//! the machine and the player.
//!
//! A failing line never aborts the compile: its number is collected for the
//! error markers and the rest of the script still runs, so a half-written
//! script stays animated while the author types.

mod grammar;

use crate::machine::{Instruction, Op};

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    pub instructions: Vec<Instruction>,
    /// 0-indexed source lines that matched no command.
    pub error_lines: Vec<usize>,
}

/// A repeat header whose body is still being collected.
struct OpenLoop {
    indent: usize,
    /// Index of the `RepeatStart` awaiting its backpatched end.
    start: usize,
    line: usize,
}

pub struct Engine;

impl Engine {
    /// Compile script text into an instruction sequence.
    ///
    /// Compilation is pure and re-entrant: identical text always yields an
    /// identical program and error-line set. Callers hand the result to a
    /// fresh or stopped machine; nothing here keeps state between runs.
    pub fn compile(source: &str) -> CompiledProgram {
        let mut instructions = Vec::new();
        let mut error_lines = Vec::new();
        let mut open: Vec<OpenLoop> = Vec::new();

        for (line_no, raw) in source.lines().enumerate() {
            let indent = raw.chars().take_while(|c| c.is_whitespace()).count();
            let tokens: Vec<String> = raw
                .split_whitespace()
                .map(|t| t.to_lowercase())
                .collect();
            // Blank lines neither compile nor close a repeat body.
            if tokens.is_empty() {
                continue;
            }

            // Stepping back to (or left of) a header's indent closes it.
            while open.last().is_some_and(|l| indent <= l.indent) {
                if let Some(finished) = open.pop() {
                    close_loop(&mut instructions, finished);
                }
            }

            let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
            match grammar::match_line(&tokens) {
                Some(grammar::Match::Instr(op)) => {
                    instructions.push(Instruction { op, line: line_no });
                }
                Some(grammar::Match::Repeat { times }) => {
                    open.push(OpenLoop {
                        indent,
                        start: instructions.len(),
                        line: line_no,
                    });
                    instructions.push(Instruction {
                        op: Op::RepeatStart { times, end: 0 },
                        line: line_no,
                    });
                }
                None => error_lines.push(line_no),
            }
        }

        // End of input closes every loop still open.
        while let Some(finished) = open.pop() {
            close_loop(&mut instructions, finished);
        }

        CompiledProgram {
            instructions,
            error_lines,
        }
    }
}

/// Emit the footer for `finished` and backpatch its header's end index.
fn close_loop(instructions: &mut Vec<Instruction>, finished: OpenLoop) {
    instructions.push(Instruction {
        op: Op::RepeatEnd {
            body: finished.start + 1,
        },
        line: finished.line,
    });
    let end = instructions.len();
    if let Op::RepeatStart { end: slot, .. } = &mut instructions[finished.start].op {
        *slot = end;
    }
}
