//! Terminal-native turtle graphics, animated.
//!
//! Scripts are plain text, one command per line (`run 100 pixel forward`,
//! `turn 90 degree left`, `repeat this sublist 4 times:` ...). The engine
//! compiles them into a flat instruction sequence, and the machine plays
//! that sequence against wall-clock time so every stroke and turn animates
//! instead of appearing at once.
//!
//! Pipeline: script text → [`engine::Engine`] → instructions →
//! [`machine::Machine`], driven each frame by [`player::Player`], mutating
//! [`turtle::Turtle`] and drawing through [`canvas::Canvas`].

pub mod canvas;
pub mod engine;
pub mod machine;
pub mod player;
pub mod share;
pub mod turtle;
pub mod types;
