use std::{fs, process};

use anyhow::{Context, Result, bail};

use tty_turtle::{engine::Engine, player::Player, share};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

const RUN_USAGE: &str = "tty-turtle run <script.turtle>";
const CHECK_USAGE: &str = "tty-turtle check <script.turtle>";
const DEMO_USAGE: &str = "tty-turtle demo <script.turtle>";
const ENCODE_USAGE: &str = "tty-turtle encode <script.turtle>";
const DECODE_USAGE: &str = "tty-turtle decode <code> <script.turtle>";

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);

    match args.next().as_deref() {
        Some("run") => {
            let path = args.next().context(RUN_USAGE)?;
            play(&path)
        }
        Some("check") => {
            let path = args.next().context(CHECK_USAGE)?;
            check(&path)
        }
        Some("demo") => {
            let path = args.next().context(DEMO_USAGE)?;
            demo(&path)
        }
        Some("encode") => {
            let path = args.next().context(ENCODE_USAGE)?;
            encode(&path)
        }
        Some("decode") => {
            let code = args.next().context(DECODE_USAGE)?;
            let path = args.next().context(DECODE_USAGE)?;
            decode(&code, &path)
        }
        _ => bail!(
            "tty-turtle — terminal-native turtle graphics animator\n\nUsage:\n  {RUN_USAGE}\n  {CHECK_USAGE}\n  {DEMO_USAGE}\n  {ENCODE_USAGE}\n  {DECODE_USAGE}"
        ),
    }
}

fn play(path: &str) -> Result<()> {
    let mut player = Player::open(path)?;
    player.play()
}

fn check(path: &str) -> Result<()> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    let program = Engine::compile(&source);

    for &line in &program.error_lines {
        eprintln!("line {}: I don't understand that!", line + 1);
    }
    if !program.error_lines.is_empty() {
        bail!(
            "{} line(s) not understood in {path}",
            program.error_lines.len()
        );
    }

    eprintln!(
        "Compiled {} instructions from {path}",
        program.instructions.len()
    );
    Ok(())
}

fn demo(path: &str) -> Result<()> {
    fs::write(path, DEMO_SCRIPT).with_context(|| format!("Failed to write {path}"))?;
    eprintln!("Wrote example script to {path}");
    Ok(())
}

fn encode(path: &str) -> Result<()> {
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    println!("{}", share::encode(&source));
    Ok(())
}

fn decode(code: &str, path: &str) -> Result<()> {
    let source = share::decode(code)?;
    fs::write(path, &source).with_context(|| format!("Failed to write {path}"))?;
    eprintln!("Wrote decoded script to {path}");
    Ok(())
}

const DEMO_SCRIPT: &str = "\
turn 20 degree right

hold pen down

repeat this sublist 4 times:
  run 100 pixel forward
  turn 90 degree left

bark

roll over

peng

pick pen up

run 50 pixel forward

hide
";
