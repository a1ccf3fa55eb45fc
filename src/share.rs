//! Share codec — script text ⇄ compact code.
//!
//! Turns a script into a single URL- and clipboard-safe token so drawings
//! can be passed around as one string. Plain URL-safe base64 without
//! padding; `decode` rejects anything malformed rather than guessing.

use anyhow::{Context, Result, bail};

const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

pub fn encode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(3) {
        let n = (chunk[0] as u32) << 16
            | (*chunk.get(1).unwrap_or(&0) as u32) << 8
            | *chunk.get(2).unwrap_or(&0) as u32;
        for i in 0..=chunk.len() {
            out.push(ALPHABET[(n >> (18 - 6 * i)) as usize & 63] as char);
        }
    }
    out
}

pub fn decode(code: &str) -> Result<String> {
    let code = code.trim();
    if code.len() % 4 == 1 {
        bail!("share code is truncated");
    }
    let mut bytes = Vec::with_capacity(code.len() / 4 * 3 + 2);
    for chunk in code.as_bytes().chunks(4) {
        let mut n: u32 = 0;
        for &c in chunk {
            n = n << 6 | sextet(c)?;
        }
        let missing = 4 - chunk.len();
        n <<= 6 * missing;
        let be = n.to_be_bytes();
        bytes.extend_from_slice(&be[1..4 - missing]);
    }
    String::from_utf8(bytes).context("share code does not decode to text")
}

fn sextet(c: u8) -> Result<u32> {
    let v = match c {
        b'A'..=b'Z' => c - b'A',
        b'a'..=b'z' => c - b'a' + 26,
        b'0'..=b'9' => c - b'0' + 52,
        b'-' => 62,
        b'_' => 63,
        _ => bail!("share code contains an invalid character: {:?}", c as char),
    };
    Ok(v as u32)
}
