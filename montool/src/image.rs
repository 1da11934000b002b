//! Program images: raw binaries, or ASCII hex with one 32-bit word per line.
//!
//! Hex files hold each word most significant digit first, as `objcopy`-style
//! tools and `$readmemh` expect. The target is little-endian, so each word
//! goes over the wire least significant byte first.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Format {
    /// Bytes sent exactly as they are in the file.
    Bin,
    /// ASCII hex, one 32-bit word per line.
    Hex,
}

impl Format {
    /// Guesses from the file extension: `.hex` is hex, anything else binary.
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(e) if e.eq_ignore_ascii_case("hex") => Format::Hex,
            _ => Format::Bin,
        }
    }
}

/// Reads an image, working out its format from the name if not given.
pub fn load(path: &Path, format: Option<Format>) -> Result<Vec<u8>> {
    let format = format.unwrap_or_else(|| Format::detect(path));
    tracing::debug!(?path, ?format, "loading image");
    match format {
        Format::Bin => std::fs::read(path).with_context(|| format!("reading {}", path.display())),
        Format::Hex => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            parse_hex(&text).with_context(|| format!("parsing {}", path.display()))
        }
    }
}

/// The significant lines of a hex file, with their 1-based line numbers.
/// Blank lines are skipped.
fn words(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn check_word(n: usize, word: &str) -> Result<()> {
    if word.len() != 8 || !word.bytes().all(|b| b.is_ascii_hexdigit()) {
        bail!("line {n}: expected 8 hex digits, found {word:?}");
    }
    Ok(())
}

/// Converts ASCII hex to the bytes to send.
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let mut out = vec![];
    for (n, word) in words(text) {
        check_word(n, word)?;
        let value = u32::from_str_radix(word, 16).with_context(|| format!("line {n}"))?;
        out.extend_from_slice(&value.to_le_bytes());
    }
    Ok(out)
}

/// Reverses the byte order of every word in an ASCII hex file, keeping the
/// digits' case. `76543210` becomes `10325476`.
pub fn swap_hex(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    for (n, word) in words(text) {
        check_word(n, word)?;
        for i in (0..4).rev() {
            out.push_str(&word[i * 2..i * 2 + 2]);
        }
        out.push('\n');
    }
    Ok(out)
}
