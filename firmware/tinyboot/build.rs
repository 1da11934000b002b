use std::{env::VarError, path::PathBuf};
use std::io::Write;

/// Must match fpca's `REFCLK_HZ`.
const REFCLK_HZ: u32 = 50_000_000;

fn main() {
    let manifest_dir = PathBuf::from(std::env::var_os("CARGO_MANIFEST_DIR").unwrap());
    println!("cargo:rustc-link-search={}", manifest_dir.display());
    println!("cargo:rustc-link-arg-bins=-Ttinyboot.x");
    println!("cargo:rerun-if-changed=tinyboot.x");

    let uart_addr = setting("TINYBOOT_UART_ADDR", "UART address", 0x2000_0000);
    let baud = setting("TINYBOOT_BAUD", "baud rate", 9600);
    let load_start = setting("TINYBOOT_LOAD_START", "load window start", 0x0000_0000);
    // Inclusive. Everything below tinyboot itself.
    let load_end = setting("TINYBOOT_LOAD_END", "load window end", 0x0000_EFFF);

    if baud == 0 || REFCLK_HZ / baud == 0 {
        panic!("baud rate {baud} can't be reached from a {REFCLK_HZ} Hz clock");
    }
    if load_start > load_end {
        panic!("load window {load_start:#x}..={load_end:#x} is empty");
    }

    let mut out = PathBuf::from(std::env::var_os("OUT_DIR").unwrap());
    out.push("config.rs");

    let mut f = std::fs::File::create(&out).unwrap();
    writeln!(f, "pub const UART_ADDR: u32 = 0x{uart_addr:x};").unwrap();
    writeln!(f, "pub const BAUD: u32 = {baud};").unwrap();
    writeln!(f, "pub const LOAD_START: u32 = 0x{load_start:x};").unwrap();
    writeln!(f, "pub const LOAD_END: u32 = 0x{load_end:x};").unwrap();
}

/// Reads a number from the environment, falling back to `default` with a
/// note if it isn't set.
fn setting(var: &str, what: &str, default: u32) -> u32 {
    println!("cargo:rerun-if-env-changed={var}");

    let input = match std::env::var(var) {
        // Ugh why is this not an Option
        Err(VarError::NotPresent) => None,
        Ok(result) => Some(result),
        e => panic!("{:?}", e),
    };

    match input {
        None => {
            println!("cargo:warning=note: {what} not provided, defaulting to {default:#x}");
            default
        }
        Some(text) => parse_int::parse::<u32>(&text)
            .unwrap_or_else(|e| panic!("can't parse {var}={text:?}: {e}")),
    }
}
