use std::path::PathBuf;

fn main() {
    let mut target_board: Option<String> = None;

    for (name, _) in std::env::vars() {
        let prefix = "CARGO_FEATURE_TARGET_BOARD_";
        if let Some(suffix) = name.strip_prefix(prefix) {
            if let Some(previous) = &target_board {
                panic!(
                    "multiple target board features defined (at least {} and {})",
                    show_feature(previous),
                    show_feature(suffix)
                );
            }

            target_board = Some(suffix.to_string());
        }
    }

    if target_board.is_none() {
        panic!("missing target-board-* feature");
    }

    // riscv-rt's link.x expects the MEMORY regions and aliases from memory.x,
    // which is passed to the linker ahead of it.
    let out = PathBuf::from(std::env::var_os("OUT_DIR").unwrap());
    std::fs::copy("memory.x", out.join("memory.x")).unwrap();
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rustc-link-arg-bins=-Tmemory.x");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rerun-if-changed=memory.x");
}

fn show_feature(envvar: &str) -> String {
    let mut name = "target-board-".to_string();
    name.push_str(&envvar.to_ascii_lowercase().replace('_', "-"));
    name
}
