//! Build-time defaults for uthread-runtime
//!
//! Writes `OUT_DIR/uthread_merged_config.rs` with one `pub const` per
//! tunable. A file named by `UTHREAD_CONFIG_RS` may override any of them
//! with lines of the same `pub const NAME: TYPE = VALUE;` shape.

use std::env;
use std::fs;
use std::path::Path;

/// (name, type, default)
const TUNABLES: &[(&str, &str, &str)] = &[
    ("MAX_THREADS", "usize", "100"),
    ("STACK_SIZE", "usize", "64 * 1024"),
    ("QUANTUM_USECS", "u64", "10_000"),
    ("VIRTUAL_CLOCK", "bool", "true"),
    ("DEBUG_LOGGING", "bool", "false"),
];

fn main() {
    println!("cargo:rerun-if-env-changed=UTHREAD_CONFIG_RS");

    let mut values: Vec<String> = TUNABLES.iter().map(|t| t.2.to_string()).collect();

    if let Ok(path) = env::var("UTHREAD_CONFIG_RS") {
        println!("cargo:rerun-if-changed={}", path);
        match fs::read_to_string(&path) {
            Ok(text) => apply_overrides(&text, &mut values),
            Err(e) => println!("cargo:warning=cannot read UTHREAD_CONFIG_RS ({}): {}", path, e),
        }
    }

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let dest = Path::new(&out_dir).join("uthread_merged_config.rs");
    fs::write(dest, render(&values)).expect("cannot write merged config");
}

/// Replace defaults with any known constants found in `text`
fn apply_overrides(text: &str, values: &mut [String]) {
    for (name, value) in text.lines().filter_map(const_decl) {
        match TUNABLES.iter().position(|t| t.0 == name) {
            Some(i) => values[i] = value.to_string(),
            None => println!("cargo:warning=unknown uthread tunable {}", name),
        }
    }
}

/// Split `pub const NAME: TYPE = VALUE;` into (NAME, VALUE)
fn const_decl(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim().strip_prefix("pub const ")?;
    let (name, rest) = rest.split_once(':')?;
    let (_, value) = rest.split_once('=')?;
    let value = value.split(';').next()?.trim();
    Some((name.trim(), value))
}

fn render(values: &[String]) -> String {
    let mut out = String::from("// Generated by build.rs\n\n");
    for ((name, ty, _), value) in TUNABLES.iter().zip(values) {
        out.push_str(&format!("pub const {}: {} = {};\n", name, ty, value));
    }
    out
}
