//! Build script for fsr1-wgpu crate
//!
//! Validates the FSR1 WGSL program against its pipeline manifest and embeds it,
//! together with the generated pass table, into the compiled library. A program
//! whose entry points or thread-group sizes disagree with the manifest fails the
//! build here rather than at upscaler construction.

use fsr1_wgpu_build::{dump_program, load_program};

const MANIFEST_PATH: &str = "shaders/fsr1_manifest.yaml";

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    let manifest_path = format!("{manifest_dir}/{MANIFEST_PATH}");

    println!("cargo:rerun-if-changed={MANIFEST_PATH}");
    println!("cargo:rerun-if-changed=shaders/fsr1.wgsl");

    // Keep debug builds readable in GPU debuggers
    let minify = std::env::var("PROFILE").is_ok_and(|profile| profile == "release");

    let program = load_program(&manifest_path, minify).unwrap_or_else(|e| panic!("Failed to load FSR1 program: {e}"));
    let code = dump_program(&program);

    let out_dir = std::env::var("OUT_DIR").expect("OUT_DIR not set");
    let output_path = std::path::PathBuf::from(out_dir).join("program.rs");
    std::fs::write(output_path, code).expect("Failed to write program.rs");
}
