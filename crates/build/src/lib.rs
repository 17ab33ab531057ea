//! FSR1-wgpu build utilities
//!
//! This crate turns the upscaler's pipeline manifest and WGSL program into
//! Rust source that the runtime crate embeds at build time. The program is
//! validated with naga against the manifest first, so a missing entry point or
//! a thread-group size that disagrees with the dispatch tiling fails the build
//! instead of the first frame.

mod codegen;

pub mod manifest;
pub mod program;

pub use codegen::dump_program;
pub use manifest::{ManifestError, PassSpec, PipelineSpec, SurfaceRef};
pub use program::{ProgramError, minify_program, validate_program};

/// A manifest together with its validated program source
#[derive(Debug, Clone)]
pub struct Program {
    /// The parsed manifest
    pub spec: PipelineSpec,
    /// WGSL source, minified when requested
    pub source: String,
}

/// Loads, validates and optionally minifies the program described by a manifest
///
/// # Arguments
/// * `manifest_path` - Path to the YAML manifest; the WGSL file is resolved relative to it
/// * `minify` - Whether to minify the WGSL code
///
/// # Returns
/// A `Program` ready to be dumped as Rust source
pub fn load_program(manifest_path: &str, minify: bool) -> Result<Program, Box<dyn std::error::Error>> {
    let spec = PipelineSpec::from_file(manifest_path)?;

    let dir = std::path::Path::new(manifest_path).parent().unwrap_or(std::path::Path::new("."));
    let source_path = dir.join(&spec.file);
    let source = std::fs::read_to_string(&source_path).inspect_err(|e| {
        eprintln!("Error reading file {source_path:?}: {e}");
    })?;

    let module = validate_program(&spec, &source)?;
    let source = if minify { minify_program(module)? } else { source };

    Ok(Program { spec, source })
}
