//! WGSL program validation and minification
//!
//! A manifest is only useful if the program really exposes the entry points it
//! names with the thread-group shape the dispatch math assumes. This module checks
//! that with naga before the program is embedded into the runtime crate.

use crate::manifest::{ManifestError, PipelineSpec};
use std::fmt;

/// Errors raised while validating a program against its manifest
#[derive(Debug, Clone)]
pub enum ProgramError {
    /// The manifest itself is malformed
    Manifest(ManifestError),
    /// WGSL failed to parse (rendered diagnostic)
    Parse(String),
    /// WGSL parsed but failed validation (rendered diagnostic)
    Validation(String),
    /// A pass names an entry point the program does not define (pass id, entry point)
    MissingEntryPoint(String, String),
    /// A pass names an entry point that is not a compute shader (pass id, entry point)
    NotCompute(String, String),
    /// An entry point's workgroup size differs from the manifest (pass id, expected, actual)
    WorkgroupSizeMismatch(String, [u32; 2], [u32; 3]),
    /// A tile is not a positive multiple of the workgroup size (pass id, tile size)
    InvalidTileSize(String, u32),
    /// naga could not write the module back out as WGSL
    Writer(String),
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest(e) => write!(f, "Invalid manifest: {e}"),
            Self::Parse(diagnostic) => write!(f, "Failed to parse WGSL:\n{diagnostic}"),
            Self::Validation(diagnostic) => write!(f, "Failed to validate WGSL:\n{diagnostic}"),
            Self::MissingEntryPoint(pass, entry_point) => write!(f, "Pass '{pass}' uses entry point '{entry_point}' which does not exist"),
            Self::NotCompute(pass, entry_point) => write!(f, "Pass '{pass}' uses entry point '{entry_point}' which is not a compute shader"),
            Self::WorkgroupSizeMismatch(pass, expected, actual) => write!(
                f,
                "Pass '{pass}' expects workgroup size {}x{}x1 but the entry point declares {}x{}x{}",
                expected[0], expected[1], actual[0], actual[1], actual[2]
            ),
            Self::InvalidTileSize(pass, tile_size) => write!(f, "Pass '{pass}' has tile size {tile_size} which is not a positive multiple of the workgroup size"),
            Self::Writer(message) => write!(f, "Failed to write WGSL: {message}"),
        }
    }
}

impl std::error::Error for ProgramError {}

impl From<ManifestError> for ProgramError {
    fn from(e: ManifestError) -> Self {
        Self::Manifest(e)
    }
}

/// Parses and validates a WGSL program against its manifest
///
/// # Arguments
/// * `spec` - The parsed pipeline manifest
/// * `source` - WGSL source code of the program
///
/// # Returns
/// The parsed naga module, ready for minification
pub fn validate_program(spec: &PipelineSpec, source: &str) -> Result<naga::Module, ProgramError> {
    spec.validate()?;

    let module = naga::front::wgsl::parse_str(source).map_err(|e| ProgramError::Parse(e.emit_to_string(source)))?;

    let mut validator = naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all());
    validator.validate(&module).map_err(|e| ProgramError::Validation(e.emit_to_string(source)))?;

    let [group_x, group_y] = spec.workgroup_size;
    for pass in &spec.passes {
        let entry_point = module
            .entry_points
            .iter()
            .find(|ep| ep.name == pass.entry_point)
            .ok_or_else(|| ProgramError::MissingEntryPoint(pass.id.clone(), pass.entry_point.clone()))?;

        if entry_point.stage != naga::ShaderStage::Compute {
            return Err(ProgramError::NotCompute(pass.id.clone(), pass.entry_point.clone()));
        }

        if entry_point.workgroup_size != [group_x, group_y, 1] {
            return Err(ProgramError::WorkgroupSizeMismatch(pass.id.clone(), spec.workgroup_size, entry_point.workgroup_size));
        }

        if pass.tile_size == 0 || pass.tile_size % group_x != 0 || pass.tile_size % group_y != 0 {
            return Err(ProgramError::InvalidTileSize(pass.id.clone(), pass.tile_size));
        }
    }

    Ok(module)
}

/// Minifies a validated module back into compact WGSL
///
/// Entry point names survive minification, which is all the runtime relies on.
pub fn minify_program(mut module: naga::Module) -> Result<String, ProgramError> {
    wgsl_minifier::minify_module(&mut module);

    let mut validator = naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all());
    let info = validator.validate(&module).map_err(|e| ProgramError::Validation(e.to_string()))?;
    let output = naga::back::wgsl::write_string(&module, &info, naga::back::wgsl::WriterFlags::empty()).map_err(|e| ProgramError::Writer(e.to_string()))?;

    Ok(wgsl_minifier::minify_wgsl_source(&output))
}
