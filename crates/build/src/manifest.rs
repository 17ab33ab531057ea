//! Pipeline Manifest Parser
//!
//! This module parses and structurally validates the YAML manifest that describes
//! the upscaler's compute passes: which entry point each pass runs, how large a
//! tile each thread group covers, and which surfaces it reads and writes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Surfaces owned by the upscaler's resource set
///
/// The variant names are emitted verbatim into generated code, so they must match
/// the runtime `SurfaceId` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum SurfaceRef {
    /// Low-resolution color input, written by the host
    #[serde(rename = "color")]
    Color,
    /// Work surface 1, upsampled candidate
    #[serde(rename = "upsampled")]
    Upsampled,
    /// Work surface 2, sharpened candidate
    #[serde(rename = "sharpened")]
    Sharpened,
    /// Work surface 3, display-corrected output
    #[serde(rename = "output")]
    Output,
}

impl fmt::Display for SurfaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color => write!(f, "color"),
            Self::Upsampled => write!(f, "upsampled"),
            Self::Sharpened => write!(f, "sharpened"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// A single compute pass in the manifest
#[derive(Debug, Clone, Deserialize)]
pub struct PassSpec {
    /// Short identifier used in diagnostics
    pub id: String,
    /// Human-readable name, used for GPU object labels
    pub name: String,
    /// Compute entry point in the program source
    pub entry_point: String,
    /// Source pixels covered by one thread group along each axis
    pub tile_size: u32,
    /// Surface sampled by this pass
    pub input: SurfaceRef,
    /// Surface written by this pass
    pub output: SurfaceRef,
}

/// The whole manifest: one program file and its ordered passes
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSpec {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// WGSL file, relative to the manifest
    pub file: String,
    /// Thread-group size every entry point must declare (x, y); z is always 1
    pub workgroup_size: [u32; 2],
    pub passes: Vec<PassSpec>,
}

impl PipelineSpec {
    /// Parses a pipeline manifest from YAML content
    ///
    /// # Arguments
    /// * `yaml_content` - YAML string containing the manifest
    pub fn from_yaml(yaml_content: &str) -> Result<Self, serde_norway::Error> {
        serde_norway::from_str(yaml_content)
    }

    /// Parses a pipeline manifest from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the YAML manifest file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(&content)?)
    }

    /// Checks the manifest for structural problems
    ///
    /// Surfaces must form a chain: the color input is the only surface available
    /// before the first pass, each pass reads something already produced, no pass
    /// reads the surface it writes, no surface is written twice, and the final pass
    /// writes the output surface.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.id.is_empty() {
            return Err(ManifestError::EmptyId);
        }
        if self.name.is_empty() {
            return Err(ManifestError::EmptyName);
        }
        if self.passes.is_empty() {
            return Err(ManifestError::NoPasses);
        }

        let mut produced = HashSet::from([SurfaceRef::Color]);
        for (index, pass) in self.passes.iter().enumerate() {
            if pass.input == pass.output {
                return Err(ManifestError::ReadWriteAlias(index, pass.input));
            }
            if !produced.contains(&pass.input) {
                return Err(ManifestError::InputNotProduced(index, pass.input));
            }
            if !produced.insert(pass.output) {
                return Err(ManifestError::SurfaceOverwritten(index, pass.output));
            }
        }

        let last = self.passes.len() - 1;
        if self.passes[last].output != SurfaceRef::Output {
            return Err(ManifestError::OutputNotInLastPass(last));
        }

        Ok(())
    }
}

/// Structural errors in a pipeline manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// Pipeline ID field is empty
    EmptyId,
    /// Pipeline name field is empty
    EmptyName,
    /// Pipeline contains no passes
    NoPasses,
    /// A pass reads the surface it writes (pass index, surface)
    ReadWriteAlias(usize, SurfaceRef),
    /// A pass reads a surface no earlier pass produced (pass index, surface)
    InputNotProduced(usize, SurfaceRef),
    /// A surface is written more than once, or the color input is written (pass index, surface)
    SurfaceOverwritten(usize, SurfaceRef),
    /// The last pass does not write the output surface (pass index)
    OutputNotInLastPass(usize),
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "Pipeline ID cannot be empty"),
            Self::EmptyName => write!(f, "Pipeline name cannot be empty"),
            Self::NoPasses => write!(f, "Pipeline must have at least one pass"),
            Self::ReadWriteAlias(pass, surface) => write!(f, "Pass {pass} reads and writes surface '{surface}'"),
            Self::InputNotProduced(pass, surface) => write!(f, "Input surface '{surface}' in pass {pass} was not produced by any previous pass"),
            Self::SurfaceOverwritten(pass, surface) => write!(f, "Surface '{surface}' is being overwritten in pass {pass}"),
            Self::OutputNotInLastPass(pass) => write!(f, "Last pass {pass} must write the 'output' surface"),
        }
    }
}

impl std::error::Error for ManifestError {}
