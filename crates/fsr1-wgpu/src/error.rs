//! Error types for upscaler construction, reconfiguration and dispatch

use crate::upscaler::UpscalerState;

/// Errors reported by the upscaler
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A kernel entry point failed to compile; fatal to construction
    #[error("failed to compile {pass} (entry point `{entry_point}`): {diagnostic}")]
    ShaderCompile {
        /// Pass the kernel belongs to
        pass: &'static str,
        /// Entry point that failed
        entry_point: &'static str,
        /// Compiler diagnostic text
        diagnostic: String,
    },

    /// The device rejected a surface, view or sampler creation
    #[error("failed to create {resource}: {reason}")]
    ResourceCreation {
        /// Label of the object that failed
        resource: String,
        /// Device-reported reason
        reason: String,
    },

    /// An operation was called in a state that does not allow it
    #[error("cannot {operation} while the upscaler is {state}")]
    InvalidState {
        /// The rejected operation
        operation: &'static str,
        /// State at the time of the call
        state: UpscalerState,
    },

    /// Input dimensions must both be positive
    #[error("invalid input dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested input width
        width: u32,
        /// Requested input height
        height: u32,
    },
}
