//! The embedded FSR1 program and its pass table
//!
//! Generated at build time from `shaders/fsr1_manifest.yaml` and
//! `shaders/fsr1.wgsl`.

use crate::kernels::PassDescriptor;
use crate::resources::SurfaceId;

include!(concat!(env!("OUT_DIR"), "/program.rs"));
