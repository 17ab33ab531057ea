//! Rust code generation for embedded programs

use crate::Program;

/// Generates the Rust source embedded by the runtime crate
///
/// The output defines `PROGRAM_NAME`, `PROGRAM_SOURCE`, `WORKGROUP_SIZE` and a
/// `PASSES` table of `PassDescriptor`s. It expects `PassDescriptor` and
/// `SurfaceId` to be in scope where it is included.
pub fn dump_program(program: &Program) -> String {
    let spec = &program.spec;
    let mut output = String::new();

    output.push_str("// This file is generated by the build script.\n\n");
    output.push_str(&format!("pub const PROGRAM_NAME: &str = {:?};\n\n", spec.name));
    output.push_str(&format!("pub const PROGRAM_SOURCE: &str = {:?};\n\n", program.source));
    output.push_str(&format!("pub const WORKGROUP_SIZE: (u32, u32) = ({}, {});\n\n", spec.workgroup_size[0], spec.workgroup_size[1]));

    output.push_str("pub const PASSES: &[PassDescriptor] = &[\n");
    for pass in &spec.passes {
        output.push_str("    PassDescriptor {\n");
        output.push_str(&format!("        name: {:?},\n", pass.name));
        output.push_str(&format!("        entry_point: {:?},\n", pass.entry_point));
        output.push_str(&format!("        tile_size: {},\n", pass.tile_size));
        output.push_str(&format!("        input: SurfaceId::{:?},\n", pass.input));
        output.push_str(&format!("        output: SurfaceId::{:?},\n", pass.output));
        output.push_str("    },\n");
    }
    output.push_str("];\n\n");

    output.push_str("// END OF GENERATED CODE\n");

    output
}
