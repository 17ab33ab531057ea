//! Program inspection tool
//!
//! Loads a pipeline manifest, validates its WGSL program and prints the pass
//! table with the thread-group grid each pass would dispatch for a given input size.

use fsr1_wgpu_build::load_program;
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 && args.len() != 4 {
        eprintln!("Usage: {} <manifest.yaml> [width height]", args[0]);
        eprintln!("Validates a manifest and prints its passes and dispatch grids");
        process::exit(1);
    }

    let manifest_path = &args[1];
    let input_size = if args.len() == 4 {
        match (args[2].parse::<u32>(), args[3].parse::<u32>()) {
            (Ok(width), Ok(height)) if width > 0 && height > 0 => (width, height),
            _ => {
                eprintln!("Error: width and height must be positive integers");
                process::exit(1);
            }
        }
    } else {
        (800, 600)
    };

    let program = match load_program(manifest_path, false) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Error loading manifest '{manifest_path}': {e}");
            process::exit(1);
        }
    };

    let spec = &program.spec;
    println!("{} ({})", spec.name, spec.id);
    println!("workgroup size: {}x{}x1", spec.workgroup_size[0], spec.workgroup_size[1]);
    println!("input size: {}x{}", input_size.0, input_size.1);
    for (index, pass) in spec.passes.iter().enumerate() {
        println!(
            "  pass {}: {} [{}] {} -> {}, tile {}, grid {}x{}x1",
            index + 1,
            pass.name,
            pass.entry_point,
            pass.input,
            pass.output,
            pass.tile_size,
            input_size.0.div_ceil(pass.tile_size),
            input_size.1.div_ceil(pass.tile_size),
        );
    }
}
