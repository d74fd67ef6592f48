// Library exports for reuse by the CLI and other applications
pub mod assembler;
pub mod cli;
pub mod config_file;
pub mod frames;
pub mod json_output;
pub mod tool;
pub mod utils;

// Re-export commonly used types
pub use assembler::{
    assemble, AssemblyError, AssemblyPlan, CommandRunner, GifAssembler, RunOutput, SystemRunner,
    DEFAULT_TOOL,
};
pub use json_output::JsonMessage;
