use clap::parser::ValueSource;
use clap::{CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::assembler::DEFAULT_TOOL;

pub const DEFAULT_FPS: u32 = 10;
pub const DEFAULT_OUTPUT: &str = "out.gif";
pub const DEFAULT_EXTENSIONS: &str = "png,jpg,jpeg,gif,bmp,tiff,webp";

#[derive(Parser, Debug)]
#[command(
    name = "gif-assembler",
    about = "Assemble a sequence of frame images into an animated GIF",
    long_about = "
GIF Assembler

Builds an animated GIF from an ordered list of still images by delegating all
image work to ImageMagick. Frames are used in the order they are given; any
directory argument expands to the matching image files it contains, sorted by
name.

The tool is invoked as:
  <tool> -delay 1x<fps> <frames...> -coalesce -layers OptimizeTransparency <output>

Example Usage:
  # Three explicit frames at 10 frames per second
  gif-assembler a.png b.png c.png -o out.gif

  # All frames in a directory at 24 fps, using ImageMagick v7 if installed
  gif-assembler ~/renders/walk_cycle -r 24 -o walk.gif --tool auto

  # Show the command that would run without running it
  gif-assembler ~/renders/walk_cycle -o walk.gif --dry-run

  # Check that the configured tool is installed
  gif-assembler --check-tool --tool magick"
)]
pub struct Args {
    /// Frame images or directories of frames, in display order
    #[arg(
        value_name = "FRAME|DIR",
        required_unless_present = "check_tool"
    )]
    pub inputs: Vec<PathBuf>,

    /// Output GIF file (overwritten if it exists)
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        default_value = DEFAULT_OUTPUT
    )]
    pub output: PathBuf,

    /// Frame rate in frames per second
    #[arg(short = 'r', long = "fps", default_value_t = DEFAULT_FPS, value_name = "FPS")]
    pub fps: u32,

    /// ImageMagick command name or path, or "auto" to prefer 'magick' over 'convert'
    #[arg(long = "tool", default_value = DEFAULT_TOOL, value_name = "NAME|PATH")]
    pub tool: String,

    /// Comma-separated list of image extensions picked up from directories
    #[arg(long = "extensions", default_value = DEFAULT_EXTENSIONS)]
    pub extensions_str: String,

    /// JSON configuration file (command-line arguments take precedence)
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Print the command that would be executed without running it
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Check whether the tool is installed and exit
    #[arg(long = "check-tool")]
    pub check_tool: bool,

    /// Emit progress as JSON lines on stdout instead of styled output
    #[arg(long = "json-progress")]
    pub json_progress: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Ids of the arguments given explicitly on the command line
    #[arg(skip)]
    pub explicit_args: Vec<String>,
}

impl Args {
    /// Parse `std::env::args`, exiting with clap's usage message on error
    pub fn parse_tracking_sources() -> Self {
        Self::try_parse_tracking_sources(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Parse arguments and remember which ones came from the command line
    /// rather than from their default values
    pub fn try_parse_tracking_sources<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(itr)?;
        let mut args = Self::from_arg_matches(&matches)?;
        args.explicit_args = matches
            .ids()
            .filter(|id| matches.value_source(id.as_str()) == Some(ValueSource::CommandLine))
            .map(|id| id.as_str().to_string())
            .collect();
        Ok(args)
    }

    /// Whether `id` (the field name) was given on the command line
    pub fn is_explicit(&self, id: &str) -> bool {
        self.explicit_args.iter().any(|a| a == id)
    }

    /// `-` and `format:-` make ImageMagick write the GIF to stdout
    pub fn writes_to_stdout(&self) -> bool {
        let output = self.output.to_string_lossy();
        output == "-" || output.ends_with(":-")
    }

    /// Parse the extensions string into a vector
    pub fn parse_extensions(&self) -> Vec<String> {
        self.extensions_str
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }
}


// Default implementation for tests
#[cfg(test)]
impl Default for Args {
    fn default() -> Self {
        Self {
            inputs: vec![],
            output: PathBuf::from(DEFAULT_OUTPUT),
            fps: DEFAULT_FPS,
            tool: DEFAULT_TOOL.to_string(),
            extensions_str: DEFAULT_EXTENSIONS.to_string(),
            config_file: None,
            dry_run: false,
            check_tool: false,
            json_progress: false,
            verbose: false,
            explicit_args: vec![],
        }
    }
}
