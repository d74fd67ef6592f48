use std::ffi::{OsStr, OsString};

use crate::assembler::{CommandRunner, DEFAULT_TOOL};

/// Tool name that asks for ImageMagick auto-detection
pub const AUTO_TOOL: &str = "auto";

/// ImageMagick v7 entry point
pub const MAGICK_V7: &str = "magick";

/// Check if a tool answers `-version` with a successful exit
pub fn is_tool_available<R: CommandRunner>(runner: &R, tool: &OsStr) -> bool {
    runner
        .run(tool, &[OsString::from("-version")])
        .map(|output| output.success)
        .unwrap_or(false)
}

/// Get the appropriate ImageMagick command ('magick' for v7, 'convert' for v6)
pub fn detect_imagemagick<R: CommandRunner>(runner: &R) -> &'static str {
    if is_tool_available(runner, OsStr::new(MAGICK_V7)) {
        MAGICK_V7
    } else {
        DEFAULT_TOOL
    }
}

/// Turn a requested tool into the program to run
///
/// `auto` probes for ImageMagick, anything else is used as given.
pub fn resolve_tool<R: CommandRunner>(runner: &R, requested: &str) -> OsString {
    if requested.eq_ignore_ascii_case(AUTO_TOOL) {
        detect_imagemagick(runner).into()
    } else {
        requested.into()
    }
}
