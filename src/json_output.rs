//! JSON output for scripting and GUI integration
//!
//! When --json-progress flag is enabled, all progress and status information
//! is emitted as JSON lines to stdout, suppressing all other output.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonMessage {
    /// Assembly is about to start
    Started {
        frames: usize,
        output_path: String,
        command: String,
    },
    /// Command that would run in dry-run mode
    Planned { command: String },
    /// GIF written successfully
    Completed {
        output_path: String,
        duration_ms: u128,
    },
    /// Assembly failed
    Failed {
        error: String,
        exit_code: Option<i32>,
    },
    /// Result of --check-tool
    Tool { tool: String, available: bool },
}

impl JsonMessage {
    /// Emit JSON message to stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn started(frames: usize, output_path: &Path, command: impl Into<String>) {
        Self::Started {
            frames,
            output_path: output_path.display().to_string(),
            command: command.into(),
        }
        .emit();
    }

    pub fn planned(command: impl Into<String>) {
        Self::Planned {
            command: command.into(),
        }
        .emit();
    }

    pub fn completed(output_path: &Path, duration_ms: u128) {
        Self::Completed {
            output_path: output_path.display().to_string(),
            duration_ms,
        }
        .emit();
    }

    pub fn failed(error: impl Into<String>, exit_code: Option<i32>) {
        Self::Failed {
            error: error.into(),
            exit_code,
        }
        .emit();
    }

    pub fn tool(tool: impl Into<String>, available: bool) {
        Self::Tool {
            tool: tool.into(),
            available,
        }
        .emit();
    }
}
