use crate::cli::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Represents the JSON config file format
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub tool_path: Option<String>,
    pub fps: Option<u32>,
    pub output_path: Option<String>,
    pub extensions: Option<String>,
    pub verbose: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

impl Args {
    /// Load configuration from a JSON file and merge with command-line arguments
    /// Command-line arguments take precedence over config file values
    pub fn load_and_merge_config(&mut self) -> Result<()> {
        if let Some(config_path) = self.config_file.clone() {
            let config = ConfigFile::load(&config_path)?;
            self.merge_from_config(config);

            if self.verbose && !self.json_progress {
                eprintln!("Loaded configuration from: {:?}", config_path);
            }
        }
        Ok(())
    }

    /// Config values only apply to arguments not given on the command line
    pub fn merge_from_config(&mut self, config: ConfigFile) {
        if !self.is_explicit("tool") {
            if let Some(tool) = config.tool_path {
                self.tool = tool;
            }
        }

        if !self.is_explicit("fps") {
            if let Some(fps) = config.fps {
                self.fps = fps;
            }
        }

        if !self.is_explicit("output") {
            if let Some(output) = config.output_path {
                self.output = PathBuf::from(output);
            }
        }

        if !self.is_explicit("extensions_str") {
            if let Some(ext) = config.extensions {
                self.extensions_str = ext;
            }
        }

        if !self.is_explicit("verbose") {
            self.verbose = config.verbose.unwrap_or(self.verbose);
        }
    }
}
