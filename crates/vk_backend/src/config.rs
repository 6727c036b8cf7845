//! Backend configuration
//!
//! Small set of tunables the embedder can override. The embedder is
//! responsible for reading any settings file; this module only parses a
//! TOML fragment it is handed.

use ash::vk;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML fragment could not be parsed into a configuration
    #[error("Failed to parse backend config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Color format used for offscreen framebuffer attachments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffscreenColorFormat {
    /// 8-bit RGBA, unsigned normalized
    #[default]
    Rgba8Unorm,
    /// 8-bit BGRA, unsigned normalized
    Bgra8Unorm,
}

impl OffscreenColorFormat {
    /// The corresponding Vulkan format
    pub fn to_vk(self) -> vk::Format {
        match self {
            Self::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
            Self::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        }
    }
}

/// Tunables for the queue runner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Color format the offscreen render passes are created with. Must
    /// match the format the framebuffer manager creates color images in.
    pub offscreen_color_format: OffscreenColorFormat,

    /// Emit a trace log line for every executed step
    pub log_steps: bool,
}

impl RunnerConfig {
    /// Parse a configuration fragment the embedder already loaded
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}
