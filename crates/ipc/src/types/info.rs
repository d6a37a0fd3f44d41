//! Pipeline description exposed to the host.

use serde::{Deserialize, Serialize};

/// What the pipeline consumes per prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Image,
    Text,
}

/// Static description of a pipeline, rendered by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub name: String,
    pub input_mode: InputMode,
    /// HTML shown above the stream; empty hides the banner
    pub page_content: String,
}

impl Default for PipelineInfo {
    fn default() -> Self {
        Self {
            name: "StreamDiffusion img2img".to_string(),
            input_mode: InputMode::Image,
            page_content: String::new(),
        }
    }
}
