//! Per-frame input parameters and the form description the host renders.

use img2img_config::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use serde::{Deserialize, Serialize};

/// Prompt shown in the form before the user types anything, also used to
/// warm the wrapper up.
pub const DEFAULT_PROMPT: &str = "vast open sky in vibrant shades of blue, wispy white clouds drifting peacefully, gentle gradients and soft edges, watercolor texture with subtle bleeding and pooling, serene and airy atmosphere, minimal landscape below with hints of trees or rooftops, digital painting, dreamy and atmospheric, high-resolution artstation-style watercolor";

pub const DEFAULT_NEGATIVE_PROMPT: &str =
    "black and white, blurry, low resolution, pixelated,  pixel art, low quality, low fidelity";

/// Parameters submitted by the host for one prediction.
///
/// Width and height are fixed by the pipeline; the form shows them disabled.
/// The frame travels next to the JSON payload and is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputParams {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub image: Option<image::RgbImage>,
}

impl Default for InputParams {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            image: None,
        }
    }
}

impl InputParams {
    /// Default parameters with the given prompt
    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Attach the frame to run through the pipeline
    pub fn with_image(mut self, image: image::RgbImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Form description for the host UI, in display order
    pub fn fields() -> Vec<FieldSchema> {
        let defaults = Self::default();
        vec![
            FieldSchema {
                id: "prompt".into(),
                title: "Prompt".into(),
                kind: FieldKind::Textarea,
                default: serde_json::Value::from(defaults.prompt),
                disabled: false,
                hidden: false,
            },
            FieldSchema {
                id: "width".into(),
                title: "Width".into(),
                kind: FieldKind::Number,
                default: serde_json::Value::from(defaults.width),
                disabled: true,
                hidden: true,
            },
            FieldSchema {
                id: "height".into(),
                title: "Height".into(),
                kind: FieldKind::Number,
                default: serde_json::Value::from(defaults.height),
                disabled: true,
                hidden: true,
            },
        ]
    }
}

/// Widget used to edit a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Textarea,
    Number,
}

/// One editable field of [`InputParams`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub id: String,
    pub title: String,
    #[serde(rename = "field")]
    pub kind: FieldKind,
    pub default: serde_json::Value,
    pub disabled: bool,
    #[serde(rename = "hide")]
    pub hidden: bool,
}
