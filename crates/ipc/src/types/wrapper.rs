//! Configuration and warm-up types understood by diffusion wrappers.

use img2img_config::{Acceleration, Device, Dtype};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Format the wrapper hands results back in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    #[default]
    Pil,
    Pt,
    Np,
    Latent,
}

/// Generation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WrapperMode {
    #[default]
    #[serde(rename = "img2img")]
    Img2Img,
    #[serde(rename = "txt2img")]
    Txt2Img,
}

/// Classifier-free guidance variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CfgType {
    #[default]
    None,
    Full,
    #[serde(rename = "self")]
    SelfGuidance,
    Initialize,
}

/// Everything a wrapper is constructed with. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrapperConfig {
    /// Hugging Face model id or local path
    pub model_id: String,
    pub use_tiny_vae: bool,
    pub device: Device,
    pub dtype: Dtype,
    /// Denoising timesteps sampled from the full schedule
    pub t_index_list: Vec<u32>,
    pub frame_buffer_size: u32,
    pub width: u32,
    pub height: u32,
    pub use_lcm_lora: bool,
    pub output_type: OutputType,
    /// Iterations run while the wrapper warms up
    pub warmup: u32,
    /// Replacement autoencoder, `None` keeps the model's own
    pub vae_id: Option<String>,
    pub acceleration: Acceleration,
    pub mode: WrapperMode,
    pub use_denoising_batch: bool,
    pub cfg_type: CfgType,
    pub use_safety_checker: bool,
    pub engine_dir: PathBuf,
}

/// One-time warm-up request, run before the first real frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
}
