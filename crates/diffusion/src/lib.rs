//! Real-time image-to-image diffusion for a live frame stream
//!
//! The [`Pipeline`] drives a [`DiffusionWrapper`] one frame at a time and
//! conditions it on a prompt that a [`PromptEnhancer`] may rewrite first.
//! The wrapper itself (model loading, sampling, acceleration) is external;
//! [`RemoteWrapper`] reaches one running in a separate worker process.

mod enhance;
mod pipeline;
mod remote;

#[cfg(test)]
mod test_support;

pub use enhance::{
    ChatCompletionEnhancer, EnhanceError, EnhancedPrompt, PromptEnhancer, PromptSource,
    SYSTEM_PROMPT,
};
pub use pipeline::{BASE_MODEL, Pipeline, T_INDEX_LIST, wrapper_config};
pub use remote::{EncodedFrame, RemoteWrapper};

pub use img2img_ipc::{PrepareRequest, WrapperConfig};

use img2img_config::PipelineArgs;
use img2img_ipc::IpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiffusionError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Protocol error: {0}")]
    Protocol(#[from] IpcError),

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No input frame supplied")]
    MissingFrame,

    #[error(transparent)]
    Diffusion(#[from] DiffusionError),
}

/// Black-box diffusion capability: construct, warm up once, then call per
/// frame.
#[allow(async_fn_in_trait)]
pub trait DiffusionWrapper: Sized {
    /// Model-ready form of an input frame
    type Tensor;

    /// Build the wrapper. `args` carries host-level settings that are not
    /// part of the model configuration, such as the worker address.
    async fn create(args: &PipelineArgs, config: WrapperConfig) -> Result<Self, DiffusionError>;

    /// One-time warm-up; must finish before the first `infer`
    async fn prepare(&mut self, request: PrepareRequest) -> Result<(), DiffusionError>;

    /// Convert a frame into the wrapper's input representation
    fn preprocess_image(&self, image: &image::RgbImage) -> Result<Self::Tensor, DiffusionError>;

    /// Run one image-to-image pass conditioned on `prompt`
    async fn infer(
        &mut self,
        tensor: Self::Tensor,
        prompt: &str,
    ) -> Result<image::RgbImage, DiffusionError>;
}
