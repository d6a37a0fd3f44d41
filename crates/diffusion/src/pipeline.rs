//! Per-frame img2img orchestration with a one-slot prompt cache

use crate::{
    DiffusionWrapper, EnhancedPrompt, PipelineError, PrepareRequest, PromptEnhancer,
    WrapperConfig,
};
use img2img_config::{DEFAULT_HEIGHT, DEFAULT_WIDTH, PipelineArgs};
use img2img_ipc::{
    CfgType, DEFAULT_NEGATIVE_PROMPT, DEFAULT_PROMPT, InputParams, OutputType, PipelineInfo,
    WrapperMode,
};
use tracing::{debug, info};

/// Model the wrapper loads
pub const BASE_MODEL: &str = "stabilityai/sd-turbo";

/// Timesteps sampled out of the full denoising schedule
pub const T_INDEX_LIST: [u32; 2] = [15, 20];

const WARMUP_ITERATIONS: u32 = 10;
const PREPARE_STEPS: u32 = 50;
const PREPARE_GUIDANCE_SCALE: f32 = 1.2;

/// Fixed wrapper configuration, specialised by the host switches
pub fn wrapper_config(args: &PipelineArgs) -> WrapperConfig {
    WrapperConfig {
        model_id: BASE_MODEL.to_string(),
        use_tiny_vae: args.taesd,
        device: args.device,
        dtype: args.dtype,
        t_index_list: T_INDEX_LIST.to_vec(),
        frame_buffer_size: 1,
        width: DEFAULT_WIDTH,
        height: DEFAULT_HEIGHT,
        use_lcm_lora: false,
        output_type: OutputType::Pil,
        warmup: WARMUP_ITERATIONS,
        vae_id: None,
        acceleration: args.acceleration,
        mode: WrapperMode::Img2Img,
        use_denoising_batch: true,
        cfg_type: CfgType::None,
        use_safety_checker: args.safety_checker,
        engine_dir: args.engine_dir.clone(),
    }
}

/// Last raw prompt and what it was enhanced into. Starts as the empty
/// prompt mapped to itself and is overwritten on every miss; never holds
/// more than one entry.
#[derive(Debug, Default)]
struct PromptCache {
    raw: String,
    enhanced: String,
}

impl PromptCache {
    fn get(&self, raw: &str) -> Option<&str> {
        (self.raw == raw).then_some(self.enhanced.as_str())
    }

    fn store(&mut self, raw: &str, enhanced: &str) {
        self.raw = raw.to_string();
        self.enhanced = enhanced.to_string();
    }
}

/// Drives one wrapper for one logical stream.
///
/// `predict` borrows the pipeline mutably, so at most one prediction is in
/// flight per instance.
pub struct Pipeline<W, E> {
    wrapper: W,
    enhancer: E,
    cache: PromptCache,
    info: PipelineInfo,
}

impl<W: DiffusionWrapper, E: PromptEnhancer> Pipeline<W, E> {
    /// Build the wrapper and warm it up. Returns once the wrapper is ready
    /// for the first frame.
    pub async fn new(args: &PipelineArgs, enhancer: E) -> Result<Self, PipelineError> {
        let config = wrapper_config(args);
        info!(
            "Creating img2img pipeline: {} at {}x{}, acceleration {}",
            config.model_id,
            config.width,
            config.height,
            config.acceleration.as_str()
        );

        let mut wrapper = W::create(args, config).await?;
        wrapper
            .prepare(PrepareRequest {
                prompt: DEFAULT_PROMPT.to_string(),
                negative_prompt: DEFAULT_NEGATIVE_PROMPT.to_string(),
                num_inference_steps: PREPARE_STEPS,
                guidance_scale: PREPARE_GUIDANCE_SCALE,
            })
            .await?;

        Ok(Self {
            wrapper,
            enhancer,
            cache: PromptCache::default(),
            info: PipelineInfo::default(),
        })
    }

    pub fn info(&self) -> &PipelineInfo {
        &self.info
    }

    /// Parameters the host form starts from
    pub fn input_params(&self) -> InputParams {
        InputParams::default()
    }

    pub fn wrapper(&self) -> &W {
        &self.wrapper
    }

    /// Cached `(raw, enhanced)` pair; `("", "")` until a prompt is seen
    pub fn cached_prompt(&self) -> (&str, &str) {
        (self.cache.raw.as_str(), self.cache.enhanced.as_str())
    }

    /// Run one frame through the wrapper.
    ///
    /// Enhancement problems never fail a prediction; wrapper errors are
    /// returned as-is.
    pub async fn predict(
        &mut self,
        params: &InputParams,
    ) -> Result<image::RgbImage, PipelineError> {
        let frame = params.image.as_ref().ok_or(PipelineError::MissingFrame)?;
        let prompt = params.prompt.trim();

        let enhanced = self.resolve_prompt(prompt).await;

        let tensor = self.wrapper.preprocess_image(frame)?;
        let output = self.wrapper.infer(tensor, &enhanced).await?;
        Ok(output)
    }

    async fn resolve_prompt(&mut self, prompt: &str) -> String {
        if let Some(cached) = self.cache.get(prompt) {
            return cached.to_string();
        }

        info!("New prompt detected: {}", prompt);
        let EnhancedPrompt { text, source } = self.enhancer.enhance(prompt).await;
        self.cache.store(prompt, &text);
        debug!("Cached enhanced prompt ({:?}): {}", source, text);
        text
    }
}
