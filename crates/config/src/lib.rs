//! Shared configuration for realtime-img2img
//!
//! This crate is the single source of truth for output resolution, the
//! host-level pipeline switches and the prompt enhancer settings. Everything
//! here is read once at process start and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Output width in pixels
pub const DEFAULT_WIDTH: u32 = 896;

/// Output height in pixels
pub const DEFAULT_HEIGHT: u32 = 512;

/// Directory holding compiled acceleration engines
pub const DEFAULT_ENGINE_DIR: &str = "engines";

/// WebSocket address of the diffusion worker
pub const DEFAULT_WRAPPER_URL: &str = "ws://127.0.0.1:7861/stream";

/// Base URL of the chat-completion service
pub const DEFAULT_CHAT_ENDPOINT: &str = "https://api.openai.com";

/// Chat model used to rewrite prompts
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Upper bound on tokens in an enhanced prompt
pub const DEFAULT_MAX_TOKENS: u32 = 100;

/// Sampling temperature for prompt rewriting
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Hard deadline for one enhancement request
pub const DEFAULT_ENHANCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable holding the chat-completion credential
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Acceleration backend used by the diffusion wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Acceleration {
    None,
    #[default]
    Xformers,
    /// Compiled engines, stored under the engine directory
    TensorRt,
}

impl Acceleration {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "xformers" => Some(Self::Xformers),
            "tensorrt" => Some(Self::TensorRt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Xformers => "xformers",
            Self::TensorRt => "tensorrt",
        }
    }
}

/// Compute device the wrapper runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cuda,
    Mps,
    Cpu,
}

impl Device {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cuda" => Some(Self::Cuda),
            "mps" => Some(Self::Mps),
            "cpu" => Some(Self::Cpu),
            _ => None,
        }
    }
}

/// Numeric precision of the model weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    #[default]
    Float16,
    Float32,
}

impl Dtype {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "float16" | "fp16" | "f16" => Some(Self::Float16),
            "float32" | "fp32" | "f32" => Some(Self::Float32),
            _ => None,
        }
    }
}

/// Host-level switches the pipeline is built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineArgs {
    /// Use the tiny autoencoder for faster decoding
    pub taesd: bool,
    pub acceleration: Acceleration,
    pub safety_checker: bool,
    pub engine_dir: PathBuf,
    pub device: Device,
    pub dtype: Dtype,
    /// Where the remote diffusion worker listens
    pub wrapper_url: String,
}

impl Default for PipelineArgs {
    fn default() -> Self {
        Self {
            taesd: true,
            acceleration: Acceleration::default(),
            safety_checker: false,
            engine_dir: PathBuf::from(DEFAULT_ENGINE_DIR),
            device: Device::default(),
            dtype: Dtype::default(),
            wrapper_url: DEFAULT_WRAPPER_URL.to_string(),
        }
    }
}

impl PipelineArgs {
    /// Read the switches from `IMG2IMG_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys keep their default,
    /// unparseable ones are logged and keep their default too.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut args = Self::default();

        if let Some(value) = lookup("IMG2IMG_TAESD") {
            args.taesd = parse_or_default("IMG2IMG_TAESD", &value, parse_flag, args.taesd);
        }
        if let Some(value) = lookup("IMG2IMG_ACCELERATION") {
            args.acceleration = parse_or_default(
                "IMG2IMG_ACCELERATION",
                &value,
                Acceleration::parse,
                args.acceleration,
            );
        }
        if let Some(value) = lookup("IMG2IMG_SAFETY_CHECKER") {
            args.safety_checker = parse_or_default(
                "IMG2IMG_SAFETY_CHECKER",
                &value,
                parse_flag,
                args.safety_checker,
            );
        }
        if let Some(value) = lookup("IMG2IMG_ENGINE_DIR").filter(|v| !v.trim().is_empty()) {
            args.engine_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("IMG2IMG_DEVICE") {
            args.device = parse_or_default("IMG2IMG_DEVICE", &value, Device::parse, args.device);
        }
        if let Some(value) = lookup("IMG2IMG_DTYPE") {
            args.dtype = parse_or_default("IMG2IMG_DTYPE", &value, Dtype::parse, args.dtype);
        }
        if let Some(value) = lookup("IMG2IMG_WRAPPER_URL").filter(|v| !v.trim().is_empty()) {
            args.wrapper_url = value;
        }

        args
    }
}

/// Settings for the chat-completion prompt enhancer
#[derive(Clone, PartialEq)]
pub struct EnhancerConfig {
    /// Bearer credential. `None` disables enhancement entirely.
    pub api_key: Option<String>,
    /// Base URL, without the `/v1/chat/completions` path
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_ENHANCE_TIMEOUT,
        }
    }
}

impl EnhancerConfig {
    /// Read the credential and endpoint override from the environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// An empty credential counts as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self {
            api_key: lookup(API_KEY_VAR).filter(|key| !key.trim().is_empty()),
            ..Self::default()
        };
        if let Some(endpoint) = lookup("OPENAI_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.endpoint = endpoint;
        }
        config
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Full URL of the chat-completion route
    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.endpoint.trim_end_matches('/'))
    }
}

// The credential never ends up in logs
impl fmt::Debug for EnhancerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnhancerConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or_default<T: fmt::Debug>(
    key: &str,
    value: &str,
    parse: impl Fn(&str) -> Option<T>,
    default: T,
) -> T {
    match parse(value) {
        Some(parsed) => parsed,
        None => {
            warn!("Ignoring invalid {}={:?}, using {:?}", key, value, default);
            default
        }
    }
}
