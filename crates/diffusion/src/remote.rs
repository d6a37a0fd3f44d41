//! Diffusion wrapper hosted by a remote worker process

use crate::{DiffusionError, DiffusionWrapper, PrepareRequest, WrapperConfig};
use futures_util::{SinkExt, StreamExt};
use image::{ImageFormat, RgbImage, imageops::FilterType};
use img2img_config::PipelineArgs;
use img2img_ipc::{WorkerToWrapper, WrapperToWorker};
use std::io::Cursor;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info};

type WorkerStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A frame resized to the model resolution and PNG-encoded for the wire
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Wrapper that forwards every call to a worker over one persistent
/// WebSocket connection.
pub struct RemoteWrapper {
    server_url: String,
    config: WrapperConfig,
    stream: WorkerStream,
}

enum Reply {
    Control(WorkerToWrapper),
    Frame(Vec<u8>),
}

impl RemoteWrapper {
    async fn send_control(&mut self, message: WrapperToWorker) -> Result<(), DiffusionError> {
        let json = message.to_json()?;
        self.stream
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| DiffusionError::Connection(e.to_string()))
    }

    async fn next_reply(&mut self) -> Result<Reply, DiffusionError> {
        while let Some(msg) = self.stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    return Ok(Reply::Control(WorkerToWrapper::from_json(&text)?));
                }
                Ok(Message::Binary(data)) => return Ok(Reply::Frame(data.to_vec())),
                Ok(Message::Close(_)) => break,
                Err(e) => return Err(DiffusionError::Connection(e.to_string())),
                _ => {}
            }
        }

        Err(DiffusionError::Connection("Worker closed the connection".into()))
    }
}

impl DiffusionWrapper for RemoteWrapper {
    type Tensor = EncodedFrame;

    async fn create(args: &PipelineArgs, config: WrapperConfig) -> Result<Self, DiffusionError> {
        let (stream, _) = connect_async(args.wrapper_url.as_str())
            .await
            .map_err(|e| DiffusionError::Connection(e.to_string()))?;

        let mut wrapper = Self {
            server_url: args.wrapper_url.clone(),
            config: config.clone(),
            stream,
        };
        wrapper.send_control(WrapperToWorker::Configure(config)).await?;

        info!(
            "Connected to diffusion worker at {} ({})",
            wrapper.server_url, wrapper.config.model_id
        );
        Ok(wrapper)
    }

    async fn prepare(&mut self, request: PrepareRequest) -> Result<(), DiffusionError> {
        debug!(
            "Warming up worker: {} steps, guidance {}",
            request.num_inference_steps, request.guidance_scale
        );
        self.send_control(WrapperToWorker::Prepare(request)).await?;

        loop {
            match self.next_reply().await? {
                Reply::Control(WorkerToWrapper::Ready) => return Ok(()),
                Reply::Control(WorkerToWrapper::Progress { step, total }) => {
                    debug!("Warm-up progress {}/{}", step, total);
                }
                Reply::Control(WorkerToWrapper::Error { message }) => {
                    return Err(DiffusionError::Generation(message));
                }
                Reply::Frame(_) => {
                    return Err(DiffusionError::InvalidResponse(
                        "Unexpected frame during warm-up".into(),
                    ));
                }
            }
        }
    }

    fn preprocess_image(&self, image: &RgbImage) -> Result<EncodedFrame, DiffusionError> {
        let (width, height) = (self.config.width, self.config.height);

        let mut png = Vec::new();
        if image.dimensions() == (width, height) {
            image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        } else {
            let resized = image::imageops::resize(image, width, height, FilterType::Triangle);
            resized.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        }

        Ok(EncodedFrame { png, width, height })
    }

    async fn infer(
        &mut self,
        tensor: EncodedFrame,
        prompt: &str,
    ) -> Result<RgbImage, DiffusionError> {
        self.send_control(WrapperToWorker::Infer {
            prompt: prompt.to_string(),
        })
        .await?;
        self.stream
            .send(Message::Binary(tensor.png.into()))
            .await
            .map_err(|e| DiffusionError::Connection(e.to_string()))?;

        loop {
            match self.next_reply().await? {
                // Final image (PNG encoded)
                Reply::Frame(data) => {
                    let img = image::load_from_memory(&data)
                        .map_err(|e| DiffusionError::InvalidResponse(e.to_string()))?;
                    return Ok(img.to_rgb8());
                }
                Reply::Control(WorkerToWrapper::Progress { step, total }) => {
                    debug!("Denoising step {}/{}", step, total);
                }
                Reply::Control(WorkerToWrapper::Error { message }) => {
                    return Err(DiffusionError::Generation(message));
                }
                Reply::Control(WorkerToWrapper::Ready) => {}
            }
        }
    }
}
