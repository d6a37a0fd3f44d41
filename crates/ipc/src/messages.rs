//! Message enums exchanged with a remote diffusion worker.
//!
//! Control messages travel as JSON text frames. Image payloads travel as
//! binary frames holding PNG data: one after every `Infer` request and one
//! as the reply.

use serde::{Deserialize, Serialize};

use crate::IpcError;
use crate::types::{PrepareRequest, WrapperConfig};

/// Messages from the pipeline to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WrapperToWorker {
    /// Build the model with this configuration
    Configure(WrapperConfig),

    /// Warm up; answered with `Ready`
    Prepare(PrepareRequest),

    /// Run one frame; the next binary message is the input frame
    Infer { prompt: String },
}

/// Messages from the worker to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WorkerToWrapper {
    /// Warm-up finished
    Ready,

    /// Denoising progress for the frame in flight
    Progress { step: u32, total: u32 },

    /// The worker failed the current request
    Error { message: String },
}

impl WrapperToWorker {
    pub fn to_json(&self) -> Result<String, IpcError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl WorkerToWrapper {
    pub fn to_json(&self) -> Result<String, IpcError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, IpcError> {
        if text.trim().is_empty() {
            return Err(IpcError::Empty);
        }
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_wire_format() {
        let json = WrapperToWorker::Infer {
            prompt: "ocean waves".into(),
        }
        .to_json()
        .unwrap();
        assert_eq!(json, r#"{"type":"Infer","data":{"prompt":"ocean waves"}}"#);
    }

    #[test]
    fn test_parse_worker_messages() {
        assert_eq!(
            WorkerToWrapper::from_json(r#"{"type":"Ready"}"#).unwrap(),
            WorkerToWrapper::Ready
        );
        assert_eq!(
            WorkerToWrapper::from_json(r#"{"type":"Progress","data":{"step":1,"total":2}}"#)
                .unwrap(),
            WorkerToWrapper::Progress { step: 1, total: 2 }
        );
    }

    #[test]
    fn test_reject_garbage() {
        assert!(matches!(WorkerToWrapper::from_json(""), Err(IpcError::Empty)));
        assert!(matches!(
            WorkerToWrapper::from_json("{\"type\":\"Unknown\"}"),
            Err(IpcError::Json(_))
        ));
    }
}
