//! Wire and host-facing types for realtime-img2img
//!
//! Two audiences share these types: the host serving layer, which renders
//! the input form and submits [`InputParams`], and the remote diffusion
//! worker, which speaks [`WrapperToWorker`] / [`WorkerToWrapper`].

mod error;
mod messages;
mod types;

pub use error::IpcError;
pub use messages::*;
pub use types::*;
