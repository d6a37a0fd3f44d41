//! Type definitions shared by the host and the diffusion worker.

mod info;
mod params;
mod wrapper;

pub use info::*;
pub use params::*;
pub use wrapper::*;
