//! wgpu implementation of [`GraphicsBackend`](crate::backend::GraphicsBackend).
//!
//! - `context` owns instance/device/surface wiring plus the depth and MSAA
//!   targets, and rebuilds them when the window resizes.
//! - `pipeline` turns prepared GLSL into shader modules and bakes one render
//!   pipeline per raster state when a program links.
//! - `uniforms` mirrors the prelude's uniform block; every draw gets its own
//!   copy at a dynamic offset.
//! - `backend` records a frame's commands and encodes them in a single render
//!   pass on present.
//!
//! Tessellation stages have no wgpu counterpart; programs that list them fail
//! to compile and the mesh is subdivided on the CPU instead.

mod backend;
mod context;
mod pipeline;
mod uniforms;

pub use backend::{GpuMesh, WgpuBackend};
pub use pipeline::GpuProgram;
