//! Renderer crate for Orrery, a live-reload shader pipeline viewer.
//!
//! The crate glues a `winit` window, a `wgpu` backend and the reload
//! controller together. The overall flow is:
//!
//! ```text
//!   CLI / orrery
//!          │ ViewerConfig
//!          ▼
//!   window::run ──▶ winit event loop ──▶ InputSink (OrchestratorState)
//!          │
//!          └─▶ RedrawRequested ─▶ FrameOrchestrator::tick ─▶ WgpuBackend::present
//!                                   │
//!                                   ├─▶ tracker  (config + source mtimes)
//!                                   ├─▶ builder  (transactional program builds)
//!                                   ├─▶ model    (sun / planet / moon transforms)
//!                                   └─▶ camera   (orbit, zoom, follow)
//! ```
//!
//! Everything above the [`GraphicsBackend`] trait is independent of the GPU,
//! which is how the controller is tested: [`headless::HeadlessBackend`] records
//! the commands a frame would issue.

pub mod backend;
pub mod builder;
pub mod camera;
pub mod compile;
mod gpu;
pub mod headless;
pub mod input;
pub mod mesh;
pub mod model;
pub mod orchestrator;
pub mod runtime;
pub mod tracker;
mod types;
mod window;

pub use backend::{GraphicsBackend, Primitive, RasterState, UniformValue};
pub use builder::{build, BuildError, ShaderProgram};
pub use camera::CameraController;
pub use gpu::{GpuMesh, GpuProgram, WgpuBackend};
pub use input::{InputSink, Key, Modifiers, MouseButton};
pub use orchestrator::{BuildOutcome, FrameOrchestrator, FrameReport, OrchestratorState};
pub use runtime::{AnimationClock, Clock, FramePacer, SystemClock, Timestamp};
pub use types::{Antialiasing, FailurePolicy, ViewerConfig};
pub use window::run;
