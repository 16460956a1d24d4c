//! The capability set the controller needs from a graphics API.
//!
//! ```text
//!   builder::build        ──▶ compile_stage / link
//!   FrameOrchestrator     ──▶ begin_frame ─▶ bind_program ─▶ set_uniform*
//!                                          ─▶ set_raster_state ─▶ bind_vertex_source ─▶ draw
//! ```
//!
//! Handles are owned values: dropping a stage or program releases it, so a
//! failed build cleans up its intermediates simply by returning early.
use glam::{Mat4, Vec3};
use stageconfig::ShaderStage;

use crate::mesh::Mesh;

/// Value accepted by [`GraphicsBackend::set_uniform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec3(Vec3),
    Mat4(Mat4),
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        Self::Int(i32::from(value))
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        Self::Mat4(value)
    }
}

/// Primitive assembly mode for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Triangles,
    /// Triangle patches consumed by tessellation stages.
    Patches,
}

/// Fixed-function state that applies to subsequent draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub cull_back_faces: bool,
    pub wireframe: bool,
}

impl RasterState {
    /// Depth-tested bodies; culling is dropped in wireframe so back edges show.
    pub fn solid(wireframe: bool) -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            cull_back_faces: !wireframe,
            wireframe,
        }
    }

    /// Backdrop drawn behind everything without touching the depth buffer.
    pub fn backdrop(wireframe: bool) -> Self {
        Self {
            depth_test: false,
            depth_write: false,
            cull_back_faces: false,
            wireframe,
        }
    }
}

impl Default for RasterState {
    fn default() -> Self {
        Self::solid(false)
    }
}

pub trait GraphicsBackend {
    /// A compiled but unlinked stage.
    type Stage;
    /// A linked program ready to bind.
    type Program;
    /// Geometry uploaded for drawing.
    type Mesh;

    /// Source prepended to every stage before compilation (version line,
    /// shared uniform declarations).
    fn stage_prelude(&self, stage: ShaderStage) -> &str;

    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> Result<Self::Stage, String>;

    fn link(&mut self, stages: Vec<(ShaderStage, Self::Stage)>) -> Result<Self::Program, String>;

    fn upload_mesh(&mut self, mesh: &Mesh) -> Self::Mesh;

    /// Starts a new frame cleared to `color`.
    fn begin_frame(&mut self, color: [f32; 4]);

    fn bind_program(&mut self, program: &Self::Program);

    /// Sets a named uniform on the bound program. Unknown names are ignored.
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    fn set_raster_state(&mut self, state: RasterState);

    fn bind_vertex_source(&mut self, mesh: &Self::Mesh);

    fn draw(&mut self, primitive: Primitive, element_count: u32);
}
