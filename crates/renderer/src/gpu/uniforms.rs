use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::backend::UniformValue;

/// CPU mirror of the `FrameGlobals` block declared by the GLSL prelude.
///
/// Layout follows std140: three mat4s, then a vec4, then four scalars packed
/// into the final 16 bytes.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FrameUniforms {
    pub proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub sun_world_pos: [f32; 4],
    pub animation_seconds: f32,
    pub is_background: i32,
    pub is_sun: i32,
    pub is_moon: i32,
}

unsafe impl Zeroable for FrameUniforms {}
unsafe impl Pod for FrameUniforms {}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self {
            proj: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            sun_world_pos: [0.0, 0.0, 0.0, 1.0],
            animation_seconds: 0.0,
            is_background: 0,
            is_sun: 0,
            is_moon: 0,
        }
    }
}

impl FrameUniforms {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Stores `value` under `name`. Returns false for unknown names or a value
    /// of the wrong kind.
    pub fn apply(&mut self, name: &str, value: UniformValue) -> bool {
        match (name, value) {
            ("proj", UniformValue::Mat4(m)) => self.proj = m.to_cols_array_2d(),
            ("view", UniformValue::Mat4(m)) => self.view = m.to_cols_array_2d(),
            ("model", UniformValue::Mat4(m)) => self.model = m.to_cols_array_2d(),
            ("sun_world_pos", UniformValue::Vec3(v)) => self.sun_world_pos = v.extend(1.0).to_array(),
            ("animation_seconds", UniformValue::Float(x)) => self.animation_seconds = x,
            ("is_background", UniformValue::Int(i)) => self.is_background = i,
            ("is_sun", UniformValue::Int(i)) => self.is_sun = i,
            ("is_moon", UniformValue::Int(i)) => self.is_moon = i,
            _ => return false,
        }
        true
    }
}

/// Distance between consecutive per-draw copies in the dynamic uniform buffer.
pub(crate) fn uniform_stride(alignment: u32) -> u64 {
    let alignment = u64::from(alignment.max(1));
    FrameUniforms::SIZE.div_ceil(alignment) * alignment
}
