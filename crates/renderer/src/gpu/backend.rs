use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use stageconfig::ShaderStage;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::backend::{GraphicsBackend, Primitive, RasterState, UniformValue};
use crate::compile::wgpu_prelude;
use crate::mesh::Mesh;
use crate::types::Antialiasing;

use super::context::GpuContext;
use super::pipeline::{compile_module, GpuProgram, PipelineLayouts, PipelineTarget};
use super::uniforms::{uniform_stride, FrameUniforms};

/// Initial number of per-draw uniform slots; grows on demand.
const INITIAL_UNIFORM_SLOTS: u64 = 8;

/// Geometry resident on the GPU.
#[derive(Clone, Debug)]
pub struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
}

struct RecordedDraw {
    pipeline: wgpu::RenderPipeline,
    mesh: GpuMesh,
    uniform_offset: u32,
    element_count: u32,
}

/// Draw commands recorded for the current frame, encoded in one render pass on present.
#[derive(Default)]
struct FrameRecording {
    clear: wgpu::Color,
    uniforms: FrameUniforms,
    uniform_bytes: Vec<u8>,
    program: Option<GpuProgram>,
    raster: RasterState,
    mesh: Option<GpuMesh>,
    draws: Vec<RecordedDraw>,
}

/// [`GraphicsBackend`] over wgpu, compiling GLSL through naga.
pub struct WgpuBackend {
    context: GpuContext,
    layouts: PipelineLayouts,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_capacity: u64,
    uniform_stride: u64,
    frame: FrameRecording,
}

impl WgpuBackend {
    pub fn new<T>(target: &T, size: PhysicalSize<u32>, antialiasing: Antialiasing) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size, antialiasing)?;
        let layouts = PipelineLayouts::new(&context.device);
        let uniform_stride = uniform_stride(context.uniform_alignment);
        let uniform_capacity = uniform_stride * INITIAL_UNIFORM_SLOTS;
        let (uniform_buffer, uniform_bind_group) =
            create_uniform_binding(&context.device, &layouts, uniform_capacity);

        Ok(Self {
            context,
            layouts,
            uniform_buffer,
            uniform_bind_group,
            uniform_capacity,
            uniform_stride,
            frame: FrameRecording::default(),
        })
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    /// Encodes the recorded frame into one render pass and presents it.
    pub fn present(&mut self) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.upload_uniforms();

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });
        {
            let (attachment_view, resolve_target) = self.context.color_attachment(&view);
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.frame.clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.context.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for draw in &self.frame.draws {
                render_pass.set_pipeline(&draw.pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[draw.uniform_offset]);
                render_pass.set_vertex_buffer(0, draw.mesh.vertices.slice(..));
                render_pass.set_index_buffer(draw.mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.element_count, 0, 0..1);
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn upload_uniforms(&mut self) {
        let needed = self.frame.uniform_bytes.len() as u64;
        if needed == 0 {
            return;
        }
        if needed > self.uniform_capacity {
            let capacity = needed.next_power_of_two().max(self.uniform_stride);
            tracing::debug!(capacity, "growing frame uniform buffer");
            let (buffer, bind_group) =
                create_uniform_binding(&self.context.device, &self.layouts, capacity);
            self.uniform_buffer = buffer;
            self.uniform_bind_group = bind_group;
            self.uniform_capacity = capacity;
        }
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, &self.frame.uniform_bytes);
    }

    fn pipeline_target(&self) -> PipelineTarget {
        PipelineTarget {
            format: self.context.surface_format,
            sample_count: self.context.sample_count,
            supports_wireframe: self.context.supports_wireframe,
        }
    }
}

impl GraphicsBackend for WgpuBackend {
    type Stage = wgpu::ShaderModule;
    type Program = GpuProgram;
    type Mesh = GpuMesh;

    fn stage_prelude(&self, stage: ShaderStage) -> &str {
        wgpu_prelude(stage)
    }

    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> Result<Self::Stage, String> {
        compile_module(&self.context.device, stage, source)
    }

    fn link(&mut self, stages: Vec<(ShaderStage, Self::Stage)>) -> Result<Self::Program, String> {
        let find = |wanted: ShaderStage| {
            stages
                .iter()
                .find(|(stage, _)| *stage == wanted)
                .map(|(_, module)| module)
        };
        let vertex = find(ShaderStage::Vertex).ok_or("a vertex stage is required")?;
        let fragment = find(ShaderStage::Fragment).ok_or("a fragment stage is required")?;
        GpuProgram::link(
            &self.context.device,
            &self.layouts,
            vertex,
            fragment,
            self.pipeline_target(),
        )
    }

    fn upload_mesh(&mut self, mesh: &Mesh) -> Self::Mesh {
        let device = &self.context.device;
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("body vertices"),
            contents: bytemuck::cast_slice(&mesh.positions),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("body indices"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        GpuMesh { vertices, indices }
    }

    fn begin_frame(&mut self, color: [f32; 4]) {
        let [r, g, b, a] = color.map(f64::from);
        self.frame = FrameRecording {
            clear: wgpu::Color { r, g, b, a },
            ..FrameRecording::default()
        };
    }

    fn bind_program(&mut self, program: &Self::Program) {
        self.frame.program = Some(program.clone());
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        if !self.frame.uniforms.apply(name, value) {
            tracing::trace!(uniform = name, ?value, "ignoring unknown uniform");
        }
    }

    fn set_raster_state(&mut self, state: RasterState) {
        self.frame.raster = state;
    }

    fn bind_vertex_source(&mut self, mesh: &Self::Mesh) {
        self.frame.mesh = Some(mesh.clone());
    }

    fn draw(&mut self, primitive: Primitive, element_count: u32) {
        if primitive == Primitive::Patches {
            tracing::trace!("drawing patches as triangles");
        }
        let Some(program) = self.frame.program.as_ref() else {
            tracing::trace!("draw without a bound program");
            return;
        };
        let Some(mesh) = self.frame.mesh.clone() else {
            tracing::trace!("draw without a vertex source");
            return;
        };
        let Some(pipeline) = program.pipeline(self.frame.raster).cloned() else {
            tracing::warn!(state = ?self.frame.raster, "no pipeline for raster state");
            return;
        };

        let uniform_offset = self.frame.uniform_bytes.len() as u64;
        self.frame
            .uniform_bytes
            .extend_from_slice(bytemuck::bytes_of(&self.frame.uniforms));
        self.frame
            .uniform_bytes
            .resize((uniform_offset + self.uniform_stride) as usize, 0);

        self.frame.draws.push(RecordedDraw {
            pipeline,
            mesh,
            uniform_offset: uniform_offset as u32,
            element_count,
        });
    }
}

fn create_uniform_binding(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    capacity: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("frame uniforms"),
        size: capacity,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("frame uniform bind group"),
        layout: &layouts.uniform_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(FrameUniforms::SIZE),
            }),
        }],
    });
    (buffer, bind_group)
}
