use std::borrow::Cow;
use std::collections::HashMap;
use std::num::NonZeroU64;

use stageconfig::ShaderStage;
use wgpu::naga::ShaderStage as NagaStage;

use crate::backend::RasterState;

use super::context::DEPTH_FORMAT;
use super::uniforms::FrameUniforms;

/// Raster states the controller ever asks for; one pipeline is baked per state.
const VARIANTS: [RasterState; 4] = [
    RasterState {
        depth_test: true,
        depth_write: true,
        cull_back_faces: true,
        wireframe: false,
    },
    RasterState {
        depth_test: true,
        depth_write: true,
        cull_back_faces: false,
        wireframe: true,
    },
    RasterState {
        depth_test: false,
        depth_write: false,
        cull_back_faces: false,
        wireframe: false,
    },
    RasterState {
        depth_test: false,
        depth_write: false,
        cull_back_faces: false,
        wireframe: true,
    },
];

pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(FrameUniforms::SIZE),
                },
                count: None,
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });
        Self {
            uniform_layout,
            pipeline_layout,
        }
    }
}

/// Compiles prepared GLSL for one stage, capturing validation errors as text.
pub(crate) fn compile_module(
    device: &wgpu::Device,
    stage: ShaderStage,
    source: &str,
) -> Result<wgpu::ShaderModule, String> {
    let naga_stage = match stage {
        ShaderStage::Vertex => NagaStage::Vertex,
        ShaderStage::Fragment => NagaStage::Fragment,
        ShaderStage::TessControl | ShaderStage::TessEvaluation => {
            return Err(format!(
                "{stage} shaders are not supported by the wgpu backend; \
                 remove the stage from the pipeline config"
            ));
        }
    };

    let label = format!("{stage} stage");
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_string()),
            stage: naga_stage,
            defines: &[],
        },
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(err.to_string()),
        None => Ok(module),
    }
}

/// A linked program: one render pipeline per raster state variant.
#[derive(Clone, Debug)]
pub struct GpuProgram {
    pipelines: HashMap<RasterState, wgpu::RenderPipeline>,
}

impl GpuProgram {
    pub(crate) fn link(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
        target: PipelineTarget,
    ) -> Result<Self, String> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipelines = VARIANTS
            .into_iter()
            .map(|state| {
                let pipeline = create_pipeline(device, layouts, vertex, fragment, target, state);
                (state, pipeline)
            })
            .collect();
        match pollster::block_on(device.pop_error_scope()) {
            Some(err) => Err(err.to_string()),
            None => Ok(Self { pipelines }),
        }
    }

    pub(crate) fn pipeline(&self, state: RasterState) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&state)
    }
}

/// Properties of the attachments a program renders into.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PipelineTarget {
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub supports_wireframe: bool,
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

fn create_pipeline(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    target: PipelineTarget,
    state: RasterState,
) -> wgpu::RenderPipeline {
    let polygon_mode = if state.wireframe && target.supports_wireframe {
        wgpu::PolygonMode::Line
    } else {
        wgpu::PolygonMode::Fill
    };
    let depth_compare = if state.depth_test {
        wgpu::CompareFunction::Less
    } else {
        wgpu::CompareFunction::Always
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scene pipeline"),
        layout: Some(&layouts.pipeline_layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: state.cull_back_faces.then_some(wgpu::Face::Back),
            polygon_mode,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: state.depth_write,
            depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: target.sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: target.format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}
