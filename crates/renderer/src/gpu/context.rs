use anyhow::{anyhow, Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::TextureFormatFeatureFlags;
use winit::dpi::PhysicalSize;

use crate::types::Antialiasing;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub sample_count: u32,
    pub surface_format: wgpu::TextureFormat,
    pub supports_wireframe: bool,
    pub uniform_alignment: u32,
    targets: RenderTargets,
}

impl GpuContext {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let window_handle = target
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;

        // SAFETY: the caller keeps the window alive for as long as the context.
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "selected GPU adapter"
        );

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no supported formats"))?;

        let sample_count = choose_sample_count(
            antialiasing,
            adapter.get_texture_format_features(surface_format).flags,
            adapter.get_texture_format_features(DEPTH_FORMAT).flags,
        );

        let mut required_features = wgpu::Features::empty();
        if sample_count > 4 {
            required_features |= wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;
        }
        let supports_wireframe = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        if supports_wireframe {
            required_features |= wgpu::Features::POLYGON_MODE_LINE;
        } else {
            tracing::warn!("adapter lacks line polygon mode; wireframe toggling will draw filled");
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("orrery device"),
            required_features,
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        let size = PhysicalSize::new(initial_size.width.max(1), initial_size.height.max(1));
        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .or_else(|| surface_caps.present_modes.first().copied())
            .unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::debug!(?present_mode, ?surface_format, sample_count, "configured surface");

        let targets = RenderTargets::new(&device, surface_format, size, sample_count);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            size,
            sample_count,
            surface_format,
            supports_wireframe,
            uniform_alignment: limits.min_uniform_buffer_offset_alignment,
            targets,
        })
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.targets = RenderTargets::new(
            &self.device,
            self.surface_format,
            new_size,
            self.sample_count,
        );
    }

    /// Colour attachment (MSAA view when multisampling) and its resolve target.
    pub(crate) fn color_attachment<'a>(
        &'a self,
        frame_view: &'a wgpu::TextureView,
    ) -> (&'a wgpu::TextureView, Option<&'a wgpu::TextureView>) {
        match self.targets.msaa.as_ref() {
            Some(msaa) => (msaa, Some(frame_view)),
            None => (frame_view, None),
        }
    }

    pub(crate) fn depth_view(&self) -> &wgpu::TextureView {
        &self.targets.depth
    }
}

fn choose_sample_count(
    antialiasing: Antialiasing,
    color_flags: TextureFormatFeatureFlags,
    depth_flags: TextureFormatFeatureFlags,
) -> u32 {
    let mut supported: Vec<u32> = color_flags
        .supported_sample_counts()
        .into_iter()
        .filter(|count| depth_flags.sample_count_supported(*count))
        .collect();
    if !supported.contains(&1) {
        supported.push(1);
    }
    supported.sort_unstable();
    supported.dedup();

    let sample_count = match antialiasing {
        Antialiasing::Auto => supported.last().copied().unwrap_or(1),
        Antialiasing::Off => 1,
        Antialiasing::Samples(requested) => {
            if supported.contains(&requested) {
                requested
            } else {
                let fallback = supported
                    .iter()
                    .copied()
                    .filter(|&count| count <= requested)
                    .max()
                    .unwrap_or(1);
                tracing::warn!(
                    requested,
                    fallback,
                    ?supported,
                    "requested MSAA sample count not supported; falling back"
                );
                fallback
            }
        }
    };

    if sample_count > 1 && !color_flags.contains(TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE) {
        tracing::warn!("surface format does not support MSAA resolve; disabling MSAA");
        return 1;
    }
    sample_count
}

/// Depth buffer plus the optional multisampled colour target, both sized to the surface.
struct RenderTargets {
    _textures: Vec<wgpu::Texture>,
    msaa: Option<wgpu::TextureView>,
    depth: wgpu::TextureView,
}

impl RenderTargets {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let mut textures = Vec::with_capacity(2);
        let msaa = (sample_count > 1).then(|| {
            let (texture, view) =
                create_target(device, "msaa color target", format, size, sample_count);
            textures.push(texture);
            view
        });
        let (depth_texture, depth) =
            create_target(device, "depth target", DEPTH_FORMAT, size, sample_count);
        textures.push(depth_texture);
        Self {
            _textures: textures,
            msaa,
            depth,
        }
    }
}

fn create_target(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
    size: PhysicalSize<u32>,
    sample_count: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
