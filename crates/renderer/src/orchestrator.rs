//! The per-frame controller: reload checks, rebuilds, animation, camera and the
//! four scene passes.
//!
//! ```text
//!   tick ─▶ config changed? ─▶ reload ─▶ force rebuild
//!        ─▶ sources changed? ─▶ build ─▶ swap / apply failure policy
//!        ─▶ animation tick ─▶ follow update ─▶ clear ─▶ 4 passes (or none)
//! ```
//!
//! Nothing in here is fatal. Every failure is logged and the loop carries on
//! with whatever state survived.
use std::path::{Path, PathBuf};
use std::time::Instant;

use glam::{Mat4, Vec3};
use stageconfig::{PipelineConfig, ShaderStage};

use crate::backend::{GraphicsBackend, Primitive, RasterState, UniformValue};
use crate::builder::{self, ShaderProgram};
use crate::camera::CameraController;
use crate::input::{InputSink, Key, Modifiers, MouseButton, MouseState};
use crate::mesh::icosphere;
use crate::model::{model_transform, planet_position, BodyKind, BACKGROUND_MODEL};
use crate::runtime::{AnimationClock, Clock, FramePacer, Timestamp};
use crate::tracker::has_any_changed;
use crate::types::{FailurePolicy, ViewerConfig};

pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

pub const FOV_Y_DEGREES: f32 = 35.0;
pub const NEAR_PLANE: f32 = 0.01;
pub const FAR_PLANE: f32 = 100.0;

/// Interactive state mutated by input callbacks between ticks.
#[derive(Debug, Clone)]
pub struct OrchestratorState {
    pub camera: CameraController,
    pub animation: AnimationClock,
    pub wireframe: bool,
    pub mouse: MouseState,
    /// Framebuffer size in pixels.
    pub viewport: (u32, u32),
    pub should_close: bool,
}

impl OrchestratorState {
    pub fn new(viewport: (u32, u32)) -> Self {
        Self {
            camera: CameraController::new(),
            animation: AnimationClock::new(),
            wireframe: false,
            mouse: MouseState::default(),
            viewport,
            should_close: false,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    pub fn projection(&self) -> Mat4 {
        let (width, height) = self.viewport;
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect, NEAR_PLANE, FAR_PLANE)
    }
}

impl InputSink for OrchestratorState {
    fn on_key(&mut self, key: Key, pressed: bool, modifiers: Modifiers) {
        if !pressed {
            return;
        }
        match key {
            Key::Escape => self.should_close = true,
            Key::Character('c' | 'C') if modifiers.control => self.should_close = true,
            _ => {}
        }
    }

    fn on_char(&mut self, ch: char) {
        match ch {
            'a' | 'A' => {
                self.animation.toggle();
                tracing::info!(running = self.animation.is_running(), "animation toggled");
            }
            'l' | 'L' => {
                self.wireframe = !self.wireframe;
                tracing::info!(wireframe = self.wireframe, "wireframe toggled");
            }
            'z' | 'Z' => self.camera.reset_orientation(),
            'h' | 'H' => self.camera.reset_home(),
            'r' | 'R' => {
                let following = self.camera.toggle_follow();
                tracing::info!(following, "planet follow toggled");
            }
            other => tracing::debug!("unrecognized key '{other}'"),
        }
    }

    /// Any button drags; the latest press or release wins.
    fn on_mouse_button(&mut self, _button: MouseButton, pressed: bool) {
        self.mouse.set_dragging(pressed);
    }

    fn on_cursor_move(&mut self, x: f64, y: f64) {
        if let Some((dx, dy)) = self.mouse.move_to(x, y) {
            let (width, height) = self.viewport;
            self.camera
                .orbit(dx as f32, dy as f32, width as f32, height as f32);
        }
    }

    fn on_scroll(&mut self, _dx: f64, dy: f64) {
        self.camera.zoom(dy as f32);
    }
}

/// Result of the rebuild step of one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Succeeded { stages: Vec<ShaderStage> },
    Failed {
        stage: Option<ShaderStage>,
        message: String,
    },
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameReport {
    pub config_reloaded: bool,
    /// `None` when no rebuild was attempted.
    pub build: Option<BuildOutcome>,
    pub draw_calls: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScenePass {
    Background,
    Sun,
    Planet,
    Moon,
}

impl ScenePass {
    const ALL: [ScenePass; 4] = [
        ScenePass::Background,
        ScenePass::Sun,
        ScenePass::Planet,
        ScenePass::Moon,
    ];

    fn model(self, t: f32) -> Mat4 {
        match self {
            ScenePass::Background => BACKGROUND_MODEL,
            ScenePass::Sun => model_transform(BodyKind::Sun, t),
            ScenePass::Planet => model_transform(BodyKind::PlanetOnly, t),
            ScenePass::Moon => model_transform(BodyKind::Moon, t),
        }
    }

    fn raster_state(self, wireframe: bool) -> RasterState {
        match self {
            ScenePass::Background => RasterState::backdrop(wireframe),
            _ => RasterState::solid(wireframe),
        }
    }

    fn apply<B: GraphicsBackend>(self, backend: &mut B, t: f32, wireframe: bool) {
        backend.set_uniform("is_background", (self == ScenePass::Background).into());
        backend.set_uniform("is_sun", (self == ScenePass::Sun).into());
        backend.set_uniform("is_moon", (self == ScenePass::Moon).into());
        backend.set_raster_state(self.raster_state(wireframe));
        let model = self.model(t);
        backend.set_uniform("model", model.into());
        if self == ScenePass::Sun {
            let sun_world_pos: Vec3 = model.w_axis.truncate();
            backend.set_uniform("sun_world_pos", UniformValue::Vec3(sun_world_pos));
        }
    }
}

/// Owns the pipeline snapshot and active program, and drives one frame per tick.
pub struct FrameOrchestrator<B: GraphicsBackend, C: Clock> {
    config_path: PathBuf,
    shader_root: Option<PathBuf>,
    config: PipelineConfig,
    program: Option<ShaderProgram<B::Program>>,
    last_config_load: Timestamp,
    last_build: Timestamp,
    rebuild_pending: bool,
    failure_policy: FailurePolicy,
    mesh: B::Mesh,
    element_count: u32,
    pacer: FramePacer,
    clock: C,
    state: OrchestratorState,
}

impl<B: GraphicsBackend, C: Clock> FrameOrchestrator<B, C> {
    /// Uploads the body mesh. The config is first read on the initial tick.
    pub fn new(backend: &mut B, config: &ViewerConfig, clock: C) -> Self {
        let mesh = icosphere(config.subdivisions);
        let element_count = mesh.element_count();
        tracing::debug!(
            triangles = mesh.triangle_count(),
            subdivisions = config.subdivisions,
            "uploading body mesh"
        );
        Self {
            config_path: config.config_path.clone(),
            shader_root: config.shader_root.clone(),
            config: PipelineConfig::default(),
            program: None,
            last_config_load: 0.0,
            last_build: 0.0,
            rebuild_pending: false,
            failure_policy: config.failure_policy,
            mesh: backend.upload_mesh(&mesh),
            element_count,
            pacer: FramePacer::new(config.target_fps),
            clock,
            state: OrchestratorState::new(config.window_size),
        }
    }

    pub fn state(&self) -> &OrchestratorState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut OrchestratorState {
        &mut self.state
    }

    pub fn pacer(&self) -> &FramePacer {
        &self.pacer
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn program(&self) -> Option<&ShaderProgram<B::Program>> {
        self.program.as_ref()
    }

    pub fn should_close(&self) -> bool {
        self.state.should_close
    }

    /// Runs one frame. Presenting and waiting out the frame budget are left to
    /// the driver.
    pub fn tick(&mut self, backend: &mut B) -> FrameReport {
        self.pacer.begin_tick(Instant::now());

        let config_reloaded = self.reload_config_if_changed();
        let build = self.rebuild_if_changed(backend);

        self.state.animation.tick(self.clock.now());
        let t = self.state.animation.seconds() as f32;
        self.state.camera.update_if_following(planet_position(t));

        let draw_calls = self.draw(backend, t);
        tracing::trace!(draw_calls, animation_seconds = t, "frame recorded");

        FrameReport {
            config_reloaded,
            build,
            draw_calls,
        }
    }

    fn reload_config_if_changed(&mut self) -> bool {
        if !has_any_changed([&self.config_path], self.last_config_load) {
            return false;
        }
        self.last_config_load = self.clock.now();

        match PipelineConfig::load(&self.config_path) {
            Ok(config) => {
                self.config = match &self.shader_root {
                    Some(root) => config.resolve_relative(root),
                    None => config,
                };
                self.last_build = 0.0;
                self.rebuild_pending = true;
                tracing::info!(
                    path = %self.config_path.display(),
                    stages = self.config.active_stages().count(),
                    "pipeline config loaded"
                );
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "keeping previous pipeline config");
                false
            }
        }
    }

    fn rebuild_if_changed(&mut self, backend: &mut B) -> Option<BuildOutcome> {
        let forced = std::mem::take(&mut self.rebuild_pending);
        if !forced && !has_any_changed(self.config.all_paths(), self.last_build) {
            return None;
        }
        self.last_build = self.clock.now();

        match builder::build(backend, &self.config, self.last_build) {
            Ok(program) => {
                let stages = program.stages().to_vec();
                tracing::info!(stages = ?stages, "shader program rebuilt");
                self.program = Some(program);
                Some(BuildOutcome::Succeeded { stages })
            }
            Err(err) => {
                let stage = err.stage();
                match self.failure_policy {
                    FailurePolicy::Clear => {
                        self.program = None;
                        tracing::error!("{err}");
                    }
                    FailurePolicy::KeepPrevious => {
                        tracing::error!(
                            kept_previous = self.program.is_some(),
                            "{err}"
                        );
                    }
                }
                Some(BuildOutcome::Failed {
                    stage,
                    message: err.to_string(),
                })
            }
        }
    }

    fn draw(&self, backend: &mut B, t: f32) -> usize {
        backend.begin_frame(CLEAR_COLOR);
        let Some(program) = &self.program else {
            return 0;
        };

        backend.bind_program(program.handle());
        backend.set_uniform("proj", self.state.projection().into());
        backend.set_uniform("view", self.state.camera.view_matrix().into());
        backend.set_uniform("animation_seconds", t.into());

        let primitive = if program.has_tessellation() {
            Primitive::Patches
        } else {
            Primitive::Triangles
        };

        for pass in ScenePass::ALL {
            pass.apply(backend, t, self.state.wireframe);
            backend.bind_vertex_source(&self.mesh);
            backend.draw(primitive, self.element_count);
        }
        ScenePass::ALL.len()
    }
}
