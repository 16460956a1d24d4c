use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key as WinitKey, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::WgpuBackend;
use crate::input::{InputSink, Key, Modifiers, MouseButton};
use crate::orchestrator::{FrameOrchestrator, OrchestratorState};
use crate::runtime::SystemClock;
use crate::types::ViewerConfig;

/// Scroll distance that counts as one wheel notch for touchpads reporting pixels.
const PIXELS_PER_LINE: f64 = 20.0;

/// Everything the event loop owns. Field order matters: the backend's surface
/// must drop before the window it was created from.
struct Viewer {
    orchestrator: FrameOrchestrator<WgpuBackend, SystemClock>,
    backend: WgpuBackend,
    modifiers: Modifiers,
    window: Arc<Window>,
}

impl Viewer {
    fn new(window: Arc<Window>, config: &ViewerConfig) -> Result<Self> {
        let size = window.inner_size();
        let mut backend = WgpuBackend::new(window.as_ref(), size, config.antialiasing)?;
        let mut orchestrator = FrameOrchestrator::new(&mut backend, config, SystemClock::new());
        orchestrator.state_mut().resize(size.width, size.height);
        Ok(Self {
            orchestrator,
            backend,
            modifiers: Modifiers::NONE,
            window,
        })
    }

    fn sink(&mut self) -> &mut OrchestratorState {
        self.orchestrator.state_mut()
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        let pressed = event.state == ElementState::Pressed;
        let modifiers = self.modifiers;
        self.sink().on_key(map_key(&event.logical_key), pressed, modifiers);
        if !pressed || modifiers.control {
            return;
        }
        if let Some(text) = event.text.as_ref() {
            for ch in text.chars() {
                self.sink().on_char(ch);
            }
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.backend.resize(size);
        let applied = self.backend.size();
        self.orchestrator
            .state_mut()
            .resize(applied.width, applied.height);
    }

    /// Runs one tick and presents it. Returns false when the loop should stop.
    fn render_frame(&mut self) -> bool {
        self.orchestrator.tick(&mut self.backend);
        match self.backend.present() {
            Ok(()) => true,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.resize(self.backend.size());
                true
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("surface out of memory; closing viewer");
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "surface error; retrying next frame");
                true
            }
        }
    }
}

/// Opens the viewer window and drives the frame loop until it is closed.
pub fn run(config: ViewerConfig) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window_size = PhysicalSize::new(config.window_size.0, config.window_size.1);
    let window = WindowBuilder::new()
        .with_title("Orrery")
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create viewer window: {err}"))?;
    let window = Arc::new(window);

    let mut viewer = Viewer::new(window, &config)?;
    tracing::info!(
        config = %config.config_path.display(),
        fps = config.target_fps,
        "watching pipeline config"
    );
    viewer.window.request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == viewer.window.id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                    WindowEvent::ModifiersChanged(modifiers) => {
                        let state = modifiers.state();
                        viewer.modifiers = Modifiers {
                            control: state.control_key(),
                            shift: state.shift_key(),
                            alt: state.alt_key(),
                        };
                    }
                    WindowEvent::KeyboardInput { event, .. } => viewer.handle_key(&event),
                    WindowEvent::CursorMoved { position, .. } => {
                        viewer.sink().on_cursor_move(position.x, position.y);
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        viewer
                            .sink()
                            .on_mouse_button(map_button(button), state == ElementState::Pressed);
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        let (dx, dy) = match delta {
                            MouseScrollDelta::LineDelta(x, y) => (f64::from(x), f64::from(y)),
                            MouseScrollDelta::PixelDelta(offset) => {
                                (offset.x / PIXELS_PER_LINE, offset.y / PIXELS_PER_LINE)
                            }
                        };
                        viewer.sink().on_scroll(dx, dy);
                    }
                    WindowEvent::Resized(new_size) => viewer.resize(new_size),
                    WindowEvent::RedrawRequested => {
                        if !viewer.render_frame() {
                            elwt.exit();
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                if viewer.orchestrator.should_close() {
                    elwt.exit();
                    return;
                }
                let now = Instant::now();
                match viewer.orchestrator.pacer().remaining(now) {
                    Some(left) => {
                        tracing::trace!(wait_ms = left.as_millis(), "waiting until next frame");
                        elwt.set_control_flow(ControlFlow::WaitUntil(now + left));
                    }
                    None => {
                        viewer.window.request_redraw();
                        elwt.set_control_flow(ControlFlow::Wait);
                    }
                }
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

fn map_key(key: &WinitKey) -> Key {
    match key {
        WinitKey::Named(NamedKey::Escape) => Key::Escape,
        WinitKey::Character(text) => text.chars().next().map_or(Key::Other, Key::Character),
        _ => Key::Other,
    }
}

fn map_button(button: winit::event::MouseButton) -> MouseButton {
    match button {
        winit::event::MouseButton::Left => MouseButton::Left,
        winit::event::MouseButton::Right => MouseButton::Right,
        winit::event::MouseButton::Middle => MouseButton::Middle,
        _ => MouseButton::Other,
    }
}
