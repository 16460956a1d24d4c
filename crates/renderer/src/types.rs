use std::path::PathBuf;

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// What happens to the active program when a rebuild fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Drop the active program; frames are cleared until a build succeeds.
    #[default]
    Clear,
    /// Keep drawing with the last program that built successfully.
    KeepPrevious,
}

/// Immutable configuration passed to the viewer at start-up.
///
/// `ViewerConfig` mirrors CLI flags: which pipeline description to watch, how
/// large the window should be, and how hard to try drawing every frame.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// JSON file listing the source files of each shader stage.
    pub config_path: PathBuf,
    /// Initial window size in physical pixels.
    pub window_size: (u32, u32),
    /// Frame-rate cap; also the rate at which sources are polled.
    pub target_fps: f32,
    /// Directory that relative shader paths are resolved against.
    pub shader_root: Option<PathBuf>,
    pub failure_policy: FailurePolicy,
    pub antialiasing: Antialiasing,
    /// Refinement steps applied to the icosahedron drawn for every body.
    pub subdivisions: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("data/pipeline.json"),
            window_size: (640, 360),
            target_fps: 60.0,
            shader_root: None,
            failure_policy: FailurePolicy::default(),
            antialiasing: Antialiasing::default(),
            subdivisions: 3,
        }
    }
}
