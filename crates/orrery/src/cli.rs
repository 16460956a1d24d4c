use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use renderer::Antialiasing;

const DEFAULT_CONFIG: &str = "data/pipeline.json";

#[derive(Parser, Debug)]
#[command(
    name = "orrery",
    author,
    version,
    about = "Live-reload GLSL pipeline viewer",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Pipeline config listing the GLSL files of each stage.
    #[arg(value_name = "CONFIG", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, default_value = "640x360")]
    pub size: (u32, u32),

    /// Frame-rate cap; sources are polled once per frame.
    #[arg(long, value_name = "FPS", value_parser = parse_fps, default_value_t = 60.0)]
    pub fps: f32,

    /// Resolve relative shader paths against this directory instead of the working directory.
    #[arg(long, value_name = "DIR")]
    pub shader_root: Option<PathBuf>,

    /// Keep drawing the last good program when a rebuild fails.
    #[arg(long)]
    pub keep_last_program: bool,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(
        long,
        value_name = "MODE",
        value_parser = parse_antialias,
        default_value = "auto"
    )]
    pub antialias: Antialiasing,

    /// Icosphere refinement steps for the body mesh.
    #[arg(
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(0..=6),
        default_value_t = 3
    )]
    pub subdivisions: u32,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a pipeline config without opening a window and report problems.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[arg(value_name = "CONFIG", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Resolve relative shader paths against this directory.
    #[arg(long, value_name = "DIR")]
    pub shader_root: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{width}' in size"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{height}' in size"))?;

    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }
    Ok((width, height))
}

pub fn parse_fps(value: &str) -> Result<f32, String> {
    let fps: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid frame rate '{value}'"))?;
    if !fps.is_finite() || fps <= 0.0 {
        return Err("frame rate must be a positive number".to_string());
    }
    Ok(fps)
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("anti-alias mode must not be empty".to_string());
    }

    let normalized = trimmed.to_ascii_lowercase();
    match normalized.as_str() {
        "auto" | "max" | "default" => Ok(Antialiasing::Auto),
        "off" | "none" | "disable" | "disabled" | "0" => Ok(Antialiasing::Off),
        _ => {
            let samples: u32 = normalized.parse().map_err(|_| {
                format!("invalid anti-alias sample count '{trimmed}'; use auto/off or 2/4/8/16")
            })?;

            if samples == 1 {
                return Ok(Antialiasing::Off);
            }
            if !matches!(samples, 2 | 4 | 8 | 16) {
                return Err(format!(
                    "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                ));
            }
            Ok(Antialiasing::Samples(samples))
        }
    }
}
