use std::path::PathBuf;

use renderer::headless::{Command, HeadlessBackend};
use renderer::runtime::ManualClock;
use renderer::{build, FrameOrchestrator, ViewerConfig};
use stageconfig::{PipelineConfig, ShaderStage};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn bundled_config() -> PipelineConfig {
    PipelineConfig::load(&workspace_root().join("data/pipeline.json"))
        .expect("bundled pipeline config parses")
        .resolve_relative(&workspace_root())
}

#[test]
fn bundled_pipeline_has_no_issues() {
    let config = bundled_config();
    assert_eq!(config.issues(), Vec::<String>::new());
    let stages: Vec<_> = config.active_stages().map(|(stage, _)| stage).collect();
    assert_eq!(stages, vec![ShaderStage::Vertex, ShaderStage::Fragment]);
}

#[test]
fn bundled_sources_get_the_shared_block_instead_of_their_own_uniforms() {
    let mut backend = HeadlessBackend::new();
    let program = build(&mut backend, &bundled_config(), 0.0).expect("bundled pipeline builds");
    let handle = program.handle();
    assert_eq!(handle.sources.len(), 2);
    for source in &handle.sources {
        assert!(source.starts_with("#version 410 core\n#line 1\n"));
        assert_eq!(source.matches("#version").count(), 1);
        assert!(!source.contains("uniform mat4 proj;"));
        assert!(!source.contains("uniform bool is_sun;"));
        assert!(source.contains("void main()"));
    }
}

#[test]
fn first_tick_draws_all_four_bodies() {
    let mut backend = HeadlessBackend::new();
    let config = ViewerConfig {
        config_path: workspace_root().join("data/pipeline.json"),
        shader_root: Some(workspace_root()),
        subdivisions: 1,
        ..ViewerConfig::default()
    };
    let mut orchestrator = FrameOrchestrator::new(&mut backend, &config, ManualClock::new(1.0e9));

    let report = orchestrator.tick(&mut backend);
    assert!(report.config_reloaded);
    assert_eq!(report.draw_calls, 4);
    assert!(orchestrator.program().is_some());
    assert!(backend
        .commands()
        .iter()
        .any(|command| matches!(command, Command::BindProgram(_))));
}
