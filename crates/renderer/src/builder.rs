//! Transactional shader program builds.
//!
//! A build either returns a fully linked [`ShaderProgram`] or an error; it
//! never touches whatever program the caller currently has bound. Stages
//! compiled before a failure are dropped on the early return.
use std::fs;
use std::path::PathBuf;

use stageconfig::{FileSet, PipelineConfig, ShaderStage};

use crate::backend::GraphicsBackend;
use crate::compile::{concatenate, prepare_stage_source};
use crate::runtime::Timestamp;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to read {stage} shader {path}: {source}")]
    Read {
        stage: ShaderStage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to compile {stage} shader:\n{message}")]
    Compile { stage: ShaderStage, message: String },
    #[error("failed to link shader program:\n{message}")]
    Link { message: String },
}

impl BuildError {
    /// Stage that failed, `None` for link failures.
    pub fn stage(&self) -> Option<ShaderStage> {
        match self {
            BuildError::Read { stage, .. } | BuildError::Compile { stage, .. } => Some(*stage),
            BuildError::Link { .. } => None,
        }
    }
}

/// A linked program together with the stages it was built from.
#[derive(Debug)]
pub struct ShaderProgram<P> {
    handle: P,
    built_at: Timestamp,
    stages: Vec<ShaderStage>,
}

impl<P> ShaderProgram<P> {
    pub fn handle(&self) -> &P {
        &self.handle
    }

    pub fn built_at(&self) -> Timestamp {
        self.built_at
    }

    pub fn stages(&self) -> &[ShaderStage] {
        &self.stages
    }

    /// Draws must be issued as patches when this is true.
    pub fn has_tessellation(&self) -> bool {
        self.stages.iter().any(|stage| stage.is_tessellation())
    }
}

/// Reads, compiles and links every non-empty stage of `config`.
pub fn build<B: GraphicsBackend>(
    backend: &mut B,
    config: &PipelineConfig,
    built_at: Timestamp,
) -> Result<ShaderProgram<B::Program>, BuildError> {
    let mut compiled = Vec::new();
    for (stage, files) in config.active_stages() {
        let source = read_stage(stage, files)?;
        let prepared = prepare_stage_source(backend.stage_prelude(stage), &source);
        let handle = backend
            .compile_stage(stage, &prepared)
            .map_err(|message| BuildError::Compile { stage, message })?;
        tracing::debug!(stage = %stage, files = files.len(), "compiled stage");
        compiled.push((stage, handle));
    }

    if compiled.is_empty() {
        return Err(BuildError::Link {
            message: "no shader stages are configured".to_string(),
        });
    }

    let stages = compiled.iter().map(|(stage, _)| *stage).collect();
    let handle = backend
        .link(compiled)
        .map_err(|message| BuildError::Link { message })?;

    Ok(ShaderProgram {
        handle,
        built_at,
        stages,
    })
}

fn read_stage(stage: ShaderStage, files: &FileSet) -> Result<String, BuildError> {
    let mut contents = Vec::with_capacity(files.len());
    for path in files {
        let text = fs::read_to_string(path).map_err(|source| BuildError::Read {
            stage,
            path: path.clone(),
            source,
        })?;
        contents.push(text);
    }
    Ok(concatenate(contents.iter().map(String::as_str)))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use stageconfig::FileSet;

    use super::*;
    use crate::headless::HeadlessBackend;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn config(vertex: Vec<PathBuf>, fragment: Vec<PathBuf>) -> PipelineConfig {
        PipelineConfig {
            vertex: FileSet::new(vertex),
            fragment: FileSet::new(fragment),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn concatenates_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let common = write(dir.path(), "common.glsl", "float shared_helper() { return 1.0; }");
        let vs = write(dir.path(), "main.vs", "#version 410\nvoid main() {}\n");
        let fs_path = write(dir.path(), "main.fs", "void main() {}\n");

        let mut backend = HeadlessBackend::new();
        let program = build(
            &mut backend,
            &config(vec![common, vs], vec![fs_path]),
            12.5,
        )
        .unwrap();

        assert_eq!(program.stages(), &[ShaderStage::Vertex, ShaderStage::Fragment]);
        assert_eq!(program.built_at(), 12.5);
        assert!(!program.has_tessellation());

        let vertex_source = &program.handle().sources[0];
        let helper = vertex_source.find("shared_helper").unwrap();
        let main = vertex_source.find("void main").unwrap();
        assert!(helper < main);
        assert!(!vertex_source.contains("#version 410"));
    }

    #[test]
    fn unreadable_file_reports_its_stage() {
        let dir = tempfile::tempdir().unwrap();
        let vs = write(dir.path(), "main.vs", "void main() {}\n");
        let missing = dir.path().join("missing.fs");

        let mut backend = HeadlessBackend::new();
        let err = build(&mut backend, &config(vec![vs], vec![missing.clone()]), 0.0).unwrap_err();
        assert_eq!(err.stage(), Some(ShaderStage::Fragment));
        assert!(matches!(err, BuildError::Read { ref path, .. } if *path == missing));
    }

    #[test]
    fn compile_failure_aborts_before_link() {
        let dir = tempfile::tempdir().unwrap();
        let vs = write(dir.path(), "main.vs", "void main() {}\n");
        let fs_path = write(dir.path(), "main.fs", "#error broken\n");

        let mut backend = HeadlessBackend::new();
        let err = build(&mut backend, &config(vec![vs], vec![fs_path]), 0.0).unwrap_err();
        assert_eq!(err.stage(), Some(ShaderStage::Fragment));
        assert!(err.to_string().contains("broken"));
        assert_eq!(backend.linked_programs(), 0);
    }

    #[test]
    fn empty_config_fails_to_link() {
        let mut backend = HeadlessBackend::new();
        let err = build(&mut backend, &PipelineConfig::default(), 0.0).unwrap_err();
        assert!(matches!(err, BuildError::Link { .. }));
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn tessellation_stages_mark_program() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(
            vec![write(dir.path(), "a.vs", "void main() {}\n")],
            vec![write(dir.path(), "a.fs", "void main() {}\n")],
        );
        cfg.tess_control = FileSet::new(vec![write(dir.path(), "a.tcs", "void main() {}\n")]);
        cfg.tess_evaluation = FileSet::new(vec![write(dir.path(), "a.tes", "void main() {}\n")]);

        let mut backend = HeadlessBackend::new();
        let program = build(&mut backend, &cfg, 0.0).unwrap();
        assert!(program.has_tessellation());
        assert_eq!(program.stages().len(), 4);
    }

    #[test]
    fn failed_build_leaves_earlier_program_intact() {
        let dir = tempfile::tempdir().unwrap();
        let vs = write(dir.path(), "main.vs", "void main() {}\n");
        let fs_path = write(dir.path(), "main.fs", "void main() {}\n");
        let cfg = config(vec![vs], vec![fs_path.clone()]);

        let mut backend = HeadlessBackend::new();
        let first = build(&mut backend, &cfg, 1.0).unwrap();
        fs::write(&fs_path, "#error nope\n").unwrap();
        assert!(build(&mut backend, &cfg, 2.0).is_err());

        assert_eq!(first.built_at(), 1.0);
        assert_eq!(first.stages(), &[ShaderStage::Vertex, ShaderStage::Fragment]);
        assert!(first.handle().sources[1].contains("void main"));
    }

    #[test]
    fn rebuilding_same_config_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(
            vec![write(dir.path(), "main.vs", "void main() {}\n")],
            vec![write(dir.path(), "main.fs", "void main() {}\n")],
        );
        let mut backend = HeadlessBackend::new();
        let first = build(&mut backend, &cfg, 1.0).unwrap();
        let second = build(&mut backend, &cfg, 1.0).unwrap();
        assert_eq!(first.stages(), second.stages());
        assert_eq!(first.handle().sources, second.handle().sources);
        assert_ne!(first.handle().id, second.handle().id);
    }
}
