//! Declarative description of which GLSL files make up each shader stage.
//!
//! The document is a JSON object with up to four arrays of paths:
//!
//! ```json
//! {
//!   "vertex":          ["glsl/version.glsl", "glsl/pass-through.vs"],
//!   "tess_control":    [],
//!   "tess_evaluation": [],
//!   "fragment":        ["glsl/version.glsl", "glsl/planet.fs"]
//! }
//! ```
//!
//! Missing arrays mean the stage is omitted from the pipeline. Within a stage
//! the files are concatenated in the listed order before compilation.
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read pipeline config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse pipeline config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One programmable stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    TessControl,
    TessEvaluation,
    Fragment,
}

impl ShaderStage {
    /// Stages in pipeline order.
    pub const ALL: [ShaderStage; 4] = [
        ShaderStage::Vertex,
        ShaderStage::TessControl,
        ShaderStage::TessEvaluation,
        ShaderStage::Fragment,
    ];

    /// Key used for the stage in the JSON document.
    pub fn key(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::TessControl => "tess_control",
            ShaderStage::TessEvaluation => "tess_evaluation",
            ShaderStage::Fragment => "fragment",
        }
    }

    pub fn is_tessellation(self) -> bool {
        matches!(self, ShaderStage::TessControl | ShaderStage::TessEvaluation)
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::TessControl => f.write_str("tessellation control"),
            ShaderStage::TessEvaluation => f.write_str("tessellation evaluation"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Ordered list of source files for one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct FileSet(Vec<PathBuf>);

impl FileSet {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self(paths)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.0.iter()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<PathBuf> for FileSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Immutable snapshot of the per-stage file lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub vertex: FileSet,
    pub tess_control: FileSet,
    pub tess_evaluation: FileSet,
    pub fragment: FileSet,
}

impl PipelineConfig {
    /// Reads and parses the config file. Never partially applied: the caller
    /// either gets a complete snapshot or an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json_str(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    pub fn files(&self, stage: ShaderStage) -> &FileSet {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::TessControl => &self.tess_control,
            ShaderStage::TessEvaluation => &self.tess_evaluation,
            ShaderStage::Fragment => &self.fragment,
        }
    }

    fn files_mut(&mut self, stage: ShaderStage) -> &mut FileSet {
        match stage {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::TessControl => &mut self.tess_control,
            ShaderStage::TessEvaluation => &mut self.tess_evaluation,
            ShaderStage::Fragment => &mut self.fragment,
        }
    }

    /// Every stage paired with its file list, in pipeline order.
    pub fn stages(&self) -> impl Iterator<Item = (ShaderStage, &FileSet)> {
        ShaderStage::ALL
            .into_iter()
            .map(move |stage| (stage, self.files(stage)))
    }

    /// Stages that have at least one source file.
    pub fn active_stages(&self) -> impl Iterator<Item = (ShaderStage, &FileSet)> {
        self.stages().filter(|(_, files)| !files.is_empty())
    }

    /// Every path across all stages, in stage order.
    pub fn all_paths(&self) -> impl Iterator<Item = &Path> {
        self.stages()
            .flat_map(|(_, files)| files.iter().map(PathBuf::as_path))
    }

    /// Rebases relative paths onto `base`; absolute paths are left alone.
    pub fn resolve_relative(mut self, base: &Path) -> Self {
        for stage in ShaderStage::ALL {
            let files = self.files_mut(stage);
            *files = files
                .iter()
                .map(|path| {
                    if path.is_relative() {
                        base.join(path)
                    } else {
                        path.clone()
                    }
                })
                .collect();
        }
        self
    }

    /// Human-readable problems that would stop the pipeline from building.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.vertex.is_empty() {
            issues.push("no vertex shader files listed".to_string());
        }
        if self.fragment.is_empty() {
            issues.push("no fragment shader files listed".to_string());
        }
        if self.tess_control.is_empty() != self.tess_evaluation.is_empty() {
            issues.push(
                "tessellation control and evaluation stages must be listed together".to_string(),
            );
        }
        for (stage, files) in self.stages() {
            for path in files {
                if !path.exists() {
                    issues.push(format!(
                        "{stage} source {} does not exist",
                        path.display()
                    ));
                }
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
{
  "vertex": ["glsl/version.glsl", "glsl/pass-through.vs"],
  "tess_control": ["glsl/version.glsl", "glsl/pass-through.tcs"],
  "tess_evaluation": ["glsl/version.glsl", "glsl/snap-to-sphere.tes"],
  "fragment": ["glsl/version.glsl", "glsl/planet.fs"]
}
"#;

    #[test]
    fn parses_all_four_stages_in_order() {
        let config = PipelineConfig::from_json_str(SAMPLE).expect("parse config");
        assert_eq!(config.vertex.len(), 2);
        assert_eq!(
            config.tess_evaluation.paths()[1],
            PathBuf::from("glsl/snap-to-sphere.tes")
        );
        let stages: Vec<_> = config.active_stages().map(|(stage, _)| stage).collect();
        assert_eq!(stages, ShaderStage::ALL.to_vec());
        assert_eq!(config.all_paths().count(), 8);
    }

    #[test]
    fn missing_arrays_are_empty() {
        let config = PipelineConfig::from_json_str(
            r#"{ "vertex": ["a.vs"], "fragment": ["a.fs"], "comment": "ignored" }"#,
        )
        .expect("parse config");
        assert!(config.tess_control.is_empty());
        assert!(config.tess_evaluation.is_empty());
        let stages: Vec<_> = config.active_stages().map(|(stage, _)| stage).collect();
        assert_eq!(stages, vec![ShaderStage::Vertex, ShaderStage::Fragment]);
    }

    #[test]
    fn rejects_non_string_entries() {
        assert!(PipelineConfig::from_json_str(r#"{ "vertex": [1, 2] }"#).is_err());
        assert!(PipelineConfig::from_json_str(r#"{ "vertex": "a.vs" }"#).is_err());
        assert!(PipelineConfig::from_json_str("[]").is_err());
    }

    #[test]
    fn load_reports_unreadable_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            PipelineConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ \"vertex\": [").unwrap();
        assert!(matches!(
            PipelineConfig::load(&broken),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn resolve_relative_keeps_absolute_paths() {
        let absolute = std::env::temp_dir().join("shared.glsl");
        let config = PipelineConfig {
            vertex: FileSet::new(vec![PathBuf::from("a.vs"), absolute.clone()]),
            ..PipelineConfig::default()
        }
        .resolve_relative(Path::new("/shaders"));
        assert_eq!(config.vertex.paths()[0], PathBuf::from("/shaders/a.vs"));
        assert_eq!(config.vertex.paths()[1], absolute);
    }

    #[test]
    fn issues_flag_unpaired_tessellation_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let vs = dir.path().join("a.vs");
        fs::write(&vs, "void main() {}").unwrap();
        let config = PipelineConfig {
            vertex: FileSet::new(vec![vs]),
            tess_control: FileSet::new(vec![dir.path().join("a.tcs")]),
            ..PipelineConfig::default()
        };
        let issues = config.issues();
        assert!(issues.iter().any(|issue| issue.contains("fragment")));
        assert!(issues.iter().any(|issue| issue.contains("listed together")));
        assert!(issues.iter().any(|issue| issue.contains("a.tcs")));
        assert!(!issues.iter().any(|issue| issue.contains("a.vs")));
    }
}
