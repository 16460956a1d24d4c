//! A backend that records commands instead of talking to a GPU.
//!
//! Compilation fails on any line starting with `#error`, mirroring what a GLSL
//! preprocessor would do, so failure paths can be driven from plain files.
use stageconfig::ShaderStage;

use crate::backend::{GraphicsBackend, Primitive, RasterState, UniformValue};
use crate::mesh::Mesh;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginFrame([f32; 4]),
    BindProgram(u32),
    SetUniform(String, UniformValue),
    SetRasterState(RasterState),
    BindVertexSource(u32),
    Draw(Primitive, u32),
}

#[derive(Debug, Clone)]
pub struct HeadlessStage {
    pub stage: ShaderStage,
    pub source: String,
}

/// A "linked" program: the prepared source of each stage in link order.
#[derive(Debug, Clone)]
pub struct HeadlessProgram {
    pub id: u32,
    pub stages: Vec<ShaderStage>,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct HeadlessMesh {
    pub id: u32,
    pub element_count: u32,
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    commands: Vec<Command>,
    next_id: u32,
    linked: usize,
    reject_tessellation: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails tessellation stages at compile time, like backends without them.
    pub fn without_tessellation() -> Self {
        Self {
            reject_tessellation: true,
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn linked_programs(&self) -> usize {
        self.linked
    }

    pub fn draw_calls(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, Command::Draw(..)))
            .count()
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GraphicsBackend for HeadlessBackend {
    type Stage = HeadlessStage;
    type Program = HeadlessProgram;
    type Mesh = HeadlessMesh;

    fn stage_prelude(&self, _stage: ShaderStage) -> &str {
        "#version 410 core"
    }

    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> Result<HeadlessStage, String> {
        if self.reject_tessellation && stage.is_tessellation() {
            return Err(format!("{stage} shaders are not supported"));
        }
        if let Some(line) = source
            .lines()
            .find(|line| line.trim_start().starts_with("#error"))
        {
            return Err(line.trim().to_string());
        }
        Ok(HeadlessStage {
            stage,
            source: source.to_string(),
        })
    }

    fn link(&mut self, stages: Vec<(ShaderStage, HeadlessStage)>) -> Result<HeadlessProgram, String> {
        let has = |wanted: ShaderStage| stages.iter().any(|(stage, _)| *stage == wanted);
        if has(ShaderStage::TessControl) && !has(ShaderStage::TessEvaluation) {
            return Err("tessellation control stage requires an evaluation stage".to_string());
        }
        let id = self.allocate_id();
        self.linked += 1;
        let (stages, sources) = stages
            .into_iter()
            .map(|(stage, compiled)| (stage, compiled.source))
            .unzip();
        Ok(HeadlessProgram {
            id,
            stages,
            sources,
        })
    }

    fn upload_mesh(&mut self, mesh: &Mesh) -> HeadlessMesh {
        HeadlessMesh {
            id: self.allocate_id(),
            element_count: mesh.element_count(),
        }
    }

    fn begin_frame(&mut self, color: [f32; 4]) {
        self.commands.push(Command::BeginFrame(color));
    }

    fn bind_program(&mut self, program: &HeadlessProgram) {
        self.commands.push(Command::BindProgram(program.id));
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.commands
            .push(Command::SetUniform(name.to_string(), value));
    }

    fn set_raster_state(&mut self, state: RasterState) {
        self.commands.push(Command::SetRasterState(state));
    }

    fn bind_vertex_source(&mut self, mesh: &HeadlessMesh) {
        self.commands.push(Command::BindVertexSource(mesh.id));
    }

    fn draw(&mut self, primitive: Primitive, element_count: u32) {
        self.commands.push(Command::Draw(primitive, element_count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_directive_fails_compilation() {
        let mut backend = HeadlessBackend::new();
        let err = backend
            .compile_stage(ShaderStage::Fragment, "void main() {}\n  #error missing semicolon\n")
            .unwrap_err();
        assert_eq!(err, "#error missing semicolon");
    }

    #[test]
    fn tessellation_can_be_rejected() {
        let mut backend = HeadlessBackend::without_tessellation();
        assert!(backend
            .compile_stage(ShaderStage::TessEvaluation, "void main() {}")
            .is_err());
        assert!(backend
            .compile_stage(ShaderStage::Vertex, "void main() {}")
            .is_ok());
    }

    #[test]
    fn link_requires_evaluation_with_control() {
        let mut backend = HeadlessBackend::new();
        let control = backend
            .compile_stage(ShaderStage::TessControl, "void main() {}")
            .unwrap();
        assert!(backend
            .link(vec![(ShaderStage::TessControl, control)])
            .is_err());
        assert_eq!(backend.linked_programs(), 0);
    }
}
