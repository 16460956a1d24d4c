use stageconfig::ShaderStage;

/// Uniform names every stage sees through the shared block.
pub const SHARED_UNIFORMS: [&str; 8] = [
    "proj",
    "view",
    "model",
    "animation_seconds",
    "is_background",
    "is_sun",
    "is_moon",
    "sun_world_pos",
];

/// Produces the text handed to the backend for one stage.
///
/// Steps performed:
///
/// 1. Strip `#version` directives and declarations of the shared uniforms so
///    the prelude can supply its own.
/// 2. Prepend `prelude`, then reset line numbering so compiler diagnostics
///    point at the user's concatenated source.
pub fn prepare_stage_source(prelude: &str, source: &str) -> String {
    let sanitized = strip_shared_uniforms(&strip_version_directives(source));
    if prelude.is_empty() {
        return sanitized;
    }
    format!("{prelude}\n#line 1\n{sanitized}")
}

/// Concatenates file contents in order, making sure each one ends on a newline
/// so a trailing token never fuses with the next file.
pub fn concatenate<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut joined = String::new();
    for part in parts {
        joined.push_str(part);
        if !part.is_empty() && !part.ends_with('\n') {
            joined.push('\n');
        }
    }
    joined
}

pub fn strip_version_directives(source: &str) -> String {
    keep_lines(source, |line| !line.trim_start().starts_with("#version"))
}

/// Drops `uniform` declarations of [`SHARED_UNIFORMS`].
///
/// Only the declared identifiers count: other declarations on the same line,
/// trailing `//` comments and declarators of unrelated uniforms are kept.
pub fn strip_shared_uniforms(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        if let Some(kept) = strip_shared_from_line(line) {
            out.push_str(&kept);
            out.push('\n');
        }
    }
    out
}

/// `None` when nothing but shared declarations was on the line.
fn strip_shared_from_line(line: &str) -> Option<String> {
    let (code, comment) = line.split_at(line.find("//").unwrap_or(line.len()));
    if !code.contains("uniform") {
        return Some(line.to_string());
    }

    let mut changed = false;
    let mut kept = String::with_capacity(code.len());
    for statement in code.split_inclusive(';') {
        match strip_shared_declarators(statement) {
            Some(rewritten) => {
                changed = true;
                kept.push_str(&rewritten);
            }
            None => kept.push_str(statement),
        }
    }

    if !changed {
        return Some(line.to_string());
    }
    if kept.trim().is_empty() {
        let comment = comment.trim();
        return (!comment.is_empty()).then(|| comment.to_string());
    }
    if comment.is_empty() {
        Some(kept.trim_end().to_string())
    } else {
        Some(format!("{} {comment}", kept.trim_end()))
    }
}

/// Rewrites one `;`-terminated statement without its shared declarators.
///
/// Returns `None` when the statement is not a plain uniform declaration or
/// declares none of the shared names; otherwise the replacement text, which is
/// empty once every declarator was shared.
fn strip_shared_declarators(statement: &str) -> Option<String> {
    let body = statement.trim().strip_suffix(';')?;
    let words: Vec<&str> = body.split_whitespace().collect();
    let keyword = words.iter().position(|word| *word == "uniform")?;
    let head = words.get(..keyword + 2)?;
    let declarators = words[keyword + 2..].join(" ");
    if declarators.is_empty() || declarators.contains(['{', '(']) {
        return None;
    }

    let (shared, others): (Vec<&str>, Vec<&str>) = declarators
        .split(',')
        .map(str::trim)
        .partition(|declarator| SHARED_UNIFORMS.contains(&declared_name(declarator)));
    if shared.is_empty() {
        return None;
    }
    if others.is_empty() {
        return Some(String::new());
    }

    let indent = &statement[..statement.len() - statement.trim_start().len()];
    Some(format!("{indent}{} {};", head.join(" "), others.join(", ")))
}

/// Identifier of a declarator such as `blend`, `weights[4]` or `highp float t`.
fn declared_name(declarator: &str) -> &str {
    let end = declarator.find(['[', '=']).unwrap_or(declarator.len());
    declarator[..end].split_whitespace().last().unwrap_or("")
}

fn keep_lines(source: &str, keep: impl Fn(&str) -> bool) -> String {
    let mut out = String::with_capacity(source.len());
    for line in source.lines().filter(|line| keep(line)) {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Prelude for the wgpu backend; empty for stages it cannot compile.
pub fn wgpu_prelude(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex | ShaderStage::Fragment => HEADER,
        ShaderStage::TessControl | ShaderStage::TessEvaluation => "",
    }
}

/// Shared declarations for vertex and fragment stages.
///
/// The block layout must match `FrameUniforms` in `gpu/uniforms.rs`. The flags
/// travel as ints because std140 has no portable bool.
const HEADER: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform FrameGlobals {
    mat4 _proj;
    mat4 _view;
    mat4 _model;
    vec4 _sun_world_pos;
    float _animation_seconds;
    int _is_background;
    int _is_sun;
    int _is_moon;
} globals;

#define proj globals._proj
#define view globals._view
#define model globals._model
#define sun_world_pos globals._sun_world_pos.xyz
#define animation_seconds globals._animation_seconds
#define is_background (globals._is_background != 0)
#define is_sun (globals._is_sun != 0)
#define is_moon (globals._is_moon != 0)
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_lines_are_removed_anywhere() {
        let source = "#version 410 core\nvoid a() {}\n  #version 330\nvoid b() {}\n";
        assert_eq!(
            strip_version_directives(source),
            "void a() {}\nvoid b() {}\n"
        );
    }

    #[test]
    fn only_shared_uniforms_are_stripped() {
        let source = "uniform mat4 proj;\nuniform bool is_sun;\nuniform vec3 sun_world_pos;\n\
                      uniform float is_sunlit;\nuniform sampler2D tex;\nmat4 view_local;\n";
        let stripped = strip_shared_uniforms(source);
        assert_eq!(
            stripped,
            "uniform float is_sunlit;\nuniform sampler2D tex;\nmat4 view_local;\n"
        );
    }

    #[test]
    fn comments_mentioning_shared_names_do_not_remove_declarations() {
        let source = "uniform float blend; // fades the model in\nvoid main() {}\n";
        assert_eq!(strip_shared_uniforms(source), source);
    }

    #[test]
    fn only_shared_declarations_leave_a_shared_line() {
        let source = "uniform vec3 tint; uniform mat4 view;\n\
                      uniform mat4 proj, extra[2]; // camera\n\
                      uniform mat4 model; // placed by the viewer\n\
                      void main() {}\n";
        assert_eq!(
            strip_shared_uniforms(source),
            "uniform vec3 tint;\nuniform mat4 extra[2]; // camera\n\
             // placed by the viewer\nvoid main() {}\n"
        );
    }

    #[test]
    fn uniform_blocks_and_layouts_are_untouched() {
        let source = "layout(std140) uniform Camera {\n    mat4 view;\n} camera;\n\
                      layout(binding = 1) uniform sampler2D model_texture;\n";
        assert_eq!(strip_shared_uniforms(source), source);
    }

    #[test]
    fn concatenation_keeps_order_and_separates_files() {
        let joined = concatenate(["float a;", "float b;\n", "", "void main() {}"]);
        assert_eq!(joined, "float a;\nfloat b;\nvoid main() {}\n");
    }

    #[test]
    fn prelude_precedes_user_source() {
        let prepared = prepare_stage_source(
            wgpu_prelude(ShaderStage::Fragment),
            "#version 410\nuniform float animation_seconds;\nvoid main() {}\n",
        );
        assert!(prepared.starts_with("#version 450\n"));
        assert_eq!(prepared.matches("#version").count(), 1);
        assert!(prepared.contains("} globals;"));
        assert!(prepared.ends_with("#line 1\nvoid main() {}\n"));
        assert!(!prepared.contains("uniform float animation_seconds"));
    }

    #[test]
    fn empty_prelude_leaves_sanitized_source() {
        assert_eq!(
            prepare_stage_source("", "#version 410\nvoid main() {}"),
            "void main() {}\n"
        );
    }

    #[test]
    fn tessellation_stages_have_no_wgpu_prelude() {
        assert!(wgpu_prelude(ShaderStage::TessControl).is_empty());
        assert!(wgpu_prelude(ShaderStage::TessEvaluation).is_empty());
        for name in SHARED_UNIFORMS {
            assert!(wgpu_prelude(ShaderStage::Vertex).contains(&format!("#define {name} ")));
        }
    }
}
