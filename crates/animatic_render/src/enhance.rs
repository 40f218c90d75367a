//! Script enhancement: snippet wrapping, import repair and layout helpers.

use animatic_core::Script;
use regex::Regex;
use std::sync::LazyLock;

/// Class name given to wrapped snippets.
const GENERATED_SCENE: &str = "GeneratedScene";

const FRAMEWORK_IMPORT: &str = "from manim import *";

static SCENE_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^class\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*:")
        .expect("Valid scene class regex")
});

static FRAMEWORK_IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(from\s+manim\s+import|import\s+manim\b)")
        .expect("Valid framework import regex")
});

static LATEX_MOBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(MathTex|Tex|SingleStringMathTex|Matrix|DecimalMatrix|IntegerMatrix|MobjectMatrix|BulletedList|Title)\s*\(")
        .expect("Valid LaTeX mobject regex")
});

static THREE_D_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(ThreeDScene|ThreeDAxes|set_camera_orientation|configure_3d_camera|begin_ambient_camera_rotation)\b")
        .expect("Valid 3D scene regex")
});

/// Metadata comments at the top of a diagram snippet.
///
/// ```text
/// # DIAGRAM_SCHEMA: flowchart_v1
/// # DESCRIPTION: Simple three-step process flow
/// # TOPICS: process, algorithm, steps
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetHeader {
    /// Schema or illustration name
    pub schema: Option<String>,
    /// Free-text description
    pub description: Option<String>,
    /// Topic keywords
    pub topics: Vec<String>,
    /// Scene requirements, e.g. a required base class
    pub requires: Option<String>,
}

impl SnippetHeader {
    /// Whether no header fields were found.
    pub fn is_empty(&self) -> bool {
        self.schema.is_none()
            && self.description.is_none()
            && self.topics.is_empty()
            && self.requires.is_none()
    }
}

/// Parse `# KEY: value` comments from the top of a script.
pub fn parse_header(source: &str) -> SnippetHeader {
    let mut header = SnippetHeader::default();
    for line in source.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        let Some(comment) = line.strip_prefix('#') else {
            break;
        };
        let Some((key, value)) = comment.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "DIAGRAM_SCHEMA" | "ILLUSTRATION" => header.schema = Some(value),
            "DESCRIPTION" => header.description = Some(value),
            "TOPICS" => {
                header.topics = value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            "REQUIRES" => header.requires = Some(value),
            _ => {}
        }
    }
    header
}

/// Names of top-level classes deriving from a Scene type.
pub fn find_scene_classes(source: &str) -> Vec<String> {
    SCENE_CLASS
        .captures_iter(source)
        .filter(|caps| caps.get(2).is_some_and(|bases| bases.as_str().contains("Scene")))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Whether the script creates objects that need a LaTeX toolchain.
pub fn uses_latex(source: &str) -> bool {
    LATEX_MOBJECT.is_match(source)
}

fn has_framework_import(source: &str) -> bool {
    FRAMEWORK_IMPORT_LINE.is_match(source)
}

/// A script ready to write into the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancedScript {
    /// Final source
    pub source: String,
    /// Scene class to render
    pub scene_name: String,
    /// Whether a bare snippet was wrapped in a generated class
    pub wrapped: bool,
    /// Parsed header comments
    pub header: SnippetHeader,
}

/// Turn a generated script into a renderable scene file.
///
/// Full scripts keep their classes and gain the framework import if it is
/// missing. Bare snippets (animation calls on `self` without a class) are
/// wrapped into a generated Scene subclass; top-level imports and helper
/// functions stay at module level.
///
/// # Errors
///
/// Returns a message when the script is blank, defines no scene and no
/// animation calls, or does not define the requested scene.
pub fn enhance_script(script: &Script, preferred_scene: Option<&str>) -> Result<EnhancedScript, String> {
    if script.is_blank() {
        return Err("Script is empty".to_string());
    }
    let source = script.as_str();
    let header = parse_header(source);
    let scenes = find_scene_classes(source);

    if !scenes.is_empty() {
        let scene_name = match preferred_scene {
            Some(name) if scenes.iter().any(|s| s == name) => name.to_string(),
            Some(name) => {
                return Err(format!(
                    "Scene '{}' not found; script defines {}",
                    name,
                    scenes.join(", ")
                ));
            }
            None => scenes[0].clone(),
        };
        let source = if has_framework_import(source) {
            source.to_string()
        } else {
            format!("{}\n\n{}", FRAMEWORK_IMPORT, source)
        };
        return Ok(EnhancedScript {
            source,
            scene_name,
            wrapped: false,
            header,
        });
    }

    if !source.contains("self.") {
        return Err("Script defines no Scene subclass and no animation calls".to_string());
    }

    let three_d = header
        .requires
        .as_deref()
        .is_some_and(|r| r.contains("ThreeDScene"))
        || THREE_D_HINT.is_match(source);
    let base = if three_d { "ThreeDScene" } else { "Scene" };

    Ok(EnhancedScript {
        source: wrap_snippet(source, base),
        scene_name: GENERATED_SCENE.to_string(),
        wrapped: true,
        header,
    })
}

fn wrap_snippet(source: &str, base: &str) -> String {
    let mut imports = Vec::new();
    let mut definitions = Vec::new();
    let mut body = Vec::new();
    let mut in_definition = false;

    for line in source.lines() {
        let top_level = !line.starts_with([' ', '\t']);
        if top_level && !line.trim().is_empty() {
            in_definition = line.starts_with("def ")
                || line.starts_with("async def ")
                || line.starts_with('@')
                || line.starts_with("class ");
        }
        if in_definition {
            definitions.push(line);
        } else if top_level && (line.starts_with("import ") || line.starts_with("from ")) {
            imports.push(line);
        } else {
            body.push(line);
        }
    }

    while body.first().is_some_and(|l| l.trim().is_empty()) {
        body.remove(0);
    }
    while body.last().is_some_and(|l| l.trim().is_empty()) {
        body.pop();
    }

    let mut out = String::new();
    if !imports.iter().any(|l| has_framework_import(l)) {
        out.push_str(FRAMEWORK_IMPORT);
        out.push('\n');
    }
    for line in &imports {
        out.push_str(line);
        out.push('\n');
    }
    if !definitions.is_empty() {
        out.push('\n');
        for line in &definitions {
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push_str(&format!("\n\nclass {}({}):\n    def construct(self):\n", GENERATED_SCENE, base));
    if body.iter().all(|l| l.trim().is_empty() || l.trim_start().starts_with('#')) {
        out.push_str("        self.wait(1)\n");
    }
    for line in &body {
        if line.trim().is_empty() {
            out.push('\n');
        } else {
            out.push_str("        ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Index of the line after the last top-level import statement.
///
/// Parenthesized and backslash-continued imports end on their closing line.
fn end_of_imports(lines: &[&str]) -> usize {
    let mut end = 0;
    let mut depth: i32 = 0;
    let mut continued = false;
    for (i, line) in lines.iter().enumerate() {
        let in_import = depth > 0 || continued;
        if !in_import && !(line.starts_with("import ") || line.starts_with("from ")) {
            continue;
        }
        let code = line.split('#').next().unwrap_or_default();
        depth += code.matches('(').count() as i32 - code.matches(')').count() as i32;
        depth = depth.max(0);
        continued = code.trim_end().ends_with('\\');
        if depth == 0 && !continued {
            end = i + 1;
        }
    }
    end
}

/// Insert layout helper source after the script's top-level imports.
///
/// A blank preamble, or one already present, leaves the source unchanged.
///
/// # Errors
///
/// Returns a message when the preamble's first line is indented, which
/// would not parse at module level.
pub fn inject_layout_preamble(source: &str, preamble: Option<&str>) -> Result<String, String> {
    let Some(preamble) = preamble.filter(|p| !p.trim().is_empty()) else {
        return Ok(source.to_string());
    };
    let first = preamble
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default();
    if first.starts_with([' ', '\t']) {
        return Err("Layout preamble must start at module level".to_string());
    }
    if source.contains(preamble.trim()) {
        return Ok(source.to_string());
    }

    let lines: Vec<&str> = source.lines().collect();
    let insert_at = end_of_imports(&lines);

    let mut out: Vec<String> = lines[..insert_at].iter().map(|l| l.to_string()).collect();
    out.push(String::new());
    out.push(preamble.trim_end().to_string());
    out.push(String::new());
    out.extend(lines[insert_at..].iter().map(|l| l.to_string()));
    Ok(out.join("\n") + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNIPPET: &str = "# DIAGRAM_SCHEMA: flowchart_v1\n# DESCRIPTION: Simple three-step process flow\n# TOPICS: process, algorithm, steps\n\nflowchart = create_flowchart(\n    steps=[\"Start\", \"End\"],\n)\n\nself.play(FadeIn(flowchart), run_time=1.5)\nself.wait(0.5)\n";

    #[test]
    fn test_parses_header_comments() {
        let header = parse_header(SNIPPET);
        assert_eq!(header.schema.as_deref(), Some("flowchart_v1"));
        assert_eq!(header.description.as_deref(), Some("Simple three-step process flow"));
        assert_eq!(header.topics, vec!["process", "algorithm", "steps"]);
        assert!(header.requires.is_none());
    }

    #[test]
    fn test_wraps_bare_snippet() {
        let enhanced = enhance_script(&Script::new(SNIPPET), None).unwrap();
        assert!(enhanced.wrapped);
        assert_eq!(enhanced.scene_name, "GeneratedScene");
        assert!(enhanced.source.starts_with("from manim import *\n"));
        assert!(enhanced.source.contains("class GeneratedScene(Scene):\n    def construct(self):\n"));
        assert!(enhanced.source.contains("        self.play(FadeIn(flowchart), run_time=1.5)\n"));
        assert!(enhanced.source.contains("            steps=[\"Start\", \"End\"],\n"));
    }

    #[test]
    fn test_keeps_helpers_at_module_level() {
        let source = "# ILLUSTRATION: sun\ndef create_sun(radius=1.0):\n    return Circle(radius=radius)\n\nsun = create_sun()\nself.play(FadeIn(sun))\n";
        let enhanced = enhance_script(&Script::new(source), None).unwrap();
        assert!(enhanced.source.contains("\ndef create_sun(radius=1.0):\n    return Circle(radius=radius)\n"));
        assert!(enhanced.source.contains("        sun = create_sun()\n"));
    }

    #[test]
    fn test_three_d_requirement_selects_base() {
        let source = "# REQUIRES: class MyScene(VoiceoverScene, ThreeDScene)\nself.play(Create(axes))\n";
        let enhanced = enhance_script(&Script::new(source), None).unwrap();
        assert!(enhanced.source.contains("class GeneratedScene(ThreeDScene):"));
    }

    #[test]
    fn test_full_script_gets_import() {
        let source = "class Intro(Scene):\n    def construct(self):\n        self.wait()\n";
        let enhanced = enhance_script(&Script::new(source), None).unwrap();
        assert!(!enhanced.wrapped);
        assert_eq!(enhanced.scene_name, "Intro");
        assert!(enhanced.source.starts_with("from manim import *\n\nclass Intro"));

        let err = enhance_script(&Script::new(source), Some("Outro")).unwrap_err();
        assert!(err.contains("Outro"));
    }

    #[test]
    fn test_rejects_scripts_without_scene() {
        assert!(enhance_script(&Script::new("x = 1\n"), None).is_err());
        assert_eq!(enhance_script(&Script::new("  \n"), None).unwrap_err(), "Script is empty");
    }

    #[test]
    fn test_latex_detection() {
        assert!(uses_latex("eq = MathTex(r\"e^{i\\pi}\")"));
        assert!(!uses_latex("label = Text(\"hello\")"));
    }

    #[test]
    fn test_preamble_goes_after_imports() {
        let source = "from manim import *\nimport numpy as np\n\nclass A(Scene):\n    pass\n";
        let out = inject_layout_preamble(source, Some("def fit(m):\n    return m\n")).unwrap();
        let import_pos = out.find("import numpy").unwrap();
        let helper_pos = out.find("def fit(m):").unwrap();
        let class_pos = out.find("class A").unwrap();
        assert!(import_pos < helper_pos && helper_pos < class_pos);

        assert_eq!(inject_layout_preamble(&out, Some("def fit(m):\n    return m\n")).unwrap(), out);
        assert!(inject_layout_preamble(source, Some("    indented()")).is_err());
        assert_eq!(inject_layout_preamble(source, None).unwrap(), source);
    }

    #[test]
    fn test_preamble_skips_multiline_imports() {
        let source = "from manim import (\n    Circle,\n    Scene,\n)\nfrom math import \\\n    pi\n\nclass A(Scene):\n    pass\n";
        let out = inject_layout_preamble(source, Some("def fit(m):\n    return m\n")).unwrap();
        assert!(out.starts_with("from manim import (\n    Circle,\n    Scene,\n)\nfrom math import \\\n    pi\n\ndef fit(m):"));
        assert!(out.find("def fit(m):").unwrap() < out.find("class A").unwrap());
    }

    #[test]
    fn test_import_end_ignores_indented_imports() {
        let lines = ["import numpy as np", "", "def f():", "    import os", "    return os"];
        assert_eq!(end_of_imports(&lines), 1);
        assert_eq!(end_of_imports(&["class A(Scene):", "    pass"]), 0);
    }

    #[test]
    fn test_constant_patterns_compile() {
        LazyLock::force(&SCENE_CLASS);
        LazyLock::force(&FRAMEWORK_IMPORT_LINE);
        LazyLock::force(&LATEX_MOBJECT);
        LazyLock::force(&THREE_D_HINT);
        assert_eq!(find_scene_classes("class Demo(Scene):\n    pass\n"), vec!["Demo"]);
    }
}
