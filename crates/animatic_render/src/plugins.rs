//! Optional renderer plugins and their import signatures.

use regex::Regex;
use std::sync::LazyLock;

/// A pip-installable renderer plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginSpec {
    /// Short name used in logs and the install cache
    pub name: &'static str,
    /// Package installed with pip
    pub package: &'static str,
    /// Module imported to validate the install
    pub module: &'static str,
    /// Source patterns that indicate the plugin is used
    pub signatures: &'static [&'static str],
}

/// Known plugins.
pub const PLUGINS: &[PluginSpec] = &[
    PluginSpec {
        name: "physics",
        package: "manim-physics",
        module: "manim_physics",
        signatures: &[
            r"\bmanim_physics\b",
            r"\b(SpaceScene|ElectricField|MagneticField|MultiPendulum|Pendulum|Charge|Wire)\s*\(",
        ],
    },
    PluginSpec {
        name: "chemistry",
        package: "manim-chemistry",
        module: "manim_chemistry",
        signatures: &[
            r"\bmanim_chemistry\b",
            r"\b(ChemWithName|MMoleculeObject|GraphMolecule|PeriodicTable|BohrAtom)\s*\(",
        ],
    },
    PluginSpec {
        name: "voiceover",
        package: "manim-voiceover",
        module: "manim_voiceover",
        signatures: &[r"\bmanim_voiceover\b", r"\bVoiceoverScene\b"],
    },
    PluginSpec {
        name: "slides",
        package: "manim-slides",
        module: "manim_slides",
        signatures: &[r"\bmanim_slides\b", r"\((\s*ThreeD)?Slide\s*\)"],
    },
    PluginSpec {
        name: "ml",
        package: "manim-ml",
        module: "manim_ml",
        signatures: &[
            r"\bmanim_ml\b",
            r"\b(NeuralNetwork|FeedForwardLayer|Convolutional2DLayer)\s*\(",
        ],
    },
];

static COMPILED: LazyLock<Vec<(&'static PluginSpec, Vec<Regex>)>> = LazyLock::new(|| {
    PLUGINS
        .iter()
        .map(|spec| {
            let patterns = spec
                .signatures
                .iter()
                .filter_map(|sig| Regex::new(sig).ok())
                .collect();
            (spec, patterns)
        })
        .collect()
});

/// Plugins whose signatures appear in `source`, in registry order.
pub fn detect_plugins(source: &str) -> Vec<&'static PluginSpec> {
    COMPILED
        .iter()
        .filter(|(_, patterns)| patterns.iter().any(|re| re.is_match(source)))
        .map(|(spec, _)| *spec)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_signatures_compile() {
        assert_eq!(COMPILED.len(), PLUGINS.len());
        for (spec, patterns) in COMPILED.iter() {
            assert_eq!(patterns.len(), spec.signatures.len(), "{}", spec.name);
        }
    }

    #[test]
    fn test_detects_by_import_and_usage() {
        let source = "from manim_physics import *\nclass S(SpaceScene):\n    pass\n";
        let names: Vec<_> = detect_plugins(source).iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["physics"]);

        let source = "class S(VoiceoverScene):\n    def construct(self):\n        nn = NeuralNetwork([])\n";
        let names: Vec<_> = detect_plugins(source).iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["voiceover", "ml"]);
    }

    #[test]
    fn test_plain_scene_needs_no_plugins() {
        assert!(detect_plugins("class S(Scene):\n    def construct(self):\n        self.play(Create(Circle()))\n").is_empty());
    }
}
