//! Strip chat formatting from model output so only Python remains.

use std::sync::LazyLock;

use regex::Regex;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:python|py)?[ \t]*\n?").expect("valid regex"));

/// Import line every generated scene starts with.
const MANIM_IMPORT: &str = "from manim import *";

/// Remove markdown code fences and any prose before the Manim import.
pub fn clean_manim_code(raw: &str) -> String {
    let cleaned = FENCE_RE.replace_all(raw, "");
    let cleaned = cleaned.trim();

    if !cleaned.starts_with("from manim") {
        if let Some(start) = cleaned.find(MANIM_IMPORT) {
            return cleaned[start..].trim_end().to_string();
        }
    }
    cleaned.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_removed() {
        let raw = "```python\nfrom manim import *\n\nclass A(Scene):\n    pass\n```\n";
        assert_eq!(
            clean_manim_code(raw),
            "from manim import *\n\nclass A(Scene):\n    pass"
        );
    }

    #[test]
    fn leading_prose_is_dropped() {
        let raw = "Here is your animation:\nfrom manim import *\nclass A(Scene): pass";
        assert_eq!(clean_manim_code(raw), "from manim import *\nclass A(Scene): pass");
    }

    #[test]
    fn code_without_import_is_kept() {
        assert_eq!(clean_manim_code("  class A(Scene): pass  "), "class A(Scene): pass");
    }
}
