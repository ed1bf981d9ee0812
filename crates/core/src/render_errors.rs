//! Presentation-only classification of raw render error text.
//!
//! Rules are evaluated in order; the first rule whose patterns all match
//! wins. The result is attached to status responses for display and is
//! never written back to the job.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Category of a render failure as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    MissingParentheses,
    LatexMissing,
    MissingDependency,
    SyntaxError,
    TypeError,
    RenderError,
}

/// A friendlier explanation of a render failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorHint {
    pub category: ErrorCategory,
    pub title: String,
    pub message: String,
}

struct Rule {
    category: ErrorCategory,
    title: &'static str,
    message: &'static str,
    /// Every pattern must match for the rule to apply.
    all_of: Vec<Regex>,
}

/// `(category, title, message, patterns)` in priority order.
const RULE_TABLE: &[(ErrorCategory, &str, &str, &[&str])] = &[
    (
        ErrorCategory::MissingParentheses,
        "Missing Parentheses Error",
        "The code is missing parentheses () after a method call like .get_center(). \
         This is a common syntax error.",
        &[r"unsupported operand type\(s\) for -: 'method' and 'float'|\.get_(center|top|bottom|left|right)"],
    ),
    (
        ErrorCategory::LatexMissing,
        "LaTeX Not Installed",
        "MathTex requires LaTeX to be installed. Try using Text() for simple labels instead.",
        &[r"FileNotFoundError", r"latex|Tex"],
    ),
    (
        ErrorCategory::MissingDependency,
        "Missing Dependency",
        "A required module is not installed. The code may be trying to import something \
         that's not available.",
        &[r"ModuleNotFoundError|ImportError"],
    ),
    (
        ErrorCategory::SyntaxError,
        "Python Syntax Error",
        "The generated code has a syntax error. Try regenerating the animation with a \
         clearer prompt.",
        &[r"SyntaxError"],
    ),
    (
        ErrorCategory::TypeError,
        "Type Error",
        "The code is trying to use incompatible data types. This often happens with \
         incorrect method calls.",
        &[r"TypeError"],
    ),
];

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    RULE_TABLE
        .iter()
        .map(|(category, title, message, patterns)| Rule {
            category: *category,
            title: *title,
            message: *message,
            all_of: patterns
                .iter()
                .map(|p| Regex::new(p).expect("valid regex"))
                .collect(),
        })
        .collect()
});

const FALLBACK_TITLE: &str = "Rendering Error";
const FALLBACK_MESSAGE: &str =
    "The animation failed to render. Try regenerating with a simpler or clearer prompt.";

/// Classify raw error text. Falls back to [`ErrorCategory::RenderError`].
pub fn classify(error: &str) -> ErrorHint {
    RULES
        .iter()
        .find(|rule| rule.all_of.iter().all(|re| re.is_match(error)))
        .map(|rule| ErrorHint {
            category: rule.category,
            title: rule.title.to_string(),
            message: rule.message.to_string(),
        })
        .unwrap_or_else(|| ErrorHint {
            category: ErrorCategory::RenderError,
            title: FALLBACK_TITLE.to_string(),
            message: FALLBACK_MESSAGE.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_without_call_is_missing_parentheses() {
        let hint = classify("TypeError: unsupported operand type(s) for -: 'method' and 'float'");
        assert_eq!(hint.category, ErrorCategory::MissingParentheses);

        let hint = classify("AttributeError near circle.get_center + UP");
        assert_eq!(hint.category, ErrorCategory::MissingParentheses);
    }

    #[test]
    fn latex_needs_both_patterns() {
        let hint = classify("FileNotFoundError: [Errno 2] No such file: 'latex'");
        assert_eq!(hint.category, ErrorCategory::LatexMissing);

        let hint = classify("FileNotFoundError: scene.mp4");
        assert_eq!(hint.category, ErrorCategory::RenderError);
    }

    #[test]
    fn import_errors_are_missing_dependency() {
        assert_eq!(
            classify("ModuleNotFoundError: No module named 'numpyy'").category,
            ErrorCategory::MissingDependency
        );
        assert_eq!(
            classify("ImportError: cannot import name 'Foo'").category,
            ErrorCategory::MissingDependency
        );
    }

    #[test]
    fn earlier_rules_take_priority() {
        // Mentions both SyntaxError and TypeError: SyntaxError is listed first.
        let hint = classify("SyntaxError: invalid syntax (raised while handling TypeError)");
        assert_eq!(hint.category, ErrorCategory::SyntaxError);
        assert_eq!(classify("TypeError: bad").category, ErrorCategory::TypeError);
    }

    #[test]
    fn unknown_text_falls_back() {
        let hint = classify("Segmentation fault");
        assert_eq!(hint.category, ErrorCategory::RenderError);
        assert_eq!(hint.title, FALLBACK_TITLE);
    }
}
