//! Static classification of guard condition scripts.
//!
//! The classifier is deliberately conservative: anything it cannot prove
//! is reported as [`GuardClass::Indeterminate`].

use std::collections::HashSet;

/// What a guard is statically known to evaluate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardClass {
    AlwaysTrue,
    AlwaysFalse,
    Indeterminate,
}

/// Classifies guard scripts. An absent guard never reaches the classifier;
/// it is treated as `AlwaysTrue` by the caller.
pub trait GuardClassifier {
    fn classify(&self, script: &str) -> GuardClass;
}

impl<F> GuardClassifier for F
where
    F: Fn(&str) -> GuardClass,
{
    fn classify(&self, script: &str) -> GuardClass {
        self(script)
    }
}

/// Constant-expression classifier with optional known script names.
///
/// Recognises blank scripts, `1`/`0`, `TRUE`/`FALSE`, integer comparisons
/// with `==`/`!=`, a leading `!`, redundant parentheses and a trailing `;`.
/// Script names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct StaticClassifier {
    always_true: HashSet<String>,
    always_false: HashSet<String>,
}

impl StaticClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scripts<T, F>(always_true: T, always_false: F) -> Self
    where
        T: IntoIterator,
        T::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: AsRef<str>,
    {
        Self {
            always_true: always_true
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            always_false: always_false
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

impl GuardClassifier for StaticClassifier {
    fn classify(&self, script: &str) -> GuardClass {
        let expr = script.trim().trim_end_matches(';').trim();
        if expr.is_empty() {
            return GuardClass::AlwaysTrue;
        }
        let name = expr.to_ascii_lowercase();
        if self.always_true.contains(&name) {
            return GuardClass::AlwaysTrue;
        }
        if self.always_false.contains(&name) {
            return GuardClass::AlwaysFalse;
        }
        match eval_constant(expr) {
            Some(true) => GuardClass::AlwaysTrue,
            Some(false) => GuardClass::AlwaysFalse,
            None => GuardClass::Indeterminate,
        }
    }
}

fn eval_constant(expr: &str) -> Option<bool> {
    let expr = strip_parens(expr.trim());
    if expr.is_empty() {
        return None;
    }
    if let Some((lhs, rhs)) = expr.split_once("==") {
        return Some(literal(lhs)? == literal(rhs)?);
    }
    if let Some((lhs, rhs)) = expr.split_once("!=") {
        return Some(literal(lhs)? != literal(rhs)?);
    }
    if let Some(rest) = expr.strip_prefix('!') {
        return eval_constant(rest).map(|v| !v);
    }
    literal(expr).map(|v| v != 0)
}

fn literal(token: &str) -> Option<i64> {
    let token = strip_parens(token.trim());
    match token {
        "TRUE" | "true" => Some(1),
        "FALSE" | "false" => Some(0),
        _ => token.parse::<i64>().ok(),
    }
}

/// Remove parentheses that wrap the whole expression.
fn strip_parens(mut expr: &str) -> &str {
    while expr.starts_with('(') && expr.ends_with(')') && wraps_whole(expr) {
        expr = expr[1..expr.len() - 1].trim();
    }
    expr
}

fn wraps_whole(expr: &str) -> bool {
    let mut depth = 0i32;
    let last = expr.len() - 1;
    for (idx, ch) in expr.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && idx != last {
                    return false;
                }
            }
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(script: &str) -> GuardClass {
        StaticClassifier::new().classify(script)
    }

    #[test]
    fn blank_is_always_true() {
        assert_eq!(classify(""), GuardClass::AlwaysTrue);
        assert_eq!(classify("   ;"), GuardClass::AlwaysTrue);
    }

    #[test]
    fn literals() {
        assert_eq!(classify("1"), GuardClass::AlwaysTrue);
        assert_eq!(classify("TRUE"), GuardClass::AlwaysTrue);
        assert_eq!(classify("0"), GuardClass::AlwaysFalse);
        assert_eq!(classify("FALSE;"), GuardClass::AlwaysFalse);
    }

    #[test]
    fn constant_comparisons() {
        assert_eq!(classify("1==2"), GuardClass::AlwaysFalse);
        assert_eq!(classify("(2 == 2)"), GuardClass::AlwaysTrue);
        assert_eq!(classify("1 != 2"), GuardClass::AlwaysTrue);
        assert_eq!(classify("!TRUE"), GuardClass::AlwaysFalse);
        assert_eq!(classify("!(0)"), GuardClass::AlwaysTrue);
    }

    #[test]
    fn calls_and_malformed_are_indeterminate() {
        assert_eq!(classify("IsQuestComplete()"), GuardClass::Indeterminate);
        assert_eq!(classify("gc_has_item"), GuardClass::Indeterminate);
        assert_eq!(classify("1 =="), GuardClass::Indeterminate);
        assert_eq!(classify("(1"), GuardClass::Indeterminate);
        assert_eq!(classify("(1) + (2)"), GuardClass::Indeterminate);
        assert_eq!(classify("!1 == 1"), GuardClass::Indeterminate);
    }

    #[test]
    fn known_script_names() {
        let c = StaticClassifier::with_scripts(["gc_true"], ["GC_Never"]);
        assert_eq!(c.classify("GC_TRUE"), GuardClass::AlwaysTrue);
        assert_eq!(c.classify("gc_never"), GuardClass::AlwaysFalse);
        assert_eq!(c.classify("gc_other"), GuardClass::Indeterminate);
    }

    #[test]
    fn closures_are_classifiers() {
        let always_false = |_: &str| GuardClass::AlwaysFalse;
        assert_eq!(always_false.classify("x"), GuardClass::AlwaysFalse);
    }
}
