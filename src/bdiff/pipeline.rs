//! Behavioral diff pipeline
//!
//! Each side runs through the same stages before the two are compared:
//!
//!     tokenize -> strip -> canonicalize -> normalize
//!
//! and the resulting line sequences go to the zero-context diff. Any failure on either side
//! aborts the whole comparison; a partial diff is never returned.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::bdiff::canonical::CanonicalError;
use crate::bdiff::diffing::{diff_with, ChangeRecord, DiffAlgorithm, Side};
use crate::bdiff::language::{Language, LanguageRegistry, UnknownLanguage};
use crate::bdiff::normalize::normalize_lines;
use crate::bdiff::source::SourceText;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    #[error(transparent)]
    UnknownLanguage(#[from] UnknownLanguage),
    #[error("{side} source: {source}")]
    Canonicalize { side: Side, source: CanonicalError },
}

/// The outcome of comparing two sources.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Verdict {
    pub changes: Vec<ChangeRecord>,
}

impl Verdict {
    /// Whether behavior may have changed
    pub fn changed(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Run one source through the language stages and normalize the canonical text.
pub fn canonical_lines(language: &dyn Language, source: &str) -> Result<Vec<String>, CanonicalError> {
    let source = SourceText::new(source);
    let tokens = language.tokenize(&source)?;
    let stripped = language.strip(&source, &tokens);
    let canonical = language.canonicalize(&stripped)?;
    let lines = normalize_lines(&canonical);
    debug!(
        language = language.name(),
        tokens = tokens.len(),
        lines = lines.len(),
        "prepared source"
    );
    Ok(lines)
}

/// A diff engine bound to a language registry and a diff algorithm.
pub struct DiffEngine {
    registry: LanguageRegistry,
    algorithm: DiffAlgorithm,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::with_registry(LanguageRegistry::with_defaults())
    }

    pub fn with_registry(registry: LanguageRegistry) -> Self {
        Self {
            registry,
            algorithm: DiffAlgorithm::default(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: DiffAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    pub fn algorithm(&self) -> DiffAlgorithm {
        self.algorithm
    }

    /// Compare two sources written in `language` (a registered name or alias).
    pub fn diff(&self, before: &str, after: &str, language: &str) -> Result<Verdict, DiffError> {
        let language = self.registry.get(language)?;
        let old = canonical_lines(language, before).map_err(|source| DiffError::Canonicalize {
            side: Side::Before,
            source,
        })?;
        let new = canonical_lines(language, after).map_err(|source| DiffError::Canonicalize {
            side: Side::After,
            source,
        })?;
        let changes = diff_with(&old, &new, self.algorithm);
        debug!(
            algorithm = %self.algorithm,
            before = old.len(),
            after = new.len(),
            changes = changes.len(),
            "diff complete"
        );
        Ok(Verdict { changes })
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare two sources and report the lines whose canonical form differs.
///
/// An empty result means no behavioral difference was detected.
pub fn behavioral_diff(
    before: &str,
    after: &str,
    language: &str,
) -> Result<Vec<ChangeRecord>, DiffError> {
    DiffEngine::new()
        .diff(before, after, language)
        .map(|verdict| verdict.changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bdiff::language::Python;

    #[test]
    fn test_docstring_only_change() {
        let before = "def f(x):\n    \"\"\"Old docs.\"\"\"\n    return x + 1\n";
        let after = "def f(x):\n    \"\"\"New and longer docs.\n\n    Spanning lines.\n    \"\"\"\n    return x + 1\n";
        assert_eq!(behavioral_diff(before, after, "python"), Ok(vec![]));
    }

    #[test]
    fn test_changed_return() {
        let records = behavioral_diff(
            "def f(x):\n    return x+1\n",
            "def f(x):\n    return x+2\n",
            "python",
        )
        .unwrap();
        assert_eq!(
            records,
            vec![
                ChangeRecord::removed("return x + 1"),
                ChangeRecord::added("return x + 2")
            ]
        );
    }

    #[test]
    fn test_lex_error_is_tagged_with_side() {
        let err = behavioral_diff("x = 1\n", "x = 'open\n", "python").unwrap_err();
        assert!(matches!(
            err,
            DiffError::Canonicalize {
                side: Side::After,
                source: CanonicalError::Lex(_)
            }
        ));
        assert!(err.to_string().starts_with("after source: lex error"));
    }

    #[test]
    fn test_parse_error_before() {
        let err = behavioral_diff("def (:\n", "x = 1\n", "python").unwrap_err();
        assert!(matches!(
            err,
            DiffError::Canonicalize {
                side: Side::Before,
                source: CanonicalError::Parse(_)
            }
        ));
    }

    #[test]
    fn test_unknown_language() {
        assert!(matches!(
            behavioral_diff("", "", "fortran"),
            Err(DiffError::UnknownLanguage(_))
        ));
    }

    #[test]
    fn test_canonical_lines() {
        let lines = canonical_lines(&Python, "x=1 # set\n\n\ny  =  [1,\n  2]\n").unwrap();
        assert_eq!(lines, vec!["x = 1", "y = [1, 2]"]);
    }

    #[test]
    fn test_engine_verdict() {
        let engine = DiffEngine::new().with_algorithm(DiffAlgorithm::Patience);
        assert_eq!(engine.algorithm(), DiffAlgorithm::Patience);
        let same = engine.diff("a = 1\n", "a = (1)\n", "py").unwrap();
        assert!(!same.changed());
        let changed = engine.diff("a = 1\n", "a = 2\n", "py").unwrap();
        assert!(changed.changed());
        assert_eq!(changed.len(), 2);
    }
}
