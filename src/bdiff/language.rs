//! Language registry
//!
//! A [Language] bundles the three language-specific stages of the pipeline: tokenizing,
//! lexical stripping and canonicalization. Normalization and diffing are language-neutral.
//! Languages are registered by name and looked up by name, alias or file extension.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::bdiff::canonical::{self, CanonicalError};
use crate::bdiff::lexing::{self, LexError};
use crate::bdiff::source::SourceText;
use crate::bdiff::stripping;
use crate::bdiff::token::Token;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown language '{0}'")]
pub struct UnknownLanguage(pub String);

/// The language-specific half of a behavioral diff.
pub trait Language: Send + Sync {
    /// Registry key, lowercase
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Other identifiers accepted for this language
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// File extensions without the leading dot
    fn extensions(&self) -> &[&str];

    fn tokenize(&self, source: &SourceText) -> Result<Vec<Token>, LexError>;

    /// Drop comments and documentation tokens, keeping every other token at its column.
    fn strip(&self, source: &SourceText, tokens: &[Token]) -> String;

    fn canonicalize(&self, source: &str) -> Result<String, CanonicalError>;
}

/// Python 3.
pub struct Python;

impl Language for Python {
    fn name(&self) -> &str {
        "python"
    }

    fn description(&self) -> &str {
        "Python 3 source"
    }

    fn aliases(&self) -> &[&str] {
        &["py", "python3"]
    }

    fn extensions(&self) -> &[&str] {
        &["py", "pyw", "pyi"]
    }

    fn tokenize(&self, source: &SourceText) -> Result<Vec<Token>, LexError> {
        lexing::tokenize_source(source)
    }

    fn strip(&self, source: &SourceText, tokens: &[Token]) -> String {
        stripping::strip(source, tokens)
    }

    fn canonicalize(&self, source: &str) -> Result<String, CanonicalError> {
        canonical::canonicalize(source)
    }
}

/// Registry of supported languages.
pub struct LanguageRegistry {
    languages: HashMap<String, Box<dyn Language>>,
}

impl LanguageRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        LanguageRegistry {
            languages: HashMap::new(),
        }
    }

    /// Register a language, replacing any language of the same name.
    pub fn register<L: Language + 'static>(&mut self, language: L) {
        self.languages
            .insert(language.name().to_string(), Box::new(language));
    }

    /// Look a language up by name or alias, ignoring case.
    pub fn get(&self, identifier: &str) -> Result<&dyn Language, UnknownLanguage> {
        let wanted = identifier.to_ascii_lowercase();
        self.languages
            .get(&wanted)
            .or_else(|| {
                self.languages
                    .values()
                    .find(|language| language.aliases().contains(&wanted.as_str()))
            })
            .map(|language| language.as_ref())
            .ok_or_else(|| UnknownLanguage(identifier.to_string()))
    }

    /// Find the language whose extensions include `extension` (with or without the dot).
    pub fn for_extension(&self, extension: &str) -> Option<&dyn Language> {
        let wanted = extension.trim_start_matches('.').to_ascii_lowercase();
        self.languages
            .values()
            .find(|language| language.extensions().contains(&wanted.as_str()))
            .map(|language| language.as_ref())
    }

    /// Infer the language of a file from its extension.
    pub fn for_path(&self, path: &Path) -> Option<&dyn Language> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.for_extension(ext))
    }

    pub fn has(&self, identifier: &str) -> bool {
        self.get(identifier).is_ok()
    }

    /// Registered language names, sorted
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<_> = self.languages.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Python);
        registry
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
