//! # bdiff
//!
//! Decide whether an edit to a source file changed what the program does.
//!
//! Both versions are tokenized, stripped of comments and docstrings, parsed and printed back
//! in a canonical form, then normalized line by line and diffed with zero context. Edits that
//! only touch comments, docstrings, whitespace, quoting or redundant parentheses produce no
//! change records.
//!
//! See [bdiff::pipeline::behavioral_diff] for the entry point.

pub mod bdiff;

pub use bdiff::canonical::{canonicalize, CanonicalError};
pub use bdiff::diffing::{ChangeOp, ChangeRecord, DiffAlgorithm, Side};
pub use bdiff::language::{Language, LanguageRegistry, Python, UnknownLanguage};
pub use bdiff::lexing::{tokenize, LexError, LexErrorKind};
pub use bdiff::parsing::ParseError;
pub use bdiff::pipeline::{behavioral_diff, DiffEngine, DiffError, Verdict};
