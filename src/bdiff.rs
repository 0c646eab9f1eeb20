//! Behavioral diff for source code
//!
//! Modules, leaves first:
//!
//!     source, token        text positions and the token model
//!     lexing, literals     logos tokenizer, indentation pass, string literal handling
//!     stripping            comment and docstring removal at the token level
//!     ast, parsing         syntax tree and the chumsky grammar that builds it
//!     formats, canonical   canonical printer and the docstring-free round trip
//!     normalize, diffing   line normalization and the zero-context diff
//!     language, pipeline   language registry and the end-to-end comparison
//!     config               layered configuration for the command line tool

pub mod ast;
pub mod canonical;
pub mod config;
pub mod diffing;
pub mod formats;
pub mod language;
pub mod lexing;
pub mod literals;
pub mod normalize;
pub mod parsing;
pub mod pipeline;
pub mod source;
pub mod stripping;
pub mod token;
