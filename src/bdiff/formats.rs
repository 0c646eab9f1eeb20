//! Output formats for syntax trees
//!
//! Currently a single format: [unparse], the canonical Python source printer.

pub mod unparse;

pub use unparse::unparse;
