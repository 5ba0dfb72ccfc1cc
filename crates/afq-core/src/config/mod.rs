//! Configuration document parsing, validation and resolution.

pub mod parser;
pub mod resolve;
pub mod validator;

pub use resolve::{resolve, resolve_document, ResolvedConfig};
