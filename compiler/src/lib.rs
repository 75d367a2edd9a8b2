//! ktv-compiler
//!
//! This crate implements:
//!  1) A line-oriented parser for KTV model schemas,
//!  2) A schema verifier (reserved names, duplicate models, count limits),
//!  3) `encode_binary_schema` / `decode_binary_schema` for the descriptor format,
//!  4) Error types (`KtvError`).
//!
//! ```
//! let compiled = ktv_compiler::compile_schema("#Point\nx int2\ny int2").unwrap();
//! assert_eq!(compiled.bytes[..7], [1, 5, b'P', b'o', b'i', b'n', b't']);
//! ```

pub mod error;
pub mod types;
pub mod utils;
pub mod parser;
pub mod verifier;
pub mod compiler;

pub use compiler::compile_lines;
pub use compiler::compile_schema;
pub use compiler::decode_binary_schema;
pub use compiler::encode_binary_schema;
pub use compiler::Compiled;
pub use error::KtvError;
