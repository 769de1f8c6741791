//! VB6 module parser
//!
//! This module turns the lines of a class (`.cls`) or code (`.bas`) module
//! into a syntax tree:
//! - [`lexer`]: continuation joining, instruction splitting, tokens
//! - [`classifier`]: ordered matcher table deciding each token kind
//! - [`parse`]: the [`Parser`] and its error types
//! - [`ast`]: tree node definitions
//!
//! # Supported Constructs
//!
//! - Class header flags and attributes, or a plain module's `VB_Name`
//! - Declarations: `Dim`/`Public`/`Private`/`Const`, `WithEvents`, `New`,
//!   `Type` and `Enum` blocks, `Declare`, `Implements`
//! - Property procedures, subs and functions with typed parameters
//! - Procedure bodies as line blocks; `If` and `For` regions are nested
//!
//! Expressions inside bodies are kept as raw text.

pub mod ast;
pub mod attributes;
pub mod classifier;
pub mod constants;
mod declarations;
mod header;
pub mod lexer;
mod members;
pub mod parameters;
pub mod parse;

pub use ast::{Node, NodeKind, NodePayload};
pub use declarations::parse_integer_literal;
pub use lexer::{Token, Tokenizer};
pub use members::is_member_signature;
pub use parse::{parse_lines, CancellationToken, ParseError, ParseErrorKind, ParseOptions, Parser};
