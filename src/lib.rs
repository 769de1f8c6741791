//! # Introduction
//!
//! vbtree reads Visual Basic 6 class and code modules and builds a syntax
//! tree of their structure: header attributes, module-level declarations,
//! and members with their parameters and bodies.
//!
//! ## Pipeline
//!
//! ```text
//! Lines → Logical lines → Header → Declarations → Members → Node tree
//! ```
//!
//! 1. [`parser::lexer`] joins ` _` continuations and splits instructions on
//!    `:`; [`parser::Tokenizer`] classifies each instruction into a
//!    [`parser::Token`].
//! 2. [`parser::Parser`] reads the fixed-format header, then the
//!    declaration section, then each member until end of input.
//! 3. The resulting [`parser::Node`] tree can be walked, queried for
//!    attributes, renamed, or serialized to JSON.
//!
//! ```no_run
//! use vbtree::parser::{parse_lines, ParseOptions};
//!
//! let source = std::fs::read_to_string("Account.cls").unwrap();
//! let lines: Vec<&str> = source.lines().collect();
//! let module = parse_lines(&lines, ParseOptions::new().with_file_name("Account.cls")).unwrap();
//! println!("{}", module.name);
//! ```

pub mod parser;
pub mod tracing_config;
