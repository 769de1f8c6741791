//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, options, helper methods, and the main parse entry
//! point.
//!
//! # Parser Architecture
//!
//! A module is parsed in three sections, each advancing the same cursor:
//! - `header`: class preamble or the single `VB_Name` line of a plain module
//! - `declarations`: variables, constants, `Type`, `Enum`, `Implements`
//! - `members`: property, sub and function signatures with their bodies
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state. The header is read from
//! the physical lines at fixed offsets; everything after it is read from
//! logical lines (continuations joined).

use crate::parser::ast::*;
use crate::parser::constants::{NAME_ATTRIBUTE, UNNAMED_INPUT};
use crate::parser::lexer::{normalize_lines, LogicalLine};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Fatal conditions that abort the parse of a file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("malformed header: {reason} (found `{text}`)")]
    MalformedHeader { text: String, reason: String },

    #[error("expected `{expected_terminator}` to close the block opened at line {opened_at_line}")]
    UnterminatedBlock {
        expected_terminator: String,
        opened_at_line: usize,
    },

    #[error("module has no VB_Name attribute")]
    MissingModuleName,

    #[error("parse cancelled")]
    Cancelled,
}

/// Parser error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{file}:{line}: {kind}")]
pub struct ParseError {
    pub file: String,
    /// 1-based physical line
    pub line: usize,
    pub kind: ParseErrorKind,
}

/// Shared flag a caller can set to stop a parse in progress
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-parse configuration
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Reported in errors and stored on the module node
    pub file_name: String,
    pub cancellation: Option<CancellationToken>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Result of reading the fixed-format preamble
#[derive(Debug)]
pub(crate) struct Header {
    pub class_flags: Option<ClassFlags>,
    pub attributes: Vec<Node>,
    /// Index of the first physical line after the header
    pub body_start: usize,
}

/// Line-oriented parser for one VB6 module
pub struct Parser {
    pub(crate) source: Vec<String>,
    pub(crate) lines: Vec<LogicalLine>,
    pub(crate) position: usize,
    pub(crate) options: ParseOptions,
    /// Enclosing `For` regions still to be closed by the last `Next` list
    pub(crate) pending_next: usize,
}

impl Parser {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_options(lines, ParseOptions::default())
    }

    pub fn with_options<I, S>(lines: I, options: ParseOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: lines.into_iter().map(Into::into).collect(),
            lines: Vec::new(),
            position: 0,
            options,
            pending_next: 0,
        }
    }

    /// Parse the whole module into its root node
    pub fn parse_module(&mut self) -> Result<Node, ParseError> {
        let file = self.options.file_name.clone();
        debug!(file = %file, lines = self.source.len(), "parsing module");

        let header = self.parse_header()?;

        let body_start = header.body_start.min(self.source.len());
        self.lines = normalize_lines(&self.source[body_start..], body_start + 1);
        self.position = 0;

        let declarations = self.parse_declarations()?;
        let members = self.parse_members()?;

        let name = header
            .attributes
            .iter()
            .find(|a| a.name == NAME_ATTRIBUTE)
            .and_then(Node::value)
            .map(str::to_string)
            .ok_or_else(|| self.error(ParseErrorKind::MissingModuleName, 1))?;

        debug!(
            module = %name,
            declarations = declarations.len(),
            members = members.len(),
            "module parsed"
        );

        let mut module = Node::new(
            NodePayload::Module {
                file_name: file,
                class_flags: header.class_flags,
            },
            name,
            1,
        );
        module.children.extend(header.attributes);
        module.children.extend(declarations);
        module.children.extend(members);

        Ok(module)
    }

    // ===== Helper methods =====

    pub(crate) fn is_at_end(&self) -> bool {
        self.position >= self.lines.len()
    }

    pub(crate) fn peek(&self) -> Option<&LogicalLine> {
        self.lines.get(self.position)
    }

    /// Take the current logical line and move past it
    pub(crate) fn next_line(&mut self) -> Option<LogicalLine> {
        let line = self.lines.get(self.position).cloned();
        if line.is_some() {
            self.position += 1;
        }
        line
    }

    pub(crate) fn error(&self, kind: ParseErrorKind, line: usize) -> ParseError {
        let file = match self.options.file_name.as_str() {
            "" => UNNAMED_INPUT.to_string(),
            name => name.to_string(),
        };
        ParseError {
            file,
            line,
            kind,
        }
    }

    pub(crate) fn unterminated(&self, terminator: &str, opened_at_line: usize) -> ParseError {
        self.error(
            ParseErrorKind::UnterminatedBlock {
                expected_terminator: terminator.to_string(),
                opened_at_line,
            },
            opened_at_line,
        )
    }

    /// Next line of a block that must be closed by `terminator`
    pub(crate) fn expect_block_line(
        &mut self,
        terminator: &str,
        opened_at_line: usize,
    ) -> Result<LogicalLine, ParseError> {
        let line = self
            .next_line()
            .ok_or_else(|| self.unterminated(terminator, opened_at_line))?;
        self.check_cancelled(line.line)?;
        Ok(line)
    }

    pub(crate) fn check_cancelled(&self, line: usize) -> Result<(), ParseError> {
        match &self.options.cancellation {
            Some(token) if token.is_cancelled() => Err(self.error(ParseErrorKind::Cancelled, line)),
            _ => Ok(()),
        }
    }
}

/// Parse a module from its physical lines
pub fn parse_lines<S: AsRef<str>>(lines: &[S], options: ParseOptions) -> Result<Node, ParseError> {
    let mut parser = Parser::with_options(lines.iter().map(|l| l.as_ref().to_string()), options);
    parser.parse_module()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASS_SOURCE: &str = r#"VERSION 1.0 CLASS
BEGIN
  MultiUse = -1  'True
  Persistable = 0  'NotPersistable
  DataBindingBehavior = 0  'vbNone
  DataSourceBehavior  = 0  'vbNone
  MTSTransactionMode  = 0  'NotAnMTSObject
END
Attribute VB_Name = "Account"
Attribute VB_GlobalNameSpace = False
Attribute VB_Creatable = True
Attribute VB_PredeclaredId = False
Attribute VB_Exposed = False
Option Explicit

Private mBalance As Currency

Public Property Get Balance() As Currency
    Balance = mBalance
End Property

Public Sub Deposit(ByVal amount As Currency)
    mBalance = mBalance + amount
End Sub
"#;

    #[test]
    fn test_parse_class_module() {
        let mut parser = Parser::new(CLASS_SOURCE.lines());
        let module = parser.parse_module().unwrap();

        assert_eq!(module.kind(), NodeKind::Module);
        assert_eq!(module.name, "Account");
        assert!(module.is_class_module());
        assert_eq!(module.class_flags().unwrap().multi_use, -1);

        let attributes: Vec<&str> = module.children[..5].iter().map(|n| n.name.as_str()).collect();
        assert_eq!(
            attributes,
            vec![
                "VB_Name",
                "VB_GlobalNameSpace",
                "VB_Creatable",
                "VB_PredeclaredId",
                "VB_Exposed"
            ]
        );

        assert_eq!(module.children_of_kind(NodeKind::Declaration).count(), 1);
        assert_eq!(module.children_of_kind(NodeKind::Property).count(), 1);
        assert_eq!(module.children_of_kind(NodeKind::Method).count(), 1);
    }

    #[test]
    fn test_parse_plain_module() {
        let source = ["Attribute VB_Name = \"Utils\"", "Public Const PI As Double = 3.14159"];
        let module = parse_lines(&source, ParseOptions::new().with_file_name("Utils.bas")).unwrap();

        assert_eq!(module.name, "Utils");
        assert!(!module.is_class_module());
        assert!(matches!(
            &module.payload,
            NodePayload::Module { file_name, .. } if file_name == "Utils.bas"
        ));
        assert_eq!(module.children.len(), 2);
    }

    #[test]
    fn test_missing_module_name() {
        let source = ["Attribute VB_Description = \"no name\""];
        let err = parse_lines(&source, ParseOptions::new()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingModuleName);
        assert_eq!(err.file, UNNAMED_INPUT);
        assert_eq!(err.to_string(), "<input>:1: module has no VB_Name attribute");
    }

    #[test]
    fn test_cancelled_parse() {
        let token = CancellationToken::new();
        token.cancel();
        let options = ParseOptions::new()
            .with_file_name("Account.cls")
            .with_cancellation(token);

        let err = parse_lines(&CLASS_SOURCE.lines().collect::<Vec<_>>(), options).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Cancelled);
        assert_eq!(err.file, "Account.cls");
    }

    #[test]
    fn test_error_display() {
        let err = ParseError {
            file: "Foo.cls".to_string(),
            line: 14,
            kind: ParseErrorKind::UnterminatedBlock {
                expected_terminator: "End Sub".to_string(),
                opened_at_line: 14,
            },
        };
        assert_eq!(
            err.to_string(),
            "Foo.cls:14: expected `End Sub` to close the block opened at line 14"
        );
    }
}
