//! Module header parsing
//!
//! A class module opens with a fixed preamble:
//!
//! ```text
//! VERSION 1.0 CLASS
//! BEGIN
//!   MultiUse = -1  'True
//!   Persistable = 0  'NotPersistable
//!   DataBindingBehavior = 0  'vbNone
//!   DataSourceBehavior  = 0  'vbNone
//!   MTSTransactionMode  = 0  'NotAnMTSObject
//! END
//! Attribute VB_Name = "Class1"
//! Attribute VB_GlobalNameSpace = False
//! Attribute VB_Creatable = True
//! Attribute VB_PredeclaredId = False
//! Attribute VB_Exposed = False
//! ```
//!
//! A plain code module has a single `Attribute VB_Name` line. Both forms are
//! read from physical lines at fixed offsets.

use super::ast::{ClassFlags, Node};
use super::attributes::parse_attribute;
use super::constants::{
    CLASS_ATTRIBUTE_LINES, CLASS_BODY_START, CLASS_FLAG_LINES, CLASS_MARKER, MODULE_BODY_START,
    NAME_ATTRIBUTE,
};
use super::parse::{Header, ParseError, ParseErrorKind, Parser};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static FLAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"=\s*(?P<value>-?\d+)\b").unwrap());

const BYTE_ORDER_MARK: char = '\u{feff}';

impl Parser {
    pub(crate) fn parse_header(&self) -> Result<Header, ParseError> {
        let first = self.header_line(0)?;

        if first == CLASS_MARKER {
            self.parse_class_header()
        } else {
            self.parse_module_header()
        }
    }

    fn parse_class_header(&self) -> Result<Header, ParseError> {
        let mut values = [0i32; 5];
        for (slot, &index) in values.iter_mut().zip(CLASS_FLAG_LINES.iter()) {
            *slot = self.parse_class_flag(index)?;
        }

        let class_flags = ClassFlags {
            multi_use: values[0],
            persistable: values[1],
            data_binding_behavior: values[2],
            data_source_behavior: values[3],
            mts_transaction_mode: values[4],
        };
        debug!(?class_flags, "class header");

        let attributes = CLASS_ATTRIBUTE_LINES
            .iter()
            .map(|&index| self.parse_header_attribute(index))
            .collect::<Result<Vec<_>, _>>()?;

        // class attributes open with the module name
        let name_index = CLASS_ATTRIBUTE_LINES[0];
        if attributes.first().map(|a| a.name.as_str()) != Some(NAME_ATTRIBUTE) {
            let text = self.header_line(name_index)?;
            return Err(self.malformed(name_index, text, "first class attribute must be VB_Name"));
        }

        Ok(Header {
            class_flags: Some(class_flags),
            attributes,
            body_start: CLASS_BODY_START,
        })
    }

    fn parse_module_header(&self) -> Result<Header, ParseError> {
        let attribute = self.parse_header_attribute(0)?;

        Ok(Header {
            class_flags: None,
            attributes: vec![attribute],
            body_start: MODULE_BODY_START,
        })
    }

    fn parse_class_flag(&self, index: usize) -> Result<i32, ParseError> {
        let text = self.header_line(index)?;

        FLAG_RE
            .captures(text)
            .and_then(|caps| caps["value"].parse::<i32>().ok())
            .ok_or_else(|| self.malformed(index, text, "expected `Key = <integer>` class flag"))
    }

    fn parse_header_attribute(&self, index: usize) -> Result<Node, ParseError> {
        let text = self.header_line(index)?;
        parse_attribute(text, index + 1)
            .ok_or_else(|| self.malformed(index, text, "expected an `Attribute` line"))
    }

    /// Trimmed physical line at a 0-based header offset
    fn header_line(&self, index: usize) -> Result<&str, ParseError> {
        match self.source.get(index) {
            Some(line) => Ok(line.trim_start_matches(BYTE_ORDER_MARK).trim()),
            None => Err(self.malformed(index, "", "unexpected end of input in header")),
        }
    }

    fn malformed(&self, index: usize, text: &str, reason: &str) -> ParseError {
        self.error(
            ParseErrorKind::MalformedHeader {
                text: text.to_string(),
                reason: reason.to_string(),
            },
            index + 1,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::NodeKind;

    fn class_header(flag_line: &str) -> Vec<String> {
        vec![
            "VERSION 1.0 CLASS".to_string(),
            "BEGIN".to_string(),
            flag_line.to_string(),
            "  Persistable = 0  'NotPersistable".to_string(),
            "  DataBindingBehavior = 1  'vbSimpleBound".to_string(),
            "  DataSourceBehavior  = 0  'vbNone".to_string(),
            "  MTSTransactionMode  = 2  'NoTransactions".to_string(),
            "END".to_string(),
            "Attribute VB_Name = \"Widget\"".to_string(),
            "Attribute VB_GlobalNameSpace = False".to_string(),
            "Attribute VB_Creatable = True".to_string(),
            "Attribute VB_PredeclaredId = False".to_string(),
            "Attribute VB_Exposed = True".to_string(),
        ]
    }

    #[test]
    fn test_class_header_flags_keep_sign() {
        let parser = Parser::new(class_header("  MultiUse = -1  'True"));
        let header = parser.parse_header().unwrap();

        let flags = header.class_flags.unwrap();
        assert_eq!(flags.multi_use, -1);
        assert_eq!(flags.persistable, 0);
        assert_eq!(flags.data_binding_behavior, 1);
        assert_eq!(flags.mts_transaction_mode, 2);
        assert_eq!(header.body_start, CLASS_BODY_START);
    }

    #[test]
    fn test_class_header_attributes_in_order() {
        let parser = Parser::new(class_header("  MultiUse = -1  'True"));
        let header = parser.parse_header().unwrap();

        assert_eq!(header.attributes.len(), 5);
        assert!(header.attributes.iter().all(|a| a.is(NodeKind::Attribute)));
        assert_eq!(header.attributes[0].value(), Some("Widget"));
        assert_eq!(header.attributes[0].line, 9);
        assert_eq!(header.attributes[4].name, "VB_Exposed");
    }

    #[test]
    fn test_bad_class_flag_is_malformed() {
        let parser = Parser::new(class_header("  MultiUse = True"));
        let err = parser.parse_header().unwrap_err();

        assert_eq!(err.line, 3);
        assert!(matches!(err.kind, ParseErrorKind::MalformedHeader { .. }));
    }

    #[test]
    fn test_class_name_attribute_must_come_first() {
        let mut lines = class_header("  MultiUse = -1  'True");
        lines.swap(8, 9);
        let err = Parser::new(lines).parse_header().unwrap_err();

        assert_eq!(err.line, 9);
        assert!(matches!(
            &err.kind,
            ParseErrorKind::MalformedHeader { text, .. } if text.starts_with("Attribute VB_GlobalNameSpace")
        ));
    }

    #[test]
    fn test_truncated_class_header() {
        let mut lines = class_header("  MultiUse = -1  'True");
        lines.truncate(10);
        let err = Parser::new(lines).parse_header().unwrap_err();

        assert_eq!(err.line, 11);
        assert!(matches!(
            &err.kind,
            ParseErrorKind::MalformedHeader { text, .. } if text.is_empty()
        ));
    }

    #[test]
    fn test_module_header() {
        let parser = Parser::new(["\u{feff}Attribute VB_Name = \"Helpers\"", "Option Explicit"]);
        let header = parser.parse_header().unwrap();

        assert!(header.class_flags.is_none());
        assert_eq!(header.attributes.len(), 1);
        assert_eq!(header.attributes[0].value(), Some("Helpers"));
        assert_eq!(header.body_start, MODULE_BODY_START);
    }

    #[test]
    fn test_module_without_attribute_is_malformed() {
        let err = Parser::new(["Option Explicit"]).parse_header().unwrap_err();
        assert_eq!(err.line, 1);
        assert!(matches!(
            &err.kind,
            ParseErrorKind::MalformedHeader { text, .. } if text == "Option Explicit"
        ));
    }

    #[test]
    fn test_empty_source_is_malformed() {
        let lines: Vec<String> = Vec::new();
        let err = Parser::new(lines).parse_header().unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::MalformedHeader { .. }));
    }
}
