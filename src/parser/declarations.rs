//! Declaration section parsing
//!
//! Everything between the header and the first member signature:
//!
//! ```text
//! Implements IWidget
//! Private Const MAX_ITEMS As Long = 100
//! Private WithEvents mConn As ADODB.Connection, mCount As Long
//! Private Declare Function GetTickCount Lib "kernel32" () As Long
//! Public Type Point
//!     X As Long
//!     Y As Long
//! End Type
//! Public Enum Color
//!     Red
//!     Green = 5
//! End Enum
//! ```
//!
//! `Option` statements, `#If` directives and other lines that declare
//! nothing are skipped.

use super::ast::{AccessModifier, DeclarationKeyword, ExternalProcedure, MethodKind, Node, NodePayload};
use super::lexer::{code_text, split_comment, split_instructions, split_top_level, starts_with_rem};
use super::members::is_member_signature;
use super::parameters::parse_parameters;
use super::parse::{ParseError, Parser};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

static IMPLEMENTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Implements\s+(?P<interface>[A-Za-z][_A-Za-z0-9]*)$").unwrap());

static DECLARE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
        ^(?:(?P<modifier>Public|Private)\s+)?
        Declare\s+(?:PtrSafe\s+)?
        (?P<kind>Sub|Function)\s+
        (?P<name>[A-Za-z][A-Za-z0-9_]*)\s+
        Lib\s+"(?P<library>[^"]*)"
        (?:\s+Alias\s+"(?P<alias>[^"]*)")?
        \s*(?:\((?P<params>.*)\))?
        (?:\s+As\s+(?P<type>[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)?))?$"#,
    )
    .unwrap()
});

static DECLARATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?P<modifier>Dim|Static|Public|Private|Friend|Global)\s+)?(?P<keyword>Dim|Static|Public|Private|Friend|Global|Const|Type|Enum)\s+(?P<rest>.+)$",
    )
    .unwrap()
});

static DECLARATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^(?:(?P<events>WithEvents)\s+)?
        (?P<name>[A-Za-z][A-Za-z0-9_]*[%&!\#@$]?)
        (?P<array>\s*\([^)]*\))?
        (?:\s+As\s+(?:(?P<new>New)\s+)?
            (?P<type>[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)?)
            (?:\s*\*\s*(?P<length>\w+))?)?
        (?:\s*=\s*(?P<value>.+))?$",
    )
    .unwrap()
});

static ENUM_MEMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>\[[^\]]+\]|[A-Za-z_][A-Za-z0-9_]*)(?:\s*=\s*(?P<value>.+))?$").unwrap()
});

impl Parser {
    /// Parse declarations until the first member signature or end of input
    pub(crate) fn parse_declarations(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();

        while let Some(current) = self.peek().cloned() {
            self.check_cancelled(current.line)?;

            let (code, comment) = split_comment(&current.text);
            let code = code.trim();
            if is_member_signature(code) {
                debug!(line = current.line, "declaration section ends");
                break;
            }
            self.position += 1;

            if code.is_empty() || starts_with_rem(code) {
                continue;
            }

            let mut line_nodes = Vec::new();
            for (_, instruction) in split_instructions(code) {
                if starts_with_rem(&instruction) {
                    break;
                }
                if let Some(node) = parse_implements(&instruction, current.line) {
                    line_nodes.push(node);
                } else if let Some(node) = parse_declare(&instruction, current.line) {
                    line_nodes.push(node);
                } else if let Some(declarations) = parse_declaration_line(&instruction, current.line) {
                    for declaration in declarations {
                        let declaration = match declaration_keyword(&declaration) {
                            Some(DeclarationKeyword::Type) => self.parse_type_body(declaration)?,
                            Some(DeclarationKeyword::Enum) => self.parse_enum_body(declaration)?,
                            _ => declaration,
                        };
                        line_nodes.push(declaration);
                    }
                } else {
                    trace!(line = current.line, text = %instruction, "no declaration in instruction");
                }
            }

            if let Some(last) = line_nodes.pop() {
                let last = match declaration_keyword(&last) {
                    Some(_) => with_comment(last, comment, current.line),
                    None => last,
                };
                line_nodes.push(last);
            }
            nodes.extend(line_nodes);
        }

        Ok(nodes)
    }

    /// Fields of a user-defined type, up to `End Type`
    fn parse_type_body(&mut self, mut node: Node) -> Result<Node, ParseError> {
        const TERMINATOR: &str = "End Type";
        let opened_at = node.line;

        loop {
            let current = self.expect_block_line(TERMINATOR, opened_at)?;
            let code = code_text(&current.text);

            if code == TERMINATOR {
                return Ok(node);
            }
            if code.is_empty() || starts_with_rem(code) {
                continue;
            }

            match parse_declarator(None, DeclarationKeyword::Field, code, current.line) {
                Some(field) => node.children.push(field),
                None => trace!(line = current.line, %code, "unrecognized type field"),
            }
        }
    }

    /// Members of an enumeration, up to `End Enum`.
    ///
    /// Implicit values continue from the previous member; the first
    /// implicit member is zero.
    fn parse_enum_body(&mut self, mut node: Node) -> Result<Node, ParseError> {
        const TERMINATOR: &str = "End Enum";
        let opened_at = node.line;
        let mut next_value: i64 = 0;

        loop {
            let current = self.expect_block_line(TERMINATOR, opened_at)?;
            let code = code_text(&current.text);

            if code == TERMINATOR {
                return Ok(node);
            }
            if code.is_empty() || starts_with_rem(code) {
                continue;
            }

            let Some(caps) = ENUM_MEMBER_RE.captures(code) else {
                trace!(line = current.line, %code, "unrecognized enum member");
                continue;
            };

            let explicit = caps.name("value").map(|m| m.as_str().trim());
            let parsed = explicit.and_then(parse_integer_literal);
            if let (Some(text), None) = (explicit, parsed) {
                trace!(line = current.line, value = text, "enum value is not a literal");
            }

            let value = parsed.unwrap_or(next_value);
            next_value = value.wrapping_add(1);

            node.children.push(Node::new(
                NodePayload::EnumMember {
                    value,
                    explicit: parsed.is_some(),
                },
                &caps["name"],
                current.line,
            ));
        }
    }
}

fn declaration_keyword(node: &Node) -> Option<DeclarationKeyword> {
    match node.payload {
        NodePayload::Declaration { keyword, .. } => Some(keyword),
        _ => None,
    }
}

fn with_comment(mut node: Node, comment: Option<&str>, line: usize) -> Node {
    if let Some(text) = comment {
        node.children.push(Node::new(NodePayload::Comment, text, line));
    }
    node
}

fn parse_implements(code: &str, line: usize) -> Option<Node> {
    let caps = IMPLEMENTS_RE.captures(code)?;
    let interface = &caps["interface"];
    Some(Node::new(NodePayload::Interface, interface, line).with_child(Node::type_reference(interface, line)))
}

fn parse_declare(code: &str, line: usize) -> Option<Node> {
    let caps = DECLARE_RE.captures(code)?;
    let name = &caps["name"];

    let external = ExternalProcedure {
        kind: MethodKind::from_keyword(&caps["kind"])?,
        library: caps["library"].to_string(),
        alias: caps.name("alias").map(|m| m.as_str().to_string()),
    };
    let payload = NodePayload::Declaration {
        modifier: caps.name("modifier").and_then(|m| AccessModifier::from_keyword(m.as_str())),
        keyword: DeclarationKeyword::Declare,
        constant_value: None,
        with_events: false,
        external: Some(external),
    };

    let type_name = caps.name("type").map(|m| m.as_str());
    let mut node = Node::new(payload, name, line).with_child(Node::identifier(name, None, None, type_name, line));
    if let Some(params) = caps.name("params") {
        node.children.extend(parse_parameters(params.as_str(), line));
    }

    Some(node)
}

/// One declaration node per declarator of a `Dim`/`Const`/`Type`/... line
fn parse_declaration_line(code: &str, line: usize) -> Option<Vec<Node>> {
    let caps = DECLARATION_RE.captures(code)?;

    let keyword_text = &caps["keyword"];
    let keyword = DeclarationKeyword::from_keyword(keyword_text)?;
    let modifier = match caps.name("modifier") {
        Some(m) => AccessModifier::from_keyword(m.as_str()),
        None => AccessModifier::from_keyword(keyword_text),
    };
    let rest = &caps["rest"];

    if matches!(keyword, DeclarationKeyword::Type | DeclarationKeyword::Enum) {
        let name = rest.trim();
        let payload = NodePayload::Declaration {
            modifier,
            keyword,
            constant_value: None,
            with_events: false,
            external: None,
        };
        return Some(vec![
            Node::new(payload, name, line).with_child(Node::identifier(name, None, None, None, line))
        ]);
    }

    let declarations: Vec<Node> = split_top_level(rest, ',')
        .into_iter()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .filter_map(|d| parse_declarator(modifier, keyword, d, line))
        .collect();

    if declarations.is_empty() {
        None
    } else {
        Some(declarations)
    }
}

fn parse_declarator(
    modifier: Option<AccessModifier>,
    keyword: DeclarationKeyword,
    text: &str,
    line: usize,
) -> Option<Node> {
    let caps = DECLARATOR_RE.captures(text)?;
    let name = &caps["name"];

    let array_spec = caps
        .name("array")
        .map(|m| m.as_str().trim());
    let type_name = caps.name("type").map(|t| match caps.name("length") {
        Some(length) => format!("{} * {}", t.as_str(), length.as_str()),
        None => t.as_str().to_string(),
    });

    let payload = NodePayload::Declaration {
        modifier,
        keyword,
        constant_value: caps.name("value").map(|m| m.as_str().trim().to_string()),
        with_events: caps.name("events").is_some(),
        external: None,
    };
    let identifier = Node::identifier(
        name,
        array_spec,
        caps.name("new").map(|m| m.as_str()),
        type_name.as_deref(),
        line,
    );

    Some(Node::new(payload, name, line).with_child(identifier))
}

/// Integer literal in decimal, `&H` hex or `&O` octal, with an optional
/// sign and type suffix
pub fn parse_integer_literal(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text.strip_prefix('+').unwrap_or(text).trim_start()),
    };
    let digits = digits.trim_end_matches(['&', '%', '^']);

    let magnitude = if let Some(hex) = digits.strip_prefix("&H").or_else(|| digits.strip_prefix("&h")) {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(octal) = digits.strip_prefix("&O").or_else(|| digits.strip_prefix("&o")) {
        if octal.is_empty() || !octal.chars().all(|c| ('0'..='7').contains(&c)) {
            return None;
        }
        i64::from_str_radix(octal, 8).ok()?
    } else if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        digits.parse::<i64>().ok()?
    } else {
        return None;
    };

    Some(if negative { -magnitude } else { magnitude })
}
