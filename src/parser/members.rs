//! Member parsing
//!
//! Handles property procedures, subs and functions:
//! - Signature line with modifier, `Static`, accessor, parameters and return type
//! - Member-scoped `Attribute` lines inside the body
//! - Body lines as `CodeBlock` nodes, with `If ... Then` / `End If` and
//!   `For` / `Next` regions nested as child blocks

use super::ast::{Accessor, AccessModifier, MethodKind, Node, NodePayload};
use super::attributes::parse_attribute;
use super::lexer::{code_text, split_instructions, split_top_level, starts_with_rem, LogicalLine};
use super::parameters::parse_parameters;
use super::parse::{ParseError, Parser};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

static SIGNATURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^(?:(?P<modifier>Public|Private|Friend)\s+)?
        (?:(?P<static>Static)\s+)?
        (?P<keyword>Property|Function|Sub)\s+
        (?:(?P<accessor>Get|Let|Set)\s+)?
        (?P<name>[A-Za-z][A-Za-z0-9_]*)\s*
        (?:\((?P<params>(?:[^()]|\(\))*)\))?
        (?:\s+As\s+(?P<type>.+?))?$",
    )
    .unwrap()
});

static IF_BLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^If\s.*\bThen$").unwrap());

static FOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^For\s").unwrap());

static NEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Next(?:\s+[A-Za-z_][A-Za-z0-9_]*(?:\s*,\s*[A-Za-z_][A-Za-z0-9_]*)*)?$").unwrap());

const END_IF: &str = "End If";
const NEXT: &str = "Next";

/// Whether a comment-stripped line opens a property, sub or function
pub fn is_member_signature(code: &str) -> bool {
    parse_signature(code, 0).is_some()
}

/// A parsed signature with the line that must close its body
struct Signature {
    node: Node,
    terminator: &'static str,
}

fn parse_signature(code: &str, line: usize) -> Option<Signature> {
    let caps = SIGNATURE_RE.captures(code)?;

    let name = &caps["name"];
    let modifier = caps.name("modifier").and_then(|m| AccessModifier::from_keyword(m.as_str()));
    let is_static = caps.name("static").is_some();
    let accessor = caps.name("accessor").and_then(|m| Accessor::from_keyword(m.as_str()));

    let (payload, terminator) = match (&caps["keyword"], accessor) {
        ("Property", Some(accessor)) => (
            NodePayload::Property {
                modifier,
                is_static,
                accessor,
            },
            "End Property",
        ),
        ("Property", None) | (_, Some(_)) => return None,
        (keyword, None) => {
            let method_kind = MethodKind::from_keyword(keyword)?;
            let terminator = match method_kind {
                MethodKind::Sub => "End Sub",
                MethodKind::Function => "End Function",
            };
            (
                NodePayload::Method {
                    modifier,
                    is_static,
                    method_kind,
                },
                terminator,
            )
        }
    };

    let return_type = caps.name("type").map(|m| m.as_str().trim());
    let (array_spec, return_type) = match return_type.and_then(|t| t.strip_suffix("()")) {
        Some(element) => (Some("()"), Some(element.trim_end())),
        None => (None, return_type),
    };

    let mut node = Node::new(payload, name, line).with_child(Node::identifier(
        name,
        array_spec,
        None,
        return_type,
        line,
    ));
    if let Some(params) = caps.name("params") {
        node.children.extend(parse_parameters(params.as_str(), line));
    }

    Some(Signature { node, terminator })
}

fn opens_if_block(code: &str) -> bool {
    IF_BLOCK_RE.is_match(code)
}

/// `For` loop whose `Next` is on a later line
fn opens_for_block(code: &str) -> bool {
    FOR_RE.is_match(code)
        && !split_instructions(code)
            .iter()
            .skip(1)
            .any(|(_, instruction)| NEXT_RE.is_match(instruction))
}

/// Loops closed by a `Next` line: one per listed counter, one when bare
fn closed_loop_count(code: &str) -> usize {
    let counters = code[NEXT.len()..].trim();
    if counters.is_empty() {
        1
    } else {
        split_top_level(counters, ',').len()
    }
}

fn closes_region(code: &str, terminator: &str) -> bool {
    match terminator {
        NEXT => NEXT_RE.is_match(code),
        _ => code == terminator,
    }
}

impl Parser {
    /// Parse members until end of input
    pub(crate) fn parse_members(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut members = Vec::new();

        while !self.is_at_end() {
            let Some(current) = self.next_line() else { break };
            self.check_cancelled(current.line)?;

            let code = code_text(&current.text);
            if code.is_empty() || starts_with_rem(code) {
                continue;
            }

            match parse_signature(code, current.line) {
                Some(signature) => {
                    debug!(line = current.line, member = %signature.node, "member");
                    members.push(self.parse_member_body(signature)?);
                }
                None => trace!(line = current.line, text = %current.text, "line outside any member"),
            }
        }

        Ok(members)
    }

    fn parse_member_body(&mut self, signature: Signature) -> Result<Node, ParseError> {
        let Signature { mut node, terminator } = signature;
        let opened_at = node.line;
        let mut body = Node::new(NodePayload::CodeBlock, node.name.clone(), opened_at);
        self.pending_next = 0;

        loop {
            let current = self.expect_block_line(terminator, opened_at)?;

            if code_text(&current.text) == terminator {
                break;
            }
            if let Some(attribute) = parse_attribute(&current.text, current.line) {
                node.children.push(attribute);
                continue;
            }
            let current_line = current.line;
            body.children.push(self.parse_body_line(current)?);
            if self.pending_next > 0 {
                trace!(line = current_line, "Next closes more loops than are open");
                self.pending_next = 0;
            }
        }

        node.children.push(body);
        Ok(node)
    }

    fn parse_body_line(&mut self, current: LogicalLine) -> Result<Node, ParseError> {
        let code = code_text(&current.text);

        if opens_if_block(code) {
            self.parse_region(current, END_IF)
        } else if opens_for_block(code) {
            self.parse_region(current, NEXT)
        } else {
            Ok(Node::new(NodePayload::CodeBlock, current.text, current.line))
        }
    }

    /// Lines up to `terminator` become children of the opening line's block.
    /// The terminator line itself is consumed. A `Next a, b` line also closes
    /// the enclosing `For` regions, one per extra counter.
    fn parse_region(&mut self, opening: LogicalLine, terminator: &str) -> Result<Node, ParseError> {
        let mut region = Node::new(NodePayload::CodeBlock, opening.text, opening.line);

        loop {
            let current = self.expect_block_line(terminator, opening.line)?;
            let code = code_text(&current.text);

            if closes_region(code, terminator) {
                if terminator == NEXT {
                    self.pending_next = closed_loop_count(code) - 1;
                }
                return Ok(region);
            }
            region.children.push(self.parse_body_line(current)?);

            if terminator == NEXT && self.pending_next > 0 {
                self.pending_next -= 1;
                return Ok(region);
            }
        }
    }
}
