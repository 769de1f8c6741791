//! Parameter lists of signatures and `Declare` statements

use super::ast::{Node, NodePayload, PassingMode};
use super::lexer::split_top_level;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

static PARAMETER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        ^(?:(?P<optional>Optional)\s+)?
        (?:(?P<passing>ByRef|ByVal)\s+)?
        (?:(?P<param_array>ParamArray)\s+)?
        (?P<name>[A-Za-z][A-Za-z0-9_]*[%&!\#@$]?)
        (?P<array>\s*\(\))?
        (?:\s+As\s+(?P<type>[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)?))?
        (?:\s*=\s*(?P<default>.+))?$",
    )
    .unwrap()
});

/// Parse the text between a signature's parentheses.
///
/// Parameters that do not match the grammar are skipped.
pub fn parse_parameters(text: &str, line: usize) -> Vec<Node> {
    split_top_level(text, ',')
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter_map(|p| {
            let parameter = parse_parameter(p, line);
            if parameter.is_none() {
                trace!(line, parameter = p, "unrecognized parameter skipped");
            }
            parameter
        })
        .collect()
}

fn parse_parameter(text: &str, line: usize) -> Option<Node> {
    let caps = PARAMETER_RE.captures(text)?;

    let name = caps.name("name")?.as_str();
    let passing = match caps.name("passing").map(|m| m.as_str()) {
        Some("ByVal") => PassingMode::ByVal,
        Some(_) => PassingMode::ByRef,
        None => PassingMode::Default,
    };
    let is_param_array = caps.name("param_array").is_some();
    let array_spec = (is_param_array || caps.name("array").is_some()).then_some("()");
    let type_name = caps.name("type").map(|m| m.as_str());

    let payload = NodePayload::Parameter {
        passing,
        is_optional: caps.name("optional").is_some(),
        is_param_array,
        default_value: caps.name("default").map(|m| m.as_str().trim().to_string()),
    };

    Some(Node::new(payload, name, line).with_child(Node::identifier(name, array_spec, None, type_name, line)))
}
