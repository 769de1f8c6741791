//! Attribute lines
//!
//! ```text
//! Attribute [Member.]VB_Name = Value
//! ```
//!
//! Attributes appear in the module header and inside procedure bodies,
//! where the member qualifier scopes them to that procedure. String values
//! are stored without their quotes; the `quoted` flag on the node records
//! how the value was written so [`to_source`] can reproduce it.

use super::ast::{Node, NodeKind, NodePayload};
use super::constants::STRING_DELIMITER;
use once_cell::sync::Lazy;
use regex::Regex;

static ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Attribute\s+(?:(?P<member>[A-Za-z][A-Za-z0-9_]*)\.)?(?P<name>VB_\w+)\s*=\s*(?P<value>.*)$")
        .unwrap()
});

/// Parse an attribute line. Lines that are not attributes yield `None`.
pub fn parse_attribute(instruction: &str, line: usize) -> Option<Node> {
    let caps = ATTRIBUTE_RE.captures(instruction.trim())?;

    let name = caps.name("name")?.as_str();
    let raw_value = caps.name("value").map(|m| m.as_str().trim()).unwrap_or("");
    let (value, quoted) = unquote(raw_value);

    let mut node = Node::new(NodePayload::Attribute { value, quoted }, name, line);
    if let Some(member) = caps.name("member") {
        node.children
            .push(Node::new(NodePayload::MemberReference, member.as_str(), line));
    }

    Some(node)
}

/// Strip the delimiters of a string literal, undoubling embedded quotes.
/// Values that are not string literals are returned as written.
pub fn unquote(raw: &str) -> (String, bool) {
    let delimiter = STRING_DELIMITER.to_string();
    match raw.strip_prefix(STRING_DELIMITER) {
        Some(rest) => {
            let inner = rest.strip_suffix(STRING_DELIMITER).unwrap_or(rest);
            (inner.replace(&delimiter.repeat(2), &delimiter), true)
        }
        None => (raw.to_string(), false),
    }
}

/// Inverse of [`unquote`] for a quoted value
pub fn quote(value: &str) -> String {
    let delimiter = STRING_DELIMITER.to_string();
    format!(
        "{d}{}{d}",
        value.replace(&delimiter, &delimiter.repeat(2)),
        d = delimiter
    )
}

/// Render an attribute node back to its source line
pub fn to_source(node: &Node) -> Option<String> {
    let (value, quoted) = match &node.payload {
        NodePayload::Attribute { value, quoted } => (value, *quoted),
        _ => return None,
    };

    let value = if quoted { quote(value) } else { value.clone() };
    let line = match node.first_child(NodeKind::MemberReference) {
        Some(member) => format!("Attribute {}.{} = {}", member.name, node.name, value),
        None => format!("Attribute {} = {}", node.name, value),
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_attribute() {
        let node = parse_attribute("Attribute VB_Name = \"SqlCommand\"", 9).unwrap();

        assert_eq!(node.kind(), NodeKind::Attribute);
        assert_eq!(node.name, "VB_Name");
        assert_eq!(node.value(), Some("SqlCommand"));
        assert_eq!(node.line, 9);
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_unquoted_value() {
        let node = parse_attribute("Attribute VB_Exposed = False", 1).unwrap();
        assert_eq!(node.value(), Some("False"));
        assert!(matches!(node.payload, NodePayload::Attribute { quoted: false, .. }));
    }

    #[test]
    fn test_member_attribute() {
        let node = parse_attribute("Attribute Item.VB_UserMemId = 0", 20).unwrap();

        assert_eq!(node.name, "VB_UserMemId");
        assert_eq!(node.value(), Some("0"));
        let member = node.first_child(NodeKind::MemberReference).unwrap();
        assert_eq!(member.name, "Item");
    }

    #[test]
    fn test_non_attribute_is_none() {
        assert!(parse_attribute("Dim x As Long", 1).is_none());
        assert!(parse_attribute("Attribute Foo = 1", 1).is_none());
    }

    #[test]
    fn test_round_trip_keeps_value() {
        let source = "Attribute Description.VB_Description = \"Say \"\"hi\"\"\"";
        let node = parse_attribute(source, 1).unwrap();
        assert_eq!(node.value(), Some("Say \"hi\""));

        let rendered = to_source(&node).unwrap();
        assert_eq!(rendered, source);

        let reparsed = parse_attribute(&rendered, 1).unwrap();
        assert_eq!(reparsed.value(), node.value());
    }
}
