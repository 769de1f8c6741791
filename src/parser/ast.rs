// Syntax tree definitions for VB6 class and code modules

use super::constants::NAME_ATTRIBUTE;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;

/// Source location information for tokens and error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Closed set of node kinds exposed to tree consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    Module,
    Attribute,
    Declaration,
    Identifier,
    TypeReference,
    ArraySpec,
    Initializer,
    Interface,
    Property,
    Method,
    Parameter,
    EnumMember,
    CodeBlock,
    Comment,
    MemberReference,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Module => "Module",
            NodeKind::Attribute => "Attribute",
            NodeKind::Declaration => "Declaration",
            NodeKind::Identifier => "Identifier",
            NodeKind::TypeReference => "TypeReference",
            NodeKind::ArraySpec => "ArraySpec",
            NodeKind::Initializer => "Initializer",
            NodeKind::Interface => "Interface",
            NodeKind::Property => "Property",
            NodeKind::Method => "Method",
            NodeKind::Parameter => "Parameter",
            NodeKind::EnumMember => "EnumMember",
            NodeKind::CodeBlock => "CodeBlock",
            NodeKind::Comment => "Comment",
            NodeKind::MemberReference => "MemberReference",
        };
        f.write_str(name)
    }
}

/// Access modifiers that can lead a declaration or signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccessModifier {
    Public,
    Private,
    Friend,
    Global,
    Static,
    Dim,
}

impl AccessModifier {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "Public" => Some(AccessModifier::Public),
            "Private" => Some(AccessModifier::Private),
            "Friend" => Some(AccessModifier::Friend),
            "Global" => Some(AccessModifier::Global),
            "Static" => Some(AccessModifier::Static),
            "Dim" => Some(AccessModifier::Dim),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessModifier::Public => "Public",
            AccessModifier::Private => "Private",
            AccessModifier::Friend => "Friend",
            AccessModifier::Global => "Global",
            AccessModifier::Static => "Static",
            AccessModifier::Dim => "Dim",
        }
    }
}

/// Primary keyword of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeclarationKeyword {
    Dim,
    Static,
    Public,
    Private,
    Friend,
    Global,
    Const,
    Declare,
    Type,
    Enum,
    /// Member of a user-defined `Type`
    Field,
}

impl DeclarationKeyword {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "Dim" => Some(DeclarationKeyword::Dim),
            "Static" => Some(DeclarationKeyword::Static),
            "Public" => Some(DeclarationKeyword::Public),
            "Private" => Some(DeclarationKeyword::Private),
            "Friend" => Some(DeclarationKeyword::Friend),
            "Global" => Some(DeclarationKeyword::Global),
            "Const" => Some(DeclarationKeyword::Const),
            "Declare" => Some(DeclarationKeyword::Declare),
            "Type" => Some(DeclarationKeyword::Type),
            "Enum" => Some(DeclarationKeyword::Enum),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKeyword::Dim => "Dim",
            DeclarationKeyword::Static => "Static",
            DeclarationKeyword::Public => "Public",
            DeclarationKeyword::Private => "Private",
            DeclarationKeyword::Friend => "Friend",
            DeclarationKeyword::Global => "Global",
            DeclarationKeyword::Const => "Const",
            DeclarationKeyword::Declare => "Declare",
            DeclarationKeyword::Type => "Type",
            DeclarationKeyword::Enum => "Enum",
            DeclarationKeyword::Field => "Field",
        }
    }
}

/// Property accessor keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Accessor {
    Get,
    Let,
    Set,
}

impl Accessor {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "Get" => Some(Accessor::Get),
            "Let" => Some(Accessor::Let),
            "Set" => Some(Accessor::Set),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Accessor::Get => "Get",
            Accessor::Let => "Let",
            Accessor::Set => "Set",
        }
    }
}

/// Procedure keyword of a method or external declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MethodKind {
    Sub,
    Function,
}

impl MethodKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "Sub" => Some(MethodKind::Sub),
            "Function" => Some(MethodKind::Function),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MethodKind::Sub => "Sub",
            MethodKind::Function => "Function",
        }
    }
}

/// How an argument is passed to a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PassingMode {
    /// Neither `ByRef` nor `ByVal` was written
    Default,
    ByRef,
    ByVal,
}

impl PassingMode {
    /// Passing mode the language actually applies; unspecified means `ByRef`.
    pub fn effective(&self) -> PassingMode {
        match self {
            PassingMode::ByVal => PassingMode::ByVal,
            PassingMode::Default | PassingMode::ByRef => PassingMode::ByRef,
        }
    }
}

/// Numeric flags from the `BEGIN ... END` block of a class header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClassFlags {
    pub multi_use: i32,
    pub persistable: i32,
    pub data_binding_behavior: i32,
    pub data_source_behavior: i32,
    pub mts_transaction_mode: i32,
}

/// Target of a `Declare` statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalProcedure {
    pub kind: MethodKind,
    pub library: String,
    pub alias: Option<String>,
}

/// Kind-specific fields carried by a [`Node`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum NodePayload {
    Module {
        file_name: String,
        /// Present only for class modules
        class_flags: Option<ClassFlags>,
    },
    Attribute {
        value: String,
        /// Whether the value was written as a string literal
        quoted: bool,
    },
    Declaration {
        modifier: Option<AccessModifier>,
        keyword: DeclarationKeyword,
        constant_value: Option<String>,
        with_events: bool,
        external: Option<ExternalProcedure>,
    },
    Identifier,
    TypeReference,
    ArraySpec,
    Initializer,
    Interface,
    Property {
        modifier: Option<AccessModifier>,
        is_static: bool,
        accessor: Accessor,
    },
    Method {
        modifier: Option<AccessModifier>,
        is_static: bool,
        method_kind: MethodKind,
    },
    Parameter {
        passing: PassingMode,
        is_optional: bool,
        is_param_array: bool,
        default_value: Option<String>,
    },
    EnumMember {
        value: i64,
        explicit: bool,
    },
    CodeBlock,
    Comment,
    MemberReference,
}

impl NodePayload {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodePayload::Module { .. } => NodeKind::Module,
            NodePayload::Attribute { .. } => NodeKind::Attribute,
            NodePayload::Declaration { .. } => NodeKind::Declaration,
            NodePayload::Identifier => NodeKind::Identifier,
            NodePayload::TypeReference => NodeKind::TypeReference,
            NodePayload::ArraySpec => NodeKind::ArraySpec,
            NodePayload::Initializer => NodeKind::Initializer,
            NodePayload::Interface => NodeKind::Interface,
            NodePayload::Property { .. } => NodeKind::Property,
            NodePayload::Method { .. } => NodeKind::Method,
            NodePayload::Parameter { .. } => NodeKind::Parameter,
            NodePayload::EnumMember { .. } => NodeKind::EnumMember,
            NodePayload::CodeBlock => NodeKind::CodeBlock,
            NodePayload::Comment => NodeKind::Comment,
            NodePayload::MemberReference => NodeKind::MemberReference,
        }
    }
}

/// A node of the syntax tree. Children are owned exclusively.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
    /// 1-based physical line the node starts on
    pub line: usize,
    pub payload: NodePayload,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(payload: NodePayload, name: impl Into<String>, line: usize) -> Self {
        Node {
            name: name.into(),
            line,
            payload,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn type_reference(type_name: &str, line: usize) -> Self {
        Node::new(NodePayload::TypeReference, type_name, line)
    }

    /// Build an identifier: an optional array specifier, then either a `New`
    /// initializer wrapping the type or the bare type reference.
    pub fn identifier(
        name: &str,
        array_spec: Option<&str>,
        initializer: Option<&str>,
        type_name: Option<&str>,
        line: usize,
    ) -> Self {
        let mut node = Node::new(NodePayload::Identifier, name, line);

        if let Some(spec) = array_spec.filter(|s| !s.is_empty()) {
            node.children.push(Node::new(NodePayload::ArraySpec, spec, line));
        }

        let type_name = type_name.filter(|t| !t.is_empty());
        match (initializer.filter(|i| !i.is_empty()), type_name) {
            (Some(keyword), Some(type_name)) => {
                node.children.push(
                    Node::new(NodePayload::Initializer, keyword, line)
                        .with_child(Node::type_reference(type_name, line)),
                );
            }
            (Some(keyword), None) => {
                node.children.push(Node::new(NodePayload::Initializer, keyword, line));
            }
            (None, Some(type_name)) => {
                node.children.push(Node::type_reference(type_name, line));
            }
            (None, None) => {}
        }

        node
    }

    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind() == kind
    }

    pub fn children_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(move |c| c.kind() == kind)
    }

    pub fn first_child(&self, kind: NodeKind) -> Option<&Node> {
        self.children_of_kind(kind).next()
    }

    /// First identifier child (declarations, members, parameters)
    pub fn identifier_node(&self) -> Option<&Node> {
        self.first_child(NodeKind::Identifier)
    }

    /// Declared type of an identifier, looking through a `New` initializer
    pub fn type_name(&self) -> Option<&str> {
        let ident = if self.is(NodeKind::Identifier) {
            self
        } else {
            self.identifier_node()?
        };

        if let Some(reference) = ident.first_child(NodeKind::TypeReference) {
            return Some(reference.name.as_str());
        }
        ident
            .first_child(NodeKind::Initializer)
            .and_then(|init| init.first_child(NodeKind::TypeReference))
            .map(|reference| reference.name.as_str())
    }

    pub fn is_array(&self) -> bool {
        let ident = if self.is(NodeKind::Identifier) {
            Some(self)
        } else {
            self.identifier_node()
        };
        ident
            .map(|i| i.first_child(NodeKind::ArraySpec).is_some())
            .unwrap_or(false)
    }

    /// Value of an attribute node
    pub fn value(&self) -> Option<&str> {
        match &self.payload {
            NodePayload::Attribute { value, .. } => Some(value.as_str()),
            _ => None,
        }
    }

    /// First attribute child with the given name
    pub fn attribute(&self, name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|c| c.is(NodeKind::Attribute) && c.name == name)
    }

    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Node::value)
    }

    /// Attribute children keyed by name; the first occurrence wins.
    pub fn attribute_index(&self) -> FxHashMap<&str, &Node> {
        let mut index = FxHashMap::default();
        for attribute in self.children_of_kind(NodeKind::Attribute) {
            index.entry(attribute.name.as_str()).or_insert(attribute);
        }
        index
    }

    /// Replace the value of the first attribute child with the given name.
    /// Returns false when there is no such attribute.
    pub fn set_attribute_value(&mut self, name: &str, new_value: &str) -> bool {
        let attribute = self
            .children
            .iter_mut()
            .find(|c| c.is(NodeKind::Attribute) && c.name == name);

        match attribute {
            Some(Node {
                payload: NodePayload::Attribute { value, .. },
                ..
            }) => {
                *value = new_value.to_string();
                true
            }
            _ => false,
        }
    }

    /// Canonical module name: the value of the `VB_Name` attribute
    pub fn module_name(&self) -> Option<&str> {
        self.attribute_value(NAME_ATTRIBUTE)
    }

    /// Rename a module by rewriting its `VB_Name` attribute
    pub fn rename_module(&mut self, new_name: &str) -> bool {
        if self.set_attribute_value(NAME_ATTRIBUTE, new_name) {
            self.name = new_name.to_string();
            true
        } else {
            false
        }
    }

    pub fn class_flags(&self) -> Option<&ClassFlags> {
        match &self.payload {
            NodePayload::Module { class_flags, .. } => class_flags.as_ref(),
            _ => None,
        }
    }

    pub fn is_class_module(&self) -> bool {
        self.class_flags().is_some()
    }

    /// Pre-order traversal with depth
    pub fn walk<F: FnMut(&Node, usize)>(&self, visit: &mut F) {
        self.walk_at(0, visit);
    }

    fn walk_at<F: FnMut(&Node, usize)>(&self, depth: usize, visit: &mut F) {
        visit(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, visit);
        }
    }

    /// Number of nodes in this subtree, including self
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            NodePayload::Module { class_flags, .. } => {
                let label = if class_flags.is_some() { "ClassModule" } else { "Module" };
                write!(f, "{} {}", label, self.name)
            }
            NodePayload::Attribute { value, .. } => write!(f, "Attribute {} = {}", self.name, value),
            NodePayload::Declaration {
                modifier, keyword, ..
            } => match modifier {
                Some(m) if m.as_str() != keyword.as_str() => {
                    write!(f, "Declaration {} {} {}", m.as_str(), keyword.as_str(), self.name)
                }
                _ => write!(f, "Declaration {} {}", keyword.as_str(), self.name),
            },
            NodePayload::Property {
                modifier, accessor, ..
            } => match modifier {
                Some(m) => write!(f, "Property {} {} {}", m.as_str(), accessor.as_str(), self.name),
                None => write!(f, "Property {} {}", accessor.as_str(), self.name),
            },
            NodePayload::Method {
                modifier,
                method_kind,
                ..
            } => match modifier {
                Some(m) => write!(f, "Method {} {} {}", m.as_str(), method_kind.as_str(), self.name),
                None => write!(f, "Method {} {}", method_kind.as_str(), self.name),
            },
            NodePayload::Parameter {
                passing,
                is_optional,
                is_param_array,
                default_value,
            } => {
                write!(f, "Parameter {}", self.name)?;
                if *is_optional {
                    write!(f, " Optional")?;
                }
                match passing {
                    PassingMode::ByRef => write!(f, " ByRef")?,
                    PassingMode::ByVal => write!(f, " ByVal")?,
                    PassingMode::Default => {}
                }
                if *is_param_array {
                    write!(f, " ParamArray")?;
                }
                if let Some(default) = default_value {
                    write!(f, " = {}", default)?;
                }
                Ok(())
            }
            NodePayload::EnumMember { value, .. } => write!(f, "EnumMember {} = {}", self.name, value),
            other => write!(f, "{} {}", other.kind(), self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_with_initializer_wraps_type() {
        let ident = Node::identifier("conn", None, Some("New"), Some("ADODB.Connection"), 3);

        assert_eq!(ident.children.len(), 1);
        let init = &ident.children[0];
        assert_eq!(init.kind(), NodeKind::Initializer);
        assert_eq!(init.children[0].name, "ADODB.Connection");
        assert_eq!(ident.type_name(), Some("ADODB.Connection"));
    }

    #[test]
    fn test_identifier_array_spec_comes_first() {
        let ident = Node::identifier("arr", Some("(10)"), None, Some("Integer"), 1);

        assert_eq!(ident.children[0].kind(), NodeKind::ArraySpec);
        assert_eq!(ident.children[0].name, "(10)");
        assert_eq!(ident.children[1].kind(), NodeKind::TypeReference);
        assert!(ident.is_array());
    }

    #[test]
    fn test_rename_module_updates_attribute() {
        let mut module = Node::new(
            NodePayload::Module {
                file_name: "Foo.cls".to_string(),
                class_flags: None,
            },
            "Foo",
            1,
        )
        .with_child(Node::new(
            NodePayload::Attribute {
                value: "Foo".to_string(),
                quoted: true,
            },
            "VB_Name",
            1,
        ));

        assert!(module.rename_module("Bar"));
        assert_eq!(module.module_name(), Some("Bar"));
        assert_eq!(module.name, "Bar");
    }

    #[test]
    fn test_default_passing_mode_is_by_ref() {
        assert_eq!(PassingMode::Default.effective(), PassingMode::ByRef);
        assert_eq!(PassingMode::ByVal.effective(), PassingMode::ByVal);
    }
}
