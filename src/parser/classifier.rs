//! Instruction classifier
//!
//! An instruction is tried against an ordered table of matchers; the first
//! one that accepts it decides the token kind. The order is the
//! disambiguation rule between overlapping forms, e.g. `Dim x As Long`
//! (declaration) versus `x = 1` (expression) versus `Foo 1, 2` (call):
//!
//! ```text
//! comment → attribute → label → declaration → instruction keyword
//!         → control statement → expression → procedure call
//! ```

use super::ast::SourceLocation;
use super::constants::{COMMENT_MARKER, LABEL_MARKER};
use super::lexer::{starts_with_rem, starts_with_word, Token};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

/// A single classification rule
pub type Matcher = fn(&str, SourceLocation) -> Option<Token>;

/// Default matcher table in priority order
pub static DEFAULT_MATCHERS: [Matcher; 8] = [
    match_comment,
    match_attribute,
    match_label,
    match_declaration,
    match_instruction,
    match_statement,
    match_expression,
    match_procedure_call,
];

const DECLARATION_KEYWORDS: [&str; 13] = [
    "Const", "Dim", "Static", "Public", "Private", "Friend", "Global", "Declare", "Type", "Enum",
    "Property", "Function", "Sub",
];

const INSTRUCTION_KEYWORDS: [&str; 32] = [
    "Set", "Let", "Call", "Beep", "Open", "Option", "On", "Close", "ChDir", "ChDrive", "Debug",
    "DoEvents", "Exit", "End", "GoTo", "GoSub", "Input", "Kill", "MkDir", "MsgBox", "Output",
    "Print", "Put", "Randomize", "Read", "ReDim", "Resume", "Return", "RmDir", "Shell", "Stop",
    "Write",
];

/// Control statement keywords; a trailing space is part of the match.
const STATEMENT_KEYWORDS: [&str; 11] = [
    "Do", "Else", "ElseIf", "For", "If ", "Loop", "Next", "Select ", "Wend", "While", "With ",
];

static INSTRUCTION_SET: Lazy<FxHashSet<&'static str>> =
    Lazy::new(|| INSTRUCTION_KEYWORDS.iter().copied().collect());

static RESERVED_WORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    DECLARATION_KEYWORDS
        .iter()
        .chain(INSTRUCTION_KEYWORDS.iter())
        .chain(STATEMENT_KEYWORDS.iter())
        .map(|k| k.trim_end())
        .collect()
});

static AS_CLAUSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bAs\b").unwrap());

/// Keywords that cannot name a label
pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(word)
}

/// Classify with the default matcher table
pub fn classify(instruction: &str, location: SourceLocation) -> Option<Token> {
    classify_with(&DEFAULT_MATCHERS, instruction, location)
}

/// Classify with a caller-supplied matcher table; the first match wins.
pub fn classify_with(
    matchers: &[Matcher],
    instruction: &str,
    location: SourceLocation,
) -> Option<Token> {
    if instruction.trim().is_empty() {
        return None;
    }
    matchers.iter().find_map(|matcher| matcher(instruction, location))
}

pub fn match_comment(instruction: &str, location: SourceLocation) -> Option<Token> {
    let no_indent = instruction.trim_start();
    if !no_indent.starts_with(COMMENT_MARKER) && !starts_with_rem(no_indent) {
        return None;
    }
    Some(Token::Comment {
        text: instruction.to_string(),
        location,
    })
}

pub fn match_attribute(instruction: &str, location: SourceLocation) -> Option<Token> {
    if !starts_with_word(instruction.trim_start(), "Attribute") {
        return None;
    }
    Some(Token::Attribute {
        instruction: instruction.to_string(),
        location,
    })
}

pub fn match_label(instruction: &str, location: SourceLocation) -> Option<Token> {
    let trimmed = instruction.trim();
    let label = trimmed.strip_suffix(LABEL_MARKER)?.trim_end();
    Some(Token::Label {
        label: label.to_string(),
        is_case_label: trimmed.starts_with("Case "),
        instruction: instruction.to_string(),
        location,
    })
}

pub fn match_declaration(instruction: &str, location: SourceLocation) -> Option<Token> {
    let no_indent = instruction.trim_start();

    let keyword = DECLARATION_KEYWORDS.iter().find(|k| {
        no_indent
            .strip_prefix(**k)
            .map(|rest| rest.starts_with(' '))
            .unwrap_or(false)
    });

    if let Some(keyword) = keyword {
        return Some(Token::Declaration {
            keyword: keyword.to_string(),
            member: false,
            instruction: instruction.to_string(),
            location,
        });
    }

    // `name As Type` inside a Type block; "Public" carries no meaning here.
    if AS_CLAUSE_RE.is_match(no_indent) && !no_indent.contains('#') && !no_indent.contains('=') {
        return Some(Token::Declaration {
            keyword: "Public".to_string(),
            member: true,
            instruction: instruction.to_string(),
            location,
        });
    }

    None
}

pub fn match_instruction(instruction: &str, location: SourceLocation) -> Option<Token> {
    let no_indent = instruction.trim_start();
    let word_end = no_indent
        .find(|c: char| !super::lexer::is_identifier_char(c))
        .unwrap_or(no_indent.len());
    let keyword = INSTRUCTION_SET.get(&no_indent[..word_end])?;

    Some(Token::Instruction {
        keyword: keyword.to_string(),
        instruction: instruction.to_string(),
        location,
    })
}

pub fn match_statement(instruction: &str, location: SourceLocation) -> Option<Token> {
    let no_indent = instruction.trim_start();
    let keyword = STATEMENT_KEYWORDS.iter().find(|k| {
        if k.ends_with(' ') {
            no_indent.starts_with(**k)
        } else {
            starts_with_word(no_indent, k)
        }
    })?;

    Some(Token::Statement {
        keyword: keyword.trim_end().to_string(),
        instruction: instruction.to_string(),
        location,
    })
}

pub fn match_expression(instruction: &str, location: SourceLocation) -> Option<Token> {
    if !instruction.contains('=') || instruction.trim_start().starts_with(COMMENT_MARKER) {
        return None;
    }
    Some(Token::Expression {
        instruction: instruction.to_string(),
        location,
    })
}

pub fn match_procedure_call(instruction: &str, location: SourceLocation) -> Option<Token> {
    let target = instruction.split_whitespace().next()?;
    Some(Token::ProcedureCall {
        target: target.to_string(),
        instruction: instruction.to_string(),
        location,
    })
}
