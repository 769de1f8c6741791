//! Line normalizer and tokenizer for VB6 source
//!
//! Source arrives as an ordered sequence of physical lines. The normalizer
//! joins continuation lines (` _`) into logical lines and splits logical
//! lines into instructions on the `:` separator, outside of string literals
//! and comments. Each instruction is then classified into a [`Token`] by the
//! matcher table in [`classifier`](super::classifier).

use super::ast::SourceLocation;
use super::classifier::{self, Matcher};
use super::constants::{
    COMMENT_MARKER, DATE_DELIMITER, INSTRUCTION_SEPARATOR, LABEL_MARKER, LINE_CONTINUATION, REM_KEYWORD,
    STRING_DELIMITER,
};
use std::fmt;
use tracing::trace;

/// All token kinds produced by the classifier.
///
/// Every variant keeps the instruction text it was built from and a
/// [`SourceLocation`] (physical line, 1-based column in the logical line).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Comment {
        text: String,
        location: SourceLocation,
    },
    Attribute {
        instruction: String,
        location: SourceLocation,
    },
    Label {
        label: String,
        is_case_label: bool,
        instruction: String,
        location: SourceLocation,
    },
    Declaration {
        keyword: String,
        /// Classified from an `As` clause rather than a leading keyword
        member: bool,
        instruction: String,
        location: SourceLocation,
    },
    Instruction {
        keyword: String,
        instruction: String,
        location: SourceLocation,
    },
    Statement {
        keyword: String,
        instruction: String,
        location: SourceLocation,
    },
    Expression {
        instruction: String,
        location: SourceLocation,
    },
    ProcedureCall {
        target: String,
        instruction: String,
        location: SourceLocation,
    },
}

impl Token {
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::Comment { location, .. }
            | Token::Attribute { location, .. }
            | Token::Label { location, .. }
            | Token::Declaration { location, .. }
            | Token::Instruction { location, .. }
            | Token::Statement { location, .. }
            | Token::Expression { location, .. }
            | Token::ProcedureCall { location, .. } => *location,
        }
    }

    /// Text of the instruction this token was classified from
    pub fn instruction(&self) -> &str {
        match self {
            Token::Comment { text, .. } => text,
            Token::Attribute { instruction, .. }
            | Token::Label { instruction, .. }
            | Token::Declaration { instruction, .. }
            | Token::Instruction { instruction, .. }
            | Token::Statement { instruction, .. }
            | Token::Expression { instruction, .. }
            | Token::ProcedureCall { instruction, .. } => instruction,
        }
    }

    /// Keyword (or marker) that selected this token kind
    pub fn keyword(&self) -> &str {
        match self {
            Token::Comment { .. } => "'",
            Token::Attribute { .. } => "Attribute",
            Token::Label { .. } => ":",
            Token::Declaration { keyword, .. }
            | Token::Instruction { keyword, .. }
            | Token::Statement { keyword, .. } => keyword,
            Token::Expression { .. } => "=",
            Token::ProcedureCall { target, .. } => target,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Token::Comment { .. } => "Comment",
            Token::Attribute { .. } => "Attribute",
            Token::Label { .. } => "Label",
            Token::Declaration { .. } => "Declaration",
            Token::Instruction { .. } => "Instruction",
            Token::Statement { .. } => "Statement",
            Token::Expression { .. } => "Expression",
            Token::ProcedureCall { .. } => "ProcedureCall",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: [{}] {}",
            self.kind_name(),
            self.keyword(),
            self.instruction().trim()
        )
    }
}

/// One logical line after continuation joining
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    pub text: String,
    /// 1-based physical line the logical line starts on
    pub line: usize,
}

/// Join continuation lines into logical lines, dropping empty lines.
///
/// `first_line` is the 1-based physical line number of `lines[0]`.
pub fn normalize_lines<S: AsRef<str>>(lines: &[S], first_line: usize) -> Vec<LogicalLine> {
    let mut logical = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let start = index;
        let mut text = lines[index].as_ref().trim().to_string();
        index += 1;

        if text.is_empty() {
            continue;
        }

        while let Some(head) = strip_continuation(&text) {
            let head = head.trim_end().to_string();
            match lines.get(index) {
                Some(next) => {
                    text = join_continued(&head, next.as_ref().trim());
                    index += 1;
                }
                None => {
                    text = head;
                    break;
                }
            }
        }

        logical.push(LogicalLine {
            text,
            line: first_line + start,
        });
    }

    logical
}

/// Text before a trailing continuation marker, if the line has one.
/// The marker must stand alone or follow whitespace; `my_` is an identifier.
fn strip_continuation(text: &str) -> Option<&str> {
    let head = text.strip_suffix(LINE_CONTINUATION)?;
    match head.chars().last() {
        None => Some(head),
        Some(ch) if ch.is_whitespace() => Some(head),
        Some(_) => None,
    }
}

fn join_continued(head: &str, next: &str) -> String {
    match (head.is_empty(), next.is_empty()) {
        (true, _) => next.to_string(),
        (false, true) => head.to_string(),
        (false, false) => format!("{} {}", head, next),
    }
}

/// Byte offset of the first comment marker outside a string or date literal
pub fn find_comment_start(text: &str) -> Option<usize> {
    let mut in_string = false;
    let mut in_date = false;
    for (idx, ch) in text.char_indices() {
        if ch == STRING_DELIMITER && !in_date {
            in_string = !in_string;
        } else if ch == DATE_DELIMITER && !in_string {
            in_date = if in_date { false } else { opens_date_literal(text, idx) };
        } else if ch == COMMENT_MARKER && !in_string && !in_date {
            return Some(idx);
        }
    }
    None
}

/// A `#` at `idx` starts a date literal when it follows an operator, an
/// opening parenthesis or a comma and is closed later on the line.
/// `Print #1` and `#If` are not literals.
fn opens_date_literal(text: &str, idx: usize) -> bool {
    let follows_operator = text[..idx]
        .trim_end()
        .chars()
        .next_back()
        .map(|c| "=<>(,+-*/&".contains(c))
        .unwrap_or(false);
    follows_operator && text[idx + DATE_DELIMITER.len_utf8()..].contains(DATE_DELIMITER)
}

/// Split a line into its code and trailing comment (comment keeps its marker)
pub fn split_comment(text: &str) -> (&str, Option<&str>) {
    match find_comment_start(text) {
        Some(idx) => (text[..idx].trim_end(), Some(&text[idx..])),
        None => (text, None),
    }
}

/// A line stripped of its trailing comment and surrounding whitespace
pub fn code_text(text: &str) -> &str {
    split_comment(text).0.trim()
}

pub(crate) fn starts_with_rem(text: &str) -> bool {
    starts_with_word(text.trim_start(), REM_KEYWORD)
}

/// `text` starts with `word` followed by a non-identifier character or the end
pub(crate) fn starts_with_word(text: &str, word: &str) -> bool {
    match text.strip_prefix(word) {
        Some(rest) => !rest
            .chars()
            .next()
            .map(is_identifier_char)
            .unwrap_or(false),
        None => false,
    }
}

pub(crate) fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// A leading segment that keeps its colon: a bare label name, a line
/// number, or a `Case` clause.
fn is_label_head(segment: &str) -> bool {
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return false;
    }
    if starts_with_word(trimmed, "Case") {
        return true;
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    let mut chars = trimmed.chars();
    let starts_alpha = chars.next().map(|c| c.is_alphabetic()).unwrap_or(false);
    starts_alpha && trimmed.chars().all(is_identifier_char) && !classifier::is_reserved_word(trimmed)
}

/// Split a logical line into instructions on the unquoted separator.
///
/// Returns each trimmed instruction with its 1-based starting column. An
/// unquoted comment ends splitting and becomes its own instruction.
/// Separators inside `#...#` date literals do not split.
pub fn split_instructions(text: &str) -> Vec<(usize, String)> {
    let mut instructions = Vec::new();
    let mut in_string = false;
    let mut in_date = false;
    let mut start = 0;

    let push = |instructions: &mut Vec<(usize, String)>, from: usize, segment: &str| {
        let trimmed = segment.trim();
        if !trimmed.is_empty() {
            let offset = from + (segment.len() - segment.trim_start().len());
            let column = text[..offset].chars().count() + 1;
            instructions.push((column, trimmed.to_string()));
        }
    };

    if starts_with_rem(text) {
        push(&mut instructions, 0, text);
        return instructions;
    }

    for (idx, ch) in text.char_indices() {
        if in_date {
            in_date = ch != DATE_DELIMITER;
            continue;
        }
        if ch == STRING_DELIMITER {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        if ch == DATE_DELIMITER {
            in_date = opens_date_literal(text, idx);
            continue;
        }

        if ch == COMMENT_MARKER {
            push(&mut instructions, start, &text[start..idx]);
            push(&mut instructions, idx, &text[idx..]);
            return instructions;
        }

        if ch == INSTRUCTION_SEPARATOR {
            let segment = &text[start..idx];
            let keeps_marker = is_label_head(segment)
                && (instructions.is_empty() || text[idx + 1..].trim().is_empty());
            if keeps_marker {
                let end = idx + LABEL_MARKER.len_utf8();
                push(&mut instructions, start, &text[start..end]);
            } else {
                push(&mut instructions, start, segment);
            }
            start = idx + INSTRUCTION_SEPARATOR.len_utf8();

            if starts_with_rem(&text[start..]) {
                push(&mut instructions, start, &text[start..]);
                return instructions;
            }
        }
    }

    if start < text.len() {
        push(&mut instructions, start, &text[start..]);
    }

    instructions
}

/// Split on `separator` where it is outside parentheses and string literals
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        match ch {
            STRING_DELIMITER => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => depth = depth.saturating_sub(1),
            c if c == separator && !in_string && depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);

    parts
}

/// Line normalizer plus instruction classifier
pub struct Tokenizer<'m> {
    matchers: &'m [Matcher],
}

impl Default for Tokenizer<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer<'static> {
    pub fn new() -> Self {
        Tokenizer {
            matchers: &classifier::DEFAULT_MATCHERS,
        }
    }
}

impl<'m> Tokenizer<'m> {
    /// Tokenizer using a caller-supplied matcher table, tried in order
    pub fn with_matchers(matchers: &'m [Matcher]) -> Self {
        Tokenizer { matchers }
    }

    /// Tokenize a whole source file
    pub fn tokenize<S: AsRef<str>>(&self, lines: &[S]) -> Vec<Token> {
        let mut tokens = Vec::new();

        for logical in normalize_lines(lines, 1) {
            tokens.extend(self.tokenize_line(&logical));
        }

        tokens
    }

    /// Tokenize one logical line. Instructions no matcher accepts are dropped.
    pub fn tokenize_line(&self, logical: &LogicalLine) -> Vec<Token> {
        let mut tokens = Vec::new();

        for (column, instruction) in split_instructions(&logical.text) {
            let location = SourceLocation::new(logical.line, column);
            match classifier::classify_with(self.matchers, &instruction, location) {
                Some(token) => tokens.push(token),
                None => trace!(line = logical.line, column, %instruction, "unclassified instruction dropped"),
            }
        }

        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_continuation_joins_lines() {
        let lines = ["Dim x As _", "Long"];
        let logical = normalize_lines(&lines, 1);

        assert_eq!(logical.len(), 1);
        assert_eq!(logical[0].text, "Dim x As Long");
        assert_eq!(logical[0].line, 1);
    }

    #[test]
    fn test_multiple_continuations_and_blank_lines() {
        let lines = [
            "",
            "   Call Foo(a, _",
            "      b, _",
            "      c)",
            "",
            "x = 1",
        ];
        let logical = normalize_lines(&lines, 1);

        assert_eq!(logical.len(), 2);
        assert_eq!(logical[0].text, "Call Foo(a, b, c)");
        assert_eq!(logical[0].line, 2);
        assert_eq!(logical[1].text, "x = 1");
        assert_eq!(logical[1].line, 6);
    }

    #[test]
    fn test_identifier_ending_in_underscore_is_not_continuation() {
        let logical = normalize_lines(&["x = my_", "y = 2"], 1);
        assert_eq!(logical.len(), 2);
        assert_eq!(logical[0].text, "x = my_");
    }

    #[test]
    fn test_split_on_separator() {
        let parts = split_instructions("x = 1 : y = 2");
        let texts: Vec<&str> = parts.iter().map(|(_, s)| s.trim()).collect();
        assert_eq!(texts, vec!["x = 1", "y = 2"]);
        assert_eq!(parts[0].0, 1);
        assert_eq!(parts[1].0, 9);
    }

    #[test]
    fn test_split_respects_string_literals() {
        let parts = split_instructions(r#"MsgBox "a:b" : x = 1"#);
        let texts: Vec<&str> = parts.iter().map(|(_, s)| s.trim()).collect();
        assert_eq!(texts, vec![r#"MsgBox "a:b""#, "x = 1"]);
    }

    #[test]
    fn test_split_keeps_label_marker() {
        let parts = split_instructions("MyLabel:");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].1, "MyLabel:");

        let parts = split_instructions("ErrHandler: Resume Next");
        let texts: Vec<&str> = parts.iter().map(|(_, s)| s.trim()).collect();
        assert_eq!(texts, vec!["ErrHandler:", "Resume Next"]);
    }

    #[test]
    fn test_trailing_separator_after_expression_is_dropped() {
        let parts = split_instructions("x = 1 :");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].1.trim(), "x = 1");
    }

    #[test]
    fn test_comment_stops_splitting() {
        let parts = split_instructions("x = 1 ' note: not a separator");
        let texts: Vec<&str> = parts.iter().map(|(_, s)| s.trim()).collect();
        assert_eq!(texts, vec!["x = 1", "' note: not a separator"]);
    }

    #[test]
    fn test_comment_marker_inside_string_is_text() {
        assert_eq!(find_comment_start(r#"s = "it's" ' real"#), Some(11));
        assert_eq!(code_text(r#"s = "it's" ' real"#), r#"s = "it's""#);
    }

    #[test]
    fn test_split_respects_date_literals() {
        let parts = split_instructions("t = #12:30:00 PM#");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].1, "t = #12:30:00 PM#");

        let parts = split_instructions("d = #1/1/2000# : x = 1");
        let texts: Vec<&str> = parts.iter().map(|(_, s)| s.as_str()).collect();
        assert_eq!(texts, vec!["d = #1/1/2000#", "x = 1"]);

        let parts = split_instructions("If t < #8:00# Then Late = True: Log t");
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_file_number_hash_is_not_a_date() {
        let parts = split_instructions("Print #1, x: Close #1");
        let texts: Vec<&str> = parts.iter().map(|(_, s)| s.as_str()).collect();
        assert_eq!(texts, vec!["Print #1, x", "Close #1"]);
    }

    #[test]
    fn test_comment_after_date_literal() {
        assert_eq!(code_text("Const T = #12:00# ' noon"), "Const T = #12:00#");
    }

    #[test]
    fn test_split_top_level_commas() {
        let parts = split_top_level(r#"a(1, 2) As Long, b = "x,y", c"#, ',');
        let parts: Vec<&str> = parts.iter().map(|p| p.trim()).collect();
        assert_eq!(parts, vec!["a(1, 2) As Long", r#"b = "x,y""#, "c"]);
    }

    #[test]
    fn test_tokenize_multi_statement_line() {
        let tokens = Tokenizer::new().tokenize(&["x = 1 : y = 2"]);

        assert_eq!(tokens.len(), 2);
        assert!(matches!(tokens[0], Token::Expression { .. }));
        assert!(matches!(tokens[1], Token::Expression { .. }));
        assert_eq!(tokens[1].instruction().trim(), "y = 2");
    }

    #[test]
    fn test_tokenize_labels() {
        let tokens = Tokenizer::new().tokenize(&["MyLabel:", "Case 1:"]);

        assert!(matches!(
            &tokens[0],
            Token::Label { label, is_case_label: false, .. } if label == "MyLabel"
        ));
        assert!(matches!(&tokens[1], Token::Label { is_case_label: true, .. }));
    }

    #[test]
    fn test_display_format() {
        let tokens = Tokenizer::new().tokenize(&["Set x = Nothing"]);
        assert_eq!(tokens[0].to_string(), "Instruction: [Set] Set x = Nothing");
    }
}
