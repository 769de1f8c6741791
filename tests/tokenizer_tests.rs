// Tokenizer tests over whole modules

use std::fs;
use std::path::PathBuf;

use vbtree::parser::classifier::{self, Matcher};
use vbtree::parser::{Token, Tokenizer};

fn demo_lines(name: &str) -> Vec<String> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name);
    fs::read_to_string(path)
        .expect("demo file")
        .lines()
        .map(str::to_string)
        .collect()
}

fn tokens_on_line(tokens: &[Token], line: usize) -> Vec<&Token> {
    tokens.iter().filter(|t| t.location().line == line).collect()
}

#[test]
fn test_separator_splits_instructions() {
    let tokens = Tokenizer::new().tokenize(&demo_lines("Account.cls"));

    let line = tokens_on_line(&tokens, 44);
    assert_eq!(line.len(), 2);
    assert!(matches!(line[0], Token::Expression { .. }));
    assert!(matches!(line[1], Token::ProcedureCall { target, .. } if target == "mHistory.Add"));
    assert!(line[0].location().column < line[1].location().column);
}

#[test]
fn test_separator_inside_string_is_text() {
    let tokens = Tokenizer::new().tokenize(&demo_lines("Account.cls"));

    let line = tokens_on_line(&tokens, 42);
    assert_eq!(line.len(), 1);
    assert!(line[0].instruction().contains("positive: "));
}

#[test]
fn test_continuation_reports_first_physical_line() {
    let tokens = Tokenizer::new().tokenize(&demo_lines("Account.cls"));

    assert!(tokens_on_line(&tokens, 40).is_empty());
    let signature = tokens_on_line(&tokens, 39);
    assert_eq!(signature.len(), 1);
    assert!(matches!(signature[0], Token::Declaration { keyword, .. } if keyword == "Public"));
    assert!(signature[0].instruction().ends_with("As Currency"));
}

#[test]
fn test_header_and_comments() {
    let tokens = Tokenizer::new().tokenize(&demo_lines("Account.cls"));

    let attributes = tokens.iter().filter(|t| matches!(t, Token::Attribute { .. })).count();
    assert_eq!(attributes, 6);

    let line = tokens_on_line(&tokens, 20);
    assert_eq!(line.len(), 2);
    assert!(matches!(line[1], Token::Comment { text, .. } if text == "' transactions"));
}

#[test]
fn test_every_instruction_is_kept() {
    let lines = demo_lines("Helpers.bas");
    let tokens = Tokenizer::new().tokenize(&lines);

    // "Dim start As Long: start = GetTickCount" yields two tokens
    let line = tokens_on_line(&tokens, 21);
    assert_eq!(line.len(), 2);
    assert!(matches!(line[0], Token::Declaration { keyword, .. } if keyword == "Dim"));
    assert!(matches!(line[1], Token::Expression { .. }));

    let statements: Vec<&str> = tokens
        .iter()
        .filter_map(|t| match t {
            Token::Statement { keyword, .. } => Some(keyword.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(statements, vec!["If", "If", "Else", "Do", "Loop"]);
}

#[test]
fn test_restricted_matcher_table() {
    let matchers: [Matcher; 2] = [classifier::match_comment, classifier::match_attribute];
    let tokens = Tokenizer::with_matchers(&matchers).tokenize(&demo_lines("Helpers.bas"));

    assert_eq!(tokens.len(), 1);
    assert!(matches!(tokens[0], Token::Attribute { .. }));
}
