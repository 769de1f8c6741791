// vbtree: print the syntax tree of a VB6 class or code module

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use vbtree::parser::{parse_lines, ParseOptions, Tokenizer};
use vbtree::tracing_config::init_tracing;

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    /// Indented node per line
    Tree,
    /// Whole tree as JSON
    Json,
}

/// Parse a VB6 module and print its structure
#[derive(Parser, Debug)]
#[command(name = "vbtree", version, about)]
struct Args {
    /// Module to parse (.cls or .bas)
    file: PathBuf,

    /// Print the classified instruction stream instead of the tree
    #[arg(long)]
    tokens: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Tree)]
    format: OutputFormat,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let lines: Vec<&str> = source.lines().collect();

    if args.tokens {
        for token in Tokenizer::new().tokenize(&lines) {
            let location = token.location();
            println!("{:>5}:{:<3} {}", location.line, location.column, token);
        }
        return Ok(());
    }

    let options = ParseOptions::new().with_file_name(display_name(&args.file));
    let module = parse_lines(&lines, options)?;

    match args.format {
        OutputFormat::Tree => {
            module.walk(&mut |node, depth| {
                println!("{:>5} {}{}", node.line, "  ".repeat(depth), node);
            });
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&module).context("failed to serialize tree")?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
