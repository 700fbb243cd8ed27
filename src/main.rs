mod cli;

use std::path::Path;
use std::process;

use clap::Parser;
use serde_json::json;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, ParserChoice, TreeFormat};
use grammatica::error_handling::paint;
use grammatica::grammar::DocumentError;
use grammatica::parser::LoadError;
use grammatica::recognizer::{cyk, linear};
use grammatica::{generate, load_grammar, normalize, recognize, FormatError, Grammar, GrammarKind, Recognition, Sampler};

#[derive(Debug, Error)]
enum Failure {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("grammar is not valid")]
    Invalid,
}

fn report(failure: &Failure) {
    match failure {
        Failure::Load(LoadError::Notation(errors)) => {
            for error in errors {
                eprintln!("{}", paint(error));
            }
        }
        other => eprintln!("\x1b[31;49;1merror:\x1b[39;49;1m {}\x1b[0m", other),
    }
}

fn write_document(grammar: &Grammar, output: Option<&Path>) -> Result<(), Failure> {
    match output {
        Some(path) => {
            grammar.save(path)?;
            info!(path = %path.display(), "wrote grammar document");
        }
        None => println!("{}", grammar.to_json_string()?),
    }
    Ok(())
}

fn validate(grammar: &Grammar) -> Result<(), Failure> {
    println!("{grammar}");
    println!();

    let diagnostics = grammar.diagnostics();
    for diagnostic in &diagnostics {
        println!("invalid: {diagnostic}");
    }
    if !diagnostics.is_empty() {
        return Err(Failure::Invalid);
    }

    println!("valid {} grammar", grammar.kind);
    println!("chomsky normal form: {}", if grammar.is_cnf() { "yes" } else { "no" });
    if grammar.kind == GrammarKind::Regular {
        println!("direction: {:?}", linear::detect_direction(grammar));
    }
    Ok(())
}

fn print_recognition(recognition: &Recognition, format: TreeFormat) -> Result<(), Failure> {
    let tree = recognition.tree();

    if format == TreeFormat::Json {
        let steps = match recognition {
            Recognition::Linear(parse) => Some(&parse.steps),
            Recognition::Cyk(_) => None,
        };
        let report = json!({
            "accepted": recognition.accepted(),
            "tree": tree,
            "steps": steps,
        });
        println!("{}", serde_json::to_string_pretty(&report).map_err(DocumentError::from)?);
        return Ok(());
    }

    println!("{}", if recognition.accepted() { "accepted" } else { "rejected" });
    if let Recognition::Linear(parse) = recognition {
        for step in &parse.steps {
            println!("  {step}");
        }
    }
    if let Some(tree) = tree {
        match format {
            TreeFormat::Text => print!("{}", tree.to_text()),
            _ => print!("{}", tree.to_boxed()),
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Failure> {
    let mut grammar = load_grammar(&cli.file, cli.kind)?;
    if let Some(start) = &cli.start {
        grammar = grammar.with_start(start.as_str());
    }

    match cli.command {
        Command::Validate => validate(&grammar)?,
        Command::Parse { tokens, parser, chars, format } => {
            let tokens = Cli::split_tokens(&tokens, chars);
            let recognition = match parser {
                ParserChoice::Auto => recognize(&grammar, &tokens)?,
                ParserChoice::Cyk => Recognition::Cyk(cyk::parse(&grammar, &tokens)?),
                ParserChoice::Linear => Recognition::Linear(linear::parse(&grammar, &tokens)),
            };
            print_recognition(&recognition, format)?;
        }
        Command::Generate { limit, max_depth } => {
            for string in generate(&grammar, limit, max_depth) {
                println!("{string}");
            }
        }
        Command::Sample { amount, max_depth, seed } => {
            for string in Sampler::new(seed).sample_many(&grammar, amount, max_depth) {
                println!("{string}");
            }
        }
        Command::Normalize { output } => write_document(&normalize(&grammar)?, output.as_deref())?,
        Command::Convert { output } => write_document(&grammar, output.as_deref())?,
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(failure) = run(cli) {
        report(&failure);
        process::exit(1);
    }
}
