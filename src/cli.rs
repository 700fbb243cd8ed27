use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use grammatica::generator::{DEFAULT_LIMIT, DEFAULT_MAX_DEPTH};
use grammatica::GrammarKind;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Grammar file: a `.json` document or the text notation
    pub file: PathBuf,

    /// Grammar kind: type2 (context-free) or type3 (regular)
    #[arg(short, long, value_name = "KIND")]
    pub kind: Option<GrammarKind>,

    /// Start symbol (default: the one stored in the grammar)
    #[arg(short, long, value_name = "SYMBOL")]
    pub start: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check the grammar and report its shape
    Validate,

    /// Test whether a string belongs to the language
    Parse {
        /// Input tokens; a single argument is split on whitespace
        #[arg(required = true)]
        tokens: Vec<String>,

        /// Recognizer to use (default: picked from the grammar kind)
        #[arg(short, long, value_enum, default_value_t = ParserChoice::Auto)]
        parser: ParserChoice,

        /// Treat every character of the input as one token
        #[arg(long)]
        chars: bool,

        #[arg(short, long, value_enum, default_value_t = TreeFormat::Boxed)]
        format: TreeFormat,
    },

    /// List the shortest strings of the language
    Generate {
        /// Number of strings
        #[arg(short = 'n', long, value_name = "LIMIT", default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Longest sentential form explored
        #[arg(long, value_name = "DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },

    /// Draw random strings from the language
    Sample {
        /// Number of strings
        #[arg(short = 'n', long, value_name = "AMOUNT", default_value_t = 1)]
        amount: usize,

        #[arg(long, value_name = "DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Convert to Chomsky normal form and print it as a document
    Normalize {
        /// Write the document here instead of stdout
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },

    /// Re-emit the grammar as a JSON document
    Convert {
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ParserChoice {
    Auto,
    Cyk,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TreeFormat {
    /// One space of indentation per level
    Text,
    /// Box-drawing branches
    Boxed,
    Json,
}

impl Cli {
    /// The input of `parse` as grammar tokens.
    pub fn split_tokens(tokens: &[String], chars: bool) -> Vec<String> {
        let joined = if tokens.len() == 1 {
            tokens[0].split_whitespace().map(str::to_string).collect()
        } else {
            tokens.to_vec()
        };
        if chars {
            joined.iter().flat_map(|t| t.chars()).map(String::from).collect()
        } else {
            joined
        }
    }
}
