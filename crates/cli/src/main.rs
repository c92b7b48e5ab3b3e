mod commands;

use std::path::{Path, PathBuf};
use std::process;

use cassia_core::Syntax;
use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Surface variant override; without it the file extension decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SyntaxArg {
    Brace,
    Indented,
}

/// Cassia stylesheet language toolchain.
#[derive(Parser)]
#[command(name = "cassia", version, about = "Cassia stylesheet language toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a stylesheet and print its AST
    Parse {
        /// Path to the .cass or .casi source file
        file: PathBuf,
        /// Override the syntax variant inferred from the extension
        #[arg(long, value_enum)]
        syntax: Option<SyntaxArg>,
    },

    /// Lex a stylesheet and print its token stream
    Tokens {
        /// Path to the .cass or .casi source file
        file: PathBuf,
        /// Override the syntax variant inferred from the extension
        #[arg(long, value_enum)]
        syntax: Option<SyntaxArg>,
    },
}

/// `.casi` selects the indented variant; everything else is brace syntax.
pub(crate) fn resolve_syntax(file: &Path, flag: Option<SyntaxArg>) -> Syntax {
    match flag {
        Some(SyntaxArg::Brace) => Syntax::Brace,
        Some(SyntaxArg::Indented) => Syntax::Indented,
        None => match file.extension().and_then(|e| e.to_str()) {
            Some("casi") => Syntax::Indented,
            _ => Syntax::Brace,
        },
    }
}

fn main() {
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Parse { file, syntax } => commands::cmd_parse(&file, syntax, cli.output),
        Commands::Tokens { file, syntax } => commands::cmd_tokens(&file, syntax, cli.output),
    };
    process::exit(code);
}
