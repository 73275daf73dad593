//=====================================================
// File: main.rs
//=====================================================
// Author: Vesper Contributors
// License: MIT License
// Goal: VesperScript CLI entry point
// Objective: Command-line interface for executing .vsp source files,
//            with token/AST dumps and diagnostic output options
//=====================================================

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use vesperscript::config::Config;
use vesperscript::diagnostics::Diagnostics;
use vesperscript::interpreter::Interpreter;
use vesperscript::modules::ModuleRegistry;
use vesperscript::parser::Parser as AstParser;
use vesperscript::source::SourceText;
use vesperscript::tokenizer::Lexer;

#[derive(Parser, Debug)]
#[command(name = "vesper", about = "VesperScript CLI")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a .vsp source file.
    Run(RunArgs),
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// Path to the script to execute.
    script: PathBuf,

    /// Print the token stream before execution.
    #[arg(long = "print-tokens")]
    print_tokens: bool,

    /// Print the parsed AST before execution.
    #[arg(long = "print-ast")]
    print_ast: bool,

    /// Diagnostics output format.
    #[arg(long = "diagnostics", value_enum, default_value_t = DiagnosticsFormat::Text)]
    diagnostics: DiagnosticsFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DiagnosticsFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match args.command {
        Command::Run(run_args) => match run(&run_args) {
            Ok(clean) => {
                if clean {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(args: &RunArgs) -> Result<bool> {
    let text = fs::read_to_string(&args.script)
        .with_context(|| format!("failed reading {}", args.script.display()))?;
    let source = SourceText::new(args.script.display().to_string(), text);

    let mut diagnostics = Diagnostics::new();
    if args.print_tokens {
        let tokens = Lexer::new(&source, &mut diagnostics).tokenize();
        for token in &tokens {
            println!("{:?} {:?}", token.kind, token.lexeme);
        }
        diagnostics.clear();
    }
    if args.print_ast {
        let tokens = Lexer::new(&source, &mut diagnostics).tokenize();
        let mut parser = AstParser::new(tokens);
        let program = parser.parse();
        println!("{program:#?}");
        diagnostics.clear();
    }

    let config_dir = args
        .script
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let config = Config::discover(&config_dir).context("failed loading vesper.toml")?;
    let registry = ModuleRegistry::with_defaults(&config.modules);
    let mut interpreter = Interpreter::new(registry);
    let outcome = interpreter.run_source(&source, &mut diagnostics);

    emit_diagnostics(&diagnostics, args.diagnostics)?;
    match outcome {
        Ok(()) => Ok(true),
        Err(error) => {
            eprintln!("{error}");
            Ok(false)
        }
    }
}

fn emit_diagnostics(diagnostics: &Diagnostics, format: DiagnosticsFormat) -> Result<()> {
    if diagnostics.is_empty() {
        return Ok(());
    }
    match format {
        DiagnosticsFormat::Text => {
            for entry in diagnostics.entries() {
                match &entry.position {
                    Some(position) => {
                        eprintln!("{:?}: {} ({})", entry.kind, entry.message, position)
                    }
                    None => eprintln!("{:?}: {}", entry.kind, entry.message),
                }
            }
        }
        DiagnosticsFormat::Json => {
            let rendered = serde_json::to_string_pretty(diagnostics.entries())
                .context("failed serializing diagnostics")?;
            eprintln!("{rendered}");
        }
    }
    Ok(())
}

//=====================================================
// End of file
//=====================================================
