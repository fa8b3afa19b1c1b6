use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox as lox;

use lox::ast_printer::Ast;
use lox::driver::{self, EXIT_STATIC};
use lox::error::LoxError;
use lox::parser::Parser;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to a file (see --log-file)
    #[arg(long, global = true)]
    log: bool,

    /// Where --log writes to
    #[arg(long, global = true, default_value = "app.log")]
    log_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print the tokens as JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a program and prints its AST
    Parse {
        filename: Option<PathBuf>,

        /// Print the AST as JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: &Path) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // Mapping a zero-length file fails on some platforms.
    if len == 0 {
        return Ok(Vec::new());
    }

    // SAFETY: the mapping is copied out immediately and never outlives `file`.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map file {:?}", filename))?;

    info!("Read {} bytes from {:?}", mmap.len(), filename);

    Ok(mmap.to_vec())
}

fn read_source(filename: &Path) -> Result<String> {
    let buf = read_file(filename)?;
    String::from_utf8(buf)
        .map_err(|e| LoxError::from(e.utf8_error()))
        .with_context(|| format!("Failed to decode {:?}", filename))
}

fn init_logger(path: &Path) -> Result<()> {
    let log_file =
        File::create(path).with_context(|| format!("Failed to create {:?}", path))?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox::").unwrap_or(module);
            writeln!(
                buf,
                "[{} {}:{}] - {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to {:?}", path);
    Ok(())
}

fn no_input(command: &str) -> ! {
    info!("No filepath provided for {}", command);
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger(&args.log_file)?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            let Some(filename) = filename else {
                no_input("Tokenize")
            };
            info!("Running Tokenize subcommand");

            let source = read_source(&filename)?;
            let (tokens, errors) = driver::scan(&source);

            for e in &errors {
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&tokens)?);
            } else {
                let mut out = io::stdout().lock();
                for token in &tokens {
                    writeln!(out, "{}", token)?;
                }
            }

            if !errors.is_empty() {
                debug!("Tokenization failed, exiting with code {}", EXIT_STATIC);
                std::process::exit(EXIT_STATIC);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename, json } => {
            let Some(filename) = filename else {
                no_input("Parse")
            };
            info!("Running Parse subcommand");

            let source = read_source(&filename)?;
            let (tokens, errors) = driver::scan(&source);

            if !errors.is_empty() {
                for e in &errors {
                    eprintln!("{}", e);
                }
                std::process::exit(EXIT_STATIC);
            }

            match Parser::new(&tokens).parse() {
                Ok(statements) if json => {
                    println!("{}", serde_json::to_string_pretty(&statements)?)
                }

                Ok(statements) => {
                    info!("Parsed {} statement(s)", statements.len());
                    let mut out = io::stdout().lock();
                    for stmt in &statements {
                        let ast_str = Ast.print_stmt(stmt);
                        debug!("AST: {}", ast_str);
                        writeln!(out, "{}", ast_str)?;
                    }
                }

                Err(errors) => {
                    for e in &errors {
                        debug!("Parse debug: {}", e);
                        eprintln!("{}", e);
                    }
                    std::process::exit(EXIT_STATIC);
                }
            }

            info!("Parse subcommand completed");
        }

        Commands::Evaluate { filename } => {
            let Some(filename) = filename else {
                no_input("Evaluate")
            };
            info!("Running Evaluate subcommand");

            let source = read_source(&filename)?;

            if let Err(e) = driver::evaluate_expression(&source, io::stdout().lock()) {
                debug!("Evaluation debug: {}", e);
                eprintln!("{}", e);
                std::process::exit(e.exit_code());
            }

            info!("Evaluate subcommand completed");
        }

        Commands::Run { filename } => {
            let Some(filename) = filename else {
                no_input("Run")
            };
            info!("Running Run subcommand");

            let source = read_source(&filename)?;
            debug!("Provided input:\n {}", source);

            match driver::run(&source, io::stdout().lock()) {
                Ok(()) => info!("Program executed successfully"),

                Err(e) => {
                    debug!("Run debug: {}", e);
                    eprintln!("{}", e);
                    std::process::exit(e.exit_code());
                }
            }
        }
    }

    Ok(())
}
