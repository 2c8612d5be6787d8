use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use cardexpr::error::ExprError;
use cardexpr::printer::Printer;
use cardexpr::scanner::Scanner;
use cardexpr::{parse, Environment, Evaluator};

#[derive(ClapParser, Debug)]
#[command(version, about = "Chain-expression language for card game scripts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses input from a file as a single script and prints its canonical form
    Parse {
        filename: Option<PathBuf>,

        /// Print the syntax tree as JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Evaluates input from a file as a single script and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Evaluates each non-blank line of a file in order against one environment
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file into a String
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("cardexpr::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
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
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Exit code for a script error: 65 for malformed source, 70 otherwise.
fn exit_code(error: &ExprError) -> i32 {
    match error {
        ExprError::Parse { .. } => 65,
        _ => 70,
    }
}

fn no_input() -> ! {
    info!("No filepath provided");
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => {
            let Some(filename) = filename else { no_input() };

            info!("Running Tokenize subcommand");
            let source = read_file(filename)?;
            let mut tokenized = true;

            for token in Scanner::new(&source) {
                match token {
                    Ok(token) => {
                        debug!("Scanned token: {}", token);

                        println!("{}", token);
                    }

                    Err(e) => {
                        tokenized = false;

                        debug!("Tokenization debug: {}", e);

                        eprintln!("{}", e);
                    }
                }
            }

            if !tokenized {
                debug!("Tokenization failed, exiting with code 65");

                std::process::exit(65);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename, json } => {
            let Some(filename) = filename else { no_input() };

            info!("Running Parse subcommand");
            let source = read_file(filename)?;

            match parse(&source) {
                Ok(expr) => {
                    if json {
                        let rendered = serde_json::to_string_pretty(&expr)
                            .context("Failed to serialize syntax tree")?;
                        println!("{}", rendered);
                    } else {
                        println!("{}", Printer.print(&expr));
                    }
                }

                Err(e) => {
                    debug!("Parse debug: {}", e);
                    eprintln!("{}", e);
                    std::process::exit(65);
                }
            }

            info!("Parse subcommand completed");
        }

        Commands::Evaluate { filename } => {
            let Some(filename) = filename else { no_input() };

            info!("Running Evaluate subcommand");
            let source = read_file(filename)?;
            let mut env = Environment::with_prelude();

            match Evaluator::new().evaluate_source(&mut env, &source) {
                Ok(value) => {
                    debug!("Evaluated to: {}", value);
                    println!("{}", value);
                }

                Err(e) => {
                    debug!("Evaluation debug: {}", e);
                    eprintln!("{}", e);
                    std::process::exit(exit_code(&e));
                }
            }

            info!("Evaluate subcommand completed");
        }

        Commands::Run { filename } => {
            let Some(filename) = filename else { no_input() };

            info!("Running Run subcommand");
            let source = read_file(filename)?;
            let mut env = Environment::with_prelude();
            let eval = Evaluator::new();

            for (number, line) in source.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }

                match eval.evaluate_source(&mut env, line) {
                    Ok(value) => {
                        debug!("Line {} evaluated to: {}", number + 1, value);

                        if !value.is_empty() {
                            println!("{}", value);
                        }
                    }

                    Err(e) => {
                        debug!("Runtime debug: {}", e);
                        eprintln!("line {}: {}", number + 1, e);
                        std::process::exit(exit_code(&e));
                    }
                }
            }

            info!("Program executed successfully");
        }
    }

    Ok(())
}
