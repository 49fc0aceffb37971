use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rlox::ast_printer::AstPrinter;
use rlox::error::LoxError;
use rlox::interpreter::Interpreter;
use rlox::parser::Parser;
use rlox::resolver::Resolver;
use rlox::scanner::Scanner;
use rlox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
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
    Tokenize { filename: PathBuf },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs a file as a Lox program, or starts an interactive prompt
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file into a Vec<u8>.
fn read_file(filename: &PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Write to file with module path and source line, Debug by default
    // (override with RUST_LOG).
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rlox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));

            writeln!(
                buf,
                "[{}:{}] - {}",
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

/// Scan the whole buffer, splitting tokens from lexical errors so every
/// error can be reported in one pass.
fn scan_all(source: &[u8]) -> (Vec<Token>, Vec<LoxError>) {
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<LoxError> = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    (tokens, errors)
}

/// Outcome of one scan/parse/resolve/interpret round.
enum RunOutcome {
    Ok,
    StaticError,
    RuntimeError,
}

/// Run one source buffer through the full pipeline against a persistent
/// interpreter.  `first_id` threads the parser's node-id counter across
/// prompt lines so resolution-table keys never collide.
fn run_source(source: &[u8], interpreter: &mut Interpreter, first_id: &mut usize) -> RunOutcome {
    let (tokens, lex_errors) = scan_all(source);

    if !lex_errors.is_empty() {
        for e in &lex_errors {
            eprintln!("{}", e);
        }

        return RunOutcome::StaticError;
    }

    let mut parser = Parser::starting_at(tokens, *first_id);

    let statements = match parser.parse() {
        Ok(statements) => statements,

        Err(errors) => {
            for e in &errors {
                eprintln!("{}", e);
            }

            return RunOutcome::StaticError;
        }
    };

    *first_id = parser.next_node_id();

    // Resolution must complete for the whole program before any statement
    // executes; any reported error suppresses interpretation entirely.
    let resolve_errors = Resolver::new(interpreter).resolve(&statements);

    if !resolve_errors.is_empty() {
        for e in &resolve_errors {
            eprintln!("{}", e);
        }

        return RunOutcome::StaticError;
    }

    match interpreter.interpret(&statements) {
        Ok(()) => RunOutcome::Ok,

        Err(e) => {
            debug!("Runtime error: {}", e);
            eprintln!("{}", e);

            RunOutcome::RuntimeError
        }
    }
}

/// Interactive prompt: errors are reported and the session continues.
fn run_prompt() -> Result<()> {
    let mut interpreter = Interpreter::new();
    let mut first_id: usize = 0;

    let stdin = std::io::stdin();

    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        let bytes = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        if bytes == 0 {
            info!("EOF on stdin, leaving prompt");
            return Ok(());
        }

        run_source(line.as_bytes(), &mut interpreter, &mut first_id);
    }
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided.
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
            info!("Running Tokenize subcommand");

            let buf = read_file(&filename)?;
            let mut tokenized = true;

            for result in Scanner::new(&buf) {
                match result {
                    Ok(token) => println!("{}", token),

                    Err(e) => {
                        tokenized = false;
                        eprintln!("{}", e);
                    }
                }
            }

            if !tokenized {
                debug!("Tokenization failed, exiting with code 65");
                std::process::exit(65);
            }
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");

            let buf = read_file(&filename)?;
            let (tokens, lex_errors) = scan_all(&buf);

            if !lex_errors.is_empty() {
                for e in &lex_errors {
                    eprintln!("{}", e);
                }

                std::process::exit(65);
            }

            match Parser::new(tokens).parse_expression() {
                Ok(expr) => println!("{}", AstPrinter.print(&expr)),

                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(65);
                }
            }
        }

        Commands::Evaluate { filename } => {
            info!("Running Evaluate subcommand");

            let buf = read_file(&filename)?;
            let (tokens, lex_errors) = scan_all(&buf);

            if !lex_errors.is_empty() {
                for e in &lex_errors {
                    eprintln!("{}", e);
                }

                std::process::exit(65);
            }

            let expr = match Parser::new(tokens).parse_expression() {
                Ok(expr) => expr,

                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(65);
                }
            };

            let mut interpreter = Interpreter::new();

            match interpreter.evaluate(&expr) {
                Ok(value) => println!("{}", value),

                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(70);
                }
            }
        }

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");

                let buf = read_file(&filename)?;
                let mut interpreter = Interpreter::new();
                let mut first_id: usize = 0;

                match run_source(&buf, &mut interpreter, &mut first_id) {
                    RunOutcome::Ok => info!("Program executed successfully"),
                    RunOutcome::StaticError => std::process::exit(65),
                    RunOutcome::RuntimeError => std::process::exit(70),
                }
            }

            None => {
                info!("No filepath provided, starting interactive prompt");
                run_prompt()?;
            }
        },
    }

    Ok(())
}
