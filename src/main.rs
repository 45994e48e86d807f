use std::fs::read_to_string;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use loxscan::scanner::scan;

use crate::repl::MultilineInput;

mod repl;

// sysexits.h
const EXIT_USAGE: u8 = 64;
const EXIT_DATA_ERROR: u8 = 65;
const EXIT_NO_INPUT: u8 = 66;

/// Tokenize Lox source and print one token per line.
#[derive(Parser, Debug)]
#[command(name = "loxscan", version, about, long_about = None)]
struct Cli {
    /// Script to scan. Starts an interactive prompt when omitted.
    script: Option<PathBuf>,

    /// Log scanner activity at debug level (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    IoError(#[from] io::Error),
    #[error("file does not seem to exist {0}")]
    FileDoesNotExist(String),
}

/// How a driver invocation ended, before it becomes a process exit status.
#[derive(Debug)]
enum Outcome {
    Usage(ErrorKind),
    MissingFile,
    Scanned { had_error: bool },
}

fn exit_status(outcome: &Outcome) -> u8 {
    match outcome {
        Outcome::Usage(ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => 0,
        Outcome::Usage(_) => EXIT_USAGE,
        Outcome::MissingFile => EXIT_NO_INPUT,
        Outcome::Scanned { had_error: true } => EXIT_DATA_ERROR,
        Outcome::Scanned { had_error: false } => 0,
    }
}

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print()?;
            return Ok(ExitCode::from(exit_status(&Outcome::Usage(err.kind()))));
        }
    };
    init_tracing(cli.verbose);

    let outcome = match cli.script {
        Some(path) => match run_file(&path) {
            Ok(had_error) => Outcome::Scanned { had_error },
            Err(CliError::FileDoesNotExist(path)) => {
                eprintln!("file does not seem to exist {path}");
                Outcome::MissingFile
            }
            Err(err) => return Err(err.into()),
        },
        None => {
            run_prompt()?;
            Outcome::Scanned { had_error: false }
        }
    };
    Ok(ExitCode::from(exit_status(&outcome)))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Returns whether any lexical error was reported.
fn run_file(path: &Path) -> Result<bool, CliError> {
    if !path.try_exists()? {
        return Err(CliError::FileDoesNotExist(path.display().to_string()));
    }
    let source = read_to_string(path)?;
    info!(path = %path.display(), bytes = source.len(), "scanning file");

    Ok(run(&source, &mut io::stdout().lock(), &mut io::stderr().lock())?)
}

fn run_prompt() -> Result<(), CliError> {
    fn prompt() -> io::Result<()> {
        print!("> ");
        io::stdout().flush()
    }

    prompt()?;
    for entry in MultilineInput::new(io::stdin().lock().lines()) {
        // each entry starts with a clean error flag
        let had_error = run(&entry?, &mut io::stdout().lock(), &mut io::stderr().lock())?;
        debug!(had_error, "prompt entry scanned");
        prompt()?;
    }
    Ok(())
}

/// Scan `source`, print its tokens to `writer` and lexical errors to `error_writer`.
/// Returns whether any error was reported.
fn run<W: Write, E: Write>(
    source: &str,
    writer: &mut W,
    error_writer: &mut E,
) -> io::Result<bool> {
    let output = scan(source);
    for err in &output.errors {
        report(error_writer, err.line(), "", &err.to_string())?;
    }
    for token in &output.tokens {
        writeln!(writer, "{token}")?;
    }
    Ok(output.has_errors())
}

fn report<E: Write>(
    error_writer: &mut E,
    line: usize,
    location: &str,
    message: &str,
) -> io::Result<()> {
    writeln!(error_writer, "[line {line}] Error{location}: {message}")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use crate::{exit_status, run, Cli, Outcome};

    fn run_to_strings(source: &str) -> (String, String, bool) {
        let mut output = vec![];
        let mut errors = vec![];
        let had_error = run(source, &mut output, &mut errors).unwrap();
        (
            String::from_utf8(output).unwrap(),
            String::from_utf8(errors).unwrap(),
            had_error,
        )
    }

    fn usage_status(args: &[&str]) -> u8 {
        let err = Cli::try_parse_from(args.iter().copied()).unwrap_err();
        exit_status(&Outcome::Usage(err.kind()))
    }

    #[test]
    fn test_run_prints_one_token_per_line() {
        let (output, errors, had_error) = run_to_strings("var x = \"hi\";");
        assert!(!had_error);
        assert_eq!(errors, "");
        assert_eq!(
            output,
            "VAR var null\n\
             IDENTIFIER x null\n\
             EQUAL = null\n\
             STRING \"hi\" hi\n\
             SEMICOLON ; null\n\
             EOF  null\n"
        );
    }

    #[test]
    fn test_run_flags_errors_but_prints_the_rest() {
        let (output, errors, had_error) = run_to_strings("1 ? 2");
        assert!(had_error);
        assert_eq!(output, "NUMBER 1 1.0\nNUMBER 2 2.0\nEOF  null\n");
        assert_eq!(errors, "[line 1] Error: Unexpected character: ?\n");
    }

    #[test]
    fn test_run_reports_unterminated_string_on_last_line() {
        let (output, errors, had_error) = run_to_strings("print\n\"abc\ndef");
        assert!(had_error);
        assert_eq!(output, "PRINT print null\nEOF  null\n");
        assert_eq!(errors, "[line 3] Error: Unterminated string.\n");
    }

    #[test]
    fn test_scan_exit_statuses() {
        assert_eq!(exit_status(&Outcome::Scanned { had_error: false }), 0);
        assert_eq!(exit_status(&Outcome::Scanned { had_error: true }), 65);
        assert_eq!(exit_status(&Outcome::MissingFile), 66);
    }

    #[test]
    fn test_usage_errors_exit_64() {
        assert_eq!(usage_status(&["loxscan", "a", "b"]), 64);
        assert_eq!(usage_status(&["loxscan", "--bogus"]), 64);
    }

    #[test]
    fn test_help_and_version_exit_cleanly() {
        assert_eq!(usage_status(&["loxscan", "--help"]), 0);
        assert_eq!(usage_status(&["loxscan", "--version"]), 0);
    }

    #[test]
    fn test_cli_accepts_script_and_verbose() {
        let cli = Cli::try_parse_from(["loxscan", "-v", "script.lox"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.script, Some(PathBuf::from("script.lox")));
    }
}
