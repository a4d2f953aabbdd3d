use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser as _;
use monkey_lang::{evaluator, lexer::Lexer, object::Environment, parser::Parser, repl};

/// A tree-walking interpreter for the Monkey programming language. Starts an
/// interactive session unless a program is given.
#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Source file to evaluate.
    file: Option<PathBuf>,

    /// Evaluate the given program text instead of a file.
    #[arg(short, long, conflicts_with = "file")]
    eval: Option<String>,

    /// Prompt shown by the interactive session.
    #[arg(long, default_value = repl::PROMPT)]
    prompt: String,
}

/// Logs go to stderr, and only when `RUST_LOG` is set, e.g.
/// `RUST_LOG=monkey_lang=trace`.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn main() -> io::Result<()> {
    init_tracing();

    let args = Args::parse();

    let source = match (args.eval, args.file) {
        (Some(source), _) => source,
        (None, Some(path)) => fs::read_to_string(&path).map_err(|err| {
            io::Error::new(err.kind(), format!("failed to read {}: {}", path.display(), err))
        })?,
        (None, None) => {
            let stdin = io::stdin();
            return repl::start(stdin.lock(), io::stdout(), &args.prompt);
        }
    };

    run(&source)
}

fn run(source: &str) -> io::Result<()> {
    let lexer = Lexer::new(source);
    let mut parser = Parser::new(lexer);

    let program = parser.parse_program();

    if !parser.errors().is_empty() {
        repl::print_parser_errors(&mut io::stderr(), parser.errors())?;
        process::exit(1);
    }

    let mut env = Environment::new();
    let evaluated = evaluator::eval(&program, &mut env);
    println!("{}", evaluated);

    if evaluated.is_error() {
        process::exit(1);
    }

    Ok(())
}
