use std::io::{self, BufRead, Write};

use crate::evaluator;
use crate::lexer::Lexer;
use crate::object::Environment;
use crate::parser::{Parser, ParserError};

pub const PROMPT: &str = ">> ";

const MONKEY_FACE: &str = r#"            __,__
   .--.  .-"     "-.  .--.
  / .. \/  .-. .-.  \/ .. \
 | |  '|  /   Y   \  |'  | |
 | \   \  \ 0 | 0 /  /   / |
  \ '- ,\.-"""""""-./, -' /
   ''-' /_   ^ ^   _\ '-''
       |  \._   _./  |
       \   \ '~' /   /
        '._ '-=-' _.'
           '-----'
"#;

/// Reads one line at a time from `input`, evaluates it and writes the result to
/// `output`. Bindings made on one line stay visible to the following lines.
/// Returns once `input` is exhausted.
pub fn start<R: BufRead, W: Write>(mut input: R, mut output: W, prompt: &str) -> io::Result<()> {
    let mut env = Environment::new();

    loop {
        write!(output, "{}", prompt)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(());
        }

        let lexer = Lexer::new(&line);
        let mut parser = Parser::new(lexer);

        let program = parser.parse_program();

        if !parser.errors().is_empty() {
            print_parser_errors(&mut output, parser.errors())?;
            continue;
        }

        let evaluated = evaluator::eval(&program, &mut env);
        writeln!(output, "{}", evaluated)?;
    }
}

pub fn print_parser_errors<W: Write>(output: &mut W, errors: &[ParserError]) -> io::Result<()> {
    write!(output, "{}", MONKEY_FACE)?;
    writeln!(output, "Woops! we ran into some monkey business here!")?;
    writeln!(output, "parse error:")?;
    for error in errors {
        writeln!(output, "\t{}", error)?;
    }
    Ok(())
}
