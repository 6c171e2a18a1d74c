use std::fs;

use anyhow::{bail, Context as _, Result};
use ariadne::{Color, Fmt, Source};
use sugar::{
    analysis, decoder, encoder,
    error::EvalError,
    evaluator::{NormalOrder, OutOfFuel},
    lang::Term,
    parser,
    prelude::*,
    printer,
};
use util::{repl, report::build_report};

/// Reduction steps allowed per evaluation unless changed with `:fuel`.
const DEFAULT_FUEL: usize = 1_000_000;

fn report(source: &str, error: EvalError<OutOfFuel>) -> Result<()> {
    match error {
        EvalError::Sugar(Error::Parse(es)) => {
            for e in es {
                build_report(e).eprint(Source::from(source))?;
            }
        }
        e => eprintln!("{}", e.fg(Color::Red)),
    }
    Ok(())
}

type CommandResult = std::result::Result<(), EvalError<OutOfFuel>>;

/// Prints a sugared term; terms without surface syntax are reported as errors.
fn show(term: &Term) -> CommandResult {
    println!("{}", printer::pretty(term)?);
    Ok(())
}

struct Repl {
    fuel: Option<usize>,
}
impl Default for Repl {
    fn default() -> Self {
        Self {
            fuel: Some(DEFAULT_FUEL),
        }
    }
}
impl Repl {
    fn tokenize(input: &str) -> CommandResult {
        let tokens = parser::tokenize(input)?
            .iter()
            .map(Spanned::value)
            .cloned()
            .collect::<Vec<_>>();
        println!("{tokens:?}");
        Ok(())
    }

    fn parse(input: &str) -> CommandResult {
        show(&parser::parse(input)?)
    }

    fn sort(input: &str) -> CommandResult {
        show(&analysis::sort_lets(&parser::parse(input)?))
    }

    fn compile(input: &str) -> CommandResult {
        let term = analysis::sort_lets(&parser::parse(input)?);
        println!("{}", encoder::encode(&term)?);
        Ok(())
    }

    fn resugar(input: &str) -> CommandResult {
        show(&decoder::resugar(&parser::parse(input)?)?)
    }

    fn evaluate(&self, input: &str) -> CommandResult {
        let output = sugar::run(input, &NormalOrder { fuel: self.fuel })?;
        println!("{output}");
        Ok(())
    }

    fn set_fuel(&mut self, input: &str) {
        match input.trim() {
            "" => {}
            "none" => self.fuel = None,
            steps => match steps.parse() {
                Ok(steps) => self.fuel = Some(steps),
                Err(e) => eprintln!("Invalid fuel {steps:?}: {e}"),
            },
        }
        match self.fuel {
            Some(steps) => println!("fuel: {steps} steps"),
            None => println!("fuel: unlimited"),
        }
    }

    fn load(&self, path: &str) -> Result<()> {
        let path = path.trim();
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("Failed to read {path}: {e}");
                return Ok(());
            }
        };
        if let Err(e) = self.evaluate(&source) {
            report(&source, e)?;
        }
        Ok(())
    }

    fn show_help() {
        println!(
            "{}",
            r#"
term                -- same as :evaluate term
:tokenize   term    -- show the tokens after layout
:parse      term    -- show the parsed term
:sort       term    -- show the term with its local definitions sorted
:compile    term    -- show the pure lambda term
:resugar    term    -- read church encodings in the term back as sugar
:evaluate   term    -- show the normal form, read back as sugar
:fuel       [n]     -- show or set the reduction step limit (`none` for no limit)
:load       path    -- evaluate the contents of a file
:help               -- show this message

End a line with \ to continue the input on the next line.
        "#
            .trim()
        );
    }

    fn handle_repl_input(&mut self, input: &str) -> Result<()> {
        let (cmd, input) = if let Some(stripped) = input.strip_prefix(':') {
            stripped
                .trim_start()
                .split_once(char::is_whitespace)
                .unwrap_or((stripped.trim(), ""))
        } else {
            ("", input)
        };
        let result = match cmd {
            "to" | "tokenize" => Self::tokenize(input),
            "p" | "parse" => Self::parse(input),
            "s" | "sort" => Self::sort(input),
            "c" | "compile" => Self::compile(input),
            "r" | "resugar" => Self::resugar(input),
            "" | "e" | "eval" | "evaluate" => self.evaluate(input),
            "f" | "fuel" => {
                self.set_fuel(input);
                Ok(())
            }
            "l" | "load" => return self.load(input),
            "h" | "he" | "hel" | "help" => {
                Self::show_help();
                Ok(())
            }
            _ => {
                eprintln!("Unknown command {cmd}");
                Self::show_help();
                Ok(())
            }
        };
        if let Err(e) = result {
            report(input, e)?;
        }
        Ok(())
    }
}
impl repl::Repl for Repl {
    type Error = anyhow::Error;
    const HISTORY: Option<&'static str> = Some("/tmp/sugar.history");
    fn evaluate(&mut self, input: String) -> Result<(), Self::Error> {
        self.handle_repl_input(&input)
    }
}

fn main() -> Result<()> {
    if let Some(path) = std::env::args().nth(1) {
        let source =
            fs::read_to_string(&path).with_context(|| format!("Failed to read {path}"))?;
        match sugar::run(&source, &NormalOrder { fuel: Some(DEFAULT_FUEL) }) {
            Ok(output) => println!("{output}"),
            Err(e) => {
                report(&source, e)?;
                bail!("Failed to evaluate {path}");
            }
        }
        return Ok(());
    }
    println!("Hi, this is a sugared lambda calculus REPL. :h to show help");
    println!();
    repl::start_repl(Repl::default())?;
    Ok(())
}
