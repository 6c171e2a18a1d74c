use rustyline::{error::ReadlineError, Editor};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error<E> {
    #[error(transparent)]
    Readline(ReadlineError),
    #[error("Input handler failed: {0:?}")]
    Handler(E),
}

/// A line-oriented interpreter driven by [`start_repl`].
///
/// A line ending in a backslash continues on the next one; the joined lines,
/// separated by newlines, reach [`Repl::evaluate`] as a single input.
pub trait Repl {
    type Error: std::fmt::Debug;
    const PROMPT: &'static str = ">> ";
    const CONTINUATION_PROMPT: &'static str = ".. ";
    const HISTORY: Option<&'static str> = None;
    fn evaluate(&mut self, input: String) -> Result<(), Self::Error>;
}

pub fn start_repl<R: Repl>(mut repl: R) -> Result<(), Error<R::Error>> {
    let mut editor = Editor::<()>::new();
    if let Some(history) = R::HISTORY {
        editor.load_history(history).ok();
    }
    let mut pending: Option<String> = None;
    loop {
        let prompt = if pending.is_some() {
            R::CONTINUATION_PROMPT
        } else {
            R::PROMPT
        };
        match editor.readline(prompt) {
            Ok(mut line) if line.ends_with('\\') => {
                line.pop();
                line.push('\n');
                pending.get_or_insert_with(String::new).push_str(&line);
            }
            Ok(line) => {
                let mut input = pending.take().unwrap_or_default();
                input.push_str(&line);
                if input.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(input.as_str());
                repl.evaluate(input).map_err(Error::Handler)?;
                if let Some(history) = R::HISTORY {
                    editor.save_history(history).map_err(Error::Readline)?;
                }
            }
            Err(ReadlineError::Interrupted) if pending.is_some() => {
                pending = None;
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("Bye!");
                break Ok(());
            }
            Err(e) => break Err(Error::Readline(e)),
        }
    }
}
