use std::rc::Rc;

use crate::{
    lang::{fold, Fold, Term},
    prelude::*,
};

/// Writes a rendered subtree at the end of the output buffer. Composing these
/// instead of concatenating strings keeps printing linear in the tree size.
type Shows = Box<dyn FnOnce(&mut String)>;

fn text(s: impl Into<String>) -> Shows {
    let s = s.into();
    Box::new(move |out: &mut String| out.push_str(&s))
}

fn delimited(open: char, items: Vec<Shows>, separator: &'static str, close: char) -> Shows {
    Box::new(move |out: &mut String| {
        out.push(open);
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            item(out);
        }
        out.push(close);
    })
}

fn escaped(c: char, quote: char, out: &mut String) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        c if c == quote => {
            out.push('\\');
            out.push(c);
        }
        c => out.push(c),
    }
}

fn names(params: &[Identifier]) -> String {
    params
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

struct Printer;

impl Fold for Printer {
    type Env = ();
    type Output = Result<Shows>;

    fn abstraction(&mut self, params: &[Identifier], body: Result<Shows>) -> Result<Shows> {
        let head = text(format!("({} -> ", names(params)));
        let body = body?;
        Ok(Box::new(move |out: &mut String| {
            head(out);
            body(out);
            out.push(')');
        }))
    }

    fn application(&mut self, head: Result<Shows>, args: Vec<Result<Shows>>) -> Result<Shows> {
        let items = std::iter::once(head).chain(args).collect::<Result<_>>()?;
        Ok(delimited('(', items, " ", ')'))
    }

    fn variable(&mut self, _: &(), name: &Identifier) -> Result<Shows> {
        Ok(text(name.as_str()))
    }

    fn natural(&mut self, value: Nat) -> Result<Shows> {
        Ok(text(value.to_string()))
    }

    fn list(&mut self, items: Vec<Result<Shows>>) -> Result<Shows> {
        let items = items.into_iter().collect::<Result<_>>()?;
        Ok(delimited('[', items, ",", ']'))
    }

    fn tuple(&mut self, items: Vec<Result<Shows>>) -> Result<Shows> {
        let mut items = items.into_iter().collect::<Result<Vec<_>>>()?;
        if items.len() == 1 {
            items.push(text(""));
        }
        Ok(delimited('(', items, ",", ')'))
    }

    fn character(&mut self, value: char) -> Result<Shows> {
        Ok(Box::new(move |out: &mut String| {
            out.push('\'');
            escaped(value, '\'', out);
            out.push('\'');
        }))
    }

    fn string(&mut self, value: &Rc<String>) -> Result<Shows> {
        let value = value.clone();
        Ok(Box::new(move |out: &mut String| {
            out.push('"');
            value.chars().for_each(|c| escaped(c, '"', out));
            out.push('"');
        }))
    }

    fn word(&mut self, value: u32) -> Result<Shows> {
        Ok(text(format!("#{value}")))
    }

    fn adt(&mut self, _: Vec<(Identifier, Vec<(Identifier, Result<Shows>)>)>) -> Result<Shows> {
        Err(Error::Unsupported("pretty-printed"))
    }

    fn let_block(
        &mut self,
        bindings: Vec<(Identifier, Vec<Identifier>, Result<Shows>)>,
        body: Result<Shows>,
    ) -> Result<Shows> {
        let mut items = bindings
            .into_iter()
            .map(|(name, params, value)| {
                let head = if params.is_empty() {
                    text(format!("{name} = "))
                } else {
                    text(format!("{name} {} = ", names(&params)))
                };
                let value = value?;
                Ok(Box::new(move |out: &mut String| {
                    head(out);
                    value(out);
                }) as Shows)
            })
            .collect::<Result<Vec<_>>>()?;
        items.push(body?);
        Ok(delimited('{', items, "; ", '}'))
    }
}

pub fn pretty(term: &Term) -> Result<String> {
    let shows = fold(term, &mut Printer, &())?;
    let mut out = String::new();
    shows(&mut out);
    Ok(out)
}
