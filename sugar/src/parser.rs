use std::rc::Rc;

use chumsky::prelude::*;

use crate::{
    lang::{Binding, Constructor, Term, TermRef, Token},
    prelude::*,
};

/// Characters besides alphanumerics that may appear in an identifier.
const IDENT_PUNCTUATION: &str = "_'?!.+*/<>&^%~$@:";
const INDENT_WIDTH: usize = 4;

pub trait SimpleParser<I: Clone + std::hash::Hash, O>:
    Parser<I, O, Error = ParseError<I>> + Clone
{
    #[allow(clippy::type_complexity)]
    fn spanned(self) -> chumsky::combinator::MapWithSpan<Self, fn(O, Span) -> Spanned<O>, O>
    where
        Self: Sized,
        I: std::cmp::Eq,
    {
        self.map_with_span(|value, span| Spanned { span, value })
    }

    fn refcounted(self) -> chumsky::combinator::Map<Self, fn(O) -> std::rc::Rc<O>, O>
    where
        Self: Sized,
        I: std::cmp::Eq,
    {
        self.map(Rc::new)
    }
}
impl<I: Clone + std::hash::Hash, O, T> SimpleParser<I, O> for T where
    T: Parser<I, O, Error = ParseError<I>> + Clone
{
}

pub fn lexer() -> impl SimpleParser<char, Vec<Spanned<Token>>> {
    let symbols = choice((
        just("->").to(Token::Arrow),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just('{').to(Token::LBrace),
        just('}').to(Token::RBrace),
        just('[').to(Token::LBracket),
        just(']').to(Token::RBracket),
        just(',').to(Token::Comma),
        just(';').to(Token::Semicolon),
        just('=').to(Token::Equal),
        just('|').to(Token::Bar),
        just('#').to(Token::Hash),
    ));

    let escape = just('\\').ignore_then(choice((
        just('\\'),
        just('"'),
        just('\''),
        just('n').to('\n'),
        just('t').to('\t'),
    )));
    let string = just('"')
        .ignore_then(escape.clone().or(none_of("\\\"\n")).repeated())
        .then_ignore(just('"'))
        .collect::<String>()
        .map(|s| Token::Str(Rc::new(s)));
    let character = just('\'')
        .ignore_then(escape.or(none_of("\\'\n")))
        .then_ignore(just('\''))
        .map(Token::Char);

    // Naturals and identifiers share a character set; all-digit words are naturals.
    let word = filter(|c: &char| c.is_alphanumeric() || IDENT_PUNCTUATION.contains(*c))
        .repeated()
        .at_least(1)
        .collect::<String>()
        .try_map(|word, span| {
            if word.chars().all(|c| c.is_ascii_digit()) {
                word.parse()
                    .map(Token::Nat)
                    .map_err(|e| Simple::custom(span, format!("{e}")))
            } else {
                Ok(Token::Ident(Identifier::new(word)))
            }
        });

    let newline = just('\r')
        .or_not()
        .ignore_then(just('\n'))
        .ignore_then(just(' ').repeated())
        .map(|indent| Token::Newline(indent.len()));

    let comment = just("--")
        .then(filter(|c: &char| *c != '\n').repeated())
        .ignored();
    let filler = one_of(" \t").ignored().or(comment).repeated();

    let token = choice((newline, symbols, string, character, word));
    filler
        .clone()
        .ignore_then(token.spanned().then_ignore(filler).repeated())
        .then_ignore(end())
}

/// Replaces newline tokens with explicit block structure: a line one level
/// deeper than the previous one opens a block of local definitions, a line at
/// the same level separates siblings, and shallower lines close blocks.
/// Blank lines never reach this point as anything but consecutive newlines,
/// which are dropped.
fn layout(tokens: Vec<Spanned<Token>>, eoi: Span) -> Result<Vec<Spanned<Token>>, ParseError> {
    let mut laid_out = Vec::with_capacity(tokens.len());
    let mut level = 0;
    let mut tokens = tokens.into_iter().peekable();
    while let Some(token) = tokens.next() {
        let width = match token.value {
            Token::Newline(width) => width,
            _ => {
                laid_out.push(token);
                continue;
            }
        };
        let blank = matches!(
            tokens.peek(),
            None | Some(Spanned {
                value: Token::Newline(_),
                ..
            })
        );
        if blank || laid_out.is_empty() {
            continue;
        }
        if width % INDENT_WIDTH != 0 {
            return Err(ParseError::custom(
                token.span(),
                format!("Indentation must be a multiple of {INDENT_WIDTH} spaces"),
            ));
        }
        let next = width / INDENT_WIDTH;
        if next > level + 1 {
            return Err(ParseError::custom(
                token.span(),
                "Local definitions must be indented exactly one level deeper",
            ));
        }
        let marker = |value| Spanned {
            span: token.span(),
            value,
        };
        if next == level + 1 {
            laid_out.push(marker(Token::Indent));
        } else {
            laid_out.extend((next..level).map(|_| marker(Token::Dedent)));
            laid_out.push(marker(Token::Separator));
        }
        level = next;
    }
    laid_out.extend((0..level).map(|_| Spanned {
        span: eoi.clone(),
        value: Token::Dedent,
    }));
    Ok(laid_out)
}

/// What follows the first term inside parentheses.
#[derive(Clone, Debug)]
enum Parenthesized {
    Tuple(Vec<TermRef>),
    Arguments(Vec<TermRef>),
}

fn term_parser() -> impl SimpleParser<Token, Term> {
    recursive(|term: Recursive<_, Term, _>| {
        let name = select! { Token::Ident(ident) => ident };
        let term_ref = term.refcounted();

        // (x y -> body)
        let abstraction = name
            .clone()
            .repeated()
            .at_least(1)
            .then_ignore(just(Token::Arrow))
            .then(term_ref.clone())
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map(|(params, body)| Term::Abstract(params, body))
            .labelled("abstraction");

        // name params = body
        let binding = name
            .clone()
            .then(name.clone().repeated())
            .then_ignore(just(Token::Equal))
            .then(term_ref.clone())
            .map(|((name, params), body)| Binding { name, params, body })
            .labelled("binding");

        // { binding; binding; body }
        let let_block = binding
            .clone()
            .then_ignore(just(Token::Semicolon))
            .repeated()
            .then(term_ref.clone())
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .map(|(bindings, body)| Term::Let(bindings, body))
            .labelled("let_block");

        // (a, b, ...), (a,) and (f a b ...) share their opening, so the first
        // term is parsed once and what follows it tells them apart.
        let tuple_tail = just(Token::Comma)
            .ignore_then(
                term_ref
                    .clone()
                    .separated_by(just(Token::Comma))
                    .allow_trailing(),
            )
            .map(Parenthesized::Tuple);
        let arguments = term_ref.clone().repeated().map(Parenthesized::Arguments);
        let parenthesized = term_ref
            .clone()
            .then(choice((tuple_tail, arguments)))
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .map(|(first, tail)| match tail {
                Parenthesized::Tuple(rest) => {
                    Term::Tuple(std::iter::once(first).chain(rest).collect())
                }
                Parenthesized::Arguments(args) => Term::Apply(first, args),
            })
            .labelled("tuple_or_application");

        let string = select! { Token::Str(s) => Term::Str(s) }.labelled("string");
        let character = select! { Token::Char(c) => Term::Char(c) }.labelled("character");

        let list = term_ref
            .clone()
            .separated_by(just(Token::Comma))
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map(Term::List)
            .labelled("list");

        // #(Ctor (field term) ... | Ctor ...)
        let field = name
            .clone()
            .then(term_ref.clone())
            .delimited_by(just(Token::LParen), just(Token::RParen));
        let constructor = name
            .clone()
            .then(field.repeated())
            .map(|(name, fields)| Constructor { name, fields });
        let adt = just(Token::Hash)
            .ignore_then(
                constructor
                    .separated_by(just(Token::Bar))
                    .at_least(1)
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .map(Term::Adt)
            .labelled("tagged_record");

        let word = just(Token::Hash)
            .ignore_then(select! { Token::Nat(n) => n })
            .try_map(|n, span| {
                u32::try_from(n)
                    .map(Term::Word)
                    .map_err(|_| Simple::custom(span, format!("{n} does not fit in a 32-bit word")))
            })
            .labelled("word");
        let natural = select! { Token::Nat(n) => Term::Nat(n) }.labelled("natural");
        let variable = name.map(Term::Variable).labelled("variable");

        // Every member of this group is explored and the last one to succeed
        // wins. Listing them in reverse under first-match choice picks exactly
        // that parse.
        let group = choice((adt, list, character, string, let_block));

        let inline = choice((abstraction, parenthesized, group, word, natural, variable));

        let locals = binding
            .separated_by(just(Token::Separator))
            .at_least(1)
            .delimited_by(just(Token::Indent), just(Token::Dedent));

        inline
            .then(locals.or_not())
            .map(|(term, locals)| match locals {
                Some(bindings) => Term::Let(bindings, term.into()),
                None => term,
            })
    })
    .labelled("term")
}

fn stringify<I: std::fmt::Display + Clone + std::hash::Hash + Eq>(
    es: Vec<ParseError<I>>,
) -> Error {
    Error::Parse(es.into_iter().map(|e| e.map(|t| t.to_string())).collect())
}

/// Lexes and lays out the source; the tokens the grammar actually sees.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>> {
    let len = source.chars().count();
    let tokens = lexer().parse(source).map_err(stringify)?;
    layout(tokens, len..len + 1).map_err(|e| Error::Parse(vec![e]))
}

pub fn parse(source: &str) -> Result<Term> {
    let len = source.chars().count();
    let tokens = tokenize(source)?;
    term_parser()
        .then_ignore(end())
        .parse(chumsky::Stream::from_iter(
            len..len + 1,
            tokens
                .into_iter()
                .map(|Spanned { span, value }| (value, span)),
        ))
        .map_err(stringify)
}
