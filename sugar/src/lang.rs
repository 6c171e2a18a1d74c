use std::rc::Rc;

use crate::prelude::*;

/// Name of the placeholder a tagged-record field uses to refer to the record
/// under construction.
pub const SELF: &str = "self";

#[derive(PartialEq, Eq, Hash, Clone, derive_more::Display, Debug)]
pub enum Token {
    #[display(fmt = "(")]
    LParen,
    #[display(fmt = ")")]
    RParen,
    #[display(fmt = "{{")]
    LBrace,
    #[display(fmt = "}}")]
    RBrace,
    #[display(fmt = "[")]
    LBracket,
    #[display(fmt = "]")]
    RBracket,
    #[display(fmt = ",")]
    Comma,
    #[display(fmt = ";")]
    Semicolon,
    #[display(fmt = "=")]
    Equal,
    #[display(fmt = "|")]
    Bar,
    #[display(fmt = "#")]
    Hash,

    #[display(fmt = "->")]
    Arrow,

    #[display(fmt = "{_0}")]
    Nat(Nat),
    #[display(fmt = "{_0}")]
    Ident(Identifier),
    #[display(fmt = "{_0:?}")]
    Str(Rc<String>),
    #[display(fmt = "{_0:?}")]
    Char(char),

    /// A line break followed by the given number of spaces. Only the lexer
    /// produces these; the layout pass replaces them.
    #[display(fmt = "newline")]
    Newline(usize),
    #[display(fmt = "indentation")]
    Indent,
    #[display(fmt = "newline")]
    Separator,
    #[display(fmt = "dedentation")]
    Dedent,
}

pub type TermRef = Rc<Term>;

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Binding {
    pub name: Identifier,
    pub params: Vec<Identifier>,
    pub body: TermRef,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Constructor {
    pub name: Identifier,
    pub fields: Vec<(Identifier, TermRef)>,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Term {
    /// `(x y -> body)`
    Abstract(Vec<Identifier>, TermRef),
    /// `(f x y)`
    Apply(TermRef, Vec<TermRef>),
    Variable(Identifier),
    Nat(Nat),
    List(Vec<TermRef>),
    Tuple(Vec<TermRef>),
    Char(char),
    Str(Rc<String>),
    /// `#123`
    Word(u32),
    /// `#(Ctor (field term) | Ctor ...)`
    Adt(Vec<Constructor>),
    /// `{name params = body; ...; body}`
    Let(Vec<Binding>, TermRef),
}

/// One handler per variant of [`Term`], called bottom-up by [`fold`] with the
/// already folded children.
///
/// `bind` is called on the way down whenever names come into scope, which lets
/// a folder thread its own environment through the traversal.
pub trait Fold {
    type Env: Clone;
    type Output;

    fn bind(&mut self, env: &Self::Env, _names: &[Identifier]) -> Self::Env {
        env.clone()
    }

    fn abstraction(&mut self, params: &[Identifier], body: Self::Output) -> Self::Output;
    fn application(&mut self, head: Self::Output, args: Vec<Self::Output>) -> Self::Output;
    fn variable(&mut self, env: &Self::Env, name: &Identifier) -> Self::Output;
    fn natural(&mut self, value: Nat) -> Self::Output;
    fn list(&mut self, items: Vec<Self::Output>) -> Self::Output;
    fn tuple(&mut self, items: Vec<Self::Output>) -> Self::Output;
    fn character(&mut self, value: char) -> Self::Output;
    fn string(&mut self, value: &Rc<String>) -> Self::Output;
    fn word(&mut self, value: u32) -> Self::Output;
    #[allow(clippy::type_complexity)]
    fn adt(&mut self, ctors: Vec<(Identifier, Vec<(Identifier, Self::Output)>)>) -> Self::Output;
    fn let_block(
        &mut self,
        bindings: Vec<(Identifier, Vec<Identifier>, Self::Output)>,
        body: Self::Output,
    ) -> Self::Output;
}

pub fn fold<F: Fold>(term: &Term, folder: &mut F, env: &F::Env) -> F::Output {
    match term {
        Term::Abstract(params, body) => {
            let inner = folder.bind(env, params);
            let body = fold(body, folder, &inner);
            folder.abstraction(params, body)
        }
        Term::Apply(head, args) => {
            let head = fold(head, folder, env);
            let args = args.iter().map(|arg| fold(arg, folder, env)).collect();
            folder.application(head, args)
        }
        Term::Variable(name) => folder.variable(env, name),
        Term::Nat(value) => folder.natural(*value),
        Term::List(items) => {
            let items = items.iter().map(|item| fold(item, folder, env)).collect();
            folder.list(items)
        }
        Term::Tuple(items) => {
            let items = items.iter().map(|item| fold(item, folder, env)).collect();
            folder.tuple(items)
        }
        Term::Char(value) => folder.character(*value),
        Term::Str(value) => folder.string(value),
        Term::Word(value) => folder.word(*value),
        Term::Adt(ctors) => {
            let this = folder.bind(env, &[ident(SELF)]);
            let ctors = ctors
                .iter()
                .map(|ctor| {
                    let fields = ctor
                        .fields
                        .iter()
                        .map(|(name, value)| (name.clone(), fold(value, folder, &this)))
                        .collect();
                    (ctor.name.clone(), fields)
                })
                .collect();
            folder.adt(ctors)
        }
        Term::Let(bindings, body) => {
            let names = bindings
                .iter()
                .map(|binding| binding.name.clone())
                .collect::<Vec<_>>();
            let siblings = folder.bind(env, &names);
            let bindings = bindings
                .iter()
                .map(|binding| {
                    let inner = folder.bind(&siblings, &binding.params);
                    let value = fold(&binding.body, folder, &inner);
                    (binding.name.clone(), binding.params.clone(), value)
                })
                .collect();
            let body = fold(body, folder, &siblings);
            folder.let_block(bindings, body)
        }
    }
}
