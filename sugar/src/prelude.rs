use std::rc::Rc;

pub type Nat = u64;
pub type Identifier = Rc<String>;

pub type Span = std::ops::Range<usize>;

#[derive(derive_more::AsRef, Clone, derive_more::Display, Debug)]
#[display(bound = "T: std::fmt::Display")]
#[display(fmt = "{value}")]
pub struct Spanned<T> {
    pub span: Span,
    #[as_ref]
    pub value: T,
}
impl<T> Spanned<T> {
    pub fn value(&self) -> &T {
        &self.value
    }
    pub fn span(&self) -> Span {
        self.span.clone()
    }
}

pub type ParseError<I = String> = chumsky::error::Simple<I, Span>;

pub use crate::error::{Error, Result};

pub fn ident(name: &str) -> Identifier {
    Identifier::new(name.to_string())
}
