use rpds::Stack;

use crate::{
    lang::{Binding, Constructor, Term, TermRef, SELF},
    prelude::*,
    term::{self, Index},
};

#[derive(Clone, Debug)]
enum Binder {
    Named(Identifier),
    /// Introduced by the encoding itself; never visible to the source.
    Anonymous,
    /// The record a tagged-record field belongs to.
    This,
}

#[derive(Default, Clone, Debug)]
struct Scope {
    binders: Stack<Binder>,
}
impl Scope {
    fn pushed(&self, name: &Identifier) -> Self {
        Self {
            binders: self.binders.push(Binder::Named(name.clone())),
        }
    }
    fn anonymous(&self, count: usize) -> Self {
        let binders = (0..count).fold(self.binders.clone(), |binders, _| {
            binders.push(Binder::Anonymous)
        });
        Self { binders }
    }
    fn this_pushed(&self) -> Self {
        Self {
            binders: self.binders.push(Binder::This),
        }
    }

    /// The index `name` refers to, and whether it is the record placeholder.
    fn lookup(&self, name: &Identifier) -> Option<(Index, bool)> {
        self.binders
            .iter()
            .enumerate()
            .find_map(|(i, binder)| match binder {
                Binder::Named(n) if n == name => Some((i, false)),
                Binder::This if name.as_str() == SELF => Some((i, true)),
                _ => None,
            })
    }
}

/// Encodes one element of a Church list or tuple, given the scope the element
/// ends up in.
type Element<'a> = Box<dyn FnOnce(&Scope) -> Result<term::Term> + 'a>;

fn var(index: Index) -> term::Term {
    term::Term::Variable(index)
}

/// `λc. λn. c e1 (c e2 (... n))`
fn church_list(scope: &Scope, items: Vec<Element>) -> Result<term::Term> {
    let inner = scope.anonymous(2);
    let body = items
        .into_iter()
        .rev()
        .try_fold(var(0), |tail, item| -> Result<term::Term> {
            Ok(var(1).applied(item(&inner)?).applied(tail))
        })?;
    Ok(body.abstracted(2))
}

/// `λk. k e1 e2 ...`
fn church_tuple(scope: &Scope, items: Vec<Element>) -> Result<term::Term> {
    let inner = scope.anonymous(1);
    let body = items
        .into_iter()
        .try_fold(var(0), |head, item| -> Result<term::Term> {
            Ok(head.applied(item(&inner)?))
        })?;
    Ok(body.abstracted(1))
}

fn closed<'a>(term: term::Term) -> Element<'a> {
    Box::new(move |_: &Scope| Ok(term))
}

fn elements<'a>(terms: &'a [TermRef]) -> Vec<Element<'a>> {
    terms
        .iter()
        .map(|t| Box::new(move |scope: &Scope| encode_in(scope, t)) as Element)
        .collect()
}

fn natural(n: Nat) -> term::Term {
    (0..n)
        .fold(var(0), |acc, _| var(1).applied(acc))
        .abstracted(2)
}

fn bit(set: bool) -> term::Term {
    var(if set { 0 } else { 1 }).abstracted(2)
}

/// Fixed-width tuple of bits, most significant first.
fn bits(value: u32, width: u32) -> Result<term::Term> {
    let items = (0..width)
        .rev()
        .map(|i| closed(bit((value >> i) & 1 == 1)))
        .collect::<Vec<_>>();
    church_tuple(&Scope::default(), items)
}

fn character(c: char) -> Result<term::Term> {
    let byte = u8::try_from(c).map_err(|_| Error::CharOutOfRange(c))?;
    bits(byte.into(), 8)
}

fn string(value: &str) -> Result<term::Term> {
    let items = value
        .chars()
        .map(|c| character(c).map(closed))
        .collect::<Result<Vec<_>>>()?;
    church_list(&Scope::default(), items)
}

fn abstraction(scope: &Scope, params: &[Identifier], body: &Term) -> Result<term::Term> {
    let inner = params.iter().fold(scope.clone(), |s, p| s.pushed(p));
    Ok(encode_in(&inner, body)?.abstracted(params.len()))
}

fn let_block(scope: &Scope, bindings: &[Binding], body: &Term) -> Result<term::Term> {
    let Some((first, rest)) = bindings.split_first() else {
        return encode_in(scope, body);
    };
    let value = abstraction(scope, &first.params, &first.body)?;
    let rest = let_block(&scope.pushed(&first.name), rest, body)?;
    Ok(rest.abstracted(1).applied(value))
}

/// `λk. k [(name, [(field, λself. value), ...]), ...]`
fn record(scope: &Scope, ctors: &[Constructor]) -> Result<term::Term> {
    let ctors = ctors
        .iter()
        .map(|ctor| Box::new(move |scope: &Scope| constructor(scope, ctor)) as Element)
        .collect::<Vec<_>>();
    Ok(var(0)
        .applied(church_list(&scope.anonymous(1), ctors)?)
        .abstracted(1))
}

fn constructor(scope: &Scope, ctor: &Constructor) -> Result<term::Term> {
    let fields = ctor
        .fields
        .iter()
        .map(|(name, value)| Box::new(move |scope: &Scope| field(scope, name, value)) as Element)
        .collect::<Vec<_>>();
    let fields = Box::new(move |scope: &Scope| church_list(scope, fields)) as Element;
    church_tuple(scope, vec![closed(string(&ctor.name)?), fields])
}

fn field(scope: &Scope, name: &str, value: &Term) -> Result<term::Term> {
    let thunk = Box::new(move |scope: &Scope| -> Result<term::Term> {
        Ok(encode_in(&scope.this_pushed(), value)?.abstracted(1))
    }) as Element;
    church_tuple(scope, vec![closed(string(name)?), thunk])
}

fn encode_in(scope: &Scope, term: &Term) -> Result<term::Term> {
    match term {
        Term::Variable(name) => match scope.lookup(name) {
            Some((i, false)) => Ok(var(i)),
            Some((i, true)) => Ok(var(i).applied(var(i))),
            None => Err(Error::UnboundVariable(name.to_string())),
        },
        Term::Abstract(params, body) => abstraction(scope, params, body),
        Term::Apply(head, args) => args
            .iter()
            .try_fold(encode_in(scope, head)?, |f, arg| -> Result<term::Term> {
                Ok(f.applied(encode_in(scope, arg)?))
            }),
        Term::Nat(n) => Ok(natural(*n)),
        Term::List(items) => church_list(scope, elements(items)),
        Term::Tuple(items) => church_tuple(scope, elements(items)),
        Term::Char(c) => character(*c),
        Term::Str(s) => string(s),
        Term::Word(w) => bits(*w, 32),
        Term::Adt(ctors) => record(scope, ctors),
        Term::Let(bindings, body) => let_block(scope, bindings, body),
    }
}

/// Translates a sugared term into the pure calculus. Every variable must be
/// bound; `self` is only bound inside tagged-record fields.
pub fn encode(term: &Term) -> Result<term::Term> {
    encode_in(&Scope::default(), term)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{lang::build, parser::parse};

    fn lam(body: term::Term) -> term::Term {
        body.abstracted(1)
    }
    fn encoded(source: &str) -> term::Term {
        encode(&parse(source).unwrap()).unwrap()
    }
    fn encoded_err(source: &str) -> Error {
        encode(&parse(source).unwrap()).unwrap_err()
    }
    fn bit_tuple(bits: &[bool]) -> term::Term {
        lam(bits.iter().fold(var(0), |k, b| k.applied(bit(*b))))
    }

    #[test]
    fn test_abstraction_and_application() {
        assert_eq!(encoded("(x -> x)"), lam(var(0)));
        assert_eq!(encoded("(x y -> x)"), lam(lam(var(1))));
        // (f x -> (f x x)) curries left to right
        assert_eq!(
            encoded("(f x -> (f x x))"),
            lam(lam(var(1).applied(var(0)).applied(var(0))))
        );
        assert_eq!(encoded("(x -> (x))"), lam(var(0)));
    }

    #[test]
    fn test_naturals() {
        assert_eq!(encoded("0"), lam(lam(var(0))));
        assert_eq!(
            encoded("2"),
            lam(lam(var(1).applied(var(1).applied(var(0)))))
        );
    }

    #[test]
    fn test_lists_and_tuples_shift_their_elements() {
        // (x -> [x]) ~> λx. λc. λn. c x n
        assert_eq!(
            encoded("(x -> [x])"),
            lam(lam(lam(var(1).applied(var(2)).applied(var(0)))))
        );
        assert_eq!(encoded("[]"), encoded("0"));
        // (x -> (x, 0)) ~> λx. λk. k x 0
        assert_eq!(
            encoded("(x -> (x, 0))"),
            lam(lam(var(0).applied(var(1)).applied(natural(0))))
        );
    }

    #[test]
    fn test_characters_and_words() {
        // 'A' = 0b0100_0001
        assert_eq!(
            encoded("'A'"),
            bit_tuple(&[false, true, false, false, false, false, false, true])
        );
        let mut one = [false; 32];
        one[31] = true;
        assert_eq!(encoded("#1"), bit_tuple(&one));
        assert_eq!(encoded("#4294967295"), bit_tuple(&[true; 32]));

        assert!(matches!(
            encode(&Term::Char('λ')),
            Err(Error::CharOutOfRange('λ'))
        ));
        assert!(encode(&build::string("naïve")).is_ok());
        assert!(encode(&build::string("→")).is_err());
    }

    #[test]
    fn test_strings_are_lists_of_characters() {
        assert_eq!(
            encoded("\"ab\""),
            encode(&Term::List(vec![
                Term::Char('a').into(),
                Term::Char('b').into()
            ]))
            .unwrap()
        );
        assert_eq!(encoded("\"\""), encoded("[]"));
    }

    #[test]
    fn test_let_blocks() {
        // {id x = x; (id 1)} ~> (λid. id 1) (λx. x)
        assert_eq!(
            encoded("{id x = x; (id 1)}"),
            lam(var(0).applied(natural(1))).applied(lam(var(0)))
        );
        // later bindings see earlier ones
        assert_eq!(
            encoded("{a = 1; b = a; b}"),
            lam(lam(var(0)).applied(var(0))).applied(natural(1))
        );
        let term = Term::Let(vec![build::binding("a", &[], build::var("b"))], build::var("a"));
        assert!(matches!(
            encode(&term),
            Err(Error::UnboundVariable(name)) if name == "b"
        ));
    }

    #[test]
    fn test_unbound_variables() {
        assert!(matches!(
            encode(&build::lambda(&["x"], build::var("y"))),
            Err(Error::UnboundVariable(name)) if name == "y"
        ));
        assert!(matches!(
            encoded_err("self"),
            Error::UnboundVariable(name) if name == "self"
        ));
    }

    #[test]
    fn test_tagged_records() {
        let tuple = |items: Vec<term::Term>| {
            church_tuple(&Scope::default(), items.into_iter().map(closed).collect()).unwrap()
        };
        let list = |items: Vec<term::Term>| {
            church_list(&Scope::default(), items.into_iter().map(closed).collect()).unwrap()
        };
        // #(C (f self)) ~> λk. k [("C", [("f", λself. self self)])]
        let field = tuple(vec![string("f").unwrap(), lam(var(0).applied(var(0)))]);
        let ctor = tuple(vec![string("C").unwrap(), list(vec![field])]);
        assert_eq!(
            encoded("#(C (f self))"),
            lam(var(0).applied(list(vec![ctor])))
        );

        // free variables inside fields skip every binder the encoding adds
        assert!(matches!(
            encode(&parse("(x -> #(C (f x) | D))").unwrap()),
            Ok(term::Term::Abstract(_))
        ));
        assert!(matches!(
            encoded_err("#(C (f y))"),
            Error::UnboundVariable(name) if name == "y"
        ));
    }
}
