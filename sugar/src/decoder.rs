use std::rc::Rc;

use crate::{
    analysis::free_vars,
    lang::{fold, Binding, Fold, Term, TermRef},
    prelude::*,
    term,
};

/// Binder names in order of depth: `a` .. `z`, `aa` .. `zz`, `aaa` ..
fn binder_name(depth: usize) -> Identifier {
    let mut name = String::new();
    let mut n = depth + 1;
    while n > 0 {
        n -= 1;
        name.insert(0, char::from(b'a' + (n % 26) as u8));
        n /= 26;
    }
    Rc::new(name)
}

fn is_var(term: &Term, name: &Identifier) -> bool {
    matches!(term, Term::Variable(v) if v == name)
}

fn mentions(term: &Term, names: &[&Identifier]) -> bool {
    let free = free_vars(term);
    names.iter().any(|name| free.contains(*name))
}

/// `(f x -> (f (f ... x)))`
fn natural(term: &Term) -> Option<Term> {
    let Term::Abstract(params, body) = term else {
        return None;
    };
    let [f, x] = params.as_slice() else {
        return None;
    };
    if f == x {
        return None;
    }
    let mut count = 0;
    let mut body = body.as_ref();
    while let Term::Apply(head, args) = body {
        let [arg] = args.as_slice() else {
            return None;
        };
        if !is_var(head, f) {
            return None;
        }
        count += 1;
        body = arg.as_ref();
    }
    is_var(body, x).then_some(Term::Nat(count))
}

/// `(k -> (k e1 e2 ...))`
fn tuple(term: &Term) -> Option<Term> {
    let Term::Abstract(params, body) = term else {
        return None;
    };
    let [k] = params.as_slice() else {
        return None;
    };
    match body.as_ref() {
        Term::Apply(head, args)
            if is_var(head, k) && !args.is_empty() && !args.iter().any(|a| mentions(a, &[k])) =>
        {
            Some(Term::Tuple(args.clone()))
        }
        _ => None,
    }
}

/// `(c n -> (c e1 (c e2 ... n)))`
fn list(term: &Term) -> Option<Term> {
    let Term::Abstract(params, body) = term else {
        return None;
    };
    let [c, n] = params.as_slice() else {
        return None;
    };
    if c == n {
        return None;
    }
    let mut items = vec![];
    let mut body = body.as_ref();
    while !is_var(body, n) {
        let Term::Apply(head, args) = body else {
            return None;
        };
        let [item, tail] = args.as_slice() else {
            return None;
        };
        if !is_var(head, c) || mentions(item, &[c, n]) {
            return None;
        }
        items.push(item.clone());
        body = tail.as_ref();
    }
    Some(Term::List(items))
}

/// Bit 1 is the selector of the second argument, which has already become
/// `0` by the time this runs.
fn bit(term: &Term) -> Option<u32> {
    match term {
        Term::Nat(0) => Some(1),
        Term::Abstract(params, body) => match params.as_slice() {
            [a, b] if a != b && is_var(body, a) => Some(0),
            _ => None,
        },
        _ => None,
    }
}

fn bits(term: &Term) -> Option<Term> {
    let Term::Tuple(items) = term else {
        return None;
    };
    if items.len() != 8 && items.len() != 32 {
        return None;
    }
    let value = items
        .iter()
        .try_fold(0u32, |value, item| Some((value << 1) | bit(item)?))?;
    if items.len() == 8 {
        u8::try_from(value).ok().map(|byte| Term::Char(byte.into()))
    } else {
        Some(Term::Word(value))
    }
}

fn string(term: &Term) -> Option<Term> {
    let Term::List(items) = term else {
        return None;
    };
    if items.is_empty() {
        return None;
    }
    let value = items
        .iter()
        .map(|item| match item.as_ref() {
            Term::Char(c) => Some(*c),
            _ => None,
        })
        .collect::<Option<String>>()?;
    Some(Term::Str(Rc::new(value)))
}

type Recognizer = fn(&Term) -> Option<Term>;

/// Each recognizer sees what the previous ones made of the node.
const RECOGNIZERS: [Recognizer; 5] = [natural, tuple, list, bits, string];

fn recognize(term: Term) -> Term {
    RECOGNIZERS
        .iter()
        .fold(term, |term, recognizer| recognizer(&term).unwrap_or(term))
}

/// `λf. λx. f (f ... x)` counted straight off the pure term, so that large
/// naturals never recurse down their chain.
fn church_natural(term: &term::Term) -> Option<Nat> {
    let term::Term::Abstract(inner) = term else {
        return None;
    };
    let term::Term::Abstract(body) = inner.as_ref() else {
        return None;
    };
    let mut count = 0;
    let mut body = body.as_ref();
    while let term::Term::Apply(head, arg) = body {
        if !matches!(head.as_ref(), term::Term::Variable(1)) {
            return None;
        }
        count += 1;
        body = arg.as_ref();
    }
    matches!(body, term::Term::Variable(0)).then_some(count)
}

/// Binds one more parameter around an already recognized body, merging it
/// into the body's own parameters when the body is still a function.
fn abstracted(param: Identifier, body: Term) -> Term {
    let term = match body {
        Term::Abstract(params, body) => {
            Term::Abstract(std::iter::once(param).chain(params).collect(), body)
        }
        body => Term::Abstract(vec![param], body.into()),
    };
    recognize(term)
}

fn decode_at(term: &term::Term, depth: usize) -> Term {
    if let Some(n) = church_natural(term) {
        return Term::Nat(n);
    }
    let sugared = match term {
        term::Term::Variable(i) if *i < depth => Term::Variable(binder_name(depth - 1 - i)),
        term::Term::Variable(i) => Term::Variable(ident(&format!("_{}", i - depth))),
        term::Term::Abstract(inner) => {
            return abstracted(binder_name(depth), decode_at(inner, depth + 1));
        }
        term::Term::Apply(..) => {
            let mut args = vec![];
            let mut head = term;
            while let term::Term::Apply(lhs, rhs) = head {
                args.push(rhs);
                head = lhs.as_ref();
            }
            let args = args
                .into_iter()
                .rev()
                .map(|arg| decode_at(arg, depth).into())
                .collect();
            Term::Apply(decode_at(head, depth).into(), args)
        }
    };
    recognize(sugared)
}

/// Reads a pure term back as sugar. Binders are named after their depth and
/// free variables become `_0`, `_1`, ... counting outwards.
pub fn decode(term: &term::Term) -> Term {
    decode_at(term, 0)
}

/// Runs the recognizers over a sugared tree, so that hand-written Church
/// encodings read back the same way decoded ones do.
struct Resugarer;

impl Fold for Resugarer {
    type Env = ();
    type Output = Result<Term>;

    fn abstraction(&mut self, params: &[Identifier], body: Result<Term>) -> Result<Term> {
        Ok(params
            .iter()
            .rev()
            .fold(body?, |body, param| abstracted(param.clone(), body)))
    }
    fn application(&mut self, head: Result<Term>, args: Vec<Result<Term>>) -> Result<Term> {
        let args = args
            .into_iter()
            .map(|arg| arg.map(TermRef::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(match head? {
            head if args.is_empty() => head,
            Term::Apply(head, inner) => Term::Apply(head, [inner, args].concat()),
            head => Term::Apply(head.into(), args),
        })
    }
    fn variable(&mut self, _: &(), name: &Identifier) -> Result<Term> {
        Ok(Term::Variable(name.clone()))
    }
    fn natural(&mut self, value: Nat) -> Result<Term> {
        Ok(Term::Nat(value))
    }
    fn list(&mut self, items: Vec<Result<Term>>) -> Result<Term> {
        let items = items
            .into_iter()
            .map(|item| item.map(TermRef::new))
            .collect::<Result<_>>()?;
        Ok(recognize(Term::List(items)))
    }
    fn tuple(&mut self, items: Vec<Result<Term>>) -> Result<Term> {
        let items = items
            .into_iter()
            .map(|item| item.map(TermRef::new))
            .collect::<Result<_>>()?;
        Ok(recognize(Term::Tuple(items)))
    }
    fn character(&mut self, value: char) -> Result<Term> {
        Ok(Term::Char(value))
    }
    fn string(&mut self, value: &Rc<String>) -> Result<Term> {
        Ok(Term::Str(value.clone()))
    }
    fn word(&mut self, value: u32) -> Result<Term> {
        Ok(Term::Word(value))
    }
    fn adt(&mut self, _: Vec<(Identifier, Vec<(Identifier, Result<Term>)>)>) -> Result<Term> {
        Err(Error::Unsupported("resugared"))
    }
    fn let_block(
        &mut self,
        bindings: Vec<(Identifier, Vec<Identifier>, Result<Term>)>,
        body: Result<Term>,
    ) -> Result<Term> {
        let bindings = bindings
            .into_iter()
            .map(|(name, params, body)| {
                Ok(Binding {
                    name,
                    params,
                    body: body?.into(),
                })
            })
            .collect::<Result<_>>()?;
        Ok(Term::Let(bindings, body?.into()))
    }
}

pub fn resugar(term: &Term) -> Result<Term> {
    fold(term, &mut Resugarer, &())
}
