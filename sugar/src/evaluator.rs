use thiserror::Error;

use crate::term::{Index, Term};

/// The reduction service behind the evaluation boundary.
pub trait Normalize {
    type Error: std::error::Error + 'static;
    fn normalize(&self, term: &Term) -> Result<Term, Self::Error>;
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Gave up after {0} reduction steps")]
pub struct OutOfFuel(pub usize);

/// Leftmost-outermost reduction to full normal form, under binders too.
///
/// With `fuel: None` it runs until a normal form is reached, which may be never.
#[derive(Clone, Copy, Default, Debug)]
pub struct NormalOrder {
    pub fuel: Option<usize>,
}

impl Normalize for NormalOrder {
    type Error = OutOfFuel;

    fn normalize(&self, term: &Term) -> Result<Term, OutOfFuel> {
        let mut term = term.clone();
        let mut steps = 0;
        while let Some(next) = reduce(&term) {
            if self.fuel.map_or(false, |fuel| steps >= fuel) {
                return Err(OutOfFuel(steps));
            }
            steps += 1;
            term = next;
        }
        Ok(term)
    }
}

trait VarMapper {
    fn on_var(&mut self, depth: usize, index: Index) -> Term;
}

fn map_var(term: &Term, mapper: &mut impl VarMapper) -> Term {
    fn rec(term: &Term, mapper: &mut impl VarMapper, depth: usize) -> Term {
        match term {
            Term::Variable(i) => mapper.on_var(depth, *i),
            Term::Abstract(body) => Term::Abstract(rec(body, mapper, depth + 1).into()),
            Term::Apply(lhs, rhs) => Term::Apply(
                rec(lhs, mapper, depth).into(),
                rec(rhs, mapper, depth).into(),
            ),
        }
    }
    rec(term, mapper, 0)
}

fn shift_up(term: &Term) -> Term {
    struct M;
    impl VarMapper for M {
        fn on_var(&mut self, depth: usize, index: Index) -> Term {
            Term::Variable(if index >= depth { index + 1 } else { index })
        }
    }
    map_var(term, &mut M)
}

/// Replaces the variable bound by the removed binder with `replacement` and
/// closes the gap left in the indices above it.
fn substitute_top(base: &Term, replacement: &Term) -> Term {
    struct M<'a> {
        replacement: &'a Term,
        shifted: Vec<Term>,
    }
    impl<'a> VarMapper for M<'a> {
        fn on_var(&mut self, depth: usize, index: Index) -> Term {
            if index == depth {
                if depth == 0 {
                    return self.replacement.clone();
                }
                // shifted[k] is the replacement lifted over k + 1 binders
                while self.shifted.len() < depth {
                    let next = shift_up(self.shifted.last().unwrap_or(self.replacement));
                    self.shifted.push(next);
                }
                return self.shifted[depth - 1].clone();
            }
            Term::Variable(if index > depth { index - 1 } else { index })
        }
    }
    map_var(
        base,
        &mut M {
            replacement,
            shifted: vec![],
        },
    )
}

fn reduce(term: &Term) -> Option<Term> {
    match term {
        Term::Variable(_) => None,
        Term::Abstract(body) => reduce(body).map(|body| Term::Abstract(body.into())),
        Term::Apply(lhs, rhs) => {
            if let Term::Abstract(body) = lhs.as_ref() {
                return Some(substitute_top(body, rhs));
            }
            if let Some(lhs) = reduce(lhs) {
                return Some(Term::Apply(lhs.into(), rhs.clone()));
            }
            reduce(rhs).map(|rhs| Term::Apply(lhs.clone(), rhs.into()))
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Term::*, *};

    fn lambda(body: Term) -> Term {
        Abstract(body.into())
    }
    fn apply(lhs: Term, rhs: Term) -> Term {
        Apply(lhs.into(), rhs.into())
    }
    fn normalize(term: &Term) -> Term {
        NormalOrder::default().normalize(term).unwrap()
    }

    #[test]
    fn test_beta() {
        let id = lambda(Variable(0));
        assert_eq!(normalize(&apply(id.clone(), lambda(Variable(0)))), id);
        // (lambda x. lambda y. x) z  ~>  lambda y. z, with z free
        assert_eq!(
            normalize(&apply(lambda(lambda(Variable(1))), Variable(0))),
            lambda(Variable(1))
        );
    }

    #[test]
    fn test_reduces_under_binders() {
        // lambda z. (lambda x. x) z  ~>  lambda z. z
        assert_eq!(
            normalize(&lambda(apply(lambda(Variable(0)), Variable(0)))),
            lambda(Variable(0))
        );
    }

    #[test]
    fn test_substitution_shifts_replacement() {
        // lambda a. (lambda x. lambda y. x) a  ~>  lambda a. lambda y. a
        assert_eq!(
            normalize(&lambda(apply(lambda(lambda(Variable(1))), Variable(0)))),
            lambda(lambda(Variable(1)))
        );
    }

    #[test]
    fn test_normal_order_discards_divergence() {
        let omega = apply(
            lambda(apply(Variable(0), Variable(0))),
            lambda(apply(Variable(0), Variable(0))),
        );
        // (lambda x. lambda y. y) omega
        let term = apply(lambda(lambda(Variable(0))), omega.clone());
        assert_eq!(normalize(&term), lambda(Variable(0)));
        assert_eq!(
            NormalOrder { fuel: Some(10) }.normalize(&omega),
            Err(OutOfFuel(10))
        );
    }
}
