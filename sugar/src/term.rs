use std::rc::Rc;

pub type Index = usize;

/// Pure lambda term with de Bruijn indices; `Variable(0)` is the innermost binder.
#[derive(PartialEq, Eq, Clone, derive_more::Display, Debug)]
pub enum Term {
    #[display(fmt = "v_{_0}")]
    Variable(Index),
    #[display(fmt = "(lambda. {_0})")]
    Abstract(Rc<Self>),
    #[display(fmt = "({_0} {_1})")]
    Apply(Rc<Self>, Rc<Self>),
}

impl Term {
    pub fn abstracted(self, binders: usize) -> Self {
        (0..binders).fold(self, |body, _| Term::Abstract(body.into()))
    }

    pub fn applied(self, arg: Self) -> Self {
        Term::Apply(self.into(), arg.into())
    }

    fn take_children(&mut self, into: &mut Vec<Rc<Self>>) {
        // Shared children are left for their other owners.
        let mut take = |child: &mut Rc<Self>| {
            if Rc::get_mut(child).map_or(false, |t| !matches!(t, Term::Variable(_))) {
                into.push(std::mem::replace(child, Rc::new(Term::Variable(0))));
            }
        };
        match self {
            Term::Variable(_) => {}
            Term::Abstract(body) => take(body),
            Term::Apply(lhs, rhs) => {
                take(lhs);
                take(rhs);
            }
        }
    }
}

// A Church natural is as deep as its value, so dropping one must not recurse.
impl Drop for Term {
    fn drop(&mut self) {
        if let Term::Variable(_) = self {
            return;
        }
        let mut pending = vec![];
        self.take_children(&mut pending);
        while let Some(child) = pending.pop() {
            if let Ok(mut term) = Rc::try_unwrap(child) {
                term.take_children(&mut pending);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn chain(length: usize) -> Term {
        (0..length)
            .fold(Term::Variable(0), |acc, _| Term::Variable(1).applied(acc))
            .abstracted(2)
    }

    #[test]
    fn test_dropping_deep_terms() {
        drop(chain(1_000_000));

        let term = chain(1_000_000);
        let alias = term.clone();
        drop(term);
        assert!(matches!(&alias, Term::Abstract(body) if matches!(body.as_ref(), Term::Abstract(_))));
    }
}
