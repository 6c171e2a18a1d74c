use std::{
    collections::{BTreeSet, HashMap, HashSet},
    rc::Rc,
};

use rpds::HashTrieSet;

use crate::{
    lang::{fold, Binding, Constructor, Fold, Term},
    prelude::*,
};

struct FreeVars {
    found: HashSet<Identifier>,
}

impl Fold for FreeVars {
    type Env = HashTrieSet<Identifier>;
    type Output = ();

    fn bind(&mut self, bound: &Self::Env, names: &[Identifier]) -> Self::Env {
        names
            .iter()
            .fold(bound.clone(), |bound, name| bound.insert(name.clone()))
    }

    fn variable(&mut self, bound: &Self::Env, name: &Identifier) {
        if !bound.contains(name) {
            self.found.insert(name.clone());
        }
    }

    fn abstraction(&mut self, _: &[Identifier], _: ()) {}
    fn application(&mut self, _: (), _: Vec<()>) {}
    fn natural(&mut self, _: Nat) {}
    fn list(&mut self, _: Vec<()>) {}
    fn tuple(&mut self, _: Vec<()>) {}
    fn character(&mut self, _: char) {}
    fn string(&mut self, _: &Rc<String>) {}
    fn word(&mut self, _: u32) {}
    fn adt(&mut self, _: Vec<(Identifier, Vec<(Identifier, ())>)>) {}
    fn let_block(&mut self, _: Vec<(Identifier, Vec<Identifier>, ())>, _: ()) {}
}

pub fn free_vars(term: &Term) -> HashSet<Identifier> {
    let mut folder = FreeVars {
        found: HashSet::new(),
    };
    fold(term, &mut folder, &HashTrieSet::new());
    folder.found
}

/// Rebuilds the tree, sorting every let-block on the way up.
struct LetSorter;

impl Fold for LetSorter {
    type Env = ();
    type Output = Term;

    fn abstraction(&mut self, params: &[Identifier], body: Term) -> Term {
        Term::Abstract(params.to_vec(), body.into())
    }
    fn application(&mut self, head: Term, args: Vec<Term>) -> Term {
        Term::Apply(head.into(), args.into_iter().map(Rc::new).collect())
    }
    fn variable(&mut self, _: &(), name: &Identifier) -> Term {
        Term::Variable(name.clone())
    }
    fn natural(&mut self, value: Nat) -> Term {
        Term::Nat(value)
    }
    fn list(&mut self, items: Vec<Term>) -> Term {
        Term::List(items.into_iter().map(Rc::new).collect())
    }
    fn tuple(&mut self, items: Vec<Term>) -> Term {
        Term::Tuple(items.into_iter().map(Rc::new).collect())
    }
    fn character(&mut self, value: char) -> Term {
        Term::Char(value)
    }
    fn string(&mut self, value: &Rc<String>) -> Term {
        Term::Str(value.clone())
    }
    fn word(&mut self, value: u32) -> Term {
        Term::Word(value)
    }
    fn adt(&mut self, ctors: Vec<(Identifier, Vec<(Identifier, Term)>)>) -> Term {
        Term::Adt(
            ctors
                .into_iter()
                .map(|(name, fields)| Constructor {
                    name,
                    fields: fields
                        .into_iter()
                        .map(|(field, value)| (field, value.into()))
                        .collect(),
                })
                .collect(),
        )
    }
    fn let_block(&mut self, bindings: Vec<(Identifier, Vec<Identifier>, Term)>, body: Term) -> Term {
        let bindings = bindings
            .into_iter()
            .map(|(name, params, body)| Binding {
                name,
                params,
                body: body.into(),
            })
            .collect();
        Term::Let(sort_bindings(bindings), body.into())
    }
}

/// Gives self-recursive bindings their own name as a leading parameter, then
/// orders the siblings so that each comes after everything it refers to.
///
/// The order is the earliest ready binding first, kept in a queue of ready
/// positions and fed by counting down each binding's unplaced dependencies.
/// For `n` siblings and `e` dependency edges that is O(e + n log n).
fn sort_bindings(bindings: Vec<Binding>) -> Vec<Binding> {
    let names = bindings
        .iter()
        .map(|binding| binding.name.clone())
        .collect::<HashSet<_>>();
    let (mut pending, deps): (Vec<_>, Vec<_>) = bindings
        .into_iter()
        .map(|mut binding| {
            let free = free_vars(&Term::Abstract(binding.params.clone(), binding.body.clone()));
            if free.contains(&binding.name) {
                binding.params.insert(0, binding.name.clone());
            }
            let deps = free
                .into_iter()
                .filter(|name| name != &binding.name && names.contains(name))
                .collect::<HashSet<_>>();
            (Some(binding), deps)
        })
        .unzip();

    let mut waiting = deps.iter().map(HashSet::len).collect::<Vec<_>>();
    let mut dependents: HashMap<&Identifier, Vec<usize>> = HashMap::new();
    for (i, deps) in deps.iter().enumerate() {
        for dep in deps {
            dependents.entry(dep).or_default().push(i);
        }
    }
    let mut ready = (0..pending.len())
        .filter(|&i| waiting[i] == 0)
        .collect::<BTreeSet<_>>();

    let total = pending.len();
    let mut sorted: Vec<Binding> = Vec::with_capacity(total);
    let mut placed = HashSet::new();
    let mut earliest = 0;
    while sorted.len() < total {
        let next = match ready.pop_first() {
            Some(i) => i,
            // Mutually recursive siblings never become ready; the earliest
            // one goes next so the block still comes out whole.
            None => {
                while pending[earliest].is_none() {
                    earliest += 1;
                }
                earliest
            }
        };
        // already forced out of a cycle
        let Some(binding) = pending[next].take() else {
            continue;
        };
        if placed.insert(binding.name.clone()) {
            for &dependent in dependents.get(&binding.name).into_iter().flatten() {
                waiting[dependent] -= 1;
                if waiting[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }
        sorted.push(binding);
    }
    sorted
}

pub fn sort_lets(term: &Term) -> Term {
    fold(term, &mut LetSorter, &())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{lang::build::*, parser::parse};

    fn names(bindings: &[Binding]) -> Vec<&str> {
        bindings.iter().map(|b| b.name.as_str()).collect()
    }

    #[test]
    fn test_free_vars() {
        assert_eq!(
            free_vars(&lambda(&["x"], apply(var("x"), vec![var("y")]))),
            HashSet::from([ident("y")])
        );
        let term = parse("{even n = (odd n); odd n = (even m); (f even [self])}").unwrap();
        assert_eq!(
            free_vars(&term),
            HashSet::from([ident("m"), ident("f"), ident("self")])
        );
        let record = parse("#(Node (left self) (right other))").unwrap();
        assert_eq!(free_vars(&record), HashSet::from([ident("other")]));
    }

    #[test]
    fn test_self_parameter_injection() {
        let term = parse("{sum n = (is_zero? n 0 (add n (sum (pred n 1)))); sum}").unwrap();
        let Term::Let(bindings, _) = sort_lets(&term) else {
            panic!("expected a let-block");
        };
        assert_eq!(bindings[0].name, ident("sum"));
        assert_eq!(bindings[0].params, vec![ident("sum"), ident("n")]);
    }

    #[test]
    fn test_shadowed_name_is_not_recursive() {
        let term = parse("{f f = f; f}").unwrap();
        let Term::Let(bindings, _) = sort_lets(&term) else {
            panic!("expected a let-block");
        };
        assert_eq!(bindings[0].params, vec![ident("f")]);
    }

    #[test]
    fn test_dependency_order() {
        let term = parse("{a = (b 1); b = 2; a}").unwrap();
        let Term::Let(bindings, _) = sort_lets(&term) else {
            panic!("expected a let-block");
        };
        assert_eq!(names(&bindings), vec!["b", "a"]);

        let term = parse("{d = (c b); c = (b a); x = 0; b = a; a = 1; d}").unwrap();
        let Term::Let(bindings, _) = sort_lets(&term) else {
            panic!("expected a let-block");
        };
        assert_eq!(names(&bindings), vec!["x", "a", "b", "c", "d"]);
    }

    #[test]
    fn test_long_dependency_chain() {
        // b0 = b1; b1 = b2; ... ; b199 = 0, written against the dependency order
        let count = 200;
        let bindings = (0..count)
            .map(|i| {
                let body = if i + 1 == count {
                    Term::Nat(0).into()
                } else {
                    var(&format!("b{}", i + 1))
                };
                binding(&format!("b{i}"), &[], body)
            })
            .collect();
        let Term::Let(bindings, _) = sort_lets(&Term::Let(bindings, var("b0"))) else {
            panic!("expected a let-block");
        };
        let expected = (0..count).rev().map(|i| format!("b{i}")).collect::<Vec<_>>();
        assert_eq!(names(&bindings), expected);
    }

    #[test]
    fn test_mutual_recursion_keeps_every_binding() {
        let term = parse("{even n = (odd n); odd n = (even n); k = 1; (even k)}").unwrap();
        let Term::Let(bindings, _) = sort_lets(&term) else {
            panic!("expected a let-block");
        };
        assert_eq!(names(&bindings), vec!["k", "even", "odd"]);

        // a binding waiting on a cycle is placed once the cycle is broken
        let term = parse("{even n = (odd n); odd n = (even n); use = (even odd); use}").unwrap();
        let Term::Let(bindings, _) = sort_lets(&term) else {
            panic!("expected a let-block");
        };
        assert_eq!(names(&bindings), vec!["even", "odd", "use"]);
        assert!(bindings.iter().all(|b| b.params.len() == 1));
    }

    #[test]
    fn test_nested_blocks_are_sorted() {
        let term = parse("(go 1)\n    go n = (loop n)\n        loop m = (loop m)").unwrap();
        let sorted = sort_lets(&term);
        let Term::Let(outer, _) = &sorted else {
            panic!("expected a let-block");
        };
        let Term::Let(inner, _) = outer[0].body.as_ref() else {
            panic!("expected a nested let-block");
        };
        assert_eq!(inner[0].params, vec![ident("loop"), ident("m")]);
    }
}
