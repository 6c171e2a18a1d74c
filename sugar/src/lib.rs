pub mod analysis;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod evaluator;
pub mod lang;
pub mod parser;
pub mod prelude;
pub mod printer;
pub mod term;

use crate::{error::EvalError, evaluator::Normalize, lang::Term};

/// Runs a sugared term through the pure calculus and reads the normal form
/// back as sugar.
pub fn evaluate<N: Normalize>(normalizer: &N, term: &Term) -> Result<Term, EvalError<N::Error>> {
    let encoded = encoder::encode(term)?;
    let normal = normalizer
        .normalize(&encoded)
        .map_err(EvalError::Normalize)?;
    Ok(decoder::decode(&normal))
}

pub fn run<N: Normalize>(source: &str, normalizer: &N) -> Result<String, EvalError<N::Error>> {
    let term = analysis::sort_lets(&parser::parse(source)?);
    let result = evaluate(normalizer, &term)?;
    Ok(printer::pretty(&result)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        error::Error,
        evaluator::{NormalOrder, OutOfFuel},
        parser::parse,
    };

    const FUEL: NormalOrder = NormalOrder {
        fuel: Some(100_000),
    };

    #[test]
    fn test_values_evaluate_to_themselves() {
        for source in ["3", "[1, 2]", "\"hi\"", "(1, 'x')", "#7", "[(0, \"ab\"), (2, \"c\")]"] {
            let term = parse(source).unwrap();
            assert_eq!(evaluate(&FUEL, &term).unwrap(), term, "{source}");
        }
    }

    #[test]
    fn test_arithmetic() {
        let source = "
(add 2 3)
    add a b = (f x -> (a f (b f x)))
";
        assert_eq!(run(source, &FUEL).unwrap(), "5");
        let source = "
(pair (mul 2 3) (swap (1, 'a')))
    mul a b = (f -> (a (b f)))
    swap p = (p (x y -> (y, x)))
    pair a b = [a, b]
";
        assert_eq!(run(source, &FUEL).unwrap(), "[6,('a',1)]");
    }

    #[test]
    fn test_recursion_through_fixed_point_slot() {
        let source = "
(fix sum 3)
    -- the let sorter gives `sum` its own name as a first parameter
    sum n = ((zero? n) 0 (add n (sum (pred n))))
    fix f = ((x -> (f (x x))) (x -> (f (x x))))
    zero? n = (n (x -> false) true)
    true a b = a
    false a b = b
    add a b = (f x -> (a f (b f x)))
    pred n = (f x -> (n (g h -> (h (g f))) (u -> x) (u -> u)))
";
        assert_eq!(run(source, &FUEL).unwrap(), "6");
    }

    #[test]
    fn test_failures_propagate() {
        assert!(matches!(
            run("(f 1)", &FUEL),
            Err(EvalError::Sugar(Error::UnboundVariable(name))) if name == "f"
        ));
        assert!(matches!(
            run("(1", &FUEL),
            Err(EvalError::Sugar(Error::Parse(_)))
        ));
        // mutual recursion gets no fixed-point slot
        assert!(matches!(
            run("{even n = (odd n); odd n = (even n); (even 1)}", &FUEL),
            Err(EvalError::Sugar(Error::UnboundVariable(name))) if name == "odd"
        ));
        let omega = "((x -> (x x)) (x -> (x x)))";
        assert!(matches!(
            run(omega, &NormalOrder { fuel: Some(10) }),
            Err(EvalError::Normalize(OutOfFuel(10)))
        ));
        // tagged records encode, but only read back as their primitives:
        // `λk. k ctors` is a 1-tuple
        assert_eq!(
            run("(x -> #(Leaf))", &FUEL).unwrap(),
            r#"(a -> ([("Leaf",0)],))"#
        );
    }
}
