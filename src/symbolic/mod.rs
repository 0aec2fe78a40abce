//! Symbolic differentiation and simplification over [`Expr`].

mod differentiate;
mod simplify;

use crate::error::DiffError;
use crate::expression::Expr;

/// The `order`-th derivative with respect to `var`, simplified after each
/// step. Order 0 is the simplified expression itself.
pub fn nth_derivative(expr: &Expr, var: &str, order: usize) -> Result<Expr, DiffError> {
    let mut current = expr.simplify();
    for _ in 0..order {
        current = current.derivative(var)?.simplify();
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn repeated_derivatives() {
        let f = parse("x^4 + sin(x)").unwrap();
        assert_eq!(nth_derivative(&f, "x", 0).unwrap().to_string(), "x ^ 4 + sin(x)");
        assert_eq!(
            nth_derivative(&f, "x", 1).unwrap().to_string(),
            "4 * x ^ 3 + cos(x)"
        );
        assert_eq!(
            nth_derivative(&f, "x", 2).unwrap().to_string(),
            "12 * x ^ 2 - sin(x)"
        );
        assert_eq!(nth_derivative(&f, "y", 1).unwrap().to_string(), "0");
    }
}
