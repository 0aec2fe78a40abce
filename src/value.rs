use std::fmt;

use num_complex::Complex64;
use num_rational::Rational64;
use num_traits::ToPrimitive;

use crate::expression::{format_number, Constant, Expr};
use crate::function::Function;

/// Dynamic result of symbolic evaluation.
///
/// Only [`Value::Real`] is directly usable as a number; the evaluator's
/// fallback chain coerces the other shapes where it can.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Real(f64),
    Complex(Complex64),
    Rational(Rational64),
    /// A bare function name, e.g. `random` without parentheses.
    Function(Function),
    /// Partially evaluated expression with free variables left in.
    Symbolic(Expr),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Real(_) => "number",
            Self::Complex(_) => "complex",
            Self::Rational(_) => "fraction",
            Self::Function(_) => "function",
            Self::Symbolic(_) => "symbolic",
        }
    }

    /// Conversion used by the "to real number" coercion: rationals only.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Self::Real(r) => Some(*r),
            Self::Rational(q) => q.to_f64(),
            _ => None,
        }
    }

    /// Embeds the value back into a syntax tree.
    pub fn into_expr(self) -> Expr {
        match self {
            Self::Real(r) => Expr::Number(r),
            Self::Rational(q) => Expr::div(
                Expr::number(*q.numer() as f64),
                Expr::number(*q.denom() as f64),
            ),
            Self::Complex(c) => Expr::add(
                Expr::number(c.re),
                Expr::mul(Expr::number(c.im), Expr::Constant(Constant::I)),
            ),
            Self::Function(f) => Expr::var(f.name()),
            Self::Symbolic(e) => e,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(r) => f.write_str(&format_number(*r)),
            Self::Complex(c) => {
                let sign = if c.im < 0.0 { '-' } else { '+' };
                write!(
                    f,
                    "{} {sign} {}i",
                    format_number(c.re),
                    format_number(c.im.abs())
                )
            }
            Self::Rational(q) => write!(f, "{q}"),
            Self::Function(func) => write!(f, "function {}", func.name()),
            Self::Symbolic(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shapes() {
        assert_eq!(Value::Real(2.0).to_string(), "2");
        assert_eq!(Value::Complex(Complex64::new(1.0, -2.0)).to_string(), "1 - 2i");
        assert_eq!(Value::Rational(Rational64::new(2, 6)).to_string(), "1/3");
        assert_eq!(Value::Function(Function::Sin).to_string(), "function sin");
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(Value::Rational(Rational64::new(1, 4)).to_number(), Some(0.25));
        assert_eq!(Value::Complex(Complex64::new(1.0, 0.0)).to_number(), None);
        assert_eq!(Value::Symbolic(Expr::var("y")).to_number(), None);
    }
}
