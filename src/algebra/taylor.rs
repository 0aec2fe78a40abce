use num_rational::Rational64;

use crate::bindings::Bindings;
use crate::error::{AlgebraError, EvalError};
use crate::expression::Expr;

/// Largest order whose factorial fits an `i64`.
const MAX_EXACT_ORDER: usize = 20;

/// Most terms a series expansion may ask for.
pub const MAX_SERIES_TERMS: usize = 20;

/// Size past which a derivative is abandoned. Repeated product and chain
/// rules grow trees geometrically, and simplification cost grows with them.
const MAX_DERIVATIVE_NODES: usize = 1_000;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Coefficient {
    Exact(Rational64),
    Approximate(f64),
}

impl Coefficient {
    fn new(derivative_value: f64, order: usize) -> Self {
        let exact = derivative_value.fract() == 0.0 && derivative_value.abs() < 1e15;
        if exact && order <= MAX_EXACT_ORDER {
            Self::Exact(Rational64::new(derivative_value as i64, factorial(order) as i64))
        } else {
            Self::Approximate(derivative_value / factorial(order) as f64)
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            Self::Exact(q) => *q.numer() == 0,
            Self::Approximate(c) => *c == 0.0,
        }
    }

    fn is_negative(&self) -> bool {
        match self {
            Self::Exact(q) => *q.numer() < 0,
            Self::Approximate(c) => *c < 0.0,
        }
    }

    /// `|c| * power`, as a fraction where exact.
    fn scale(&self, power: Option<Expr>) -> Expr {
        match (self, power) {
            (Self::Exact(q), power) => {
                let numer = q.numer().unsigned_abs() as f64;
                let scaled = match power {
                    None => Expr::number(numer),
                    Some(p) if numer == 1.0 => p,
                    Some(p) => Expr::mul(Expr::number(numer), p),
                };
                if *q.denom() == 1 {
                    scaled
                } else {
                    Expr::div(scaled, Expr::number(*q.denom() as f64))
                }
            }
            (Self::Approximate(c), None) => Expr::number(c.abs()),
            (Self::Approximate(c), Some(p)) => Expr::mul(Expr::number(c.abs()), p),
        }
    }
}

fn factorial(n: usize) -> u64 {
    (1..=n as u64).product()
}

/// `(var - point)^order`, or `None` for order 0.
fn shifted_power(var: &str, point: f64, order: usize) -> Option<Expr> {
    if order == 0 {
        return None;
    }
    let base = if point == 0.0 {
        Expr::var(var)
    } else if point > 0.0 {
        Expr::sub(Expr::var(var), Expr::number(point))
    } else {
        Expr::add(Expr::var(var), Expr::number(-point))
    };
    Some(if order == 1 {
        base
    } else {
        Expr::pow(base, Expr::number(order as f64))
    })
}

/// Taylor polynomial of `f` around `point`, keeping orders `0..terms`.
///
/// Coefficients are exact fractions when the derivative values are integral.
/// Fails with [`AlgebraError::TooComplex`] once a derivative outgrows the
/// node budget.
pub fn taylor(f: &Expr, var: &str, point: f64, terms: usize) -> Result<Expr, AlgebraError> {
    taylor_within(f, var, point, terms, MAX_DERIVATIVE_NODES)
}

fn taylor_within(
    f: &Expr,
    var: &str,
    point: f64,
    terms: usize,
    max_nodes: usize,
) -> Result<Expr, AlgebraError> {
    let at_point = Expr::number(point);
    let mut series: Option<Expr> = None;
    let mut derivative = f.simplify();
    for order in 0..terms {
        if order > 0 {
            let next = derivative.derivative(var)?;
            let nodes = next.node_count();
            if nodes > max_nodes {
                return Err(AlgebraError::TooComplex { order, nodes });
            }
            derivative = next.simplify();
        }
        let value = derivative
            .substitute(var, &at_point)
            .evaluate(&Bindings::new())
            .and_then(|v| match v.to_number() {
                Some(n) if n.is_finite() => Ok(n),
                Some(n) => Err(EvalError::NonFiniteResult(n)),
                None => Err(EvalError::NonNumericResult {
                    kind: v.kind(),
                    value: v.to_string(),
                }),
            })
            .map_err(|source| AlgebraError::Coefficient {
                order,
                point,
                source,
            })?;

        let coefficient = Coefficient::new(value, order);
        if coefficient.is_zero() {
            continue;
        }
        let term = coefficient.scale(shifted_power(var, point, order));
        series = Some(match (series, coefficient.is_negative()) {
            (None, false) => term,
            (None, true) => Expr::neg(term),
            (Some(acc), false) => Expr::add(acc, term),
            (Some(acc), true) => Expr::sub(acc, term),
        });
    }
    Ok(series.unwrap_or(Expr::number(0.0)))
}
