//! Taylor coefficients by truncated power series arithmetic.
//!
//! Every node of the tree is turned into its first `n` Taylor coefficients
//! around the expansion point. Products are Cauchy products and elementary
//! functions follow their first-order differential equations
//! (`exp' = u' exp`, `sin' = u' cos`, ...), so the work is polynomial in `n`
//! where repeated symbolic differentiation is not.

use crate::error::AlgebraError;
use crate::expression::Expr;
use crate::function::Function;

fn fail(reason: impl Into<String>) -> AlgebraError {
    AlgebraError::Series(reason.into())
}

/// Coefficients `c_0 .. c_{n-1}` of a truncated series, `n >= 1`.
#[derive(Clone, Debug, PartialEq)]
struct Series(Vec<f64>);

impl Series {
    fn constant(value: f64, n: usize) -> Self {
        let mut coefficients = vec![0.0; n];
        coefficients[0] = value;
        Self(coefficients)
    }

    /// `point + (x - point)`: the expansion variable itself.
    fn variable(point: f64, n: usize) -> Self {
        let mut series = Self::constant(point, n);
        if n > 1 {
            series.0[1] = 1.0;
        }
        series
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn head(&self) -> f64 {
        self.0[0]
    }

    fn is_constant(&self) -> bool {
        self.0[1..].iter().all(|c| *c == 0.0)
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self(self.0.iter().map(|c| f(*c)).collect())
    }

    fn zip(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self(self.0.iter().zip(&other.0).map(|(a, b)| f(*a, *b)).collect())
    }

    fn mul(&self, other: &Self) -> Self {
        Self(
            (0..self.len())
                .map(|k| (0..=k).map(|i| self.0[i] * other.0[k - i]).sum())
                .collect(),
        )
    }

    fn div(&self, other: &Self) -> Result<Self, AlgebraError> {
        let b0 = other.head();
        if b0 == 0.0 {
            return Err(fail("division by a factor that vanishes at the point"));
        }
        let mut q: Vec<f64> = Vec::with_capacity(self.len());
        for k in 0..self.len() {
            let carried: f64 = (1..=k).map(|i| other.0[i] * q[k - i]).sum();
            q.push((self.0[k] - carried) / b0);
        }
        Ok(Self(q))
    }

    /// Term-wise derivative, padded with a trailing zero.
    fn derivative(&self) -> Self {
        let n = self.len();
        Self(
            (0..n)
                .map(|k| if k + 1 < n { (k + 1) as f64 * self.0[k + 1] } else { 0.0 })
                .collect(),
        )
    }

    /// Term-wise antiderivative with constant term `head`. The padding left
    /// by [`Series::derivative`] falls off the end.
    fn integral(&self, head: f64) -> Self {
        Self(
            (0..self.len())
                .map(|k| if k == 0 { head } else { self.0[k - 1] / k as f64 })
                .collect(),
        )
    }

    fn exp(&self) -> Self {
        let mut w = vec![self.head().exp()];
        for k in 1..self.len() {
            let sum: f64 = (1..=k).map(|j| j as f64 * self.0[j] * w[k - j]).sum();
            w.push(sum / k as f64);
        }
        Self(w)
    }

    /// `(sin u, cos u)`, or `(sinh u, cosh u)` when `hyperbolic`.
    fn sin_cos(&self, hyperbolic: bool) -> (Self, Self) {
        let a0 = self.head();
        let (mut s, mut c) = if hyperbolic {
            (vec![a0.sinh()], vec![a0.cosh()])
        } else {
            (vec![a0.sin()], vec![a0.cos()])
        };
        let sign = if hyperbolic { 1.0 } else { -1.0 };
        for k in 1..self.len() {
            let (mut ds, mut dc) = (0.0, 0.0);
            for j in 1..=k {
                let ja = j as f64 * self.0[j];
                ds += ja * c[k - j];
                dc += sign * ja * s[k - j];
            }
            s.push(ds / k as f64);
            c.push(dc / k as f64);
        }
        (Self(s), Self(c))
    }

    /// Natural logarithm. A negative head keeps the real part, `ln|u|`.
    fn ln(&self) -> Result<Self, AlgebraError> {
        let a0 = self.head();
        if a0 == 0.0 {
            return Err(fail("logarithm of zero"));
        }
        Ok(self.derivative().div(self)?.integral(a0.abs().ln()))
    }

    /// `u^p` for a constant `p`.
    fn powf(&self, p: f64) -> Result<Self, AlgebraError> {
        let a0 = self.head();
        if a0 == 0.0 {
            return if p >= 0.0 && p.fract() == 0.0 {
                Ok(self.powi(p))
            } else {
                Err(fail(format!("power {p} of an expression that vanishes at the point")))
            };
        }
        let w0 = if p == 1.0 / 3.0 { a0.cbrt() } else { a0.powf(p) };
        if !w0.is_finite() {
            return Err(fail(format!("power {p} of {a0} is not real")));
        }
        // u w' = p u' w
        let mut w = vec![w0];
        for k in 1..self.len() {
            let sum: f64 = (1..=k)
                .map(|j| (p * j as f64 - (k - j) as f64) * self.0[j] * w[k - j])
                .sum();
            w.push(sum / (k as f64 * a0));
        }
        Ok(Self(w))
    }

    /// Repeated product for a whole `p`. With a vanishing head every term of
    /// `u^p` below order `p` is zero, so large powers stop early.
    fn powi(&self, p: f64) -> Self {
        let n = self.len();
        if p >= n as f64 {
            return Self::constant(0.0, n);
        }
        (0..p as usize).fold(Self::constant(1.0, n), |acc, _| acc.mul(self))
    }

    fn one_minus_square(&self) -> Self {
        Self::constant(1.0, self.len()).zip(&self.mul(self), |a, b| a - b)
    }
}

fn expand(expr: &Expr, var: &str, point: f64, n: usize) -> Result<Series, AlgebraError> {
    let sub = |e: &Expr| expand(e, var, point, n);
    Ok(match expr {
        Expr::Number(value) => Series::constant(*value, n),
        Expr::Constant(c) => Series::constant(
            c.real_value()
                .ok_or_else(|| fail(format!("'{}' is not real", c.name())))?,
            n,
        ),
        Expr::Variable(name) if name == var => Series::variable(point, n),
        Expr::Variable(name) => return Err(fail(format!("unbound variable '{name}'"))),
        Expr::Neg(only) => sub(only)?.map(|c| -c),
        Expr::Add(lhs, rhs) => sub(lhs)?.zip(&sub(rhs)?, |a, b| a + b),
        Expr::Sub(lhs, rhs) => sub(lhs)?.zip(&sub(rhs)?, |a, b| a - b),
        Expr::Mul(lhs, rhs) => sub(lhs)?.mul(&sub(rhs)?),
        Expr::Div(lhs, rhs) => sub(lhs)?.div(&sub(rhs)?)?,
        Expr::Pow(base, exponent) => {
            let base = sub(base)?;
            let exponent = sub(exponent)?;
            if exponent.is_constant() {
                base.powf(exponent.head())?
            } else if base.head() > 0.0 {
                exponent.mul(&base.ln()?).exp()
            } else {
                return Err(fail("variable exponent of a non-positive base"));
            }
        }
        Expr::Call(function, args) => {
            let args = args.iter().map(sub).collect::<Result<Vec<_>, _>>()?;
            call(*function, &args)?
        }
    })
}

fn call(function: Function, args: &[Series]) -> Result<Series, AlgebraError> {
    let (u, base) = match args {
        [u] => (u, None),
        [u, base] => (u, Some(base)),
        _ => return Err(fail(format!("'{}' has no series", function.name()))),
    };
    let n = u.len();
    let a0 = u.head();
    Ok(match function {
        Function::Sin => u.sin_cos(false).0,
        Function::Cos => u.sin_cos(false).1,
        Function::Tan => {
            let (s, c) = u.sin_cos(false);
            s.div(&c)?
        }
        Function::Sec => Series::constant(1.0, n).div(&u.sin_cos(false).1)?,
        Function::Csc => Series::constant(1.0, n).div(&u.sin_cos(false).0)?,
        Function::Cot => {
            let (s, c) = u.sin_cos(false);
            c.div(&s)?
        }
        Function::Sinh => u.sin_cos(true).0,
        Function::Cosh => u.sin_cos(true).1,
        Function::Tanh => {
            let (s, c) = u.sin_cos(true);
            s.div(&c)?
        }
        Function::Asin | Function::Acos => {
            if a0.abs() >= 1.0 {
                return Err(fail(format!("{}({a0}) is not analytic", function.name())));
            }
            let slope = u.derivative().mul(&u.one_minus_square().powf(-0.5)?);
            if function == Function::Asin {
                slope.integral(a0.asin())
            } else {
                slope.map(|c| -c).integral(a0.acos())
            }
        }
        Function::Atan => {
            let one_plus_square = Series::constant(1.0, n).zip(&u.mul(u), |a, b| a + b);
            u.derivative().div(&one_plus_square)?.integral(a0.atan())
        }
        Function::Exp => u.exp(),
        Function::Log => match base {
            None => u.ln()?,
            Some(base) => u.ln()?.div(&base.ln()?)?,
        },
        Function::Log10 => u.ln()?.map(|c| c / std::f64::consts::LN_10),
        Function::Log2 => u.ln()?.map(|c| c / std::f64::consts::LN_2),
        Function::Sqrt => u.powf(0.5)?,
        Function::Cbrt => u.powf(1.0 / 3.0)?,
        Function::Abs | Function::Sign if a0 == 0.0 => {
            return Err(fail(format!("{}(0) is not analytic", function.name())))
        }
        Function::Abs => u.map(|c| c * a0.signum()),
        Function::Sign => Series::constant(a0.signum(), n),
        Function::Fraction => match base {
            Some(denom) => u.div(denom)?,
            None => return Err(fail("fraction needs two arguments")),
        },
        Function::Random => return Err(fail("random has no series")),
    })
}

/// `f^(k)(point) / k!` for `k < terms`.
pub fn taylor_coefficients(
    f: &Expr,
    var: &str,
    point: f64,
    terms: usize,
) -> Result<Vec<f64>, AlgebraError> {
    if terms == 0 {
        return Ok(Vec::new());
    }
    let Series(coefficients) = expand(f, var, point, terms)?;
    match coefficients.iter().position(|c| !c.is_finite()) {
        Some(order) => Err(fail(format!("coefficient {order} is not finite"))),
        None => Ok(coefficients),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use approx::assert_relative_eq;

    fn coefficients(text: &str, point: f64, terms: usize) -> Vec<f64> {
        taylor_coefficients(&parse(text).unwrap(), "x", point, terms).unwrap()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert_relative_eq!(*a, *e, epsilon = 1e-12, max_relative = 1e-9);
        }
    }

    #[test]
    fn elementary_functions() {
        assert_close(&coefficients("exp(x)", 0.0, 5), &[1.0, 1.0, 0.5, 1.0 / 6.0, 1.0 / 24.0]);
        assert_close(&coefficients("sin(x)", 0.0, 4), &[0.0, 1.0, 0.0, -1.0 / 6.0]);
        assert_close(&coefficients("cosh(x)", 0.0, 3), &[1.0, 0.0, 0.5]);
        assert_close(&coefficients("log(1 + x)", 0.0, 4), &[0.0, 1.0, -0.5, 1.0 / 3.0]);
        assert_close(&coefficients("sqrt(x)", 4.0, 3), &[2.0, 0.25, -1.0 / 64.0]);
        assert_close(&coefficients("atan(x)", 0.0, 4), &[0.0, 1.0, 0.0, -1.0 / 3.0]);
        assert_close(&coefficients("asin(x)", 0.0, 4), &[0.0, 1.0, 0.0, 1.0 / 6.0]);
        assert_close(&coefficients("1/(1 - x)", 0.0, 4), &[1.0; 4]);
        assert_close(&coefficients("x^3", 1.0, 5), &[1.0, 3.0, 3.0, 1.0, 0.0]);
        assert_close(&coefficients("2^x", 0.0, 2), &[1.0, std::f64::consts::LN_2]);
    }

    #[test]
    fn tangent_to_twenty_terms() {
        let c = coefficients("tan(x)", 0.0, 20);
        assert_eq!(c.len(), 20);
        assert_relative_eq!(c[1], 1.0);
        assert_relative_eq!(c[3], 1.0 / 3.0, max_relative = 1e-12);
        assert_relative_eq!(c[5], 2.0 / 15.0, max_relative = 1e-12);
        assert_relative_eq!(c[7], 17.0 / 315.0, max_relative = 1e-12);
        assert!(c.iter().step_by(2).all(|even| even.abs() < 1e-15));
    }

    #[test]
    fn logarithm_of_a_negative_head_keeps_the_real_part() {
        assert_close(&coefficients("log(x)", -1.0, 3), &[0.0, -1.0, -0.5]);
    }

    #[test]
    fn points_without_a_series() {
        let expand = |text: &str, point: f64| {
            taylor_coefficients(&parse(text).unwrap(), "x", point, 3)
        };
        assert!(matches!(expand("1/x", 0.0), Err(AlgebraError::Series(_))));
        assert!(matches!(expand("sqrt(x)", 0.0), Err(AlgebraError::Series(_))));
        assert!(matches!(expand("abs(x)", 0.0), Err(AlgebraError::Series(_))));
        assert!(matches!(expand("x * y", 1.0), Err(AlgebraError::Series(_))));
        assert_close(&expand("abs(x)", -2.0).unwrap(), &[2.0, -1.0, 0.0]);
    }
}
