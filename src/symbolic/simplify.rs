use crate::expression::{Constant, Expr};
use crate::function::Function;

/// Upper bound on bottom-up rewrite passes.
const MAX_PASSES: usize = 32;

impl Expr {
    /// Rewrites the tree into a simpler equivalent, bottom-up, until nothing
    /// changes.
    ///
    /// Numbers are folded only when the result is exact: sums, differences and
    /// products always, quotients, powers and function values only when they
    /// come out integral. `1 / 3` and `sqrt(2)` stay as they are.
    pub fn simplify(&self) -> Expr {
        let mut current = self.clone();
        for _ in 0..MAX_PASSES {
            let next = current.simplify_once();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn simplify_once(&self) -> Expr {
        match self {
            Self::Number(_) | Self::Constant(_) | Self::Variable(_) => self.clone(),
            Self::Neg(only) => neg(only.simplify_once()),
            Self::Add(lhs, rhs) => add(lhs.simplify_once(), rhs.simplify_once()),
            Self::Sub(lhs, rhs) => sub(lhs.simplify_once(), rhs.simplify_once()),
            Self::Mul(lhs, rhs) => mul(lhs.simplify_once(), rhs.simplify_once()),
            Self::Div(lhs, rhs) => div(lhs.simplify_once(), rhs.simplify_once()),
            Self::Pow(base, exponent) => pow(base.simplify_once(), exponent.simplify_once()),
            Self::Call(function, args) => call(
                *function,
                args.iter().map(Expr::simplify_once).collect(),
            ),
        }
    }
}

fn integral(value: f64) -> Option<Expr> {
    (value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15).then_some(Expr::Number(value))
}

/// `c * u` as `(c, u)`; anything else has coefficient 1.
fn split_coefficient(expr: &Expr) -> (f64, Expr) {
    match expr {
        Expr::Mul(lhs, rhs) => match lhs.as_number() {
            Some(c) => (c, *rhs.clone()),
            None => (1.0, expr.clone()),
        },
        Expr::Neg(only) => {
            let (c, u) = split_coefficient(only);
            (-c, u)
        }
        _ => (1.0, expr.clone()),
    }
}

/// `u ^ n` as `(u, n)`; anything else has exponent 1.
fn split_power(expr: &Expr) -> (Expr, Expr) {
    match expr {
        Expr::Pow(base, exponent) => (*base.clone(), *exponent.clone()),
        _ => (expr.clone(), Expr::number(1.0)),
    }
}

/// `c1 * u ± c2 * u` → `(c1 ± c2) * u`.
fn collect_like_terms(lhs: &Expr, rhs: &Expr, sign: f64) -> Option<Expr> {
    if lhs.as_number().is_some() || rhs.as_number().is_some() {
        return None;
    }
    let (cl, ul) = split_coefficient(lhs);
    let (cr, ur) = split_coefficient(rhs);
    (ul == ur).then(|| Expr::mul(Expr::number(cl + sign * cr), ul))
}

fn negative_coefficient(expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::Number(c) if *c < 0.0 => Some(Expr::number(-c)),
        Expr::Neg(only) => Some(*only.clone()),
        Expr::Mul(lhs, rhs) => match lhs.as_number() {
            Some(c) if c < 0.0 => Some(Expr::mul(Expr::number(-c), *rhs.clone())),
            _ => None,
        },
        _ => None,
    }
}

fn neg(only: Expr) -> Expr {
    match only {
        Expr::Number(n) => Expr::number(if n == 0.0 { 0.0 } else { -n }),
        Expr::Neg(inner) => *inner,
        Expr::Mul(lhs, rhs) => match lhs.as_number() {
            Some(c) => Expr::mul(Expr::number(-c), *rhs),
            None => Expr::neg(Expr::Mul(lhs, rhs)),
        },
        Expr::Sub(lhs, rhs) => Expr::sub(*rhs, *lhs),
        other => Expr::neg(other),
    }
}

fn add(lhs: Expr, rhs: Expr) -> Expr {
    if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
        return Expr::number(a + b);
    }
    if lhs.is_number(0.0) {
        return rhs;
    }
    if rhs.is_number(0.0) {
        return lhs;
    }
    if let Some(positive) = negative_coefficient(&rhs) {
        return Expr::sub(lhs, positive);
    }
    if let Expr::Neg(only) = lhs {
        return Expr::sub(rhs, *only);
    }
    if let Some(collected) = collect_like_terms(&lhs, &rhs, 1.0) {
        return collected;
    }
    Expr::add(lhs, rhs)
}

fn sub(lhs: Expr, rhs: Expr) -> Expr {
    if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
        return Expr::number(a - b);
    }
    if rhs.is_number(0.0) {
        return lhs;
    }
    if lhs.is_number(0.0) {
        return neg(rhs);
    }
    if lhs == rhs {
        return Expr::number(0.0);
    }
    if let Some(positive) = negative_coefficient(&rhs) {
        return Expr::add(lhs, positive);
    }
    if let Some(collected) = collect_like_terms(&lhs, &rhs, -1.0) {
        return collected;
    }
    Expr::sub(lhs, rhs)
}

fn mul(lhs: Expr, rhs: Expr) -> Expr {
    match (lhs.as_number(), rhs.as_number()) {
        (Some(a), Some(b)) => return Expr::number(a * b),
        (Some(c), _) | (_, Some(c)) if c == 0.0 => return Expr::number(0.0),
        (Some(c), _) if c == 1.0 => return rhs,
        (_, Some(c)) if c == 1.0 => return lhs,
        (Some(c), _) if c == -1.0 => return neg(rhs),
        (_, Some(c)) if c == -1.0 => return neg(lhs),
        // Coefficients go first.
        (None, Some(_)) => return Expr::mul(rhs, lhs),
        _ => {}
    }
    match (lhs, rhs) {
        (Expr::Neg(a), b) | (b, Expr::Neg(a)) => Expr::neg(Expr::mul(*a, b)),
        (Expr::Number(c), Expr::Mul(inner, u)) if inner.as_number().is_some() => Expr::mul(
            Expr::number(c * inner.as_number().unwrap_or(1.0)),
            *u,
        ),
        (Expr::Mul(inner, u), v) if inner.as_number().is_some() => {
            Expr::mul(*inner, Expr::mul(*u, v))
        }
        (u, Expr::Mul(inner, v)) if u.as_number().is_none() && inner.as_number().is_some() => {
            Expr::mul(*inner, Expr::mul(u, *v))
        }
        (a, Expr::Div(numer, denom)) => Expr::div(Expr::mul(a, *numer), *denom),
        (Expr::Div(numer, denom), b) => Expr::div(Expr::mul(*numer, b), *denom),
        (lhs, rhs) => {
            let (base_l, exp_l) = split_power(&lhs);
            let (base_r, exp_r) = split_power(&rhs);
            if base_l == base_r && base_l.as_number().is_none() {
                Expr::pow(base_l, Expr::add(exp_l, exp_r))
            } else {
                Expr::mul(lhs, rhs)
            }
        }
    }
}

fn div(lhs: Expr, rhs: Expr) -> Expr {
    if let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) {
        if b != 0.0 {
            if let Some(folded) = integral(a / b) {
                return folded;
            }
        }
        return Expr::div(lhs, rhs);
    }
    if rhs.is_number(1.0) {
        return lhs;
    }
    if rhs.is_number(-1.0) {
        return neg(lhs);
    }
    if lhs.is_number(0.0) && !rhs.is_number(0.0) {
        return Expr::number(0.0);
    }
    if lhs == rhs {
        return Expr::number(1.0);
    }
    match (lhs, rhs) {
        (Expr::Neg(a), b) => Expr::neg(Expr::div(*a, b)),
        (a, Expr::Neg(b)) => Expr::neg(Expr::div(a, *b)),
        (lhs, rhs) => div_structural(lhs, rhs),
    }
}

fn div_structural(lhs: Expr, rhs: Expr) -> Expr {
    match (lhs, rhs) {
        (Expr::Mul(c, u), Expr::Number(d)) if c.as_number().is_some() => {
            match integral(c.as_number().unwrap_or(f64::NAN) / d) {
                Some(folded) if d != 0.0 => Expr::mul(folded, *u),
                _ => Expr::div(Expr::Mul(c, u), Expr::Number(d)),
            }
        }
        (Expr::Div(numer, denom), rhs) => Expr::div(*numer, Expr::mul(*denom, rhs)),
        (lhs, rhs) => {
            let (base_l, exp_l) = split_power(&lhs);
            let (base_r, exp_r) = split_power(&rhs);
            if base_l == base_r && base_l.as_number().is_none() {
                Expr::pow(base_l, Expr::sub(exp_l, exp_r))
            } else {
                Expr::div(lhs, rhs)
            }
        }
    }
}

fn pow(base: Expr, exponent: Expr) -> Expr {
    if let (Some(b), Some(e)) = (base.as_number(), exponent.as_number()) {
        if let Some(folded) = integral(b.powf(e)) {
            return folded;
        }
        return Expr::pow(base, exponent);
    }
    if exponent.is_number(0.0) || base.is_number(1.0) {
        return Expr::number(1.0);
    }
    if exponent.is_number(1.0) {
        return base;
    }
    match (base, exponent) {
        (Expr::Pow(inner, a), Expr::Number(b))
            if a.as_number().map_or(false, |a| a.fract() == 0.0) && b.fract() == 0.0 =>
        {
            Expr::pow(*inner, Expr::number(a.as_number().unwrap_or(1.0) * b))
        }
        (base, exponent) => Expr::pow(base, exponent),
    }
}

fn call(function: Function, args: Vec<Expr>) -> Expr {
    match (function, args.as_slice()) {
        (Function::Log, [Expr::Constant(Constant::E)]) => return Expr::number(1.0),
        (Function::Fraction | Function::Random, _) => {}
        (_, [Expr::Number(x)]) => {
            if let Some(folded) = integral(function.apply_real(*x)) {
                return folded;
            }
        }
        _ => {}
    }
    Expr::Call(function, args)
}

#[cfg(test)]
mod tests {
    use crate::parse;

    fn simplified(input: &str) -> String {
        parse(input).unwrap().simplify().to_string()
    }

    #[test]
    fn folds_exact_numbers_only() {
        assert_eq!(simplified("2 + 3 * 4"), "14");
        assert_eq!(simplified("6 / 3"), "2");
        assert_eq!(simplified("1 / 3"), "1 / 3");
        assert_eq!(simplified("2 ^ 10"), "1024");
        assert_eq!(simplified("2 ^ -1"), "2 ^ (-1)");
        assert_eq!(simplified("cos(0) + sqrt(2)"), "1 + sqrt(2)");
        assert_eq!(simplified("log(e)"), "1");
    }

    #[test]
    fn identities() {
        assert_eq!(simplified("0 * x + 1 * y"), "y");
        assert_eq!(simplified("x - 0"), "x");
        assert_eq!(simplified("0 - x"), "-x");
        assert_eq!(simplified("x ^ 1"), "x");
        assert_eq!(simplified("x ^ 0"), "1");
        assert_eq!(simplified("x / 1"), "x");
        assert_eq!(simplified("--x"), "x");
        assert_eq!(simplified("x - x"), "0");
        assert_eq!(simplified("sin(x) / sin(x)"), "1");
    }

    #[test]
    fn signs_and_coefficients() {
        assert_eq!(simplified("x + -y"), "x - y");
        assert_eq!(simplified("x - -y"), "x + y");
        assert_eq!(simplified("x * 2"), "2 * x");
        assert_eq!(simplified("2 * (3 * x)"), "6 * x");
        assert_eq!(simplified("-(2 * x)"), "-2 * x");
        assert_eq!(simplified("x + -3 * y"), "x - 3 * y");
        assert_eq!(simplified("2 * (1 / x)"), "2 / x");
    }

    #[test]
    fn like_terms_and_powers() {
        assert_eq!(simplified("x + x"), "2 * x");
        assert_eq!(simplified("2 * x + 3 * x"), "5 * x");
        assert_eq!(simplified("5 * x - 2 * x"), "3 * x");
        assert_eq!(simplified("x * x"), "x ^ 2");
        assert_eq!(simplified("x ^ 2 * x"), "x ^ 3");
        assert_eq!(simplified("x ^ 3 / x"), "x ^ 2");
        assert_eq!(simplified("(x ^ 2) ^ 3"), "x ^ 6");
    }

    #[test]
    fn derivative_results() {
        let d = |s: &str| parse(s).unwrap().derivative("x").unwrap().simplify().to_string();
        assert_eq!(d("x^2"), "2 * x");
        assert_eq!(d("sin(x)"), "cos(x)");
        assert_eq!(d("3*x^2 + 2*x + 1"), "6 * x + 2");
        assert_eq!(d("e^x"), "e ^ x");
        assert_eq!(d("sin(2*x)"), "2 * cos(2 * x)");
        assert_eq!(d("sin(x) * cos(x)"), "cos(x) ^ 2 - sin(x) ^ 2");
        let second = parse("x^3")
            .unwrap()
            .derivative("x")
            .unwrap()
            .simplify()
            .derivative("x")
            .unwrap()
            .simplify();
        assert_eq!(second.to_string(), "6 * x");
    }
}
