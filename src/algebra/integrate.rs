use crate::expression::{Constant, Expr};
use crate::function::Function;

/// Highest polynomial degree integrated by parts.
const MAX_PARTS_DEGREE: usize = 12;

impl Expr {
    /// Rule-based antiderivative with respect to `var`, without the constant
    /// of integration. `None` when no rule applies.
    ///
    /// The integrand is simplified first. If no rule matches it, products of
    /// polynomial factors are multiplied out and the rules run once more.
    pub fn integrate(&self, var: &str) -> Option<Expr> {
        let integrand = self.simplify();
        integrand
            .integrate_raw(var)
            .or_else(|| {
                let expanded = expand_polynomials(&integrand, var).simplify();
                (expanded != integrand).then(|| expanded.integrate_raw(var))?
            })
            .map(|e| e.simplify())
    }

    fn integrate_raw(&self, var: &str) -> Option<Expr> {
        if !self.contains_variable(var) {
            return Some(Expr::mul(self.clone(), Expr::var(var)));
        }
        match self {
            // ∫ x dx = x^2 / 2
            Self::Variable(_) => Some(Expr::div(
                Expr::pow(self.clone(), Expr::number(2.0)),
                Expr::number(2.0),
            )),
            Self::Neg(only) => Some(Expr::neg(only.integrate_raw(var)?)),
            Self::Add(lhs, rhs) => Some(Expr::add(lhs.integrate_raw(var)?, rhs.integrate_raw(var)?)),
            Self::Sub(lhs, rhs) => Some(Expr::sub(lhs.integrate_raw(var)?, rhs.integrate_raw(var)?)),
            Self::Mul(lhs, rhs) => integrate_product(lhs, rhs, var),
            Self::Div(lhs, rhs) => integrate_quotient(lhs, rhs, var),
            Self::Pow(base, exponent) => integrate_power(base, exponent, var),
            Self::Call(function, args) => match args.as_slice() {
                [only] => integrate_call(*function, only, var),
                _ => None,
            },
            Self::Number(_) | Self::Constant(_) => None,
        }
    }
}

/// Slope `a` if `expr` is `a * var + b` with `a != 0`.
fn linear_slope(expr: &Expr, var: &str) -> Option<f64> {
    let slope = expr.derivative(var).ok()?.simplify().as_number()?;
    (slope != 0.0 && slope.is_finite()).then_some(slope)
}

/// `F(u) / a`, the antiderivative of `f(a * x + b)` given `F` for `f`.
fn over_slope(antiderivative: Expr, slope: f64) -> Expr {
    if slope == 1.0 {
        antiderivative
    } else {
        Expr::div(antiderivative, Expr::number(slope))
    }
}

fn log_abs(expr: Expr) -> Expr {
    Expr::call(Function::Log, Expr::call(Function::Abs, expr))
}

fn integrate_call(function: Function, u: &Expr, var: &str) -> Option<Expr> {
    let a = linear_slope(u, var)?;
    let call = |f: Function| Expr::call(f, u.clone());
    let one = || Expr::number(1.0);
    let one_minus_u_squared = || Expr::sub(one(), Expr::pow(u.clone(), Expr::number(2.0)));

    let antiderivative = match function {
        Function::Sin => Expr::neg(call(Function::Cos)),
        Function::Cos => call(Function::Sin),
        Function::Tan => Expr::neg(log_abs(call(Function::Cos))),
        Function::Sec => log_abs(Expr::add(call(Function::Sec), call(Function::Tan))),
        Function::Csc => Expr::neg(log_abs(Expr::add(call(Function::Csc), call(Function::Cot)))),
        Function::Cot => log_abs(call(Function::Sin)),
        Function::Exp => call(Function::Exp),
        Function::Sinh => call(Function::Cosh),
        Function::Cosh => call(Function::Sinh),
        // u log(u) - u
        Function::Log => Expr::sub(Expr::mul(u.clone(), call(Function::Log)), u.clone()),
        // 2/3 u^(3/2)
        Function::Sqrt => Expr::div(
            Expr::mul(
                Expr::number(2.0),
                Expr::pow(u.clone(), Expr::div(Expr::number(3.0), Expr::number(2.0))),
            ),
            Expr::number(3.0),
        ),
        // u atan(u) - log(1 + u^2) / 2
        Function::Atan => Expr::sub(
            Expr::mul(u.clone(), call(Function::Atan)),
            Expr::div(
                Expr::call(
                    Function::Log,
                    Expr::add(one(), Expr::pow(u.clone(), Expr::number(2.0))),
                ),
                Expr::number(2.0),
            ),
        ),
        // u asin(u) + sqrt(1 - u^2)
        Function::Asin => Expr::add(
            Expr::mul(u.clone(), call(Function::Asin)),
            Expr::call(Function::Sqrt, one_minus_u_squared()),
        ),
        // u acos(u) - sqrt(1 - u^2)
        Function::Acos => Expr::sub(
            Expr::mul(u.clone(), call(Function::Acos)),
            Expr::call(Function::Sqrt, one_minus_u_squared()),
        ),
        _ => return None,
    };
    Some(over_slope(antiderivative, a))
}

fn integrate_power(base: &Expr, exponent: &Expr, var: &str) -> Option<Expr> {
    let exponent = &exponent.simplify();
    match (base.contains_variable(var), exponent.contains_variable(var)) {
        // (a x + b)^n
        (true, false) => {
            if let (Expr::Call(Function::Sec, args), true) = (base, exponent.is_number(2.0)) {
                let a = linear_slope(args.first()?, var)?;
                return Some(over_slope(Expr::Call(Function::Tan, args.clone()), a));
            }
            if let (Expr::Call(Function::Csc, args), true) = (base, exponent.is_number(2.0)) {
                let a = linear_slope(args.first()?, var)?;
                return Some(over_slope(
                    Expr::neg(Expr::Call(Function::Cot, args.clone())),
                    a,
                ));
            }
            let a = linear_slope(base, var)?;
            if exponent.is_number(-1.0) {
                return Some(over_slope(log_abs(base.clone()), a));
            }
            let raised = Expr::add(exponent.clone(), Expr::number(1.0));
            Some(over_slope(
                Expr::div(Expr::pow(base.clone(), raised.clone()), raised),
                a,
            ))
        }
        // c^(a x + b)
        (false, true) => {
            let a = linear_slope(exponent, var)?;
            let power = Expr::pow(base.clone(), exponent.clone());
            let antiderivative = match base {
                Expr::Constant(Constant::E) => power,
                _ => Expr::div(power, Expr::call(Function::Log, base.clone())),
            };
            Some(over_slope(antiderivative, a))
        }
        _ => None,
    }
}

fn integrate_quotient(numer: &Expr, denom: &Expr, var: &str) -> Option<Expr> {
    if !denom.contains_variable(var) {
        return Some(Expr::div(numer.integrate_raw(var)?, denom.clone()));
    }
    if numer.contains_variable(var) {
        return None;
    }
    // c / g(x) = c * (1 / g(x))
    let reciprocal = reciprocal_integral(denom, var)?;
    Some(if numer.is_number(1.0) {
        reciprocal
    } else {
        Expr::mul(numer.clone(), reciprocal)
    })
}

/// ∫ 1 / g(x) dx for the recognized shapes of `g`.
fn reciprocal_integral(denom: &Expr, var: &str) -> Option<Expr> {
    let x = Expr::var(var);
    let x_squared = Expr::pow(x.clone(), Expr::number(2.0));
    // 1 / (1 + x^2)
    if *denom == Expr::add(Expr::number(1.0), x_squared.clone())
        || *denom == Expr::add(x_squared.clone(), Expr::number(1.0))
    {
        return Some(Expr::call(Function::Atan, x));
    }
    // 1 / sqrt(1 - x^2)
    if *denom == Expr::call(Function::Sqrt, Expr::sub(Expr::number(1.0), x_squared)) {
        return Some(Expr::call(Function::Asin, x));
    }
    // 1 / (a x + b)
    if let Some(a) = linear_slope(denom, var) {
        return Some(over_slope(log_abs(denom.clone()), a));
    }
    // 1 / (a x + b)^n
    if let Expr::Pow(base, exponent) = denom {
        if !exponent.contains_variable(var) {
            return integrate_power(base, &Expr::neg(*exponent.clone()).simplify(), var);
        }
    }
    None
}

fn integrate_product(lhs: &Expr, rhs: &Expr, var: &str) -> Option<Expr> {
    match (lhs.contains_variable(var), rhs.contains_variable(var)) {
        (false, _) => Some(Expr::mul(lhs.clone(), rhs.integrate_raw(var)?)),
        (_, false) => Some(Expr::mul(rhs.clone(), lhs.integrate_raw(var)?)),
        _ => integrate_by_parts(lhs, rhs, var).or_else(|| integrate_by_parts(rhs, lhs, var)),
    }
}

/// Multiplies out products and small whole powers whose factors are
/// polynomials in `var`.
fn expand_polynomials(expr: &Expr, var: &str) -> Expr {
    let expand = |e: &Expr| expand_polynomials(e, var);
    match expr {
        Expr::Neg(only) => Expr::neg(expand(only)),
        Expr::Add(lhs, rhs) => Expr::add(expand(lhs), expand(rhs)),
        Expr::Sub(lhs, rhs) => Expr::sub(expand(lhs), expand(rhs)),
        Expr::Div(lhs, rhs) if !rhs.contains_variable(var) => {
            Expr::div(expand(lhs), *rhs.clone())
        }
        Expr::Mul(lhs, rhs) if is_polynomial(lhs, var) && is_polynomial(rhs, var) => {
            distribute(expand(lhs), expand(rhs))
        }
        Expr::Pow(base, exponent) if is_polynomial(expr, var) => match exponent.as_number() {
            Some(n) if (2.0..=MAX_PARTS_DEGREE as f64).contains(&n) => {
                let base = expand(base);
                (1..n as usize).fold(base.clone(), |acc, _| distribute(acc, base.clone()))
            }
            _ => expr.clone(),
        },
        _ => expr.clone(),
    }
}

/// `lhs * rhs` with the product pushed through every sum and difference.
fn distribute(lhs: Expr, rhs: Expr) -> Expr {
    match (lhs, rhs) {
        (Expr::Add(a, b), c) => Expr::add(distribute(*a, c.clone()), distribute(*b, c)),
        (Expr::Sub(a, b), c) => Expr::sub(distribute(*a, c.clone()), distribute(*b, c)),
        (Expr::Neg(a), c) => Expr::neg(distribute(*a, c)),
        (a, Expr::Add(b, c)) => Expr::add(distribute(a.clone(), *b), distribute(a, *c)),
        (a, Expr::Sub(b, c)) => Expr::sub(distribute(a.clone(), *b), distribute(a, *c)),
        (a, Expr::Neg(b)) => Expr::neg(distribute(a, *b)),
        (a, b) => Expr::mul(a, b),
    }
}

/// Whether `expr` is a polynomial in `var` with non-negative integer powers.
fn is_polynomial(expr: &Expr, var: &str) -> bool {
    match expr {
        Expr::Number(_) | Expr::Constant(_) => true,
        Expr::Variable(_) => true,
        Expr::Neg(only) => is_polynomial(only, var),
        Expr::Add(lhs, rhs) | Expr::Sub(lhs, rhs) | Expr::Mul(lhs, rhs) => {
            is_polynomial(lhs, var) && is_polynomial(rhs, var)
        }
        Expr::Div(lhs, rhs) => is_polynomial(lhs, var) && !rhs.contains_variable(var),
        Expr::Pow(base, exponent) => match exponent.as_number() {
            Some(n) => n >= 0.0 && n.fract() == 0.0 && is_polynomial(base, var),
            None => !base.contains_variable(var) && !exponent.contains_variable(var),
        },
        Expr::Call(..) => !expr.contains_variable(var),
    }
}

/// `x^n` as `n`, for the logarithm rule.
fn monomial_degree(expr: &Expr, var: &str) -> Option<f64> {
    match expr {
        Expr::Variable(name) if name == var => Some(1.0),
        Expr::Pow(base, exponent) if matches!(&**base, Expr::Variable(name) if name == var) => {
            exponent.simplify().as_number()
        }
        _ => None,
    }
}

/// Whether repeated antiderivatives of `expr` stay in closed form:
/// `exp`, `sin` and `cos` of a linear argument, or `e^(a x + b)`.
fn cycles_under_integration(expr: &Expr, var: &str) -> bool {
    match expr {
        Expr::Call(Function::Exp | Function::Sin | Function::Cos, args) => {
            args.len() == 1 && linear_slope(&args[0], var).is_some()
        }
        Expr::Pow(base, exponent) => {
            !base.contains_variable(var) && linear_slope(exponent, var).is_some()
        }
        _ => false,
    }
}

fn integrate_by_parts(poly: &Expr, other: &Expr, var: &str) -> Option<Expr> {
    // ∫ x^n log(x) = x^(n+1) / (n+1) * log(x) - x^(n+1) / (n+1)^2
    if let (Some(n), Expr::Call(Function::Log, args)) = (monomial_degree(poly, var), other) {
        if n != -1.0 && matches!(args.as_slice(), [arg] if *arg == Expr::var(var)) {
            let raised = Expr::pow(Expr::var(var), Expr::number(n + 1.0));
            return Some(Expr::sub(
                Expr::mul(
                    Expr::div(raised.clone(), Expr::number(n + 1.0)),
                    other.clone(),
                ),
                Expr::div(raised, Expr::number((n + 1.0) * (n + 1.0))),
            ));
        }
    }

    // Tabular: ∫ p g = p G1 - p' G2 + p'' G3 - ...
    if !is_polynomial(poly, var) || !cycles_under_integration(other, var) {
        return None;
    }
    let mut derivative = poly.simplify();
    let mut antiderivative = other.integrate(var)?;
    let mut sum: Option<Expr> = None;
    for k in 0..=MAX_PARTS_DEGREE {
        let term = Expr::mul(derivative.clone(), antiderivative.clone());
        sum = Some(match sum {
            None => term,
            Some(acc) if k % 2 == 1 => Expr::sub(acc, term),
            Some(acc) => Expr::add(acc, term),
        });
        derivative = derivative.derivative(var).ok()?.simplify();
        if derivative.is_number(0.0) {
            return sum;
        }
        antiderivative = antiderivative.integrate(var)?;
    }
    None
}

#[cfg(test)]
mod tests {
    use crate::bindings::Bindings;
    use crate::parse;
    use approx::assert_relative_eq;

    fn at(expr: &crate::Expr, x: f64) -> f64 {
        expr.evaluate(&Bindings::x(x)).unwrap().to_number().unwrap()
    }

    /// The antiderivative's derivative matches the integrand numerically.
    fn check(text: &str) {
        let f = parse(text).unwrap();
        let antiderivative = f
            .integrate("x")
            .unwrap_or_else(|| panic!("no antiderivative for {text}"));
        let h = 1e-5;
        for x in [0.2, 0.45, 0.8] {
            let numeric = (at(&antiderivative, x + h) - at(&antiderivative, x - h)) / (2.0 * h);
            assert_relative_eq!(numeric, at(&f, x), epsilon = 1e-5, max_relative = 1e-5);
        }
    }

    #[test]
    fn differentiates_back_to_integrand() {
        for text in [
            "3",
            "x",
            "x^2 + 2*x - 7",
            "x^-2",
            "1/x",
            "5/(2*x + 1)",
            "sqrt(x)",
            "(3*x + 1)^4",
            "sin(x) + cos(3*x)",
            "tan(x)",
            "sec(x)",
            "csc(x)",
            "cot(x)",
            "sec(x)^2",
            "csc(2*x)^2",
            "exp(2*x - 1)",
            "e^x",
            "2^x",
            "log(x)",
            "sinh(x) - cosh(x)",
            "atan(x) + asin(x) + acos(x)",
            "1/(1 + x^2)",
            "1/sqrt(1 - x^2)",
            "x * exp(x)",
            "x^2 * sin(x)",
            "cos(2*x) * x^3",
            "x * e^(3*x)",
            "x * log(x)",
            "x^2 * log(x)",
            "x * x",
            "3 * x * x",
            "x * x^2",
            "x^2 / x",
            "(x + 1) * (x - 1)",
            "(2*x - 3) * (x + 4) * x",
            "(x^2 + 1)^2",
            "(x + 1) * (x - 1) / 4",
        ] {
            check(text);
        }
    }

    #[test]
    fn readable_results() {
        let integral = |s: &str| parse(s).unwrap().integrate("x").unwrap().to_string();
        assert_eq!(integral("x^2"), "x ^ 3 / 3");
        assert_eq!(integral("sin(x)"), "-cos(x)");
        assert_eq!(integral("1/x"), "log(abs(x))");
        assert_eq!(integral("2*x"), "x ^ 2");
        assert_eq!(integral("1/(1+x^2)"), "atan(x)");
        assert_eq!(integral("x*x"), "x ^ 3 / 3");
        assert_eq!(integral("x^2/x"), "x ^ 2 / 2");
        assert_eq!(integral("3*x*x"), "x ^ 3");
    }

    #[test]
    fn unknown_integrands_have_no_rule() {
        for text in ["sin(x)/x", "exp(x^2)", "x^x", "sin(x)*cos(x)", "log(x)/x"] {
            assert_eq!(parse(text).unwrap().integrate("x"), None, "{text}");
        }
    }
}
