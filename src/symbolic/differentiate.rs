use crate::error::DiffError;
use crate::expression::{Constant, Expr};
use crate::function::Function;

impl Expr {
    /// Derivative with respect to `var`, before simplification.
    ///
    /// Implements the sum, product, quotient, power and chain rules. Every
    /// builtin function except `fraction` and `random` has a known derivative.
    pub fn derivative(&self, var: &str) -> Result<Expr, DiffError> {
        Ok(match self {
            Self::Number(_) | Self::Constant(_) => Expr::number(0.0),
            Self::Variable(name) => Expr::number(if name == var { 1.0 } else { 0.0 }),
            Self::Neg(only) => Expr::neg(only.derivative(var)?),
            Self::Add(lhs, rhs) => Expr::add(lhs.derivative(var)?, rhs.derivative(var)?),
            Self::Sub(lhs, rhs) => Expr::sub(lhs.derivative(var)?, rhs.derivative(var)?),
            Self::Mul(lhs, rhs) => match (lhs.contains_variable(var), rhs.contains_variable(var)) {
                (false, _) => Expr::mul(*lhs.clone(), rhs.derivative(var)?),
                (_, false) => Expr::mul(*rhs.clone(), lhs.derivative(var)?),
                _ => Expr::add(
                    Expr::mul(lhs.derivative(var)?, *rhs.clone()),
                    Expr::mul(*lhs.clone(), rhs.derivative(var)?),
                ),
            },
            Self::Div(lhs, rhs) => {
                if !rhs.contains_variable(var) {
                    Expr::div(lhs.derivative(var)?, *rhs.clone())
                } else {
                    Expr::div(
                        Expr::sub(
                            Expr::mul(lhs.derivative(var)?, *rhs.clone()),
                            Expr::mul(*lhs.clone(), rhs.derivative(var)?),
                        ),
                        Expr::pow(*rhs.clone(), Expr::number(2.0)),
                    )
                }
            }
            Self::Pow(base, exponent) => power_rule(base, exponent, var)?,
            Self::Call(function, args) => call_rule(*function, args, var)?,
        })
    }
}

fn power_rule(base: &Expr, exponent: &Expr, var: &str) -> Result<Expr, DiffError> {
    match (base.contains_variable(var), exponent.contains_variable(var)) {
        (false, false) => Ok(Expr::number(0.0)),
        // n * u^(n - 1) * u'
        (true, false) => Ok(Expr::mul(
            Expr::mul(
                exponent.clone(),
                Expr::pow(
                    base.clone(),
                    Expr::sub(exponent.clone(), Expr::number(1.0)),
                ),
            ),
            base.derivative(var)?,
        )),
        // a^v * log(a) * v'
        (false, true) => {
            let power = Expr::pow(base.clone(), exponent.clone());
            let scaled = match base {
                Expr::Constant(Constant::E) => power,
                _ => Expr::mul(power, Expr::call(Function::Log, base.clone())),
            };
            Ok(Expr::mul(scaled, exponent.derivative(var)?))
        }
        // u^v * (v' * log(u) + v * u' / u)
        (true, true) => Ok(Expr::mul(
            Expr::pow(base.clone(), exponent.clone()),
            Expr::add(
                Expr::mul(
                    exponent.derivative(var)?,
                    Expr::call(Function::Log, base.clone()),
                ),
                Expr::div(
                    Expr::mul(exponent.clone(), base.derivative(var)?),
                    base.clone(),
                ),
            ),
        )),
    }
}

fn call_rule(function: Function, args: &[Expr], var: &str) -> Result<Expr, DiffError> {
    let u = match (function, args) {
        (Function::Log, [value, base]) => {
            let quotient = Expr::div(
                Expr::call(Function::Log, value.clone()),
                Expr::call(Function::Log, base.clone()),
            );
            return quotient.derivative(var);
        }
        (Function::Fraction | Function::Random, _) => {
            return Err(DiffError::UnknownDerivative(function.name()))
        }
        (_, [only]) => only,
        _ => return Err(DiffError::UnknownDerivative(function.name())),
    };
    if !u.contains_variable(var) {
        return Ok(Expr::number(0.0));
    }

    let one = || Expr::number(1.0);
    let two = || Expr::number(2.0);
    let call = |f: Function| Expr::call(f, u.clone());
    let squared = |e: Expr| Expr::pow(e, two());

    let outer = match function {
        Function::Sin => call(Function::Cos),
        Function::Cos => Expr::neg(call(Function::Sin)),
        Function::Tan => squared(call(Function::Sec)),
        Function::Sec => Expr::mul(call(Function::Sec), call(Function::Tan)),
        Function::Csc => Expr::neg(Expr::mul(call(Function::Csc), call(Function::Cot))),
        Function::Cot => Expr::neg(squared(call(Function::Csc))),
        Function::Asin => Expr::div(
            one(),
            Expr::call(Function::Sqrt, Expr::sub(one(), squared(u.clone()))),
        ),
        Function::Acos => Expr::neg(Expr::div(
            one(),
            Expr::call(Function::Sqrt, Expr::sub(one(), squared(u.clone()))),
        )),
        Function::Atan => Expr::div(one(), Expr::add(one(), squared(u.clone()))),
        Function::Sinh => call(Function::Cosh),
        Function::Cosh => call(Function::Sinh),
        Function::Tanh => Expr::sub(one(), squared(call(Function::Tanh))),
        Function::Exp => call(Function::Exp),
        Function::Log => Expr::div(one(), u.clone()),
        Function::Log10 => Expr::div(
            one(),
            Expr::mul(u.clone(), Expr::call(Function::Log, Expr::number(10.0))),
        ),
        Function::Log2 => Expr::div(
            one(),
            Expr::mul(u.clone(), Expr::call(Function::Log, two())),
        ),
        Function::Sqrt => Expr::div(one(), Expr::mul(two(), call(Function::Sqrt))),
        Function::Cbrt => Expr::div(
            one(),
            Expr::mul(Expr::number(3.0), squared(call(Function::Cbrt))),
        ),
        Function::Abs => call(Function::Sign),
        Function::Sign => return Ok(Expr::number(0.0)),
        Function::Fraction | Function::Random => {
            return Err(DiffError::UnknownDerivative(function.name()))
        }
    };
    Ok(Expr::mul(outer, u.derivative(var)?))
}

#[cfg(test)]
mod tests {
    use crate::bindings::Bindings;
    use crate::error::DiffError;
    use crate::parse;
    use approx::assert_relative_eq;

    fn value_at(text: &str, x: f64) -> f64 {
        parse(text)
            .unwrap()
            .evaluate(&Bindings::x(x))
            .unwrap()
            .to_number()
            .unwrap()
    }

    /// Compares the symbolic derivative against a central difference.
    fn check(text: &str, points: &[f64]) {
        let expr = parse(text).unwrap();
        let derivative = expr.derivative("x").unwrap();
        let h = 1e-6;
        for &x in points {
            let symbolic = derivative
                .evaluate(&Bindings::x(x))
                .unwrap()
                .to_number()
                .unwrap();
            let numeric = (value_at(text, x + h) - value_at(text, x - h)) / (2.0 * h);
            assert_relative_eq!(symbolic, numeric, epsilon = 1e-4, max_relative = 1e-4);
        }
    }

    #[test]
    fn agrees_with_central_differences() {
        let points = [0.3, 0.7, 1.4];
        for text in [
            "x^3 - 2*x + 1",
            "sin(x) * cos(x)",
            "tan(x) + sec(x) + csc(x) + cot(x)",
            "asin(x / 2) + acos(x / 2) * 2 + atan(x)",
            "sinh(x) + cosh(x) + tanh(x)",
            "exp(2*x) / x",
            "log(x) + log10(x) + log2(x) + log(x, 3)",
            "sqrt(x) + cbrt(x) + abs(x - 1)",
            "x^x",
            "2^x + e^x",
            "-x / (1 + x^2)",
        ] {
            check(text, &points);
        }
    }

    #[test]
    fn other_variables_are_constants() {
        let expr = parse("x*y + y^2").unwrap();
        let dx = expr.derivative("x").unwrap();
        let v = dx.evaluate(&Bindings::xy(5.0, 3.0)).unwrap();
        assert_eq!(v.to_number(), Some(3.0));
    }

    #[test]
    fn unknown_derivatives() {
        assert_eq!(
            parse("fraction(x, 2)").unwrap().derivative("x"),
            Err(DiffError::UnknownDerivative("fraction"))
        );
        assert_eq!(
            parse("random() + x").unwrap().derivative("x"),
            Err(DiffError::UnknownDerivative("random"))
        );
    }
}
