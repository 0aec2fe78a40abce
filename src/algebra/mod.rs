//! Text-command algebra backend.
//!
//! Commands have the shape `name(arg, ...)` and answer with the rendered
//! result, in the style of a computer algebra system's REPL:
//!
//! - `integral(f, x)`: antiderivative, echoed back unevaluated when no rule
//!   applies
//! - `taylor(f, x, a, n)`: first `n` terms of the Taylor series around `a`
//! - `d(f, x)`: simplified derivative
//! - `simplify(f)`

mod coefficients;
mod integrate;
mod taylor;

use tracing::debug;

use crate::bindings::Bindings;
use crate::error::AlgebraError;
use crate::expression::Expr;
use crate::parse::parse_command;
use crate::symbolic::nth_derivative;

pub use coefficients::taylor_coefficients;
pub use taylor::{taylor, MAX_SERIES_TERMS};

#[derive(Clone, Copy, Debug, Default)]
pub struct Algebra;

impl Algebra {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, command: &str) -> Result<String, AlgebraError> {
        let (name, args) = parse_command(command)?;
        let result = match name.as_str() {
            "integral" => {
                let (f, var) = function_and_variable("integral", &args)?;
                match f.integrate(var) {
                    Some(antiderivative) => antiderivative.to_string(),
                    None => format!("integral({f}, {var})"),
                }
            }
            "taylor" => {
                let [f, var, point, terms] = args.as_slice() else {
                    return Err(bad("taylor", "expects (f, x, a, n)"));
                };
                let var = variable_name("taylor", var)?;
                let point = constant_value("taylor", point)?;
                let terms = constant_value("taylor", terms)?;
                if terms < 1.0 || terms.fract() != 0.0 {
                    return Err(bad("taylor", "needs a positive whole number of terms"));
                }
                if terms > MAX_SERIES_TERMS as f64 {
                    return Err(bad(
                        "taylor",
                        &format!("takes at most {MAX_SERIES_TERMS} terms"),
                    ));
                }
                taylor(f, var, point, terms as usize)?.to_string()
            }
            "d" => {
                let (f, var) = function_and_variable("d", &args)?;
                nth_derivative(f, var, 1)?.to_string()
            }
            "simplify" => match args.as_slice() {
                [f] => f.simplify().to_string(),
                _ => return Err(bad("simplify", "expects (f)")),
            },
            _ => return Err(AlgebraError::UnknownCommand(name)),
        };
        debug!(command, result = %result, "algebra command");
        Ok(result)
    }
}

fn bad(command: &'static str, reason: &str) -> AlgebraError {
    AlgebraError::BadArguments {
        command,
        reason: reason.to_string(),
    }
}

fn function_and_variable<'a>(
    command: &'static str,
    args: &'a [Expr],
) -> Result<(&'a Expr, &'a str), AlgebraError> {
    match args {
        [f, var] => Ok((f, variable_name(command, var)?)),
        _ => Err(bad(command, "expects (f, x)")),
    }
}

fn variable_name<'a>(command: &'static str, arg: &'a Expr) -> Result<&'a str, AlgebraError> {
    match arg {
        Expr::Variable(name) => Ok(name),
        other => Err(bad(command, &format!("needs a variable, got '{other}'"))),
    }
}

fn constant_value(command: &'static str, arg: &Expr) -> Result<f64, AlgebraError> {
    arg.evaluate(&Bindings::new())
        .ok()
        .and_then(|v| v.to_number())
        .filter(|n| n.is_finite())
        .ok_or_else(|| bad(command, &format!("needs a number, got '{arg}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(command: &str) -> Result<String, AlgebraError> {
        Algebra::new().run(command)
    }

    #[test]
    fn integral_command() {
        assert_eq!(run("integral(x^2, x)").unwrap(), "x ^ 3 / 3");
        assert_eq!(run("integral(cos(x), x)").unwrap(), "sin(x)");
        assert_eq!(run("integral(x*x, x)").unwrap(), "x ^ 3 / 3");
        assert!(!run("integral((x+1)*(x-1), x)").unwrap().starts_with("integral("));
        assert_eq!(
            run("integral(sin(x)/x, x)").unwrap(),
            "integral(sin(x) / x, x)"
        );
    }

    #[test]
    fn taylor_command() {
        assert_eq!(run("taylor(sin(x), x, 0, 5)").unwrap(), "x - x ^ 3 / 6");
        assert_eq!(run("taylor(x^2, x, 1, 3)").unwrap(), "1 + 2 * (x - 1) + (x - 1) ^ 2");
        assert!(matches!(
            run("taylor(sin(x), x, 0, 2.5)"),
            Err(AlgebraError::BadArguments { command: "taylor", .. })
        ));
        assert!(matches!(
            run("taylor(sin(x), x, 0, 1000000)"),
            Err(AlgebraError::BadArguments { command: "taylor", .. })
        ));
        assert!(matches!(
            run("taylor(sin(x), x, y, 3)"),
            Err(AlgebraError::BadArguments { command: "taylor", .. })
        ));
    }

    #[test]
    fn derivative_and_simplify_commands() {
        assert_eq!(run("d(x^3, x)").unwrap(), "3 * x ^ 2");
        assert_eq!(run("simplify(x + x + 0)").unwrap(), "2 * x");
        assert_eq!(
            run("d(fraction(x, 2), x)"),
            Err(AlgebraError::Differentiation(
                crate::error::DiffError::UnknownDerivative("fraction")
            ))
        );
    }

    #[test]
    fn malformed_commands() {
        assert_eq!(run("solve(x, x)"), Err(AlgebraError::UnknownCommand("solve".into())));
        assert!(matches!(
            run("d(x^2, 2)"),
            Err(AlgebraError::BadArguments { command: "d", .. })
        ));
        assert!(matches!(run("integral(x^2"), Err(AlgebraError::Parse(_))));
    }
}
