use once_cell::sync::Lazy;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;

use crate::error::ParseError;
use crate::expression::{Constant, Expr};
use crate::function::Function;

#[derive(Parser)]
#[grammar = "grammar.pest"] // relative to project `src`
struct ExpressionParser;

/// Parse an infix expression into an [`Expr`].
///
/// Identifiers naming a [`Constant`] become constants, identifiers followed by
/// parentheses must name a builtin [`Function`], and all other identifiers are
/// variables. No implicit multiplication is performed here; see
/// [`normalize`](crate::normalize).
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let mut pairs = ExpressionParser::parse(Rule::calculation, input).map_err(Box::new)?;
    match pairs.next() {
        Some(expr) => build_expr(expr.into_inner()),
        None => Err(ParseError::Empty),
    }
}

/// Parse a backend command of the form `name(arg, ...)`.
pub fn parse_command(input: &str) -> Result<(String, Vec<Expr>), ParseError> {
    let pairs = ExpressionParser::parse(Rule::command, input).map_err(Box::new)?;
    let mut name = String::new();
    let mut args = Vec::new();
    for pair in pairs {
        match pair.as_rule() {
            Rule::command_name => name = pair.as_str().to_string(),
            Rule::command_args => {
                for arg in pair.into_inner() {
                    args.push(build_expr(arg.into_inner())?);
                }
            }
            _ => {}
        }
    }
    Ok((name, args))
}

static PRATT_PARSER: Lazy<PrattParser<Rule>> = Lazy::new(|| {
    use Assoc::*;
    use Rule::*;

    // Lowest precedence first. Unary minus binds tighter than `*` but looser
    // than `^`, so `-x^2` is `-(x^2)`.
    PrattParser::new()
        .op(Op::infix(add, Left) | Op::infix(subtract, Left))
        .op(Op::infix(multiply, Left) | Op::infix(divide, Left))
        .op(Op::prefix(neg) | Op::prefix(pos))
        .op(Op::infix(power, Right))
});

fn build_expr(pairs: Pairs<Rule>) -> Result<Expr, ParseError> {
    PRATT_PARSER
        .map_primary(build_primary)
        .map_prefix(|op, rhs| match op.as_rule() {
            Rule::neg => Ok(Expr::neg(rhs?)),
            _ => rhs,
        })
        .map_infix(|lhs, op, rhs| {
            let (lhs, rhs) = (lhs?, rhs?);
            Ok(match op.as_rule() {
                Rule::add => Expr::add(lhs, rhs),
                Rule::subtract => Expr::sub(lhs, rhs),
                Rule::multiply => Expr::mul(lhs, rhs),
                Rule::divide => Expr::div(lhs, rhs),
                Rule::power => Expr::pow(lhs, rhs),
                rule => unreachable!("Unexpected operator {rule:?}"),
            })
        })
        .parse(pairs)
}

fn build_primary(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    match pair.as_rule() {
        Rule::expr => build_expr(pair.into_inner()),
        Rule::number => {
            let literal = pair.as_str();
            literal
                .parse::<f64>()
                .map(Expr::Number)
                .map_err(|_| ParseError::InvalidNumber(literal.to_string()))
        }
        Rule::identifier => {
            let name = pair.as_str();
            Ok(match Constant::from_name(name) {
                Some(constant) => Expr::Constant(constant),
                None => Expr::var(name),
            })
        }
        Rule::call => {
            let mut inner = pair.into_inner();
            let name = inner.next().map(|p| p.as_str()).unwrap_or_default();
            let function = Function::from_name(name)
                .ok_or_else(|| ParseError::UnknownFunction(name.to_string()))?;
            let args = match inner.next() {
                Some(args) => args
                    .into_inner()
                    .map(|arg| build_expr(arg.into_inner()))
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            let arity = function.arity();
            if !arity.accepts(args.len()) {
                return Err(ParseError::Arity {
                    name: name.to_string(),
                    expected: arity.describe(),
                    got: args.len(),
                });
            }
            Ok(Expr::Call(function, args))
        }
        rule => unreachable!("Unexpected primary rule {rule:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_precedence() {
        assert_eq!(
            parse("1 * 2 + 3 * 4").unwrap(),
            Expr::add(
                Expr::mul(Expr::number(1.0), Expr::number(2.0)),
                Expr::mul(Expr::number(3.0), Expr::number(4.0))
            )
        );
        assert_eq!(
            parse("4 ^ 3 ^ 2").unwrap(),
            Expr::pow(
                Expr::number(4.0),
                Expr::pow(Expr::number(3.0), Expr::number(2.0))
            )
        );
        assert_eq!(
            parse("-x^2").unwrap(),
            Expr::neg(Expr::pow(Expr::var("x"), Expr::number(2.0)))
        );
        assert_eq!(parse("2**3").unwrap(), parse("2^3").unwrap());
        assert_eq!(
            parse("2^-1").unwrap(),
            Expr::pow(Expr::number(2.0), Expr::neg(Expr::number(1.0)))
        );
    }

    #[test]
    fn constants_functions_and_variables() {
        assert_eq!(parse("pi").unwrap(), Expr::Constant(Constant::Pi));
        assert_eq!(parse("e").unwrap(), Expr::Constant(Constant::E));
        assert_eq!(parse("xy").unwrap(), Expr::var("xy"));
        assert_eq!(
            parse("sin(x)").unwrap(),
            Expr::call(Function::Sin, Expr::var("x"))
        );
        assert_eq!(
            parse("log(x, 10)").unwrap(),
            Expr::Call(Function::Log, vec![Expr::var("x"), Expr::number(10.0)])
        );
        assert_eq!(parse("random()").unwrap(), Expr::Call(Function::Random, vec![]));
        assert_eq!(parse("1.5e3").unwrap(), Expr::number(1500.0));
        assert_eq!(parse(".5").unwrap(), Expr::number(0.5));
    }

    #[test]
    fn parse_failures() {
        assert_eq!(parse("  "), Err(ParseError::Empty));
        assert!(matches!(parse("2 +"), Err(ParseError::Grammar(_))));
        assert!(matches!(parse("2x"), Err(ParseError::Grammar(_))));
        assert_eq!(
            parse("foo(x)"),
            Err(ParseError::UnknownFunction("foo".to_string()))
        );
        assert!(matches!(
            parse("sin(x, y)"),
            Err(ParseError::Arity { got: 2, .. })
        ));
    }

    #[test]
    fn commands() {
        let (name, args) = parse_command("integral(x^2, x)").unwrap();
        assert_eq!(name, "integral");
        assert_eq!(args.len(), 2);
        assert_eq!(args[1], Expr::var("x"));

        let (name, args) = parse_command("taylor(sin(x), x, 0, 5)").unwrap();
        assert_eq!(name, "taylor");
        assert_eq!(args[3], Expr::number(5.0));
    }
}
