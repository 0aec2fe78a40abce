use std::fmt;

use crate::function::Function;

/// Syntax tree produced by [`parse`](crate::parse()).
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    // Leaves.
    Number(f64),
    Constant(Constant),
    Variable(String),

    // Unary.
    Neg(Box<Expr>),

    // Binary.
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),

    // Builtin function application.
    Call(Function, Vec<Expr>),
}

/// Named constants recognized by the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Constant {
    Pi,
    E,
    Tau,
    Phi,
    /// The imaginary unit.
    I,
}

impl Constant {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pi" | "PI" => Some(Self::Pi),
            "e" | "E" => Some(Self::E),
            "tau" => Some(Self::Tau),
            "phi" => Some(Self::Phi),
            "i" => Some(Self::I),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pi => "pi",
            Self::E => "e",
            Self::Tau => "tau",
            Self::Phi => "phi",
            Self::I => "i",
        }
    }

    /// Real value, `None` for the imaginary unit.
    pub fn real_value(self) -> Option<f64> {
        match self {
            Self::Pi => Some(std::f64::consts::PI),
            Self::E => Some(std::f64::consts::E),
            Self::Tau => Some(std::f64::consts::TAU),
            Self::Phi => Some(1.618_033_988_749_895),
            Self::I => None,
        }
    }
}

impl Expr {
    pub fn number(value: f64) -> Self {
        Self::Number(value)
    }

    pub fn var(name: &str) -> Self {
        Self::Variable(name.to_string())
    }

    pub fn call(function: Function, arg: Expr) -> Self {
        Self::Call(function, vec![arg])
    }

    pub fn neg(only: Expr) -> Self {
        Self::Neg(Box::new(only))
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Self::Add(Box::new(lhs), Box::new(rhs))
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Self {
        Self::Sub(Box::new(lhs), Box::new(rhs))
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Self {
        Self::Mul(Box::new(lhs), Box::new(rhs))
    }

    pub fn div(lhs: Expr, rhs: Expr) -> Self {
        Self::Div(Box::new(lhs), Box::new(rhs))
    }

    pub fn pow(base: Expr, exponent: Expr) -> Self {
        Self::Pow(Box::new(base), Box::new(exponent))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_number(&self, value: f64) -> bool {
        self.as_number() == Some(value)
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            Self::Number(_) | Self::Constant(_) | Self::Variable(_) => 1,
            Self::Neg(only) => 1 + only.node_count(),
            Self::Add(lhs, rhs)
            | Self::Sub(lhs, rhs)
            | Self::Mul(lhs, rhs)
            | Self::Div(lhs, rhs)
            | Self::Pow(lhs, rhs) => 1 + lhs.node_count() + rhs.node_count(),
            Self::Call(_, args) => 1 + args.iter().map(Expr::node_count).sum::<usize>(),
        }
    }

    pub fn contains_variable(&self, var: &str) -> bool {
        match self {
            Self::Number(_) | Self::Constant(_) => false,
            Self::Variable(name) => name == var,
            Self::Neg(only) => only.contains_variable(var),
            Self::Add(lhs, rhs)
            | Self::Sub(lhs, rhs)
            | Self::Mul(lhs, rhs)
            | Self::Div(lhs, rhs)
            | Self::Pow(lhs, rhs) => lhs.contains_variable(var) || rhs.contains_variable(var),
            Self::Call(_, args) => args.iter().any(|a| a.contains_variable(var)),
        }
    }

    /// Replaces every occurrence of variable `var` by `with`.
    pub fn substitute(&self, var: &str, with: &Expr) -> Expr {
        match self {
            Self::Variable(name) if name == var => with.clone(),
            Self::Number(_) | Self::Constant(_) | Self::Variable(_) => self.clone(),
            Self::Neg(only) => Self::neg(only.substitute(var, with)),
            Self::Add(lhs, rhs) => Self::add(lhs.substitute(var, with), rhs.substitute(var, with)),
            Self::Sub(lhs, rhs) => Self::sub(lhs.substitute(var, with), rhs.substitute(var, with)),
            Self::Mul(lhs, rhs) => Self::mul(lhs.substitute(var, with), rhs.substitute(var, with)),
            Self::Div(lhs, rhs) => Self::div(lhs.substitute(var, with), rhs.substitute(var, with)),
            Self::Pow(lhs, rhs) => Self::pow(lhs.substitute(var, with), rhs.substitute(var, with)),
            Self::Call(f, args) => {
                Self::Call(*f, args.iter().map(|a| a.substitute(var, with)).collect())
            }
        }
    }

    /// Binding strength used when printing.
    fn precedence(&self) -> u8 {
        match self {
            Self::Add(..) | Self::Sub(..) => 1,
            Self::Mul(..) | Self::Div(..) => 2,
            Self::Neg(_) => 3,
            Self::Pow(..) => 4,
            Self::Number(n) if *n < 0.0 => 3,
            Self::Number(_) | Self::Constant(_) | Self::Variable(_) | Self::Call(..) => 5,
        }
    }
}

/// Formats a float without a trailing `.0` for integral values.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

struct Operand<'a> {
    expr: &'a Expr,
    parens: bool,
}

// Left operands may share the parent's precedence (left associativity), right
// operands of non-commutative ops may not.
fn left(expr: &Expr, prec: u8) -> Operand<'_> {
    Operand {
        expr,
        parens: expr.precedence() < prec,
    }
}

fn right(expr: &Expr, prec: u8, strict: bool) -> Operand<'_> {
    let own = expr.precedence();
    Operand {
        expr,
        parens: own < prec || (strict && own == prec),
    }
}

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parens {
            write!(f, "({})", self.expr)
        } else {
            write!(f, "{}", self.expr)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = self.precedence();
        match self {
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Constant(c) => f.write_str(c.name()),
            Self::Variable(name) => f.write_str(name),
            Self::Neg(only) => write!(f, "-{}", right(only, prec, true)),
            Self::Add(lhs, rhs) => write!(f, "{} + {}", left(lhs, prec), right(rhs, prec, false)),
            Self::Sub(lhs, rhs) => write!(f, "{} - {}", left(lhs, prec), right(rhs, prec, true)),
            Self::Mul(lhs, rhs) => write!(f, "{} * {}", left(lhs, prec), right(rhs, prec, false)),
            Self::Div(lhs, rhs) => write!(f, "{} / {}", left(lhs, prec), right(rhs, prec, true)),
            Self::Pow(base, exponent) => {
                // Right associative: the base needs parens at equal precedence.
                let base = Operand {
                    expr: base,
                    parens: base.precedence() <= prec,
                };
                write!(f, "{} ^ {}", base, right(exponent, prec, false))
            }
            Self::Call(function, args) => {
                write!(f, "{}(", function.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn roundtrip(input: &str) -> String {
        parse(input).unwrap().to_string()
    }

    #[test]
    fn display_minimal_parentheses() {
        assert_eq!(roundtrip("2*x+1"), "2 * x + 1");
        assert_eq!(roundtrip("(x+1)*(x-1)"), "(x + 1) * (x - 1)");
        assert_eq!(roundtrip("x-(y-z)"), "x - (y - z)");
        assert_eq!(roundtrip("x/(y*z)"), "x / (y * z)");
        assert_eq!(roundtrip("(x^2)^3"), "(x ^ 2) ^ 3");
        assert_eq!(roundtrip("x^2^3"), "x ^ 2 ^ 3");
        assert_eq!(roundtrip("-x^2"), "-x ^ 2");
        assert_eq!(roundtrip("(-x)^2"), "(-x) ^ 2");
        assert_eq!(roundtrip("log(x, 2)"), "log(x, 2)");
    }

    #[test]
    fn negative_number_base_is_parenthesized() {
        let e = Expr::pow(Expr::number(-2.0), Expr::var("x"));
        assert_eq!(e.to_string(), "(-2) ^ x");
        assert_eq!(Expr::mul(Expr::number(3.0), Expr::number(-1.5)).to_string(), "3 * -1.5");
    }

    #[test]
    fn size_and_substitution() {
        let e = parse("x*y + sin(z) + pi").unwrap();
        assert_eq!(e.node_count(), 8);
        assert!(e.contains_variable("z"));
        assert!(!e.contains_variable("w"));

        let s = e.substitute("y", &Expr::number(2.0));
        assert_eq!(s.to_string(), "x * 2 + sin(z) + pi");
    }
}
