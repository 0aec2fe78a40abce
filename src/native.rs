//! Native closure path: a small, independent translation of the expression
//! text into a Rust closure over `x`, `y` and `z`.
//!
//! Only `log sin cos tan sqrt abs exp` are recognized; the lone identifier `e`
//! is Euler's number and `^` (or `**`) is the power operator. Everything else
//! the symbolic engine understands is rejected here.

use crate::bindings::Bindings;
use crate::error::EvalError;

/// A compiled numeric closure. Parameters are `(x, y, z)`.
pub type NativeFn = Box<dyn Fn(f64, f64, f64) -> f64 + Send + Sync>;

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
    LPar,
    RPar,
}

fn tokenize(s: &str) -> Result<Vec<Tok>, EvalError> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let single = match c {
            '+' => Some(Tok::Plus),
            '-' => Some(Tok::Minus),
            '/' => Some(Tok::Slash),
            '^' => Some(Tok::Pow),
            '(' => Some(Tok::LPar),
            ')' => Some(Tok::RPar),
            _ => None,
        };
        if let Some(tok) = single {
            out.push(tok);
            i += 1;
            continue;
        }

        if c == '*' {
            if chars.get(i + 1) == Some(&'*') {
                out.push(Tok::Pow);
                i += 2;
            } else {
                out.push(Tok::Star);
                i += 1;
            }
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // Exponent, only when digits follow.
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let literal: String = chars[start..i].iter().collect();
            let value = literal
                .parse::<f64>()
                .map_err(|_| EvalError::Native(format!("Invalid number '{literal}'")))?;
            out.push(Tok::Num(value));
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            out.push(Tok::Ident(chars[start..i].iter().collect()));
            continue;
        }

        return Err(EvalError::Native(format!("Unexpected character '{c}'")));
    }
    Ok(out)
}

fn native_function(name: &str) -> Option<fn(f64) -> f64> {
    let function: fn(f64) -> f64 = match name {
        "log" => f64::ln,
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "sqrt" => f64::sqrt,
        "abs" => f64::abs,
        "exp" => f64::exp,
        _ => return None,
    };
    Some(function)
}

/// Recursive descent over the token stream, building closures bottom-up.
struct Builder {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Builder {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, tok: Tok) -> Result<(), EvalError> {
        match self.next() {
            Some(t) if t == tok => Ok(()),
            Some(t) => Err(EvalError::Native(format!("Unexpected token {t:?}"))),
            None => Err(EvalError::Native("Unexpected end of input".to_string())),
        }
    }

    // sum := product (('+' | '-') product)*
    fn sum(&mut self) -> Result<NativeFn, EvalError> {
        let mut lhs = self.product()?;
        loop {
            match self.peek() {
                Some(Tok::Plus) => {
                    self.pos += 1;
                    let rhs = self.product()?;
                    lhs = Box::new(move |x, y, z| lhs(x, y, z) + rhs(x, y, z));
                }
                Some(Tok::Minus) => {
                    self.pos += 1;
                    let rhs = self.product()?;
                    lhs = Box::new(move |x, y, z| lhs(x, y, z) - rhs(x, y, z));
                }
                _ => return Ok(lhs),
            }
        }
    }

    // product := unary (('*' | '/') unary)*
    fn product(&mut self) -> Result<NativeFn, EvalError> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Some(Tok::Star) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    lhs = Box::new(move |x, y, z| lhs(x, y, z) * rhs(x, y, z));
                }
                Some(Tok::Slash) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    lhs = Box::new(move |x, y, z| lhs(x, y, z) / rhs(x, y, z));
                }
                _ => return Ok(lhs),
            }
        }
    }

    // unary := ('-' | '+') unary | power
    fn unary(&mut self) -> Result<NativeFn, EvalError> {
        match self.peek() {
            Some(Tok::Minus) => {
                self.pos += 1;
                let only = self.unary()?;
                Ok(Box::new(move |x, y, z| -only(x, y, z)))
            }
            Some(Tok::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // power := primary ('^' unary)?, right associative
    fn power(&mut self) -> Result<NativeFn, EvalError> {
        let base = self.primary()?;
        if self.peek() == Some(&Tok::Pow) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Box::new(move |x, y, z| base(x, y, z).powf(exponent(x, y, z))));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<NativeFn, EvalError> {
        match self.next() {
            Some(Tok::Num(value)) => Ok(Box::new(move |_: f64, _: f64, _: f64| value)),
            Some(Tok::LPar) => {
                let inner = self.sum()?;
                self.expect(Tok::RPar)?;
                Ok(inner)
            }
            Some(Tok::Ident(name)) => {
                if self.peek() == Some(&Tok::LPar) {
                    let function = native_function(&name)
                        .ok_or_else(|| EvalError::Native(format!("{name} is not defined")))?;
                    self.pos += 1;
                    let arg = self.sum()?;
                    self.expect(Tok::RPar)?;
                    return Ok(Box::new(move |x, y, z| function(arg(x, y, z))));
                }
                match name.as_str() {
                    "x" => Ok(Box::new(|x: f64, _: f64, _: f64| x)),
                    "y" => Ok(Box::new(|_: f64, y: f64, _: f64| y)),
                    "z" => Ok(Box::new(|_: f64, _: f64, z: f64| z)),
                    "e" => Ok(Box::new(|_: f64, _: f64, _: f64| std::f64::consts::E)),
                    _ => Err(EvalError::Native(format!("{name} is not defined"))),
                }
            }
            Some(t) => Err(EvalError::Native(format!("Unexpected token {t:?}"))),
            None => Err(EvalError::Native("Unexpected end of input".to_string())),
        }
    }
}

/// Translates `expr` into a closure over `(x, y, z)`.
pub fn compile_native(expr: &str) -> Result<NativeFn, EvalError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(EvalError::Native("Empty expression".to_string()));
    }
    let mut builder = Builder { tokens, pos: 0 };
    let f = builder.sum()?;
    if let Some(t) = builder.peek() {
        return Err(EvalError::Native(format!("Unexpected token {t:?}")));
    }
    Ok(f)
}

/// Compiles and invokes the closure; unbound parameters read as 0.
pub fn evaluate_native(expr: &str, bindings: &Bindings) -> Result<f64, EvalError> {
    let f = compile_native(expr)?;
    let (x, y, z) = bindings.or_zero();
    let value = f(x, y, z);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFiniteResult(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn arithmetic_and_precedence() {
        let b = Bindings::xyz(7.0, 1.0, 4.0);
        assert_eq!(evaluate_native("2*(x+y)*-z", &b), Ok(-64.0));
        assert_eq!(evaluate_native("4^3^2", &b), Ok(262144.0));
        assert_eq!(evaluate_native("2**3", &b), Ok(8.0));
        assert_eq!(evaluate_native("-x^2", &b), Ok(-49.0));
        assert_eq!(evaluate_native("8/4*3", &b), Ok(6.0));
        assert_eq!(evaluate_native("1.5e2", &b), Ok(150.0));
    }

    #[test]
    fn functions_and_euler() {
        let b = Bindings::x(1.0);
        assert_relative_eq!(evaluate_native("log(e)", &b).unwrap(), 1.0);
        assert_relative_eq!(
            evaluate_native("sin(x)^2+cos(x)^2", &b).unwrap(),
            1.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(evaluate_native("exp(x)", &b).unwrap(), std::f64::consts::E);
        assert_eq!(evaluate_native("abs(-3)+sqrt(16)", &b), Ok(7.0));
    }

    #[test]
    fn unbound_parameters_default_to_zero() {
        assert_eq!(evaluate_native("x+y+z+1", &Bindings::x(2.0)), Ok(3.0));
    }

    #[test]
    fn rejects_what_it_does_not_know() {
        let b = Bindings::x(1.0);
        assert!(matches!(evaluate_native("asin(x)", &b), Err(EvalError::Native(_))));
        assert!(matches!(evaluate_native("pi*x", &b), Err(EvalError::Native(_))));
        assert!(matches!(evaluate_native("(x+1", &b), Err(EvalError::Native(_))));
        assert!(matches!(evaluate_native("x $ 2", &b), Err(EvalError::Native(_))));
        assert!(matches!(evaluate_native("", &b), Err(EvalError::Native(_))));
        assert_eq!(
            evaluate_native("1/(x-1)", &b),
            Err(EvalError::NonFiniteResult(f64::INFINITY))
        );
        assert!(evaluate_native("sqrt(0-x)", &b).is_err());
    }
}
