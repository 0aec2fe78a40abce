use num_complex::Complex64;
use num_rational::Rational64;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub, ToPrimitive, Zero};

use crate::bindings::Bindings;
use crate::error::EvalError;
use crate::expression::{Constant, Expr};
use crate::function::Function;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "^",
        }
    }

    fn build(self, lhs: Expr, rhs: Expr) -> Expr {
        match self {
            Self::Add => Expr::add(lhs, rhs),
            Self::Sub => Expr::sub(lhs, rhs),
            Self::Mul => Expr::mul(lhs, rhs),
            Self::Div => Expr::div(lhs, rhs),
            Self::Pow => Expr::pow(lhs, rhs),
        }
    }
}

impl Expr {
    /// Evaluates the tree against `bindings`.
    ///
    /// Unbound variables do not fail: the result degrades to
    /// [`Value::Symbolic`]. Real arithmetic promotes to complex where the
    /// real result is undefined (square roots and logarithms of negatives,
    /// fractional powers of negatives).
    pub fn evaluate(&self, bindings: &Bindings) -> Result<Value, EvalError> {
        match self {
            Self::Number(n) => Ok(Value::Real(*n)),
            Self::Constant(Constant::I) => Ok(Value::Complex(Complex64::i())),
            Self::Constant(c) => Ok(Value::Real(c.real_value().unwrap_or(f64::NAN))),
            Self::Variable(name) => Ok(match bindings.get(name) {
                Some(v) => Value::Real(v),
                None => match Function::from_name(name) {
                    Some(f) => Value::Function(f),
                    None => Value::Symbolic(self.clone()),
                },
            }),
            Self::Neg(only) => negate(only.evaluate(bindings)?),
            Self::Add(lhs, rhs) => evaluate_binary(BinaryOp::Add, lhs, rhs, bindings),
            Self::Sub(lhs, rhs) => evaluate_binary(BinaryOp::Sub, lhs, rhs, bindings),
            Self::Mul(lhs, rhs) => evaluate_binary(BinaryOp::Mul, lhs, rhs, bindings),
            Self::Div(lhs, rhs) => evaluate_binary(BinaryOp::Div, lhs, rhs, bindings),
            Self::Pow(lhs, rhs) => evaluate_binary(BinaryOp::Pow, lhs, rhs, bindings),
            Self::Call(function, args) => {
                let values = args
                    .iter()
                    .map(|a| a.evaluate(bindings))
                    .collect::<Result<Vec<_>, _>>()?;
                call(*function, values)
            }
        }
    }
}

fn evaluate_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    bindings: &Bindings,
) -> Result<Value, EvalError> {
    let lhs = lhs.evaluate(bindings)?;
    let rhs = rhs.evaluate(bindings)?;
    apply_binary(op, lhs, rhs)
}

fn negate(only: Value) -> Result<Value, EvalError> {
    match only {
        Value::Real(r) => Ok(Value::Real(-r)),
        Value::Complex(c) => Ok(Value::Complex(-c)),
        Value::Rational(q) => Ok(Value::Rational(-q)),
        Value::Function(_) => Err(EvalError::FunctionOperand { op: "-" }),
        Value::Symbolic(e) => Ok(Value::Symbolic(Expr::neg(e))),
    }
}

fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    let either_rational = matches!(lhs, Value::Rational(_)) || matches!(rhs, Value::Rational(_));
    if let (true, Some(a), Some(b)) = (either_rational, exact(&lhs), exact(&rhs)) {
        return Ok(match rational_op(op, a, b) {
            Some(q) => Value::Rational(q),
            None => real_op(op, a.to_f64().unwrap_or(f64::NAN), b.to_f64().unwrap_or(f64::NAN)),
        });
    }
    match (lhs, rhs) {
        (Value::Function(_), _) | (_, Value::Function(_)) => {
            Err(EvalError::FunctionOperand { op: op.symbol() })
        }
        (lhs @ Value::Symbolic(_), rhs) | (lhs, rhs @ Value::Symbolic(_)) => Ok(Value::Symbolic(
            op.build(lhs.into_expr(), rhs.into_expr()),
        )),
        (Value::Complex(a), rhs) => Ok(complex_op(op, a, to_complex(&rhs))),
        (lhs, Value::Complex(b)) => Ok(complex_op(op, to_complex(&lhs), b)),
        (lhs, rhs) => Ok(real_op(
            op,
            lhs.to_number().unwrap_or(f64::NAN),
            rhs.to_number().unwrap_or(f64::NAN),
        )),
    }
}

/// Rationals, and integral reals that can join exact arithmetic.
fn exact(value: &Value) -> Option<Rational64> {
    match value {
        Value::Rational(q) => Some(*q),
        Value::Real(r) if r.fract() == 0.0 && r.abs() < 1e15 => {
            Some(Rational64::from_integer(*r as i64))
        }
        _ => None,
    }
}

fn to_complex(value: &Value) -> Complex64 {
    match value {
        Value::Complex(c) => *c,
        other => Complex64::new(other.to_number().unwrap_or(f64::NAN), 0.0),
    }
}

fn real_op(op: BinaryOp, a: f64, b: f64) -> Value {
    match op {
        BinaryOp::Add => Value::Real(a + b),
        BinaryOp::Sub => Value::Real(a - b),
        BinaryOp::Mul => Value::Real(a * b),
        BinaryOp::Div => Value::Real(a / b),
        BinaryOp::Pow => {
            if a < 0.0 && b.fract() != 0.0 && b.is_finite() {
                Value::Complex(Complex64::new(a, 0.0).powf(b))
            } else {
                Value::Real(a.powf(b))
            }
        }
    }
}

fn complex_op(op: BinaryOp, a: Complex64, b: Complex64) -> Value {
    Value::Complex(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Pow => a.powc(b),
    })
}

/// Exact arithmetic; `None` on overflow, division by zero or a non-integral
/// exponent.
fn rational_op(op: BinaryOp, a: Rational64, b: Rational64) -> Option<Rational64> {
    match op {
        BinaryOp::Add => a.checked_add(&b),
        BinaryOp::Sub => a.checked_sub(&b),
        BinaryOp::Mul => a.checked_mul(&b),
        BinaryOp::Div => a.checked_div(&b),
        BinaryOp::Pow => {
            if !b.is_integer() {
                return None;
            }
            let exponent = b.to_integer();
            if exponent.unsigned_abs() > 64 {
                return None;
            }
            let mut out = Rational64::from_integer(1);
            for _ in 0..exponent.unsigned_abs() {
                out = out.checked_mul(&a)?;
            }
            if exponent < 0 {
                if out.is_zero() {
                    return None;
                }
                out = out.recip();
            }
            Some(out)
        }
    }
}

fn call(function: Function, args: Vec<Value>) -> Result<Value, EvalError> {
    if args.iter().any(|a| matches!(a, Value::Symbolic(_))) {
        let args = args.into_iter().map(Value::into_expr).collect();
        return Ok(Value::Symbolic(Expr::Call(function, args)));
    }
    if args.iter().any(|a| matches!(a, Value::Function(_))) {
        return Err(EvalError::FunctionOperand { op: function.name() });
    }
    match (function, args.as_slice()) {
        (Function::Random, []) => Ok(Value::Real(rand::random::<f64>())),
        (Function::Fraction, [numer, denom]) => fraction(numer, denom),
        (Function::Log, [value, base]) => {
            let value = unary(Function::Log, value);
            let base = unary(Function::Log, base);
            apply_binary(BinaryOp::Div, value, base)
        }
        (_, [only]) => Ok(unary(function, only)),
        (_, args) => Err(EvalError::BadCall {
            name: function.name(),
            got: args.len(),
        }),
    }
}

/// Invokes a bare function reference with no arguments.
pub fn call_without_args(function: Function) -> Result<Value, EvalError> {
    call(function, Vec::new())
}

fn unary(function: Function, value: &Value) -> Value {
    match value {
        Value::Complex(c) => Value::Complex(function.apply_complex(*c)),
        other => {
            let x = other.to_number().unwrap_or(f64::NAN);
            if function.goes_complex(x) {
                Value::Complex(function.apply_complex(Complex64::new(x, 0.0)))
            } else {
                Value::Real(function.apply_real(x))
            }
        }
    }
}

fn fraction(numer: &Value, denom: &Value) -> Result<Value, EvalError> {
    let as_ratio = |v: &Value| -> Option<Rational64> {
        match v {
            Value::Rational(q) => Some(*q),
            Value::Real(r) if r.fract() == 0.0 && r.abs() < i64::MAX as f64 => {
                Some(Rational64::from_integer(*r as i64))
            }
            Value::Real(r) => Rational64::approximate_float(*r),
            _ => None,
        }
    };
    let (Some(n), Some(d)) = (as_ratio(numer), as_ratio(denom)) else {
        return Err(EvalError::NonNumericResult {
            kind: "fraction",
            value: format!("fraction({numer}, {denom})"),
        });
    };
    n.checked_div(&d)
        .map(Value::Rational)
        .ok_or(EvalError::NonFiniteResult(f64::INFINITY))
}
