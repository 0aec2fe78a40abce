//! Hybrid evaluation: an ordered chain of coercions over the symbolic engine,
//! backed by the independent [native closure path](crate::native).

use tracing::debug;

use crate::bindings::Bindings;
use crate::compile::RealExpression;
use crate::error::EvalError;
use crate::evaluate::call_without_args;
use crate::function::Function;
use crate::native::evaluate_native;
use crate::parse::parse;
use crate::value::Value;

/// The symbolic engine as seen by the evaluator.
///
/// [`Engine`] is the in-process implementation. Other implementations exist to
/// exercise the chain, e.g. a backend that always fails.
pub trait SymbolicBackend: Send + Sync {
    /// Parse `expr` and evaluate it against `bindings`.
    fn evaluate(&self, expr: &str, bindings: &Bindings) -> Result<Value, EvalError>;

    /// Parse and compile `expr` independently of [`evaluate`](Self::evaluate),
    /// then evaluate the compiled form.
    fn evaluate_compiled(&self, expr: &str, bindings: &Bindings) -> Result<f64, EvalError>;

    /// Invoke a bare function reference with no arguments.
    fn invoke(&self, function: Function) -> Result<Value, EvalError>;
}

/// The builtin symbolic engine: [`parse`], [`Expr::evaluate`](crate::Expr::evaluate)
/// and [`RealExpression`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Engine;

impl SymbolicBackend for Engine {
    fn evaluate(&self, expr: &str, bindings: &Bindings) -> Result<Value, EvalError> {
        parse(expr)?.evaluate(bindings)
    }

    fn evaluate_compiled(&self, expr: &str, bindings: &Bindings) -> Result<f64, EvalError> {
        RealExpression::parse(expr)?.evaluate_point(bindings)
    }

    fn invoke(&self, function: Function) -> Result<Value, EvalError> {
        call_without_args(function)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Evaluator<B = Engine> {
    backend: B,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<B: SymbolicBackend> Evaluator<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// Evaluates `expr` to a finite real.
    ///
    /// The symbolic chain runs first. If it fails or yields a non-finite
    /// number, the expression is translated to a native closure instead. Only
    /// when both fail does this fail, carrying both messages.
    pub fn evaluate(&self, expr: &str, bindings: &Bindings) -> Result<f64, EvalError> {
        let symbolic = match self.evaluate_symbolic(expr, bindings) {
            Ok(value) if value.is_finite() => return Ok(value),
            Ok(value) => EvalError::NonFiniteResult(value),
            Err(e) => e,
        };
        debug!(expr, error = %symbolic, "symbolic evaluation failed, trying native closure");
        evaluate_native(expr, bindings).map_err(|native| EvalError::Exhausted {
            symbolic: Box::new(symbolic),
            native: Box::new(native),
        })
    }

    /// The symbolic chain alone. The result may be non-finite.
    pub fn evaluate_symbolic(&self, expr: &str, bindings: &Bindings) -> Result<f64, EvalError> {
        self.symbolic_chain(expr, bindings)
            .map_err(|e| EvalError::Symbolic(Box::new(e)))
    }

    fn symbolic_chain(&self, expr: &str, bindings: &Bindings) -> Result<f64, EvalError> {
        let value = match self.backend.evaluate(expr, bindings) {
            Ok(value) => value,
            // Without a value only the stages that start over from the text
            // apply; the original error is the one worth reporting.
            Err(error) => {
                return recompile(&self.backend, expr, bindings)
                    .or_else(|_| substitute_and_reevaluate(&self.backend, expr, bindings))
                    .map_err(|_| error)
            }
        };
        accept_real(&value)
            .or_else(|_| invoke_reference(&self.backend, &value))
            .or_else(|_| real_part(&value))
            .or_else(|_| to_real_number(&value))
            .or_else(|_| recompile(&self.backend, expr, bindings))
            .or_else(|_| parse_rendered(&value))
            .or_else(|_| substitute_and_reevaluate(&self.backend, expr, bindings))
            .or_else(|_| Err(unexpected(&value)))
    }
}

fn unexpected(value: &Value) -> EvalError {
    EvalError::NonNumericResult {
        kind: value.kind(),
        value: value.to_string(),
    }
}

fn accepted(stage: &'static str, value: f64) -> f64 {
    debug!(stage, value, "accepted");
    value
}

/// Stage 1: the direct result is already a plain real.
fn accept_real(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Real(r) => Ok(accepted("direct", *r)),
        other => Err(unexpected(other)),
    }
}

/// Stage 2: a bare function reference, invoked with no arguments.
fn invoke_reference<B: SymbolicBackend>(backend: &B, value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Function(f) => match backend.invoke(*f)? {
            Value::Real(r) => Ok(accepted("invoke", r)),
            other => Err(unexpected(&other)),
        },
        other => Err(unexpected(other)),
    }
}

/// Stage 3: complex results keep their real part. The imaginary part is
/// discarded.
fn real_part(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Complex(c) => Ok(accepted("real part", c.re)),
        other => Err(unexpected(other)),
    }
}

/// Stage 4: exact rationals.
fn to_real_number(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Rational(_) => value
            .to_number()
            .map(|r| accepted("rational", r))
            .ok_or_else(|| unexpected(value)),
        other => Err(unexpected(other)),
    }
}

/// Stage 5: re-parse and compile independently.
fn recompile<B: SymbolicBackend>(
    backend: &B,
    expr: &str,
    bindings: &Bindings,
) -> Result<f64, EvalError> {
    backend
        .evaluate_compiled(expr, bindings)
        .map(|r| accepted("compiled", r))
}

/// Stage 6: render the value and read it back as a float literal.
fn parse_rendered(value: &Value) -> Result<f64, EvalError> {
    let text = value.to_string();
    match text.trim().parse::<f64>() {
        Ok(r) if r.is_finite() => Ok(accepted("rendered", r)),
        _ => Err(unexpected(value)),
    }
}

/// Stage 7: substitute bound values into the text and evaluate the closed
/// expression.
fn substitute_and_reevaluate<B: SymbolicBackend>(
    backend: &B,
    expr: &str,
    bindings: &Bindings,
) -> Result<f64, EvalError> {
    let mut closed = expr.to_string();
    for (name, value) in bindings.iter() {
        closed = replace_word(&closed, name, &format!("({value})"));
    }
    match backend.evaluate(&closed, &Bindings::new())? {
        Value::Real(r) => Ok(accepted("substituted", r)),
        value @ Value::Rational(_) => value
            .to_number()
            .map(|r| accepted("substituted", r))
            .ok_or_else(|| unexpected(&value)),
        other => Err(unexpected(&other)),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replaces occurrences of `word` that are not part of a longer identifier.
fn replace_word(text: &str, word: &str, with: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut previous: Option<char> = None;
    while let Some(at) = rest.find(word) {
        let before = rest[..at].chars().next_back().or(previous);
        let after = rest[at + word.len()..].chars().next();
        out.push_str(&rest[..at]);
        if before.map_or(true, |c| !is_word_char(c)) && after.map_or(true, |c| !is_word_char(c))
        {
            out.push_str(with);
        } else {
            out.push_str(word);
        }
        previous = word.chars().next_back();
        rest = &rest[at + word.len()..];
    }
    out.push_str(rest);
    out
}
