use thiserror::Error;

use crate::parse::Rule;

/// Failure to turn text into an [`Expr`](crate::Expr).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error: {0}")]
    Grammar(#[from] Box<pest::error::Error<Rule>>),
    #[error("Empty expression")]
    Empty,
    #[error("Invalid number literal '{0}'")]
    InvalidNumber(String),
    #[error("Undefined function '{0}'")]
    UnknownFunction(String),
    #[error("Function '{name}' expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },
}

/// Failure of a single evaluation strategy, or of the whole chain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    ParseFailure(#[from] ParseError),
    #[error("Cannot evaluate to number. Got type: {kind}, value: {value}")]
    NonNumericResult { kind: &'static str, value: String },
    #[error("non-finite value ({0})")]
    NonFiniteResult(f64),
    #[error("Unknown variable '{0}'")]
    UnboundVariable(String),
    #[error("Cannot apply {op} to a function reference")]
    FunctionOperand { op: &'static str },
    #[error("Function '{name}' cannot be called with {got} argument(s)")]
    BadCall { name: &'static str, got: usize },
    #[error("Cannot create native function: {0}")]
    Native(String),
    #[error("Evaluation failed: {0}")]
    Symbolic(Box<EvalError>),
    #[error("Both symbolic and native evaluation failed: {symbolic}; {native}")]
    Exhausted {
        symbolic: Box<EvalError>,
        native: Box<EvalError>,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiffError {
    #[error("Derivative of function '{0}' is not known")]
    UnknownDerivative(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlgebraError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Differentiation(#[from] DiffError),
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
    #[error("Command '{command}' {reason}")]
    BadArguments {
        command: &'static str,
        reason: String,
    },
    #[error("Derivative {order} grew past {nodes} nodes")]
    TooComplex { order: usize, nodes: usize },
    #[error("Cannot expand in series: {0}")]
    Series(String),
    #[error("Cannot evaluate derivative {order} at {point}: {source}")]
    Coefficient {
        order: usize,
        point: f64,
        source: EvalError,
    },
}

/// Operation-level failure, surfaced to the user as a single message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Evaluation(#[from] EvalError),
    #[error("Unable to compute derivative: {0}")]
    Differentiation(#[from] DiffError),
    #[error(transparent)]
    Algebra(#[from] AlgebraError),
    #[error("{0}")]
    InvalidBounds(String),
    #[error("Too many evaluation errors ({failed}/{intervals}). Sample: {sample}")]
    ExcessiveSampleFailure {
        failed: usize,
        intervals: usize,
        sample: String,
    },
    #[error("{0}")]
    InsufficientSamples(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("Please enter a valid function first")]
    NoFunction,
}
