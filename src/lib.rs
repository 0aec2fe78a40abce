//! Calculus expression evaluation, numeric quadrature and symbolic helpers.
//!
//! # Why?
//!
//! Calculator input is loose: `2x + 3(x - 1)`, constants like `e`, functions
//! that only exist on part of the real line. A single evaluation strategy
//! rejects too much of it. The [`Evaluator`] runs an ordered chain of
//! coercions over the symbolic engine and falls back to a native closure, so a
//! point only fails when every strategy does. [`integrate`] and the samplers
//! build on that, skipping and counting the points that still fail.
//!
//! # Example
//!
//! ```rust
//! use calculus_expr::*;
//!
//! let function = normalize("3x^2 + 2x");
//! assert_eq!(function, "3*x^2+2*x");
//!
//! let evaluator = Evaluator::new();
//! let y = evaluator.evaluate(&function, &Bindings::x(2.0)).unwrap();
//! assert_eq!(y, 16.0);
//!
//! let area = integrate(&evaluator, &function, 0.0, 1.0, 100, 6).unwrap();
//! assert_eq!(area.value, 2.0);
//!
//! let derivative = parse(&function).unwrap().derivative("x").unwrap().simplify();
//! assert_eq!(derivative.to_string(), "6 * x + 2");
//! ```

mod algebra;
mod bindings;
mod compile;
mod config;
mod error;
mod evaluate;
mod expression;
mod function;
mod hybrid;
mod native;
mod normalize;
mod operations;
mod parse;
mod quadrature;
mod sampling;
mod session;
mod steps;
mod symbolic;
mod value;

/// Uses the [`pest`] parsing expression grammar language.
///
/// ```text
#[doc = include_str!("grammar.pest")]
/// ```
pub mod grammar_doc {}

pub use algebra::{taylor, taylor_coefficients, Algebra, MAX_SERIES_TERMS};
pub use bindings::*;
pub use compile::{RealExpression, Registers};
pub use config::{ConfigError, Settings, MAX_PRECISION};
pub use error::*;
pub use evaluate::call_without_args;
pub use expression::*;
pub use function::{Arity, Function};
pub use hybrid::{Engine, Evaluator, SymbolicBackend};
pub use native::{compile_native, evaluate_native, NativeFn};
pub use normalize::normalize;
pub use operations::*;
pub use parse::{parse, parse_command};
pub use quadrature::{integrate, round_to, QuadratureResult, MAX_FAILURE_RATIO};
pub use sampling::{
    sample_curve, sample_surface, Curve, Surface, CURVE_LIMIT, MIN_CURVE_POINTS,
    MIN_SURFACE_POINTS, SURFACE_LIMIT,
};
pub use session::{common_integral, Session, Validation};
pub use steps::Step;
pub use symbolic::nth_derivative;
pub use value::Value;
