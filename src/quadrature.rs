//! Composite Simpson's rule over the hybrid evaluator.

use serde::Serialize;
use tracing::{debug, warn};

use crate::bindings::Bindings;
use crate::error::CalcError;
use crate::hybrid::{Evaluator, SymbolicBackend};

/// Share of the `n` intervals that may fail before the run is rejected.
pub const MAX_FAILURE_RATIO: f64 = 0.1;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuadratureResult {
    /// `(h / 3) * sum`, rounded to the requested precision.
    pub value: f64,
    /// Number of Simpson intervals, always even.
    pub intervals: usize,
    pub samples_used: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_failure: Option<String>,
}

/// Rounds half away from zero to `precision` decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    let rounded = (value * scale).round() / scale;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

/// Integrates `expr` over `[lower, upper]` in `x`.
///
/// `sample_count_hint` is rounded up to an even interval count (minimum 2).
/// Sample points that fail to evaluate, or evaluate to a non-finite number,
/// are skipped; the run fails once more than 10% of the intervals are lost.
pub fn integrate<B: SymbolicBackend>(
    evaluator: &Evaluator<B>,
    expr: &str,
    lower: f64,
    upper: f64,
    sample_count_hint: usize,
    precision: u32,
) -> Result<QuadratureResult, CalcError> {
    if !lower.is_finite() || !upper.is_finite() {
        return Err(CalcError::InvalidBounds(
            "Please enter valid numerical limits".to_string(),
        ));
    }
    if lower >= upper {
        return Err(CalcError::InvalidBounds(
            "Lower limit must be less than upper limit".to_string(),
        ));
    }

    let n = sample_count_hint.max(2).next_multiple_of(2);
    let h = (upper - lower) / n as f64;

    let mut sum = 0.0;
    let mut skipped = 0;
    let mut first_failure = None;
    for i in 0..=n {
        let x = lower + i as f64 * h;
        let weight = if i == 0 || i == n {
            1.0
        } else if i % 2 == 1 {
            4.0
        } else {
            2.0
        };
        match evaluator.evaluate(expr, &Bindings::x(x)) {
            Ok(y) if y.is_finite() => sum += weight * y,
            Ok(y) => {
                skipped += 1;
                first_failure.get_or_insert_with(|| format!("non-finite value ({y}) at x = {x}"));
            }
            Err(err) => {
                skipped += 1;
                first_failure.get_or_insert_with(|| format!("x = {x}: {err}"));
            }
        }
    }

    if skipped as f64 > MAX_FAILURE_RATIO * n as f64 {
        return Err(CalcError::ExcessiveSampleFailure {
            failed: skipped,
            intervals: n,
            sample: first_failure.unwrap_or_default(),
        });
    }
    if skipped > 0 {
        warn!(expr, skipped, intervals = n, "skipped samples during quadrature");
    }

    let value = round_to(h / 3.0 * sum, precision);
    debug!(expr, lower, upper, intervals = n, value, "simpson quadrature");
    Ok(QuadratureResult {
        value,
        intervals: n,
        samples_used: n + 1 - skipped,
        skipped,
        first_failure,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn run(expr: &str, lower: f64, upper: f64, hint: usize) -> Result<QuadratureResult, CalcError> {
        integrate(&Evaluator::new(), expr, lower, upper, hint, 6)
    }

    #[test]
    fn polynomials_are_exact() {
        for hint in (2..=40).step_by(2) {
            let linear = run("x", 0.0, 2.0, hint).unwrap();
            assert_eq!(linear.value, 2.0, "{hint} intervals");
            assert_eq!(linear.intervals, hint);
        }

        let linear = run("x", 0.0, 2.0, 100).unwrap();
        assert_eq!(linear.value, 2.0);
        assert_eq!(linear.intervals, 100);
        assert_eq!(linear.samples_used, 101);

        assert_eq!(run("x^2", 0.0, 3.0, 100).unwrap().value, 9.0);
        assert_eq!(run("x^3 - x", -1.0, 1.0, 10).unwrap().value, 0.0);
    }

    #[test]
    fn transcendental_integrands() {
        let sine = run("sin(x)", 0.0, std::f64::consts::PI, 100).unwrap();
        assert_abs_diff_eq!(sine.value, 2.0, epsilon = 1e-6);
        let exp = run("exp(x)", 0.0, 1.0, 100).unwrap();
        assert_abs_diff_eq!(exp.value, std::f64::consts::E - 1.0, epsilon = 1e-6);
    }

    #[test]
    fn interval_count_is_even() {
        assert_eq!(run("1", 0.0, 1.0, 7).unwrap().intervals, 8);
        assert_eq!(run("1", 0.0, 1.0, 0).unwrap().intervals, 2);
        assert_eq!(run("1", 0.0, 1.0, 1).unwrap().intervals, 2);
    }

    #[test]
    fn rejects_bad_bounds() {
        for (lower, upper) in [(1.0, 1.0), (2.0, 1.0), (f64::NAN, 1.0), (0.0, f64::INFINITY)] {
            assert!(matches!(
                run("x", lower, upper, 10),
                Err(CalcError::InvalidBounds(_))
            ));
        }
    }

    #[test]
    fn tolerates_a_few_singular_points() {
        // One singular sample at x = 0 out of 100 intervals.
        let result = run("1/sqrt(abs(x))", -1.0, 1.0, 100).unwrap();
        assert_eq!(result.skipped, 1);
        assert_eq!(result.samples_used, 100);
        assert!(result.first_failure.is_some());
    }

    #[test]
    fn rejects_widespread_failure() {
        match run("1/(x-x)", 0.0, 1.0, 10) {
            Err(CalcError::ExcessiveSampleFailure {
                failed,
                intervals,
                sample,
            }) => {
                assert_eq!(failed, 11);
                assert_eq!(intervals, 10);
                assert!(sample.starts_with("x = 0: "), "{sample}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rounds_to_precision() {
        let third = integrate(&Evaluator::new(), "x^2", 0.0, 1.0, 10, 3).unwrap();
        assert_eq!(third.value, 0.333);
        assert_eq!(round_to(2.0000000001, 6), 2.0);
    }
}
