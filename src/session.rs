//! The calculator session: settings, the current validated function and the
//! last result, with one entry point per operation.

use tracing::{debug, warn};

use crate::algebra::{taylor_coefficients, Algebra, MAX_SERIES_TERMS};
use crate::bindings::Bindings;
use crate::config::{Settings, MAX_PRECISION};
use crate::error::CalcError;
use crate::expression::format_number;
use crate::hybrid::{Engine, Evaluator, SymbolicBackend};
use crate::normalize::normalize;
use crate::operations::{
    Computation, Expansion, IntegrationMethod, MultiOp, MultiResult, OdeKind, Operation,
    PartialDerivative, Report, SeriesKind, SeriesTerm,
};
use crate::parse::parse;
use crate::quadrature::integrate;
use crate::sampling::{sample_curve, sample_surface};
use crate::steps;
use crate::symbolic::nth_derivative;

/// Points tried, in order, when validating a function.
const TEST_POINTS: [(f64, f64, f64); 2] = [(1.0, 1.0, 1.0), (0.5, 0.5, 0.5)];

/// Numeric series coefficients at or below this magnitude are dropped.
const SERIES_EPSILON: f64 = 1e-10;

#[derive(Clone, Debug, PartialEq)]
pub struct Validation {
    /// The normalized text stored as the current function.
    pub function: String,
    /// Value at the first test point that evaluated.
    pub test_value: f64,
}

/// Antiderivatives looked up by exact function text when the algebra
/// backend leaves an integral unevaluated.
pub fn common_integral(function: &str) -> Option<&'static str> {
    Some(match function {
        "x" => "(x^2)/2",
        "x^2" => "(x^3)/3",
        "x^3" => "(x^4)/4",
        "sin(x)" => "-cos(x)",
        "cos(x)" => "sin(x)",
        "e^x" => "e^x",
        "1/x" => "ln(|x|)",
        "tan(x)" => "-ln(|cos(x)|)",
        "sec(x)^2" => "tan(x)",
        "1/sqrt(1-x^2)" => "asin(x)",
        "1/(1+x^2)" => "atan(x)",
        _ => return None,
    })
}

fn is_unevaluated(result: &str) -> bool {
    result.contains("integral(")
}

pub struct Session<B = Engine> {
    settings: Settings,
    evaluator: Evaluator<B>,
    algebra: Algebra,
    current: Option<String>,
    last: Option<Report>,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Self::with_evaluator(settings, Evaluator::new())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl<B: SymbolicBackend> Session<B> {
    pub fn with_evaluator(settings: Settings, evaluator: Evaluator<B>) -> Self {
        Self {
            settings,
            evaluator,
            algebra: Algebra::new(),
            current: None,
            last: None,
        }
    }

    pub fn current_function(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn last_result(&self) -> Option<&Report> {
        self.last.as_ref()
    }

    /// Normalizes `input` and makes it the current function if it evaluates
    /// to a finite number at one of the test points.
    ///
    /// A failed validation clears the current function.
    pub fn validate(&mut self, input: &str) -> Result<Validation, CalcError> {
        self.current = None;
        let function = normalize(input.trim());
        if function.is_empty() {
            return Err(CalcError::NoFunction);
        }
        let test_value = TEST_POINTS
            .iter()
            .find_map(|&(x, y, z)| {
                self.evaluator
                    .evaluate(&function, &Bindings::xyz(x, y, z))
                    .ok()
                    .filter(|v| v.is_finite())
            })
            .ok_or_else(|| {
                CalcError::InvalidInput("Function cannot be evaluated numerically".to_string())
            })?;
        debug!(%function, test_value, "validated function");
        self.current = Some(function.clone());
        Ok(Validation {
            function,
            test_value,
        })
    }

    /// Evaluates the current function at `bindings`.
    pub fn evaluate(&self, bindings: &Bindings) -> Result<f64, CalcError> {
        let function = self.current.as_deref().ok_or(CalcError::NoFunction)?;
        Ok(self.evaluator.evaluate(function, bindings)?)
    }

    /// Runs `operation` on the current function and keeps the report as the
    /// last result.
    pub fn compute(&mut self, operation: &Operation) -> Result<&Report, CalcError> {
        let function = self.current.clone().ok_or(CalcError::NoFunction)?;
        if self.settings.precision > MAX_PRECISION {
            return Err(CalcError::InvalidInput(format!(
                "Precision must be between 0 and {MAX_PRECISION}"
            )));
        }
        let report = match operation {
            Operation::Derivative { order } => self.derivative(&function, *order)?,
            Operation::Integral => self.indefinite_integral(&function)?,
            Operation::Definite { lower, upper } => {
                self.definite_integral(&function, *lower, *upper)?
            }
            Operation::Advanced { method, limits } => self.advanced(&function, *method, *limits)?,
            Operation::Differential {
                kind,
                initial_conditions,
            } => differential(&function, *kind, initial_conditions.as_deref()),
            Operation::Series { kind, point, terms } => {
                self.series(&function, *kind, *point, *terms)?
            }
            Operation::Multivariable { op, vars } => multivariable(&function, *op, vars)?,
            Operation::Plot => Report {
                computation: Computation::Plot(sample_curve(
                    &self.evaluator,
                    &function,
                    self.settings.plot_range,
                    self.settings.resolution,
                )?),
                steps: Vec::new(),
            },
            Operation::Plot3d => Report {
                computation: Computation::Plot3d(sample_surface(
                    &self.evaluator,
                    &function,
                    self.settings.surface_range,
                    self.settings.surface_grid,
                )?),
                steps: Vec::new(),
            },
        };
        debug!(%function, ?operation, "computed");
        Ok(self.last.insert(report))
    }

    fn derivative(&self, function: &str, order: usize) -> Result<Report, CalcError> {
        if order == 0 {
            return Err(CalcError::InvalidInput(
                "Derivative order must be at least 1".to_string(),
            ));
        }
        let symbolic = nth_derivative(&parse(function)?, "x", order)?.to_string();
        Ok(Report {
            computation: Computation::Derivative {
                order,
                symbolic,
                original: function.to_string(),
            },
            steps: steps::derivative(order, function),
        })
    }

    fn integral_command(&self, function: &str) -> Result<String, CalcError> {
        Ok(self.algebra.run(&format!("integral({function}, x)"))?)
    }

    fn indefinite_integral(&self, function: &str) -> Result<Report, CalcError> {
        let result = self.integral_command(function)?;
        let original = function.to_string();
        if !is_unevaluated(&result) {
            return Ok(Report {
                computation: Computation::Integral {
                    symbolic: format!("{result} + C"),
                    method: "Symbolic".to_string(),
                    note: None,
                    original,
                },
                steps: steps::symbolic_integral(),
            });
        }
        Ok(match common_integral(function) {
            Some(pattern) => Report {
                computation: Computation::Integral {
                    symbolic: format!("{pattern} + C"),
                    method: "Pattern Matching".to_string(),
                    note: None,
                    original,
                },
                steps: steps::pattern_integral(),
            },
            None => Report {
                computation: Computation::Integral {
                    symbolic: "Unable to find symbolic integral".to_string(),
                    method: "N/A".to_string(),
                    note: Some("Try using definite integral with numerical methods".to_string()),
                    original,
                },
                steps: Vec::new(),
            },
        })
    }

    fn fixed(&self, value: f64) -> String {
        format!("{:.*}", self.settings.precision as usize, value)
    }

    fn definite_integral(&self, function: &str, lower: f64, upper: f64) -> Result<Report, CalcError> {
        let result = integrate(
            &self.evaluator,
            function,
            lower,
            upper,
            self.settings.resolution,
            self.settings.precision,
        )?;
        Ok(Report {
            computation: Computation::Definite {
                value: self.fixed(result.value),
                lower,
                upper,
                method: "Simpson's Rule (Hybrid Evaluation)".to_string(),
                points: result.intervals,
                warnings: (result.skipped > 0).then(|| format!("{} points skipped", result.skipped)),
                original: function.to_string(),
            },
            steps: steps::definite(lower, upper, result.value, result.intervals),
        })
    }

    fn advanced(
        &self,
        function: &str,
        method: IntegrationMethod,
        limits: Option<(f64, f64)>,
    ) -> Result<Report, CalcError> {
        let original = function.to_string();
        if let Some((lower, upper)) = limits {
            let result = integrate(
                &self.evaluator,
                function,
                lower,
                upper,
                self.settings.resolution,
                self.settings.precision,
            )?;
            return Ok(Report {
                computation: Computation::Advanced {
                    method: format!("{} (Hybrid Numerical)", method.name()),
                    symbolic: None,
                    value: Some(self.fixed(result.value)),
                    limits: Some((lower, upper)),
                    points: Some(result.intervals),
                    suggestion: None,
                    warnings: (result.skipped > 0).then(|| {
                        format!("{} points skipped due to discontinuities", result.skipped)
                    }),
                    original,
                },
                steps: steps::advanced(method.name(), true),
            });
        }

        let result = self.integral_command(function)?;
        let (symbolic, suggestion, steps) = if is_unevaluated(&result) {
            (
                "Unable to find closed form".to_string(),
                Some(method.suggestion().to_string()),
                Vec::new(),
            )
        } else {
            (
                format!("{result} + C"),
                None,
                steps::advanced(method.name(), false),
            )
        };
        Ok(Report {
            computation: Computation::Advanced {
                method: method.name().to_string(),
                symbolic: Some(symbolic),
                value: None,
                limits: None,
                points: None,
                suggestion,
                warnings: None,
                original,
            },
            steps,
        })
    }

    fn series(
        &self,
        function: &str,
        kind: SeriesKind,
        point: f64,
        terms: usize,
    ) -> Result<Report, CalcError> {
        if !(1..=MAX_SERIES_TERMS).contains(&terms) {
            return Err(CalcError::InvalidInput(format!(
                "Number of terms must be between 1 and {MAX_SERIES_TERMS}"
            )));
        }
        if !point.is_finite() {
            return Err(CalcError::InvalidInput(
                "Expansion point must be a finite number".to_string(),
            ));
        }
        let command = format!("taylor({function}, x, {}, {terms})", format_number(point));
        let (kind, expansion) = match self.algebra.run(&command) {
            Ok(text) => (kind, Expansion::Symbolic(text)),
            Err(error) => {
                warn!(function, %error, "symbolic series failed, computing coefficients numerically");
                (
                    SeriesKind::Taylor,
                    Expansion::Numeric(self.numeric_series(function, point, terms)?),
                )
            }
        };
        Ok(Report {
            computation: Computation::Series {
                series_type: kind,
                point,
                terms,
                expansion,
                original: function.to_string(),
            },
            steps: steps::series(kind.name(), point, terms),
        })
    }

    /// `f^(k)(a) / k!` for `k < terms` in floating point, dropping the
    /// negligible ones.
    fn numeric_series(
        &self,
        function: &str,
        point: f64,
        terms: usize,
    ) -> Result<Vec<SeriesTerm>, CalcError> {
        let coefficients = taylor_coefficients(&parse(function)?, "x", point, terms)?;
        Ok(coefficients
            .into_iter()
            .enumerate()
            .filter(|(_, coefficient)| coefficient.abs() > SERIES_EPSILON)
            .map(|(order, coefficient)| SeriesTerm {
                order,
                coefficient,
                term: format!("{coefficient:.4} * (x - {})^{order}", format_number(point)),
            })
            .collect())
    }
}

fn differential(function: &str, kind: OdeKind, initial_conditions: Option<&str>) -> Report {
    let initial_conditions = initial_conditions
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("None specified");
    Report {
        computation: Computation::Differential {
            ode_type: kind,
            equation: function.to_string(),
            solution: "Analytical ODE solver not fully implemented".to_string(),
            note: "For complete ODE solutions, consider using specialized software".to_string(),
            initial_conditions: initial_conditions.to_string(),
        },
        steps: steps::ode(kind.name()),
    }
}

fn multivariable(function: &str, op: MultiOp, vars: &[String]) -> Result<Report, CalcError> {
    let vars: Vec<String> = vars
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if vars.len() < 2 {
        return Err(CalcError::InvalidInput(
            "Please specify at least 2 variables (e.g., x,y)".to_string(),
        ));
    }
    let expr = parse(function)?;
    let partial = |var: &str| nth_derivative(&expr, var, 1).map(|d| d.to_string());

    let mut notation = None;
    let mut note = None;
    let mut suggestion = None;
    let (operation, result) = match op {
        MultiOp::Partial => (
            "Partial Derivatives",
            MultiResult::Partials(
                vars.iter()
                    .map(|v| PartialDerivative {
                        variable: v.clone(),
                        derivative: partial(v).unwrap_or_else(|_| format!("Unable to compute ∂/∂{v}")),
                    })
                    .collect(),
            ),
        ),
        MultiOp::Gradient => {
            let gradient: Vec<String> = vars
                .iter()
                .map(|v| partial(v).unwrap_or_else(|_| "0".to_string()))
                .collect();
            notation = Some(format!("∇f = ({})", gradient.join(", ")));
            ("Gradient Vector", MultiResult::Components(gradient))
        }
        MultiOp::Divergence => {
            let mut divergence = "0".to_string();
            for v in vars.iter().filter(|v| partial(v).is_ok()) {
                divergence.push_str(&format!(" + ∂({function})/∂{v}"));
            }
            note = Some("For full divergence, provide vector field components".to_string());
            ("Divergence", MultiResult::Text(format!("Div F = {divergence}")))
        }
        MultiOp::Curl => match vars.as_slice() {
            [first, second] => {
                note = Some("2D curl computed as scalar vorticity".to_string());
                (
                    "Curl (2D Vorticity)",
                    MultiResult::Text(format!("∂f/∂{second} - ∂f/∂{first}")),
                )
            }
            [_, _, _] => {
                note = Some(
                    "Provide separate Fx, Fy, Fz components for complete 3D curl".to_string(),
                );
                (
                    "Curl (3D)",
                    MultiResult::Text("Full 3D curl requires vector field components".to_string()),
                )
            }
            _ => {
                return Err(CalcError::InvalidInput(
                    "Curl requires 2D or 3D vector field".to_string(),
                ))
            }
        },
        MultiOp::Double => {
            note = Some("For rectangular regions, use iterated single integrals".to_string());
            suggestion =
                Some("First integrate with respect to one variable, then the other".to_string());
            (
                "Double Integral",
                MultiResult::Text(
                    "Numerical double integration requires region specification".to_string(),
                ),
            )
        }
    };
    Ok(Report {
        computation: Computation::Multivariable {
            operation: operation.to_string(),
            variables: vars.clone(),
            result,
            notation,
            note,
            suggestion,
            original: function.to_string(),
        },
        steps: steps::multivariable(op.name(), &vars),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(function: &str) -> Session {
        let mut session = Session::default();
        session.validate(function).unwrap();
        session
    }

    fn computed(function: &str, operation: Operation) -> Computation {
        session_with(function)
            .compute(&operation)
            .unwrap()
            .computation
            .clone()
    }

    #[test]
    fn validation_normalizes_and_stores() {
        let mut session = Session::default();
        let validation = session.validate("  2x + 1 ").unwrap();
        assert_eq!(validation.function, "2*x+1");
        assert_eq!(validation.test_value, 3.0);
        assert_eq!(session.current_function(), Some("2*x+1"));
    }

    #[test]
    fn validation_falls_back_to_second_point() {
        let mut session = Session::default();
        let validation = session.validate("1/(x-1)").unwrap();
        assert_eq!(validation.test_value, -2.0);
    }

    #[test]
    fn failed_validation_clears_the_function() {
        let mut session = session_with("x");
        assert_eq!(
            session.validate("1/(x-x)"),
            Err(CalcError::InvalidInput(
                "Function cannot be evaluated numerically".to_string()
            ))
        );
        assert_eq!(session.current_function(), None);
        assert_eq!(session.compute(&Operation::Integral), Err(CalcError::NoFunction));
        assert_eq!(session.validate("   "), Err(CalcError::NoFunction));
    }

    #[test]
    fn derivatives() {
        let first = computed("x^2", Operation::Derivative { order: 1 });
        assert!(matches!(first, Computation::Derivative { ref symbolic, .. } if symbolic == "2 * x"));
        let second = computed("x^3", Operation::Derivative { order: 2 });
        assert!(matches!(second, Computation::Derivative { ref symbolic, .. } if symbolic == "6 * x"));

        let mut session = session_with("fraction(x, 2)");
        assert!(matches!(
            session.compute(&Operation::Derivative { order: 1 }),
            Err(CalcError::Differentiation(_))
        ));
    }

    #[test]
    fn indefinite_integrals() {
        match computed("cos(x)", Operation::Integral) {
            Computation::Integral { symbolic, method, .. } => {
                assert_eq!(symbolic, "sin(x) + C");
                assert_eq!(method, "Symbolic");
            }
            other => panic!("unexpected {other:?}"),
        }
        for product in ["x*x", "x^2/x*x", "3*x*x"] {
            match computed(product, Operation::Integral) {
                Computation::Integral { symbolic, method, .. } => {
                    assert_eq!(method, "Symbolic", "{product}");
                    assert!(symbolic.starts_with("x ^ 3"), "{product}: {symbolic}");
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        match computed("sin(x)/x", Operation::Integral) {
            Computation::Integral { symbolic, method, note, .. } => {
                assert_eq!(symbolic, "Unable to find symbolic integral");
                assert_eq!(method, "N/A");
                assert!(note.is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(common_integral("1/(1+x^2)"), Some("atan(x)"));
        assert_eq!(common_integral("x^4"), None);
    }

    #[test]
    fn definite_integral_uses_settings() {
        match computed("x^2", Operation::Definite { lower: 0.0, upper: 3.0 }) {
            Computation::Definite { value, points, warnings, .. } => {
                assert_eq!(value, "9.000000");
                assert_eq!(points, 100);
                assert_eq!(warnings, None);
            }
            other => panic!("unexpected {other:?}"),
        }
        let mut session = session_with("x");
        assert_eq!(
            session.compute(&Operation::Definite { lower: 2.0, upper: 1.0 }),
            Err(CalcError::InvalidBounds(
                "Lower limit must be less than upper limit".to_string()
            ))
        );
    }

    #[test]
    fn advanced_integration() {
        let numeric = computed(
            "x",
            Operation::Advanced {
                method: IntegrationMethod::Parts,
                limits: Some((0.0, 2.0)),
            },
        );
        assert!(matches!(
            numeric,
            Computation::Advanced { ref method, ref value, .. }
                if method == "parts (Hybrid Numerical)" && value.as_deref() == Some("2.000000")
        ));

        let unsolved = computed(
            "sin(x)/x",
            Operation::Advanced {
                method: IntegrationMethod::Trig,
                limits: None,
            },
        );
        assert!(matches!(
            unsolved,
            Computation::Advanced { ref symbolic, ref suggestion, .. }
                if symbolic.as_deref() == Some("Unable to find closed form")
                    && suggestion.as_deref() == Some("Use trigonometric identities or substitutions")
        ));
    }

    #[test]
    fn differential_equations_are_placeholders() {
        let mut session = session_with("x");
        let report = session
            .compute(&Operation::Differential {
                kind: OdeKind::FirstOrder,
                initial_conditions: Some("  ".to_string()),
            })
            .unwrap();
        assert!(matches!(
            &report.computation,
            Computation::Differential { initial_conditions, .. } if initial_conditions == "None specified"
        ));
        assert_eq!(report.steps[0].title, "firstOrder ODE");
    }

    #[test]
    fn series_expansions() {
        let series = computed(
            "sin(x)",
            Operation::Series {
                kind: SeriesKind::Maclaurin,
                point: 0.0,
                terms: 5,
            },
        );
        assert!(matches!(
            series,
            Computation::Series { expansion: Expansion::Symbolic(ref text), series_type: SeriesKind::Maclaurin, .. }
                if text == "x - x ^ 3 / 6"
        ));

        // log is complex left of zero, so only the numeric path applies.
        match computed(
            "log(x)",
            Operation::Series {
                kind: SeriesKind::Power,
                point: -1.0,
                terms: 3,
            },
        ) {
            Computation::Series {
                expansion: Expansion::Numeric(terms),
                series_type,
                ..
            } => {
                assert_eq!(series_type, SeriesKind::Taylor);
                assert_eq!(terms[0].order, 1);
                assert_eq!(terms[0].coefficient, -1.0);
                assert_eq!(terms[0].term, "-1.0000 * (x - -1)^1");
                assert_eq!(terms[1].coefficient, -0.5);
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut session = session_with("x");
        assert!(matches!(
            session.compute(&Operation::Series {
                kind: SeriesKind::Taylor,
                point: 0.0,
                terms: 21,
            }),
            Err(CalcError::InvalidInput(_))
        ));
    }

    #[test]
    fn tangent_series_at_the_term_limit() {
        match computed(
            "tan(x)",
            Operation::Series {
                kind: SeriesKind::Maclaurin,
                point: 0.0,
                terms: MAX_SERIES_TERMS,
            },
        ) {
            Computation::Series {
                expansion: Expansion::Symbolic(text),
                ..
            } => assert!(text.starts_with("x + x ^ 3 / 3 + 2 * x ^ 5 / 15"), "{text}"),
            Computation::Series {
                expansion: Expansion::Numeric(terms),
                ..
            } => {
                let orders: Vec<usize> = terms.iter().map(|t| t.order).collect();
                assert_eq!(orders, [1, 3, 5, 7, 9, 11, 13, 15, 17, 19]);
                assert_eq!(terms[1].term, "0.3333 * (x - 0)^3");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn precision_is_bounded() {
        let settings = Settings {
            precision: MAX_PRECISION + 1,
            ..Settings::default()
        };
        let mut session = Session::new(settings);
        session.validate("x").unwrap();
        assert!(matches!(
            session.compute(&Operation::Definite { lower: 0.0, upper: 1.0 }),
            Err(CalcError::InvalidInput(_))
        ));
    }

    #[test]
    fn multivariable_operations() {
        let vars = vec!["x".to_string(), "y".to_string()];
        match computed(
            "x*y + y",
            Operation::Multivariable {
                op: MultiOp::Gradient,
                vars: vars.clone(),
            },
        ) {
            Computation::Multivariable { result, notation, .. } => {
                assert_eq!(
                    result,
                    MultiResult::Components(vec!["y".to_string(), "x + 1".to_string()])
                );
                assert_eq!(notation.as_deref(), Some("∇f = (y, x + 1)"));
            }
            other => panic!("unexpected {other:?}"),
        }

        match computed(
            "x*y",
            Operation::Multivariable {
                op: MultiOp::Curl,
                vars: vars.clone(),
            },
        ) {
            Computation::Multivariable { result, .. } => {
                assert_eq!(result, MultiResult::Text("∂f/∂y - ∂f/∂x".to_string()));
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut session = session_with("x*y");
        assert_eq!(
            session.compute(&Operation::Multivariable {
                op: MultiOp::Partial,
                vars: vec!["x".to_string()],
            }),
            Err(CalcError::InvalidInput(
                "Please specify at least 2 variables (e.g., x,y)".to_string()
            ))
        );
        let four: Vec<String> = ["w", "x", "y", "z"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            session.compute(&Operation::Multivariable {
                op: MultiOp::Curl,
                vars: four,
            }),
            Err(CalcError::InvalidInput(
                "Curl requires 2D or 3D vector field".to_string()
            ))
        );
    }

    #[test]
    fn plots_and_last_result() {
        let mut session = session_with("sin(x)");
        assert!(session.last_result().is_none());
        session.compute(&Operation::Plot).unwrap();
        assert!(matches!(
            session.last_result().map(|r| &r.computation),
            Some(Computation::Plot(curve)) if curve.xs.len() == 101
        ));
        assert!(matches!(
            session.compute(&Operation::Plot3d),
            Err(CalcError::InvalidInput(_))
        ));
    }
}
