//! Operation requests and their tagged result records.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::sampling::{Curve, Surface};
use crate::steps::Step;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationMethod {
    #[default]
    Auto,
    Substitution,
    Parts,
    Partial,
    Trig,
}

impl IntegrationMethod {
    pub fn name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Substitution => "substitution",
            Self::Parts => "parts",
            Self::Partial => "partial",
            Self::Trig => "trig",
        }
    }

    /// What to try by hand when no closed form was found.
    pub fn suggestion(self) -> &'static str {
        match self {
            Self::Substitution => "Try identifying u = g(x) where du appears in the integrand",
            Self::Parts => "Use ∫u dv = uv - ∫v du. Choose u using LIATE rule",
            Self::Partial => "Decompose rational function into partial fractions",
            Self::Trig => "Use trigonometric identities or substitutions",
            Self::Auto => "Consider numerical methods",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum OdeKind {
    #[default]
    FirstOrder,
    SecondOrder,
    System,
}

impl OdeKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::FirstOrder => "firstOrder",
            Self::SecondOrder => "secondOrder",
            Self::System => "system",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    #[default]
    Taylor,
    Maclaurin,
    Power,
}

impl SeriesKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Taylor => "taylor",
            Self::Maclaurin => "maclaurin",
            Self::Power => "power",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MultiOp {
    Partial,
    Gradient,
    Divergence,
    Curl,
    Double,
}

impl MultiOp {
    pub fn name(self) -> &'static str {
        match self {
            Self::Partial => "partial",
            Self::Gradient => "gradient",
            Self::Divergence => "divergence",
            Self::Curl => "curl",
            Self::Double => "double",
        }
    }
}

/// A request against the session's current function.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Derivative {
        order: usize,
    },
    Integral,
    Definite {
        lower: f64,
        upper: f64,
    },
    Advanced {
        method: IntegrationMethod,
        limits: Option<(f64, f64)>,
    },
    Differential {
        kind: OdeKind,
        initial_conditions: Option<String>,
    },
    Series {
        kind: SeriesKind,
        point: f64,
        terms: usize,
    },
    Multivariable {
        op: MultiOp,
        vars: Vec<String>,
    },
    Plot,
    Plot3d,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesTerm {
    pub order: usize,
    pub coefficient: f64,
    pub term: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Expansion {
    Symbolic(String),
    Numeric(Vec<SeriesTerm>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PartialDerivative {
    pub variable: String,
    pub derivative: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MultiResult {
    Text(String),
    Components(Vec<String>),
    Partials(Vec<PartialDerivative>),
}

/// Result record, tagged by `type` when serialized.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Computation {
    Derivative {
        order: usize,
        symbolic: String,
        original: String,
    },
    Integral {
        symbolic: String,
        method: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        original: String,
    },
    Definite {
        value: String,
        lower: f64,
        upper: f64,
        method: String,
        points: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        warnings: Option<String>,
        original: String,
    },
    Advanced {
        method: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        symbolic: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limits: Option<(f64, f64)>,
        #[serde(skip_serializing_if = "Option::is_none")]
        points: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        warnings: Option<String>,
        original: String,
    },
    Differential {
        ode_type: OdeKind,
        equation: String,
        solution: String,
        note: String,
        initial_conditions: String,
    },
    Series {
        series_type: SeriesKind,
        point: f64,
        terms: usize,
        expansion: Expansion,
        original: String,
    },
    Multivariable {
        operation: String,
        variables: Vec<String>,
        result: MultiResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        notation: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
        original: String,
    },
    Plot(Curve),
    Plot3d(Surface),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub computation: Computation,
    pub steps: Vec<Step>,
}

fn optional_line(f: &mut fmt::Formatter<'_>, label: &str, value: &Option<String>) -> fmt::Result {
    match value {
        Some(value) => writeln!(f, "{label}: {value}"),
        None => Ok(()),
    }
}

impl fmt::Display for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Derivative {
                order,
                symbolic,
                original,
            } => {
                writeln!(f, "f(x) = {original}")?;
                match order {
                    1 => writeln!(f, "f'(x) = {symbolic}"),
                    2 => writeln!(f, "f''(x) = {symbolic}"),
                    n => writeln!(f, "f^({n})(x) = {symbolic}"),
                }
            }
            Self::Integral {
                symbolic,
                method,
                note,
                original,
            } => {
                writeln!(f, "∫ {original} dx = {symbolic}")?;
                writeln!(f, "Method: {method}")?;
                optional_line(f, "Note", note)
            }
            Self::Definite {
                value,
                lower,
                upper,
                method,
                points,
                warnings,
                original,
            } => {
                writeln!(f, "∫[{lower}, {upper}] {original} dx ≈ {value}")?;
                writeln!(f, "Method: {method} ({points} intervals)")?;
                optional_line(f, "Warning", warnings)
            }
            Self::Advanced {
                method,
                symbolic,
                value,
                limits,
                suggestion,
                warnings,
                original,
                ..
            } => {
                match (limits, value, symbolic) {
                    (Some((lower, upper)), Some(value), _) => {
                        writeln!(f, "∫[{lower}, {upper}] {original} dx ≈ {value}")?
                    }
                    (_, _, Some(symbolic)) => writeln!(f, "∫ {original} dx = {symbolic}")?,
                    _ => {}
                }
                writeln!(f, "Method: {method}")?;
                optional_line(f, "Suggestion", suggestion)?;
                optional_line(f, "Warning", warnings)
            }
            Self::Differential {
                ode_type,
                equation,
                solution,
                note,
                initial_conditions,
            } => {
                writeln!(f, "{} ODE: {equation}", ode_type.name())?;
                writeln!(f, "Solution: {solution}")?;
                writeln!(f, "Initial conditions: {initial_conditions}")?;
                writeln!(f, "Note: {note}")
            }
            Self::Series {
                series_type,
                point,
                expansion,
                original,
                ..
            } => {
                writeln!(f, "{} series of {original} around {point}:", series_type.name())?;
                match expansion {
                    Expansion::Symbolic(text) => writeln!(f, "{text}"),
                    Expansion::Numeric(terms) => {
                        let joined: Vec<&str> = terms.iter().map(|t| t.term.as_str()).collect();
                        writeln!(f, "{}", joined.join(" + "))
                    }
                }
            }
            Self::Multivariable {
                operation,
                variables,
                result,
                notation,
                note,
                suggestion,
                original,
            } => {
                writeln!(f, "{operation} of {original} in ({})", variables.join(", "))?;
                match result {
                    MultiResult::Text(text) => writeln!(f, "{text}")?,
                    MultiResult::Components(components) => {
                        writeln!(f, "({})", components.join(", "))?
                    }
                    MultiResult::Partials(partials) => {
                        for p in partials {
                            writeln!(f, "∂f/∂{} = {}", p.variable, p.derivative)?;
                        }
                    }
                }
                optional_line(f, "Notation", notation)?;
                optional_line(f, "Note", note)?;
                optional_line(f, "Suggestion", suggestion)
            }
            Self::Plot(curve) => {
                writeln!(f, "x\ty")?;
                for (x, y) in curve.xs.iter().zip(&curve.ys) {
                    writeln!(f, "{x}\t{y}")?;
                }
                writeln!(f, "{} points skipped", curve.skipped)
            }
            Self::Plot3d(surface) => {
                writeln!(f, "x\ty\tz")?;
                for (i, x) in surface.xs.iter().enumerate() {
                    for (j, y) in surface.ys.iter().enumerate() {
                        if let Some(z) = surface.get(i, j) {
                            writeln!(f, "{x}\t{y}\t{z}")?;
                        }
                    }
                }
                writeln!(
                    f,
                    "z range: [{}, {}], {} points skipped",
                    surface.z_range.0, surface.z_range.1, surface.skipped
                )
            }
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.computation)?;
        if !self.steps.is_empty() {
            writeln!(f)?;
            for step in &self.steps {
                writeln!(f, "{}. {}: {}", step.num, step.title, step.content)?;
            }
        }
        Ok(())
    }
}
