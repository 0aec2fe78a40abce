//! Fixed explanation templates attached to each computation.

use serde::Serialize;

use crate::expression::format_number;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Step {
    pub num: usize,
    pub title: String,
    pub content: String,
}

fn numbered<I, T, C>(items: I) -> Vec<Step>
where
    I: IntoIterator<Item = (T, C)>,
    T: Into<String>,
    C: Into<String>,
{
    items
        .into_iter()
        .enumerate()
        .map(|(i, (title, content))| Step {
            num: i + 1,
            title: title.into(),
            content: content.into(),
        })
        .collect()
}

fn ordinal(n: usize) -> String {
    match n {
        1 => "first".to_string(),
        2 => "second".to_string(),
        3 => "third".to_string(),
        n => {
            let suffix = match (n % 10, n % 100) {
                (_, 11..=13) => "th",
                (1, _) => "st",
                (2, _) => "nd",
                (3, _) => "rd",
                _ => "th",
            };
            format!("{n}{suffix}")
        }
    }
}

pub fn derivative(order: usize, function: &str) -> Vec<Step> {
    numbered([
        (
            "Apply differentiation rules".to_string(),
            format!("Taking the {} derivative of f(x) = {function}", ordinal(order)),
        ),
        (
            "Use power rule, chain rule, product rule as needed".to_string(),
            "Apply appropriate differentiation techniques".to_string(),
        ),
        (
            "Simplify result".to_string(),
            "Combine like terms and simplify the expression".to_string(),
        ),
    ])
}

pub fn symbolic_integral() -> Vec<Step> {
    numbered([
        ("Identify integration pattern", "Analyze the function structure"),
        ("Apply integration rules", "Use appropriate integration techniques"),
        (
            "Add constant of integration",
            "Remember to add +C for indefinite integrals",
        ),
    ])
}

pub fn pattern_integral() -> Vec<Step> {
    numbered([
        ("Match pattern", "Found matching integral pattern in lookup table"),
        ("Apply formula", "Use standard integral formula"),
        ("Add constant", "Add +C for indefinite integral"),
    ])
}

pub fn definite(lower: f64, upper: f64, result: f64, points: usize) -> Vec<Step> {
    numbered([
        (
            "Set up definite integral".to_string(),
            format!(
                "∫[{}, {}] f(x) dx",
                format_number(lower),
                format_number(upper)
            ),
        ),
        (
            "Apply Simpson's Rule".to_string(),
            format!("Using {points} sample points for numerical integration"),
        ),
        (
            "Compute weighted sum".to_string(),
            "Calculate weighted sum of function values at sample points".to_string(),
        ),
        (
            "Final result".to_string(),
            format!("Result ≈ {}", format_number(result)),
        ),
    ])
}

pub fn advanced(method: &str, numerical: bool) -> Vec<Step> {
    let approach = if numerical {
        "Numerical evaluation using Simpson's Rule"
    } else {
        "Symbolic integration attempt"
    };
    numbered([
        (
            format!("Method: {method}"),
            format!("Using {method} integration technique"),
        ),
        ("Apply method".to_string(), approach.to_string()),
        (
            "Simplify".to_string(),
            "Simplify and verify the result".to_string(),
        ),
    ])
}

pub fn ode(kind: &str) -> Vec<Step> {
    numbered([
        (
            format!("{kind} ODE"),
            "Identify the order and type of differential equation".to_string(),
        ),
        (
            "Solution method".to_string(),
            "For complete ODE solutions, specialized solvers are recommended".to_string(),
        ),
        (
            "Note".to_string(),
            "This tool provides basic ODE analysis. Use dedicated ODE solvers for complete solutions"
                .to_string(),
        ),
    ])
}

pub fn series(kind: &str, point: f64, terms: usize) -> Vec<Step> {
    let point = format_number(point);
    numbered([
        (
            format!("{kind} expansion"),
            format!("Expanding around point a = {point}"),
        ),
        (
            "Compute derivatives".to_string(),
            format!("Computing first {terms} derivatives at x = {point}"),
        ),
        (
            "Build series".to_string(),
            "Construct series using Taylor/Maclaurin formula".to_string(),
        ),
        ("Result".to_string(), format!("Series with {terms} terms")),
    ])
}

pub fn multivariable(operation: &str, vars: &[String]) -> Vec<Step> {
    numbered([
        (
            format!("{operation} computation"),
            format!("Operating on function with variables: {}", vars.join(", ")),
        ),
        (
            "Multi-variable calculus".to_string(),
            "Requires specialized implementation for complete solutions".to_string(),
        ),
        (
            "Note".to_string(),
            "Partial derivatives and gradients can be approximated numerically".to_string(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_numbered_from_one() {
        let steps = definite(0.0, 2.5, 1.25, 100);
        let nums: Vec<_> = steps.iter().map(|s| s.num).collect();
        assert_eq!(nums, [1, 2, 3, 4]);
        assert_eq!(steps[0].content, "∫[0, 2.5] f(x) dx");
        assert_eq!(steps[3].content, "Result ≈ 1.25");
    }

    #[test]
    fn derivative_order_is_spelled_out() {
        assert_eq!(
            derivative(2, "x^3")[0].content,
            "Taking the second derivative of f(x) = x^3"
        );
        assert_eq!(
            derivative(5, "x")[0].content,
            "Taking the 5th derivative of f(x) = x"
        );
        let ordinals: Vec<String> = [11, 12, 13, 21, 22, 23, 101, 111].map(ordinal).into();
        assert_eq!(
            ordinals,
            ["11th", "12th", "13th", "21st", "22nd", "23rd", "101st", "111th"]
        );
    }

    #[test]
    fn templates_interpolate_parameters() {
        assert_eq!(series("maclaurin", 0.0, 5)[1].content, "Computing first 5 derivatives at x = 0");
        assert_eq!(advanced("parts", true)[1].content, "Numerical evaluation using Simpson's Rule");
        assert_eq!(
            multivariable("gradient", &["x".into(), "y".into()])[0].content,
            "Operating on function with variables: x, y"
        );
        assert_eq!(ode("firstOrder")[0].title, "firstOrder ODE");
    }
}
