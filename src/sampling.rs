//! Sample arrays for 2D curves and 3D surfaces.
//!
//! Points that fail to evaluate, or land outside the plottable magnitude,
//! are dropped (curves) or masked out (surfaces) and counted.

use bitvec::prelude::*;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::debug;

#[cfg(feature = "rayon")]
use rayon::prelude::{IntoParallelIterator, ParallelIterator};

use crate::bindings::Bindings;
use crate::error::CalcError;
use crate::hybrid::{Evaluator, SymbolicBackend};

pub const CURVE_LIMIT: f64 = 1e10;
pub const SURFACE_LIMIT: f64 = 1e6;
pub const MIN_CURVE_POINTS: usize = 10;
pub const MIN_SURFACE_POINTS: usize = 25;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Curve {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub skipped: usize,
}

/// Row-major `(n + 1) x (n + 1)` grid; row `i` is `xs[i]`, column `j` is
/// `ys[j]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    z: Vec<f64>,
    valid: BitVec,
    pub z_range: (f64, f64),
    pub skipped: usize,
}

impl Surface {
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        let index = i * self.ys.len() + j;
        match self.valid.get(index) {
            Some(bit) if *bit => Some(self.z[index]),
            _ => None,
        }
    }

    pub fn valid_count(&self) -> usize {
        self.valid.count_ones()
    }

    /// Rows of `z` with `None` where the sample was dropped.
    pub fn rows(&self) -> Vec<Vec<Option<f64>>> {
        (0..self.xs.len())
            .map(|i| (0..self.ys.len()).map(|j| self.get(i, j)).collect())
            .collect()
    }
}

impl Serialize for Surface {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Surface", 5)?;
        state.serialize_field("x", &self.xs)?;
        state.serialize_field("y", &self.ys)?;
        state.serialize_field("z", &self.rows())?;
        state.serialize_field("z_range", &self.z_range)?;
        state.serialize_field("skipped", &self.skipped)?;
        state.end()
    }
}

fn axis(range: f64, intervals: usize) -> Vec<f64> {
    let step = 2.0 * range / intervals as f64;
    (0..=intervals).map(|i| -range + i as f64 * step).collect()
}

/// Samples `y = f(x)` at `resolution` intervals over `[-range, range]`.
pub fn sample_curve<B: SymbolicBackend>(
    evaluator: &Evaluator<B>,
    expr: &str,
    range: f64,
    resolution: usize,
) -> Result<Curve, CalcError> {
    let mut curve = Curve {
        xs: Vec::new(),
        ys: Vec::new(),
        skipped: 0,
    };
    for x in axis(range, resolution.max(1)) {
        match evaluator.evaluate(expr, &Bindings::x(x)) {
            Ok(y) if y.is_finite() && y.abs() < CURVE_LIMIT => {
                curve.xs.push(x);
                curve.ys.push(y);
            }
            _ => curve.skipped += 1,
        }
    }
    debug!(expr, points = curve.xs.len(), skipped = curve.skipped, "sampled curve");
    if curve.xs.len() < MIN_CURVE_POINTS {
        return Err(CalcError::InsufficientSamples(
            "Function has too many discontinuities to plot".to_string(),
        ));
    }
    Ok(curve)
}

/// Samples `z = f(x, y)` on a `(grid + 1)²` lattice over `[-range, range]²`.
pub fn sample_surface<B: SymbolicBackend>(
    evaluator: &Evaluator<B>,
    expr: &str,
    range: f64,
    grid: usize,
) -> Result<Surface, CalcError> {
    if !expr.contains('y') {
        return Err(CalcError::InvalidInput(
            "Function must contain variables x and y for 3D plotting (e.g., sin(x)*cos(y))"
                .to_string(),
        ));
    }
    let xs = axis(range, grid.max(1));
    let ys = xs.clone();

    let sample_row = |x: f64| -> Vec<Option<f64>> {
        ys.iter()
            .map(|&y| {
                evaluator
                    .evaluate(expr, &Bindings::xy(x, y))
                    .ok()
                    .filter(|z| z.is_finite() && z.abs() < SURFACE_LIMIT)
            })
            .collect()
    };

    #[cfg(feature = "rayon")]
    let rows: Vec<Vec<Option<f64>>> = xs.clone().into_par_iter().map(sample_row).collect();
    #[cfg(not(feature = "rayon"))]
    let rows: Vec<Vec<Option<f64>>> = xs.iter().copied().map(sample_row).collect();

    let mut z = Vec::with_capacity(xs.len() * ys.len());
    let mut valid = BitVec::with_capacity(xs.len() * ys.len());
    for sample in rows.into_iter().flatten() {
        z.push(sample.unwrap_or(f64::NAN));
        valid.push(sample.is_some());
    }

    let valid_count = valid.count_ones();
    let skipped = valid.len() - valid_count;
    debug!(expr, points = valid_count, skipped, "sampled surface");
    if valid_count < MIN_SURFACE_POINTS {
        return Err(CalcError::InsufficientSamples(
            "3D surface needs more valid sample points. Adjust the function or domain."
                .to_string(),
        ));
    }

    let (mut z_min, mut z_max) = valid
        .iter_ones()
        .map(|index| z[index])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if z_min == z_max {
        let padding = (z_min.abs() * 0.1).max(1.0);
        z_min -= padding;
        z_max += padding;
    }

    Ok(Surface {
        xs,
        ys,
        z,
        valid,
        z_range: (z_min, z_max),
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn curve_covers_the_range() {
        let curve = sample_curve(&Evaluator::new(), "x^2", 10.0, 100).unwrap();
        assert_eq!(curve.xs.len(), 101);
        assert_eq!(curve.skipped, 0);
        assert_eq!(curve.xs[0], -10.0);
        assert_abs_diff_eq!(curve.xs[100], 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.ys[0], 100.0, epsilon = 1e-9);
    }

    #[test]
    fn curve_drops_singular_points() {
        let curve = sample_curve(&Evaluator::new(), "1/x", 10.0, 100).unwrap();
        assert_eq!(curve.skipped, 1);
        assert!(!curve.xs.contains(&0.0));
    }

    #[test]
    fn curve_needs_enough_points() {
        let err = sample_curve(&Evaluator::new(), "1/(x - x)", 10.0, 100).unwrap_err();
        assert!(matches!(err, CalcError::InsufficientSamples(_)));
    }

    #[test]
    fn surface_grid() {
        let surface = sample_surface(&Evaluator::new(), "x + y", 5.0, 10).unwrap();
        assert_eq!(surface.xs.len(), 11);
        assert_eq!(surface.valid_count(), 121);
        assert_eq!(surface.get(0, 10), Some(0.0));
        assert_eq!(surface.get(10, 10), Some(10.0));
        assert_eq!(surface.z_range, (-10.0, 10.0));
    }

    #[test]
    fn surface_masks_invalid_points() {
        let surface = sample_surface(&Evaluator::new(), "1/(x*y)", 5.0, 10).unwrap();
        // The row x = 0 and the column y = 0.
        assert_eq!(surface.skipped, 21);
        assert_eq!(surface.get(5, 3), None);
        let json = serde_json::to_value(&surface).unwrap();
        assert!(json["z"][5][3].is_null());
        assert!(json["z"][1][1].is_number());
    }

    #[test]
    fn flat_surface_is_padded() {
        let surface = sample_surface(&Evaluator::new(), "0*y + 3", 5.0, 10).unwrap();
        assert_eq!(surface.z_range, (2.0, 4.0));
        let big = sample_surface(&Evaluator::new(), "0*y + 50", 5.0, 10).unwrap();
        assert_eq!(big.z_range, (45.0, 55.0));
    }

    #[test]
    fn surface_requires_y() {
        assert!(matches!(
            sample_surface(&Evaluator::new(), "sin(x)", 5.0, 10),
            Err(CalcError::InvalidInput(_))
        ));
    }
}
