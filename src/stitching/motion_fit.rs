// src/stitching/motion_fit.rs
//
// Smooth speed curve from noisy per-frame displacements.
//
// Per-frame template matching is accurate to about a pixel but the
// occasional match on a reflection or an inter-wagon gap is wildly
// wrong. A train, on the other hand, changes speed smoothly over the
// few seconds it is in view. So: establish the direction from the
// median, drop outliers by median absolute deviation, and fit a
// low-order polynomial v(t) in the least-squares sense. Integrating
// the fitted speed gives the cumulative position each frame is pasted
// at.

use tracing::debug;

use super::Rejection;
use crate::types::Direction;

/// Share of non-zero samples that must agree with the median sign.
const MIN_DIRECTION_AGREEMENT: f64 = 0.6;

/// Outlier gate as a multiple of the median absolute deviation.
const MAD_OUTLIER_FACTOR: f64 = 3.0;

/// Highest polynomial degree tried for the speed curve.
const MAX_FIT_DEGREE: usize = 2;

/// Fitted motion model for one pass.
#[derive(Debug, Clone)]
pub struct MotionFit {
    pub direction: Direction,
    /// Fitted speed v(t_i) per input sample, pixels per frame.
    pub speeds: Vec<f64>,
    /// Position X_i = sum of v(t_j) for j < i, pixels. Each sample's
    /// speed is the transition out of its frame, so a frame sits at
    /// the displacement accumulated before it.
    pub positions: Vec<f64>,
    /// Total travel |X_last - X_0| in pixels.
    pub length_px: f64,
    /// Mean of |v(t_i)|, pixels per frame.
    pub mean_abs_speed_px: f64,
    /// Degree of the selected polynomial.
    pub degree: usize,
    /// RMS residual of the fit on the retained samples.
    pub rmse: f64,
}

/// Fits a speed curve to `(timestamp_ms, dx)` samples.
pub fn fit_motion(samples: &[(f64, i32)]) -> Result<MotionFit, Rejection> {
    if samples.is_empty() {
        return Err(Rejection::FitFailed {
            reason: "empty sequence",
        });
    }

    let dxs: Vec<f64> = samples.iter().map(|&(_, dx)| dx as f64).collect();

    // direction from the median; a pass with no dominant sign is junk
    let med = median(&dxs);
    let direction = Direction::from_median_dx(med).ok_or(Rejection::InconsistentDirection {
        agreeing: 0,
        nonzero: dxs.iter().filter(|&&d| d != 0.0).count(),
    })?;

    let nonzero = dxs.iter().filter(|&&d| d != 0.0).count();
    let agreeing = dxs
        .iter()
        .filter(|&&d| d != 0.0 && d.signum() == med.signum())
        .count();
    if (agreeing as f64) < MIN_DIRECTION_AGREEMENT * nonzero as f64 {
        return Err(Rejection::InconsistentDirection { agreeing, nonzero });
    }

    // discard gross outliers before fitting
    let mad = median(&dxs.iter().map(|&d| (d - med).abs()).collect::<Vec<_>>());
    let gate = MAD_OUTLIER_FACTOR * mad;
    let kept: Vec<(f64, f64)> = samples
        .iter()
        .map(|&(t, dx)| (t, dx as f64))
        .filter(|&(_, dx)| (dx - med).abs() <= gate)
        .collect();
    if kept.len() < samples.len() {
        debug!(
            "discarded {} of {} displacement samples as outliers (median {:.1}, mad {:.2})",
            samples.len() - kept.len(),
            samples.len(),
            med,
            mad
        );
    }

    // normalize t to [0, 1] for numerical stability
    let t0 = samples[0].0;
    let t_range = samples[samples.len() - 1].0 - t0;
    let tn = |t: f64| if t_range > 0.0 { (t - t0) / t_range } else { 0.0 };

    let mut best: Option<(Vec<f64>, f64)> = None;
    for degree in 0..=MAX_FIT_DEGREE {
        if degree >= kept.len() {
            break;
        }
        let Some(coeffs) = polyfit(&kept, degree, tn) else {
            continue;
        };
        let rmse = fit_rmse(&kept, &coeffs, tn);
        match &best {
            Some((_, best_rmse)) if rmse >= *best_rmse => {}
            _ => best = Some((coeffs, rmse)),
        }
    }
    let Some((coeffs, rmse)) = best else {
        return Err(Rejection::FitFailed {
            reason: "all polynomial fits singular",
        });
    };
    let degree = coeffs.len() - 1;

    // evaluate at every input sample, outliers included, then
    // integrate. A sample's speed describes the step from its frame to
    // the next one, so frame i sits at the sum of the steps before it.
    let speeds: Vec<f64> = samples.iter().map(|&(t, _)| poly_eval(&coeffs, tn(t))).collect();
    let mut positions = Vec::with_capacity(speeds.len());
    let mut x = 0.0f64;
    for &v in &speeds {
        positions.push(x);
        x += v;
    }

    let length_px = (positions[positions.len() - 1] - positions[0]).abs();
    let mean_abs_speed_px = speeds.iter().map(|v| v.abs()).sum::<f64>() / speeds.len() as f64;

    debug!(
        "motion fit: degree {} rmse {:.3} length {:.1}px mean speed {:.2}px/frame {}",
        degree, rmse, length_px, mean_abs_speed_px, direction
    );

    Ok(MotionFit {
        direction,
        speeds,
        positions,
        length_px,
        mean_abs_speed_px,
        degree,
        rmse,
    })
}

/// Median without averaging the middle pair, so the result is always an
/// observed value.
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted[sorted.len() / 2]
}

/// Least-squares polynomial of the given degree through `(t, v)` points,
/// solved via the normal equations. Returns coefficients lowest power
/// first, or None if the system is singular.
fn polyfit(points: &[(f64, f64)], degree: usize, tn: impl Fn(f64) -> f64) -> Option<Vec<f64>> {
    let n = degree + 1;

    // normal equations: sum of t^(i+j) on the left, sum of v * t^i on the right
    let mut pow_sums = vec![0.0f64; 2 * degree + 1];
    let mut rhs = vec![0.0f64; n];
    for &(t, v) in points {
        let x = tn(t);
        let mut p = 1.0f64;
        for (i, sum) in pow_sums.iter_mut().enumerate() {
            *sum += p;
            if i < n {
                rhs[i] += v * p;
            }
            p *= x;
        }
    }
    let mut mat = vec![0.0f64; n * n];
    for i in 0..n {
        for j in 0..n {
            mat[i * n + j] = pow_sums[i + j];
        }
    }
    solve_linear(&mut mat, &mut rhs, n)
}

/// Solves an n x n system (n <= 3) by Gaussian elimination with partial
/// pivoting. Consumes its inputs. Returns None if singular.
fn solve_linear(mat: &mut [f64], rhs: &mut [f64], n: usize) -> Option<Vec<f64>> {
    for col in 0..n {
        let mut max_val = mat[col * n + col].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            if mat[row * n + col].abs() > max_val {
                max_val = mat[row * n + col].abs();
                max_row = row;
            }
        }
        if max_val < 1e-12 {
            return None;
        }
        if max_row != col {
            for j in 0..n {
                mat.swap(col * n + j, max_row * n + j);
            }
            rhs.swap(col, max_row);
        }
        for row in (col + 1)..n {
            let factor = mat[row * n + col] / mat[col * n + col];
            for j in col..n {
                mat[row * n + j] -= factor * mat[col * n + j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }
    // back substitution
    let mut out = vec![0.0f64; n];
    for i in (0..n).rev() {
        let mut sum = rhs[i];
        for j in (i + 1)..n {
            sum -= mat[i * n + j] * out[j];
        }
        out[i] = sum / mat[i * n + i];
    }
    Some(out)
}

fn poly_eval(coeffs: &[f64], x: f64) -> f64 {
    let mut acc = 0.0f64;
    for &c in coeffs.iter().rev() {
        acc = acc * x + c;
    }
    acc
}

fn fit_rmse(points: &[(f64, f64)], coeffs: &[f64], tn: impl Fn(f64) -> f64) -> f64 {
    let mut sse = 0.0f64;
    for &(t, v) in points {
        let r = v - poly_eval(coeffs, tn(t));
        sse += r * r;
    }
    (sse / points.len() as f64).sqrt()
}
