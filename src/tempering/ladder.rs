//! The ladder adaptor (§4.F): a monotone cubic Hermite interpolant of the
//! cumulative rejection curve ("communication barrier" Λ), and bisection
//! root-finding to equidistribute it across a new β-ladder.
//!
//! Hand-rolled per §9's design note: Fritsch–Carlson tangents, clamped so
//! no cubic segment overshoots its endpoints, which is what guarantees Λ
//! stays monotone non-decreasing given non-negative rejection data.

use crate::McmcError;
use crate::error::Result;

/// A monotone cubic Hermite interpolant over a strictly increasing grid.
#[derive(Debug, Clone)]
pub struct MonotoneSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    tangents: Vec<f64>,
}

impl MonotoneSpline {
    /// Build the Fritsch–Carlson interpolant of `(xs, ys)`. `xs` must be
    /// strictly increasing and the same length as `ys`; callers of this
    /// module guarantee that (the β-axis is `reverse(ladder)`).
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self> {
        if xs.len() != ys.len() || xs.len() < 2 {
            return Err(McmcError::numeric(
                "spline requires at least two matching (x, y) points",
            ));
        }
        for w in xs.windows(2) {
            if !(w[0] < w[1]) {
                return Err(McmcError::numeric("spline x-axis must be strictly increasing"));
            }
        }

        let n = xs.len();
        let mut secants = vec![0.0; n - 1];
        for i in 0..n - 1 {
            secants[i] = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i]);
        }

        let mut tangents = vec![0.0; n];
        tangents[0] = secants[0];
        tangents[n - 1] = secants[n - 2];
        for i in 1..n - 1 {
            if secants[i - 1] == 0.0 || secants[i] == 0.0 || secants[i - 1].signum() != secants[i].signum() {
                tangents[i] = 0.0;
            } else {
                tangents[i] = (secants[i - 1] + secants[i]) / 2.0;
            }
        }

        // Fritsch-Carlson overshoot correction
        for i in 0..n - 1 {
            if secants[i] == 0.0 {
                tangents[i] = 0.0;
                tangents[i + 1] = 0.0;
                continue;
            }
            let alpha = tangents[i] / secants[i];
            let beta = tangents[i + 1] / secants[i];
            let norm = alpha * alpha + beta * beta;
            if norm > 9.0 {
                let tau = 3.0 / norm.sqrt();
                tangents[i] = tau * alpha * secants[i];
                tangents[i + 1] = tau * beta * secants[i];
            }
        }

        if tangents.iter().any(|t| !t.is_finite()) {
            return Err(McmcError::numeric("spline tangent computation produced a non-finite value"));
        }

        Ok(Self { xs, ys, tangents })
    }

    /// Evaluate Λ(x), clamping `x` to the spline's domain.
    pub fn eval(&self, x: f64) -> f64 {
        let x = x.clamp(self.xs[0], *self.xs.last().unwrap());
        let i = match self
            .xs
            .binary_search_by(|probe| probe.partial_cmp(&x).unwrap())
        {
            Ok(i) => i.min(self.xs.len() - 2),
            Err(i) => (i.max(1) - 1).min(self.xs.len() - 2),
        };
        let h = self.xs[i + 1] - self.xs[i];
        let t = (x - self.xs[i]) / h;
        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;
        h00 * self.ys[i] + h10 * h * self.tangents[i] + h01 * self.ys[i + 1] + h11 * h * self.tangents[i + 1]
    }

    pub fn total(&self) -> f64 {
        *self.ys.last().unwrap()
    }
}

/// Build Λ from the current β-ladder (length N, strictly decreasing) and
/// the rejection vector (length N-1, one entry per adjacent pair).
pub fn communication_barrier(ladder: &[f64], rejections: &[f64]) -> Result<MonotoneSpline> {
    let n = ladder.len();
    if n < 2 {
        return Err(McmcError::invalid("ladder must contain at least two replicas"));
    }
    if rejections.len() != n - 1 {
        return Err(McmcError::invalid("rejection vector must have length N-1"));
    }
    for w in ladder.windows(2) {
        if !(w[0] > w[1]) {
            return Err(McmcError::invalid("β-ladder must be strictly decreasing"));
        }
    }

    let xs: Vec<f64> = ladder.iter().rev().copied().collect();
    let mut ys = Vec::with_capacity(n);
    ys.push(0.0);
    let mut running = 0.0;
    for r in rejections.iter() {
        if *r < 0.0 {
            return Err(McmcError::invalid("rejection entries must be non-negative"));
        }
        running += *r;
        ys.push(running);
    }
    if !running.is_finite() {
        return Err(McmcError::numeric("cumulative rejection is non-finite"));
    }
    MonotoneSpline::new(xs, ys)
}

/// Solve Λ(β) = target for β ∈ [lower, upper] by bisection, to
/// [`crate::BISECTION_TOLERANCE`].
fn bisect(spline: &MonotoneSpline, target: f64, mut lower: f64, mut upper: f64) -> Result<f64> {
    let mut f_lower = spline.eval(lower) - target;
    let f_upper = spline.eval(upper) - target;
    if f_lower.signum() == f_upper.signum() && f_lower != 0.0 && f_upper != 0.0 {
        return Err(McmcError::numeric("bisection failed to bracket a root"));
    }
    for _ in 0..crate::BISECTION_MAX_ITERS {
        if (upper - lower) <= crate::BISECTION_TOLERANCE {
            break;
        }
        let mid = 0.5 * (lower + upper);
        let f_mid = spline.eval(mid) - target;
        if f_mid == 0.0 {
            return Ok(mid);
        }
        if f_mid.signum() == f_lower.signum() {
            lower = mid;
            f_lower = f_mid;
        } else {
            upper = mid;
        }
    }
    Ok(0.5 * (lower + upper))
}

/// Update the β-ladder (§4.F): equidistribute cumulative communication
/// barrier across replicas. Returns the input ladder unchanged when
/// `Λ_total == 0` (no communication barrier to equidistribute).
///
/// Rung `i` (0-indexed, `i=0` is β=1) targets `Λ_total*(n-1-i)/(n-1)`: since
/// Λ is non-decreasing in β and β falls as `i` grows, the target the rung
/// must hit falls too. Each rung is then searched for in `[0, new_ladder[i-1]]`
/// — the previous rung's β is a valid upper bound both because the ladder
/// must stay strictly decreasing and because `Λ(new_ladder[i-1])` equals the
/// previous (larger) target, which always dominates the current one.
pub fn update_betas(ladder: &[f64], rejections: &[f64]) -> Result<Vec<f64>> {
    let n = ladder.len();
    let spline = communication_barrier(ladder, rejections)?;
    let total = spline.total();
    if !total.is_finite() {
        return Err(McmcError::numeric("Λ_total is non-finite"));
    }
    if total == 0.0 {
        return Ok(ladder.to_vec());
    }

    let mut new_ladder = vec![0.0; n];
    new_ladder[0] = 1.0;
    new_ladder[n - 1] = 0.0;
    for i in 1..n - 1 {
        let target = total * (n - 1 - i) as f64 / (n - 1) as f64;
        new_ladder[i] = bisect(&spline, target, 0.0, new_ladder[i - 1])?;
    }
    Ok(new_ladder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barrier_endpoints_match_spec() {
        let ladder = vec![1.0, 0.66, 0.33, 0.0];
        let rejections = vec![0.2, 0.4, 0.4];
        let spline = communication_barrier(&ladder, &rejections).unwrap();
        assert!((spline.eval(0.0)).abs() < 1e-9);
        assert!((spline.eval(1.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn barrier_is_monotone_on_a_dense_grid() {
        let ladder = vec![1.0, 0.8, 0.5, 0.2, 0.0];
        let rejections = vec![0.1, 0.05, 0.3, 0.02];
        let spline = communication_barrier(&ladder, &rejections).unwrap();
        let mut previous = spline.eval(0.0);
        for step in 1..=1000 {
            let x = step as f64 / 1000.0;
            let value = spline.eval(x);
            assert!(value + 1e-9 >= previous, "Λ decreased at x={x}");
            previous = value;
        }
    }

    #[test]
    fn update_betas_equidistributes_cumulative_barrier() {
        let ladder = vec![1.0, 0.66, 0.33, 0.0];
        let rejections = vec![0.2, 0.4, 0.4];
        let updated = update_betas(&ladder, &rejections).unwrap();
        assert_eq!(updated[0], 1.0);
        assert_eq!(*updated.last().unwrap(), 0.0);
        assert!(updated.windows(2).all(|w| w[0] > w[1]));

        let spline = communication_barrier(&ladder, &rejections).unwrap();
        let total = spline.total();
        let n = updated.len();
        for (i, &beta) in updated.iter().enumerate() {
            let target = total * (n - 1 - i) as f64 / (n - 1) as f64;
            assert!((spline.eval(beta) - target).abs() <= 1e-6);
        }
    }

    #[test]
    fn zero_rejections_is_a_fixed_point() {
        let ladder = vec![1.0, 0.5, 0.0];
        let rejections = vec![0.0, 0.0];
        let updated = update_betas(&ladder, &rejections).unwrap();
        assert_eq!(updated, ladder);
    }

    #[test]
    fn equidistributed_rejections_are_a_fixed_point() {
        // rejections already spaced so the ladder is its own equidistributed solution
        let ladder = vec![1.0, 0.5, 0.0];
        let rejections = vec![0.3, 0.3];
        let once = update_betas(&ladder, &rejections).unwrap();
        let twice = update_betas(&once, &rejections).unwrap();
        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
