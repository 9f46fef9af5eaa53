//! Natural cubic spline interpolation over a monotone radius array.
//!
//! The interpolated value at radius `r` is expressed as a weighted sum of
//! the node values, so spline interpolation composes with horizontal
//! interpolation exactly like the linear case. For the natural spline the
//! second derivatives are a linear function of the node values, which
//! makes such per-node weights exact: they are obtained from one
//! tridiagonal solve against the factorised interior system.

/// The factorised interior system of a natural cubic spline.
///
/// Depends only on the node radii, which never change over a profile's
/// lifetime, so this is computed once and cached.
#[derive(Debug, Clone)]
pub(crate) struct SplineFactors {
    x: Vec<f64>,
    h: Vec<f64>,
    /// Pivots of the Thomas factorisation of the interior system.
    pivot: Vec<f64>,
    /// Scaled superdiagonal of the factorisation.
    upper: Vec<f64>,
}

impl SplineFactors {
    /// Factorises the system for the given radii. Returns `None` when
    /// fewer than two nodes are given or the radii are not strictly
    /// ascending; callers fall back to linear interpolation then.
    pub(crate) fn new(radii: &[f32]) -> Option<Self> {
        let n = radii.len();
        if n < 2 {
            return None;
        }
        let x: Vec<f64> = radii.iter().map(|&r| f64::from(r)).collect();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        if h.iter().any(|&d| d <= 0.0) {
            return None;
        }

        // Interior nodes 1..n-1; natural boundary conditions pin the
        // second derivative to zero at both ends.
        let k = n - 2;
        let mut pivot = vec![0.0; k];
        let mut upper = vec![0.0; k.saturating_sub(1)];
        for i in 0..k {
            let d = 2.0 * (h[i] + h[i + 1]);
            pivot[i] = if i == 0 {
                d
            } else {
                d - h[i] * upper[i - 1]
            };
            if i + 1 < k {
                upper[i] = h[i + 1] / pivot[i];
            }
        }

        Some(Self { x, h, pivot, upper })
    }

    /// Index `i` of the segment `[x[i], x[i+1]]` bracketing `r`, clamped
    /// to the first and last segments.
    fn segment(&self, r: f64) -> usize {
        let n = self.x.len();
        match self.x.partition_point(|&x| x <= r) {
            0 => 0,
            p if p >= n => n - 2,
            p => p - 1,
        }
    }

    /// Fills `weights` (resized to the node count) so that the spline
    /// value at `r` is `Σ weights[j] * y[j]` for any node values `y`.
    /// The weights sum to 1. `r` outside the node range is clamped.
    pub(crate) fn weights(&self, r: f64, weights: &mut Vec<f64>) {
        let n = self.x.len();
        weights.clear();
        weights.resize(n, 0.0);

        let r = r.clamp(self.x[0], self.x[n - 1]);
        let i = self.segment(r);
        let h = self.h[i];
        let a = (self.x[i + 1] - r) / h;
        let b = (r - self.x[i]) / h;
        weights[i] = a;
        weights[i + 1] = b;

        let k = n - 2;
        if k == 0 {
            return;
        }

        // The cubic correction is c·m[i] + d·m[i+1], and the interior
        // second derivatives m solve T m = S y. Propagating c and d back
        // through T and S yields the per-node weight contributions.
        let c = (a * a * a - a) * h * h / 6.0;
        let d = (b * b * b - b) * h * h / 6.0;
        let mut g = vec![0.0; k];
        if i >= 1 {
            g[i - 1] = c;
        }
        if i + 1 <= k {
            g[i] = d;
        }

        // T is symmetric, so the transposed solve reuses the factors.
        let mut z = g;
        z[0] /= self.pivot[0];
        for j in 1..k {
            z[j] = (z[j] - self.h[j] * z[j - 1]) / self.pivot[j];
        }
        for j in (0..k - 1).rev() {
            z[j] -= self.upper[j] * z[j + 1];
        }

        // Apply Sᵀ: row j of S couples nodes j, j+1, j+2.
        for j in 0..k {
            let inv0 = 6.0 / self.h[j];
            let inv1 = 6.0 / self.h[j + 1];
            weights[j] += z[j] * inv0;
            weights[j + 1] -= z[j] * (inv0 + inv1);
            weights[j + 2] += z[j] * inv1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Classic natural-spline evaluation via explicitly computed second
    /// derivatives, used to cross-check the weight formulation.
    fn spline_value(x: &[f64], y: &[f64], r: f64) -> f64 {
        let n = x.len();
        let mut m = vec![0.0; n];
        let mut u = vec![0.0; n];
        for i in 1..n - 1 {
            let sig = (x[i] - x[i - 1]) / (x[i + 1] - x[i - 1]);
            let p = sig * m[i - 1] + 2.0;
            m[i] = (sig - 1.0) / p;
            u[i] = (y[i + 1] - y[i]) / (x[i + 1] - x[i]) - (y[i] - y[i - 1]) / (x[i] - x[i - 1]);
            u[i] = (6.0 * u[i] / (x[i + 1] - x[i - 1]) - sig * u[i - 1]) / p;
        }
        m[n - 1] = 0.0;
        for i in (0..n - 1).rev() {
            m[i] = m[i] * m[i + 1] + u[i];
        }

        let i = match x.partition_point(|&v| v <= r) {
            0 => 0,
            p if p >= n => n - 2,
            p => p - 1,
        };
        let h = x[i + 1] - x[i];
        let a = (x[i + 1] - r) / h;
        let b = (r - x[i]) / h;
        a * y[i] + b * y[i + 1] + ((a * a * a - a) * m[i] + (b * b * b - b) * m[i + 1]) * h * h / 6.0
    }

    #[test]
    fn rejects_short_or_unordered_radii() {
        assert!(SplineFactors::new(&[5.0]).is_none());
        assert!(SplineFactors::new(&[5.0, 5.0, 6.0]).is_none());
        assert!(SplineFactors::new(&[5.0, 4.0]).is_none());
        assert!(SplineFactors::new(&[5.0, 6.0]).is_some());
    }

    #[test]
    fn two_nodes_degenerate_to_linear() {
        let factors = SplineFactors::new(&[100.0, 200.0]).unwrap();
        let mut w = Vec::new();
        factors.weights(125.0, &mut w);
        assert_eq!(w.len(), 2);
        assert_relative_eq!(w[0], 0.75, epsilon = 1e-12);
        assert_relative_eq!(w[1], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn weights_sum_to_one_and_hit_nodes() {
        let radii = [6000.0, 6100.0, 6250.0, 6300.0, 6371.0];
        let factors = SplineFactors::new(&radii).unwrap();
        let mut w = Vec::new();
        for r in [6000.0, 6050.0, 6130.0, 6260.0, 6371.0] {
            factors.weights(r, &mut w);
            assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
        for (i, &r) in radii.iter().enumerate() {
            factors.weights(f64::from(r), &mut w);
            for (j, &wj) in w.iter().enumerate() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(wj, expected, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn reproduces_linear_data_exactly() {
        let radii = [10.0f32, 30.0, 35.0, 80.0, 100.0];
        let factors = SplineFactors::new(&radii).unwrap();
        let mut w = Vec::new();
        for r in [10.0, 22.0, 33.0, 50.0, 99.0] {
            factors.weights(r, &mut w);
            let value: f64 = w
                .iter()
                .zip(radii.iter())
                .map(|(&wj, &x)| wj * (3.0 * f64::from(x) - 7.0))
                .sum();
            assert_relative_eq!(value, 3.0 * r - 7.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn matches_second_derivative_evaluation() {
        let x: Vec<f64> = vec![0.0, 1.0, 2.5, 4.0, 7.0, 9.0];
        let y: Vec<f64> = vec![1.0, -2.0, 0.5, 8.0, 3.0, 3.5];
        let radii: Vec<f32> = x.iter().map(|&v| v as f32).collect();
        let factors = SplineFactors::new(&radii).unwrap();
        let mut w = Vec::new();
        for r in [0.0, 0.4, 1.7, 3.2, 5.5, 8.9, 9.0] {
            factors.weights(r, &mut w);
            let value: f64 = w.iter().zip(y.iter()).map(|(&wj, &yj)| wj * yj).sum();
            assert_relative_eq!(value, spline_value(&x, &y, r), epsilon = 1e-9);
        }
    }

    #[test]
    fn clamps_outside_node_range() {
        let factors = SplineFactors::new(&[100.0, 150.0, 200.0]).unwrap();
        let mut below = Vec::new();
        let mut bottom = Vec::new();
        factors.weights(50.0, &mut below);
        factors.weights(100.0, &mut bottom);
        assert_eq!(below, bottom);
        let mut above = Vec::new();
        let mut top = Vec::new();
        factors.weights(300.0, &mut above);
        factors.weights(200.0, &mut top);
        assert_eq!(above, top);
    }
}
