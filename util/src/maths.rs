//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value in the range [-pi, pi] to [0, 2pi]
pub fn map_pi_to_2pi<T>(value: T) -> T
where
    T: Float
{
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    if value < T::zero() {
        tau_t + value
    }
    else {
        value
    }
}

/// Rotate a 2D vector by the given angle (right hand rule about +Z).
pub fn rotate_2d<T>(x: T, y: T, angle_rad: T) -> (T, T)
where
    T: Float
{
    let (s, c) = angle_rad.sin_cos();
    (x * c - y * s, x * s + y * c)
}

/// Linearly interpolate (or extrapolate) the line through two points at `x`.
///
/// Returns `None` if the two points share the same abscissa.
pub fn interp_linear<T>(p0: (T, T), p1: (T, T), x: T) -> Option<T>
where
    T: Float
{
    let dx = p1.0 - p0.0;
    if dx == T::zero() {
        return None
    }

    Some(p0.1 + (x - p0.0) * (p1.1 - p0.1) / dx)
}

/// An interpolating quadratic spline.
///
/// The spline is a C1 piecewise quadratic passing through every sample. Its
/// breakpoints sit halfway between consecutive samples, except for the first
/// and last midpoints which are left out so that the two end pieces each
/// span three samples. Evaluating outside of the sampled range extrapolates
/// the end pieces.
#[derive(Debug, Clone)]
pub struct QuadSpline<T> {
    /// Clamped knot vector, `n + 3` long for `n` samples
    knots: Vec<T>,

    /// B-spline coefficients, one per sample
    coeffs: Vec<T>,
}

impl<T> QuadSpline<T>
where
    T: Float
{
    /// Fit the spline through the samples `(xs, ys)`.
    ///
    /// Returns `None` if there are fewer than three samples, the slices differ
    /// in length, or the abscissae are not strictly increasing.
    pub fn fit(xs: &[T], ys: &[T]) -> Option<Self> {
        let n = xs.len();
        if n < 3 || ys.len() != n {
            return None
        }
        if xs.windows(2).any(|w| !(w[1] > w[0])) {
            return None
        }

        let two = T::one() + T::one();

        let mut knots = Vec::with_capacity(n + 3);
        knots.extend_from_slice(&[xs[0]; 3]);
        knots.extend(xs[1..n - 1].windows(2).map(|w| (w[0] + w[1]) / two));
        knots.extend_from_slice(&[xs[n - 1]; 3]);

        let mut spline = Self {
            knots,
            coeffs: Vec::new()
        };

        // Collocation matrix, banded with at most two diagonals either side
        // of the main one. Row i is stored as the five entries from column
        // i - 2 to i + 2.
        let mut band = vec![[T::zero(); 5]; n];
        let mut rhs = ys.to_vec();

        for (i, &x) in xs.iter().enumerate() {
            let span = spline.span(x);
            let basis = spline.basis(span, x);
            // Samples closer together than floating point midpoints can
            // separate would push the row out of the band.
            if span < i || span > i + 2 {
                return None
            }
            for (r, &b) in basis.iter().enumerate() {
                let col = span - 2 + r;
                band[i][col + 2 - i] = b;
            }
        }

        // The collocation matrix of a B-spline basis is totally positive, so
        // elimination without pivoting is stable.
        for k in 0..n {
            let pivot = band[k][2];
            if pivot == T::zero() {
                return None
            }

            for i in (k + 1)..(k + 3).min(n) {
                let f = band[i][k + 2 - i] / pivot;
                if f == T::zero() {
                    continue
                }
                for j in k..(k + 3).min(n) {
                    band[i][j + 2 - i] = band[i][j + 2 - i] - f * band[k][j + 2 - k];
                }
                rhs[i] = rhs[i] - f * rhs[k];
            }
        }

        let mut coeffs = vec![T::zero(); n];
        for i in (0..n).rev() {
            let mut acc = rhs[i];
            for j in (i + 1)..(i + 3).min(n) {
                acc = acc - band[i][j + 2 - i] * coeffs[j];
            }
            coeffs[i] = acc / band[i][2];
        }

        spline.coeffs = coeffs;
        Some(spline)
    }

    /// Evaluate the spline at `x`.
    pub fn eval(&self, x: T) -> T {
        let span = self.span(x);
        let basis = self.basis(span, x);

        basis
            .iter()
            .zip(self.coeffs[span - 2..=span].iter())
            .fold(T::zero(), |acc, (&b, &c)| acc + b * c)
    }

    /// Index of the knot span containing `x`, clamped to the first and last
    /// spans when `x` is outside of the knots.
    fn span(&self, x: T) -> usize {
        let last = self.knots.len() - 4;
        let mut span = 2;
        while span < last && self.knots[span + 1] <= x {
            span += 1;
        }
        span
    }

    /// The three basis functions which are non-zero on `span`, evaluated at
    /// `x` (Cox-de Boor).
    fn basis(&self, span: usize, x: T) -> [T; 3] {
        let u = &self.knots;
        let mut n = [T::one(), T::zero(), T::zero()];
        let mut left = [T::zero(); 3];
        let mut right = [T::zero(); 3];

        for j in 1..3 {
            left[j] = x - u[span + 1 - j];
            right[j] = u[span + j] - x;

            let mut saved = T::zero();
            for r in 0..j {
                let temp = n[r] / (right[r + 1] + left[j - r]);
                n[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            n[j] = saved;
        }

        n
    }
}

/// Quadratic spline interpolation of the samples `(xs, ys)` at `x`.
///
/// See [`QuadSpline`], returns `None` if the spline can't be fitted.
pub fn interp_quadratic<T>(xs: &[T], ys: &[T], x: T) -> Option<T>
where
    T: Float
{
    QuadSpline::fit(xs, ys).map(|s| s.eval(x))
}
