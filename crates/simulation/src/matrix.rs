//! Dense symmetric matrix routines for correlation matrices.
//!
//! Matrices are `n × n`, row-major, in a flat `&[f64]`.

use serde::{Deserialize, Serialize};

const JACOBI_MAX_SWEEPS: usize = 64;
const JACOBI_TOLERANCE: f64 = 1e-24;
const JITTER_ATTEMPTS: u32 = 12;

/// Record of the correction applied to a correlation matrix that was not
/// positive definite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regularization {
    /// Smallest eigenvalue of the matrix as supplied.
    pub min_eigenvalue: f64,
    /// Eigenvalues raised to the floor.
    pub clipped_eigenvalues: usize,
    /// Largest absolute change to any element.
    pub max_adjustment: f64,
    /// Diagonal jitter needed after clipping; usually 0.
    pub jitter: f64,
}

/// Lower Cholesky factor of a (possibly repaired) correlation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Factorization {
    pub n: usize,
    /// Row-major lower-triangular factor `L` with `L·Lᵀ = C`.
    pub lower: Vec<f64>,
    /// Present when the input had to be repaired.
    pub regularization: Option<Regularization>,
}

impl Factorization {
    /// Factors a correlation matrix, repairing it first if Cholesky fails.
    ///
    /// Repair clips eigenvalues to at least `eigen_floor`, rescales back to a
    /// unit diagonal and, if rounding still defeats Cholesky, blends toward
    /// the identity. The identity itself is the final fallback, so this
    /// always returns a usable factor.
    #[must_use]
    pub fn new(matrix: &[f64], n: usize, eigen_floor: f64) -> Self {
        if let Some(lower) = cholesky(matrix, n) {
            return Self {
                n,
                lower,
                regularization: None,
            };
        }

        let (eigenvalues, _) = symmetric_eigen(matrix, n);
        let min_eigenvalue = eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
        let clipped_eigenvalues = eigenvalues.iter().filter(|&&v| v < eigen_floor).count();

        let repaired = nearest_correlation(matrix, n, eigen_floor);
        let mut jitter = 0.0;
        let mut delta = eigen_floor;
        for _ in 0..JITTER_ATTEMPTS {
            let candidate = if jitter > 0.0 {
                shrink_toward_identity(&repaired, n, jitter)
            } else {
                repaired.clone()
            };
            if let Some(lower) = cholesky(&candidate, n) {
                return Self {
                    n,
                    lower,
                    regularization: Some(Regularization {
                        min_eigenvalue,
                        clipped_eigenvalues,
                        max_adjustment: max_abs_diff(matrix, &candidate),
                        jitter,
                    }),
                };
            }
            jitter = delta;
            delta *= 10.0;
        }

        let identity = identity(n);
        Self {
            n,
            lower: identity.clone(),
            regularization: Some(Regularization {
                min_eigenvalue,
                clipped_eigenvalues,
                max_adjustment: max_abs_diff(matrix, &identity),
                jitter: 1.0,
            }),
        }
    }

    /// Row `i` of `L` applied to `z`: the i-th correlated normal.
    #[must_use]
    pub fn correlate(&self, i: usize, z: &[f64]) -> f64 {
        let row = &self.lower[i * self.n..i * self.n + i + 1];
        row.iter().zip(z).map(|(l, z)| l * z).sum()
    }
}

/// Cholesky decomposition; `None` if the matrix is not positive definite.
#[must_use]
pub fn cholesky(a: &[f64], n: usize) -> Option<Vec<f64>> {
    let mut l = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let dot: f64 = (0..j).map(|k| l[i * n + k] * l[j * n + k]).sum();
            if i == j {
                let d = a[i * n + i] - dot;
                if !d.is_finite() || d <= 0.0 {
                    return None;
                }
                l[i * n + j] = d.sqrt();
            } else {
                l[i * n + j] = (a[i * n + j] - dot) / l[j * n + j];
            }
        }
    }
    Some(l)
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns `(eigenvalues, eigenvectors)` with eigenvector `k` stored in
/// column `k` of the row-major result.
#[must_use]
pub fn symmetric_eigen(matrix: &[f64], n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut a = matrix.to_vec();
    let mut v = identity(n);

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
            .map(|(i, j)| a[i * n + j] * a[i * n + j])
            .sum();
        if off < JACOBI_TOLERANCE {
            break;
        }

        for p in 0..n {
            for q in p + 1..n {
                let apq = a[p * n + q];
                if apq.abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[q * n + q] - a[p * n + p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let (akp, akq) = (a[k * n + p], a[k * n + q]);
                    a[k * n + p] = c * akp - s * akq;
                    a[k * n + q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[p * n + k], a[q * n + k]);
                    a[p * n + k] = c * apk - s * aqk;
                    a[q * n + k] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let (vkp, vkq) = (v[k * n + p], v[k * n + q]);
                    v[k * n + p] = c * vkp - s * vkq;
                    v[k * n + q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let eigenvalues = (0..n).map(|i| a[i * n + i]).collect();
    (eigenvalues, v)
}

/// Nearest-correlation approximation by eigenvalue clipping.
///
/// Eigenvalues below `floor` are raised to it, the matrix is rebuilt and then
/// rescaled so the diagonal is exactly 1.
#[must_use]
pub fn nearest_correlation(matrix: &[f64], n: usize, floor: f64) -> Vec<f64> {
    let (eigenvalues, v) = symmetric_eigen(matrix, n);
    let clipped: Vec<f64> = eigenvalues.iter().map(|&e| e.max(floor)).collect();

    let mut out = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let value: f64 = (0..n).map(|k| v[i * n + k] * clipped[k] * v[j * n + k]).sum();
            out[i * n + j] = value;
            out[j * n + i] = value;
        }
    }

    let scale: Vec<f64> = (0..n).map(|i| out[i * n + i].max(f64::MIN_POSITIVE).sqrt()).collect();
    for i in 0..n {
        for j in 0..n {
            out[i * n + j] = if i == j {
                1.0
            } else {
                (out[i * n + j] / (scale[i] * scale[j])).clamp(-1.0, 1.0)
            };
        }
    }
    out
}

fn shrink_toward_identity(matrix: &[f64], n: usize, weight: f64) -> Vec<f64> {
    let mut out = matrix.to_vec();
    for i in 0..n {
        for j in 0..n {
            if i != j {
                out[i * n + j] /= 1.0 + weight;
            }
        }
    }
    out
}

fn identity(n: usize) -> Vec<f64> {
    let mut m = vec![0.0; n * n];
    for i in 0..n {
        m[i * n + i] = 1.0;
    }
    m
}

fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_psd() -> Vec<f64> {
        vec![
            1.0, 0.9, 0.9, //
            0.9, 1.0, -0.9, //
            0.9, -0.9, 1.0,
        ]
    }

    #[test]
    fn cholesky_two_by_two() {
        let l = cholesky(&[1.0, 0.6, 0.6, 1.0], 2).unwrap();
        assert!((l[0] - 1.0).abs() < 1e-12);
        assert_eq!(l[1], 0.0);
        assert!((l[2] - 0.6).abs() < 1e-12);
        assert!((l[3] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn cholesky_rejects_indefinite() {
        assert!(cholesky(&non_psd(), 3).is_none());
        assert!(cholesky(&[1.0, 1.0, 1.0, 1.0], 2).is_none());
    }

    #[test]
    fn jacobi_eigenvalues() {
        let (mut values, vectors) = symmetric_eigen(&[2.0, 1.0, 1.0, 2.0], 2);
        values.sort_by(f64::total_cmp);
        assert!((values[0] - 1.0).abs() < 1e-10);
        assert!((values[1] - 3.0).abs() < 1e-10);
        // Columns are unit length.
        for k in 0..2 {
            let norm: f64 = (0..2).map(|i| vectors[i * 2 + k].powi(2)).sum();
            assert!((norm - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn jacobi_detects_negative_eigenvalue() {
        let (values, _) = symmetric_eigen(&non_psd(), 3);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        assert!(min < 0.0);
        let trace: f64 = values.iter().sum();
        assert!((trace - 3.0).abs() < 1e-9);
    }

    #[test]
    fn nearest_correlation_is_valid() {
        let fixed = nearest_correlation(&non_psd(), 3, 1e-6);
        for i in 0..3 {
            assert_eq!(fixed[i * 3 + i], 1.0);
            for j in 0..3 {
                assert!((fixed[i * 3 + j] - fixed[j * 3 + i]).abs() < 1e-12);
            }
        }
        let (values, _) = symmetric_eigen(&fixed, 3);
        assert!(values.iter().all(|&v| v > -1e-9));
    }

    #[test]
    fn factorization_passes_valid_matrix_through() {
        let f = Factorization::new(&[1.0, 0.3, 0.3, 1.0], 2, 1e-6);
        assert!(f.regularization.is_none());
        assert!((f.correlate(1, &[1.0, 0.0]) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn factorization_repairs_invalid_matrix() {
        let f = Factorization::new(&non_psd(), 3, 1e-6);
        let reg = f.regularization.expect("should be regularized");
        assert!(reg.min_eigenvalue < 0.0);
        assert!(reg.clipped_eigenvalues >= 1);
        assert!(reg.max_adjustment > 0.05);
    }

    #[test]
    fn factorization_handles_singular_matrix_with_small_adjustment() {
        let f = Factorization::new(&[1.0, 1.0, 1.0, 1.0], 2, 1e-6);
        let reg = f.regularization.expect("singular matrix needs repair");
        assert!(reg.max_adjustment < 1e-3);
    }
}
