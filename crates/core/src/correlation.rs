//! Sparse pairwise correlation between legs.
//!
//! Pairs that are not present are treated as independent (coefficient 0).
//! The matrix is not required to be positive semi-definite; the simulator
//! regularizes whatever submatrix a slip needs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ParlayError, Result};
use crate::leg::LegId;

/// One stored correlation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    pub a: LegId,
    pub b: LegId,
    pub rho: f64,
}

/// Symmetric mapping from unordered leg-id pairs to a coefficient in [-1, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CorrelationEntry>", into = "Vec<CorrelationEntry>")]
pub struct CorrelationMatrix {
    pairs: HashMap<(LegId, LegId), f64>,
}

fn key(a: &LegId, b: &LegId) -> (LegId, LegId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

impl CorrelationMatrix {
    /// Creates an empty matrix (all legs independent).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the correlation for an unordered pair, replacing any previous value.
    ///
    /// # Errors
    /// Returns [`ParlayError::InvalidCorrelation`] if `rho` is outside [-1, 1],
    /// not finite, or `a == b`.
    pub fn insert(&mut self, a: impl Into<LegId>, b: impl Into<LegId>, rho: f64) -> Result<()> {
        let a = a.into();
        let b = b.into();
        if a == b || !rho.is_finite() || !(-1.0..=1.0).contains(&rho) {
            return Err(ParlayError::InvalidCorrelation {
                a: a.to_string(),
                b: b.to_string(),
                value: rho,
            });
        }
        self.pairs.insert(key(&a, &b), rho);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    ///
    /// # Errors
    /// Same as [`insert`](Self::insert).
    pub fn with(mut self, a: impl Into<LegId>, b: impl Into<LegId>, rho: f64) -> Result<Self> {
        self.insert(a, b, rho)?;
        Ok(self)
    }

    /// Correlation between two legs; 1 on the diagonal, 0 when unspecified.
    #[must_use]
    pub fn get(&self, a: &LegId, b: &LegId) -> f64 {
        if a == b {
            return 1.0;
        }
        self.pairs.get(&key(a, b)).copied().unwrap_or(0.0)
    }

    /// Number of explicitly stored pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates over stored pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&LegId, &LegId, f64)> {
        self.pairs.iter().map(|((a, b), rho)| (a, b, *rho))
    }

    /// Dense row-major `n × n` submatrix for `ids`, in the given order.
    #[must_use]
    pub fn submatrix(&self, ids: &[&LegId]) -> Vec<f64> {
        let n = ids.len();
        let mut out = vec![0.0; n * n];
        for i in 0..n {
            out[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let rho = self.get(ids[i], ids[j]);
                out[i * n + j] = rho;
                out[j * n + i] = rho;
            }
        }
        out
    }
}

impl TryFrom<Vec<CorrelationEntry>> for CorrelationMatrix {
    type Error = ParlayError;

    fn try_from(entries: Vec<CorrelationEntry>) -> Result<Self> {
        let mut matrix = Self::new();
        for entry in entries {
            matrix.insert(entry.a, entry.b, entry.rho)?;
        }
        Ok(matrix)
    }
}

impl From<CorrelationMatrix> for Vec<CorrelationEntry> {
    fn from(matrix: CorrelationMatrix) -> Self {
        let mut entries: Vec<CorrelationEntry> = matrix
            .pairs
            .into_iter()
            .map(|((a, b), rho)| CorrelationEntry { a, b, rho })
            .collect();
        entries.sort_by(|x, y| (&x.a, &x.b).cmp(&(&y.a, &y.b)));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_symmetric() {
        let m = CorrelationMatrix::new().with("a", "b", 0.4).unwrap();
        assert!((m.get(&"a".into(), &"b".into()) - 0.4).abs() < 1e-12);
        assert!((m.get(&"b".into(), &"a".into()) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn missing_pair_defaults_to_zero() {
        let m = CorrelationMatrix::new();
        assert_eq!(m.get(&"a".into(), &"z".into()), 0.0);
        assert_eq!(m.get(&"a".into(), &"a".into()), 1.0);
    }

    #[test]
    fn rejects_out_of_range_and_self_pairs() {
        let mut m = CorrelationMatrix::new();
        assert!(m.insert("a", "b", 1.2).is_err());
        assert!(m.insert("a", "b", f64::NAN).is_err());
        assert!(m.insert("a", "a", 0.5).is_err());
        assert!(m.is_empty());
    }

    #[test]
    fn reinsert_overwrites_either_order() {
        let m = CorrelationMatrix::new()
            .with("a", "b", 0.4)
            .unwrap()
            .with("b", "a", -0.2)
            .unwrap();
        assert_eq!(m.len(), 1);
        assert!((m.get(&"a".into(), &"b".into()) + 0.2).abs() < 1e-12);
    }

    #[test]
    fn submatrix_is_dense_and_symmetric() {
        let m = CorrelationMatrix::new()
            .with("a", "c", 0.3)
            .unwrap();
        let ids: Vec<LegId> = vec!["a".into(), "b".into(), "c".into()];
        let refs: Vec<&LegId> = ids.iter().collect();
        let sub = m.submatrix(&refs);
        assert_eq!(sub, vec![1.0, 0.0, 0.3, 0.0, 1.0, 0.0, 0.3, 0.0, 1.0]);
    }

    #[test]
    fn serde_round_trip_through_entries() {
        let m = CorrelationMatrix::new().with("x", "y", 0.25).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        let back: CorrelationMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(m, back);
        assert!(serde_json::from_str::<CorrelationMatrix>(r#"[{"a":"x","b":"y","rho":3.0}]"#).is_err());
    }
}
