//! The validated input bundle for one optimization request.
//!
//! A [`LegPool`] owns the legs, their predictions and a dense copy of the
//! correlation coefficients between them, addressed by pool index. It is built
//! once per request and shared read-only by every worker thread.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::correlation::CorrelationMatrix;
use crate::error::{ParlayError, Result};
use crate::leg::{Leg, LegId};
use crate::prediction::Prediction;
use crate::slip::{CandidateSlip, SlipLeg};
use crate::traits::{CorrelationSource, LegCatalog, PredictionSource};

#[derive(Debug, Clone)]
pub struct LegPool {
    legs: Vec<Arc<Leg>>,
    predictions: Vec<Prediction>,
    index: HashMap<LegId, usize>,
    correlation: Vec<f64>,
    matrix: CorrelationMatrix,
}

impl LegPool {
    /// Builds a pool, checking that ids are unique, every leg has a
    /// prediction and every correlation pair references a pooled leg.
    ///
    /// # Errors
    /// Returns the first [`ParlayError`] found.
    pub fn new(
        legs: Vec<Leg>,
        predictions: &HashMap<LegId, Prediction>,
        correlation: CorrelationMatrix,
    ) -> Result<Self> {
        let mut index = HashMap::with_capacity(legs.len());
        let mut pooled = Vec::with_capacity(legs.len());
        let mut preds = Vec::with_capacity(legs.len());

        for leg in legs {
            if index.contains_key(leg.id()) {
                return Err(ParlayError::DuplicateLeg(leg.id().to_string()));
            }
            let prediction = predictions
                .get(leg.id())
                .copied()
                .ok_or_else(|| ParlayError::MissingPrediction(leg.id().to_string()))?;
            index.insert(leg.id().clone(), pooled.len());
            pooled.push(Arc::new(leg));
            preds.push(prediction);
        }

        for (a, b, _) in correlation.iter() {
            for id in [a, b] {
                if !index.contains_key(id) {
                    return Err(ParlayError::UnknownLeg(id.to_string()));
                }
            }
        }

        let n = pooled.len();
        let mut dense = vec![0.0; n * n];
        for i in 0..n {
            dense[i * n + i] = 1.0;
        }
        for (a, b, rho) in correlation.iter() {
            let (i, j) = (index[a], index[b]);
            dense[i * n + j] = rho;
            dense[j * n + i] = rho;
        }

        debug!(legs = n, pairs = correlation.len(), "Built leg pool");

        Ok(Self {
            legs: pooled,
            predictions: preds,
            index,
            correlation: dense,
            matrix: correlation,
        })
    }

    /// Builds a pool by querying the three external collaborators.
    ///
    /// # Errors
    /// Returns an error if any source fails or the combined data is invalid.
    pub fn from_sources(
        catalog: &dyn LegCatalog,
        predictions: &dyn PredictionSource,
        correlations: &dyn CorrelationSource,
    ) -> anyhow::Result<Self> {
        let legs = catalog.legs()?;
        let ids: Vec<LegId> = legs.iter().map(|l| l.id().clone()).collect();
        let preds = predictions.predictions(&ids)?;
        let matrix = correlations.correlations(&ids)?;
        Ok(Self::new(legs, &preds, matrix)?)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.legs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Leg at pool index `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of bounds.
    #[must_use]
    pub fn leg(&self, i: usize) -> &Arc<Leg> {
        &self.legs[i]
    }

    /// Prediction at pool index `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of bounds.
    #[must_use]
    pub fn prediction(&self, i: usize) -> Prediction {
        self.predictions[i]
    }

    /// Correlation between pool indices `i` and `j`.
    #[must_use]
    pub fn correlation(&self, i: usize, j: usize) -> f64 {
        self.correlation[i * self.legs.len() + j]
    }

    /// The sparse matrix the pool was built from.
    #[must_use]
    pub fn correlation_matrix(&self) -> &CorrelationMatrix {
        &self.matrix
    }

    #[must_use]
    pub fn index_of(&self, id: &LegId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn legs(&self) -> impl Iterator<Item = &Arc<Leg>> {
        self.legs.iter()
    }

    /// Dense row-major submatrix for the given pool indices.
    #[must_use]
    pub fn submatrix(&self, indices: &[usize]) -> Vec<f64> {
        let n = indices.len();
        let mut out = vec![0.0; n * n];
        for (r, &i) in indices.iter().enumerate() {
            for (c, &j) in indices.iter().enumerate() {
                out[r * n + c] = self.correlation(i, j);
            }
        }
        out
    }

    /// Slip legs for the given pool indices.
    #[must_use]
    pub fn slip_legs(&self, indices: &[usize]) -> Vec<SlipLeg> {
        indices
            .iter()
            .map(|&i| SlipLeg::new(Arc::clone(&self.legs[i]), self.predictions[i]))
            .collect()
    }

    /// Resolves a list of ids to sorted pool indices.
    ///
    /// # Errors
    /// Returns an error for unknown or duplicated ids, or an empty list.
    pub fn resolve<'a>(&self, ids: impl IntoIterator<Item = &'a LegId>) -> Result<Vec<usize>> {
        let mut out = Vec::new();
        for id in ids {
            let i = self
                .index_of(id)
                .ok_or_else(|| ParlayError::UnknownLeg(id.to_string()))?;
            if out.contains(&i) {
                return Err(ParlayError::DuplicateLeg(id.to_string()));
            }
            out.push(i);
        }
        if out.is_empty() {
            return Err(ParlayError::EmptySlip);
        }
        out.sort_unstable();
        Ok(out)
    }

    /// Pool indices of an existing slip's legs.
    ///
    /// # Errors
    /// Returns an error if the slip contains a leg not in this pool.
    pub fn indices_of(&self, slip: &CandidateSlip) -> Result<Vec<usize>> {
        self.resolve(slip.leg_ids())
    }
}
