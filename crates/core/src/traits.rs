use std::collections::HashMap;

use anyhow::Result;

use crate::correlation::CorrelationMatrix;
use crate::leg::{Leg, LegId};
use crate::prediction::Prediction;

/// Supplies the legs available for a request.
pub trait LegCatalog: Send + Sync {
    fn legs(&self) -> Result<Vec<Leg>>;
}

/// Supplies a prediction per leg id.
pub trait PredictionSource: Send + Sync {
    fn predictions(&self, ids: &[LegId]) -> Result<HashMap<LegId, Prediction>>;
}

/// Supplies a (possibly sparse) correlation matrix for a set of legs.
pub trait CorrelationSource: Send + Sync {
    fn correlations(&self, ids: &[LegId]) -> Result<CorrelationMatrix>;
}
