//! CSV-backed leg catalog, prediction source and correlation source.
//!
//! A data directory holds up to three files:
//!
//! - `legs.csv`: `id,subject_id,category,line,direction,odds,game_id,team_id`
//! - `predictions.csv`: `leg_id,probability,confidence`
//! - `correlations.csv`: `leg_a,leg_b,rho` (optional; missing pairs are 0)
//!
//! Odds accept decimal (`1.91`) or American (`-110`, `+150`) notation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

use parlay_core::leg::{Direction, LegSpec};
use parlay_core::{CorrelationMatrix, CorrelationSource, Leg, LegCatalog, LegId, LegPool, Odds, Prediction, PredictionSource};

pub const LEGS_FILE: &str = "legs.csv";
pub const PREDICTIONS_FILE: &str = "predictions.csv";
pub const CORRELATIONS_FILE: &str = "correlations.csv";

#[derive(Debug, Deserialize)]
struct LegRow {
    id: String,
    subject_id: String,
    category: String,
    line: f64,
    direction: String,
    odds: String,
    game_id: String,
    team_id: String,
}

impl LegRow {
    fn into_leg(self) -> Result<Leg> {
        let direction: Direction = self.direction.parse()?;
        let odds: Odds = self.odds.parse()?;
        let id = self.id.clone();
        Leg::try_from(LegSpec {
            id: self.id,
            subject_id: self.subject_id,
            category: self.category,
            line: self.line,
            direction,
            odds,
            game_id: self.game_id,
            team_id: self.team_id,
        })
        .with_context(|| format!("Invalid leg '{id}'"))
    }
}

#[derive(Debug, Deserialize)]
struct PredictionRow {
    leg_id: String,
    probability: f64,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct CorrelationRow {
    leg_a: String,
    leg_b: String,
    rho: f64,
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, result) in reader.deserialize().enumerate() {
        let row = result.with_context(|| format!("{}: bad record {}", path.display(), line + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Legs read from `legs.csv`.
pub struct CsvLegCatalog {
    path: PathBuf,
}

impl CsvLegCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LegCatalog for CsvLegCatalog {
    fn legs(&self) -> Result<Vec<Leg>> {
        read_rows::<LegRow>(&self.path)?
            .into_iter()
            .map(LegRow::into_leg)
            .collect()
    }
}

/// Predictions read once from `predictions.csv`.
pub struct CsvPredictionSource {
    predictions: HashMap<LegId, Prediction>,
}

impl CsvPredictionSource {
    /// # Errors
    /// Returns an error if the file cannot be read, a value is out of range,
    /// or a leg appears twice.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut predictions = HashMap::new();
        for row in read_rows::<PredictionRow>(path)? {
            let prediction = Prediction::for_leg(&row.leg_id, row.probability, row.confidence)?;
            if predictions.insert(LegId::from(row.leg_id.as_str()), prediction).is_some() {
                bail!("{}: duplicate prediction for leg '{}'", path.display(), row.leg_id);
            }
        }
        Ok(Self { predictions })
    }
}

impl PredictionSource for CsvPredictionSource {
    /// Predictions for `ids`. Ids without a row are left out so the pool
    /// reports them as missing.
    fn predictions(&self, ids: &[LegId]) -> Result<HashMap<LegId, Prediction>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.predictions.get(id).map(|p| (id.clone(), *p)))
            .collect())
    }
}

/// Correlations read once from `correlations.csv`; an absent file means
/// every pair is uncorrelated.
pub struct CsvCorrelationSource {
    rows: Vec<(LegId, LegId, f64)>,
}

impl CsvCorrelationSource {
    /// # Errors
    /// Returns an error if the file exists but cannot be parsed.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self { rows: Vec::new() });
        }
        let rows = read_rows::<CorrelationRow>(path)?
            .into_iter()
            .map(|r| (LegId::from(r.leg_a), LegId::from(r.leg_b), r.rho))
            .collect();
        Ok(Self { rows })
    }
}

impl CorrelationSource for CsvCorrelationSource {
    /// Pairs where both legs are among `ids`.
    fn correlations(&self, ids: &[LegId]) -> Result<CorrelationMatrix> {
        let mut matrix = CorrelationMatrix::new();
        for (a, b, rho) in &self.rows {
            if ids.contains(a) && ids.contains(b) {
                matrix.insert(a.clone(), b.clone(), *rho)?;
            }
        }
        Ok(matrix)
    }
}

/// Loads a validated pool from a data directory.
///
/// # Errors
/// Returns an error if a file is missing or malformed, or the combined data
/// fails pool validation.
pub fn load_pool(dir: &Path) -> Result<LegPool> {
    let catalog = CsvLegCatalog::new(dir.join(LEGS_FILE));
    let predictions = CsvPredictionSource::from_path(&dir.join(PREDICTIONS_FILE))?;
    let correlations = CsvCorrelationSource::from_path(&dir.join(CORRELATIONS_FILE))?;

    let pool = LegPool::from_sources(&catalog, &predictions, &correlations)
        .with_context(|| format!("Invalid leg data in {}", dir.display()))?;
    info!(
        legs = pool.len(),
        pairs = pool.correlation_matrix().len(),
        dir = %dir.display(),
        "Loaded leg pool"
    );
    Ok(pool)
}
