//! Microbiome metrics.
//!
//! Turns a raw sample-by-taxon abundance table into a [`MicrobiomeProfile`]:
//! row normalization, per-sample Shannon index, averaged risk score and a
//! coarse diversity bucket.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::AppError;
use crate::models::{DiversityLevel, MicrobiomeProfile};

/// Offset added inside the logarithm so that zero abundances contribute zero.
const LOG_EPSILON: f64 = 1e-9;

/// Shannon index treated as maximal diversity when deriving the risk score.
const MAX_DIVERSITY_SCALE: f64 = 4.0;

/// Name of the optional identifier column in uploaded tables.
pub const SAMPLE_ID_COLUMN: &str = "SampleID";

/// Sample-by-taxon table of non-negative abundances.
#[derive(Debug, Clone, PartialEq)]
pub struct AbundanceMatrix {
    taxa: Vec<String>,
    rows: Vec<Vec<f64>>,
    sample_ids: Vec<String>,
}

impl AbundanceMatrix {
    /// Builds a matrix from already-numeric rows.
    ///
    /// Rows are padded with zeros (or truncated) to the number of taxa and
    /// non-finite cells become zero.
    pub fn new(taxa: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        let width = taxa.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, 0.0);
                row.iter_mut()
                    .filter(|cell| !cell.is_finite())
                    .for_each(|cell| *cell = 0.0);
                row
            })
            .collect();

        Self {
            taxa,
            rows,
            sample_ids: Vec::new(),
        }
    }

    /// Builds a matrix from a parsed text table (header plus records).
    ///
    /// A `SampleID` column is lifted out as sample identifiers; every other
    /// cell is coerced to a number, with anything unparseable becoming zero.
    pub fn from_records<S: AsRef<str>>(header: &[S], records: &[Vec<S>]) -> Self {
        let id_index = header
            .iter()
            .position(|h| h.as_ref().trim() == SAMPLE_ID_COLUMN);

        let taxa: Vec<String> = header
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != id_index)
            .map(|(_, h)| h.as_ref().trim().to_string())
            .collect();

        let mut sample_ids = Vec::new();
        let mut rows = Vec::with_capacity(records.len());

        for record in records {
            if let Some(idx) = id_index {
                let id = record.get(idx).map(|s| s.as_ref().trim()).unwrap_or("");
                sample_ids.push(id.to_string());
            }

            let row: Vec<f64> = (0..header.len())
                .filter(|i| Some(*i) != id_index)
                .map(|i| record.get(i).map(|cell| coerce_cell(cell.as_ref())).unwrap_or(0.0))
                .collect();
            rows.push(row);
        }

        let mut matrix = Self::new(taxa, rows);
        matrix.sample_ids = sample_ids;
        matrix
    }

    pub fn taxa(&self) -> &[String] {
        &self.taxa
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn sample_count(&self) -> usize {
        self.rows.len()
    }
}

fn coerce_cell(cell: &str) -> f64 {
    match cell.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Divides each row by its sum. Rows summing to zero are left all-zero.
///
/// Cells are first scaled by the row's largest magnitude so the sum stays
/// finite for values near `f64::MAX`.
pub fn normalize(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    rows.iter().map(|row| normalize_row(row)).collect()
}

fn normalize_row(row: &[f64]) -> Vec<f64> {
    let peak = row
        .iter()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if peak == 0.0 {
        return vec![0.0; row.len()];
    }

    let scaled: Vec<f64> = row
        .iter()
        .map(|v| if v.is_finite() { v / peak } else { 0.0 })
        .collect();
    let total: f64 = scaled.iter().sum();
    if total == 0.0 {
        return vec![0.0; row.len()];
    }
    scaled.into_iter().map(|v| v / total).collect()
}

/// Shannon entropy (base 2) of one normalized row.
pub fn shannon_index(row: &[f64]) -> f64 {
    let entropy: f64 = row.iter().map(|p| p * (p + LOG_EPSILON).log2()).sum();
    // Avoid reporting -0.0 for degenerate rows.
    (-entropy).max(0.0)
}

/// Risk in [0, 1]: low diversity means high risk.
pub fn risk_score(shannon: f64) -> f64 {
    (1.0 - shannon / MAX_DIVERSITY_SCALE).clamp(0.0, 1.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Stateless engine producing [`MicrobiomeProfile`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsEngine;

impl MetricsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Computes the diversity/risk profile of an abundance table.
    ///
    /// Fails with [`AppError::Data`] when the table has no taxon columns. A
    /// table with columns but no rows is valid zero data.
    pub fn compute_profile(&self, matrix: &AbundanceMatrix) -> Result<MicrobiomeProfile, AppError> {
        if matrix.taxa().is_empty() {
            return Err(AppError::Data(
                "abundance table has no numeric taxon columns".to_string(),
            ));
        }

        let normalized = normalize(matrix.rows());
        let sample_count = normalized.len();

        let mut mean_abundance: BTreeMap<String, f64> = BTreeMap::new();
        for (col, taxon) in matrix.taxa().iter().enumerate() {
            let mean = if sample_count == 0 {
                0.0
            } else {
                normalized.iter().map(|row| row[col]).sum::<f64>() / sample_count as f64
            };
            // Duplicate headers collapse onto one taxon; the later column wins.
            mean_abundance.insert(taxon.clone(), mean);
        }

        let avg_shannon = if sample_count == 0 {
            0.0
        } else {
            normalized.iter().map(|row| shannon_index(row)).sum::<f64>() / sample_count as f64
        };

        let diversity_level = DiversityLevel::from_shannon(avg_shannon);

        debug!(
            samples = sample_count,
            taxa = matrix.taxa().len(),
            shannon = avg_shannon,
            "Computed microbiome metrics"
        );
        info!(
            "Microbiome profile ready: {} samples, {} diversity",
            sample_count, diversity_level
        );

        Ok(MicrobiomeProfile {
            sample_count,
            mean_abundance,
            shannon_index: round2(avg_shannon),
            risk_score: round2(risk_score(avg_shannon)),
            diversity_level,
            sample_ids: matrix.sample_ids().to_vec(),
        })
    }

    /// Normalized rows keyed by taxon, one map per sample, in table order.
    pub fn normalized_records(&self, matrix: &AbundanceMatrix) -> Vec<BTreeMap<String, f64>> {
        normalize(matrix.rows())
            .into_iter()
            .map(|row| matrix.taxa().iter().cloned().zip(row).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxa(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_rows_sum_to_one() {
        let rows = vec![vec![1.0, 3.0, 6.0], vec![0.2, 0.2, 0.1], vec![5.0, 0.0, 0.0]];
        for row in normalize(&rows) {
            let total: f64 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-6, "row sums to {}", total);
        }
    }

    #[test]
    fn test_normalize_zero_row_stays_zero() {
        let rows = vec![vec![0.0, 0.0, 0.0]];
        let normalized = normalize(&rows);
        assert_eq!(normalized[0], vec![0.0, 0.0, 0.0]);
        assert_eq!(shannon_index(&normalized[0]), 0.0);
    }

    #[test]
    fn test_normalized_records_keep_sample_order() {
        let matrix = AbundanceMatrix::new(
            taxa(&["Bifidobacterium", "Firmicutes"]),
            vec![vec![1.0, 3.0], vec![0.0, 0.0]],
        );
        let records = MetricsEngine::new().normalized_records(&matrix);

        assert_eq!(records.len(), 2);
        assert!((records[0]["Bifidobacterium"] - 0.25).abs() < 1e-9);
        assert!((records[0]["Firmicutes"] - 0.75).abs() < 1e-9);
        assert_eq!(records[1]["Firmicutes"], 0.0);
    }

    #[test]
    fn test_normalize_huge_values_stay_finite() {
        let rows = vec![vec![f64::MAX, f64::MAX], vec![f64::MAX, 0.0, f64::MAX / 2.0]];
        let normalized = normalize(&rows);

        assert_eq!(normalized[0], vec![0.5, 0.5]);
        let total: f64 = normalized[1].iter().sum();
        assert!((total - 1.0).abs() < 1e-6, "row sums to {}", total);

        let profile = MetricsEngine::new()
            .compute_profile(&AbundanceMatrix::new(taxa(&["A", "B"]), vec![vec![f64::MAX, f64::MAX]]))
            .unwrap();
        assert_eq!(profile.shannon_index, 1.0);
        assert_eq!(profile.abundance("A"), 0.5);
    }

    #[test]
    fn test_shannon_uniform_is_log2_k() {
        for k in [1usize, 2, 4, 7, 16] {
            let row = vec![1.0 / k as f64; k];
            let expected = (k as f64).log2();
            assert!(
                (shannon_index(&row) - expected).abs() < 1e-6,
                "k = {}: {} vs {}",
                k,
                shannon_index(&row),
                expected
            );
        }
    }

    #[test]
    fn test_risk_score_is_clamped() {
        assert_eq!(risk_score(0.0), 1.0);
        assert_eq!(risk_score(2.0), 0.5);
        assert_eq!(risk_score(4.0), 0.0);
        assert_eq!(risk_score(5.0), 0.0);
    }

    #[test]
    fn test_compute_profile_uniform_four_taxa() {
        let matrix = AbundanceMatrix::new(
            taxa(&["A", "B", "C", "D"]),
            vec![vec![1.0, 1.0, 1.0, 1.0], vec![2.0, 2.0, 2.0, 2.0]],
        );
        let profile = MetricsEngine::new().compute_profile(&matrix).unwrap();

        assert_eq!(profile.sample_count, 2);
        assert_eq!(profile.shannon_index, 2.0);
        assert_eq!(profile.risk_score, 0.5);
        assert_eq!(profile.diversity_level, DiversityLevel::Moderate);
        assert!((profile.abundance("A") - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_compute_profile_low_diversity() {
        let matrix = AbundanceMatrix::new(taxa(&["A", "B"]), vec![vec![9.0, 1.0]]);
        let profile = MetricsEngine::new().compute_profile(&matrix).unwrap();
        assert_eq!(profile.diversity_level, DiversityLevel::Low);
        assert!(profile.risk_score > 0.8);
    }

    #[test]
    fn test_compute_profile_tolerates_zero_rows() {
        let matrix = AbundanceMatrix::new(
            taxa(&["A", "B"]),
            vec![vec![0.0, 0.0], vec![1.0, 1.0]],
        );
        let profile = MetricsEngine::new().compute_profile(&matrix).unwrap();
        // One sample at entropy 1.0, one at 0.0.
        assert_eq!(profile.shannon_index, 0.5);
        assert!((profile.abundance("A") - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_no_columns_is_data_error() {
        let matrix = AbundanceMatrix::new(Vec::new(), vec![vec![], vec![]]);
        let err = MetricsEngine::new().compute_profile(&matrix).unwrap_err();
        assert!(matches!(err, AppError::Data(_)));
    }

    #[test]
    fn test_only_sample_id_column_is_data_error() {
        let header = vec!["SampleID"];
        let records = vec![vec!["s1"], vec!["s2"]];
        let matrix = AbundanceMatrix::from_records(&header, &records);
        assert!(matrix.taxa().is_empty());
        assert!(MetricsEngine::new().compute_profile(&matrix).is_err());
    }

    #[test]
    fn test_empty_table_is_zero_data() {
        let matrix = AbundanceMatrix::new(taxa(&["A"]), Vec::new());
        let profile = MetricsEngine::new().compute_profile(&matrix).unwrap();
        assert_eq!(profile.sample_count, 0);
        assert_eq!(profile.shannon_index, 0.0);
        assert_eq!(profile.risk_score, 1.0);
        assert_eq!(profile.diversity_level, DiversityLevel::Low);
    }

    #[test]
    fn test_from_records_coerces_and_lifts_ids() {
        let header = vec!["SampleID", "Bifidobacterium", "Firmicutes"];
        let records = vec![
            vec!["s1", "0.5", "n/a"],
            vec!["s2", "", "1e-1"],
            vec!["s3", "NaN", "0.3"],
        ];
        let matrix = AbundanceMatrix::from_records(&header, &records);

        assert_eq!(matrix.taxa(), &["Bifidobacterium".to_string(), "Firmicutes".to_string()]);
        assert_eq!(matrix.sample_ids(), &["s1", "s2", "s3"]);
        assert_eq!(matrix.rows()[0], vec![0.5, 0.0]);
        assert_eq!(matrix.rows()[1], vec![0.0, 0.1]);
        assert_eq!(matrix.rows()[2], vec![0.0, 0.3]);

        let profile = MetricsEngine::new().compute_profile(&matrix).unwrap();
        assert_eq!(profile.sample_ids.len(), 3);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let matrix = AbundanceMatrix::new(taxa(&["A", "B", "C"]), vec![vec![1.0]]);
        assert_eq!(matrix.rows()[0], vec![1.0, 0.0, 0.0]);
    }
}
