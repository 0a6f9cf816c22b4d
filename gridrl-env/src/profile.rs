//! Time-indexed profiles of named state variables
//!
//! A profile is the exogenous part of an episode: one row of named values
//! per 5-minute step (electricity prices, forecasts). Environments read the
//! current row each step and end the episode when the rows run out.

use gridrl_core::{RLError, Result};

/// Label of the electricity price column read by the energy environments
pub const ELECTRICITY_PRICE_LABEL: &str = "C_electricity_price_[$/MWh]";

/// Half-hour shaped example price series, one value per 5-minute step ($/MWh)
const EXAMPLE_PRICES: [f64; 36] = [
    28.0, 28.0, 27.5, 26.0, 25.0, 24.5,
    24.0, 25.5, 29.0, 34.0, 41.0, 48.0,
    55.0, 61.0, 64.0, 62.0, 58.0, 52.0,
    47.0, 44.0, 42.0, 43.0, 46.0, 51.0,
    57.0, 63.0, 66.0, 60.0, 50.0, 42.0,
    36.0, 32.0, 30.0, 29.0, 28.5, 28.0,
];

/// A table of named state variables, one row per step
#[derive(Debug, Clone)]
pub struct Profile {
    labels: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl Profile {
    /// Create a profile from column labels and rows
    ///
    /// Every row must have one value per label.
    pub fn new(labels: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        for row in &rows {
            if row.len() != labels.len() {
                return Err(RLError::DimensionMismatch {
                    expected: labels.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(Self { labels, rows })
    }

    /// Single-column profile holding `len` copies of `value`
    pub fn constant(label: impl Into<String>, value: f64, len: usize) -> Self {
        Self {
            labels: vec![label.into()],
            rows: vec![vec![value]; len],
        }
    }

    /// The bundled example price series (three hours of 5-minute prices)
    #[must_use]
    pub fn example() -> Self {
        Self {
            labels: vec![ELECTRICITY_PRICE_LABEL.to_string()],
            rows: EXAMPLE_PRICES.iter().map(|&p| vec![p]).collect(),
        }
    }

    /// Column labels, in row order
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Index of a named column
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.labels
            .iter()
            .position(|label| label == name)
            .ok_or_else(|| RLError::MissingStateVariable { name: name.into() })
    }

    /// The row at `index`, if it exists
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Number of steps in the profile
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the profile has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Per-column (min, max) over all rows
    #[must_use]
    pub fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        let mut low = vec![f64::INFINITY; self.labels.len()];
        let mut high = vec![f64::NEG_INFINITY; self.labels.len()];
        for row in &self.rows {
            for (i, &value) in row.iter().enumerate() {
                low[i] = low[i].min(value);
                high[i] = high[i].max(value);
            }
        }
        (low, high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_rows_rejected() {
        let result = Profile::new(
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 2.0], vec![3.0]],
        );
        assert!(matches!(result, Err(RLError::DimensionMismatch { .. })));
    }

    #[test]
    fn index_of_missing_column() {
        let profile = Profile::example();
        assert_eq!(profile.index_of(ELECTRICITY_PRICE_LABEL).unwrap(), 0);

        let err = profile.index_of("no such column").unwrap_err();
        assert!(matches!(err, RLError::MissingStateVariable { .. }));
    }

    #[test]
    fn constant_profile() {
        let profile = Profile::constant("price", 30.0, 4);
        assert_eq!(profile.len(), 4);
        assert_eq!(profile.row(3), Some(&[30.0][..]));
        assert!(profile.row(4).is_none());
    }

    #[test]
    fn bounds_span_rows() {
        let (low, high) = Profile::example().bounds();
        assert_eq!(low, vec![24.0]);
        assert_eq!(high, vec![66.0]);
    }
}
