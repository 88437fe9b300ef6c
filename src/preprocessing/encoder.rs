//! One-hot encoding of a categorical column

use super::imputer::most_frequent;
use super::scaler::StandardScaler;
use serde::{Deserialize, Serialize};

/// Fitted encoder for one categorical column
///
/// Missing values are replaced by the most frequent training category, each
/// indicator column is divided by its training standard deviation, and values
/// not seen during fit encode as all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub column: String,
    pub fill_value: String,
    /// Sorted training categories, one output column each
    pub categories: Vec<String>,
    pub scalers: Vec<StandardScaler>,
}

impl OneHotEncoder {
    /// Fit on the column values; `None` when the column has no value at all
    pub fn fit(column: &str, values: &[Option<&str>]) -> Option<Self> {
        let fill_value = most_frequent(values.iter().copied())?;
        let imputed: Vec<&str> = values
            .iter()
            .map(|v| v.unwrap_or(fill_value.as_str()))
            .collect();

        let mut categories: Vec<String> = imputed.iter().map(|s| s.to_string()).collect();
        categories.sort();
        categories.dedup();

        let scalers = categories
            .iter()
            .map(|category| {
                let indicator: Vec<f64> = imputed
                    .iter()
                    .map(|v| if *v == category.as_str() { 1.0 } else { 0.0 })
                    .collect();
                StandardScaler::fit(&indicator, false)
            })
            .collect();

        Some(Self {
            column: column.to_string(),
            fill_value,
            categories,
            scalers,
        })
    }

    /// Number of output columns
    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Write the encoded value into `out`, which must hold `width()` slots
    pub fn encode_into(&self, value: Option<&str>, out: &mut [f64]) {
        out.fill(0.0);
        let value = value.unwrap_or(self.fill_value.as_str());
        if let Ok(pos) = self.categories.binary_search_by(|c| c.as_str().cmp(value)) {
            out[pos] = self.scalers[pos].apply(1.0);
        }
    }

    /// Output column names as `column_category`
    pub fn feature_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .map(move |c| format!("{}_{}", self.column, c))
    }
}
