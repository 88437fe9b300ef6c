//! Standard scaling

use serde::{Deserialize, Serialize};

/// Fitted standard scaler for one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Subtracted before scaling; zero when fitted without centering
    pub center: f64,
    /// Population standard deviation, 1 when the column is constant
    pub scale: f64,
}

impl StandardScaler {
    /// Fit on the given values; `with_mean = false` scales without centering
    pub fn fit(values: &[f64], with_mean: bool) -> Self {
        if values.is_empty() {
            return Self { center: 0.0, scale: 1.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();

        Self {
            center: if with_mean { mean } else { 0.0 },
            scale: if std > 0.0 && std.is_finite() { std } else { 1.0 },
        }
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.center) / self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_scaler() {
        let scaler = StandardScaler::fit(&[1.0, 2.0, 3.0, 4.0, 5.0], true);
        assert!((scaler.center - 3.0).abs() < 1e-12);
        assert!((scaler.scale - 2.0f64.sqrt()).abs() < 1e-12);

        let scaled: Vec<f64> = [1.0, 2.0, 3.0, 4.0, 5.0].iter().map(|&v| scaler.apply(v)).collect();
        let mean = scaled.iter().sum::<f64>() / 5.0;
        assert!(mean.abs() < 1e-10);
    }

    #[test]
    fn test_constant_column_keeps_unit_scale() {
        let scaler = StandardScaler::fit(&[7.0, 7.0, 7.0], true);
        assert_eq!(scaler.scale, 1.0);
        assert_eq!(scaler.apply(7.0), 0.0);
    }

    #[test]
    fn test_without_mean_only_divides() {
        let scaler = StandardScaler::fit(&[0.0, 1.0, 0.0, 1.0], false);
        assert_eq!(scaler.center, 0.0);
        assert!((scaler.apply(1.0) - 2.0).abs() < 1e-12);
        assert_eq!(scaler.apply(0.0), 0.0);
    }
}
