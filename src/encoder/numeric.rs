use serde::{Deserialize, Serialize};

const MIN_SCALE: f64 = 1e-9;

/// Pre-standardization transform applied to a numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericTransform {
    Identity,
    /// `ln(1 + x)`, for heavy-tailed non-negative amounts.
    Log1p,
}

impl NumericTransform {
    fn forward(self, value: f64) -> f64 {
        match self {
            NumericTransform::Identity => value,
            NumericTransform::Log1p => value.max(0.0).ln_1p(),
        }
    }

    fn inverse(self, value: f64) -> f64 {
        match self {
            NumericTransform::Identity => value,
            NumericTransform::Log1p => value.exp_m1(),
        }
    }
}

/// Standardization parameters fitted on the training corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericScaler {
    pub field: String,
    pub transform: NumericTransform,
    pub mean: f64,
    pub scale: f64,
}

impl NumericScaler {
    pub fn fit(field: &str, transform: NumericTransform, values: &[f64]) -> Self {
        let n = values.len().max(1) as f64;
        let transformed: Vec<f64> = values.iter().map(|&v| transform.forward(v)).collect();
        let mean = transformed.iter().sum::<f64>() / n;
        let variance = transformed
            .iter()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
            / n;
        let std = variance.sqrt();
        Self {
            field: field.to_string(),
            transform,
            mean,
            scale: if std.is_finite() && std > MIN_SCALE {
                std
            } else {
                1.0
            },
        }
    }

    pub fn apply(&self, value: f64) -> f32 {
        ((self.transform.forward(value) - self.mean) / self.scale) as f32
    }

    pub fn invert(&self, encoded: f32) -> f64 {
        self.transform.inverse(encoded as f64 * self.scale + self.mean)
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if !self.mean.is_finite() || !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(format!("Invalid scaler parameters for {}", self.field));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_to_zero_mean() {
        let scaler = NumericScaler::fit("founded_year", NumericTransform::Identity, &[2000.0, 2010.0]);
        assert_eq!(scaler.mean, 2005.0);
        assert_eq!(scaler.scale, 5.0);
        assert_eq!(scaler.apply(2010.0), 1.0);
        assert!((scaler.invert(-1.0) - 2000.0).abs() < 1e-6);
    }

    #[test]
    fn constant_column_keeps_unit_scale() {
        let scaler = NumericScaler::fit("founded_year", NumericTransform::Identity, &[2020.0; 4]);
        assert_eq!(scaler.scale, 1.0);
        assert_eq!(scaler.apply(2020.0), 0.0);
    }

    #[test]
    fn log_transform_inverts_within_tolerance() {
        let scaler = NumericScaler::fit(
            "funding_usd",
            NumericTransform::Log1p,
            &[0.0, 10_000.0, 5_000_000.0],
        );
        let encoded = scaler.apply(250_000.0);
        let decoded = scaler.invert(encoded);
        assert!((decoded - 250_000.0).abs() / 250_000.0 < 1e-4);
    }
}
