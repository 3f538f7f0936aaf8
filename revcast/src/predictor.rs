// BSD 3-Clause License
//
// Copyright (c) 2025, BlackPortal ○
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this
//    list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice,
//    this list of conditions and the following disclaimer in the documentation
//    and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its
//    contributors may be used to endorse or promote products derived from
//    this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS"
// AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
// IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE
// FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
// DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER
// CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY,
// OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::{debug, info};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::errors::{PredictError, ScalerError};
use crate::features::{FeatureEncoder, RestaurantProfile};
use crate::models::Regressor;
use crate::persist;
use crate::scalers::{Scaler, StandardScaler};

/// Relative half-width of the band reported around a prediction.
pub const MARGIN_OF_ERROR: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    NeuralNetwork,
    LinearRegression,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::NeuralNetwork => write!(f, "Neural Network"),
            ModelKind::LinearRegression => write!(f, "Linear Regression"),
        }
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "neural_network" | "nn" | "network" => Ok(ModelKind::NeuralNetwork),
            "linear_regression" | "linear" | "lr" => Ok(ModelKind::LinearRegression),
            other => Err(format!("unknown model kind '{}'", other)),
        }
    }
}

/// A revenue estimate with its ±5% band, in currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub revenue: f64,
    pub lower: f64,
    pub upper: f64,
    pub model: ModelKind,
}

impl Prediction {
    fn new(revenue: f64, model: ModelKind) -> Self {
        let margin = revenue.abs() * MARGIN_OF_ERROR;
        Prediction { revenue, lower: revenue - margin, upper: revenue + margin, model }
    }
}

/// Loaded artifacts needed to turn a `RestaurantProfile` into revenue.
pub struct RevenuePredictor {
    encoder: FeatureEncoder,
    feature_scaler: StandardScaler,
    target_scaler: Option<StandardScaler>,
    model: Box<dyn Regressor + Send + Sync>,
    kind: ModelKind,
}

impl fmt::Debug for RevenuePredictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevenuePredictor")
            .field("kind", &self.kind)
            .field("categories", &self.encoder.categories())
            .field("target_scaled", &self.target_scaler.is_some())
            .finish()
    }
}

impl RevenuePredictor {
    /// Loads the encoders, both scalers and the chosen model from `dir`.
    ///
    /// The target scaler is optional: models trained without target scaling
    /// predict currency directly.
    pub fn load(dir: impl AsRef<Path>, kind: ModelKind) -> Result<Self, PredictError> {
        let dir = dir.as_ref();
        let encoder = persist::load_encoders(dir)?;
        let feature_scaler = persist::load_feature_scaler(dir)?;
        let target_scaler = match persist::load_target_scaler(dir) {
            Ok(scaler) => Some(scaler),
            Err(crate::errors::PersistError::Missing { .. }) => None,
            Err(e) => return Err(e.into()),
        };
        let model: Box<dyn Regressor + Send + Sync> = match kind {
            ModelKind::NeuralNetwork => Box::new(persist::load_network(dir)?),
            ModelKind::LinearRegression => Box::new(persist::load_linear_model(dir)?),
        };
        info!("Loaded {} from {}", kind, dir.display());
        Self::from_parts(encoder, feature_scaler, target_scaler, model, kind)
    }

    /// Assembles a predictor from already loaded parts.
    pub fn from_parts(
        encoder: FeatureEncoder,
        feature_scaler: StandardScaler,
        target_scaler: Option<StandardScaler>,
        model: Box<dyn Regressor + Send + Sync>,
        kind: ModelKind,
    ) -> Result<Self, PredictError> {
        let n_features = feature_scaler.n_features().ok_or(ScalerError::NotFitted)?;
        if let Some(expected) = model.n_features() {
            if expected != n_features {
                return Err(ScalerError::DimensionMismatch { expected, actual: n_features }.into());
            }
        }
        Ok(RevenuePredictor { encoder, feature_scaler, target_scaler, model, kind })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Categories the model was trained on, in code order.
    pub fn categories(&self) -> &[String] {
        self.encoder.categories()
    }

    /// Encodes and scales a profile into a `1 × 5` model input.
    pub fn preprocess_input(&self, profile: &RestaurantProfile) -> Result<Array2<f64>, PredictError> {
        let row = self.encoder.encode_profile(profile)?;
        let x = Array2::from_shape_vec((1, row.len()), row.to_vec())
            .map_err(|_| ScalerError::DimensionMismatch { expected: 1, actual: row.len() })?;
        let scaled = self.feature_scaler.transform(&x)?;
        debug!("Preprocessed {:?} into {:?}", row, scaled.row(0).to_vec());
        Ok(scaled)
    }

    /// Maps a model output back to currency units.
    pub fn inverse_scale_prediction(&self, scaled: f64) -> Result<f64, PredictError> {
        match &self.target_scaler {
            Some(scaler) => {
                let value = scaler.inverse_transform_target(&Array1::from_elem(1, scaled))?;
                Ok(value[0])
            }
            None => Ok(scaled),
        }
    }

    pub fn predict(&self, profile: &RestaurantProfile) -> Result<Prediction, PredictError> {
        let x = self.preprocess_input(profile)?;
        let output = self.model.predict(&x)?;
        let scaled = output.first().copied().ok_or(PredictError::NonFinite)?;
        let revenue = self.inverse_scale_prediction(scaled)?;
        if !revenue.is_finite() {
            return Err(PredictError::NonFinite);
        }
        Ok(Prediction::new(revenue, self.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RestaurantRecord;
    use crate::errors::FeatureError;
    use crate::models::LinearRegression;
    use tempfile::tempdir;

    fn records() -> Vec<RestaurantRecord> {
        let rows = [
            ("Yes", "Cafe", 10.0, 20.0),
            ("No", "Cafe", 20.0, 30.0),
            ("Yes", "Fine Dining", 30.0, 60.0),
            ("No", "Fine Dining", 15.0, 45.0),
            ("Yes", "Sports Bar", 40.0, 50.0),
            ("No", "Sports Bar", 25.0, 25.0),
            ("Yes", "Cafe", 35.0, 70.0),
            ("No", "Fine Dining", 45.0, 90.0),
        ];
        rows.iter()
            .map(|&(franchise, category, items, orders)| RestaurantRecord {
                franchise: franchise.to_string(),
                category: category.to_string(),
                no_of_item: items,
                order_placed: orders,
                revenue: 1000.0 * orders + 500.0 * items + 20_000.0,
            })
            .collect()
    }

    fn linear_predictor(scale_target: bool) -> RevenuePredictor {
        let records = records();
        let encoder = FeatureEncoder::fit(&records);
        let (x, y) = encoder.design_matrix(&records).unwrap();
        let mut feature_scaler = StandardScaler::new();
        let x = feature_scaler.fit_transform(&x).unwrap();

        let (y, target_scaler) = if scale_target {
            let mut scaler = StandardScaler::new();
            scaler.fit_target(&y).unwrap();
            (scaler.transform_target(&y).unwrap(), Some(scaler))
        } else {
            (y, None)
        };

        let mut model = LinearRegression::new().build();
        model.fit(&x, &y).unwrap();
        RevenuePredictor::from_parts(
            encoder,
            feature_scaler,
            target_scaler,
            Box::new(model),
            ModelKind::LinearRegression,
        )
        .unwrap()
    }

    #[test]
    fn test_model_kind_parsing() {
        assert_eq!("neural_network".parse::<ModelKind>(), Ok(ModelKind::NeuralNetwork));
        assert_eq!("Linear Regression".parse::<ModelKind>(), Ok(ModelKind::LinearRegression));
        assert_eq!("lr".parse::<ModelKind>(), Ok(ModelKind::LinearRegression));
        assert!("forest".parse::<ModelKind>().is_err());
        assert_eq!(ModelKind::default(), ModelKind::NeuralNetwork);
    }

    #[test]
    fn test_predict_recovers_linear_revenue() {
        for scale_target in [true, false] {
            let predictor = linear_predictor(scale_target);
            let profile = RestaurantProfile::new(true, "Cafe", 20, 40.0);
            let prediction = predictor.predict(&profile).unwrap();

            let expected = 1000.0 * 40.0 + 500.0 * 20.0 + 20_000.0;
            assert!(
                (prediction.revenue - expected).abs() < 1e-3 * expected,
                "predicted {} expected {}",
                prediction.revenue,
                expected
            );
            assert_eq!(prediction.model, ModelKind::LinearRegression);
        }
    }

    #[test]
    fn test_prediction_band_is_five_percent() {
        let prediction = Prediction::new(200_000.0, ModelKind::NeuralNetwork);
        assert!((prediction.lower - 190_000.0).abs() < 1e-6);
        assert!((prediction.upper - 210_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_input_shape() {
        let predictor = linear_predictor(true);
        let x = predictor.preprocess_input(&RestaurantProfile::new(false, "Sports Bar", 10, 5.0)).unwrap();
        assert_eq!(x.dim(), (1, 5));
    }

    #[test]
    fn test_rejects_zero_menu_items() {
        let predictor = linear_predictor(true);
        let result = predictor.predict(&RestaurantProfile::new(true, "Cafe", 0, 40.0));
        assert!(matches!(result, Err(PredictError::Feature(FeatureError::ZeroMenuItems))));
    }

    #[test]
    fn test_rejects_unknown_category() {
        let predictor = linear_predictor(true);
        let result = predictor.predict(&RestaurantProfile::new(true, "Food Truck", 10, 40.0));
        assert!(matches!(result, Err(PredictError::Feature(FeatureError::UnknownCategory(_)))));
    }

    #[test]
    fn test_categories_in_code_order() {
        let predictor = linear_predictor(true);
        assert_eq!(predictor.categories(), &["Cafe", "Fine Dining", "Sports Bar"]);
    }

    #[test]
    fn test_inverse_scale_prediction() {
        let predictor = linear_predictor(true);
        let y: Vec<f64> = records().iter().map(|r| r.revenue).collect();
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        assert!((predictor.inverse_scale_prediction(0.0).unwrap() - mean).abs() < 1e-6);

        let unscaled = linear_predictor(false);
        assert_eq!(unscaled.inverse_scale_prediction(1234.5).unwrap(), 1234.5);
    }

    #[test]
    fn test_load_missing_artifacts() {
        let dir = tempdir().unwrap();
        let result = RevenuePredictor::load(dir.path(), ModelKind::NeuralNetwork);
        assert!(matches!(result, Err(PredictError::Persist(_))));
    }
}
