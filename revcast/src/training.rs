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

//! The offline training recipe: clean, encode, split, scale, fit, evaluate, persist.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};
use ndarray::Array1;

use crate::data::{CleaningReport, DatasetSource, DatasetSummary, RestaurantRecord, train_test_split};
use crate::deep_learning::{FitConfig, History, Sequential};
use crate::errors::{DataError, ModelError, PersistError, TrainingError};
use crate::features::{FeatureEncoder, N_FEATURES};
use crate::losses::MSE;
use crate::metrics::RegressionMetrics;
use crate::models::{LinearRegression, Regressor, Solver};
use crate::optimizers::Adam;
use crate::persist::{self, Manifest};
use crate::scalers::{Scaler, StandardScaler};

/// Settings for a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    source: DatasetSource,
    models_dir: PathBuf,
    test_size: f64,
    seed: u64,
    epochs: usize,
    batch_size: usize,
    validation_split: f64,
    learning_rate: f64,
    scale_target: bool,
    linear_solver: Solver,
}

impl TrainingConfig {
    pub fn new(source: DatasetSource, models_dir: impl Into<PathBuf>) -> Self {
        TrainingConfig {
            source,
            models_dir: models_dir.into(),
            test_size: 0.2,
            seed: 42,
            epochs: 100,
            batch_size: 32,
            validation_split: 0.2,
            learning_rate: 0.001,
            scale_target: true,
            linear_solver: Solver::LeastSquares,
        }
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_validation_split(mut self, validation_split: f64) -> Self {
        self.validation_split = validation_split;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_scale_target(mut self, scale_target: bool) -> Self {
        self.scale_target = scale_target;
        self
    }

    pub fn with_linear_solver(mut self, solver: Solver) -> Self {
        self.linear_solver = solver;
        self
    }

    pub fn source(&self) -> &DatasetSource {
        &self.source
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn fit_config(&self) -> FitConfig {
        FitConfig::default()
            .with_epochs(self.epochs)
            .with_batch_size(self.batch_size)
            .with_validation_split(self.validation_split)
    }
}

/// Test-split metrics of one model, in currency units.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelScore {
    pub model: String,
    pub metrics: RegressionMetrics,
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub cleaning: CleaningReport,
    pub summary: DatasetSummary,
    pub train_rows: usize,
    pub test_rows: usize,
    pub scores: Vec<ModelScore>,
    pub history: History,
    pub models_dir: PathBuf,
}

impl TrainingReport {
    pub fn score(&self, model: &str) -> Option<&ModelScore> {
        self.scores.iter().find(|s| s.model == model)
    }

    /// The model with the lowest mean absolute error.
    pub fn best(&self) -> Option<&ModelScore> {
        self.scores.iter().min_by(|a, b| a.metrics.mae.total_cmp(&b.metrics.mae))
    }
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Trained on {} rows, tested on {} rows ({} of {} rows kept after cleaning)",
            self.train_rows,
            self.test_rows,
            self.cleaning.kept(),
            self.cleaning.total_rows
        )?;
        writeln!(f)?;
        writeln!(f, "{:<20} {:>16} {:>22} {:>10}", "Model", "MAE", "MSE", "R²")?;
        writeln!(f, "{}", "-".repeat(71))?;
        for score in &self.scores {
            writeln!(
                f,
                "{:<20} {:>16.2} {:>22.2} {:>10.4}",
                score.model, score.metrics.mae, score.metrics.mse, score.metrics.r2
            )?;
        }
        if let Some(best) = self.best() {
            writeln!(f)?;
            writeln!(f, "Best model by MAE: {}", best.model)?;
        }
        write!(f, "Artifacts saved to {}", self.models_dir.display())
    }
}

/// Loads the configured dataset and runs the full recipe.
pub fn train(config: &TrainingConfig) -> Result<TrainingReport, TrainingError> {
    let (records, cleaning) = config.source.load()?;
    train_records(&records, cleaning, config)
}

/// Runs the recipe on already cleaned records.
pub fn train_records(
    records: &[RestaurantRecord],
    cleaning: CleaningReport,
    config: &TrainingConfig,
) -> Result<TrainingReport, TrainingError> {
    let summary = DatasetSummary::describe(records).ok_or(DataError::NoUsableRows)?;
    info!("Dataset summary:\n{}", summary);

    let encoder = FeatureEncoder::fit(records);
    debug!("Categories: {:?}", encoder.categories());
    let (x, y) = encoder.design_matrix(records)?;

    let split = train_test_split(&x, &y, config.test_size, config.seed)?;
    info!("Split {} rows into {} train / {} test", x.nrows(), split.x_train.nrows(), split.x_test.nrows());

    let mut feature_scaler = StandardScaler::new();
    let x_train = feature_scaler.fit_transform(&split.x_train)?;
    let x_test = feature_scaler.transform(&split.x_test)?;

    let target_scaler = if config.scale_target {
        let mut scaler = StandardScaler::new();
        scaler.fit_target(&split.y_train)?;
        Some(scaler)
    } else {
        None
    };
    let y_train = match &target_scaler {
        Some(scaler) => scaler.transform_target(&split.y_train)?,
        None => split.y_train.clone(),
    };
    let to_currency = |scaled: Array1<f64>| -> Result<Array1<f64>, TrainingError> {
        match &target_scaler {
            Some(scaler) => Ok(scaler.inverse_transform_target(&scaled)?),
            None => Ok(scaled),
        }
    };

    info!("Fitting linear regression baseline");
    let mut linear = LinearRegression::new().solver(config.linear_solver).build();
    linear.fit(&x_train, &y_train)?;
    let linear_pred = to_currency(linear.predict(&x_test)?)?;
    let linear_metrics = RegressionMetrics::evaluate(&split.y_test, &linear_pred)?;
    info!("{}: {}", linear.name(), linear_metrics);

    info!("Fitting neural network");
    let mut network = Sequential::revenue_default(N_FEATURES, config.seed)?;
    network.compile(Adam::new(config.learning_rate).map_err(ModelError::from)?, MSE);
    debug!("Network summary:\n{}", network.summary());
    let history = network.fit(&x_train, &y_train, &config.fit_config())?;
    let network_pred = to_currency(network.predict(&x_test)?)?;
    let network_metrics = RegressionMetrics::evaluate(&split.y_test, &network_pred)?;
    info!("{}: {}", Regressor::name(&network), network_metrics);

    let dir = config.models_dir.as_path();
    persist::save_encoders(dir, &encoder)?;
    persist::save_feature_scaler(dir, &feature_scaler)?;
    match &target_scaler {
        Some(scaler) => {
            persist::save_target_scaler(dir, scaler)?;
        }
        None => remove_stale(&dir.join(persist::TARGET_SCALER_FILE))?,
    }
    persist::save_linear_model(dir, &linear)?;
    persist::save_network(dir, &network)?;

    let scores = vec![
        ModelScore { model: linear.name().to_string(), metrics: linear_metrics },
        ModelScore { model: Regressor::name(&network).to_string(), metrics: network_metrics },
    ];
    let manifest = scores.iter().fold(
        Manifest::new(split.x_train.nrows(), split.x_test.nrows(), config.seed, config.scale_target),
        |manifest, score| manifest.with_metrics(&score.model, score.metrics),
    );
    persist::save_manifest(dir, &manifest)?;

    Ok(TrainingReport {
        cleaning,
        summary,
        train_rows: split.x_train.nrows(),
        test_rows: split.x_test.nrows(),
        scores,
        history,
        models_dir: config.models_dir.clone(),
    })
}

/// A target scaler left over from an earlier run would rescale unscaled predictions.
fn remove_stale(path: &Path) -> Result<(), PersistError> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PersistError::Io { path: path.to_path_buf(), source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn synthetic_records(n: usize) -> Vec<RestaurantRecord> {
        let categories = ["Cafe", "Fine Dining", "Sports Bar", "Family Style"];
        (0..n)
            .map(|i| {
                let items = 10.0 + (i * 7 % 40) as f64;
                let orders = 20.0 + (i * 13 % 90) as f64;
                let franchised = i % 3 == 0;
                RestaurantRecord {
                    franchise: if franchised { "Yes" } else { "No" }.to_string(),
                    category: categories[i % categories.len()].to_string(),
                    no_of_item: items,
                    order_placed: orders,
                    revenue: 5_000.0 * orders
                        + 1_200.0 * items
                        + if franchised { 40_000.0 } else { 0.0 }
                        + 100_000.0,
                }
            })
            .collect()
    }

    fn config(dir: &Path) -> TrainingConfig {
        TrainingConfig::new(DatasetSource::Path(dir.join("unused.csv")), dir.join("models"))
            .with_epochs(5)
            .with_batch_size(16)
    }

    #[test]
    fn test_config_defaults() {
        let config = TrainingConfig::new(DatasetSource::parse("data.csv"), "models");
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.seed(), 42);
        assert_eq!(config.epochs, 100);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.validation_split, 0.2);
        assert_eq!(config.learning_rate, 0.001);
        assert!(config.scale_target);
        assert_eq!(config.models_dir(), Path::new("models"));
    }

    #[test]
    fn test_train_records_writes_artifacts() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempdir().unwrap();
        let records = synthetic_records(60);
        let cleaning = CleaningReport { total_rows: 60, ..Default::default() };

        let report = train_records(&records, cleaning, &config(dir.path())).unwrap();

        assert_eq!(report.train_rows, 48);
        assert_eq!(report.test_rows, 12);
        assert_eq!(report.history.epochs(), 5);
        let linear = report.score("Linear Regression").unwrap();
        assert!(linear.metrics.r2 > 0.999, "r2 {}", linear.metrics.r2);
        assert!(report.score("Neural Network").is_some());

        let models = dir.path().join("models");
        for file in [
            persist::FEATURE_SCALER_FILE,
            persist::TARGET_SCALER_FILE,
            persist::ENCODERS_FILE,
            persist::LINEAR_MODEL_FILE,
            persist::NETWORK_FILE,
            persist::MANIFEST_FILE,
        ] {
            assert!(models.join(file).exists(), "missing {}", file);
        }

        let manifest = persist::load_manifest(&models).unwrap();
        assert_eq!(manifest.train_rows, 48);
        assert_eq!(manifest.metrics.len(), 2);

        let rendered = report.to_string();
        assert!(rendered.contains("Model"));
        assert!(rendered.contains("Linear Regression"));
        assert!(rendered.contains("R²"));
    }

    #[test]
    fn test_unscaled_target_removes_stale_scaler() {
        let dir = tempdir().unwrap();
        let records = synthetic_records(40);
        let models = dir.path().join("models");

        train_records(&records, CleaningReport::default(), &config(dir.path())).unwrap();
        assert!(models.join(persist::TARGET_SCALER_FILE).exists());

        let unscaled = config(dir.path()).with_scale_target(false);
        let report = train_records(&records, CleaningReport::default(), &unscaled).unwrap();
        assert!(!models.join(persist::TARGET_SCALER_FILE).exists());
        assert!(report.score("Linear Regression").unwrap().metrics.r2 > 0.999);
    }

    #[test]
    fn test_too_few_rows() {
        let dir = tempdir().unwrap();
        let records = synthetic_records(1);
        let result = train_records(&records, CleaningReport::default(), &config(dir.path()));
        assert!(matches!(result, Err(TrainingError::Data(DataError::EmptySplit { .. }))));
    }

    #[test]
    fn test_missing_dataset() {
        let dir = tempdir().unwrap();
        let result = train(&config(dir.path()));
        assert!(matches!(result, Err(TrainingError::Data(_))));
    }
}
