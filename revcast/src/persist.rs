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

//! JSON artifacts written by training and read by the predictor.
//!
//! Every artifact lives directly in a models directory under a fixed file name.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::deep_learning::{NetworkRecord, Sequential};
use crate::errors::PersistError;
use crate::features::{FEATURE_NAMES, FeatureEncoder};
use crate::metrics::RegressionMetrics;
use crate::models::LinearRegression;
use crate::scalers::StandardScaler;

pub const FEATURE_SCALER_FILE: &str = "feature_scaler.json";
pub const TARGET_SCALER_FILE: &str = "target_scaler.json";
pub const ENCODERS_FILE: &str = "encoders.json";
pub const LINEAR_MODEL_FILE: &str = "linear_regression_model.json";
pub const NETWORK_FILE: &str = "neural_network_model.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Describes a training run so the dashboard can tell what it loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub crate_version: String,
    pub feature_names: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub seed: u64,
    pub target_scaled: bool,
    /// Test-split metrics in currency units, keyed by model name.
    pub metrics: BTreeMap<String, RegressionMetrics>,
}

impl Manifest {
    pub fn new(train_rows: usize, test_rows: usize, seed: u64, target_scaled: bool) -> Self {
        Manifest {
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            train_rows,
            test_rows,
            seed,
            target_scaled,
            metrics: BTreeMap::new(),
        }
    }

    pub fn with_metrics(mut self, model: &str, metrics: RegressionMetrics) -> Self {
        self.metrics.insert(model.to_string(), metrics);
        self
    }
}

fn save_json<T: Serialize>(dir: &Path, file: &str, value: &T) -> Result<PathBuf, PersistError> {
    fs::create_dir_all(dir).map_err(|source| PersistError::Io { path: dir.to_path_buf(), source })?;
    let path = dir.join(file);
    let handle =
        fs::File::create(&path).map_err(|source| PersistError::Io { path: path.clone(), source })?;
    serde_json::to_writer_pretty(BufWriter::new(handle), value)
        .map_err(|source| PersistError::Json { path: path.clone(), source })?;
    debug!("Wrote {}", path.display());
    Ok(path)
}

fn load_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T, PersistError> {
    let path = dir.join(file);
    let handle = match fs::File::open(&path) {
        Ok(handle) => handle,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(PersistError::Missing { path }),
        Err(source) => return Err(PersistError::Io { path, source }),
    };
    serde_json::from_reader(BufReader::new(handle))
        .map_err(|source| PersistError::Json { path, source })
}

pub fn save_feature_scaler(
    dir: impl AsRef<Path>,
    scaler: &StandardScaler,
) -> Result<PathBuf, PersistError> {
    save_json(dir.as_ref(), FEATURE_SCALER_FILE, scaler)
}

pub fn load_feature_scaler(dir: impl AsRef<Path>) -> Result<StandardScaler, PersistError> {
    load_json(dir.as_ref(), FEATURE_SCALER_FILE)
}

pub fn save_target_scaler(
    dir: impl AsRef<Path>,
    scaler: &StandardScaler,
) -> Result<PathBuf, PersistError> {
    save_json(dir.as_ref(), TARGET_SCALER_FILE, scaler)
}

pub fn load_target_scaler(dir: impl AsRef<Path>) -> Result<StandardScaler, PersistError> {
    load_json(dir.as_ref(), TARGET_SCALER_FILE)
}

pub fn save_encoders(
    dir: impl AsRef<Path>,
    encoders: &FeatureEncoder,
) -> Result<PathBuf, PersistError> {
    save_json(dir.as_ref(), ENCODERS_FILE, encoders)
}

pub fn load_encoders(dir: impl AsRef<Path>) -> Result<FeatureEncoder, PersistError> {
    load_json(dir.as_ref(), ENCODERS_FILE)
}

pub fn save_linear_model(
    dir: impl AsRef<Path>,
    model: &LinearRegression,
) -> Result<PathBuf, PersistError> {
    save_json(dir.as_ref(), LINEAR_MODEL_FILE, model)
}

pub fn load_linear_model(dir: impl AsRef<Path>) -> Result<LinearRegression, PersistError> {
    load_json(dir.as_ref(), LINEAR_MODEL_FILE)
}

pub fn save_network(dir: impl AsRef<Path>, model: &Sequential) -> Result<PathBuf, PersistError> {
    save_json(dir.as_ref(), NETWORK_FILE, &model.to_record()?)
}

pub fn load_network(dir: impl AsRef<Path>) -> Result<Sequential, PersistError> {
    let record: NetworkRecord = load_json(dir.as_ref(), NETWORK_FILE)?;
    Ok(Sequential::from_record(record)?)
}

pub fn save_manifest(dir: impl AsRef<Path>, manifest: &Manifest) -> Result<PathBuf, PersistError> {
    let path = save_json(dir.as_ref(), MANIFEST_FILE, manifest)?;
    info!("Saved model artifacts to {}", dir.as_ref().display());
    Ok(path)
}

pub fn load_manifest(dir: impl AsRef<Path>) -> Result<Manifest, PersistError> {
    load_json(dir.as_ref(), MANIFEST_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Regressor;
    use crate::scalers::Scaler;
    use ndarray::array;
    use tempfile::tempdir;

    #[test]
    fn test_missing_artifact() {
        let dir = tempdir().unwrap();
        match load_feature_scaler(dir.path()) {
            Err(PersistError::Missing { path }) => {
                assert_eq!(path, dir.path().join(FEATURE_SCALER_FILE))
            }
            other => panic!("expected a missing artifact, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_artifact() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(TARGET_SCALER_FILE), "{ not json").unwrap();
        assert!(matches!(load_target_scaler(dir.path()), Err(PersistError::Json { .. })));
    }

    #[test]
    fn test_scaler_saved_to_nested_dir() {
        let dir = tempdir().unwrap();
        let models = dir.path().join("nested").join("models");
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 10.0], [3.0, 30.0]]).unwrap();

        let path = save_feature_scaler(&models, &scaler).unwrap();
        assert!(path.ends_with(FEATURE_SCALER_FILE));

        let loaded = load_feature_scaler(&models).unwrap();
        assert_eq!(loaded.mean(), scaler.mean());
        assert_eq!(loaded.scale(), scaler.scale());
    }

    #[test]
    fn test_linear_model_artifact() {
        let dir = tempdir().unwrap();
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![3.0, 5.0, 7.0];
        let mut model = LinearRegression::new().build();
        model.fit(&x, &y).unwrap();

        save_linear_model(dir.path(), &model).unwrap();
        let loaded = load_linear_model(dir.path()).unwrap();
        let predicted = loaded.predict(&array![[4.0]]).unwrap();
        assert!((predicted[0] - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_network_artifact() {
        let dir = tempdir().unwrap();
        let model = Sequential::revenue_default(5, 9).unwrap();
        save_network(dir.path(), &model).unwrap();

        let loaded = load_network(dir.path()).unwrap();
        let x = array![[1.0, 0.0, -0.5, 0.25, 2.0]];
        let expected = model.predict(&x).unwrap()[0];
        assert!((loaded.predict(&x).unwrap()[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_unbuilt_network_is_not_saved() {
        let dir = tempdir().unwrap();
        let model = Sequential::new();
        assert!(matches!(save_network(dir.path(), &model), Err(PersistError::Model(_))));
        assert!(!dir.path().join(NETWORK_FILE).exists());
    }

    #[test]
    fn test_manifest() {
        let dir = tempdir().unwrap();
        let manifest = Manifest::new(80, 20, 42, true)
            .with_metrics("Linear Regression", RegressionMetrics { mae: 1.0, mse: 2.0, r2: 0.5 });
        save_manifest(dir.path(), &manifest).unwrap();

        let loaded = load_manifest(dir.path()).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.feature_names.len(), 5);
        assert_eq!(loaded.feature_names[4], "Order_Item_Ratio");
    }
}
