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

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    #[error("Failed to download dataset from {url}: {source}")]
    Download { url: String, source: reqwest::Error },

    #[error("Dataset has no usable rows after cleaning")]
    NoUsableRows,

    #[error("Split would leave an empty partition: {n_samples} samples with test size {test_size}")]
    EmptySplit { n_samples: usize, test_size: f64 },

    #[error("Feature rows ({rows}) and targets ({targets}) differ in length")]
    LengthMismatch { rows: usize, targets: usize },

    #[error("Test size must be in (0, 1), got {0}")]
    InvalidTestSize(f64),

    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),
}

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("Failed to open file: {0}")]
    FileOpen(#[from] std::io::Error),

    #[error("CSV file is empty")]
    EmptyFile,

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),
}

#[derive(Error, Debug, PartialEq)]
pub enum FeatureError {
    #[error("Menu item count must be at least 1")]
    ZeroMenuItems,

    #[error("Order volume must be a positive finite number, got {0}")]
    InvalidOrders(f64),

    #[error("Unknown category '{0}'")]
    UnknownCategory(String),

    #[error("Unknown franchise label '{0}'")]
    UnknownFranchise(String),

    #[error("Encoder has not been fitted")]
    NotFitted,
}

#[derive(Error, Debug, PartialEq)]
pub enum ScalerError {
    #[error("Scaler has not been fitted")]
    NotFitted,

    #[error("Input data is empty")]
    EmptyInput,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Error, Debug, PartialEq)]
pub enum LossError {
    #[error("Input data is empty")]
    EmptyInput,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Input contains NaN or infinite values")]
    InvalidNumericValue,
}

#[derive(Error, Debug, PartialEq)]
pub enum OptimizerError {
    #[error("Shape mismatch: parameter {param:?}, gradient {grad:?}")]
    ShapeMismatch { param: Vec<usize>, grad: Vec<usize> },

    #[error("Gradient contains NaN or infinite values")]
    InvalidNumericValue,

    #[error("Learning rate must be positive and finite, got {0}")]
    InvalidLearningRate(f64),
}

#[derive(Error, Debug, PartialEq)]
pub enum LayerError {
    #[error("Layer weights are not initialized")]
    UninitializedWeights,

    #[error("Layer bias is not initialized")]
    UninitializedBias,

    #[error("Backward pass called before forward pass")]
    UninitializedInput,

    #[error("Invalid input width: expected {expected}, got {actual}")]
    InvalidInputShape { expected: usize, actual: usize },

    #[error("Dropout rate must be in [0, 1), got {0}")]
    InvalidRate(f64),

    #[error("Malformed layer record: {0}")]
    MalformedRecord(String),

    #[error("Optimizer error: {0}")]
    OptimizerError(#[from] OptimizerError),
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Scaler error: {0}")]
    Scaler(#[from] ScalerError),

    #[error("Loss error: {0}")]
    Loss(#[from] LossError),

    #[error("Optimizer error: {0}")]
    Optimizer(#[from] OptimizerError),

    #[error("Layer error: {0}")]
    Layer(#[from] LayerError),

    #[error("Model has not been fitted")]
    NotFitted,

    #[error("Model has not been compiled")]
    NotCompiled,

    #[error("Model has no layers")]
    NoLayers,

    #[error("Input data is empty")]
    EmptyInput,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Normal equations are singular")]
    SingularMatrix,

    #[error("Invalid hyperparameter: {0}")]
    InvalidParameter(String),

    #[error("Training diverged at epoch {epoch}")]
    Diverged { epoch: usize },
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Artifact not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("Failed to access {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Failed to (de)serialize {}: {source}", path.display())]
    Json { path: PathBuf, source: serde_json::Error },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Invalid input: {0}")]
    Feature(#[from] FeatureError),

    #[error("Scaler error: {0}")]
    Scaler(#[from] ScalerError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Failed to load artifacts: {0}")]
    Persist(#[from] PersistError),

    #[error("Model produced a non-finite prediction")]
    NonFinite,
}

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    #[error("Scaler error: {0}")]
    Scaler(#[from] ScalerError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] LossError),

    #[error("Persist error: {0}")]
    Persist(#[from] PersistError),
}
