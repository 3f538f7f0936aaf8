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

use std::fmt::Write as _;

use log::{debug, info};
use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::activations::ReluActivation;
use super::layers::{Dense, Dropout, Layer, LayerRecord};
use crate::errors::ModelError;
use crate::losses::{LossFunction, MSE};
use crate::metrics::mean_absolute_error;
use crate::models::{Regressor, check_xy};
use crate::optimizers::Optimizer;

/// Hyperparameters of a `Sequential::fit` run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of rows held out for validation, taken from the end of the data.
    pub validation_split: f64,
    pub shuffle: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig { epochs: 100, batch_size: 32, validation_split: 0.2, shuffle: true }
    }
}

impl FitConfig {
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

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }
}

/// Per-epoch training curves. Validation curves are empty when no rows were held out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub loss: Vec<f64>,
    pub mae: Vec<f64>,
    pub val_loss: Vec<f64>,
    pub val_mae: Vec<f64>,
}

impl History {
    pub fn epochs(&self) -> usize {
        self.loss.len()
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.loss.last().copied()
    }

    pub fn final_val_loss(&self) -> Option<f64> {
        self.val_loss.last().copied()
    }
}

/// A persisted network: architecture and weights, without optimizer state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub input_units: usize,
    pub seed: u64,
    pub layers: Vec<LayerRecord>,
}

/// A stack of layers trained end to end on a single regression output.
#[derive(Debug)]
pub struct Sequential {
    layers: Vec<Box<dyn Layer>>,
    optimizer: Option<Box<dyn Optimizer>>,
    loss: Box<dyn LossFunction>,
    input_units: Option<usize>,
    seed: u64,
    rng: StdRng,
}

impl Default for Sequential {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequential {
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    pub fn with_seed(seed: u64) -> Self {
        Sequential {
            layers: Vec::new(),
            optimizer: None,
            loss: Box::new(MSE),
            input_units: None,
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The architecture used for revenue forecasting:
    /// Dense(128, relu) → Dropout(0.3) → Dense(64, relu) → Dropout(0.2) → Dense(32, relu) → Dense(1).
    pub fn revenue_default(input_units: usize, seed: u64) -> Result<Self, ModelError> {
        let mut model = Sequential::with_seed(seed)
            .add(Dense::new(128, Some(ReluActivation::new()), true))
            .add(Dropout::new(0.3)?)
            .add(Dense::new(64, Some(ReluActivation::new()), true))
            .add(Dropout::new(0.2)?)
            .add(Dense::new(32, Some(ReluActivation::new()), true))
            .add(Dense::new(1, None::<ReluActivation>, true));
        model.build(input_units)?;
        Ok(model)
    }

    pub fn add<L: Layer + 'static>(mut self, layer: L) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    /// Initializes every layer's weights for inputs of width `input_units`.
    pub fn build(&mut self, input_units: usize) -> Result<(), ModelError> {
        if self.layers.is_empty() {
            return Err(ModelError::NoLayers);
        }
        if input_units == 0 {
            return Err(ModelError::InvalidParameter("input width must be positive".into()));
        }

        let mut units = input_units;
        for layer in self.layers.iter_mut() {
            layer.build(units, &mut self.rng)?;
            units = layer.output_units(units);
        }
        if units != 1 {
            return Err(ModelError::InvalidParameter(format!(
                "the last layer must have a single unit, got {}",
                units
            )));
        }

        self.input_units = Some(input_units);
        Ok(())
    }

    pub fn compile<O, L>(&mut self, optimizer: O, loss: L)
    where
        O: Optimizer + 'static,
        L: LossFunction + 'static,
    {
        self.optimizer = Some(Box::new(optimizer));
        self.loss = Box::new(loss);
    }

    pub fn is_built(&self) -> bool {
        self.input_units.is_some()
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn param_count(&self) -> usize {
        self.layers.iter().map(|l| l.param_count()).sum()
    }

    /// Trains the network with mini-batch updates and returns the per-epoch history.
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        config: &FitConfig,
    ) -> Result<History, ModelError> {
        check_xy(x, y)?;
        if !self.is_built() {
            self.build(x.ncols())?;
        }
        self.check_width(x)?;
        if self.optimizer.is_none() {
            return Err(ModelError::NotCompiled);
        }
        if config.epochs == 0 || config.batch_size == 0 {
            return Err(ModelError::InvalidParameter(
                "epochs and batch size must be positive".into(),
            ));
        }
        if !(0.0..1.0).contains(&config.validation_split) {
            return Err(ModelError::InvalidParameter(format!(
                "validation split must be in [0, 1), got {}",
                config.validation_split
            )));
        }

        let n = x.nrows();
        let split_at = ((n as f64) * (1.0 - config.validation_split)).floor() as usize;
        if split_at == 0 {
            return Err(ModelError::InvalidParameter(format!(
                "validation split {} leaves no training rows out of {}",
                config.validation_split, n
            )));
        }
        let (x_train, x_val) = x.view().split_at(Axis(0), split_at);
        let (y_train, y_val) = y.view().split_at(Axis(0), split_at);
        let (x_train, y_train) = (x_train.to_owned(), y_train.to_owned());
        info!(
            "Training on {} rows, validating on {} rows for {} epochs",
            x_train.nrows(),
            x_val.nrows(),
            config.epochs
        );

        let mut history = History::default();
        let mut indices: Vec<usize> = (0..x_train.nrows()).collect();

        for epoch in 0..config.epochs {
            if config.shuffle {
                indices.shuffle(&mut self.rng);
            }

            let mut loss_sum = 0.0;
            let mut mae_sum = 0.0;
            for batch in indices.chunks(config.batch_size) {
                let xb = x_train.select(Axis(0), batch);
                let yb = y_train.select(Axis(0), batch);
                let (loss, mae) = self.train_batch(&xb, &yb, epoch)?;
                loss_sum += loss * batch.len() as f64;
                mae_sum += mae * batch.len() as f64;
            }

            let rows = x_train.nrows() as f64;
            let (loss, mae) = (loss_sum / rows, mae_sum / rows);
            if !loss.is_finite() {
                return Err(ModelError::Diverged { epoch });
            }
            history.loss.push(loss);
            history.mae.push(mae);

            if x_val.nrows() > 0 {
                let (val_loss, val_mae) = self.evaluate(&x_val.to_owned(), &y_val.to_owned())?;
                history.val_loss.push(val_loss);
                history.val_mae.push(val_mae);
                debug!(
                    "Epoch {}/{}: loss={:.6} mae={:.6} val_loss={:.6} val_mae={:.6}",
                    epoch + 1,
                    config.epochs,
                    loss,
                    mae,
                    val_loss,
                    val_mae
                );
            } else {
                debug!("Epoch {}/{}: loss={:.6} mae={:.6}", epoch + 1, config.epochs, loss, mae);
            }
        }

        Ok(history)
    }

    fn train_batch(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        epoch: usize,
    ) -> Result<(f64, f64), ModelError> {
        let mut output = x.clone();
        for layer in self.layers.iter_mut() {
            output = layer.forward(&output, true)?;
        }
        let predictions = output.column(0).to_owned();
        if predictions.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Diverged { epoch });
        }

        let loss = self.loss.calculate(&predictions, y)?;
        let mae = mean_absolute_error(y, &predictions)?;

        let mut grad = self.loss.gradient(&predictions, y)?.insert_axis(Axis(1));
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad)?;
        }

        let optimizer = self.optimizer.as_deref_mut().ok_or(ModelError::NotCompiled)?;
        for (i, layer) in self.layers.iter_mut().enumerate() {
            layer.update_weights(optimizer, i * 2).map_err(|e| match e {
                crate::errors::LayerError::OptimizerError(_) => ModelError::Diverged { epoch },
                other => ModelError::Layer(other),
            })?;
        }

        Ok((loss, mae))
    }

    /// Loss and mean absolute error on `(x, y)`, in the target's units.
    pub fn evaluate(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(f64, f64), ModelError> {
        check_xy(x, y)?;
        let predictions = self.predict(x)?;
        Ok((self.loss.calculate(&predictions, y)?, mean_absolute_error(y, &predictions)?))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        if x.nrows() == 0 {
            return Err(ModelError::EmptyInput);
        }
        self.check_width(x)?;

        let mut output = x.clone();
        for layer in &self.layers {
            output = layer.infer(&output)?;
        }
        Ok(output.column(0).to_owned())
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<(), ModelError> {
        let expected = self.input_units.ok_or(ModelError::NotFitted)?;
        if x.ncols() != expected {
            return Err(ModelError::DimensionMismatch { expected, actual: x.ncols() });
        }
        Ok(())
    }

    /// A Keras-style text summary of the layer stack.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "{:<24}{:<18}{:>10}", "Layer (type)", "Output Shape", "Param #");
        let _ = writeln!(s, "{}", "=".repeat(52));

        let mut units = self.input_units.unwrap_or(0);
        for layer in &self.layers {
            units = layer.output_units(units);
            let label = format!("{} ({})", layer.name(), layer.type_name());
            let _ = writeln!(
                s,
                "{:<24}{:<18}{:>10}",
                label,
                format!("(None, {})", units),
                layer.param_count()
            );
        }

        let _ = writeln!(s, "{}", "=".repeat(52));
        let _ = writeln!(s, "Total params: {}", self.param_count());
        s
    }

    pub fn to_record(&self) -> Result<NetworkRecord, ModelError> {
        let input_units = self.input_units.ok_or(ModelError::NotFitted)?;
        Ok(NetworkRecord {
            input_units,
            seed: self.seed,
            layers: self.layers.iter().map(|l| LayerRecord::from_layer(l.as_ref())).collect(),
        })
    }

    /// Rebuilds a trained network for inference. Compile it again before further training.
    pub fn from_record(record: NetworkRecord) -> Result<Self, ModelError> {
        if record.layers.is_empty() {
            return Err(ModelError::NoLayers);
        }

        let mut model = Sequential::with_seed(record.seed);
        let mut units = record.input_units;
        for (i, layer_record) in record.layers.into_iter().enumerate() {
            let layer = layer_record.into_layer(record.seed.wrapping_add(i as u64))?;
            units = layer.output_units(units);
            model.layers.push(layer);
        }
        if units != 1 {
            return Err(ModelError::InvalidParameter(format!(
                "the last layer must have a single unit, got {}",
                units
            )));
        }
        model.input_units = Some(record.input_units);
        Ok(model)
    }
}

impl Regressor for Sequential {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        Sequential::predict(self, x)
    }

    fn n_features(&self) -> Option<usize> {
        self.input_units
    }

    fn name(&self) -> &str {
        "Neural Network"
    }
}
