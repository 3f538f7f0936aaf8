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

use log::debug;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use std::fmt::Debug;

use super::activations::{Activation, LinearActivation, activation_from_name};
use crate::errors::LayerError;
use crate::optimizers::Optimizer;

// A trait representing a neural network layer.
pub trait Layer: Debug + Send + Sync {
    /// Builds the layer for inputs of width `input_units`.
    ///
    /// # Arguments
    ///
    /// * `input_units` - The number of features each input row carries.
    /// * `rng` - Source of randomness for weight initialization and dropout masks.
    fn build(&mut self, input_units: usize, rng: &mut StdRng) -> Result<(), LayerError>;

    /// Performs the forward pass of the layer, caching what `backward` needs.
    ///
    /// # Arguments
    ///
    /// * `input` - A `(batch, input_units)` matrix.
    /// * `training` - Whether training-only behavior (dropout) is active.
    fn forward(&mut self, input: &Array2<f64>, training: bool) -> Result<Array2<f64>, LayerError>;

    /// Inference-only forward pass. Never caches and never applies dropout.
    fn infer(&self, input: &Array2<f64>) -> Result<Array2<f64>, LayerError>;

    /// Performs the backward pass of the layer.
    ///
    /// # Arguments
    ///
    /// * `grad` - The gradient with respect to this layer's output.
    ///
    /// # Returns
    ///
    /// The gradient with respect to this layer's input.
    fn backward(&mut self, grad: &Array2<f64>) -> Result<Array2<f64>, LayerError>;

    /// Applies the stored gradients. `slot` is the first optimizer slot this
    /// layer may use; a layer uses at most two.
    fn update_weights(&mut self, optimizer: &mut dyn Optimizer, slot: usize)
    -> Result<(), LayerError>;

    /// Output width for a given input width.
    fn output_units(&self, input_units: usize) -> usize;

    /// Returns the number of trainable parameters in the layer.
    fn param_count(&self) -> usize;

    /// Returns the name of the layer.
    fn name(&self) -> &str;

    /// Returns the weights of the layer as a serializable format.
    fn get_weights(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    /// Returns the layer's configuration as a serializable format.
    fn get_config(&self) -> serde_json::Value {
        serde_json::json!({})
    }

    /// Returns the type name of the layer.
    fn type_name(&self) -> String {
        std::any::type_name::<Self>().split("::").last().unwrap_or("Unknown").to_string()
    }
}

/// A persisted layer: its type, configuration and weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub layer_type: String,
    pub config: serde_json::Value,
    pub weights: serde_json::Value,
}

impl LayerRecord {
    pub fn from_layer(layer: &dyn Layer) -> Self {
        LayerRecord {
            layer_type: layer.type_name(),
            config: layer.get_config(),
            weights: layer.get_weights(),
        }
    }

    /// Rebuilds a layer. `seed` reseeds stateful randomness such as dropout masks.
    pub fn into_layer(self, seed: u64) -> Result<Box<dyn Layer>, LayerError> {
        match self.layer_type.as_str() {
            "Dense" => Ok(Box::new(Dense::from_record(&self.config, self.weights)?)),
            "Dropout" => Ok(Box::new(Dropout::from_record(&self.config, seed)?)),
            other => Err(LayerError::MalformedRecord(format!("unknown layer type '{}'", other))),
        }
    }
}

/// A dense (fully connected) layer.
#[derive(Debug)]
pub struct Dense {
    name: String,
    weights: Option<Array2<f64>>,
    bias: Option<Array2<f64>>,
    units: usize,
    activation: Box<dyn Activation>,
    trainable: bool,
    weights_grad: Option<Array2<f64>>,
    bias_grad: Option<Array2<f64>>,
    input: Option<Array2<f64>>,
    z: Option<Array2<f64>>,
}

impl Dense {
    /// Creates a new dense layer.
    ///
    /// # Arguments
    ///
    /// * `units` - The number of output units.
    /// * `activation` - The activation function to use, linear when `None`.
    /// * `trainable` - Whether the layer is trainable.
    pub fn new<A: Activation + 'static>(
        units: usize,
        activation: Option<A>,
        trainable: bool,
    ) -> Self {
        Dense {
            name: format!("dense_{}", units),
            weights: None,
            bias: None,
            units,
            activation: activation
                .map(|a| Box::new(a) as Box<dyn Activation>)
                .unwrap_or_else(|| Box::new(LinearActivation)),
            trainable,
            weights_grad: None,
            bias_grad: None,
            input: None,
            z: None,
        }
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn weights(&self) -> Option<&Array2<f64>> {
        self.weights.as_ref()
    }

    fn from_record(
        config: &serde_json::Value,
        weights: serde_json::Value,
    ) -> Result<Self, LayerError> {
        let units = config["units"]
            .as_u64()
            .ok_or_else(|| LayerError::MalformedRecord("dense layer without units".into()))?
            as usize;
        let activation_name = config["activation"].as_str().unwrap_or("linear");
        let activation = activation_from_name(activation_name).ok_or_else(|| {
            LayerError::MalformedRecord(format!("unknown activation '{}'", activation_name))
        })?;
        let trainable = config["trainable"].as_bool().unwrap_or(true);

        #[derive(Deserialize)]
        struct DenseWeights {
            weights: Array2<f64>,
            bias: Array2<f64>,
        }
        let stored: DenseWeights = serde_json::from_value(weights)
            .map_err(|e| LayerError::MalformedRecord(format!("dense weights: {}", e)))?;
        if stored.weights.ncols() != units || stored.bias.dim() != (1, units) {
            return Err(LayerError::MalformedRecord(format!(
                "dense weights do not match {} units",
                units
            )));
        }

        Ok(Dense {
            name: format!("dense_{}", units),
            weights: Some(stored.weights),
            bias: Some(stored.bias),
            units,
            activation,
            trainable,
            weights_grad: None,
            bias_grad: None,
            input: None,
            z: None,
        })
    }

    fn affine(&self, input: &Array2<f64>) -> Result<Array2<f64>, LayerError> {
        let weights = self.weights.as_ref().ok_or(LayerError::UninitializedWeights)?;
        let bias = self.bias.as_ref().ok_or(LayerError::UninitializedBias)?;
        if input.ncols() != weights.nrows() {
            return Err(LayerError::InvalidInputShape {
                expected: weights.nrows(),
                actual: input.ncols(),
            });
        }
        Ok(input.dot(weights) + bias)
    }
}

impl Layer for Dense {
    fn build(&mut self, input_units: usize, rng: &mut StdRng) -> Result<(), LayerError> {
        debug!("Building Dense layer with input units: {} and units: {}", input_units, self.units);
        if input_units == 0 || self.units == 0 {
            return Err(LayerError::InvalidInputShape { expected: 1, actual: 0 });
        }

        let stddev = self.activation.initialize(input_units, self.units);
        let normal = Normal::new(0.0, stddev)
            .map_err(|e| LayerError::MalformedRecord(format!("initializer: {}", e)))?;
        self.weights =
            Some(Array2::from_shape_simple_fn((input_units, self.units), || normal.sample(&mut *rng)));
        self.bias = Some(Array2::zeros((1, self.units)));

        Ok(())
    }

    fn forward(&mut self, input: &Array2<f64>, _training: bool) -> Result<Array2<f64>, LayerError> {
        let z = self.affine(input)?;
        let output = self.activation.activate(&z);
        self.input = Some(input.clone());
        self.z = Some(z);
        Ok(output)
    }

    fn infer(&self, input: &Array2<f64>) -> Result<Array2<f64>, LayerError> {
        Ok(self.activation.activate(&self.affine(input)?))
    }

    fn backward(&mut self, grad: &Array2<f64>) -> Result<Array2<f64>, LayerError> {
        let weights = self.weights.as_ref().ok_or(LayerError::UninitializedWeights)?;
        let input = self.input.as_ref().ok_or(LayerError::UninitializedInput)?;
        let z = self.z.as_ref().ok_or(LayerError::UninitializedInput)?;

        let dz = grad * &self.activation.derivative(z);

        if self.trainable {
            self.weights_grad = Some(input.t().dot(&dz));
            self.bias_grad = Some(dz.sum_axis(Axis(0)).insert_axis(Axis(0)));
        }

        Ok(dz.dot(&weights.t()))
    }

    fn update_weights(
        &mut self,
        optimizer: &mut dyn Optimizer,
        slot: usize,
    ) -> Result<(), LayerError> {
        if !self.trainable {
            return Ok(());
        }

        if let (Some(weights), Some(grad)) = (self.weights.as_mut(), self.weights_grad.take()) {
            optimizer.step(slot, weights, &grad)?;
        }
        if let (Some(bias), Some(grad)) = (self.bias.as_mut(), self.bias_grad.take()) {
            optimizer.step(slot + 1, bias, &grad)?;
        }

        Ok(())
    }

    fn output_units(&self, _input_units: usize) -> usize {
        self.units
    }

    fn param_count(&self) -> usize {
        let weights_count = self.weights.as_ref().map_or(0, |w| w.len());
        let bias_count = self.bias.as_ref().map_or(0, |b| b.len());
        weights_count + bias_count
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn get_weights(&self) -> serde_json::Value {
        serde_json::json!({
            "weights": self.weights,
            "bias": self.bias,
        })
    }

    fn get_config(&self) -> serde_json::Value {
        serde_json::json!({
            "units": self.units,
            "trainable": self.trainable,
            "activation": self.activation.name(),
        })
    }
}

/// Inverted dropout: zeroes a fraction `rate` of activations while training and
/// rescales the survivors, so inference is the identity.
#[derive(Debug)]
pub struct Dropout {
    name: String,
    rate: f64,
    rng: StdRng,
    mask: Option<Array2<f64>>,
}

impl Dropout {
    pub fn new(rate: f64) -> Result<Self, LayerError> {
        if !(0.0..1.0).contains(&rate) {
            return Err(LayerError::InvalidRate(rate));
        }
        Ok(Dropout {
            name: format!("dropout_{}", (rate * 100.0).round() as u32),
            rate,
            rng: StdRng::seed_from_u64(0),
            mask: None,
        })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    fn from_record(config: &serde_json::Value, seed: u64) -> Result<Self, LayerError> {
        let rate = config["rate"]
            .as_f64()
            .ok_or_else(|| LayerError::MalformedRecord("dropout layer without rate".into()))?;
        let mut layer = Dropout::new(rate)?;
        layer.rng = StdRng::seed_from_u64(seed);
        Ok(layer)
    }
}

impl Layer for Dropout {
    fn build(&mut self, _input_units: usize, rng: &mut StdRng) -> Result<(), LayerError> {
        self.rng = StdRng::seed_from_u64(rng.gen());
        Ok(())
    }

    fn forward(&mut self, input: &Array2<f64>, training: bool) -> Result<Array2<f64>, LayerError> {
        if !training || self.rate == 0.0 {
            self.mask = None;
            return Ok(input.clone());
        }
        let keep = 1.0 - self.rate;
        let rng = &mut self.rng;
        let mask = Array2::from_shape_simple_fn(input.raw_dim(), || {
            if rng.gen::<f64>() < keep { 1.0 / keep } else { 0.0 }
        });
        let output = input * &mask;
        self.mask = Some(mask);
        Ok(output)
    }

    fn infer(&self, input: &Array2<f64>) -> Result<Array2<f64>, LayerError> {
        Ok(input.clone())
    }

    fn backward(&mut self, grad: &Array2<f64>) -> Result<Array2<f64>, LayerError> {
        match self.mask.as_ref() {
            Some(mask) => Ok(grad * mask),
            None => Ok(grad.clone()),
        }
    }

    fn update_weights(
        &mut self,
        _optimizer: &mut dyn Optimizer,
        _slot: usize,
    ) -> Result<(), LayerError> {
        Ok(())
    }

    fn output_units(&self, input_units: usize) -> usize {
        input_units
    }

    fn param_count(&self) -> usize {
        0
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn get_config(&self) -> serde_json::Value {
        serde_json::json!({ "rate": self.rate })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deep_learning::activations::ReluActivation;
    use crate::optimizers::Sgd;
    use ndarray::array;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_dense_layer_forward_pass() {
        let input = array![[1.0, 2.0, 3.0]];
        let mut dense_layer = Dense::new(2, Some(ReluActivation::new()), true);
        dense_layer.build(3, &mut rng()).expect("Failed to build layer");

        let output = dense_layer.forward(&input, true).unwrap();

        assert_eq!(output.shape(), &[1, 2]);
        assert!(output.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_dense_layer_backward_pass() {
        let input = array![[1.0, 2.0, 3.0]];
        let mut dense_layer = Dense::new(2, None::<ReluActivation>, true);
        dense_layer.build(3, &mut rng()).expect("Failed to build layer");
        dense_layer.forward(&input, true).unwrap();

        let grad = array![[1.0, 2.0]];
        let input_grad = dense_layer.backward(&grad).unwrap();

        assert_eq!(input_grad.shape(), &[1, 3]);
        // Linear layer: dL/dx = grad · Wᵀ
        let expected = grad.dot(&dense_layer.weights().unwrap().t());
        assert_eq!(input_grad, expected);
        assert_eq!(dense_layer.weights_grad.as_ref().unwrap(), &input.t().dot(&grad));
    }

    #[test]
    fn test_dense_backward_before_forward() {
        let mut dense_layer = Dense::new(2, None::<ReluActivation>, true);
        dense_layer.build(3, &mut rng()).unwrap();
        assert_eq!(dense_layer.backward(&array![[1.0, 1.0]]), Err(LayerError::UninitializedInput));
    }

    #[test]
    fn test_dense_layer_initialization() {
        let dense_layer = Dense::new(5, None::<ReluActivation>, true);
        assert_eq!(dense_layer.units(), 5);
        assert!(dense_layer.weights.is_none());
        assert!(dense_layer.bias.is_none());
        assert_eq!(dense_layer.param_count(), 0);
    }

    #[test]
    fn test_dense_layer_param_count() {
        let mut dense_layer = Dense::new(6, None::<ReluActivation>, true);
        dense_layer.build(4, &mut rng()).expect("Failed to build layer");
        assert_eq!(dense_layer.param_count(), 4 * 6 + 6);
    }

    #[test]
    fn test_dense_layer_wrong_input_width() {
        let mut dense_layer = Dense::new(2, None::<ReluActivation>, true);
        dense_layer.build(3, &mut rng()).unwrap();
        assert_eq!(
            dense_layer.infer(&array![[1.0, 2.0]]),
            Err(LayerError::InvalidInputShape { expected: 3, actual: 2 })
        );
    }

    #[test]
    fn test_dense_layer_not_trainable_keeps_weights() {
        let mut dense_layer = Dense::new(2, None::<ReluActivation>, false);
        dense_layer.build(2, &mut rng()).unwrap();
        let before = dense_layer.weights().unwrap().clone();

        dense_layer.forward(&array![[1.0, 1.0]], true).unwrap();
        dense_layer.backward(&array![[1.0, 1.0]]).unwrap();
        let mut sgd = Sgd::new(0.1).unwrap();
        dense_layer.update_weights(&mut sgd, 0).unwrap();

        assert_eq!(dense_layer.weights().unwrap(), &before);
    }

    #[test]
    fn test_dense_update_moves_weights_against_gradient() {
        let mut dense_layer = Dense::new(1, None::<ReluActivation>, true);
        dense_layer.build(1, &mut rng()).unwrap();
        let before = dense_layer.weights().unwrap()[[0, 0]];

        dense_layer.forward(&array![[1.0]], true).unwrap();
        dense_layer.backward(&array![[1.0]]).unwrap();
        let mut sgd = Sgd::new(0.5).unwrap();
        dense_layer.update_weights(&mut sgd, 0).unwrap();

        assert!((dense_layer.weights().unwrap()[[0, 0]] - (before - 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_dense_record_restores_weights() {
        let mut dense_layer = Dense::new(3, Some(ReluActivation::new()), true);
        dense_layer.build(2, &mut rng()).unwrap();
        let input = array![[0.5, -1.0], [2.0, 1.0]];
        let expected = dense_layer.infer(&input).unwrap();

        let record = LayerRecord::from_layer(&dense_layer);
        assert_eq!(record.layer_type, "Dense");
        let restored = record.into_layer(0).unwrap();
        assert_eq!(restored.infer(&input).unwrap(), expected);
    }

    #[test]
    fn test_dropout_rejects_invalid_rate() {
        assert_eq!(Dropout::new(1.0).unwrap_err(), LayerError::InvalidRate(1.0));
        assert!(Dropout::new(-0.1).is_err());
    }

    #[test]
    fn test_dropout_is_identity_at_inference() {
        let mut dropout = Dropout::new(0.5).unwrap();
        dropout.build(4, &mut rng()).unwrap();
        let input = array![[1.0, 2.0, 3.0, 4.0]];
        assert_eq!(dropout.infer(&input).unwrap(), input);
        assert_eq!(dropout.forward(&input, false).unwrap(), input);
    }

    #[test]
    fn test_dropout_masks_and_rescales() {
        let mut dropout = Dropout::new(0.5).unwrap();
        dropout.build(1000, &mut rng()).unwrap();
        let input = Array2::ones((1, 1000));
        let output = dropout.forward(&input, true).unwrap();

        assert!(output.iter().all(|&v| v == 0.0 || v == 2.0));
        let kept = output.iter().filter(|&&v| v > 0.0).count();
        assert!(kept > 400 && kept < 600, "kept {}", kept);

        let grad = dropout.backward(&input).unwrap();
        assert_eq!(grad, output);
    }

    #[test]
    fn test_dropout_record() {
        let dropout = Dropout::new(0.3).unwrap();
        let record = LayerRecord::from_layer(&dropout);
        assert_eq!(record.layer_type, "Dropout");
        let restored = record.into_layer(1).unwrap();
        assert_eq!(restored.param_count(), 0);
        assert_eq!(restored.output_units(7), 7);
    }

    #[test]
    fn test_unknown_layer_record() {
        let record = LayerRecord {
            layer_type: "Conv2D".to_string(),
            config: serde_json::json!({}),
            weights: serde_json::json!({}),
        };
        assert!(matches!(record.into_layer(0), Err(LayerError::MalformedRecord(_))));
    }
}
