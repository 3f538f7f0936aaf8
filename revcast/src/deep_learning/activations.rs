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

use std::fmt::Debug;

use ndarray::Array2;

/// An elementwise activation applied after a dense layer's affine transform.
pub trait Activation: Debug + Send + Sync {
    /// Applies the activation to pre-activations `z`.
    fn activate(&self, z: &Array2<f64>) -> Array2<f64>;

    /// Derivative of the activation with respect to `z`.
    fn derivative(&self, z: &Array2<f64>) -> Array2<f64>;

    /// Standard deviation of the normal weight initializer suited to this activation.
    fn initialize(&self, fan_in: usize, fan_out: usize) -> f64;

    fn name(&self) -> &str;
}

/// Rectified linear unit, He-initialized.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReluActivation;

impl ReluActivation {
    pub fn new() -> Self {
        ReluActivation
    }
}

impl Activation for ReluActivation {
    fn activate(&self, z: &Array2<f64>) -> Array2<f64> {
        z.mapv(|v| v.max(0.0))
    }

    fn derivative(&self, z: &Array2<f64>) -> Array2<f64> {
        z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
    }

    fn initialize(&self, fan_in: usize, _fan_out: usize) -> f64 {
        (2.0 / fan_in.max(1) as f64).sqrt()
    }

    fn name(&self) -> &str {
        "relu"
    }
}

/// Identity, Glorot-initialized. Used for the regression output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearActivation;

impl LinearActivation {
    pub fn new() -> Self {
        LinearActivation
    }
}

impl Activation for LinearActivation {
    fn activate(&self, z: &Array2<f64>) -> Array2<f64> {
        z.clone()
    }

    fn derivative(&self, z: &Array2<f64>) -> Array2<f64> {
        Array2::ones(z.raw_dim())
    }

    fn initialize(&self, fan_in: usize, fan_out: usize) -> f64 {
        (2.0 / (fan_in + fan_out).max(1) as f64).sqrt()
    }

    fn name(&self) -> &str {
        "linear"
    }
}

pub fn activation_from_name(name: &str) -> Option<Box<dyn Activation>> {
    match name {
        "relu" => Some(Box::new(ReluActivation)),
        "linear" => Some(Box::new(LinearActivation)),
        _ => None,
    }
}
