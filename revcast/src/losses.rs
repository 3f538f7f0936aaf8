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

use ndarray::Array1;

use crate::errors::LossError;

pub trait LossFunction: Debug + Send + Sync {
    fn calculate(&self, predictions: &Array1<f64>, actuals: &Array1<f64>)
    -> Result<f64, LossError>;

    /// Gradient of the loss with respect to each prediction.
    fn gradient(
        &self,
        predictions: &Array1<f64>,
        actuals: &Array1<f64>,
    ) -> Result<Array1<f64>, LossError>;

    fn name(&self) -> &str;
}

pub(crate) fn validate_pair(
    predictions: &Array1<f64>,
    actuals: &Array1<f64>,
) -> Result<(), LossError> {
    if predictions.is_empty() || actuals.is_empty() {
        return Err(LossError::EmptyInput);
    }

    if predictions.len() != actuals.len() {
        return Err(LossError::DimensionMismatch {
            expected: predictions.len(),
            actual: actuals.len(),
        });
    }

    if predictions.iter().any(|&v| !v.is_finite()) || actuals.iter().any(|&v| !v.is_finite()) {
        return Err(LossError::InvalidNumericValue);
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MSE;

impl LossFunction for MSE {
    fn calculate(
        &self,
        predictions: &Array1<f64>,
        actuals: &Array1<f64>,
    ) -> Result<f64, LossError> {
        validate_pair(predictions, actuals)?;

        let diff = predictions - actuals;
        let mse = diff.mapv(|x| x * x).mean().ok_or(LossError::EmptyInput)?;
        Ok(mse)
    }

    fn gradient(
        &self,
        predictions: &Array1<f64>,
        actuals: &Array1<f64>,
    ) -> Result<Array1<f64>, LossError> {
        validate_pair(predictions, actuals)?;

        let n = predictions.len() as f64;
        Ok((predictions - actuals) * (2.0 / n))
    }

    fn name(&self) -> &str {
        "mean_squared_error"
    }
}
