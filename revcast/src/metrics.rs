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

//! Regression metrics with scikit-learn semantics.

use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::errors::LossError;
use crate::losses::validate_pair;

pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64, LossError> {
    validate_pair(y_pred, y_true)?;
    (y_true - y_pred).mapv(f64::abs).mean().ok_or(LossError::EmptyInput)
}

pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64, LossError> {
    validate_pair(y_pred, y_true)?;
    (y_true - y_pred).mapv(|d| d * d).mean().ok_or(LossError::EmptyInput)
}

/// Coefficient of determination.
///
/// A constant `y_true` has no variance to explain: the score is 1.0 for an
/// exact fit and 0.0 otherwise.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64, LossError> {
    validate_pair(y_pred, y_true)?;
    let mean = y_true.mean().ok_or(LossError::EmptyInput)?;
    let ss_res: f64 = (y_true - y_pred).mapv(|d| d * d).sum();
    let ss_tot: f64 = y_true.mapv(|v| (v - mean) * (v - mean)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub mse: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn evaluate(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self, LossError> {
        Ok(RegressionMetrics {
            mae: mean_absolute_error(y_true, y_pred)?,
            mse: mean_squared_error(y_true, y_pred)?,
            r2: r2_score(y_true, y_pred)?,
        })
    }

    pub fn rmse(&self) -> f64 {
        self.mse.sqrt()
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MAE={:.4} MSE={:.4} R²={:.4}", self.mae, self.mse, self.r2)
    }
}
