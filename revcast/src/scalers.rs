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

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::errors::ScalerError;

pub trait Scaler {
    fn fit(&mut self, x: &Array2<f64>) -> Result<(), ScalerError>;

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, ScalerError>;

    fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, ScalerError>;

    fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>, ScalerError> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Per-column standardization to zero mean and unit variance.
///
/// Uses the population standard deviation (`ddof = 0`). Columns with zero
/// variance are scaled by 1 so they map to 0 instead of NaN.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        StandardScaler { mean: None, scale: None }
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some() && self.scale.is_some()
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }

    pub fn n_features(&self) -> Option<usize> {
        self.mean.as_ref().map(|m| m.len())
    }

    /// Fits on a single column, for scaling a regression target.
    pub fn fit_target(&mut self, y: &Array1<f64>) -> Result<(), ScalerError> {
        self.fit(&y.clone().insert_axis(Axis(1)))
    }

    pub fn transform_target(&self, y: &Array1<f64>) -> Result<Array1<f64>, ScalerError> {
        Ok(self.transform(&y.clone().insert_axis(Axis(1)))?.remove_axis(Axis(1)))
    }

    pub fn inverse_transform_target(&self, y: &Array1<f64>) -> Result<Array1<f64>, ScalerError> {
        Ok(self.inverse_transform(&y.clone().insert_axis(Axis(1)))?.remove_axis(Axis(1)))
    }

    fn fitted(&self, x: &Array2<f64>) -> Result<(&Array1<f64>, &Array1<f64>), ScalerError> {
        let mean = self.mean.as_ref().ok_or(ScalerError::NotFitted)?;
        let scale = self.scale.as_ref().ok_or(ScalerError::NotFitted)?;
        if x.ncols() != mean.len() {
            return Err(ScalerError::DimensionMismatch { expected: mean.len(), actual: x.ncols() });
        }
        Ok((mean, scale))
    }
}

impl Scaler for StandardScaler {
    fn fit(&mut self, x: &Array2<f64>) -> Result<(), ScalerError> {
        if x.is_empty() {
            return Err(ScalerError::EmptyInput);
        }
        let mean = x.mean_axis(Axis(0)).ok_or(ScalerError::EmptyInput)?;
        let std = x.std_axis(Axis(0), 0.0);
        self.mean = Some(mean);
        self.scale = Some(std.mapv(|s| if s == 0.0 { 1.0 } else { s }));
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, ScalerError> {
        let (mean, scale) = self.fitted(x)?;
        Ok((x - mean) / scale)
    }

    fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, ScalerError> {
        let (mean, scale) = self.fitted(x)?;
        Ok(x * scale + mean)
    }
}
