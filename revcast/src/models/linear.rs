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

use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::errors::{LossError, ModelError};
use crate::losses::{LossFunction, MSE};
use crate::models::{Regressor, check_xy};
use crate::optimizers::{Optimizer, Sgd};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Solver {
    /// Ordinary least squares through the normal equations.
    LeastSquares,
    /// Full-batch gradient descent on mean squared error.
    GradientDescent { learning_rate: f64, epochs: usize },
}

pub struct LinearRegressionBuilder {
    solver: Solver,
}

impl LinearRegressionBuilder {
    pub fn solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    pub fn build(self) -> LinearRegression {
        LinearRegression { weights: None, bias: 0.0, solver: self.solver }
    }
}

/// Linear baseline: `y = x · w + b`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    weights: Option<Array1<f64>>,
    bias: f64,
    solver: Solver,
}

impl LinearRegression {
    pub fn new() -> LinearRegressionBuilder {
        LinearRegressionBuilder { solver: Solver::LeastSquares }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        check_xy(x, y)?;

        let (weights, bias) = match self.solver {
            Solver::LeastSquares => least_squares(x, y)?,
            Solver::GradientDescent { learning_rate, epochs } => {
                gradient_descent(x, y, learning_rate, epochs)?
            }
        };
        debug!("Fitted linear regression: weights={:?}, bias={}", weights, bias);

        self.weights = Some(weights);
        self.bias = bias;
        Ok(())
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.weights.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.bias
    }

    pub fn solver(&self) -> Solver {
        self.solver
    }

    pub fn calculate_loss(
        &self,
        predictions: &Array1<f64>,
        actuals: &Array1<f64>,
    ) -> Result<f64, LossError> {
        MSE.calculate(predictions, actuals)
    }
}

impl Regressor for LinearRegression {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let weights = self.weights.as_ref().ok_or(ModelError::NotFitted)?;
        if x.ncols() != weights.len() {
            return Err(ModelError::DimensionMismatch { expected: weights.len(), actual: x.ncols() });
        }
        Ok(x.dot(weights) + self.bias)
    }

    fn n_features(&self) -> Option<usize> {
        self.weights.as_ref().map(|w| w.len())
    }

    fn name(&self) -> &str {
        "Linear Regression"
    }
}

/// Solves the centered normal equations, so the intercept is exact and
/// never regularized.
fn least_squares(x: &Array2<f64>, y: &Array1<f64>) -> Result<(Array1<f64>, f64), ModelError> {
    let x_mean = x.mean_axis(Axis(0)).ok_or(ModelError::EmptyInput)?;
    let y_mean = y.mean().ok_or(ModelError::EmptyInput)?;
    let xc = x - &x_mean;
    let yc = y - y_mean;

    let gram = xc.t().dot(&xc);
    let rhs = xc.t().dot(&yc);

    let weights = match solve(gram.clone(), rhs.clone()) {
        Some(w) => w,
        None => {
            // Collinear or constant columns: a tiny ridge picks the smallest solution.
            let n = gram.nrows().max(1) as f64;
            let ridge = (gram.diag().sum() / n).max(1.0) * 1e-10;
            warn!("Normal equations are singular, retrying with ridge {:e}", ridge);
            let mut regularized = gram;
            regularized.diag_mut().mapv_inplace(|d| d + ridge);
            solve(regularized, rhs).ok_or(ModelError::SingularMatrix)?
        }
    };

    let bias = y_mean - x_mean.dot(&weights);
    Ok((weights, bias))
}

/// Gaussian elimination with partial pivoting. `None` when the matrix is singular.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(f64::MIN_POSITIVE);
    let tolerance = scale * 1e-12;

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() <= tolerance {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap([pivot, k], [col, k]);
            }
            b.swap(pivot, col);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let mut sum = b[row];
        for k in row + 1..n {
            sum -= a[[row, k]] * x[k];
        }
        x[row] = sum / a[[row, row]];
    }
    x.iter().all(|v: &f64| v.is_finite()).then_some(x)
}

fn gradient_descent(
    x: &Array2<f64>,
    y: &Array1<f64>,
    learning_rate: f64,
    epochs: usize,
) -> Result<(Array1<f64>, f64), ModelError> {
    let mut optimizer = Sgd::new(learning_rate)?;
    let n_features = x.ncols();
    let mut weights = Array2::zeros((n_features, 1));
    let mut bias = Array2::zeros((1, 1));

    for epoch in 0..epochs {
        let predictions = x.dot(&weights).remove_axis(Axis(1)) + bias[[0, 0]];
        let grad_pred = MSE.gradient(&predictions, y).map_err(|_| ModelError::Diverged { epoch })?;

        let grad_weights = x.t().dot(&grad_pred).insert_axis(Axis(1));
        let grad_bias = Array2::from_elem((1, 1), grad_pred.sum());

        optimizer.step(0, &mut weights, &grad_weights).map_err(|_| ModelError::Diverged { epoch })?;
        optimizer.step(1, &mut bias, &grad_bias).map_err(|_| ModelError::Diverged { epoch })?;
    }

    Ok((weights.remove_axis(Axis(1)), bias[[0, 0]]))
}
