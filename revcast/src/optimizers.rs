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

use std::collections::HashMap;
use std::fmt::Debug;

use ndarray::Array2;

use crate::errors::OptimizerError;

/// Updates parameter tensors in place from their gradients.
///
/// Every parameter tensor owns a `slot`; stateful optimizers keep their moment
/// estimates per slot, so the same slot must always be passed for the same tensor.
pub trait Optimizer: Debug + Send + Sync {
    fn step(
        &mut self,
        slot: usize,
        param: &mut Array2<f64>,
        grad: &Array2<f64>,
    ) -> Result<(), OptimizerError>;

    fn learning_rate(&self) -> f64;

    fn name(&self) -> &str;
}

fn check_step(param: &Array2<f64>, grad: &Array2<f64>) -> Result<(), OptimizerError> {
    if param.shape() != grad.shape() {
        return Err(OptimizerError::ShapeMismatch {
            param: param.shape().to_vec(),
            grad: grad.shape().to_vec(),
        });
    }
    if grad.iter().any(|v| !v.is_finite()) {
        return Err(OptimizerError::InvalidNumericValue);
    }
    Ok(())
}

fn check_learning_rate(learning_rate: f64) -> Result<(), OptimizerError> {
    if learning_rate <= 0.0 || !learning_rate.is_finite() {
        return Err(OptimizerError::InvalidLearningRate(learning_rate));
    }
    Ok(())
}

/// Plain stochastic gradient descent.
#[derive(Debug, Clone)]
pub struct Sgd {
    learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Result<Self, OptimizerError> {
        check_learning_rate(learning_rate)?;
        Ok(Sgd { learning_rate })
    }
}

impl Optimizer for Sgd {
    fn step(
        &mut self,
        _slot: usize,
        param: &mut Array2<f64>,
        grad: &Array2<f64>,
    ) -> Result<(), OptimizerError> {
        check_step(param, grad)?;
        param.scaled_add(-self.learning_rate, grad);
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn name(&self) -> &str {
        "sgd"
    }
}

#[derive(Debug, Clone)]
struct AdamState {
    m: Array2<f64>,
    v: Array2<f64>,
    t: i32,
}

/// Adam with bias-corrected moment estimates.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    state: HashMap<usize, AdamState>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Result<Self, OptimizerError> {
        check_learning_rate(learning_rate)?;
        Ok(Adam { learning_rate, beta1: 0.9, beta2: 0.999, epsilon: 1e-7, state: HashMap::new() })
    }

    pub fn with_betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

impl Default for Adam {
    fn default() -> Self {
        Adam {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            state: HashMap::new(),
        }
    }
}

impl Optimizer for Adam {
    fn step(
        &mut self,
        slot: usize,
        param: &mut Array2<f64>,
        grad: &Array2<f64>,
    ) -> Result<(), OptimizerError> {
        check_step(param, grad)?;

        let state = self.state.entry(slot).or_insert_with(|| AdamState {
            m: Array2::zeros(param.raw_dim()),
            v: Array2::zeros(param.raw_dim()),
            t: 0,
        });
        if state.m.shape() != param.shape() {
            return Err(OptimizerError::ShapeMismatch {
                param: param.shape().to_vec(),
                grad: state.m.shape().to_vec(),
            });
        }

        state.t += 1;
        let (beta1, beta2) = (self.beta1, self.beta2);
        state.m.zip_mut_with(grad, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        state.v.zip_mut_with(grad, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        let m_correction = 1.0 - beta1.powi(state.t);
        let v_correction = 1.0 - beta2.powi(state.t);
        let (lr, eps) = (self.learning_rate, self.epsilon);

        ndarray::Zip::from(param).and(&state.m).and(&state.v).for_each(|p, &m, &v| {
            let m_hat = m / m_correction;
            let v_hat = v / v_correction;
            *p -= lr * m_hat / (v_hat.sqrt() + eps);
        });

        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn name(&self) -> &str {
        "adam"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sgd_step() {
        let mut sgd = Sgd::new(0.5).unwrap();
        let mut param = array![[1.0, 2.0]];
        sgd.step(0, &mut param, &array![[2.0, -2.0]]).unwrap();
        assert_eq!(param, array![[0.0, 3.0]]);
    }

    #[test]
    fn test_invalid_learning_rate() {
        assert_eq!(Sgd::new(0.0).unwrap_err(), OptimizerError::InvalidLearningRate(0.0));
        assert!(Adam::new(f64::NAN).is_err());
    }

    #[test]
    fn test_shape_mismatch() {
        let mut adam = Adam::default();
        let mut param = array![[1.0, 2.0]];
        let result = adam.step(0, &mut param, &array![[1.0], [2.0]]);
        assert!(matches!(result, Err(OptimizerError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_non_finite_gradient() {
        let mut sgd = Sgd::new(0.1).unwrap();
        let mut param = array![[1.0]];
        let result = sgd.step(0, &mut param, &array![[f64::INFINITY]]);
        assert_eq!(result, Err(OptimizerError::InvalidNumericValue));
        assert_eq!(param, array![[1.0]]);
    }

    #[test]
    fn test_adam_first_step_moves_by_learning_rate() {
        // With bias correction the first update is lr * sign(grad).
        let mut adam = Adam::new(0.1).unwrap();
        let mut param = array![[1.0, 1.0]];
        adam.step(0, &mut param, &array![[4.0, -0.5]]).unwrap();
        assert!((param[[0, 0]] - 0.9).abs() < 1e-6);
        assert!((param[[0, 1]] - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_adam_minimizes_quadratic() {
        let mut adam = Adam::new(0.05).unwrap();
        let mut param = array![[5.0]];
        for _ in 0..2000 {
            let grad = param.mapv(|p| 2.0 * (p - 3.0));
            adam.step(7, &mut param, &grad).unwrap();
        }
        assert!((param[[0, 0]] - 3.0).abs() < 1e-2, "got {}", param[[0, 0]]);
    }
}
