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

//! Restaurant revenue forecasting.
//!
//! Raw restaurant rows are cleaned, encoded into the five-feature contract in
//! [`features`], standardized, and fit with a linear baseline and a
//! feed-forward network. [`training`] runs the whole recipe and writes JSON
//! artifacts; [`predictor::RevenuePredictor`] loads them back to score
//! individual restaurants.

pub mod data;
pub mod deep_learning;
pub mod errors;
pub mod features;
pub mod insights;
pub mod losses;
pub mod metrics;
pub mod models;
pub mod optimizers;
pub mod persist;
pub mod predictor;
pub mod scalers;
pub mod training;

pub use ndarray;

pub use features::{FEATURE_NAMES, FeatureEncoder, RestaurantProfile};
pub use predictor::{ModelKind, Prediction, RevenuePredictor};
pub use training::{TrainingConfig, TrainingReport, train};
