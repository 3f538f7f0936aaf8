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

use anyhow::Context;
use config::{Config, Environment, File};
use log::info;
use serde::Deserialize;

use revcast::data::DatasetSource;
use revcast::{TrainingConfig, train};

#[derive(Debug, Deserialize)]
struct Settings {
    dataset: String,
    models_dir: PathBuf,
    test_size: f64,
    seed: u64,
    epochs: usize,
    batch_size: usize,
    validation_split: f64,
    learning_rate: f64,
    scale_target: bool,
}

fn load_settings() -> anyhow::Result<Settings> {
    Config::builder()
        .set_default("dataset", "data/raw/revenue_prediction.csv")?
        .set_default("models_dir", "models")?
        .set_default("test_size", 0.2)?
        .set_default("seed", 42_i64)?
        .set_default("epochs", 100_i64)?
        .set_default("batch_size", 32_i64)?
        .set_default("validation_split", 0.2)?
        .set_default("learning_rate", 0.001)?
        .set_default("scale_target", true)?
        .add_source(File::with_name("train").required(false))
        .add_source(Environment::with_prefix("REVCAST_TRAIN").try_parsing(true))
        .build()
        .context("failed to read training settings")?
        .try_deserialize()
        .context("invalid training settings")
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut settings = load_settings()?;
    // A dataset passed on the command line wins over file and environment.
    if let Some(dataset) = std::env::args().nth(1) {
        settings.dataset = dataset;
    }
    info!("Training with {:?}", settings);

    let config = TrainingConfig::new(DatasetSource::parse(&settings.dataset), &settings.models_dir)
        .with_test_size(settings.test_size)
        .with_seed(settings.seed)
        .with_epochs(settings.epochs)
        .with_batch_size(settings.batch_size)
        .with_validation_split(settings.validation_split)
        .with_learning_rate(settings.learning_rate)
        .with_scale_target(settings.scale_target);

    let report =
        train(&config).with_context(|| format!("training on {} failed", settings.dataset))?;

    println!("{}", report.summary);
    println!();
    println!("{}", report);

    Ok(())
}
