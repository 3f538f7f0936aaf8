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
use std::fs;

use revcast::data::DatasetSource;
use revcast::errors::{FeatureError, PredictError};
use revcast::{ModelKind, RestaurantProfile, RevenuePredictor, TrainingConfig, train};
use tempfile::tempdir;

const CATEGORIES: [&str; 5] = ["Cafe", "Casual Dining", "Fine Dining", "Quick Service", "Sports Bar"];

fn write_dataset(path: &std::path::Path) {
    let mut csv = String::from("Franchise,Category,No_Of_Item,Order_Placed,Revenue\n");
    for i in 0..120 {
        let franchised = i % 2 == 0;
        let category = CATEGORIES[i % CATEGORIES.len()];
        let items = 15 + (i * 11) % 50;
        let orders = 10.0 + ((i * 17) % 80) as f64 * 1.5;
        let revenue = 4_000.0 * orders
            + 900.0 * items as f64
            + if franchised { 60_000.0 } else { 0.0 }
            + 150_000.0;
        let _ = writeln!(
            csv,
            "{},{},{},{},{}",
            if franchised { "Yes" } else { "No" },
            category,
            items,
            orders,
            revenue
        );
    }
    // Rows the cleaner must drop.
    csv.push_str("Yes,Cafe,0,40,200000\n");
    csv.push_str("No,Cafe,,40,200000\n");
    fs::write(path, csv).unwrap();
}

#[test]
fn train_then_predict() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempdir().unwrap();
    let dataset = dir.path().join("restaurant.csv");
    let models = dir.path().join("models");
    write_dataset(&dataset);

    let config = TrainingConfig::new(DatasetSource::parse(dataset.to_str().unwrap()), &models)
        .with_epochs(10)
        .with_batch_size(16);
    let report = train(&config).unwrap();

    assert_eq!(report.cleaning.total_rows, 122);
    assert_eq!(report.cleaning.kept(), 120);
    assert_eq!(report.train_rows + report.test_rows, 120);
    assert!(report.score("Linear Regression").unwrap().metrics.r2 > 0.999);

    let profile = RestaurantProfile::new(true, "Fine Dining", 25, 150.0);
    let expected = 4_000.0 * 150.0 + 900.0 * 25.0 + 60_000.0 + 150_000.0;

    let linear = RevenuePredictor::load(&models, ModelKind::LinearRegression).unwrap();
    let prediction = linear.predict(&profile).unwrap();
    assert!((prediction.revenue - expected).abs() < 0.01 * expected, "{:?}", prediction);
    assert!(prediction.lower < prediction.revenue && prediction.revenue < prediction.upper);

    let network = RevenuePredictor::load(&models, ModelKind::NeuralNetwork).unwrap();
    let prediction = network.predict(&profile).unwrap();
    assert!(prediction.revenue.is_finite());
    assert_eq!(prediction.model, ModelKind::NeuralNetwork);
    assert_eq!(network.categories(), &CATEGORIES);

    let zero_items = RestaurantProfile::new(false, "Cafe", 0, 10.0);
    assert!(matches!(
        network.predict(&zero_items),
        Err(PredictError::Feature(FeatureError::ZeroMenuItems))
    ));
}
