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

//! Static chart data shown next to a prediction.
//!
//! These figures are illustrative and hard-coded; they are not derived from
//! the training data or the model.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

impl ChartPoint {
    fn new(label: &str, value: f64) -> Self {
        ChartPoint { label: label.to_string(), value }
    }
}

/// Everything the dashboard's insight panels render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub drivers: Vec<ChartPoint>,
    pub trend: Vec<ChartPoint>,
    pub category_revenue: Vec<ChartPoint>,
    pub accuracy: Vec<ChartPoint>,
    pub monthly_trend: Vec<ChartPoint>,
}

impl Insights {
    pub fn new(prediction: Option<f64>) -> Self {
        Insights {
            drivers: revenue_drivers(),
            trend: revenue_trend(prediction),
            category_revenue: sample_category_revenue(),
            accuracy: accuracy_breakdown(),
            monthly_trend: monthly_trend(),
        }
    }
}

/// Share of revenue attributed to each factor. Sums to 1.
pub fn revenue_drivers() -> Vec<ChartPoint> {
    vec![
        ChartPoint::new("Orders", 0.35),
        ChartPoint::new("Menu Size", 0.25),
        ChartPoint::new("Category", 0.20),
        ChartPoint::new("Franchise", 0.15),
        ChartPoint::new("Other", 0.05),
    ]
}

/// Four months of example history, followed by the prediction as May when present.
pub fn revenue_trend(prediction: Option<f64>) -> Vec<ChartPoint> {
    let mut trend = vec![
        ChartPoint::new("Jan", 120_000.0),
        ChartPoint::new("Feb", 135_000.0),
        ChartPoint::new("Mar", 125_000.0),
        ChartPoint::new("Apr", 145_000.0),
    ];
    if let Some(value) = prediction {
        trend.push(ChartPoint::new("May", value));
    }
    trend
}

pub fn sample_category_revenue() -> Vec<ChartPoint> {
    vec![
        ChartPoint::new("Fast Food", 250_000.0),
        ChartPoint::new("Casual Dining", 450_000.0),
        ChartPoint::new("Fine Dining", 750_000.0),
    ]
}

/// Prediction accuracy pie, in percent.
pub fn accuracy_breakdown() -> Vec<ChartPoint> {
    vec![ChartPoint::new("Model Accuracy", 85.0), ChartPoint::new("Error Margin", 15.0)]
}

/// Example monthly revenue, in millions.
pub fn monthly_trend() -> Vec<ChartPoint> {
    ["Jan", "Feb", "Mar", "Apr", "May"]
        .into_iter()
        .zip([2.5, 2.8, 3.1, 2.9, 3.2])
        .map(|(month, value)| ChartPoint::new(month, value))
        .collect()
}

/// Formats a rupee amount rounded to whole units with thousands separators, e.g. `₹ 1,234,567`.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded < 0.0 { format!("-₹ {}", grouped) } else { format!("₹ {}", grouped) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drivers_sum_to_one() {
        let drivers = revenue_drivers();
        assert_eq!(drivers.len(), 5);
        assert_eq!(drivers[0], ChartPoint::new("Orders", 0.35));
        let total: f64 = drivers.iter().map(|p| p.value).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_trend_appends_prediction() {
        assert_eq!(revenue_trend(None).len(), 4);

        let trend = revenue_trend(Some(150_000.0));
        assert_eq!(trend.len(), 5);
        assert_eq!(trend[4], ChartPoint::new("May", 150_000.0));
        assert_eq!(trend[3].value, 145_000.0);
    }

    #[test]
    fn test_category_revenue() {
        let labels: Vec<_> = sample_category_revenue().into_iter().map(|p| p.label).collect();
        assert_eq!(labels, ["Fast Food", "Casual Dining", "Fine Dining"]);
    }

    #[test]
    fn test_accuracy_breakdown_sums_to_hundred() {
        let accuracy = accuracy_breakdown();
        assert_eq!(accuracy[0], ChartPoint::new("Model Accuracy", 85.0));
        assert_eq!(accuracy.iter().map(|p| p.value).sum::<f64>(), 100.0);
    }

    #[test]
    fn test_monthly_trend() {
        let trend = monthly_trend();
        assert_eq!(trend.len(), 5);
        assert_eq!(trend[2], ChartPoint::new("Mar", 3.1));
        assert_eq!(trend[4], ChartPoint::new("May", 3.2));
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "₹ 0");
        assert_eq!(format_currency(999.4), "₹ 999");
        assert_eq!(format_currency(1000.0), "₹ 1,000");
        assert_eq!(format_currency(1_234_567.49), "₹ 1,234,567");
        assert_eq!(format_currency(-25_000.0), "-₹ 25,000");
    }

    #[test]
    fn test_insights_serialize() {
        let json = serde_json::to_value(Insights::new(Some(1.0))).unwrap();
        assert_eq!(json["drivers"][1]["label"], "Menu Size");
        assert_eq!(json["trend"].as_array().unwrap().len(), 5);
        assert_eq!(json["accuracy"][1]["label"], "Error Margin");
        assert_eq!(json["monthly_trend"].as_array().unwrap().len(), 5);
    }
}
