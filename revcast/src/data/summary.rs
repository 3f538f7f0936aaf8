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

use std::collections::BTreeMap;
use std::fmt;

use crate::data::RestaurantRecord;

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (`ddof = 1`), NaN for a single value.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnSummary {
    fn from_values(name: &str, values: &[f64]) -> Self {
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
        } else {
            f64::NAN
        };
        ColumnSummary {
            name: name.to_string(),
            count,
            mean,
            std,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

fn column(records: &[RestaurantRecord], f: impl Fn(&RestaurantRecord) -> f64) -> Vec<f64> {
    records.iter().map(f).collect()
}

/// Inspection summary of a cleaned dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub rows: usize,
    pub numeric: Vec<ColumnSummary>,
    pub franchise_counts: BTreeMap<String, usize>,
    pub category_counts: BTreeMap<String, usize>,
}

impl DatasetSummary {
    /// Returns `None` for an empty slice.
    pub fn describe(records: &[RestaurantRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let numeric = vec![
            ColumnSummary::from_values("No_Of_Item", &column(records, |r| r.no_of_item)),
            ColumnSummary::from_values("Order_Placed", &column(records, |r| r.order_placed)),
            ColumnSummary::from_values("Revenue", &column(records, |r| r.revenue)),
        ];

        let mut franchise_counts = BTreeMap::new();
        let mut category_counts = BTreeMap::new();
        for record in records {
            *franchise_counts.entry(record.franchise.clone()).or_insert(0) += 1;
            *category_counts.entry(record.category.clone()).or_insert(0) += 1;
        }

        Some(DatasetSummary { rows: records.len(), numeric, franchise_counts, category_counts })
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rows: {}", self.rows)?;
        writeln!(
            f,
            "{:<14} {:>8} {:>14} {:>14} {:>14} {:>14}",
            "column", "count", "mean", "std", "min", "max"
        )?;
        for c in &self.numeric {
            writeln!(
                f,
                "{:<14} {:>8} {:>14.3} {:>14.3} {:>14.3} {:>14.3}",
                c.name, c.count, c.mean, c.std, c.min, c.max
            )?;
        }
        writeln!(f, "Franchise: {:?}", self.franchise_counts)?;
        write!(f, "Category: {:?}", self.category_counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(franchise: &str, category: &str, items: f64, orders: f64, revenue: f64) -> RestaurantRecord {
        RestaurantRecord {
            franchise: franchise.to_string(),
            category: category.to_string(),
            no_of_item: items,
            order_placed: orders,
            revenue,
        }
    }

    #[test]
    fn test_describe_numeric_columns() {
        let records = vec![
            record("Yes", "Cafe", 10.0, 100.0, 1000.0),
            record("No", "Cafe", 20.0, 200.0, 3000.0),
            record("No", "Fine Dining", 30.0, 300.0, 5000.0),
        ];
        let summary = DatasetSummary::describe(&records).unwrap();

        assert_eq!(summary.rows, 3);
        let items = &summary.numeric[0];
        assert_eq!(items.mean, 20.0);
        assert_eq!(items.std, 10.0);
        assert_eq!(items.min, 10.0);
        assert_eq!(items.max, 30.0);
        assert_eq!(summary.category_counts["Cafe"], 2);
        assert_eq!(summary.franchise_counts["No"], 2);
        assert!(summary.to_string().contains("Revenue"));
    }

    #[test]
    fn test_describe_empty() {
        assert!(DatasetSummary::describe(&[]).is_none());
    }
}
