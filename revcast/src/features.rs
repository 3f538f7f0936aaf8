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

//! The fixed five-feature preprocessing contract.
//!
//! Every model is fit on, and must be fed, rows in exactly this order:
//! `[franchise, category_code, menu_items, orders, orders / menu_items]`.

use std::collections::BTreeSet;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::data::RestaurantRecord;
use crate::errors::FeatureError;

pub const N_FEATURES: usize = 5;

pub const FEATURE_NAMES: [&str; N_FEATURES] =
    ["Franchise", "Category", "No_Of_Item", "Order_Placed", "Order_Item_Ratio"];

const FRANCHISED_LABELS: [&str; 6] = ["yes", "y", "true", "1", "franchised", "franchise"];
const INDEPENDENT_LABELS: [&str; 5] = ["no", "n", "false", "0", "independent"];

/// Orders per menu item. Undefined without menu items, so that case is an error.
pub fn order_item_ratio(orders: f64, menu_items: f64) -> Result<f64, FeatureError> {
    if menu_items == 0.0 {
        return Err(FeatureError::ZeroMenuItems);
    }
    Ok(orders / menu_items)
}

/// Assembles one feature row in model order.
pub fn feature_row(
    franchise_code: f64,
    category_code: f64,
    menu_items: f64,
    orders: f64,
) -> Result<[f64; N_FEATURES], FeatureError> {
    let ratio = order_item_ratio(orders, menu_items)?;
    Ok([franchise_code, category_code, menu_items, orders, ratio])
}

/// Maps labels to integer codes: sorted distinct labels, code = position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    labels: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let labels: BTreeSet<&str> = values.into_iter().collect();
        LabelEncoder { labels: labels.into_iter().map(str::to_string).collect() }
    }

    /// Exact match first, then a case-insensitive one.
    pub fn encode(&self, label: &str) -> Option<usize> {
        let label = label.trim();
        self.labels
            .binary_search_by(|l| l.as_str().cmp(label))
            .ok()
            .or_else(|| self.labels.iter().position(|l| l.eq_ignore_ascii_case(label)))
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Restaurant attributes as entered on the dashboard form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantProfile {
    pub franchised: bool,
    pub category: String,
    pub menu_items: u32,
    /// Monthly orders, in thousands.
    pub orders: f64,
}

impl RestaurantProfile {
    pub fn new(franchised: bool, category: &str, menu_items: u32, orders: f64) -> Self {
        RestaurantProfile { franchised, category: category.to_string(), menu_items, orders }
    }

    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.menu_items == 0 {
            return Err(FeatureError::ZeroMenuItems);
        }
        if !self.orders.is_finite() || self.orders <= 0.0 {
            return Err(FeatureError::InvalidOrders(self.orders));
        }
        Ok(())
    }
}

/// Categorical codebooks learned from the training data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    franchise: LabelEncoder,
    category: LabelEncoder,
}

impl FeatureEncoder {
    pub fn fit(records: &[RestaurantRecord]) -> Self {
        FeatureEncoder {
            franchise: LabelEncoder::fit(records.iter().map(|r| r.franchise.as_str())),
            category: LabelEncoder::fit(records.iter().map(|r| r.category.as_str())),
        }
    }

    pub fn categories(&self) -> &[String] {
        self.category.labels()
    }

    pub fn franchise_labels(&self) -> &[String] {
        self.franchise.labels()
    }

    fn ensure_fitted(&self) -> Result<(), FeatureError> {
        if self.franchise.is_empty() || self.category.is_empty() {
            return Err(FeatureError::NotFitted);
        }
        Ok(())
    }

    pub fn category_code(&self, category: &str) -> Result<f64, FeatureError> {
        self.category
            .encode(category)
            .map(|c| c as f64)
            .ok_or_else(|| FeatureError::UnknownCategory(category.to_string()))
    }

    fn franchise_position(&self, wanted: &[&str]) -> Option<usize> {
        self.franchise.labels().iter().position(|l| wanted.iter().any(|w| l.eq_ignore_ascii_case(w)))
    }

    /// Code of the training label meaning "franchised" (or "independent").
    ///
    /// With two labels where only one side is recognised, the other side takes
    /// the remaining code. When neither is recognised the second sorted label
    /// is taken as franchised.
    pub fn franchise_code(&self, franchised: bool) -> Result<f64, FeatureError> {
        self.ensure_fitted()?;
        let (own, other) = if franchised {
            (self.franchise_position(&FRANCHISED_LABELS), self.franchise_position(&INDEPENDENT_LABELS))
        } else {
            (self.franchise_position(&INDEPENDENT_LABELS), self.franchise_position(&FRANCHISED_LABELS))
        };
        match (own, other, self.franchise.len()) {
            (Some(code), _, _) => Ok(code as f64),
            (None, Some(code), 2) => Ok((1 - code) as f64),
            (None, None, 2) => Ok(if franchised { 1.0 } else { 0.0 }),
            _ => Err(FeatureError::UnknownFranchise(
                if franchised { "franchised" } else { "independent" }.to_string(),
            )),
        }
    }

    pub fn encode_record(&self, record: &RestaurantRecord) -> Result<[f64; N_FEATURES], FeatureError> {
        self.ensure_fitted()?;
        let franchise = self
            .franchise
            .encode(&record.franchise)
            .ok_or_else(|| FeatureError::UnknownFranchise(record.franchise.clone()))?;
        let category = self.category_code(&record.category)?;
        feature_row(franchise as f64, category, record.no_of_item, record.order_placed)
    }

    pub fn encode_profile(&self, profile: &RestaurantProfile) -> Result<[f64; N_FEATURES], FeatureError> {
        self.ensure_fitted()?;
        profile.validate()?;
        let franchise = self.franchise_code(profile.franchised)?;
        let category = self.category_code(&profile.category)?;
        feature_row(franchise, category, f64::from(profile.menu_items), profile.orders)
    }

    /// Encodes records into a `(n, 5)` feature matrix and the revenue target.
    pub fn design_matrix(
        &self,
        records: &[RestaurantRecord],
    ) -> Result<(Array2<f64>, Array1<f64>), FeatureError> {
        let mut x = Array2::zeros((records.len(), N_FEATURES));
        let mut y = Array1::zeros(records.len());
        for (i, record) in records.iter().enumerate() {
            let row = self.encode_record(record)?;
            x.row_mut(i).assign(&Array1::from_vec(row.to_vec()));
            y[i] = record.revenue;
        }
        Ok((x, y))
    }
}
