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

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{CsvError, DataError};

/// Column headers of the restaurant dataset, in file order.
pub const REQUIRED_COLUMNS: [&str; 5] =
    ["Franchise", "Category", "No_Of_Item", "Order_Placed", "Revenue"];

/// One cleaned row of the restaurant dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantRecord {
    #[serde(rename = "Franchise")]
    pub franchise: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "No_Of_Item")]
    pub no_of_item: f64,
    #[serde(rename = "Order_Placed")]
    pub order_placed: f64,
    #[serde(rename = "Revenue")]
    pub revenue: f64,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Franchise")]
    franchise: Option<String>,
    #[serde(rename = "Category")]
    category: Option<String>,
    #[serde(rename = "No_Of_Item")]
    no_of_item: Option<f64>,
    #[serde(rename = "Order_Placed")]
    order_placed: Option<f64>,
    #[serde(rename = "Revenue")]
    revenue: Option<f64>,
}

impl RawRow {
    fn into_record(self) -> Option<RestaurantRecord> {
        let franchise = self.franchise.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())?;
        let category = self.category.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())?;
        Some(RestaurantRecord {
            franchise,
            category,
            no_of_item: self.no_of_item.filter(|v| v.is_finite())?,
            order_placed: self.order_placed.filter(|v| v.is_finite())?,
            revenue: self.revenue.filter(|v| v.is_finite())?,
        })
    }
}

/// Rows removed while cleaning a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningReport {
    pub total_rows: usize,
    pub missing_values: usize,
    pub duplicates: usize,
    pub zero_menu_items: usize,
}

impl CleaningReport {
    pub fn kept(&self) -> usize {
        self.total_rows - self.missing_values - self.duplicates - self.zero_menu_items
    }
}

fn record_key(record: &RestaurantRecord) -> (String, String, u64, u64, u64) {
    (
        record.franchise.clone(),
        record.category.clone(),
        record.no_of_item.to_bits(),
        record.order_placed.to_bits(),
        record.revenue.to_bits(),
    )
}

/// Parses and cleans restaurant rows from any CSV reader.
///
/// Rows with a missing value are dropped, then exact duplicates (first
/// occurrence wins), then rows with no menu items since their order/item
/// ratio is undefined.
pub fn parse_records<R: Read>(
    reader: R,
) -> Result<(Vec<RestaurantRecord>, CleaningReport), DataError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);

    let headers = rdr.headers().map_err(CsvError::from)?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(CsvError::MissingColumn(column.to_string()).into());
        }
    }

    let mut report = CleaningReport::default();
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        let raw = result.map_err(CsvError::from)?;
        report.total_rows += 1;

        let Some(record) = raw.into_record() else {
            report.missing_values += 1;
            continue;
        };
        if !seen.insert(record_key(&record)) {
            report.duplicates += 1;
            continue;
        }
        if record.no_of_item == 0.0 {
            report.zero_menu_items += 1;
            continue;
        }
        records.push(record);
    }

    if report.total_rows == 0 {
        return Err(CsvError::EmptyFile.into());
    }
    if report.missing_values > 0 {
        warn!("Dropped {} rows with missing values", report.missing_values);
    }
    if report.duplicates > 0 {
        warn!("Dropped {} duplicate rows", report.duplicates);
    }
    if report.zero_menu_items > 0 {
        warn!("Dropped {} rows with zero menu items", report.zero_menu_items);
    }
    if records.is_empty() {
        return Err(DataError::NoUsableRows);
    }

    debug!("Parsed {} rows, kept {}", report.total_rows, records.len());
    Ok((records, report))
}

/// Loads and cleans the restaurant dataset from a local CSV file.
pub fn load_records<P: AsRef<Path>>(
    path: P,
) -> Result<(Vec<RestaurantRecord>, CleaningReport), DataError> {
    let path = path.as_ref();
    info!("Loading dataset from {}", path.display());
    let file = File::open(path).map_err(CsvError::from)?;
    parse_records(file)
}

/// Downloads the restaurant dataset over HTTP and cleans it.
pub fn fetch_records(url: &str) -> Result<(Vec<RestaurantRecord>, CleaningReport), DataError> {
    info!("Downloading dataset from {}", url);
    let download = |e| DataError::Download { url: url.to_string(), source: e };
    let response = reqwest::blocking::get(url).and_then(|r| r.error_for_status()).map_err(download)?;
    let text = response.text().map_err(download)?;
    debug!("Downloaded {} bytes", text.len());
    parse_records(text.as_bytes())
}

/// Where the training data comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetSource {
    Path(PathBuf),
    Url(String),
}

impl DatasetSource {
    /// Treats `http://` and `https://` locations as URLs, anything else as a path.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            DatasetSource::Url(location.to_string())
        } else {
            DatasetSource::Path(PathBuf::from(location))
        }
    }

    pub fn load(&self) -> Result<(Vec<RestaurantRecord>, CleaningReport), DataError> {
        match self {
            DatasetSource::Path(path) => load_records(path),
            DatasetSource::Url(url) => fetch_records(url),
        }
    }
}
