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

use std::convert::Infallible;
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use revcast::errors::PredictError;
use revcast::insights::{ChartPoint, Insights, format_currency, revenue_trend};
use revcast::{Prediction, RestaurantProfile, RevenuePredictor};

pub const MENU_ITEMS_MIN: u32 = 1;
pub const MENU_ITEMS_DEFAULT: u32 = 25;
/// Monthly orders are entered in thousands.
pub const ORDERS_MIN: u32 = 1;
pub const ORDERS_MAX: u32 = 500;
pub const ORDERS_DEFAULT: u32 = 150;

const BODY_LIMIT: u64 = 16 * 1024;

#[derive(Debug, Serialize)]
pub struct Bounds {
    pub min: u32,
    pub max: Option<u32>,
    pub default: u32,
}

#[derive(Debug, Serialize)]
pub struct FormOptions {
    pub franchise: [&'static str; 2],
    pub categories: Vec<String>,
    pub menu_items: Bounds,
    pub orders_thousands: Bounds,
    pub model: String,
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    #[serde(flatten)]
    prediction: Prediction,
    formatted: String,
    trend: Vec<ChartPoint>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&ErrorBody { error: message.into() }), status)
}

fn with_predictor(
    predictor: Arc<RevenuePredictor>,
) -> impl Filter<Extract = (Arc<RevenuePredictor>,), Error = Infallible> + Clone {
    warp::any().map(move || predictor.clone())
}

/// All dashboard routes, with rejections turned into JSON errors and request logging.
pub fn routes(
    predictor: Arc<RevenuePredictor>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .and(with_predictor(predictor.clone()))
        .map(|predictor: Arc<RevenuePredictor>| warp::reply::html(index_page(&predictor)));

    let options = warp::path!("api" / "options")
        .and(warp::get())
        .and(with_predictor(predictor.clone()))
        .map(|predictor: Arc<RevenuePredictor>| warp::reply::json(&form_options(&predictor)));

    let predict = warp::path!("api" / "predict")
        .and(warp::post())
        .and(warp::body::content_length_limit(BODY_LIMIT))
        .and(warp::body::json())
        .and(with_predictor(predictor))
        .map(handle_predict);

    let insights = warp::path!("api" / "insights")
        .and(warp::get())
        .map(|| warp::reply::json(&Insights::new(None)));

    let health = warp::path!("health").and(warp::get()).map(|| "ok");

    index
        .or(options)
        .or(predict)
        .or(insights)
        .or(health)
        .recover(handle_rejection)
        .with(warp::log("revcast::dashboard"))
}

pub fn form_options(predictor: &RevenuePredictor) -> FormOptions {
    FormOptions {
        franchise: ["Yes", "No"],
        categories: predictor.categories().to_vec(),
        menu_items: Bounds { min: MENU_ITEMS_MIN, max: None, default: MENU_ITEMS_DEFAULT },
        orders_thousands: Bounds {
            min: ORDERS_MIN,
            max: Some(ORDERS_MAX),
            default: ORDERS_DEFAULT,
        },
        model: predictor.kind().to_string(),
    }
}

fn handle_predict(
    profile: RestaurantProfile,
    predictor: Arc<RevenuePredictor>,
) -> warp::reply::WithStatus<warp::reply::Json> {
    debug!("Predicting for {:?}", profile);
    match predictor.predict(&profile) {
        Ok(prediction) => {
            let body = PredictResponse {
                formatted: format_currency(prediction.revenue),
                trend: revenue_trend(Some(prediction.revenue)),
                prediction,
            };
            warp::reply::with_status(warp::reply::json(&body), StatusCode::OK)
        }
        Err(PredictError::Feature(e)) => error_reply(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => {
            warn!("Prediction failed: {}", e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let reply = if err.is_not_found() {
        error_reply(StatusCode::NOT_FOUND, "not found")
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        error_reply(StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        error_reply(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        error_reply(StatusCode::UNSUPPORTED_MEDIA_TYPE, "expected a JSON body")
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        error_reply(StatusCode::LENGTH_REQUIRED, "content-length required")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_reply(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    } else {
        warn!("Unhandled rejection: {:?}", err);
        error_reply(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    };
    Ok(reply)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn index_page(predictor: &RevenuePredictor) -> String {
    let categories: String = predictor
        .categories()
        .iter()
        .map(|c| format!("<option value=\"{0}\">{0}</option>", escape_html(c)))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Restaurant Revenue Prediction</title>
</head>
<body>
<h1>Restaurant Revenue Prediction</h1>
<p>Model: {model}</p>
<form id="profile">
  <label>Franchise
    <select name="franchised"><option value="true">Yes</option><option value="false">No</option></select>
  </label><br>
  <label>Category <select name="category">{categories}</select></label><br>
  <label>Menu items <input name="menu_items" type="number" min="{items_min}" value="{items_default}"></label><br>
  <label>Monthly orders (thousands)
    <input name="orders" type="range" min="{orders_min}" max="{orders_max}" value="{orders_default}">
  </label><br>
  <button type="submit">Predict revenue</button>
</form>
<p id="result"></p>
<script>
document.getElementById("profile").addEventListener("submit", async (event) => {{
  event.preventDefault();
  const form = new FormData(event.target);
  const body = {{
    franchised: form.get("franchised") === "true",
    category: form.get("category"),
    menu_items: parseInt(form.get("menu_items"), 10),
    orders: parseFloat(form.get("orders")),
  }};
  const response = await fetch("/api/predict", {{
    method: "POST",
    headers: {{ "Content-Type": "application/json" }},
    body: JSON.stringify(body),
  }});
  const data = await response.json();
  document.getElementById("result").textContent = response.ok
    ? "Predicted monthly revenue: " + data.formatted + " (± 5% margin of error)"
    : "Error: " + data.error;
}});
</script>
</body>
</html>
"#,
        model = escape_html(&predictor.kind().to_string()),
        categories = categories,
        items_min = MENU_ITEMS_MIN,
        items_default = MENU_ITEMS_DEFAULT,
        orders_min = ORDERS_MIN,
        orders_max = ORDERS_MAX,
        orders_default = ORDERS_DEFAULT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use revcast::data::RestaurantRecord;
    use revcast::models::LinearRegression;
    use revcast::scalers::{Scaler, StandardScaler};
    use revcast::{FeatureEncoder, ModelKind};

    fn predictor() -> Arc<RevenuePredictor> {
        let records: Vec<RestaurantRecord> = (0..12)
            .map(|i| {
                let items = 10.0 + (i * 3) as f64;
                let orders = 20.0 + (i * 7 % 11) as f64;
                RestaurantRecord {
                    franchise: if i % 2 == 0 { "Yes" } else { "No" }.to_string(),
                    category: ["Cafe", "Fine <Dining>"][(i / 2) % 2].to_string(),
                    no_of_item: items,
                    order_placed: orders,
                    revenue: 2_000.0 * orders + 300.0 * items + 50_000.0,
                }
            })
            .collect();
        let encoder = FeatureEncoder::fit(&records);
        let (x, y) = encoder.design_matrix(&records).unwrap();
        let mut scaler = StandardScaler::new();
        let x = scaler.fit_transform(&x).unwrap();
        let mut model = LinearRegression::new().build();
        model.fit(&x, &y).unwrap();

        Arc::new(
            RevenuePredictor::from_parts(
                encoder,
                scaler,
                None,
                Box::new(model),
                ModelKind::LinearRegression,
            )
            .unwrap(),
        )
    }

    fn json(body: &[u8]) -> serde_json::Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let res = warp::test::request().path("/health").reply(&routes(predictor())).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), "ok");
    }

    #[tokio::test]
    async fn test_index_escapes_categories() {
        let res = warp::test::request().path("/").reply(&routes(predictor())).await;
        assert_eq!(res.status(), StatusCode::OK);
        let page = String::from_utf8(res.body().to_vec()).unwrap();
        assert!(page.contains("Fine &lt;Dining&gt;"));
        assert!(page.contains("max=\"500\""));
    }

    #[tokio::test]
    async fn test_options() {
        let res = warp::test::request().path("/api/options").reply(&routes(predictor())).await;
        let body = json(res.body());
        assert_eq!(body["categories"], serde_json::json!(["Cafe", "Fine <Dining>"]));
        assert_eq!(body["menu_items"]["default"], 25);
        assert_eq!(body["orders_thousands"]["max"], 500);
        assert_eq!(body["model"], "Linear Regression");
    }

    #[tokio::test]
    async fn test_predict() {
        let res = warp::test::request()
            .method("POST")
            .path("/api/predict")
            .json(&RestaurantProfile::new(true, "Cafe", 25, 30.0))
            .reply(&routes(predictor()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        let body = json(res.body());
        let revenue = body["revenue"].as_f64().unwrap();
        let expected = 2_000.0 * 30.0 + 300.0 * 25.0 + 50_000.0;
        assert!((revenue - expected).abs() < 1e-3 * expected, "revenue {}", revenue);
        assert!(body["lower"].as_f64().unwrap() < revenue);
        assert_eq!(body["model"], "linear_regression");
        assert!(body["formatted"].as_str().unwrap().starts_with("₹ "));
        assert_eq!(body["trend"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_predict_rejects_zero_menu_items() {
        let res = warp::test::request()
            .method("POST")
            .path("/api/predict")
            .json(&RestaurantProfile::new(false, "Cafe", 0, 30.0))
            .reply(&routes(predictor()))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(json(res.body())["error"].as_str().unwrap().to_lowercase().contains("menu"));
    }

    #[tokio::test]
    async fn test_predict_rejects_malformed_body() {
        let res = warp::test::request()
            .method("POST")
            .path("/api/predict")
            .header("content-type", "application/json")
            .body("{\"franchised\": \"maybe\"}")
            .reply(&routes(predictor()))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(json(res.body())["error"].is_string());
    }

    #[tokio::test]
    async fn test_predict_rejects_non_json_content_type() {
        let res = warp::test::request()
            .method("POST")
            .path("/api/predict")
            .header("content-type", "text/plain")
            .body("{\"franchised\": true, \"category\": \"Cafe\", \"menu_items\": 25, \"orders\": 30.0}")
            .reply(&routes(predictor()))
            .await;
        assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(json(res.body())["error"].is_string());
    }

    #[tokio::test]
    async fn test_predict_requires_content_length() {
        let res = warp::test::request()
            .method("POST")
            .path("/api/predict")
            .header("content-type", "application/json")
            .reply(&routes(predictor()))
            .await;
        assert_eq!(res.status(), StatusCode::LENGTH_REQUIRED);
        assert!(json(res.body())["error"].is_string());
    }

    #[tokio::test]
    async fn test_insights() {
        let res = warp::test::request().path("/api/insights").reply(&routes(predictor())).await;
        let body = json(res.body());
        assert_eq!(body["drivers"].as_array().unwrap().len(), 5);
        assert_eq!(body["trend"].as_array().unwrap().len(), 4);
        assert_eq!(body["category_revenue"][2]["value"], 750000.0);
        assert_eq!(body["accuracy"][0]["value"], 85.0);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let res = warp::test::request().path("/nope").reply(&routes(predictor())).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
