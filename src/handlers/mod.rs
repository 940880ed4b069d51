pub mod inventory;


use axum::{http::StatusCode, response::Html, Json};
use serde_json::json;

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "status": "OK" })))
}

pub async fn index() -> (StatusCode, Html<&'static str>) {
    (StatusCode::OK, Html(include_str!("../../static/index.html")))
}
