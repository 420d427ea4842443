pub mod appointments;
pub mod auth;
pub mod files;
pub mod health;
pub mod parents;
pub mod teachers;

use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// Enveloppe de succès commune à toute l'API.
pub fn ok(data: impl Serialize) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

pub fn ok_message(data: impl Serialize, message: &str) -> Json<Value> {
    Json(json!({ "success": true, "data": data, "message": message }))
}

/// Extracts the real client IP from reverse-proxy headers.
/// Priority: X-Real-IP → first X-Forwarded-For.
pub fn real_ip(headers: &HeaderMap) -> String {
    if let Some(ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return ip.to_string();
    }
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = xff.split(',').next() {
            return first.trim().to_string();
        }
    }
    "unknown".to_string()
}
