use actix_web::{web, HttpResponse, Result};
use serde_json::json;

use crate::models::ApiResponse;
use crate::services::QuoteProxy;

pub async fn health_check(proxy: web::Data<QuoteProxy>) -> Result<HttpResponse> {
    let response = ApiResponse::success(json!({
        "status": "healthy",
        "upstreams": proxy.upstream_count(),
    }));
    Ok(HttpResponse::Ok().json(response))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
