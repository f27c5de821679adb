//! 行情接口处理器
//!
//! ## API 列表
//! - GET /chart?sym=&range=&interval= - 单个代码的图表数据（原样透传上游响应）
//! - GET /quotes?symbols=A,B,C - 批量报价
//! - GET /proxy - 统一入口：带 symbols 走批量，否则按 sym 走单图表

use actix_web::error::{InternalError, QueryPayloadError};
use actix_web::{web, HttpRequest, HttpResponse, Result};

use crate::error::ProxyError;
use crate::models::{ChartQuery, ProxyQuery, QuotesQuery};
use crate::services::normalizer::{self, NormalizedResponse};
use crate::services::QuoteProxy;

fn into_http(response: NormalizedResponse) -> HttpResponse {
    HttpResponse::build(response.status)
        .content_type("application/json")
        .body(response.body)
}

/// 获取单个代码图表数据
///
/// GET /api/v1/chart?sym=AAPL&range=1y&interval=1d
pub async fn get_chart(
    proxy: web::Data<QuoteProxy>,
    query: web::Query<ChartQuery>,
) -> Result<HttpResponse> {
    let response = proxy
        .fetch_single_chart(
            query.sym.as_deref(),
            query.range.as_deref(),
            query.interval.as_deref(),
        )
        .await;
    Ok(into_http(response))
}

/// 批量获取报价
///
/// GET /api/v1/quotes?symbols=AAPL,MSFT
pub async fn get_quotes(
    proxy: web::Data<QuoteProxy>,
    query: web::Query<QuotesQuery>,
) -> Result<HttpResponse> {
    let response = proxy.fetch_bulk_quotes(query.symbols.as_deref()).await;
    Ok(into_http(response))
}

/// 统一入口
///
/// GET /api/v1/proxy?sym=AAPL 或 /api/v1/proxy?symbols=AAPL,MSFT
pub async fn dispatch(
    proxy: web::Data<QuoteProxy>,
    query: web::Query<ProxyQuery>,
) -> Result<HttpResponse> {
    let response = match query.symbols.as_deref() {
        Some(symbols) => proxy.fetch_bulk_quotes(Some(symbols)).await,
        None => {
            proxy
                .fetch_single_chart(
                    query.sym.as_deref(),
                    query.range.as_deref(),
                    query.interval.as_deref(),
                )
                .await
        }
    };
    Ok(into_http(response))
}

/// 查询串解析失败（如重复参数）时同样返回统一的错误包装
fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::warn!("查询参数解析失败: {}", err);
    let response = normalizer::error_response(&ProxyError::invalid("query", err.to_string()));
    InternalError::from_response(err, into_http(response)).into()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(query_error))
        .route("/chart", web::get().to(get_chart))
        .route("/quotes", web::get().to(get_quotes))
        .route("/proxy", web::get().to(dispatch));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{test, App};

    use crate::config::AppConfig;
    use crate::handlers;
    use crate::services::testing::{chart_body, not_found_body, Reply, ScriptedTransport};
    use crate::services::user_agent::FixedUserAgent;
    use crate::services::QuoteProxy;

    const Q1: &str = "https://query1.finance.yahoo.com";

    fn proxy(transport: Arc<ScriptedTransport>) -> actix_web::web::Data<QuoteProxy> {
        actix_web::web::Data::new(QuoteProxy::new(
            &AppConfig::default(),
            transport,
            Arc::new(FixedUserAgent("ua".into())),
        ))
    }

    #[actix_web::test]
    async fn test_chart_passthrough_body() {
        let upstream = chart_body("AAPL", &[Some(1.0), Some(2.0)]);
        let body = upstream.clone();
        let transport = Arc::new(ScriptedTransport::new(move |_| Reply::ok(body.clone())));
        let app = test::init_service(
            App::new().app_data(proxy(transport)).configure(handlers::config),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/chart?sym=AAPL&range=1y")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 200);
        let bytes = test::read_body(res).await;
        assert_eq!(bytes, upstream.as_bytes());
    }

    #[actix_web::test]
    async fn test_chart_without_range_uses_default_window() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Reply::ok(chart_body("AAPL", &[Some(1.0), Some(2.0)]))
        }));
        let app = test::init_service(
            App::new().app_data(proxy(transport.clone())).configure(handlers::config),
        )
        .await;

        for uri in ["/api/v1/chart?sym=AAPL", "/api/v1/proxy?sym=AAPL"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), 200, "{}", uri);
        }

        let urls = transport.urls();
        assert_eq!(urls.len(), 2);
        for url in urls {
            assert!(url.contains("interval=1d&range=3y"), "{}", url);
        }
    }

    #[actix_web::test]
    async fn test_malformed_query_uses_error_envelope() {
        let transport = Arc::new(ScriptedTransport::new(|_| Reply::status(500)));
        let app = test::init_service(
            App::new().app_data(proxy(transport.clone())).configure(handlers::config),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/chart?sym=A&sym=B")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 400);
        assert_eq!(
            res.headers().get("content-type").unwrap(),
            "application/json"
        );

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("sym"));
        assert_eq!(transport.call_count(), 0);
    }

    #[actix_web::test]
    async fn test_chart_exhausted_is_502() {
        let transport = Arc::new(ScriptedTransport::new(|url| {
            if url.starts_with(Q1) {
                Reply::status(429)
            } else {
                Reply::status(503)
            }
        }));
        let app = test::init_service(
            App::new().app_data(proxy(transport)).configure(handlers::config),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/chart?sym=AAPL").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 502);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn test_chart_unknown_symbol_is_404() {
        let transport = Arc::new(ScriptedTransport::new(|_| Reply::new(404, not_found_body())));
        let app = test::init_service(
            App::new().app_data(proxy(transport)).configure(handlers::config),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/chart?sym=ZZZZ").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 404);
    }

    #[actix_web::test]
    async fn test_quotes_partial_result() {
        let transport = Arc::new(ScriptedTransport::new(|url| {
            if url.contains("/chart/B?") {
                Reply::ok(r#"{"chart":{"result":[],"error":null}}"#)
            } else {
                Reply::ok(chart_body("ANY", &[Some(4.0), Some(5.0)]))
            }
        }));
        let app = test::init_service(
            App::new().app_data(proxy(transport)).configure(handlers::config),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/quotes?symbols=A,B,C")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 200);

        let body: serde_json::Value = test::read_body_json(res).await;
        let symbols: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|q| q["symbol"].as_str().unwrap())
            .collect();
        assert_eq!(symbols, vec!["A", "C"]);
    }

    #[actix_web::test]
    async fn test_quotes_without_symbols_is_400() {
        let transport = Arc::new(ScriptedTransport::new(|_| Reply::status(500)));
        let app = test::init_service(
            App::new().app_data(proxy(transport.clone())).configure(handlers::config),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/quotes").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 400);
        assert_eq!(transport.call_count(), 0);
    }

    #[actix_web::test]
    async fn test_dispatch_by_mode() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Reply::ok(chart_body("M", &[Some(1.0), Some(2.0)]))
        }));
        let app = test::init_service(
            App::new().app_data(proxy(transport.clone())).configure(handlers::config),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/proxy?symbols=X,Y")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let req = test::TestRequest::get().uri("/api/v1/proxy?sym=X").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 200);

        let req = test::TestRequest::get().uri("/api/v1/proxy").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 400);

        assert_eq!(transport.call_count(), 3);
    }

    #[actix_web::test]
    async fn test_health() {
        let transport = Arc::new(ScriptedTransport::new(|_| Reply::status(500)));
        let app = test::init_service(
            App::new().app_data(proxy(transport)).configure(handlers::config),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["upstreams"], 2);
    }
}
