//! 跨域与缓存头中间件
//!
//! 所有响应附加 CORS 头；OPTIONS 预检请求直接返回 200 空响应，不进入处理器

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{
        header::{
            HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_TYPE,
        },
        Method,
    },
    Error, HttpResponse,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::config::CorsConfig;

/// 预先构造好的响应头
struct CorsHeaders {
    allow_origin: HeaderValue,
    cache_control: HeaderValue,
}

/// CORS 中间件
pub struct CorsMiddleware {
    headers: Rc<CorsHeaders>,
}

impl CorsMiddleware {
    pub fn new(config: &CorsConfig) -> Self {
        let allow_origin = HeaderValue::from_str(&config.allow_origin).unwrap_or_else(|_| {
            log::warn!("无效的 allow_origin 配置 {:?}，使用 *", config.allow_origin);
            HeaderValue::from_static("*")
        });
        let cache_control = HeaderValue::from_str(&format!(
            "public, max-age={}",
            config.cache_max_age_secs
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("no-store"));

        Self {
            headers: Rc::new(CorsHeaders {
                allow_origin,
                cache_control,
            }),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CorsMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = CorsMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(CorsMiddlewareService {
            service: Rc::new(service),
            headers: self.headers.clone(),
        })
    }
}

pub struct CorsMiddlewareService<S> {
    service: Rc<S>,
    headers: Rc<CorsHeaders>,
}

impl<S, B> Service<ServiceRequest> for CorsMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let headers = self.headers.clone();

        Box::pin(async move {
            // 预检请求
            if *req.method() == Method::OPTIONS {
                let response = HttpResponse::Ok().finish();
                let mut res = req.into_response(response).map_into_right_body();
                apply_headers(res.headers_mut(), &headers, true);
                return Ok(res);
            }

            let mut res = service.call(req).await?.map_into_left_body();
            // 只缓存成功响应，错误响应不应被浏览器缓存
            let cacheable = res.status().is_success();
            apply_headers(res.headers_mut(), &headers, cacheable);
            Ok(res)
        })
    }
}

fn apply_headers(
    map: &mut actix_web::http::header::HeaderMap,
    headers: &CorsHeaders,
    cacheable: bool,
) {
    map.insert(ACCESS_CONTROL_ALLOW_ORIGIN, headers.allow_origin.clone());
    map.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    map.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    if !map.contains_key(CONTENT_TYPE) {
        map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    let cache_control = if cacheable {
        headers.cache_control.clone()
    } else {
        HeaderValue::from_static("no-store")
    };
    map.insert(CACHE_CONTROL, cache_control);
}
