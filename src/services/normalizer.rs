//! 响应归一化
//!
//! 不论哪条上游路径满足了请求，都映射为统一的 状态码 + 响应体

use actix_web::http::StatusCode;
use serde::Serialize;

use crate::error::{AttemptFailure, ProxyError};
use crate::models::{ApiResponse, ChartPayload, QuoteRecord};

/// 可直接序列化为 HTTP 响应的结果
#[derive(Debug, Clone)]
pub struct NormalizedResponse {
    pub status: StatusCode,
    pub body: String,
}

impl NormalizedResponse {
    fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        let body = serde_json::to_string(value).unwrap_or_else(|e| {
            log::error!("序列化响应失败: {}", e);
            r#"{"success":false,"data":null,"message":"响应序列化失败"}"#.to_string()
        });
        Self { status, body }
    }
}

/// 单图表结果：成功时原样透传上游响应体
pub fn chart_outcome(outcome: Result<ChartPayload, ProxyError>) -> NormalizedResponse {
    match outcome {
        Ok(payload) => NormalizedResponse {
            status: StatusCode::OK,
            body: payload.raw,
        },
        Err(e) => error_response(&e),
    }
}

/// 批量结果：请求本身合法即返回 200，空列表也是有效结果
pub fn bulk_outcome(quotes: Vec<QuoteRecord>) -> NormalizedResponse {
    NormalizedResponse::json(StatusCode::OK, &ApiResponse::success(quotes))
}

/// 错误映射
///
/// - 参数错误 / 上游拒绝参数 -> 400
/// - 所有候选都声明不存在 -> 404
/// - 候选耗尽 / 超过总时限 -> 502，data 列出每次尝试的候选与原因
pub fn error_response(error: &ProxyError) -> NormalizedResponse {
    let message = error.to_string();
    match error {
        ProxyError::InvalidInput { .. } => {
            NormalizedResponse::json(StatusCode::BAD_REQUEST, &ApiResponse::<()>::error(message))
        }
        ProxyError::NotFound { .. } => {
            NormalizedResponse::json(StatusCode::NOT_FOUND, &ApiResponse::<()>::error(message))
        }
        ProxyError::Aborted { attempt, prior } => {
            let mut attempts = prior.clone();
            attempts.push(attempt.clone());
            NormalizedResponse::json(
                StatusCode::BAD_REQUEST,
                &ApiResponse::error_with(message, attempts),
            )
        }
        ProxyError::Exhausted { attempts } | ProxyError::DeadlineExceeded { attempts } => {
            NormalizedResponse::json(
                StatusCode::BAD_GATEWAY,
                &ApiResponse::<Vec<AttemptFailure>>::error_with(message, attempts.clone()),
            )
        }
    }
}
