//! 通用 API 响应模型
//!
//! 定义统一的 API 响应格式

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// 统一 API 响应结构
///
/// 批量报价和所有错误响应均使用此格式，包含：
/// - success: 请求是否成功
/// - data: 响应数据（成功时为结果，502 时为各次尝试的失败原因）
/// - message: 响应消息
/// - timestamp: 响应时间戳（UTC）
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// 请求是否成功
    pub success: bool,
    /// 响应数据
    pub data: Option<T>,
    /// 响应消息
    pub message: String,
    /// 响应时间戳（ISO 8601 格式）
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    ///
    /// # 参数
    /// - data: 响应数据
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// 创建错误响应
    ///
    /// # 参数
    /// - message: 错误信息
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// 创建附带诊断数据的错误响应
    pub fn error_with(message: String, data: T) -> Self {
        Self {
            success: false,
            data: Some(data),
            message,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
