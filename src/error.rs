//! 错误类型定义
//!
//! 核心层使用类型化错误，不以 panic 或 anyhow 形式越过编排器边界

use serde::Serialize;
use thiserror::Error;

/// 上游失败分类
///
/// 决定编排器在某个候选失败后是继续尝试下一个还是立即中止
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// 超时、连接错误、429、5xx 等，可换候选重试
    Transient,
    /// 200 但没有可用结果，可重试
    Empty,
    /// 响应体无法解析，可重试
    Malformed,
    /// 请求本身无效，不重试
    Fatal,
}

impl FailureClass {
    pub fn is_retryable(self) -> bool {
        !matches!(self, FailureClass::Fatal)
    }
}

/// Transport 层错误（单次 GET 未拿到状态码）
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("请求超时")]
    Timeout,
    #[error("连接失败: {0}")]
    Connect(String),
    #[error("请求失败: {0}")]
    Request(String),
}

/// 单次上游尝试的失败原因
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptError {
    /// 非 200 状态码
    #[error("上游返回状态码 {0}")]
    Status(u16),
    #[error(transparent)]
    Network(#[from] TransportError),
    /// 200 但结果集为空
    #[error("上游返回空结果: {0}")]
    Empty(String),
    /// 上游明确声明代码不存在（chart.error.code == "Not Found"）
    #[error("上游未找到: {0}")]
    NotFound(String),
    #[error("响应解析失败: {0}")]
    Malformed(String),
    /// 上游拒绝请求参数（400/422），换主机也不会成功
    #[error("上游拒绝请求: {0}")]
    Rejected(String),
}

impl AttemptError {
    /// 失败分类
    pub fn class(&self) -> FailureClass {
        match self {
            AttemptError::Status(400) | AttemptError::Status(422) => FailureClass::Fatal,
            AttemptError::Status(_) | AttemptError::Network(_) => FailureClass::Transient,
            AttemptError::Empty(_) | AttemptError::NotFound(_) => FailureClass::Empty,
            AttemptError::Malformed(_) => FailureClass::Malformed,
            AttemptError::Rejected(_) => FailureClass::Fatal,
        }
    }
}

/// 一次失败尝试的诊断记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptFailure {
    /// 候选主机
    pub candidate: String,
    pub class: FailureClass,
    /// 失败原因
    pub reason: String,
    #[serde(skip)]
    pub error: AttemptError,
}

impl AttemptFailure {
    pub fn new(candidate: impl Into<String>, error: AttemptError) -> Self {
        Self {
            candidate: candidate.into(),
            class: error.class(),
            reason: error.to_string(),
            error,
        }
    }
}

/// 代理层错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProxyError {
    /// 调用方参数错误，发起任何上游请求之前返回
    #[error("参数 {param} 无效: {reason}")]
    InvalidInput { param: &'static str, reason: String },

    /// 所有候选均失败
    #[error("所有上游候选均失败 ({} 次尝试)", .attempts.len())]
    Exhausted { attempts: Vec<AttemptFailure> },

    /// 每个候选都声明代码不存在
    #[error("未找到代码 {symbol}: {description}")]
    NotFound { symbol: String, description: String },

    /// 遇到不可重试的失败，剩余候选未尝试
    ///
    /// prior 为中止前已失败的可重试尝试
    #[error("请求被中止: {}", .attempt.reason)]
    Aborted {
        attempt: AttemptFailure,
        prior: Vec<AttemptFailure>,
    },

    /// 整体请求期限已过
    #[error("请求超过总时限 ({} 次尝试)", .attempts.len())]
    DeadlineExceeded { attempts: Vec<AttemptFailure> },
}

impl ProxyError {
    pub fn invalid(param: &'static str, reason: impl Into<String>) -> Self {
        ProxyError::InvalidInput {
            param,
            reason: reason.into(),
        }
    }
}
