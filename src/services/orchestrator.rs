//! 回退编排
//!
//! 按请求计划依次尝试上游候选，区分软失败（非 200、格式错误、空结果）与硬失败
//! （超时、连接错误），并以有界并发批量重建报价

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;

use crate::config::AppConfig;
use crate::error::{AttemptError, AttemptFailure, FailureClass, ProxyError, TransportError};
use crate::models::{ChartEnvelope, ChartPayload, QuoteRecord};
use crate::services::plan::{Candidate, FetchPlan};
use crate::services::reconstruct::reconstruct;
use crate::services::transport::{Transport, TransportResponse};
use crate::services::user_agent::UserAgentProvider;

/// 回退编排器
///
/// 只持有只读配置，所有状态都在单次调用内部
pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    user_agents: Arc<dyn UserAgentProvider>,
    hosts: Vec<String>,
    base_headers: Vec<(String, String)>,
    attempt_timeout: Duration,
    batch_width: usize,
}

impl Orchestrator {
    pub fn new(
        config: &AppConfig,
        transport: Arc<dyn Transport>,
        user_agents: Arc<dyn UserAgentProvider>,
    ) -> Self {
        let upstream = &config.upstream;
        let base_headers = vec![
            (
                "Accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,application/json,*/*;q=0.8".to_string(),
            ),
            ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
            ("Referer".to_string(), upstream.referer.clone()),
            ("Origin".to_string(), upstream.origin.clone()),
            ("sec-fetch-dest".to_string(), "empty".to_string()),
            ("sec-fetch-mode".to_string(), "cors".to_string()),
            ("sec-fetch-site".to_string(), "same-site".to_string()),
        ];

        Self {
            transport,
            user_agents,
            hosts: upstream.hosts.clone(),
            base_headers,
            attempt_timeout: upstream.timeout(),
            batch_width: config.bulk.effective_batch_width(),
        }
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// 一次入站请求使用的请求头，User-Agent 在该请求内固定
    fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers = self.base_headers.clone();
        if let Some(ua) = self.user_agents.pick() {
            headers.push(("User-Agent".to_string(), ua));
        }
        headers
    }

    // ==================== 单图表 ====================

    /// 获取单个代码的图表数据
    ///
    /// 严格按顺序尝试候选，第一个成功即返回，不再发出后续请求
    pub async fn single_chart(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
        deadline: Instant,
    ) -> Result<ChartPayload, ProxyError> {
        let headers = self.request_headers();
        self.fetch_chart(symbol, range, interval, &headers, deadline).await
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
        headers: &[(String, String)],
        deadline: Instant,
    ) -> Result<ChartPayload, ProxyError> {
        let plan = FetchPlan::chart(&self.hosts, symbol, range, interval);
        if plan.is_empty() {
            log::error!("没有可用的上游候选");
        }
        let mut attempts: Vec<AttemptFailure> = Vec::with_capacity(plan.len());

        for candidate in plan {
            log::debug!("请求 {} @ {}", symbol, candidate.host);

            let attempt = tokio::time::timeout_at(deadline, self.attempt(&candidate, headers)).await;
            let outcome = match attempt {
                Ok(outcome) => outcome,
                Err(_) => {
                    attempts.push(AttemptFailure::new(
                        candidate.host,
                        AttemptError::Network(TransportError::Timeout),
                    ));
                    log::warn!("{} 超过请求总时限，放弃剩余候选", symbol);
                    return Err(ProxyError::DeadlineExceeded { attempts });
                }
            };

            let error = match outcome {
                Ok(payload) => return Ok(payload),
                Err(e) => e,
            };

            let failure = AttemptFailure::new(candidate.host, error);
            match failure.class {
                FailureClass::Transient => {
                    log::warn!("{} @ {} 暂时失败: {}", symbol, failure.candidate, failure.reason)
                }
                FailureClass::Empty => {
                    log::warn!("{} @ {} 返回空结果: {}", symbol, failure.candidate, failure.reason)
                }
                FailureClass::Malformed => {
                    log::warn!("{} @ {} 响应格式错误: {}", symbol, failure.candidate, failure.reason)
                }
                FailureClass::Fatal => {
                    log::warn!("{} @ {} 不可重试: {}", symbol, failure.candidate, failure.reason)
                }
            }
            if !failure.class.is_retryable() {
                return Err(ProxyError::Aborted {
                    attempt: failure,
                    prior: attempts,
                });
            }
            attempts.push(failure);
        }

        let not_found = attempts
            .iter()
            .filter_map(|a| match &a.error {
                AttemptError::NotFound(description) => Some(description.clone()),
                _ => None,
            })
            .collect::<Vec<_>>();
        if !attempts.is_empty() && not_found.len() == attempts.len() {
            return Err(ProxyError::NotFound {
                symbol: symbol.to_string(),
                description: not_found.into_iter().next().unwrap_or_default(),
            });
        }

        log::info!("{} 的 {} 个候选全部失败", symbol, attempts.len());
        Err(ProxyError::Exhausted { attempts })
    }

    /// 单次尝试，带独立超时
    async fn attempt(
        &self,
        candidate: &Candidate,
        headers: &[(String, String)],
    ) -> Result<ChartPayload, AttemptError> {
        let call = self.transport.get(&candidate.url, headers, self.attempt_timeout);
        let response = tokio::time::timeout(self.attempt_timeout, call)
            .await
            .unwrap_or(Err(TransportError::Timeout))?;
        classify_response(response)
    }

    // ==================== 批量报价 ====================

    /// 批量获取报价
    ///
    /// 按 batch_width 分批：批次之间串行，批内并发，全部结束后再开始下一批。
    /// 单个代码失败只会被略过，结果保持输入顺序
    pub async fn bulk_quote(
        &self,
        symbols: &[String],
        range: &str,
        interval: &str,
        deadline: Instant,
    ) -> Vec<QuoteRecord> {
        let headers = self.request_headers();
        let mut quotes = Vec::with_capacity(symbols.len());

        for (wave, batch) in symbols.chunks(self.batch_width).enumerate() {
            if Instant::now() >= deadline {
                log::warn!("超过请求总时限，第 {} 批及之后的代码未请求", wave + 1);
                break;
            }

            let fetches = batch
                .iter()
                .map(|symbol| self.quote_one(symbol, range, interval, &headers, deadline));
            // join_all 按输入顺序返回，每个任务只写自己的槽位
            let settled = join_all(fetches).await;
            quotes.extend(settled.into_iter().flatten());
        }

        log::info!("批量报价: 请求 {} 个，成功 {} 个", symbols.len(), quotes.len());
        quotes
    }

    async fn quote_one(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
        headers: &[(String, String)],
        deadline: Instant,
    ) -> Option<QuoteRecord> {
        match self.fetch_chart(symbol, range, interval, headers, deadline).await {
            Ok(payload) => {
                let quote = reconstruct(symbol, &payload.series);
                if quote.is_none() {
                    log::warn!("{} 没有可用价格，已略过", symbol);
                }
                quote
            }
            Err(e) => {
                log::warn!("{} 获取失败，已略过: {}", symbol, e);
                None
            }
        }
    }
}

/// 将上游响应归类为成功或具体的失败原因
pub fn classify_response(response: TransportResponse) -> Result<ChartPayload, AttemptError> {
    match response.status {
        200 => {}
        400 | 422 => {
            let reason = upstream_error(&response.body)
                .map(|e| e.describe())
                .unwrap_or_else(|| format!("状态码 {}", response.status));
            return Err(AttemptError::Rejected(reason));
        }
        404 => {
            return match upstream_error(&response.body) {
                Some(e) if e.is_not_found() => Err(AttemptError::NotFound(e.describe())),
                _ => Err(AttemptError::Status(404)),
            };
        }
        status => return Err(AttemptError::Status(status)),
    }

    let envelope: ChartEnvelope = serde_json::from_str(&response.body)
        .map_err(|e| AttemptError::Malformed(e.to_string()))?;

    if let Some(error) = envelope.chart.error {
        return Err(if error.is_not_found() {
            AttemptError::NotFound(error.describe())
        } else {
            AttemptError::Empty(error.describe())
        });
    }

    let series = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| AttemptError::Empty("chart.result 为空".to_string()))?;

    Ok(ChartPayload {
        raw: response.body,
        series,
    })
}

fn upstream_error(body: &str) -> Option<crate::models::ChartError> {
    serde_json::from_str::<ChartEnvelope>(body).ok()?.chart.error
}
