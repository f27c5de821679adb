//! 行情代理服务
//!
//! 对路由层暴露两个操作：单图表与批量报价。参数校验在发起任何上游请求之前完成

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::{AppConfig, VALID_INTERVALS, VALID_RANGES};
use crate::error::ProxyError;
use crate::services::normalizer::{self, NormalizedResponse};
use crate::services::orchestrator::Orchestrator;
use crate::services::transport::Transport;
use crate::services::user_agent::UserAgentProvider;

/// 行情代理
pub struct QuoteProxy {
    orchestrator: Orchestrator,
    default_range: String,
    default_interval: String,
    bulk_range: String,
    bulk_interval: String,
    max_symbols: usize,
    request_deadline: Duration,
    symbol_suffix: Option<String>,
}

impl QuoteProxy {
    pub fn new(
        config: &AppConfig,
        transport: Arc<dyn Transport>,
        user_agents: Arc<dyn UserAgentProvider>,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(config, transport, user_agents),
            default_range: config.chart.default_range.clone(),
            default_interval: config.chart.default_interval.clone(),
            bulk_range: config.bulk.range.clone(),
            bulk_interval: config.bulk.interval.clone(),
            max_symbols: config.bulk.max_symbols,
            request_deadline: config.upstream.request_deadline(),
            symbol_suffix: config
                .upstream
                .symbol_suffix
                .clone()
                .filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn upstream_count(&self) -> usize {
        self.orchestrator.host_count()
    }

    /// 单图表
    ///
    /// # 参数
    /// - sym: 代码
    /// - range: 时间范围，缺省用配置值
    /// - interval: K线周期，缺省用配置值
    pub async fn fetch_single_chart(
        &self,
        sym: Option<&str>,
        range: Option<&str>,
        interval: Option<&str>,
    ) -> NormalizedResponse {
        let params = match self.chart_params(sym, range, interval) {
            Ok(params) => params,
            Err(e) => return normalizer::error_response(&e),
        };
        let (symbol, range, interval) = params;

        let deadline = Instant::now() + self.request_deadline;
        let outcome = self
            .orchestrator
            .single_chart(&symbol, &range, &interval, deadline)
            .await;
        normalizer::chart_outcome(outcome)
    }

    /// 批量报价
    ///
    /// # 参数
    /// - symbols: 逗号分隔的代码列表
    pub async fn fetch_bulk_quotes(&self, symbols: Option<&str>) -> NormalizedResponse {
        let symbols = match self.parse_symbols(symbols) {
            Ok(symbols) => symbols,
            Err(e) => return normalizer::error_response(&e),
        };

        let deadline = Instant::now() + self.request_deadline;
        let quotes = self
            .orchestrator
            .bulk_quote(&symbols, &self.bulk_range, &self.bulk_interval, deadline)
            .await;
        normalizer::bulk_outcome(quotes)
    }

    fn chart_params(
        &self,
        sym: Option<&str>,
        range: Option<&str>,
        interval: Option<&str>,
    ) -> Result<(String, String, String), ProxyError> {
        let symbol = sym
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProxyError::invalid("sym", "缺少参数 ?sym="))?;

        let range = pick_param("range", range, &self.default_range, VALID_RANGES)?;
        let interval = pick_param("interval", interval, &self.default_interval, VALID_INTERVALS)?;

        Ok((self.with_suffix(symbol), range, interval))
    }

    /// 拆分、去重（区分大小写，保留首次出现顺序）并检查数量上限
    fn parse_symbols(&self, raw: Option<&str>) -> Result<Vec<String>, ProxyError> {
        let mut seen = HashSet::new();
        let symbols: Vec<String> = raw
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| self.with_suffix(s))
            .filter(|s| seen.insert(s.clone()))
            .collect();

        if symbols.is_empty() {
            return Err(ProxyError::invalid("symbols", "缺少参数 ?symbols="));
        }
        if symbols.len() > self.max_symbols {
            return Err(ProxyError::invalid(
                "symbols",
                format!("最多 {} 个代码，实际 {} 个", self.max_symbols, symbols.len()),
            ));
        }
        Ok(symbols)
    }

    fn with_suffix(&self, symbol: &str) -> String {
        match &self.symbol_suffix {
            Some(suffix) if !symbol.contains('.') => format!("{}{}", symbol, suffix),
            _ => symbol.to_string(),
        }
    }
}

fn pick_param(
    name: &'static str,
    value: Option<&str>,
    default: &str,
    allowed: &[&str],
) -> Result<String, ProxyError> {
    let value = value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(default);
    if allowed.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(ProxyError::invalid(name, format!("不支持的取值 {}", value)))
    }
}
