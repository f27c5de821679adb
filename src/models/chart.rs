//! 上游图表接口数据模型
//!
//! 对应 `{host}/v8/finance/chart/{symbol}` 返回的 JSON 结构，
//! 只声明用到的字段，且全部可缺省，以容忍上游字段增减

use serde::Deserialize;

/// 图表接口响应外层
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartEnvelope {
    #[serde(default)]
    pub chart: ChartBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartBody {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

/// 上游错误对象
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ChartError {
    pub fn is_not_found(&self) -> bool {
        self.code.as_deref() == Some("Not Found")
    }

    pub fn describe(&self) -> String {
        self.description
            .clone()
            .or_else(|| self.code.clone())
            .unwrap_or_else(|| "Not found".to_string())
    }
}

/// 单个代码的时间序列（RawSeriesPayload）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub meta: ChartMeta,
    #[serde(default)]
    pub indicators: Indicators,
}

/// 摘要元数据，每个字段独立可空
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub currency: Option<String>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub regular_market_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub chart_previous_close: Option<f64>,
    pub regular_market_volume: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub market_cap: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteSeries>,
}

/// 并列数组形式的收盘价与成交量，可能含 null
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteSeries {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

impl ChartResult {
    /// 按时间顺序排列的非空收盘价
    pub fn closes(&self) -> Vec<f64> {
        self.indicators
            .quote
            .first()
            .map(|q| q.close.iter().flatten().copied().filter(|v| v.is_finite()).collect())
            .unwrap_or_default()
    }

    /// 最后一个非空成交量
    pub fn last_volume(&self) -> Option<f64> {
        self.indicators
            .quote
            .first()
            .and_then(|q| q.volume.iter().rev().flatten().copied().find(|v| v.is_finite()))
    }
}

/// 通过校验的单代码图表数据
///
/// 同时保留原始响应体，单图表请求原样透传给调用方
#[derive(Debug, Clone)]
pub struct ChartPayload {
    pub raw: String,
    pub series: ChartResult,
}
