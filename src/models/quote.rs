//! 行情数据模型
//!
//! 定义归一化后的报价记录及请求参数

use serde::{Deserialize, Serialize};

/// 归一化报价记录
///
/// 有效记录一定带有价格；涨跌幅仅在价格和昨收都存在且昨收非零时计算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    /// 代码（保持原始大小写）
    pub symbol: String,
    /// 显示名称
    pub name: String,
    /// 当前价格
    pub price: f64,
    /// 昨收
    pub previous_close: Option<f64>,
    /// 涨跌额
    pub change: Option<f64>,
    /// 涨跌幅（百分比）
    pub change_percent: Option<f64>,
    pub volume: Option<u64>,
    /// 52 周最高
    pub fifty_two_week_high: Option<f64>,
    /// 52 周最低
    pub fifty_two_week_low: Option<f64>,
    pub market_cap: Option<f64>,
    pub currency: Option<String>,
}

/// 单图表查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    /// 代码
    pub sym: Option<String>,
    /// 时间范围（如 1y、3y）
    pub range: Option<String>,
    /// K线周期（如 1d）
    pub interval: Option<String>,
}

/// 批量报价查询参数
#[derive(Debug, Default, Deserialize)]
pub struct QuotesQuery {
    /// 逗号分隔的代码列表
    pub symbols: Option<String>,
}

/// 统一入口查询参数，按是否携带 symbols 判断模式
#[derive(Debug, Default, Deserialize)]
pub struct ProxyQuery {
    pub sym: Option<String>,
    pub symbols: Option<String>,
    pub range: Option<String>,
    pub interval: Option<String>,
}
