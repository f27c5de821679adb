//! 报价重建
//!
//! 批量报价接口不可用时，从单代码时间序列推导出等价的报价记录。
//! 纯函数，相同输入得到相同输出

use crate::models::{ChartResult, QuoteRecord};

/// 从单代码时间序列重建报价
///
/// 元数据价格和非空收盘价都缺失时返回 `None`（NotFound）。
///
/// 字段回退规则：
/// - 价格：元数据实时价，否则最后一个非空收盘价
/// - 昨收：序列倒数第二个非空收盘价优先于元数据字段。休市时元数据里的昨收可能过期，
///   序列推导的值在不同时间范围下保持自洽
/// - 成交量：元数据成交量，否则最后一个非空成交量
/// - 52 周高低：元数据值，否则取现有收盘价的最大/最小值。
///   只有查询范围覆盖 52 周时才准确，短范围得到的是降级值
/// - 名称：short name、long name，最后回退到代码本身
pub fn reconstruct(symbol: &str, series: &ChartResult) -> Option<QuoteRecord> {
    let meta = &series.meta;
    let closes = series.closes();

    let price = meta
        .regular_market_price
        .filter(|p| p.is_finite())
        .or_else(|| closes.last().copied())?;

    let previous_close = match closes.len() {
        n if n >= 2 => Some(closes[n - 2]),
        _ => meta.previous_close.or(meta.chart_previous_close),
    };

    let (change, change_percent) = match previous_close {
        Some(prev) if prev != 0.0 => {
            let change = price - prev;
            (Some(change), Some(change / prev * 100.0))
        }
        _ => (None, None),
    };

    let volume = meta
        .regular_market_volume
        .or_else(|| series.last_volume())
        .and_then(to_volume);

    let fifty_two_week_high = meta
        .fifty_two_week_high
        .or_else(|| closes.iter().copied().reduce(f64::max));
    let fifty_two_week_low = meta
        .fifty_two_week_low
        .or_else(|| closes.iter().copied().reduce(f64::min));

    let name = [&meta.short_name, &meta.long_name]
        .into_iter()
        .flatten()
        .map(|n| n.trim())
        .find(|n| !n.is_empty())
        .unwrap_or(symbol)
        .to_string();

    Some(QuoteRecord {
        symbol: symbol.to_string(),
        name,
        price,
        previous_close,
        change,
        change_percent,
        volume,
        fifty_two_week_high,
        fifty_two_week_low,
        market_cap: meta.market_cap,
        currency: meta.currency.clone(),
    })
}

fn to_volume(v: f64) -> Option<u64> {
    (v.is_finite() && v >= 0.0).then(|| v.round() as u64)
}
