//! 请求计划
//!
//! 一次逻辑请求要依次尝试的上游候选列表。每次调用各自持有一份计划，
//! 通过迭代器消费，不存在跨请求共享的 "已尝试" 计数

use std::vec;

use url::Url;

/// 单个上游候选（主机 × 接口版本）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// 候选主机，用于诊断
    pub host: String,
    /// 完整请求地址
    pub url: String,
}

/// 有序候选列表，耗尽即失败
#[derive(Debug, Clone, Default)]
pub struct FetchPlan {
    candidates: Vec<Candidate>,
}

impl FetchPlan {
    /// 构建图表接口计划：`{host}/v8/finance/chart/{symbol}?interval=&range=&includePrePost=false`
    pub fn chart(hosts: &[String], symbol: &str, range: &str, interval: &str) -> Self {
        let candidates = hosts
            .iter()
            .filter_map(|host| match chart_url(host, symbol, range, interval) {
                Some(url) => Some(Candidate {
                    host: host.clone(),
                    url,
                }),
                None => {
                    log::warn!("跳过无效的上游主机: {}", host);
                    None
                }
            })
            .collect();

        Self { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl IntoIterator for FetchPlan {
    type Item = Candidate;
    type IntoIter = vec::IntoIter<Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.into_iter()
    }
}

fn chart_url(host: &str, symbol: &str, range: &str, interval: &str) -> Option<String> {
    let mut url = Url::parse(host).ok()?;
    // 代码作为单独路径段写入，"/" 等特殊字符会被编码
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(["v8", "finance", "chart", symbol]);
    url.query_pairs_mut()
        .append_pair("interval", interval)
        .append_pair("range", range)
        .append_pair("includePrePost", "false");
    Some(url.into())
}
