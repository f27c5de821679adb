//! 测试用脚本化 Transport

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::services::transport::{Transport, TransportResponse};

/// 脚本化的单次响应
pub struct Reply {
    pub latency: Duration,
    pub result: Result<TransportResponse, TransportError>,
}

impl Reply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            latency: Duration::ZERO,
            result: Ok(TransportResponse {
                status,
                body: body.into(),
            }),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn status(status: u16) -> Self {
        Self::new(status, "")
    }

    pub fn err(error: TransportError) -> Self {
        Self {
            latency: Duration::ZERO,
            result: Err(error),
        }
    }

    /// 延迟返回
    pub fn after(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

struct CallRecord {
    url: String,
    headers: Vec<(String, String)>,
    settled_before: usize,
}

type Script = Box<dyn Fn(&str) -> Reply + Send + Sync>;

/// 按 URL 返回脚本化响应，并记录调用顺序与并发情况
pub struct ScriptedTransport {
    script: Script,
    calls: Mutex<Vec<CallRecord>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    settled: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(script: impl Fn(&str) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            settled: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.url.clone()).collect()
    }

    pub fn headers_of(&self, index: usize) -> Vec<(String, String)> {
        self.calls.lock().unwrap()[index].headers.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// 每次调用开始时已结束（成功、失败或被取消）的调用数
    pub fn settled_before_each_call(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|c| c.settled_before).collect()
    }
}

/// 调用结束或被丢弃时更新计数
struct InFlight<'a>(&'a ScriptedTransport);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.0.settled.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        _timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push(CallRecord {
            url: url.to_string(),
            headers: headers.to_vec(),
            settled_before: self.settled.load(Ordering::SeqCst),
        });
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(self);

        let reply = (self.script)(url);
        if !reply.latency.is_zero() {
            tokio::time::sleep(reply.latency).await;
        }
        reply.result
    }
}

/// 构造图表接口响应体
pub fn chart_body(symbol: &str, closes: &[Option<f64>]) -> String {
    let volumes: Vec<Option<u64>> = closes.iter().map(|c| c.map(|_| 1000)).collect();
    serde_json::json!({
        "chart": {
            "result": [{
                "meta": { "symbol": symbol, "currency": "USD" },
                "timestamp": (0..closes.len() as i64).map(|i| 1_700_000_000 + i * 86_400).collect::<Vec<_>>(),
                "indicators": { "quote": [{ "close": closes, "volume": volumes }] }
            }],
            "error": null
        }
    })
    .to_string()
}

/// 上游声明代码不存在时的响应体
pub fn not_found_body() -> String {
    r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#
        .to_string()
}
