//! 业务逻辑服务模块
//!
//! 上游回退、报价重建与响应归一化

pub mod normalizer;    // 响应归一化
pub mod orchestrator;  // 回退编排
pub mod plan;          // 请求计划
pub mod proxy;         // 对外操作
pub mod reconstruct;   // 报价重建
pub mod transport;     // 上游传输
pub mod user_agent;    // User-Agent 轮换

#[cfg(test)]
pub mod testing;

pub use proxy::QuoteProxy;
