//! User-Agent 提供者
//!
//! 轮换策略作为可插拔配置，不写死在控制流里

use rand::seq::IndexedRandom;

/// User-Agent 来源
pub trait UserAgentProvider: Send + Sync {
    /// 为一次入站请求选取 User-Agent，该请求的所有尝试共用
    fn pick(&self) -> Option<String>;
}

/// 从配置列表中随机选取
pub struct RotatingUserAgents {
    agents: Vec<String>,
}

impl RotatingUserAgents {
    pub fn new(agents: Vec<String>) -> Self {
        Self {
            agents: agents.into_iter().filter(|a| !a.trim().is_empty()).collect(),
        }
    }
}

impl UserAgentProvider for RotatingUserAgents {
    fn pick(&self) -> Option<String> {
        self.agents.choose(&mut rand::rng()).cloned()
    }
}

/// 固定值，测试用
#[cfg(test)]
pub struct FixedUserAgent(pub String);

#[cfg(test)]
impl UserAgentProvider for FixedUserAgent {
    fn pick(&self) -> Option<String> {
        Some(self.0.clone())
    }
}
