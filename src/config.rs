//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 上游接受的时间范围
pub const VALID_RANGES: &[&str] = &[
    "1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "3y", "5y", "10y", "ytd", "max",
];

/// 上游接受的 K 线周期
pub const VALID_INTERVALS: &[&str] = &[
    "1m", "2m", "5m", "15m", "30m", "60m", "90m", "1h", "1d", "5d", "1wk", "1mo", "3mo",
];

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// 上游配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// 候选主机，按顺序尝试
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,
    /// 单次请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// 单个入站请求的总时限（秒）
    #[serde(default = "default_request_deadline")]
    pub request_deadline_secs: u64,
    /// 轮换使用的 User-Agent
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
    #[serde(default = "default_referer")]
    pub referer: String,
    #[serde(default = "default_origin")]
    pub origin: String,
    /// 交易所后缀（如 ".NS"），仅追加到不含 "." 的代码
    #[serde(default)]
    pub symbol_suffix: Option<String>,
}

/// 单图表默认参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_chart_range")]
    pub default_range: String,
    #[serde(default = "default_chart_interval")]
    pub default_interval: String,
}

/// 批量报价配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// 重建报价用的短时间范围
    #[serde(default = "default_bulk_range")]
    pub range: String,
    #[serde(default = "default_chart_interval")]
    pub interval: String,
    /// 每批并发数
    #[serde(default = "default_batch_width")]
    pub batch_width: usize,
    /// 单次请求最多代码数
    #[serde(default = "default_max_symbols")]
    pub max_symbols: usize,
}

/// 跨域及缓存头配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allow_origin")]
    pub allow_origin: String,
    /// Cache-Control max-age（秒）
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub bulk: BulkConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_hosts() -> Vec<String> {
    vec![
        "https://query1.finance.yahoo.com".to_string(),
        "https://query2.finance.yahoo.com".to_string(),
    ]
}
fn default_timeout() -> u64 { 25 }
fn default_connect_timeout() -> u64 { 10 }
fn default_request_deadline() -> u64 { 55 }
fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36".to_string(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0".to_string(),
    ]
}
fn default_referer() -> String { "https://finance.yahoo.com/".to_string() }
fn default_origin() -> String { "https://finance.yahoo.com".to_string() }
fn default_chart_range() -> String { "3y".to_string() }
fn default_chart_interval() -> String { "1d".to_string() }
fn default_bulk_range() -> String { "5d".to_string() }
fn default_batch_width() -> usize { 10 }
fn default_max_symbols() -> usize { 100 }
fn default_allow_origin() -> String { "*".to_string() }
fn default_cache_max_age() -> u64 { 900 }
fn default_log_level() -> String { "info".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            request_deadline_secs: default_request_deadline(),
            user_agents: default_user_agents(),
            referer: default_referer(),
            origin: default_origin(),
            symbol_suffix: None,
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            default_range: default_chart_range(),
            default_interval: default_chart_interval(),
        }
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            range: default_bulk_range(),
            interval: default_chart_interval(),
            batch_width: default_batch_width(),
            max_symbols: default_max_symbols(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: default_allow_origin(),
            cache_max_age_secs: default_cache_max_age(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// 配置加载结果
pub struct LoadedConfig {
    pub config: AppConfig,
    /// 配置文件路径，None 表示使用默认配置
    pub source: Option<String>,
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// 日志初始化后补记加载过程
    pub fn log(&self) {
        for warning in &self.warnings {
            log::warn!("{}", warning);
        }
        match &self.source {
            Some(path) => log::info!("从 {} 加载配置成功", path),
            None => log::info!("使用默认配置"),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_secs(self.request_deadline_secs)
    }
}

impl BulkConfig {
    /// 并发宽度限制在 1..=50
    pub fn effective_batch_width(&self) -> usize {
        self.batch_width.clamp(1, 50)
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件 {} 失败", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，优先从 QUOTE_PROXY_CONFIG 指定的文件，其次默认路径，失败则使用默认值
    ///
    /// 此时日志尚未初始化，加载过程中的信息随结果返回，由调用方记录
    pub fn load() -> LoadedConfig {
        let explicit = env::var("QUOTE_PROXY_CONFIG").ok();
        let config_paths = explicit
            .iter()
            .map(String::as_str)
            .chain(["config.json", "config/config.json"]);
        let mut warnings = Vec::new();

        for path in config_paths {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(config) => {
                        return LoadedConfig {
                            config,
                            source: Some(path.to_string()),
                            warnings,
                        };
                    }
                    Err(e) => {
                        warnings.push(format!("加载配置文件 {} 失败: {:#}", path, e));
                    }
                }
            }
        }

        LoadedConfig {
            config: Self::default(),
            source: None,
            warnings,
        }
    }

    /// 启动前校验
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.upstream.hosts.len() < 2 {
            bail!("upstream.hosts 至少需要 2 个候选主机，当前 {}", self.upstream.hosts.len());
        }
        for host in &self.upstream.hosts {
            url::Url::parse(host).with_context(|| format!("无效的上游主机: {}", host))?;
        }
        let upstream = &self.upstream;
        if upstream.timeout_secs == 0 {
            bail!("upstream.timeout_secs 必须大于 0");
        }
        if upstream.connect_timeout_secs == 0 {
            bail!("upstream.connect_timeout_secs 必须大于 0");
        }
        if upstream.request_deadline_secs < upstream.timeout_secs {
            bail!(
                "upstream.request_deadline_secs ({}) 不能小于 timeout_secs ({})",
                upstream.request_deadline_secs,
                upstream.timeout_secs
            );
        }

        let windows = [
            ("chart.default_range", &self.chart.default_range, VALID_RANGES),
            ("chart.default_interval", &self.chart.default_interval, VALID_INTERVALS),
            ("bulk.range", &self.bulk.range, VALID_RANGES),
            ("bulk.interval", &self.bulk.interval, VALID_INTERVALS),
        ];
        for (name, value, allowed) in windows {
            if !allowed.contains(&value.as_str()) {
                bail!("{} 不支持的取值 {}", name, value);
            }
        }
        if self.bulk.max_symbols == 0 {
            bail!("bulk.max_symbols 必须大于 0");
        }
        Ok(())
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
