use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseConfig,
    pub grading: GradingConfig,
    pub sweep: SweepConfig,
}

/// 应用设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub system_name: String,
    pub environment: String,
    pub log_level: String,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,    // 数据库连接 URL（从 scheme 自动推断类型）
    pub pool_size: u32, // 连接池大小
    pub timeout: u64,   // 连接超时 (秒)
}

/// 评分模型配置
///
/// 引擎在构造时接收本结构体的克隆，不读取全局状态，
/// 测试可以直接构造假配置。api_key 为空即进入占位评分路径。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingConfig {
    #[serde(skip_serializing, default)] // 不序列化到JSON响应中
    pub api_key: Option<String>,
    pub base_url: String,     // OpenAI 兼容 API 地址
    pub model: String,        // 模型名称
    pub timeout_secs: u64,    // 单次模型调用超时 (秒)
    pub temperature: f32,     // 评分请求温度，0 以保证重评可复现
}

impl GradingConfig {
    /// 是否配置了模型凭证
    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

/// 截止时间清扫配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}
