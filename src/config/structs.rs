use serde::{Deserialize, Serialize};

/// 环境变量兼容映射：(变量名, 配置键)
///
/// 部署环境沿用的变量名，优先级高于 `MR__` 前缀变量。
pub const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("DATABASE_URL", "database.database_url"),
    ("JWT_SECRET_KEY", "auth.jwt_secret"),
    ("GOOGLE_API_KEY", "ai.api_key"),
    ("SMTP_SERVER", "smtp.server"),
    ("SMTP_PORT", "smtp.port"),
    ("SMTP_USER", "smtp.username"),
    ("SMTP_PASSWORD", "smtp.password"),
    ("FROM_EMAIL", "smtp.from_email"),
    ("VAPID_PUBLIC_KEY", "push.vapid_public_key"),
    ("VAPID_PRIVATE_KEY", "push.vapid_private_key"),
    ("VAPID_PRIVATE_KEY_PATH", "push.vapid_private_key_path"),
    ("VAPID_MAILTO", "push.vapid_mailto"),
];

/// 应用配置（TOML + 环境变量）
///
/// 优先级：兼容环境变量 > `MR__*` > config.toml > 默认值
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub formulary: FormularyConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// ENV 前缀：MR，分隔符：__
    /// 示例：MR__SERVER__PORT=9000
    pub fn load(path: Option<&str>) -> Self {
        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("[ERROR] Failed to load config: {}", e);
                Self::default()
            }
        }
    }

    pub fn try_load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        use config::{Config, Environment, File};

        let path = path.unwrap_or("config.toml");

        let mut builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖
            .add_source(
                Environment::with_prefix("MR")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .with_list_parse_key("rate_limit.trusted_proxies")
                    .try_parsing(true),
            );

        // 3. 兼容旧变量名
        for (var, key) in LEGACY_ENV_KEYS {
            if let Ok(value) = std::env::var(var)
                && !value.is_empty()
            {
                builder = builder.set_override(*key, value)?;
            }
        }

        let config = builder.build()?.try_deserialize::<AppConfig>()?;
        if std::path::Path::new(path).exists() {
            eprintln!("[INFO] Configuration loaded from: {}", path);
        }
        Ok(config)
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 请求体上限（KB），图片以 base64 传输，需要大于 7MB
    #[serde(default = "default_payload_limit_kb")]
    pub payload_limit_kb: usize,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// 为空时启动生成随机密钥（重启后 token 失效）
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: u64,
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: u64,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cors_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_true")]
    pub allow_credentials: bool,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

/// 按客户端 IP 的限流配置（每分钟请求数）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_login_per_minute")]
    pub login_per_minute: u32,
    #[serde(default = "default_ocr_per_minute")]
    pub ocr_per_minute: u32,
    #[serde(default = "default_risk_per_minute")]
    pub risk_per_minute: u32,
    /// 为空时：来自私有地址的连接信任 X-Forwarded-For
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

/// 生成式模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

/// NLEM 药品目录配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormularyConfig {
    #[serde(default = "default_formulary_path")]
    pub csv_path: String,
    #[serde(default = "default_formulary_top_k")]
    pub top_k: usize,
}

/// SMTP 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_server")]
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_from_email")]
    pub from_email: String,
}

impl SmtpConfig {
    pub fn is_configured(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
            && self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Web Push (VAPID) 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub vapid_public_key: Option<String>,
    /// base64url 编码的 P-256 私钥标量
    #[serde(default)]
    pub vapid_private_key: Option<String>,
    /// PEM 私钥文件（PKCS#8 或 SEC1），优先于 vapid_private_key
    #[serde(default)]
    pub vapid_private_key_path: Option<String>,
    #[serde(default = "default_vapid_mailto")]
    pub vapid_mailto: String,
    #[serde(default = "default_push_ttl")]
    pub ttl_secs: u32,
    #[serde(default = "default_push_timeout")]
    pub timeout_secs: u64,
}

/// 提醒 Worker 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_worker_interval")]
    pub poll_interval_secs: u64,
    /// serve 模式下是否同时运行 worker
    #[serde(default = "default_true")]
    pub embedded: bool,
    /// 到期后为下一天生成同一时刻的提醒
    #[serde(default = "default_true")]
    pub daily_rollover: bool,
}

/// SSE 推送配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_sse_poll_interval")]
    pub sse_poll_interval_secs: u64,
    #[serde(default = "default_sse_keepalive")]
    pub keepalive_secs: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_true")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions
// ============================================================

fn default_true() -> bool {
    true
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_payload_limit_kb() -> usize {
    8 * 1024
}

fn default_database_url() -> String {
    "sqlite://mediremind.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_access_token_minutes() -> u64 {
    30
}

fn default_refresh_token_days() -> u64 {
    7
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_cors_max_age() -> u64 {
    3600
}

fn default_login_per_minute() -> u32 {
    10
}

fn default_ocr_per_minute() -> u32 {
    10
}

fn default_risk_per_minute() -> u32 {
    5
}

fn default_ai_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_ai_timeout() -> u64 {
    60
}

fn default_formulary_path() -> String {
    "data/nlem_2022.csv".to_string()
}

fn default_formulary_top_k() -> usize {
    2
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_email() -> String {
    "noreply@mediremind.app".to_string()
}

fn default_vapid_mailto() -> String {
    "mailto:admin@mediremind.app".to_string()
}

fn default_push_ttl() -> u32 {
    86400
}

fn default_push_timeout() -> u64 {
    10
}

fn default_worker_interval() -> u64 {
    10
}

fn default_sse_poll_interval() -> u64 {
    2
}

fn default_sse_keepalive() -> u64 {
    15
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            payload_limit_kb: default_payload_limit_kb(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_minutes: default_access_token_minutes(),
            refresh_token_days: default_refresh_token_days(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: default_cors_origins(),
            allow_credentials: true,
            max_age: default_cors_max_age(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_per_minute: default_login_per_minute(),
            ocr_per_minute: default_ocr_per_minute(),
            risk_per_minute: default_risk_per_minute(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_ai_model(),
            base_url: default_ai_base_url(),
            timeout_secs: default_ai_timeout(),
        }
    }
}

impl Default for FormularyConfig {
    fn default() -> Self {
        Self {
            csv_path: default_formulary_path(),
            top_k: default_formulary_top_k(),
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: default_smtp_server(),
            port: default_smtp_port(),
            username: None,
            password: None,
            from_email: default_from_email(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            vapid_public_key: None,
            vapid_private_key: None,
            vapid_private_key_path: None,
            vapid_mailto: default_vapid_mailto(),
            ttl_secs: default_push_ttl(),
            timeout_secs: default_push_timeout(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_worker_interval(),
            embedded: true,
            daily_rollover: true,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            sse_poll_interval_secs: default_sse_poll_interval(),
            keepalive_secs: default_sse_keepalive(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: true,
        }
    }
}
