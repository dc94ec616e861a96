use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub participation: ParticipationConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 允许跨域的前端地址，为空时放行所有来源
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

/// 过期活动调度器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// 完成通知与级联清理之间的等待
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipationConfig {
    /// 通用参与的防刷窗口
    #[serde(default = "default_anti_spam_window_ms")]
    pub anti_spam_window_ms: i64,
    #[serde(default = "default_milestone_threshold")]
    pub milestone_threshold: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotificationConfig {
    #[serde(default)]
    pub discord_webhook_url: Option<String>,
    #[serde(default)]
    pub whatsapp_relay_url: Option<String>,
    #[serde(default)]
    pub whatsapp_relay_token: Option<String>,
    /// 通知消息中附带的站点链接
    #[serde(default)]
    pub site_url: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    60_000
}

fn default_settle_delay_ms() -> u64 {
    5_000
}

fn default_anti_spam_window_ms() -> i64 {
    24 * 60 * 60 * 1000
}

fn default_milestone_threshold() -> i64 {
    7
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: default_poll_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for ParticipationConfig {
    fn default() -> Self {
        Self {
            anti_spam_window_ms: default_anti_spam_window_ms(),
            milestone_threshold: default_milestone_threshold(),
        }
    }
}

impl ParticipationConfig {
    pub fn anti_spam_window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.anti_spam_window_ms)
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is required when config.toml is absent")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                        cors_allowed_origins: Vec::new(),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                        refresh_token_expires_in: get_env_parse(
                            "JWT_REFRESH_EXPIRES_IN",
                            2_592_000i64,
                        ),
                    },
                    scheduler: SchedulerConfig::default(),
                    participation: ParticipationConfig::default(),
                    notifications: NotificationConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Unable to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}").into())
    }

    // 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get_env("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Some(v) = get_env("CORS_ALLOWED_ORIGINS") {
            self.server.cors_allowed_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(v) = get_env("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = get_env("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Some(v) = get_env("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Some(v) = get_env("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.access_token_expires_in = n;
        }
        if let Some(v) = get_env("JWT_REFRESH_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.refresh_token_expires_in = n;
        }

        // 调度器
        if let Some(v) = get_env("SCHEDULER_ENABLED")
            && let Ok(b) = v.parse()
        {
            self.scheduler.enabled = b;
        }
        if let Some(v) = get_env("POLL_INTERVAL_MS")
            && let Ok(n) = v.parse()
        {
            self.scheduler.poll_interval_ms = n;
        }
        if let Some(v) = get_env("SETTLE_DELAY_MS")
            && let Ok(n) = v.parse()
        {
            self.scheduler.settle_delay_ms = n;
        }

        // 参与规则
        if let Some(v) = get_env("ANTI_SPAM_WINDOW_MS")
            && let Ok(n) = v.parse()
        {
            self.participation.anti_spam_window_ms = n;
        }
        if let Some(v) = get_env("MILESTONE_THRESHOLD")
            && let Ok(n) = v.parse()
        {
            self.participation.milestone_threshold = n;
        }

        // 通知
        if let Some(v) = get_env("DISCORD_WEBHOOK_URL") {
            self.notifications.discord_webhook_url = Some(v);
        }
        if let Some(v) = get_env("WHATSAPP_RELAY_URL") {
            self.notifications.whatsapp_relay_url = Some(v);
        }
        if let Some(v) = get_env("WHATSAPP_RELAY_TOKEN") {
            self.notifications.whatsapp_relay_token = Some(v);
        }
        if let Some(v) = get_env("SITE_URL") {
            self.notifications.site_url = Some(v);
        }
    }
}
