//! 统一配置中心
//!
//! 提供防护层的配置管理，包括：
//! - HTTP 服务监听地址与对外域名
//! - JWT 校验密钥
//! - 邀请签名密钥（支持轮换）与工作量证明难度
//! - 各内存存储的定期清理计划
//!
//! 加载顺序：默认值 -> 可选配置文件（`HEARTH_CONFIG_FILE`）-> `HEARTH_` 前缀环境变量
//! -> 兼容的旧环境变量（`HMAC_SECRET_CURRENT`、`HMAC_SECRET_OLD`、`POW_DIFFICULTY`、
//! `HEARTH_DOMAIN`、`JWT_SECRET`）。

use std::env;

use data_encoding::HEXLOWER_PERMISSIVE;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// 配置文件路径的环境变量
pub const CONFIG_FILE_ENV: &str = "HEARTH_CONFIG_FILE";

/// 默认工作量证明难度（比特）
pub const DEFAULT_POW_DIFFICULTY: u8 = 20;
/// 工作量证明难度允许的最大值
pub const MAX_POW_DIFFICULTY: u8 = 32;

const DEV_JWT_SECRET: &str = "dev-secret-key-not-for-production-use-minimum-32-chars";

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// 服务配置
    #[validate(nested)]
    pub server: ServerConfig,
    /// JWT认证配置
    #[validate(nested)]
    pub auth: JwtConfig,
    /// 邀请签名与工作量证明配置
    #[validate(nested)]
    pub security: SecurityConfig,
    /// 定期清理配置
    #[validate(nested)]
    pub sweep: SweepConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    /// 邀请链接中使用的对外域名
    #[validate(length(min = 1))]
    pub public_domain: String,
    /// 是否信任反向代理写入的 `X-Forwarded-For` / `X-Real-IP`
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

/// JWT配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JwtConfig {
    #[validate(length(min = 32))]
    pub secret: String,
    #[validate(range(min = 1))]
    pub expiration_hours: i64,
}

/// 邀请签名与工作量证明配置
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct SecurityConfig {
    /// 当前 HMAC 密钥（十六进制，非十六进制时按原始字节使用）
    #[serde(default)]
    pub hmac_secret_current: Option<String>,
    /// 轮换前的旧密钥，保留期间旧邀请仍然有效
    #[serde(default)]
    pub hmac_secret_old: Option<String>,
    /// 无法解析或超出 1..=32 时回退为默认难度
    #[serde(deserialize_with = "lenient_pow_difficulty")]
    pub pow_difficulty: u8,
    #[validate(range(min = 1))]
    pub pow_challenge_ttl_secs: u64,
}

/// 定期清理配置（六段式 cron 表达式，含秒）
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SweepConfig {
    #[validate(length(min = 1))]
    pub rate_limit_schedule: String,
    #[validate(range(min = 1))]
    pub rate_limit_max_age_secs: u64,
    #[validate(length(min = 1))]
    pub pow_schedule: String,
    #[validate(length(min = 1))]
    pub presence_schedule: String,
    #[validate(range(min = 1))]
    pub presence_threshold_secs: u64,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("hmac_secret_current", &redacted(&self.hmac_secret_current))
            .field("hmac_secret_old", &redacted(&self.hmac_secret_old))
            .field("pow_difficulty", &self.pow_difficulty)
            .field("pow_challenge_ttl_secs", &self.pow_challenge_ttl_secs)
            .finish()
    }
}

fn redacted(value: &Option<String>) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => "[REDACTED]",
        _ => "<unset>",
    }
}

impl SecurityConfig {
    /// 解码后的当前密钥
    pub fn current_secret(&self) -> Option<Vec<u8>> {
        self.hmac_secret_current.as_deref().and_then(decode_secret)
    }

    /// 解码后的旧密钥
    pub fn previous_secret(&self) -> Option<Vec<u8>> {
        self.hmac_secret_old.as_deref().and_then(decode_secret)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 8090,
                public_domain: "localhost:8090".into(),
                trust_proxy_headers: false,
            },
            auth: JwtConfig {
                secret: DEV_JWT_SECRET.into(),
                expiration_hours: 24,
            },
            security: SecurityConfig {
                hmac_secret_current: None,
                hmac_secret_old: None,
                pow_difficulty: DEFAULT_POW_DIFFICULTY,
                pow_challenge_ttl_secs: 300,
            },
            sweep: SweepConfig {
                rate_limit_schedule: "0 */5 * * * *".into(),
                rate_limit_max_age_secs: 600,
                pow_schedule: "0 */5 * * * *".into(),
                presence_schedule: "0 */2 * * * *".into(),
                presence_threshold_secs: 60,
            },
        }
    }
}

impl AppConfig {
    /// 按 默认值 -> 配置文件 -> 环境变量 的顺序加载并校验
    pub fn load() -> Result<Self, ConfigError> {
        let mut fig = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = env::var(CONFIG_FILE_ENV) {
            if path.ends_with(".yml") || path.ends_with(".yaml") {
                fig = fig.merge(Yaml::file(path));
            } else if path.ends_with(".json") {
                fig = fig.merge(Json::file(path));
            } else {
                fig = fig.merge(Toml::file(path));
            }
        }
        fig = fig.merge(Env::prefixed("HEARTH_").split("__"));

        let mut cfg: AppConfig = fig.extract()?;
        cfg.apply_legacy_env(|name| env::var(name).ok());
        cfg.ensure_valid()?;
        Ok(cfg)
    }

    /// 覆盖兼容的旧环境变量，`lookup` 便于在测试中替换环境
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(secret) = non_empty("HMAC_SECRET_CURRENT") {
            self.security.hmac_secret_current = Some(secret);
        }
        if let Some(secret) = non_empty("HMAC_SECRET_OLD") {
            self.security.hmac_secret_old = Some(secret);
        }
        if let Some(raw) = non_empty("POW_DIFFICULTY") {
            self.security.pow_difficulty = parse_pow_difficulty(&raw);
        }
        if let Some(domain) = non_empty("HEARTH_DOMAIN") {
            self.server.public_domain = domain;
        }
        if let Some(secret) = non_empty("JWT_SECRET") {
            self.auth.secret = secret;
        }
    }

    /// 字段校验加上跨字段检查
    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if !(1..=MAX_POW_DIFFICULTY).contains(&self.security.pow_difficulty) {
            return Err(ConfigError::InvalidSecurityConfig(format!(
                "pow_difficulty must be between 1 and {MAX_POW_DIFFICULTY}"
            )));
        }

        for schedule in [
            &self.sweep.rate_limit_schedule,
            &self.sweep.pow_schedule,
            &self.sweep.presence_schedule,
        ] {
            if schedule.split_whitespace().count() != 6 {
                return Err(ConfigError::InvalidSweepConfig(format!(
                    "expected a six-field cron expression, got `{schedule}`"
                )));
            }
        }

        Ok(())
    }

    /// 是否仍在使用开发用的 JWT 密钥
    pub fn uses_development_jwt_secret(&self) -> bool {
        self.auth.secret == DEV_JWT_SECRET
    }

    /// 用于日志输出的脱敏摘要
    pub fn sanitize(&self) -> String {
        format!(
            "server={}:{} domain={} trust_proxy_headers={} pow_difficulty={} invite_secret={} previous_secret={}",
            self.server.host,
            self.server.port,
            self.server.public_domain,
            self.server.trust_proxy_headers,
            self.security.pow_difficulty,
            redacted(&self.security.hmac_secret_current),
            redacted(&self.security.hmac_secret_old),
        )
    }
}

/// 解析难度，无法解析或超出 1..=32 时使用默认值 20
pub fn parse_pow_difficulty(raw: &str) -> u8 {
    raw.trim()
        .parse::<i64>()
        .map_or(DEFAULT_POW_DIFFICULTY, pow_difficulty_or_default)
}

fn pow_difficulty_or_default(difficulty: i64) -> u8 {
    match u8::try_from(difficulty) {
        Ok(d) if (1..=MAX_POW_DIFFICULTY).contains(&d) => d,
        _ => DEFAULT_POW_DIFFICULTY,
    }
}

/// 配置文件与环境变量中的难度可能是数字也可能是任意字符串
fn lenient_pow_difficulty<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDifficulty {
        Number(i64),
        Float(f64),
        Text(String),
    }

    Ok(match RawDifficulty::deserialize(deserializer)? {
        RawDifficulty::Number(n) => pow_difficulty_or_default(n),
        RawDifficulty::Float(_) => DEFAULT_POW_DIFFICULTY,
        RawDifficulty::Text(raw) => parse_pow_difficulty(&raw),
    })
}

/// 十六进制密钥解码，非十六进制时按原始字节使用；空串视为未配置
pub fn decode_secret(raw: &str) -> Option<Vec<u8>> {
    if raw.is_empty() {
        return None;
    }
    Some(
        HEXLOWER_PERMISSIVE
            .decode(raw.as_bytes())
            .unwrap_or_else(|_| raw.as_bytes().to_vec()),
    )
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] figment::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
    #[error("Invalid security configuration: {0}")]
    InvalidSecurityConfig(String),
    #[error("Invalid sweep configuration: {0}")]
    InvalidSweepConfig(String),
}
