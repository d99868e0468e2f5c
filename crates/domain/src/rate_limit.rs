//! 限流档位与端点分类
//!
//! 每一类端点对应一个固定的令牌桶档位，并使用独立的键前缀，
//! 保证某一类请求耗尽配额时不会影响其他类别。

use serde::{Deserialize, Serialize};

/// 令牌桶档位：容量与每秒补充速率
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitProfile {
    /// 桶容量
    pub max_tokens: f64,
    /// 每秒补充的令牌数
    pub refill_rate: f64,
}

impl RateLimitProfile {
    /// 登录：15 分钟 5 次
    pub const AUTH: Self = Self::new(5.0, 5.0 / 900.0);
    /// 刷新令牌：每分钟 10 次
    pub const AUTH_REFRESH: Self = Self::new(10.0, 10.0 / 60.0);
    /// 邀请校验：每分钟 10 次
    pub const INVITE_VALIDATE: Self = Self::new(10.0, 10.0 / 60.0);
    /// 通用 API：每分钟 120 次
    pub const GENERAL: Self = Self::new(120.0, 2.0);
    /// 发送消息：每用户每分钟 30 条
    pub const MESSAGE_CREATE: Self = Self::new(30.0, 0.5);
    /// 心跳：每分钟 6 次（正常为 30 秒一次）
    pub const PRESENCE_HEARTBEAT: Self = Self::new(6.0, 0.1);

    pub const fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            max_tokens,
            refill_rate,
        }
    }
}

/// 需要限流的端点类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointCategory {
    Auth,
    AuthRefresh,
    InviteValidate,
    MessageCreate,
    PresenceHeartbeat,
    General,
}

const AUTH_PATH: &str = "/api/collections/users/auth-with-password";
const AUTH_REFRESH_PATH: &str = "/api/collections/users/auth-refresh";
const INVITE_VALIDATE_PATH: &str = "/api/hearth/invite/validate";
const MESSAGE_CREATE_PATH: &str = "/api/collections/messages/records";
const HEARTBEAT_PATH: &str = "/api/hearth/presence/heartbeat";

impl EndpointCategory {
    /// 按请求方法与路径前缀分类，先匹配者优先
    pub fn classify(method: &str, path: &str) -> Self {
        if path.starts_with(AUTH_REFRESH_PATH) {
            Self::AuthRefresh
        } else if path.starts_with(AUTH_PATH) {
            Self::Auth
        } else if path.starts_with(INVITE_VALIDATE_PATH) {
            Self::InviteValidate
        } else if method.eq_ignore_ascii_case("POST") && path.starts_with(MESSAGE_CREATE_PATH) {
            Self::MessageCreate
        } else if path.starts_with(HEARTBEAT_PATH) {
            Self::PresenceHeartbeat
        } else {
            Self::General
        }
    }

    pub fn profile(self) -> RateLimitProfile {
        match self {
            Self::Auth => RateLimitProfile::AUTH,
            Self::AuthRefresh => RateLimitProfile::AUTH_REFRESH,
            Self::InviteValidate => RateLimitProfile::INVITE_VALIDATE,
            Self::MessageCreate => RateLimitProfile::MESSAGE_CREATE,
            Self::PresenceHeartbeat => RateLimitProfile::PRESENCE_HEARTBEAT,
            Self::General => RateLimitProfile::GENERAL,
        }
    }

    pub fn key_prefix(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::AuthRefresh => "auth-refresh",
            Self::InviteValidate => "invite",
            Self::MessageCreate => "msg",
            Self::PresenceHeartbeat => "hb",
            Self::General => "api",
        }
    }

    /// 是否优先按已认证用户计数（未认证时退回到客户端 IP）
    pub fn keyed_by_user(self) -> bool {
        matches!(self, Self::MessageCreate | Self::PresenceHeartbeat)
    }

    /// 生成令牌桶的键，例如 `hb:<user_id>`、`auth:<ip>`
    pub fn bucket_key(self, identity: &str) -> String {
        format!("{}:{}", self.key_prefix(), identity)
    }
}
