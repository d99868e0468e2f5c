//! 无状态的房间邀请链接
//!
//! 邀请不落库：链接里携带房间 slug、过期时间戳与 HMAC-SHA256 签名，
//! 校验时重新计算签名即可。支持当前密钥与上一个密钥同时有效，用于密钥轮换。

use std::fmt;
use std::sync::Arc;

use config::SecurityConfig;
use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use domain::Timestamp;
use ring::hmac;
use serde::Serialize;
use time::OffsetDateTime;

use crate::clock::Clock;
use crate::error::ApplicationError;

/// 默认有效期：24 小时
pub const DEFAULT_INVITE_TTL_SECS: i64 = 24 * 60 * 60;
/// 最长有效期：7 天
pub const MAX_INVITE_TTL_SECS: i64 = 7 * 24 * 60 * 60;

fn invite_payload(room_slug: &str, expires_at: i64) -> String {
    format!("{room_slug}.{expires_at}")
}

/// 对 `slug.expires_at` 计算 HMAC-SHA256，返回小写十六进制
pub fn sign_invite(room_slug: &str, expires_at: i64, secret: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    let tag = hmac::sign(&key, invite_payload(room_slug, expires_at).as_bytes());
    HEXLOWER.encode(tag.as_ref())
}

pub fn generate_invite_url(room_slug: &str, expires_at: i64, secret: &[u8], domain: &str) -> String {
    let signature = sign_invite(room_slug, expires_at, secret);
    format!("https://{domain}/join?r={room_slug}&t={expires_at}&s={signature}")
}

/// 校验邀请签名
///
/// 先检查过期（过期时不做任何密码学运算），再依次用每个密钥以常数时间比较。
/// 十六进制格式错误一律视为无效。
pub fn validate_invite_signature<S: AsRef<[u8]>>(
    room_slug: &str,
    expires_at: i64,
    signature: &str,
    secrets: &[S],
    now_unix: i64,
) -> bool {
    if now_unix > expires_at {
        return false;
    }
    let Ok(provided) = HEXLOWER_PERMISSIVE.decode(signature.as_bytes()) else {
        return false;
    };
    let payload = invite_payload(room_slug, expires_at);
    secrets.iter().any(|secret| {
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_ref());
        hmac::verify(&key, payload.as_bytes(), &provided).is_ok()
    })
}

/// 解析链接中的十进制时间戳
pub fn parse_invite_timestamp(raw: &str) -> Result<i64, ApplicationError> {
    raw.parse::<i64>()
        .map_err(|_| ApplicationError::validation("Invalid timestamp"))
}

/// 邀请签名密钥，当前密钥优先
#[derive(Clone, Default)]
pub struct InviteSecrets {
    pub current: Option<Vec<u8>>,
    pub previous: Option<Vec<u8>>,
}

impl InviteSecrets {
    pub fn new(current: Option<Vec<u8>>, previous: Option<Vec<u8>>) -> Self {
        Self { current, previous }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(security.current_secret(), security.previous_secret())
    }

    /// 校验时尝试的密钥顺序
    pub fn rotation(&self) -> Vec<&[u8]> {
        self.current
            .iter()
            .chain(self.previous.iter())
            .map(Vec::as_slice)
            .collect()
    }
}

impl fmt::Debug for InviteSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InviteSecrets")
            .field("current", &self.current.as_ref().map(|_| "<redacted>"))
            .field("previous", &self.previous.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviteLink {
    pub url: String,
    pub room_slug: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: Timestamp,
}

pub struct InviteTokenService {
    secrets: InviteSecrets,
    domain: String,
    clock: Arc<dyn Clock>,
}

impl InviteTokenService {
    pub fn new(secrets: InviteSecrets, domain: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            secrets,
            domain: domain.into(),
            clock,
        }
    }

    /// 生成邀请链接；`expires_in` 缺省或非正数时取 24 小时，最长 7 天
    pub fn generate_url(
        &self,
        room_slug: &str,
        expires_in: Option<i64>,
    ) -> Result<InviteLink, ApplicationError> {
        let secret = self
            .secrets
            .current
            .as_deref()
            .ok_or_else(|| ApplicationError::configuration("HMAC secret not configured"))?;

        let ttl = match expires_in {
            Some(secs) if secs > 0 => secs.min(MAX_INVITE_TTL_SECS),
            _ => DEFAULT_INVITE_TTL_SECS,
        };
        let expires_unix = self.clock.now().unix_timestamp() + ttl;
        let expires_at = OffsetDateTime::from_unix_timestamp(expires_unix)
            .map_err(|err| ApplicationError::infrastructure(err.to_string()))?;

        Ok(InviteLink {
            url: generate_invite_url(room_slug, expires_unix, secret, &self.domain),
            room_slug: room_slug.to_string(),
            expires_at,
        })
    }

    pub fn validate(
        &self,
        room_slug: &str,
        expires_at: i64,
        signature: &str,
    ) -> Result<bool, ApplicationError> {
        let rotation = self.secrets.rotation();
        if rotation.is_empty() {
            return Err(ApplicationError::configuration("HMAC secret not configured"));
        }
        Ok(validate_invite_signature(
            room_slug,
            expires_at,
            signature,
            &rotation,
            self.clock.now().unix_timestamp(),
        ))
    }
}
