use std::sync::Arc;
use std::time::Duration;

use config::AppConfig;

use crate::clock::Clock;
use crate::invite::{InviteSecrets, InviteTokenService};
use crate::pow::PowChallenger;
use crate::presence::PresenceTracker;
use crate::rate_limiter::TokenBucketLimiter;

/// 构建防护组件所需的配置子集
#[derive(Debug, Clone)]
pub struct GuardSettings {
    pub pow_difficulty: u8,
    pub pow_challenge_ttl: Duration,
    pub invite_secrets: InviteSecrets,
    pub public_domain: String,
}

impl From<&AppConfig> for GuardSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            pow_difficulty: config.security.pow_difficulty,
            pow_challenge_ttl: Duration::from_secs(config.security.pow_challenge_ttl_secs),
            invite_secrets: InviteSecrets::from_config(&config.security),
            public_domain: config.server.public_domain.clone(),
        }
    }
}

/// 进程内唯一的一组防护组件，启动时构建一次后共享给请求处理与定时清扫
///
/// 四个组件互不共享状态，各自持有自己的锁。
pub struct GuardContext {
    pub rate_limiter: TokenBucketLimiter,
    pub presence: PresenceTracker,
    pub pow: PowChallenger,
    pub invites: InviteTokenService,
    pub pow_difficulty: u8,
}

impl GuardContext {
    pub fn new(settings: GuardSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            rate_limiter: TokenBucketLimiter::new(clock.clone()),
            presence: PresenceTracker::new(clock.clone()),
            pow: PowChallenger::new(clock.clone(), settings.pow_challenge_ttl),
            invites: InviteTokenService::new(
                settings.invite_secrets,
                settings.public_domain,
                clock,
            ),
            pow_difficulty: settings.pow_difficulty,
        }
    }

    pub fn sweep_rate_limits(&self, max_age: Duration) -> usize {
        let removed = self.rate_limiter.sweep_stale(max_age);
        if removed > 0 {
            tracing::info!(removed, remaining = self.rate_limiter.bucket_count(), "清理过期限流桶");
        }
        removed
    }

    pub fn sweep_presence(&self, threshold: Duration) -> usize {
        let removed = self.presence.sweep(threshold);
        if removed > 0 {
            tracing::info!(removed, online = self.presence.online_count(), "清理离线用户");
        }
        removed
    }

    pub fn sweep_pow(&self) -> usize {
        let removed = self.pow.sweep();
        if removed > 0 {
            tracing::info!(removed, pending = self.pow.pending_count(), "清理过期挑战");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use domain::{RateLimitProfile, RoomId, UserId};
    use time::macros::datetime;
    use uuid::Uuid;

    fn context() -> (Arc<ManualClock>, GuardContext) {
        let mut config = AppConfig::default();
        config.security.hmac_secret_current = Some("00112233445566778899aabbccddeeff".into());
        config.security.pow_difficulty = 12;
        config.server.public_domain = "hearth.test".into();

        let clock = Arc::new(ManualClock::new(datetime!(2025-03-01 00:00:00 UTC)));
        let guards = GuardContext::new(GuardSettings::from(&config), clock.clone());
        (clock, guards)
    }

    #[test]
    fn settings_come_from_app_config() {
        let mut config = AppConfig::default();
        config.security.hmac_secret_current = Some("aa".into());
        config.security.pow_challenge_ttl_secs = 90;

        let settings = GuardSettings::from(&config);
        assert_eq!(settings.pow_challenge_ttl, Duration::from_secs(90));
        assert_eq!(settings.invite_secrets.current, Some(vec![0xaa]));
        assert!(settings.invite_secrets.previous.is_none());
        assert_eq!(settings.public_domain, config.server.public_domain);
    }

    #[test]
    fn stores_are_independent() {
        let (_clock, guards) = context();
        let user = UserId::from(Uuid::new_v4());

        guards.rate_limiter.allow("api:1.2.3.4", RateLimitProfile::GENERAL);
        guards.presence.heartbeat(user, RoomId::from(Uuid::new_v4()), "u");
        guards.pow.issue_challenge(guards.pow_difficulty).unwrap();

        assert_eq!(guards.rate_limiter.bucket_count(), 1);
        assert_eq!(guards.presence.online_count(), 1);
        assert_eq!(guards.pow.pending_count(), 1);
        let link = guards.invites.generate_url("r", None).unwrap();
        assert!(link.url.starts_with("https://hearth.test/join?r=r&t="));
    }

    #[test]
    fn sweeps_use_their_own_cutoffs() {
        let (clock, guards) = context();
        guards.rate_limiter.allow("api:1.2.3.4", RateLimitProfile::GENERAL);
        guards
            .presence
            .heartbeat(UserId::from(Uuid::new_v4()), RoomId::from(Uuid::new_v4()), "u");
        guards.pow.issue_challenge(1).unwrap();

        clock.advance(Duration::from_secs(61));
        assert_eq!(guards.sweep_presence(Duration::from_secs(60)), 1);
        assert_eq!(guards.sweep_rate_limits(Duration::from_secs(600)), 0);
        assert_eq!(guards.sweep_pow(), 0);

        clock.advance(Duration::from_secs(600));
        assert_eq!(guards.sweep_rate_limits(Duration::from_secs(600)), 1);
        assert_eq!(guards.sweep_pow(), 1);
    }
}
