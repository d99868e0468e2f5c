use std::sync::Arc;
use std::time::Duration;

use domain::{RateLimitProfile, Timestamp};

use crate::clock::Clock;
use crate::ttl_map::TtlMap;

/// 单个键的令牌桶
#[derive(Debug, Clone, PartialEq)]
pub struct RateBucket {
    /// 当前可用令牌（允许为小数）
    pub tokens: f64,
    /// 上一次检查的时间，单调不减
    pub last_check: Timestamp,
    pub max_tokens: f64,
    /// 每秒补充的令牌数
    pub refill_rate: f64,
}

impl RateBucket {
    /// 首次出现的键：本次请求本身消耗一个令牌
    fn first_seen(profile: RateLimitProfile, now: Timestamp) -> Self {
        Self {
            tokens: (profile.max_tokens - 1.0).max(0.0),
            last_check: now,
            max_tokens: profile.max_tokens,
            refill_rate: profile.refill_rate,
        }
    }

    fn try_consume(&mut self, profile: RateLimitProfile, now: Timestamp) -> bool {
        // 时钟回拨按零流逝处理
        let elapsed = (now - self.last_check).as_seconds_f64().max(0.0);
        if now > self.last_check {
            self.last_check = now;
        }
        self.max_tokens = profile.max_tokens;
        self.refill_rate = profile.refill_rate;
        self.tokens = (self.tokens + elapsed * profile.refill_rate).min(profile.max_tokens);

        if self.tokens < 1.0 {
            return false;
        }
        self.tokens -= 1.0;
        true
    }
}

/// 按键计数的连续令牌桶限流器
///
/// 桶在首次请求时惰性创建，由定期清扫回收。同一个键上的检查与扣减
/// 在一次写锁内完成。
pub struct TokenBucketLimiter {
    buckets: TtlMap<String, RateBucket>,
    clock: Arc<dyn Clock>,
}

impl TokenBucketLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: TtlMap::new(),
            clock,
        }
    }

    /// 放行返回 `true`，配额耗尽返回 `false`
    pub fn allow(&self, key: &str, profile: RateLimitProfile) -> bool {
        let now = self.clock.now();
        self.buckets.upsert(
            key,
            || (RateBucket::first_seen(profile, now), true),
            |bucket| bucket.try_consume(profile, now),
        )
    }

    /// 删除 `max_age` 内未被访问过的桶
    pub fn sweep_stale(&self, max_age: Duration) -> usize {
        let cutoff = self.clock.now() - max_age;
        self.buckets.sweep(|_, bucket| bucket.last_check < cutoff)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn available_tokens(&self, key: &str) -> Option<f64> {
        self.buckets.get_with(key, |bucket| bucket.tokens)
    }
}
