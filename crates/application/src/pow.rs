//! 工作量证明挑战
//!
//! 服务端下发随机挑战 ID，客户端寻找 `nonce` 使
//! `SHA-256(challenge_id || nonce)` 的前 `difficulty` 个比特全为零。
//! 挑战只能使用一次：校验时先取出再判断，无论成功与否都会被删除。

use std::sync::Arc;
use std::time::Duration;

use data_encoding::HEXLOWER;
use domain::PowChallenge;
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::ttl_map::TtlMap;

/// 挑战有效期
pub const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(5 * 60);

const CHALLENGE_ID_BYTES: usize = 16;
const PROOF_TOKEN_BYTES: usize = 32;

/// 校验失败的内部原因，只用于服务端日志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PowRejection {
    #[error("unknown or already used challenge")]
    UnknownChallenge,
    #[error("challenge expired")]
    Expired,
    #[error("solution does not meet difficulty")]
    InvalidSolution,
}

pub struct PowChallenger {
    challenges: TtlMap<String, PowChallenge>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    rng: SystemRandom,
}

impl PowChallenger {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            challenges: TtlMap::new(),
            clock,
            ttl,
            rng: SystemRandom::new(),
        }
    }

    pub fn issue_challenge(&self, difficulty: u8) -> Result<PowChallenge, ApplicationError> {
        let challenge = PowChallenge {
            id: self.random_hex(CHALLENGE_ID_BYTES)?,
            difficulty,
            expires_at: self.clock.now() + self.ttl,
        };
        self.challenges.insert(challenge.id.clone(), challenge.clone());
        Ok(challenge)
    }

    /// 原子地取出挑战并校验解答
    pub fn verify_and_consume(&self, challenge_id: &str, nonce: &str) -> Result<(), PowRejection> {
        let challenge = self
            .challenges
            .take(challenge_id)
            .ok_or(PowRejection::UnknownChallenge)?;

        if challenge.is_expired(self.clock.now()) {
            return Err(PowRejection::Expired);
        }
        if !verify_solution(&challenge.id, nonce, challenge.difficulty) {
            return Err(PowRejection::InvalidSolution);
        }
        Ok(())
    }

    /// 解题成功后发给客户端的一次性凭证
    pub fn issue_proof_token(&self) -> Result<String, ApplicationError> {
        self.random_hex(PROOF_TOKEN_BYTES)
    }

    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        self.challenges.sweep(|_, challenge| challenge.is_expired(now))
    }

    pub fn pending_count(&self) -> usize {
        self.challenges.len()
    }

    fn random_hex(&self, len: usize) -> Result<String, ApplicationError> {
        let mut bytes = vec![0u8; len];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| ApplicationError::infrastructure("secure random source unavailable"))?;
        Ok(HEXLOWER.encode(&bytes))
    }
}

pub fn verify_solution(challenge_id: &str, nonce: &str, difficulty: u8) -> bool {
    let mut ctx = digest::Context::new(&digest::SHA256);
    ctx.update(challenge_id.as_bytes());
    ctx.update(nonce.as_bytes());
    meets_difficulty(ctx.finish().as_ref(), difficulty)
}

/// 摘要的前 `difficulty` 个比特（从第 0 字节最高位开始）是否全为零
pub fn meets_difficulty(digest: &[u8], difficulty: u8) -> bool {
    let full_bytes = usize::from(difficulty / 8);
    let remaining_bits = difficulty % 8;

    let needed = full_bytes + usize::from(remaining_bits > 0);
    if digest.len() < needed {
        return false;
    }
    if digest[..full_bytes].iter().any(|byte| *byte != 0) {
        return false;
    }
    if remaining_bits > 0 {
        let mask = 0xFFu8 << (8 - remaining_bits);
        return digest[full_bytes] & mask == 0;
    }
    true
}

/// 暴力求解，依次尝试十进制数字作为 nonce
pub fn solve_challenge(challenge_id: &str, difficulty: u8, max_attempts: u64) -> Option<String> {
    (0..max_attempts)
        .map(|attempt| attempt.to_string())
        .find(|nonce| verify_solution(challenge_id, nonce, difficulty))
}
