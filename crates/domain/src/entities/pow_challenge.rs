use serde::{Deserialize, Serialize};

use crate::value_objects::Timestamp;

/// 一次性的工作量证明挑战
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowChallenge {
    /// 随机挑战 ID（十六进制）
    pub id: String,
    /// 摘要需要的前导零比特数
    pub difficulty: u8,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: Timestamp,
}

impl PowChallenge {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }
}
