use serde::{Deserialize, Serialize};

use crate::value_objects::{RoomId, Timestamp, UserId};

/// 单个用户的在线状态
///
/// 以用户为键存储，因此一个用户同一时间只会出现在一个房间中。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub user_id: UserId,
    pub room_id: RoomId,
    pub display_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: Timestamp,
}

impl PresenceEntry {
    pub fn new(
        user_id: UserId,
        room_id: RoomId,
        display_name: impl Into<String>,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            user_id,
            room_id,
            display_name: display_name.into(),
            updated_at,
        }
    }

    /// 最后一次心跳早于 `cutoff` 即视为过期
    pub fn is_stale(&self, cutoff: Timestamp) -> bool {
        self.updated_at < cutoff
    }
}
