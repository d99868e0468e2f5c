use std::sync::Arc;
use std::time::Duration;

use domain::{PresenceEntry, RoomId, UserId};

use crate::clock::Clock;
use crate::ttl_map::TtlMap;

/// 在线状态跟踪器
///
/// 以用户 ID 为键，一个用户同一时间只在一个房间出现；切换房间的心跳
/// 会覆盖旧条目。读操作持共享锁，可并发执行。
pub struct PresenceTracker {
    entries: TtlMap<UserId, PresenceEntry>,
    clock: Arc<dyn Clock>,
}

impl PresenceTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: TtlMap::new(),
            clock,
        }
    }

    /// 记录一次心跳，返回写入后的条目
    pub fn heartbeat(
        &self,
        user_id: UserId,
        room_id: RoomId,
        display_name: impl Into<String>,
    ) -> PresenceEntry {
        let entry = PresenceEntry::new(user_id, room_id, display_name, self.clock.now());
        self.entries.insert(user_id, entry.clone());
        entry
    }

    /// 房间内的在线用户，顺序不固定
    pub fn room_presence(&self, room_id: RoomId) -> Vec<PresenceEntry> {
        self.entries.filter_cloned(|entry| entry.room_id == room_id)
    }

    pub fn sweep(&self, threshold: Duration) -> usize {
        let cutoff = self.clock.now() - threshold;
        self.entries.sweep(|_, entry| entry.is_stale(cutoff))
    }

    pub fn online_count(&self) -> usize {
        self.entries.len()
    }

    /// 用户断开或登出时移除
    pub fn remove(&self, user_id: UserId) -> bool {
        self.entries.take(&user_id).is_some()
    }
}
