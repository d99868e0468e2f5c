use serde::{Deserialize, Serialize};

use crate::value_objects::{RoomId, UserId};

/// 外部存储中的房间记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub slug: String,
    pub name: String,
}

/// 房间成员关系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
    pub room_id: RoomId,
    pub user_id: UserId,
}
