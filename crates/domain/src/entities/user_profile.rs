use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

/// 外部存储中的用户资料（仅包含在线状态需要的字段）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
}

impl UserProfile {
    /// 在线列表中展示的名字，未设置昵称时退回到邮箱
    pub fn presence_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.email
        } else {
            &self.display_name
        }
    }
}
