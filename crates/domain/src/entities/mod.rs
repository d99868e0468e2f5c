//! 领域实体定义
//!
//! 在线状态条目、工作量证明挑战，以及从外部存储读取的房间与用户资料。

pub mod pow_challenge;
pub mod presence;
pub mod room;
pub mod user_profile;

// 重新导出核心实体
pub use pow_challenge::PowChallenge;
pub use presence::PresenceEntry;
pub use room::{Membership, Room};
pub use user_profile::UserProfile;
