//! 聊天服务防护层的领域模型
//!
//! 包含限流档位、在线状态条目、工作量证明挑战等核心类型，
//! 以及由外部存储提供的房间与用户信息。

pub mod entities;
pub mod errors;
pub mod rate_limit;
pub mod value_objects;

// 重新导出常用类型
pub use entities::*;
pub use errors::*;
pub use rate_limit::*;
pub use value_objects::*;
