//! 应用层：进程内的请求防护组件。
//!
//! 令牌桶限流、在线状态、工作量证明挑战与邀请签名四个组件各自独立加锁，
//! 由 [`GuardContext`] 在启动时统一构建。房间与成员关系通过
//! [`MembershipDirectory`] 从外部存储读取。

pub mod clock;
pub mod context;
pub mod directory;
pub mod error;
pub mod invite;
pub mod pow;
pub mod presence;
pub mod rate_limiter;
pub mod ttl_map;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{GuardContext, GuardSettings};
pub use directory::{require_membership, MembershipDirectory};
pub use error::ApplicationError;
pub use invite::{InviteLink, InviteSecrets, InviteTokenService};
pub use pow::{PowChallenger, PowRejection};
pub use presence::PresenceTracker;
pub use rate_limiter::{RateBucket, TokenBucketLimiter};
pub use ttl_map::TtlMap;

#[cfg(any(test, feature = "testing"))]
pub use directory::MockMembershipDirectory;
