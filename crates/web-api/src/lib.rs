//! Web API 层。
//!
//! 提供 Axum 路由：限流中间件包住全部路由，处理器把请求委托给
//! 应用层的防护组件与成员目录。

mod auth;
mod error;
mod invite_routes;
mod pow_routes;
mod presence_routes;
mod rate_limit;
mod routes;
mod state;

pub use auth::{Claims, JwtService};
pub use config::JwtConfig;
pub use error::{ApiError, ErrorBody, RETRY_AFTER_SECS};
pub use rate_limit::client_ip;
pub use routes::router;
pub use state::AppState;
