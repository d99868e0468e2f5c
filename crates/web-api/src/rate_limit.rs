//! 限流中间件
//!
//! 先按路径把请求归类，再以 `类别前缀:身份` 为键检查令牌桶。消息与心跳类别
//! 优先按已认证用户计数，其余类别按客户端 IP 计数。

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, OriginalUri, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use application::ApplicationError;
use domain::EndpointCategory;

use crate::{error::ApiError, state::AppState};

pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    // nest 之后 Uri 可能被裁剪，分类使用原始路径
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);

    let category = EndpointCategory::classify(request.method().as_str(), &path);
    let ip = client_ip(request.headers(), peer, state.trust_proxy_headers);
    let identity = if category.keyed_by_user() {
        state
            .jwt_service
            .try_user_from_headers(request.headers())
            .map(|user| user.to_string())
            .unwrap_or_else(|| ip.clone())
    } else {
        ip.clone()
    };

    let key = category.bucket_key(&identity);
    if !state.guards.rate_limiter.allow(&key, category.profile()) {
        tracing::warn!(%key, %ip, %path, "请求被限流");
        return ApiError::from(ApplicationError::RateLimited).into_response();
    }

    next.run(request).await
}

/// 解析客户端 IP
///
/// 只有在明确信任反向代理时才读取 `X-Forwarded-For`（取第一跳）与 `X-Real-IP`。
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(ip) = real_ip {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
