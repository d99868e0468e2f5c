use std::sync::Arc;

use application::{GuardContext, MembershipDirectory};

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub guards: Arc<GuardContext>,
    pub directory: Arc<dyn MembershipDirectory>,
    pub jwt_service: Arc<JwtService>,
    /// 是否信任 X-Forwarded-For / X-Real-IP（仅在反向代理之后开启）
    pub trust_proxy_headers: bool,
}

impl AppState {
    pub fn new(
        guards: Arc<GuardContext>,
        directory: Arc<dyn MembershipDirectory>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            guards,
            directory,
            jwt_service,
            trust_proxy_headers: false,
        }
    }

    pub fn with_trusted_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }
}
