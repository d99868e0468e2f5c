#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use application::{
    directory::memory::MemoryDirectory, pow::DEFAULT_CHALLENGE_TTL, Clock, GuardContext,
    GuardSettings, InviteSecrets, ManualClock, MembershipDirectory,
};
use axum::Router;
use domain::{Room, RoomId, UserId, UserProfile};
use reqwest::Client;
use tokio::{net::TcpListener, sync::oneshot};
use uuid::Uuid;
use web_api::{router, AppState, JwtConfig, JwtService};

pub const TEST_JWT_SECRET: &str = "integration-test-jwt-secret-0123456789";
pub const CURRENT_SECRET: &[u8] = b"current-invite-secret";
pub const OLD_SECRET: &[u8] = b"previous-invite-secret";

/// 测试数据：一个房间，两个成员（其中一个没有昵称）和一个非成员
pub struct World {
    pub kitchen: Room,
    pub alice: UserId,
    pub bob: UserId,
    pub carol: UserId,
}

pub struct TestOptions {
    pub invite_secrets: InviteSecrets,
    pub pow_difficulty: u8,
    pub trust_proxy_headers: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            invite_secrets: InviteSecrets::new(
                Some(CURRENT_SECRET.to_vec()),
                Some(OLD_SECRET.to_vec()),
            ),
            pow_difficulty: 8,
            trust_proxy_headers: false,
        }
    }
}

pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    pub clock: Arc<ManualClock>,
    pub guards: Arc<GuardContext>,
    pub jwt: Arc<JwtService>,
    pub world: World,
    _shutdown: oneshot::Sender<()>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn clock_unix(&self) -> i64 {
        self.clock.now().unix_timestamp()
    }

    pub fn token_for(&self, user: UserId) -> String {
        self.jwt.generate_token(user).expect("token")
    }
}

pub async fn seed_world(directory: &MemoryDirectory) -> World {
    let kitchen = Room {
        id: RoomId::from(Uuid::new_v4()),
        slug: "the-kitchen".into(),
        name: "The Kitchen".into(),
    };
    let alice = UserId::from(Uuid::new_v4());
    let bob = UserId::from(Uuid::new_v4());
    let carol = UserId::from(Uuid::new_v4());

    directory.add_room(kitchen.clone()).await;
    directory
        .add_user(UserProfile {
            id: alice,
            display_name: "Alice".into(),
            email: "alice@example.com".into(),
        })
        .await;
    directory
        .add_user(UserProfile {
            id: bob,
            display_name: String::new(),
            email: "bob@example.com".into(),
        })
        .await;
    directory
        .add_user(UserProfile {
            id: carol,
            display_name: "Carol".into(),
            email: "carol@example.com".into(),
        })
        .await;
    directory.add_member(kitchen.id, alice).await;
    directory.add_member(kitchen.id, bob).await;

    World {
        kitchen,
        alice,
        bob,
        carol,
    }
}

pub fn jwt_service() -> Arc<JwtService> {
    Arc::new(JwtService::new(JwtConfig {
        secret: TEST_JWT_SECRET.to_string(),
        expiration_hours: 1,
    }))
}

pub fn build_state(
    options: &TestOptions,
    clock: Arc<dyn Clock>,
    directory: Arc<dyn MembershipDirectory>,
) -> AppState {
    let settings = GuardSettings {
        pow_difficulty: options.pow_difficulty,
        pow_challenge_ttl: DEFAULT_CHALLENGE_TTL,
        invite_secrets: options.invite_secrets.clone(),
        public_domain: "hearth.test".into(),
    };
    let guards = Arc::new(GuardContext::new(settings, clock));
    AppState::new(guards, directory, jwt_service())
        .with_trusted_proxy_headers(options.trust_proxy_headers)
}

async fn serve(router: Router) -> (String, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
        .ok();
    });

    (format!("http://{}", addr), shutdown_tx)
}

pub async fn spawn_app(options: TestOptions) -> TestApp {
    let clock = Arc::new(ManualClock::starting_now());
    let directory = Arc::new(MemoryDirectory::new());
    let world = seed_world(&directory).await;

    let state = build_state(&options, clock.clone(), directory);
    let guards = state.guards.clone();
    let jwt = state.jwt_service.clone();
    let (base_url, shutdown) = serve(router(state)).await;

    TestApp {
        base_url,
        client: Client::new(),
        clock,
        guards,
        jwt,
        world,
        _shutdown: shutdown,
    }
}
