mod support;

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

use support::{spawn_app, TestApp, TestOptions};

async fn heartbeat(app: &TestApp, token: &str, room_id: &str) -> reqwest::Response {
    app.client
        .post(app.url("/api/hearth/presence/heartbeat"))
        .bearer_auth(token)
        .json(&json!({ "room_id": room_id }))
        .send()
        .await
        .expect("heartbeat request")
}

async fn online(app: &TestApp, token: &str, room_id: &str) -> reqwest::Response {
    app.client
        .get(app.url(&format!("/api/hearth/presence/{room_id}")))
        .bearer_auth(token)
        .send()
        .await
        .expect("presence request")
}

#[tokio::test]
async fn presence_management_flow() {
    let app = spawn_app(TestOptions::default()).await;
    let room_id = app.world.kitchen.id.to_string();
    let alice = app.token_for(app.world.alice);
    let bob = app.token_for(app.world.bob);

    let response = heartbeat(&app, &alice, &room_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({ "ok": true }));
    assert_eq!(heartbeat(&app, &bob, &room_id).await.status(), StatusCode::OK);

    let body: Value = online(&app, &alice, &room_id).await.json().await.unwrap();
    assert_eq!(body["count"], 2);
    let mut names: Vec<String> = body["online"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["display_name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    // bob 没有昵称，显示邮箱
    assert_eq!(names, vec!["Alice".to_string(), "bob@example.com".to_string()]);
    let first = &body["online"][0];
    assert_eq!(first["room_id"], room_id);
    assert!(first["updated_at"].as_str().unwrap().contains('T'));

    // bob 停止心跳，超过阈值后被清扫
    app.clock.advance(Duration::from_secs(45));
    assert_eq!(heartbeat(&app, &alice, &room_id).await.status(), StatusCode::OK);
    app.clock.advance(Duration::from_secs(30));
    assert_eq!(app.guards.sweep_presence(Duration::from_secs(60)), 1);

    let body: Value = online(&app, &alice, &room_id).await.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["online"][0]["user_id"], app.world.alice.to_string());

    let left: Value = app
        .client
        .post(app.url("/api/hearth/presence/leave"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(left["removed"], true);
    assert_eq!(app.guards.presence.online_count(), 0);
}

#[tokio::test]
async fn non_members_and_anonymous_callers_are_rejected() {
    let app = spawn_app(TestOptions::default()).await;
    let room_id = app.world.kitchen.id.to_string();
    let carol = app.token_for(app.world.carol);

    assert_eq!(
        heartbeat(&app, &carol, &room_id).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(online(&app, &carol, &room_id).await.status(), StatusCode::FORBIDDEN);

    let anonymous = app
        .client
        .get(app.url(&format!("/api/hearth/presence/{room_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let forged = online(&app, "not-a-jwt", &room_id).await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn heartbeat_validates_room_id() {
    let app = spawn_app(TestOptions::default()).await;
    let alice = app.token_for(app.world.alice);

    assert_eq!(heartbeat(&app, &alice, "").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        heartbeat(&app, &alice, "kitchen").await.status(),
        StatusCode::BAD_REQUEST
    );
    let unknown_room = uuid::Uuid::new_v4().to_string();
    assert_eq!(
        heartbeat(&app, &alice, &unknown_room).await.status(),
        StatusCode::NOT_FOUND
    );
}
