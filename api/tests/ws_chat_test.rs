mod helpers;

use axum::http::StatusCode;
use futures_util::SinkExt;
use helpers::{
    assert_silent, connect_ws, make_test_app, post_json, recv_event, recv_text, register_user,
    spawn_server, unread_count,
};
use serde_json::json;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{Error, protocol::Message};
use tokio_tungstenite::connect_async;

async fn default_room_id(app: &axum::Router, token: &str) -> i64 {
    let (_, body) = helpers::get_json(app, "/api/me", Some(token)).await;
    body["data"]["rooms"][0]["id"].as_i64().unwrap()
}

async fn join_room(ws: &mut helpers::ws::WsClient, room_id: i64) {
    ws.send(Message::Text(
        json!({ "type": "join_room", "current_room_id": room_id })
            .to_string()
            .into(),
    ))
    .await
    .unwrap();
}

#[tokio::test]
async fn unauthenticated_connection_is_rejected() {
    let (app, _state) = make_test_app().await;
    let addr = spawn_server(app).await;

    let url = format!("ws://{addr}/ws/chat");
    let req = url.into_client_request().unwrap();
    match connect_async(req).await {
        Ok(_) => panic!("unauthenticated connection must not be admitted"),
        Err(Error::Http(resp)) => assert_eq!(resp.status(), 401),
        Err(e) => panic!("unexpected error: {e:?}"),
    }
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let (app, _state) = make_test_app().await;
    let addr = spawn_server(app).await;

    let url = format!("ws://{addr}/ws/chat?token=garbage");
    let req = url.into_client_request().unwrap();
    match connect_async(req).await {
        Ok(_) => panic!("invalid token must not be admitted"),
        Err(Error::Http(resp)) => assert_eq!(resp.status(), 401),
        Err(e) => panic!("unexpected error: {e:?}"),
    }
}

#[tokio::test]
async fn server_responds_to_app_ping() {
    let (app, _state) = make_test_app().await;
    let (_u1, t1) = register_user(&app, "alice").await;
    let addr = spawn_server(app).await;

    let mut ws = connect_ws(&addr, &t1).await.unwrap();
    ws.send(Message::Text(json!({ "type": "ping" }).to_string().into()))
        .await
        .unwrap();

    let frame = recv_text(&mut ws).await;
    assert_eq!(frame["type"], "pong");
}

#[tokio::test]
async fn join_resets_counter_and_notifies_only_that_user() {
    let (app, _state) = make_test_app().await;
    let (_u1, t1) = register_user(&app, "alice").await;
    let (_u2, t2) = register_user(&app, "bob").await;
    let room_id = default_room_id(&app, &t1).await;

    // Bob offline; Alice posts; Bob's counter goes to 1.
    let (status, _) = post_json(
        &app,
        &format!("/api/rooms/{room_id}/messages"),
        Some(&t1),
        json!({ "content": "hi" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unread_count(&app, &t2, room_id).await, 1);

    let addr = spawn_server(app.clone()).await;
    let mut ws1 = connect_ws(&addr, &t1).await.unwrap();
    let mut ws2 = connect_ws(&addr, &t2).await.unwrap();

    // Bob joins the room: counter resets and only Bob hears about it.
    join_room(&mut ws2, room_id).await;
    let event = recv_event(&mut ws2).await;
    assert_eq!(event["event"], "UNREAD_COUNT_CHANGED");
    assert_eq!(event["payload"]["room_id"], room_id);
    assert_eq!(event["payload"]["count"], 0);

    assert_eq!(unread_count(&app, &t2, room_id).await, 0);
    assert_silent(&mut ws1, 200).await;
}

#[tokio::test]
async fn viewing_member_stays_at_zero_and_receives_chat() {
    let (app, _state) = make_test_app().await;
    let (_u1, t1) = register_user(&app, "alice").await;
    let (u2, t2) = register_user(&app, "bob").await;
    let room_id = default_room_id(&app, &t1).await;

    let addr = spawn_server(app.clone()).await;
    let mut ws2 = connect_ws(&addr, &t2).await.unwrap();
    join_room(&mut ws2, room_id).await;
    let event = recv_event(&mut ws2).await;
    assert_eq!(event["event"], "UNREAD_COUNT_CHANGED");

    // Alice posts while Bob is viewing the room.
    let (status, _) = post_json(
        &app,
        &format!("/api/rooms/{room_id}/messages"),
        Some(&t1),
        json!({ "content": "hello bob" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Bob gets his zeroed counter and the message itself.
    let counter_event = recv_event(&mut ws2).await;
    assert_eq!(counter_event["event"], "UNREAD_COUNT_CHANGED");
    assert_eq!(counter_event["payload"]["count"], 0);

    let chat_event = recv_event(&mut ws2).await;
    assert_eq!(chat_event["event"], "RECEIVED_CHAT");
    assert_eq!(chat_event["payload"]["content"], "hello bob");
    assert_eq!(chat_event["payload"]["user"]["username"], "alice");
    assert_eq!(chat_event["topic"], format!("user:{u2}"));

    assert_eq!(unread_count(&app, &t2, room_id).await, 0);
}

#[tokio::test]
async fn repeated_joins_are_idempotent() {
    let (app, _state) = make_test_app().await;
    let (_u1, t1) = register_user(&app, "alice").await;
    let room_id = default_room_id(&app, &t1).await;

    let addr = spawn_server(app.clone()).await;
    let mut ws = connect_ws(&addr, &t1).await.unwrap();

    for _ in 0..3 {
        join_room(&mut ws, room_id).await;
        let event = recv_event(&mut ws).await;
        assert_eq!(event["event"], "UNREAD_COUNT_CHANGED");
        assert_eq!(event["payload"]["count"], 0);
    }

    assert_eq!(unread_count(&app, &t1, room_id).await, 0);
}

#[tokio::test]
async fn join_of_missing_room_reports_not_found() {
    let (app, _state) = make_test_app().await;
    let (_u1, t1) = register_user(&app, "alice").await;

    let addr = spawn_server(app).await;
    let mut ws = connect_ws(&addr, &t1).await.unwrap();

    join_room(&mut ws, 424242).await;
    let frame = recv_text(&mut ws).await;
    assert_eq!(frame["type"], "error");
    assert_eq!(frame["code"], "not_found");
}

#[tokio::test]
async fn join_of_foreign_room_is_forbidden() {
    let (app, _state) = make_test_app().await;
    let (_u1, t1) = register_user(&app, "alice").await;
    let (u2, t2) = register_user(&app, "bob").await;
    let (_u3, t3) = register_user(&app, "carol").await;

    let (status, body) = post_json(
        &app,
        "/api/rooms",
        Some(&t1),
        json!({ "targets": [u2], "name": "duo" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let room_id = body["data"]["id"].as_i64().unwrap();
    let _ = t2;

    let addr = spawn_server(app).await;
    let mut ws = connect_ws(&addr, &t3).await.unwrap();

    join_room(&mut ws, room_id).await;
    let frame = recv_text(&mut ws).await;
    assert_eq!(frame["type"], "error");
    assert_eq!(frame["code"], "forbidden");
}

#[tokio::test]
async fn malformed_frame_reports_bad_request() {
    let (app, _state) = make_test_app().await;
    let (_u1, t1) = register_user(&app, "alice").await;

    let addr = spawn_server(app).await;
    let mut ws = connect_ws(&addr, &t1).await.unwrap();

    ws.send(Message::Text("{not json".into())).await.unwrap();
    let frame = recv_text(&mut ws).await;
    assert_eq!(frame["type"], "error");
    assert_eq!(frame["code"], "bad_request");
}

#[tokio::test]
async fn newest_connection_decides_viewing_state() {
    let (app, _state) = make_test_app().await;
    let (_u1, t1) = register_user(&app, "alice").await;
    let (_u2, t2) = register_user(&app, "bob").await;
    let room_id = default_room_id(&app, &t1).await;

    let addr = spawn_server(app.clone()).await;

    // Bob's first device stays connected but idle; his second device joins
    // the room and becomes the current session.
    let mut ws_old = connect_ws(&addr, &t2).await.unwrap();
    let mut ws_new = connect_ws(&addr, &t2).await.unwrap();
    join_room(&mut ws_new, room_id).await;
    let event = recv_event(&mut ws_new).await;
    assert_eq!(event["event"], "UNREAD_COUNT_CHANGED");

    // The old device is subscribed to the same personal channel, so it also
    // observed the reset; drain it.
    let event = recv_event(&mut ws_old).await;
    assert_eq!(event["event"], "UNREAD_COUNT_CHANGED");

    // Current session is viewing, so a new message resets rather than
    // increments.
    let (status, _) = post_json(
        &app,
        &format!("/api/rooms/{room_id}/messages"),
        Some(&t1),
        json!({ "content": "one" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unread_count(&app, &t2, room_id).await, 0);

    // The viewing device disconnects; its stale sibling must not bring the
    // "viewing" state back.
    ws_new.close(None).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let (status, _) = post_json(
        &app,
        &format!("/api/rooms/{room_id}/messages"),
        Some(&t1),
        json!({ "content": "two" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unread_count(&app, &t2, room_id).await, 1);
}
