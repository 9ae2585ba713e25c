mod helpers;

use axum::http::StatusCode;
use helpers::{
    assert_silent, connect_ws, get_json, make_test_app, post_json, recv_event, register_user,
    spawn_server, unread_count,
};
use serde_json::json;

#[tokio::test]
async fn create_room_seeds_counters_for_all_members() {
    let (app, _state) = make_test_app().await;
    let (_u1, t1) = register_user(&app, "alice").await;
    let (u2, t2) = register_user(&app, "bob").await;
    let (u3, t3) = register_user(&app, "carol").await;
    // Fourth member keeps the default room's member set distinct from the
    // one being created below.
    register_user(&app, "dave").await;

    let (status, body) = post_json(
        &app,
        "/api/rooms",
        Some(&t1),
        json!({ "targets": [u2, u3], "name": "planning" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create room failed: {body}");
    let room_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["member_ids"].as_array().unwrap().len(), 3);

    // Counters exist at zero for creator and both invitees.
    assert_eq!(unread_count(&app, &t1, room_id).await, 0);
    assert_eq!(unread_count(&app, &t2, room_id).await, 0);
    assert_eq!(unread_count(&app, &t3, room_id).await, 0);
}

#[tokio::test]
async fn room_created_event_goes_to_invitees_only() {
    let (app, _state) = make_test_app().await;
    let (u1, t1) = register_user(&app, "alice").await;
    let (u2, t2) = register_user(&app, "bob").await;
    let (u3, t3) = register_user(&app, "carol").await;
    register_user(&app, "dave").await;

    let addr = spawn_server(app.clone()).await;
    let mut ws1 = connect_ws(&addr, &t1).await.unwrap();
    let mut ws2 = connect_ws(&addr, &t2).await.unwrap();
    let mut ws3 = connect_ws(&addr, &t3).await.unwrap();

    let (status, body) = post_json(
        &app,
        "/api/rooms",
        Some(&t1),
        json!({ "targets": [u2, u3] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let room_id = body["data"]["id"].as_i64().unwrap();

    for ws in [&mut ws2, &mut ws3] {
        let event = recv_event(ws).await;
        assert_eq!(event["event"], "ROOM_CREATED");
        assert_eq!(event["payload"]["room_id"], room_id);
        assert_eq!(event["payload"]["created_by_user_id"], u1);
    }

    // The creator is not notified about their own room.
    assert_silent(&mut ws1, 200).await;
}

#[tokio::test]
async fn create_room_rejects_duplicate_name() {
    let (app, _state) = make_test_app().await;
    let (_u1, t1) = register_user(&app, "alice").await;
    let (u2, _) = register_user(&app, "bob").await;
    register_user(&app, "carol").await;

    let (status, _) = post_json(
        &app,
        "/api/rooms",
        Some(&t1),
        json!({ "targets": [u2], "name": "planning" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(
        &app,
        "/api/rooms",
        Some(&t1),
        json!({ "targets": [u2], "name": "planning" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn create_room_rejects_duplicate_member_set() {
    let (app, _state) = make_test_app().await;
    let (u1, t1) = register_user(&app, "alice").await;
    let (u2, t2) = register_user(&app, "bob").await;
    register_user(&app, "carol").await;

    let (status, _) = post_json(&app, "/api/rooms", Some(&t1), json!({ "targets": [u2] })).await;
    assert_eq!(status, StatusCode::OK);

    // Same pair again, this time from the other side and unnamed.
    let (status, _) = post_json(&app, "/api/rooms", Some(&t2), json!({ "targets": [u1] })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_room_with_unknown_target_creates_nothing() {
    let (app, _state) = make_test_app().await;
    let (_u1, t1) = register_user(&app, "alice").await;
    let (u2, _) = register_user(&app, "bob").await;

    let (status, _) = post_json(
        &app,
        "/api/rooms",
        Some(&t1),
        json!({ "targets": [u2, 9999] }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // No partial room: the caller still only has the default room.
    let (_, body) = get_json(&app, "/api/me", Some(&t1)).await;
    assert_eq!(body["data"]["rooms"].as_array().unwrap().len(), 1);
}
