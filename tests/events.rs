//! Integration tests for event CRUD, capacity-checked joins and the
//! participation decision flow.

mod common;

use common::*;
use serde_json::json;
use serial_test::serial;

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL test database"]
async fn create_and_get_event() {
    let app = TestApp::spawn().await;
    let (facility_id, _) = seed_facility_and_user(&app).await;

    let response = app
        .post(
            "/events",
            json!({
                "title": "Evening Pickup",
                "desc": "Casual games",
                "date": "2025-12-12",
                "fac_id": facility_id,
                "max_p": 10,
            }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    let event_id = body["event"]["event_id"].as_i64().unwrap();
    assert_eq!(body["event"]["curr_p"], 0);

    let fetched = app.get(&format!("/events/{}", event_id)).await;
    assert_eq!(fetched.status().as_u16(), 200);
    let event: serde_json::Value = fetched.json().await.unwrap();
    assert_eq!(event["title"], "Evening Pickup");
    assert_eq!(event["max_p"], 10);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL test database"]
async fn create_event_rejects_negative_capacity() {
    let app = TestApp::spawn().await;
    let (facility_id, _) = seed_facility_and_user(&app).await;

    let response = app
        .post(
            "/events",
            json!({
                "title": "Bad Event",
                "date": "2025-12-12",
                "fac_id": facility_id,
                "max_p": -1,
            }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL test database"]
async fn join_event_increments_participants_and_notifies() {
    let app = TestApp::spawn().await;
    let (facility_id, uid) = seed_facility_and_user(&app).await;
    let event_id = app.seed_event(facility_id, "Morning Run", 5);

    let response = app
        .post(&format!("/events/{}/join", event_id), json!({"uid": uid}))
        .await;

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["title"], "Morning Run");
    assert_eq!(body["participants"], 1);
    assert_eq!(app.event_curr_p(event_id), 1);

    let notifications = app.notifications_for(&uid);
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].message, "You joined: Morning Run");
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL test database"]
async fn join_full_event_is_rejected() {
    let app = TestApp::spawn().await;
    let (facility_id, uid) = seed_facility_and_user(&app).await;
    let event_id = app.seed_event(facility_id, "Tiny Event", 1);

    let first = app
        .post(&format!("/events/{}/join", event_id), json!({"uid": uid}))
        .await;
    assert_eq!(first.status().as_u16(), 201);

    let other = TestApp::unique_uid();
    app.seed_user(&other);
    let second = app
        .post(&format!("/events/{}/join", event_id), json!({"uid": other}))
        .await;

    assert_eq!(second.status().as_u16(), 409);
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["code"], "EVENT_FULL");
    assert_eq!(app.event_curr_p(event_id), 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL test database"]
async fn joining_twice_is_a_conflict() {
    let app = TestApp::spawn().await;
    let (facility_id, uid) = seed_facility_and_user(&app).await;
    let event_id = app.seed_event(facility_id, "Doubles", 4);

    app.post(&format!("/events/{}/join", event_id), json!({"uid": uid}))
        .await;
    let again = app
        .post(&format!("/events/{}/join", event_id), json!({"uid": uid}))
        .await;

    assert_eq!(again.status().as_u16(), 409);
    let body: serde_json::Value = again.json().await.unwrap();
    assert_eq!(body["code"], "ALREADY_JOINED");
    assert_eq!(app.event_curr_p(event_id), 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL test database"]
async fn leave_event_decrements_participants() {
    let app = TestApp::spawn().await;
    let (facility_id, uid) = seed_facility_and_user(&app).await;
    let event_id = app.seed_event(facility_id, "Doubles", 4);

    app.post(&format!("/events/{}/join", event_id), json!({"uid": uid}))
        .await;

    let response = app
        .post(&format!("/events/{}/leave", event_id), json!({"uid": uid}))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(app.event_curr_p(event_id), 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL test database"]
async fn leave_without_joining_is_not_found() {
    let app = TestApp::spawn().await;
    let (facility_id, uid) = seed_facility_and_user(&app).await;
    let event_id = app.seed_event(facility_id, "Doubles", 4);

    let response = app
        .post(&format!("/events/{}/leave", event_id), json!({"uid": uid}))
        .await;

    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "NOT_REGISTERED");
    assert_eq!(app.event_curr_p(event_id), 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL test database"]
async fn join_missing_event_is_not_found() {
    let app = TestApp::spawn().await;
    let uid = TestApp::unique_uid();
    app.seed_user(&uid);

    let response = app.post("/events/999999/join", json!({"uid": uid})).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL test database"]
async fn list_participants_in_join_order() {
    let app = TestApp::spawn().await;
    let (facility_id, first_uid) = seed_facility_and_user(&app).await;
    let event_id = app.seed_event(facility_id, "Tournament", 8);
    let second_uid = TestApp::unique_uid();
    app.seed_user(&second_uid);

    app.post(&format!("/events/{}/join", event_id), json!({"uid": first_uid}))
        .await;
    app.post(&format!("/events/{}/join", event_id), json!({"uid": second_uid}))
        .await;

    let response = app.get(&format!("/events/{}/participants", event_id)).await;
    assert_eq!(response.status().as_u16(), 200);
    let participants: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(participants.len(), 2);
    assert_eq!(participants[0]["uid"], first_uid.as_str());
    assert_eq!(participants[1]["uid"], second_uid.as_str());

    // Reading the list twice never mutates state.
    let again = app.get(&format!("/events/{}/participants", event_id)).await;
    let repeat: Vec<serde_json::Value> = again.json().await.unwrap();
    assert_eq!(repeat.len(), 2);
    assert_eq!(app.event_curr_p(event_id), 2);
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL test database"]
async fn participation_decision_sends_the_right_message() {
    let app = TestApp::spawn().await;
    let (facility_id, uid) = seed_facility_and_user(&app).await;
    let event_id = app.seed_event(facility_id, "Finals", 8);

    let approve = app
        .post(
            &format!("/events/{}/participation", event_id),
            json!({"uid": uid, "action": "approve"}),
        )
        .await;
    assert_eq!(approve.status().as_u16(), 200);

    let reject = app
        .post(
            &format!("/events/{}/participation", event_id),
            json!({"uid": uid, "action": "reject"}),
        )
        .await;
    assert_eq!(reject.status().as_u16(), 200);

    let notifications = app.notifications_for(&uid);
    assert_eq!(notifications.len(), 2);
    assert_eq!(
        notifications[0].message,
        "You have been approved for the event: Finals"
    );
    assert_eq!(
        notifications[1].message,
        "Your participation in the event Finals was rejected."
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL test database"]
async fn participation_with_unknown_action_is_rejected() {
    let app = TestApp::spawn().await;
    let (facility_id, uid) = seed_facility_and_user(&app).await;
    let event_id = app.seed_event(facility_id, "Finals", 8);

    let response = app
        .post(
            &format!("/events/{}/participation", event_id),
            json!({"uid": uid, "action": "maybe"}),
        )
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_ACTION");
    assert!(app.notifications_for(&uid).is_empty());
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL test database"]
async fn update_event_requires_fields() {
    let app = TestApp::spawn().await;
    let (facility_id, _) = seed_facility_and_user(&app).await;
    let event_id = app.seed_event(facility_id, "Old Title", 8);

    let empty = app.patch(&format!("/events/{}", event_id), json!({})).await;
    assert_eq!(empty.status().as_u16(), 400);

    let updated = app
        .patch(&format!("/events/{}", event_id), json!({"title": "New Title"}))
        .await;
    assert_eq!(updated.status().as_u16(), 200);
    let body: serde_json::Value = updated.json().await.unwrap();
    assert_eq!(body["event"]["title"], "New Title");
}

#[tokio::test]
#[serial]
#[ignore = "requires a PostgreSQL test database"]
async fn delete_event_removes_participants() {
    let app = TestApp::spawn().await;
    let (facility_id, uid) = seed_facility_and_user(&app).await;
    let event_id = app.seed_event(facility_id, "Short Lived", 4);

    app.post(&format!("/events/{}/join", event_id), json!({"uid": uid}))
        .await;

    let deleted = app.delete(&format!("/events/{}", event_id)).await;
    assert_eq!(deleted.status().as_u16(), 200);

    let fetched = app.get(&format!("/events/{}", event_id)).await;
    assert_eq!(fetched.status().as_u16(), 404);
}
