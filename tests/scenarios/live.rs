//! Live scenario tests
//!
//! Tests WebSocket snapshots, event delivery and commands

use serde_json::json;

use crate::harness::{DicedTest, Http};

/// Test: attaching sends a snapshot, HTTP changes arrive as events
#[tokio::test]
async fn test_observer_sees_http_changes() {
    let server = DicedTest::start().await.expect("Failed to start server");
    let session = server.create_session().await.expect("create failed");
    let id = session["id"].as_str().unwrap();

    let mut ws = server.connect_ws(id).await.expect("connect failed");
    let snapshot = ws.expect("snapshot").await.expect("no snapshot");
    assert_eq!(snapshot["session"]["id"], session["id"]);
    assert_eq!(snapshot["session"]["dice"][0]["value"], 20);

    server.add_die(id, "d6").await.unwrap();
    let added = ws.expect_event("die_added").await.expect("no die_added");
    assert_eq!(added["die"]["kind"], "d6");

    server
        .post_empty(&format!("/sessions/{}/roll", id))
        .await
        .unwrap();
    let started = ws.expect_event("roll_started").await.expect("no roll_started");
    assert_eq!(started["die_ids"].as_array().unwrap().len(), 2);

    let committed = ws
        .expect_event("roll_committed")
        .await
        .expect("no roll_committed");
    let records = committed["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["kind"], "d20");
    assert_eq!(records[1]["kind"], "d6");
    assert!(committed["dice"]
        .as_array()
        .unwrap()
        .iter()
        .all(|d| d["is_rolling"] == false));
}

/// Test: commands sent over the socket drive the session
#[tokio::test]
async fn test_commands_over_socket() {
    let server = DicedTest::start().await.expect("Failed to start server");
    let session = server.create_session().await.expect("create failed");
    let id = session["id"].as_str().unwrap();

    let mut ws = server.connect_ws(id).await.expect("connect failed");
    ws.expect("snapshot").await.expect("no snapshot");

    ws.send(json!({ "type": "add_die", "kind": "d6" })).await.unwrap();
    let added = ws.expect_event("die_added").await.expect("no die_added");
    let d6 = added["die"]["id"].clone();

    ws.send(json!({ "type": "roll", "die_id": d6 })).await.unwrap();
    ws.expect_event("roll_started").await.expect("no roll_started");
    let committed = ws
        .expect_event("roll_committed")
        .await
        .expect("no roll_committed");
    assert_eq!(committed["records"].as_array().unwrap().len(), 1);
    assert_eq!(committed["records"][0]["kind"], "d6");

    ws.send(json!({ "type": "remove_die", "die_id": d6 })).await.unwrap();
    ws.expect_event("die_removed").await.expect("no die_removed");

    // Only one die left, removing it is ignored
    let last = session["dice"][0]["id"].clone();
    ws.send(json!({ "type": "remove_die", "die_id": last })).await.unwrap();
    let ignored = ws.expect("ignored").await.expect("no ignored");
    assert_eq!(ignored["command"], "remove_die");

    ws.send(json!({ "type": "add_die", "kind": "d4" })).await.unwrap();
    let error = ws.expect("error").await.expect("no error");
    assert!(error["message"].as_str().unwrap().contains("d4"));
}

/// Test: ending the session tells observers and closes the stream
#[tokio::test]
async fn test_session_end_closes_observers() {
    let server = DicedTest::start().await.expect("Failed to start server");
    let session = server.create_session().await.expect("create failed");
    let id = session["id"].as_str().unwrap();

    let mut ws = server.connect_ws(id).await.expect("connect failed");
    ws.expect("snapshot").await.expect("no snapshot");

    let resp = server.delete(&format!("/sessions/{}", id)).await.unwrap();
    assert_eq!(resp.status(), 204);

    ws.expect_event("session_ended").await.expect("no session_ended");
    assert!(ws.recv_json().await.is_err());
}

/// Test: attaching to an unknown session fails the upgrade
#[tokio::test]
async fn test_attach_unknown_session() {
    let server = DicedTest::start().await.expect("Failed to start server");
    let missing = uuid::Uuid::new_v4().to_string();
    assert!(server.connect_ws(&missing).await.is_err());
}
