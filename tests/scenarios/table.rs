//! Table scenario tests
//!
//! Tests adding, removing and resetting dice

use crate::harness::{DicedTest, Http};

/// Test: a new session has one d20 showing 20, adding a d6 appends it at 6
#[tokio::test]
async fn test_add_d6_to_default_table() {
    let server = DicedTest::start().await.expect("Failed to start server");
    let session = server.create_session().await.expect("create failed");
    let id = session["id"].as_str().unwrap();

    assert_eq!(session["dice"].as_array().unwrap().len(), 1);
    assert_eq!(session["dice"][0]["kind"], "d20");
    assert_eq!(session["dice"][0]["value"], 20);

    let resp = server.add_die(id, "d6").await.expect("add failed");
    let dice = resp["session"]["dice"].as_array().unwrap();
    assert_eq!(dice.len(), 2);
    assert_eq!(dice[0]["kind"], "d20");
    assert_eq!(dice[0]["value"], 20);
    assert_eq!(dice[1]["kind"], "d6");
    assert_eq!(dice[1]["value"], 6);
    assert_eq!(dice[1]["is_rolling"], false);
    assert_eq!(dice[1]["id"], resp["die_id"]);
}

/// Test: removing dice never empties the table
#[tokio::test]
async fn test_remove_stops_at_one() {
    let server = DicedTest::start().await.expect("Failed to start server");
    let session = server.create_session().await.expect("create failed");
    let id = session["id"].as_str().unwrap();

    for kind in ["d6", "d20", "d6"] {
        server.add_die(id, kind).await.expect("add failed");
    }

    let mut applied = 0;
    for _ in 0..6 {
        let view: serde_json::Value = server
            .get(&format!("/sessions/{}", id))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let first = view["dice"][0]["id"].as_str().unwrap().to_string();

        let resp: serde_json::Value = server
            .delete(&format!("/sessions/{}/dice/{}", id, first))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if resp["applied"] == true {
            applied += 1;
        }
        assert!(!resp["session"]["dice"].as_array().unwrap().is_empty());
    }

    assert_eq!(applied, 3);
    let view: serde_json::Value = server
        .get(&format!("/sessions/{}", id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["dice"].as_array().unwrap().len(), 1);
    assert_eq!(view["can_remove"], false);
}

/// Test: reset on a five-die table leaves one d20 at 20 and keeps history
#[tokio::test]
async fn test_reset_keeps_history() {
    let server = DicedTest::start().await.expect("Failed to start server");
    let session = server.create_session().await.expect("create failed");
    let id = session["id"].as_str().unwrap();

    for kind in ["d6", "d6", "d20", "d6"] {
        server.add_die(id, kind).await.expect("add failed");
    }
    let rolled: serde_json::Value = server
        .post_empty(&format!("/sessions/{}/roll?wait=true", id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let history_before = rolled["session"]["history"].clone();
    assert_eq!(history_before.as_array().unwrap().len(), 5);

    let resp: serde_json::Value = server
        .post_empty(&format!("/sessions/{}/dice/reset", id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let dice = resp["session"]["dice"].as_array().unwrap();
    assert_eq!(dice.len(), 1);
    assert_eq!(dice[0]["kind"], "d20");
    assert_eq!(dice[0]["value"], 20);
    assert_eq!(resp["session"]["history"], history_before);
}

/// Test: kinds are parsed leniently but unknown kinds are refused
#[tokio::test]
async fn test_add_die_kinds() {
    let server = DicedTest::start().await.expect("Failed to start server");
    let session = server.create_session().await.expect("create failed");
    let id = session["id"].as_str().unwrap();

    let resp = server.add_die(id, "D20").await.unwrap();
    assert_eq!(resp["session"]["dice"][1]["kind"], "d20");

    let resp = server
        .post(
            &format!("/sessions/{}/dice", id),
            &serde_json::json!({ "kind": "d100" }),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
