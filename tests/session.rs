mod common;

use std::time::Duration;

use common::{three_leaf_document, FakeHost};
use markwhen_calendar::{DateRangeIso, Error, Granularity, Path, RpcError, StopReason};
use serde_json::json;
use tokio::time::timeout;

#[tokio::test]
async fn test_pulls_state_on_start_and_projects_pushes() {
    let (client, mut host) = FakeHost::pair();
    let mut events = client.subscribe();
    let shutdown = client.shutdown_token();
    let task = tokio::spawn(client.run());

    host.answer_initial_pulls().await;

    let ack = host.push("documentState", three_leaf_document()).await;
    assert_eq!(ack.params, None);
    events.changed().await.unwrap();
    let projected = events.borrow_and_update().clone();
    let ids: Vec<_> = projected.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["0", "1,0", "1,1"]);
    assert_eq!(projected[1].background_color, "rgba(31,32,35,0.8)");
    assert!(projected[1].all_day);
    assert!(!projected[2].all_day);

    host.push("interactionState", json!({ "darkThemeEnabled": true, "hoveringPath": [1, 0] }))
        .await;
    events.changed().await.unwrap();
    let highlighted = events.borrow_and_update().clone();
    assert_eq!(highlighted[1].background_color, "rgba(31,32,35,0.95)");
    assert_eq!(highlighted[1].border_color, "white");
    assert_eq!(highlighted[0], projected[0]);
    assert_eq!(highlighted[2], projected[2]);

    shutdown.cancel();
    assert_eq!(task.await.unwrap(), StopReason::Shutdown);
}

#[tokio::test]
async fn test_tag_colors_follow_color_map() {
    let (client, mut host) = FakeHost::pair();
    let mut events = client.subscribe();
    let shutdown = client.shutdown_token();
    let task = tokio::spawn(client.run());
    host.answer_initial_pulls().await;

    host.push(
        "interactionState",
        json!({ "colorMap": { "default": { "work": "200, 100, 0" } } }),
    )
    .await;
    host.push("documentState", three_leaf_document()).await;
    events.changed().await.unwrap();
    let projected = events.borrow_and_update().clone();
    assert_eq!(projected[0].background_color, "rgba(200,100,0,0.8)");
    assert_eq!(projected[0].border_color, "rgb(200,100,0)");

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn test_document_without_tree_projects_empty() {
    let (client, mut host) = FakeHost::pair();
    let mut events = client.subscribe();
    let shutdown = client.shutdown_token();
    let task = tokio::spawn(client.run());
    host.answer_initial_pulls().await;

    host.push("documentState", three_leaf_document()).await;
    events.changed().await.unwrap();
    assert_eq!(events.borrow_and_update().len(), 3);

    host.push("documentState", json!({ "rawText": "" })).await;
    events.changed().await.unwrap();
    assert!(events.borrow_and_update().is_empty());

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn test_foreign_envelopes_are_ignored() {
    let (client, mut host) = FakeHost::pair();
    let events = client.subscribe();
    let shutdown = client.shutdown_token();
    let task = tokio::spawn(client.run());
    host.answer_initial_pulls().await;

    host.send_raw(&json!({ "type": "x", "id": "not-our-namespace-1", "request": true }))
        .await;
    host.send_raw(&json!({ "type": "documentState", "request": true, "params": three_leaf_document() }))
        .await;
    host.send_raw(&json!({ "type": "ping", "id": "markwhen_ping", "request": true }))
        .await;

    // Only the namespaced request gets an answer, even without a handler.
    let response = host.recv().await;
    assert!(response.response);
    assert_eq!(response.id, "markwhen_ping");
    assert_eq!(response.params, None);
    assert!(host.try_recv().await.is_none());
    assert!(!events.has_changed().unwrap());

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn test_actions_round_trip_and_duplicate_responses() {
    let (client, mut host) = FakeHost::pair();
    let actions = client.actions();
    let shutdown = client.shutdown_token();
    let task = tokio::spawn(client.run());
    host.answer_initial_pulls().await;

    let hover = actions.set_hovering_path(Some(Path::new(vec![1, 0])));
    let request = host.expect_request("setHoveringPath").await;
    assert!(request.id.starts_with("markwhen_"));
    assert_eq!(request.params, Some(json!([1, 0])));

    host.respond(&request, Some(json!("ok"))).await;
    host.respond(&request, Some(json!("again"))).await;
    let response = timeout(Duration::from_secs(2), hover).await.unwrap().unwrap();
    assert_eq!(response.params, Some(json!("ok")));

    let new_event = actions.new_event(
        DateRangeIso::new("2024-05-01T00:00:00Z", "2024-05-02T00:00:00Z"),
        Some(Granularity::Day),
        false,
    );
    let request = host.expect_request("newEvent").await;
    assert_eq!(
        request.params,
        Some(json!({
            "dateRangeIso": {
                "fromDateTimeIso": "2024-05-01T00:00:00Z",
                "toDateTimeIso": "2024-05-02T00:00:00Z"
            },
            "granularity": "day",
            "immediate": false
        }))
    );
    host.respond(&request, None).await;
    assert!(new_event.await.is_ok());

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn test_responses_complete_out_of_order() {
    let (client, mut host) = FakeHost::pair();
    let actions = client.actions();
    let shutdown = client.shutdown_token();
    let task = tokio::spawn(client.run());
    host.answer_initial_pulls().await;

    let detail = actions.set_detail_path(Some(Path::new(vec![0])));
    let show = actions.show_in_editor(Some(Path::new(vec![0])));
    let detail_req = host.expect_request("setDetailPath").await;
    let show_req = host.expect_request("showInEditor").await;
    assert_ne!(detail_req.id, show_req.id);

    host.respond(&show_req, Some(json!("shown"))).await;
    assert_eq!(show.await.unwrap().params, Some(json!("shown")));
    host.respond(&detail_req, Some(json!("detailed"))).await;
    assert_eq!(detail.await.unwrap().params, Some(json!("detailed")));

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn test_shutdown_abandons_pending_requests() {
    let (client, mut host) = FakeHost::pair();
    let actions = client.actions();
    let shutdown = client.shutdown_token();
    let task = tokio::spawn(client.run());
    host.answer_initial_pulls().await;

    let refresh = actions.request_state_update();
    host.expect_request("interactionState").await;
    host.expect_request("documentState").await;

    shutdown.cancel();
    assert_eq!(task.await.unwrap(), StopReason::Shutdown);
    assert_eq!(refresh.0.await, Err(RpcError::Abandoned));
    assert_eq!(refresh.1.await, Err(RpcError::Abandoned));
    assert_eq!(actions.set_hovering_path(None).await, Err(RpcError::Abandoned));
}

#[tokio::test]
async fn test_host_closing_channel_stops_client() {
    let (client, host) = FakeHost::pair();
    let task = tokio::spawn(client.run());
    drop(host);
    let reason = timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
    assert_eq!(reason, StopReason::ChannelClosed);
    assert!(matches!(
        reason.into_result(),
        Err(Error::Rpc(RpcError::ChannelClosed))
    ));
}

#[tokio::test]
async fn test_bad_color_entry_still_applies_hover() {
    let (client, mut host) = FakeHost::pair();
    let mut events = client.subscribe();
    let shutdown = client.shutdown_token();
    let task = tokio::spawn(client.run());
    host.answer_initial_pulls().await;

    host.push("documentState", three_leaf_document()).await;
    events.changed().await.unwrap();
    events.borrow_and_update();

    host.push(
        "interactionState",
        json!({ "hoveringPath": [1, 0], "colorMap": { "default": { "work": "300, 0, 0" } } }),
    )
    .await;
    assert!(events.has_changed().unwrap());
    let projected = events.borrow_and_update().clone();
    assert_eq!(projected[1].border_color, "black");
    assert_eq!(projected[0].background_color, "rgba(31,32,35,0.8)");

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn test_clicking_projected_event_opens_detail_then_editor() {
    let (client, mut host) = FakeHost::pair();
    let mut events = client.subscribe();
    let actions = client.actions();
    let shutdown = client.shutdown_token();
    let task = tokio::spawn(client.run());
    host.answer_initial_pulls().await;

    host.push("documentState", three_leaf_document()).await;
    events.changed().await.unwrap();
    let clicked = events.borrow_and_update()[2].clone();

    let (detail, show) = actions.open(&clicked);
    let detail_req = host.expect_request("setDetailPath").await;
    let show_req = host.expect_request("showInEditor").await;
    assert_eq!(detail_req.params, Some(json!([1, 1])));
    assert_eq!(show_req.params, Some(json!([1, 1])));
    host.respond(&detail_req, None).await;
    host.respond(&show_req, None).await;
    assert!(detail.await.is_ok());
    assert!(show.await.is_ok());

    let _leave = actions.leave();
    let leave_req = host.expect_request("setHoveringPath").await;
    assert_eq!(leave_req.params, None);

    shutdown.cancel();
    task.await.unwrap();
}
