//! End-to-end tests: live stream → chat view.

mod fixtures;

use std::time::Duration;

use fixtures::{
    SSE_QUOTA_MID_STREAM, can_bind_localhost, client_for, plan_then_result_sse, sse_response,
};
use genie_core::chat::{
    ActionView, ChatEffect, ChatRuntime, EntryOutcome, QUOTA_NOTICE, TransitionCause,
};
use genie_core::config::{AttachmentsConfig, ServerConfig};
use genie_core::input::{InputError, InputInfo};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STREAM_PATH: &str = ServerConfig::DEFAULT_STREAM_PATH;

async fn mount(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn run(runtime: &mut ChatRuntime) -> Vec<ChatEffect> {
    let mut effects = Vec::new();
    tokio::time::timeout(
        Duration::from_secs(5),
        runtime.run_until_idle(|_, effect| effects.push(effect.clone())),
    )
    .await
    .unwrap();
    effects
}

#[tokio::test]
async fn test_send_message_streams_into_transcript() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    mount(&server, sse_response(&plan_then_result_sse("Found 3 flights"))).await;

    let mut runtime = ChatRuntime::new(client_for(&server), AttachmentsConfig::default());
    let request_id = runtime
        .send_message("session-1", &InputInfo::new("flights to Lisbon"))
        .unwrap();
    assert!(runtime.view().entry(&request_id).unwrap().loading);

    let effects = run(&mut runtime).await;

    let entry = runtime.view().entry(&request_id).unwrap();
    assert!(!entry.loading);
    assert_eq!(entry.outcome, Some(EntryOutcome::Finished));
    assert_eq!(entry.response, "Found 3 flights");
    let ids: Vec<_> = entry.tasks().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2"]);
    assert_eq!(entry.plan.as_ref().unwrap().steps.len(), 2);

    let auto_opens = effects
        .iter()
        .filter(|e| matches!(e, ChatEffect::ActionView(t) if t.cause == TransitionCause::AutoOpen))
        .count();
    assert_eq!(auto_opens, 1);
    assert_eq!(*runtime.view().action_view().view(), ActionView::TaskFollow);
    assert!(effects.contains(&ChatEffect::Completed { request_id }));
}

#[tokio::test]
async fn test_invalid_input_opens_no_stream() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse_response(&plan_then_result_sse("never")))
        .expect(0)
        .mount(&server)
        .await;

    let mut runtime = ChatRuntime::new(client_for(&server), AttachmentsConfig::default());
    let err = runtime
        .send_message("session-1", &InputInfo::new("  "))
        .unwrap_err();

    assert_eq!(err.downcast_ref::<InputError>(), Some(&InputError::EmptyMessage));
    assert!(runtime.view().entries().is_empty());
    assert!(runtime.next_effects().await.is_none());
}

#[tokio::test]
async fn test_quota_notice_freezes_entry() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    mount(&server, sse_response(SSE_QUOTA_MID_STREAM)).await;

    let mut runtime = ChatRuntime::new(client_for(&server), AttachmentsConfig::default());
    let request_id = runtime
        .send_message("session-1", &InputInfo::new("q"))
        .unwrap();

    let effects = run(&mut runtime).await;

    assert!(effects.iter().any(|e| matches!(
        e,
        ChatEffect::QuotaExceeded { notice, .. } if notice == QUOTA_NOTICE
    )));
    let entry = runtime.view().entry(&request_id).unwrap();
    assert!(!entry.loading);
    assert_eq!(entry.tasks().len(), 1);
}

#[tokio::test]
async fn test_server_error_fails_request() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    mount(&server, ResponseTemplate::new(500)).await;

    let mut runtime = ChatRuntime::new(client_for(&server), AttachmentsConfig::default());
    let request_id = runtime
        .send_message("session-1", &InputInfo::new("q"))
        .unwrap();

    let effects = run(&mut runtime).await;

    assert!(
        effects
            .iter()
            .any(|e| matches!(e, ChatEffect::Failed { error, .. } if error.message == "HTTP 500"))
    );
    assert!(matches!(
        runtime.view().entry(&request_id).unwrap().outcome,
        Some(EntryOutcome::Failed { .. })
    ));
}

#[tokio::test]
async fn test_stop_cancels_running_request() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;
    mount(
        &server,
        sse_response(&plan_then_result_sse("slow")).set_delay(Duration::from_secs(5)),
    )
    .await;

    let mut runtime = ChatRuntime::new(client_for(&server), AttachmentsConfig::default());
    let request_id = runtime
        .send_message("session-1", &InputInfo::new("q"))
        .unwrap();

    runtime.stop(&request_id);

    let entry = runtime.view().entry(&request_id).unwrap();
    assert!(!entry.loading);
    assert!(entry.force_stop);
    assert_eq!(entry.outcome, Some(EntryOutcome::Cancelled));
    assert!(runtime.next_effects().await.is_none());
    assert!(runtime.stop(&request_id).is_empty());
}
