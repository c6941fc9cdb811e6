mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{Harness, StatusRecorder, eventually};
use futures::future::join_all;
use onecrew_application::{ConnectRequest, ConnectionEventType, ConnectionState};
use onecrew_core::config::ChatConfig;
use onecrew_core::error::ChatError;
use onecrew_core::identity::{AttachedIdentity, ParticipantKind};
use onecrew_core::provider::{ProfileData, ProviderClient, ProviderEvent};

fn user_42() -> ConnectRequest {
    ConnectRequest::new("onecrew_user_42", "token-42")
        .with_profile(ProfileData::new("Ada"))
        .with_api_key("k1")
}

fn company_7() -> ConnectRequest {
    ConnectRequest::new("onecrew_company_7", "token-7")
        .with_profile(ProfileData::new("Northlight Films"))
        .with_api_key("k1")
        .with_kind(ParticipantKind::Company)
}

#[tokio::test]
async fn test_connect_attaches_user_identity() {
    let harness = Harness::new(ChatConfig::default());

    harness.session.connect(user_42()).await.unwrap();

    assert!(harness.session.is_connected());
    assert_eq!(
        harness.session.attached_identity(),
        Some(AttachedIdentity::new("onecrew_user_42", ParticipantKind::User))
    );
    assert_eq!(harness.count(ConnectionEventType::ConnectCalled), 1);
    assert_eq!(harness.count(ConnectionEventType::ConnectSucceeded), 1);
}

#[tokio::test]
async fn test_concurrent_connects_share_one_attempt() {
    let harness = Harness::new(ChatConfig::default());
    harness.behaviour.set_connect_delay(Duration::from_millis(20));

    let results = join_all((0..5).map(|_| harness.session.connect(user_42()))).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(harness.behaviour.connect_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.behaviour.clients_created.load(Ordering::SeqCst), 1);
    assert_eq!(harness.count(ConnectionEventType::ConnectCalled), 5);
    assert_eq!(harness.count(ConnectionEventType::ConnectSucceeded), 1);
}

#[tokio::test]
async fn test_concurrent_connect_failure_reaches_every_caller() {
    let harness = Harness::new(ChatConfig::default());
    harness.behaviour.set_connect_delay(Duration::from_millis(20));
    harness.behaviour.failing_connects.store(1, Ordering::SeqCst);

    let results = join_all((0..3).map(|_| harness.session.connect(user_42()))).await;

    let errors: Vec<_> = results.into_iter().map(|r| r.unwrap_err()).collect();
    assert!(errors.iter().all(|e| e.is_connect()));
    assert!(errors.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(harness.behaviour.connect_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.session.connection_state(), ConnectionState::Disconnected);
    assert_eq!(harness.session.attached_identity(), None);
    assert_eq!(harness.count(ConnectionEventType::ConnectFailed), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_tasks_make_one_provider_connect() {
    let harness = Harness::new(ChatConfig::default());
    harness.behaviour.set_connect_delay(Duration::from_millis(50));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let session = harness.session.clone();
            tokio::spawn(async move { session.connect(user_42()).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(harness.behaviour.connect_calls.load(Ordering::SeqCst), 1);
    assert!(harness.session.is_connected());
}

#[tokio::test]
async fn test_repeat_connect_same_identity_is_noop() {
    let harness = Harness::new(ChatConfig::default());

    harness.session.connect(user_42()).await.unwrap();
    harness.session.connect(user_42()).await.unwrap();

    assert_eq!(harness.behaviour.connect_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.count(ConnectionEventType::ConnectSucceeded), 1);
    assert!(harness.session.is_connected());
}

#[tokio::test]
async fn test_connect_other_identity_disconnects_first() {
    let harness = Harness::new(ChatConfig::default());
    harness.session.connect(user_42()).await.unwrap();
    let first_connect_seq = harness.monitor.events_by_type(ConnectionEventType::ConnectSucceeded)[0].sequence;

    harness.session.connect(company_7()).await.unwrap();

    assert_eq!(
        harness.behaviour.calls(),
        vec![
            "connect:onecrew_user_42".to_string(),
            "disconnect:onecrew_user_42".to_string(),
            "connect:onecrew_company_7".to_string(),
        ]
    );

    let disconnects = harness.monitor.events_by_type(ConnectionEventType::DisconnectSucceeded);
    let connects: Vec<_> = harness
        .monitor
        .events_by_type(ConnectionEventType::ConnectSucceeded)
        .into_iter()
        .filter(|e| e.sequence > first_connect_seq)
        .collect();
    assert_eq!(disconnects.len(), 1);
    assert_eq!(connects.len(), 1);
    assert!(disconnects[0].sequence < connects[0].sequence);
    assert_eq!(disconnects[0].details["provider_user_id"], "onecrew_user_42");

    assert_eq!(
        harness.session.attached_identity(),
        Some(AttachedIdentity::new("onecrew_company_7", ParticipantKind::Company))
    );
}

#[tokio::test]
async fn test_switch_never_reports_two_identities() {
    let harness = Harness::new(ChatConfig::default());
    let recorder = Arc::new(StatusRecorder::default());
    harness.session.add_observer(recorder.clone());

    harness.session.connect(user_42()).await.unwrap();
    harness.session.connect(company_7()).await.unwrap();

    let statuses = recorder.statuses.lock().unwrap().clone();
    assert!(
        statuses
            .iter()
            .all(|s| s.state != ConnectionState::Connected || s.attached.is_some())
    );

    // Once the company shows up, the user never reappears.
    let first_company = statuses
        .iter()
        .position(|s| {
            s.attached
                .as_ref()
                .is_some_and(|a| a.provider_user_id == "onecrew_company_7")
        })
        .unwrap();
    assert!(statuses[first_company..].iter().all(|s| {
        s.attached
            .as_ref()
            .is_none_or(|a| a.provider_user_id == "onecrew_company_7")
    }));
    // The user was released before the company was attached.
    assert!(statuses[..first_company].iter().any(|s| s.attached.is_none()
        && s.state == ConnectionState::Connecting));
}

#[tokio::test]
async fn test_disconnect_when_disconnected_is_noop() {
    let harness = Harness::new(ChatConfig::default());

    harness.session.disconnect().await;

    assert_eq!(harness.behaviour.disconnect_calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.session.connection_state(), ConnectionState::Disconnected);
    assert_eq!(harness.count(ConnectionEventType::DisconnectSucceeded), 0);
}

#[tokio::test]
async fn test_disconnect_clears_identity() {
    let harness = Harness::new(ChatConfig::default());
    harness.session.connect(user_42()).await.unwrap();

    harness.session.disconnect().await;

    assert!(!harness.session.is_connected());
    assert_eq!(harness.session.attached_identity(), None);
    assert_eq!(harness.count(ConnectionEventType::DisconnectCalled), 1);
    assert_eq!(harness.count(ConnectionEventType::DisconnectSucceeded), 1);
}

#[tokio::test]
async fn test_disconnect_waits_for_in_flight_connect() {
    let harness = Harness::new(ChatConfig::default());
    harness.behaviour.set_connect_delay(Duration::from_millis(20));

    let session = harness.session.clone();
    let (connected, ()) = tokio::join!(session.connect(user_42()), async {
        tokio::task::yield_now().await;
        harness.session.disconnect().await;
    });

    connected.unwrap();
    assert_eq!(
        harness.behaviour.calls(),
        vec![
            "connect:onecrew_user_42".to_string(),
            "disconnect:onecrew_user_42".to_string(),
        ]
    );
    assert_eq!(harness.session.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connect_during_disconnect_waits_for_teardown() {
    let harness = Harness::new(ChatConfig::default());
    harness.session.connect(user_42()).await.unwrap();
    harness.behaviour.set_disconnect_delay(Duration::from_millis(50));

    let session = harness.session.clone();
    let ((), reconnected) = tokio::join!(session.disconnect(), async {
        tokio::task::yield_now().await;
        harness.session.connect(user_42()).await
    });

    reconnected.unwrap();
    assert!(harness.session.is_connected());
    assert_eq!(
        harness.session.attached_identity().unwrap().provider_user_id,
        "onecrew_user_42"
    );
    assert_eq!(
        harness.behaviour.calls(),
        vec![
            "connect:onecrew_user_42".to_string(),
            "disconnect:onecrew_user_42".to_string(),
            "connect:onecrew_user_42".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_concurrent_disconnects_share_one_teardown() {
    let harness = Harness::new(ChatConfig::default());
    harness.session.connect(user_42()).await.unwrap();
    harness.behaviour.set_disconnect_delay(Duration::from_millis(20));

    join_all((0..3).map(|_| harness.session.disconnect())).await;

    assert_eq!(harness.behaviour.disconnect_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.session.connection_state(), ConnectionState::Disconnected);
    assert_eq!(harness.count(ConnectionEventType::DisconnectSucceeded), 1);
}

#[tokio::test]
async fn test_connect_other_identity_waits_for_in_flight_attempt() {
    let harness = Harness::new(ChatConfig::default());
    harness.behaviour.set_connect_delay(Duration::from_millis(20));

    let session = harness.session.clone();
    let (user, company) = tokio::join!(session.connect(user_42()), async {
        tokio::task::yield_now().await;
        harness.session.connect(company_7()).await
    });

    user.unwrap();
    company.unwrap();
    assert_eq!(
        harness.behaviour.calls(),
        vec![
            "connect:onecrew_user_42".to_string(),
            "disconnect:onecrew_user_42".to_string(),
            "connect:onecrew_company_7".to_string(),
        ]
    );
    assert_eq!(harness.behaviour.connect_calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        harness.session.attached_identity(),
        Some(AttachedIdentity::new("onecrew_company_7", ParticipantKind::Company))
    );
}

#[tokio::test]
async fn test_connect_other_identity_runs_after_in_flight_failure() {
    let harness = Harness::new(ChatConfig::default());
    harness.behaviour.set_connect_delay(Duration::from_millis(20));
    harness.behaviour.failing_connects.store(1, Ordering::SeqCst);

    let session = harness.session.clone();
    let (user, company) = tokio::join!(session.connect(user_42()), async {
        tokio::task::yield_now().await;
        harness.session.connect(company_7()).await
    });

    assert!(user.unwrap_err().is_connect());
    company.unwrap();
    assert_eq!(
        harness.behaviour.calls(),
        vec![
            "connect:onecrew_user_42".to_string(),
            "connect:onecrew_company_7".to_string(),
        ]
    );
    assert_eq!(
        harness.session.attached_identity().unwrap().provider_user_id,
        "onecrew_company_7"
    );
}

#[tokio::test]
async fn test_panicking_provider_does_not_wedge_session() {
    let harness = Harness::new(ChatConfig::default());
    harness.behaviour.panic_on_connect.store(true, Ordering::SeqCst);

    let err = harness.session.connect(user_42()).await.unwrap_err();

    assert!(matches!(err, ChatError::Internal(_)));
    assert_eq!(harness.session.connection_state(), ConnectionState::Disconnected);
    assert!(!harness.session.status().connect_in_flight);
    assert_eq!(harness.count(ConnectionEventType::ConnectFailed), 1);

    harness.behaviour.panic_on_connect.store(false, Ordering::SeqCst);
    tokio::time::timeout(Duration::from_secs(1), harness.session.connect(company_7()))
        .await
        .expect("connect after a crashed attempt should not hang")
        .unwrap();
    assert_eq!(
        harness.session.attached_identity().unwrap().provider_user_id,
        "onecrew_company_7"
    );

    tokio::time::timeout(Duration::from_secs(1), harness.session.disconnect())
        .await
        .expect("disconnect after a crashed attempt should not hang");
    assert_eq!(harness.session.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connect_without_any_api_key_is_config_error() {
    let harness = Harness::new(ChatConfig::default());

    let err = harness
        .session
        .connect(ConnectRequest::new("onecrew_user_42", "token-42"))
        .await
        .unwrap_err();

    assert!(err.is_config());
    assert_eq!(harness.session.connection_state(), ConnectionState::Disconnected);
    assert_eq!(harness.behaviour.clients_created.load(Ordering::SeqCst), 0);
    assert_eq!(harness.count(ConnectionEventType::ConnectFailed), 1);
}

#[tokio::test]
async fn test_fallback_api_key_is_used() {
    let harness = Harness::with_fallback_key("fallback-key");

    harness
        .session
        .connect(ConnectRequest::new("onecrew_user_42", "token-42"))
        .await
        .unwrap();

    let client = harness.provider.last_client().unwrap();
    assert_eq!(client.api_key(), "fallback-key");
}

#[tokio::test]
async fn test_disconnect_failure_does_not_block_switch() {
    let harness = Harness::new(ChatConfig::default());
    harness.session.connect(user_42()).await.unwrap();
    harness.behaviour.fail_disconnect.store(true, Ordering::SeqCst);

    harness.session.connect(company_7()).await.unwrap();

    assert_eq!(harness.count(ConnectionEventType::DisconnectFailed), 1);
    assert_eq!(harness.count(ConnectionEventType::DisconnectSucceeded), 0);
    assert_eq!(
        harness.session.attached_identity().unwrap().provider_user_id,
        "onecrew_company_7"
    );
}

#[tokio::test]
async fn test_reported_user_mismatch_fails_connect() {
    let harness = Harness::new(ChatConfig::default());
    *harness.behaviour.reported_user_override.lock().unwrap() = Some("someone_else".to_string());

    let err = harness.session.connect(user_42()).await.unwrap_err();

    assert!(err.is_identity_mismatch());
    assert_eq!(harness.session.connection_state(), ConnectionState::Disconnected);
    assert_eq!(harness.session.attached_identity(), None);
}

#[tokio::test]
async fn test_failed_connect_leaves_no_identity_then_recovers() {
    let harness = Harness::new(ChatConfig::default());
    harness.behaviour.failing_connects.store(1, Ordering::SeqCst);

    assert!(harness.session.connect(user_42()).await.is_err());
    assert_eq!(harness.session.attached_identity(), None);

    harness.session.connect(user_42()).await.unwrap();
    assert!(harness.session.is_connected());
    assert_eq!(harness.behaviour.connect_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_event_log_stays_bounded_over_many_cycles() {
    let harness = Harness::new(ChatConfig::default());

    for _ in 0..60 {
        harness.session.connect(user_42()).await.unwrap();
        harness.session.disconnect().await;
    }

    let events = harness.monitor.recent_events(200);
    assert_eq!(events.len(), 100);
    assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
    let last_lifecycle = events
        .iter()
        .rev()
        .find(|e| {
            !matches!(
                e.event_type,
                ConnectionEventType::ProviderStateChanged
                    | ConnectionEventType::ProviderRecovered
                    | ConnectionEventType::ProviderError
            )
        })
        .unwrap();
    assert_eq!(last_lifecycle.event_type, ConnectionEventType::DisconnectSucceeded);

    let snapshot = harness.monitor.state_snapshot();
    assert_eq!(snapshot.event_count, 100);
    assert!(snapshot.evicted > 0);
    assert_eq!(snapshot.session.state, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_monitor_follows_provider_events() {
    let harness = Harness::new(ChatConfig::default());
    harness.session.connect(user_42()).await.unwrap();

    let monitor = harness.monitor.clone();
    assert!(
        eventually(|| !monitor
            .events_by_type(ConnectionEventType::ProviderStateChanged)
            .is_empty())
        .await
    );
    assert!(eventually(|| monitor.state_snapshot().provider_online == Some(true)).await);

    harness
        .provider
        .last_client()
        .unwrap()
        .emit(ProviderEvent::Error {
            message: "heartbeat timeout".to_string(),
            stack: None,
        });
    assert!(
        eventually(|| monitor.events_by_type(ConnectionEventType::ProviderError).len() == 1).await
    );
}

#[tokio::test]
async fn test_snapshot_tracks_session_status() {
    let harness = Harness::new(ChatConfig::default());
    harness.session.connect(company_7()).await.unwrap();

    let snapshot = harness.monitor.state_snapshot();
    assert_eq!(snapshot.session.state, ConnectionState::Connected);
    assert_eq!(
        snapshot.session.client_user_id.as_deref(),
        Some("onecrew_company_7")
    );
    assert!(snapshot.session.api_key_configured);
    assert!(!snapshot.session.connect_in_flight);
}
