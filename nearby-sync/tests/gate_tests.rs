//! Connectivity gate and monitor against the shared mocks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nearby_sync::{
    AlertChoice, ConnectivityGate, ConnectivityMonitor, Protected, ProtectedOptions,
};
use nearby_test_utils::{
    ConnectivityError, MockNetworkStatus, NearbyError, OriginError, RecordingAlertPresenter,
};

fn gate(network: &Arc<MockNetworkStatus>, presenter: &Arc<RecordingAlertPresenter>) -> ConnectivityGate {
    ConnectivityGate::with_presenter(
        ConnectivityMonitor::new(network.clone()),
        presenter.clone(),
    )
}

#[tokio::test]
async fn test_retry_reinvokes_same_action_once_back_online() {
    let network = MockNetworkStatus::offline();
    let presenter = RecordingAlertPresenter::answering(&[AlertChoice::Retry, AlertChoice::Retry]);
    presenter.reconnect_after(2, network.clone());
    let gate = gate(&network, &presenter);

    let calls = AtomicUsize::new(0);
    let counter = &calls;
    let options = ProtectedOptions::new("Mark review helpful");

    let outcome = gate
        .protected_action(
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, NearbyError>(counter.load(Ordering::SeqCst))
            },
            &options,
        )
        .await
        .expect("action should succeed");

    assert_eq!(outcome, Protected::Completed(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(network.probe_count(), 3);

    let alerts = presenter.alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|alert| alert == &alerts[0]));
    assert!(alerts[0].offers_retry());
}

#[tokio::test]
async fn test_silent_gate_never_prompts_in_any_state() {
    let network = MockNetworkStatus::offline();
    let presenter = RecordingAlertPresenter::answering(&[AlertChoice::Retry]);
    let gate = gate(&network, &presenter);
    let calls = AtomicUsize::new(0);
    let counter = &calls;

    for retry in [true, false] {
        let outcome = gate
            .protected_action(
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, NearbyError>(())
                },
                &ProtectedOptions::silent("Background sync").with_retry(retry),
            )
            .await
            .expect("offline is not an error");
        assert!(outcome.is_offline());
    }

    network.set_online(true);
    let outcome = gate
        .protected_action(
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, NearbyError>(())
            },
            &ProtectedOptions::silent("Background sync"),
        )
        .await
        .expect("action should succeed");

    assert_eq!(outcome, Protected::Completed(()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(presenter.prompt_count(), 0);
}

#[tokio::test]
async fn test_probe_failure_is_treated_as_offline() {
    let network = MockNetworkStatus::online();
    network.set_probe_error(Some(ConnectivityError::ProbeFailed {
        reason: "netlink closed".to_string(),
    }));
    let presenter = RecordingAlertPresenter::answering(&[AlertChoice::Cancel]);
    let gate = gate(&network, &presenter);

    let outcome = gate
        .protected_action(
            || async { Ok::<_, NearbyError>(()) },
            &ProtectedOptions::new("Load profile"),
        )
        .await
        .expect("offline is not an error");

    assert!(outcome.is_offline());
    assert!(!gate.monitor().is_connected());
    assert_eq!(presenter.prompt_count(), 1);
}

#[tokio::test]
async fn test_backend_rejection_reaches_caller() {
    let network = MockNetworkStatus::online();
    let presenter = RecordingAlertPresenter::answering(&[]);
    let gate = gate(&network, &presenter);

    let err = gate
        .protected_action(
            || async {
                Err::<(), NearbyError>(
                    OriginError::RequestFailed {
                        status: 403,
                        message: "review locked".to_string(),
                    }
                    .into(),
                )
            },
            &ProtectedOptions::new("Edit review"),
        )
        .await
        .expect_err("rejection must propagate");

    assert!(matches!(
        err,
        NearbyError::Origin(OriginError::RequestFailed { status: 403, .. })
    ));
    assert_eq!(presenter.prompt_count(), 0);
}

#[tokio::test]
async fn test_listener_tracks_platform_events() {
    let network = MockNetworkStatus::online();
    let monitor = ConnectivityMonitor::new(network.clone());
    let offline_events = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&offline_events);
    let mut state = monitor.subscribe();

    let listener = monitor.spawn_listener(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    network.set_online(false);
    state.changed().await.expect("state should change");
    assert!(!monitor.is_connected());

    network.set_online(true);
    state.changed().await.expect("state should change");
    assert!(monitor.is_connected());

    network.set_online(false);
    state.changed().await.expect("state should change");
    assert_eq!(offline_events.load(Ordering::SeqCst), 2);

    listener.abort();
}
