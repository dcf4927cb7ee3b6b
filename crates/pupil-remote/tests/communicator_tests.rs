// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use pupil_remote::transport::memory::NOTIFICATION_ACK;
use pupil_remote::{
    Callback, Channel, Communicator, InMemoryTransport, Payload, RemoteError, TIME_OF_ARRIVAL_KEY,
};
use serde_json::json;

const CAL_SUCCESSFUL: &str = "notify.calibration.successful";
const CAL_STOPPED: &str = "notify.calibration.stopped";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn remote() -> Communicator<InMemoryTransport> {
    init_tracing();
    Communicator::with_transport(InMemoryTransport::new(), "tcp://127.0.0.1")
        .expect("in-memory handshake")
}

fn payload(value: serde_json::Value) -> Payload {
    value.as_object().cloned().expect("object payload")
}

fn publish(remote: &mut Communicator<InMemoryTransport>, topic: &str) {
    remote
        .transport_mut()
        .publish(topic, &payload(json!({ "topic": topic })))
        .expect("publish");
}

/// Callback recording every event name it sees
fn recorder() -> (Callback, Rc<RefCell<Vec<String>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let callback = Callback::new(move |event, _payload| {
        sink.borrow_mut().push(event.to_string());
        Ok(())
    });
    (callback, seen)
}

#[test]
fn wait_all_with_no_names_returns_without_polling() {
    let mut remote = remote();
    let (callback, seen) = recorder();
    remote.add_callback(&callback, &["pupil"]).unwrap();
    publish(&mut remote, "pupil.0");

    let events = remote.wait_all(&[], None).unwrap();

    assert!(events.is_empty());
    assert_eq!(remote.transport().poll_count(), 0);
    assert!(seen.borrow().is_empty());
}

#[test]
fn wait_any_with_zero_timeout_polls_once() {
    let mut remote = remote();

    let started = Instant::now();
    let events = remote.wait_any(&[CAL_SUCCESSFUL], Some(Duration::ZERO)).unwrap();

    assert!(events.is_empty());
    assert_eq!(remote.transport().poll_count(), 1);
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn temporary_subscriptions_are_released_after_timeout() {
    let mut remote = remote();
    remote.subscribe("gaze").unwrap();
    let before = remote.transport().active_subscription_count();

    let events = remote
        .wait_all(&[CAL_SUCCESSFUL, "pupil"], Some(Duration::from_millis(20)))
        .unwrap();

    assert!(events.is_empty());
    assert_eq!(remote.transport().active_subscription_count(), before);
    assert_eq!(remote.subscriptions().len(), 1);
    assert_eq!(remote.transport().subscription_calls(CAL_SUCCESSFUL), (1, 1));
    assert_eq!(remote.transport().subscription_calls("pupil"), (1, 1));
}

#[test]
fn covered_names_get_no_temporary_subscription() {
    let mut remote = remote();
    remote.subscribe("notify.calibration").unwrap();
    publish(&mut remote, CAL_SUCCESSFUL);

    let events = remote.wait_any(&[CAL_SUCCESSFUL], Some(Duration::from_secs(1))).unwrap();

    assert!(events.contains(CAL_SUCCESSFUL));
    assert_eq!(remote.transport().subscription_calls(CAL_SUCCESSFUL), (0, 0));
    assert_eq!(remote.transport().subscription_calls("notify.calibration"), (1, 0));
}

#[test]
fn data_channel_prefix_covers_notifications() {
    let mut remote = remote();
    // "noti" is routed to the data channel yet still matches notify topics
    remote.subscribe("noti").unwrap();
    publish(&mut remote, CAL_SUCCESSFUL);

    let events = remote.wait_any(&[CAL_SUCCESSFUL], Some(Duration::from_secs(1))).unwrap();

    assert!(events.contains(CAL_SUCCESSFUL));
    assert_eq!(remote.transport().subscription_calls(CAL_SUCCESSFUL), (0, 0));
    assert_eq!(remote.transport().active_subscriptions(Channel::Bulk), ["noti"]);
}

#[test]
fn wait_any_reports_the_event_that_arrived() {
    let mut remote = remote();
    remote.subscribe(CAL_SUCCESSFUL).unwrap();
    remote.subscribe(CAL_STOPPED).unwrap();
    publish(&mut remote, CAL_SUCCESSFUL);

    let looking_for = [CAL_SUCCESSFUL, CAL_STOPPED];
    let events = remote.wait_any(&looking_for, Some(Duration::from_secs(1))).unwrap();

    assert_eq!(events.names().collect::<Vec<_>>(), vec![CAL_SUCCESSFUL]);
    assert_eq!(events.unmatched(&looking_for), vec![CAL_STOPPED]);
}

#[test]
fn wait_any_stops_once_something_was_found() {
    let mut remote = remote();
    publish(&mut remote, "notify.a");

    // An unbounded second poll would fail on the in-memory transport
    let events = remote.wait_any(&["notify.a", "notify.b"], None).unwrap();

    assert!(events.contains("notify.a"));
    assert_eq!(remote.transport().poll_count(), 1);
}

#[test]
fn wait_all_accumulates_across_polls() {
    let mut remote = remote();
    publish(&mut remote, "notify.a");
    publish(&mut remote, "notify.b");

    let events = remote
        .wait_all(&["notify.a", "notify.b"], Some(Duration::from_secs(1)))
        .unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(remote.transport().poll_count(), 2);
}

#[test]
fn wait_all_timeout_returns_partial_result() {
    let mut remote = remote();
    publish(&mut remote, "notify.a");

    let looking_for = ["notify.a", "notify.b"];
    let events = remote
        .wait_all(&looking_for, Some(Duration::from_millis(30)))
        .unwrap();

    assert!(events.contains("notify.a"));
    assert_eq!(events.unmatched(&looking_for), vec!["notify.b"]);
}

#[test]
fn callbacks_only_see_matching_events() {
    let mut remote = remote();
    let (callback, seen) = recorder();
    remote.add_callback(&callback, &["pupil"]).unwrap();
    remote.subscribe("gaze").unwrap();
    publish(&mut remote, "pupil.0");
    publish(&mut remote, "gaze.0");

    let events = remote.check_all_available().unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(*seen.borrow(), vec!["pupil.0"]);
}

#[test]
fn poll_once_dispatches_callbacks() {
    let mut remote = remote();
    let (callback, seen) = recorder();
    remote.add_callback(&callback, &["notify.recording"]).unwrap();
    publish(&mut remote, "notify.recording.started");

    let events = remote.poll_once(Some(Duration::ZERO)).unwrap();

    assert!(events.contains("notify.recording.started"));
    assert_eq!(*seen.borrow(), vec!["notify.recording.started"]);
}

#[test]
fn removing_last_callback_unsubscribes_once() {
    let mut remote = remote();
    let (first, _) = recorder();
    let (second, seen) = recorder();
    remote.add_callback(&first, &["pupil"]).unwrap();
    remote.add_callback(&second, &["pupil"]).unwrap();
    assert_eq!(remote.transport().subscription_calls("pupil"), (1, 0));

    remote.remove_callback(&first, &["pupil"]).unwrap();
    assert_eq!(remote.transport().subscription_calls("pupil"), (1, 0));

    remote.remove_callback(&second, &["pupil"]).unwrap();
    remote.remove_callback(&second, &["pupil"]).unwrap();
    assert_eq!(remote.transport().subscription_calls("pupil"), (1, 1));
    assert!(remote.transport().active_subscriptions(Channel::Bulk).is_empty());

    publish(&mut remote, "pupil.1");
    assert!(remote.check_all_available().unwrap().is_empty());
    assert!(seen.borrow().is_empty());
}

#[test]
fn callback_failure_propagates_after_cleanup() {
    let mut remote = remote();
    let failing = Callback::new(|_event, _payload| Err("handler failed".into()));
    remote.add_callback(&failing, &["notify.calibration"]).unwrap();
    publish(&mut remote, CAL_SUCCESSFUL);

    let result = remote.wait_any(&[CAL_SUCCESSFUL, "gaze"], Some(Duration::from_secs(1)));

    match result {
        Err(RemoteError::Callback { event, .. }) => assert_eq!(event, CAL_SUCCESSFUL),
        other => panic!("expected callback error, got {:?}", other),
    }
    assert_eq!(remote.transport().subscription_calls("gaze"), (1, 1));
}

#[test]
fn drained_events_keep_latest_payload_with_arrival_stamp() {
    let mut remote = remote();
    remote.subscribe("pupil").unwrap();
    remote
        .transport_mut()
        .publish("pupil.0", &payload(json!({ "diameter": 3.0 })))
        .unwrap();
    remote
        .transport_mut()
        .publish("pupil.0", &payload(json!({ "diameter": 4.5 })))
        .unwrap();

    let events = remote.check_all_available().unwrap();
    let latest = events.get("pupil.0").unwrap();

    assert_eq!(latest.get("diameter"), Some(&json!(4.5)));
    assert!(latest.get(TIME_OF_ARRIVAL_KEY).and_then(|t| t.as_f64()).is_some());
}

#[test]
fn notify_round_trip() {
    let mut remote = remote();

    let reply = remote.notify(&payload(json!({ "subject": "x" }))).unwrap();

    assert_eq!(reply, NOTIFICATION_ACK);
    let (topic, sent) = &remote.transport().notifications()[0];
    assert_eq!(topic, "notify.x");
    assert_eq!(sent.get("subject"), Some(&json!("x")));
}
