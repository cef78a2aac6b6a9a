use super::testing::*;
use crate::camera_registry::{CameraKind, Connectivity, ReconfigureRequest};
use crate::error::Error;
use crate::event_log_service::EventKind;
use crate::geolocation::Coordinates;
use crate::realtime_hub::LogLevel;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

#[tokio::test]
async fn test_scan_records_visual_event_and_releases_gate() {
    let h = harness(vec![local("A"), offline("B")]);

    let event = h.station.scan_active().await.unwrap().unwrap();
    assert_eq!(event.kind, EventKind::Visual);
    assert_eq!(event.objects.len(), 1);
    assert_eq!(event.snapshot.as_ref().unwrap().mime_type, "image/jpeg");

    assert!(!h.station.gate().is_scanning());
    assert_eq!(h.station.events().len().await, 1);
    assert_eq!(
        h.station.registry().get("A").await.unwrap().connectivity,
        Connectivity::Online
    );
}

#[tokio::test]
async fn test_empty_visual_scan_records_nothing() {
    let h = harness_with(
        vec![local("A")],
        HarnessOptions {
            reply: empty_reply(),
            ..Default::default()
        },
    );

    assert!(h.station.scan_active().await.unwrap().is_none());
    assert!(h.station.events().is_empty().await);
    let logs = h.station.hub().recent_logs().await;
    assert!(logs.iter().any(|l| l.message.contains("nothing to report")));
}

#[tokio::test]
async fn test_concurrent_trigger_rejected_without_touching_log() {
    let hold = Arc::new(Semaphore::new(0));
    let h = harness_with(
        vec![local("A"), offline("B")],
        HarnessOptions {
            hold: Some(hold.clone()),
            ..Default::default()
        },
    );

    let station = h.station.clone();
    let first = tokio::spawn(async move { station.scan_active().await });
    while !h.station.gate().is_scanning() {
        tokio::task::yield_now().await;
    }

    let err = h.station.scan_active().await.unwrap_err();
    assert!(matches!(err, Error::AlreadyScanning));
    assert!(h.station.events().is_empty().await);

    hold.add_permits(1);
    let event = first.await.unwrap().unwrap();
    assert!(event.is_some());
    assert_eq!(h.station.events().len().await, 1);
    assert_eq!(h.analysis.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dropped_caller_does_not_cancel_admitted_scan() {
    let hold = Arc::new(Semaphore::new(0));
    let h = harness_with(
        vec![local("A")],
        HarnessOptions {
            hold: Some(hold.clone()),
            ..Default::default()
        },
    );

    let abandoned = tokio::time::timeout(Duration::from_millis(50), h.station.scan_active()).await;
    assert!(abandoned.is_err());
    assert!(h.station.gate().is_scanning());

    hold.add_permits(1);
    while h.station.gate().is_scanning() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(h.analysis.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.station.events().len().await, 1);
    assert!(!h.station.controls().scanning);
}

#[tokio::test]
async fn test_offline_active_camera_is_ineligible() {
    let h = harness(vec![offline("B"), local("A")]);

    let err = h.station.scan_active().await.unwrap_err();
    assert!(matches!(err, Error::ScanIneligible(_)));
    assert!(!h.station.gate().is_scanning());
    assert_eq!(h.analysis.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_capture_failure_degrades_and_marks_offline() {
    let h = harness(vec![local("A")]);
    *h.frames.attached.lock().unwrap() = false;

    let event = h.station.scan_active().await.unwrap();
    assert!(event.is_none());
    assert!(!h.station.gate().is_scanning());
    assert_eq!(h.analysis.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.station.registry().get("A").await.unwrap().connectivity,
        Connectivity::Offline
    );

    let logs = h.station.hub().recent_logs().await;
    assert!(logs
        .iter()
        .any(|l| l.level == LogLevel::Error && l.message.contains("Capture unavailable")));
    assert!(logs.iter().any(|l| l.message.contains("connection lost")));
}

#[tokio::test]
async fn test_transport_failure_releases_gate() {
    let h = harness(vec![local("A")]);
    h.analysis
        .set_reply(Err(Error::AnalysisTransport("503".to_string())));

    assert!(h.station.scan_active().await.unwrap().is_none());
    assert!(!h.station.gate().is_scanning());
    assert!(h.station.controls().scan_enabled);
}

#[tokio::test]
async fn test_situational_scan_records_report() {
    let h = harness(vec![stream("S", "5th & Main")]);

    let event = h.station.scan_active().await.unwrap().unwrap();
    assert_eq!(event.kind, EventKind::Situational);
    assert_eq!(event.location, "5th & Main");
    assert_eq!(event.report.as_deref(), Some("Light traffic, nothing unusual."));
    assert!(event.snapshot.is_some());

    let prompts = h.session.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("5th & Main"));
}

#[tokio::test]
async fn test_lookout_toggle_applies_to_next_scan() {
    let h = harness(vec![local("A")]);
    let toggles = h.station.set_lookout(true).await.unwrap();
    assert!(toggles.elevated_lookout);
    assert!(h.station.toggles().await.elevated_lookout);
    assert!(h.station.scan_active().await.unwrap().is_some());
}

#[tokio::test]
async fn test_location_scan_denied_logs_only() {
    let h = harness(vec![local("A")]);

    let event = h.station.scan_current_location().await.unwrap();
    assert!(event.is_none());
    assert!(h.station.events().is_empty().await);
    assert!(!h.station.gate().is_scanning());
    let logs = h.station.hub().recent_logs().await;
    assert!(logs.iter().any(|l| l.message.contains("Geolocation denied")));
}

#[tokio::test]
async fn test_location_scan_records_situational_event() {
    let h = harness_with(
        vec![local("A")],
        HarnessOptions {
            coordinates: Some(Coordinates {
                latitude: 40.7128,
                longitude: -74.006,
            }),
            ..Default::default()
        },
    );

    let event = h.station.scan_current_location().await.unwrap().unwrap();
    assert_eq!(event.kind, EventKind::Situational);
    assert!(event.camera_id.is_none());
    assert_eq!(event.location, "40.71280, -74.00600");
}

#[tokio::test]
async fn test_reconfigure_failure_leaves_slot_untouched() {
    let h = harness(vec![local("A"), offline("B")]);

    let err = h
        .station
        .reconfigure_camera(
            "B",
            ReconfigureRequest {
                location: "Gate".to_string(),
                kind: CameraKind::Stream,
                stream_ref: Some("not a url".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CameraReconfiguration(_)));
    assert_eq!(h.station.camera("B").await.unwrap().kind(), CameraKind::Offline);

    let camera = h
        .station
        .reconfigure_camera(
            "B",
            ReconfigureRequest {
                location: "Gate".to_string(),
                kind: CameraKind::Stream,
                stream_ref: Some("rtsp://gate.local/live".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(camera.kind(), CameraKind::Stream);
    assert_eq!(h.station.registry().list_scannable().await.len(), 2);
}

#[tokio::test]
async fn test_set_active_unknown_camera() {
    let h = harness(vec![local("A")]);
    assert!(matches!(
        h.station.set_active("Z").await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert_eq!(h.station.registry().active_id().await, "A");
}

#[tokio::test]
async fn test_chat_uses_shared_session() {
    let h = harness(vec![stream("S", "Harbor")]);
    h.station.scan_active().await.unwrap();
    let reply = h.station.chat("anything else?").await.unwrap();
    assert_eq!(reply, "Light traffic, nothing unusual.");
    assert_eq!(h.session.prompts.lock().unwrap().len(), 2);

    assert!(matches!(
        h.station.chat("   ").await.unwrap_err(),
        Error::Validation(_)
    ));
}

#[tokio::test]
async fn test_controls_relay_broadcasts() {
    let h = harness(vec![local("A")]);
    let (_id, mut rx) = h.station.hub().register().await;
    let relay = h.station.spawn_controls_relay();

    h.station.scan_active().await.unwrap();

    let mut saw_controls = false;
    while let Ok(Some(msg)) = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
        if msg.contains("\"scan_controls\"") {
            saw_controls = true;
            break;
        }
    }
    assert!(saw_controls);
    relay.abort();
}

#[tokio::test]
async fn test_export_matches_log_order() {
    let h = harness(vec![local("A")]);
    for _ in 0..3 {
        h.station.scan_active().await.unwrap();
    }
    let events = h.station.events().list().await;
    let html = h.station.export_html().await;

    let positions: Vec<usize> = events
        .iter()
        .map(|e| html.find(&format!("data-event-id=\"{}\"", e.id)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(html.matches("<article class=\"event\"").count(), 3);
    assert_eq!(h.station.timeline().await.len(), 3);
}

fn assert_send<T: Send>(_: &T) {}

#[tokio::test]
async fn test_handler_facing_futures_are_send() {
    let h = harness(vec![local("A")]);

    let export = h.station.export_html();
    assert_send(&export);
    assert!(export.await.starts_with("<!DOCTYPE html>"));

    let scan = h.station.scan_active();
    assert_send(&scan);
    assert!(scan.await.unwrap().is_some());

    let location = h.station.scan_current_location();
    assert_send(&location);
    assert!(location.await.unwrap().is_none());
}
